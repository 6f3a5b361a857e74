pub mod json;
pub mod text;

use std::io::Write;

use crate::diagnostic::Diagnostic;

pub trait Formatter {
    fn format_to(
        &self,
        diagnostics: &[Diagnostic],
        file_count: usize,
        out: &mut dyn Write,
    ) -> std::io::Result<()>;

    fn print(&self, diagnostics: &[Diagnostic], file_count: usize) -> std::io::Result<()> {
        let stdout = std::io::stdout();
        let mut lock = stdout.lock();
        self.format_to(diagnostics, file_count, &mut lock)
    }
}

/// `"json"` selects JSON output; anything else falls back to text.
pub fn create_formatter(format: &str) -> Box<dyn Formatter> {
    match format {
        "json" => Box::new(json::JsonFormatter),
        _ => Box::new(text::TextFormatter),
    }
}
