use std::io::Write;

use crate::diagnostic::Diagnostic;
use crate::formatter::Formatter;

pub struct TextFormatter;

impl Formatter for TextFormatter {
    fn format_to(
        &self,
        diagnostics: &[Diagnostic],
        file_count: usize,
        out: &mut dyn Write,
    ) -> std::io::Result<()> {
        for d in diagnostics {
            writeln!(out, "{d}")?;
        }
        let offense_word = if diagnostics.len() == 1 {
            "offense"
        } else {
            "offenses"
        };
        let file_word = if file_count == 1 { "file" } else { "files" };
        writeln!(
            out,
            "\n{file_count} {file_word} inspected, {} {offense_word} detected",
            diagnostics.len(),
        )
    }
}
