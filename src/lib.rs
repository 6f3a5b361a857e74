pub mod ast;
pub mod cli;
pub mod config;
pub mod cop;
pub mod diagnostic;
pub mod formatter;
pub mod fs;
pub mod linter;
pub mod node_pattern;
pub mod parse;

#[cfg(test)]
pub mod testutil;

use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::debug;

use cli::Args;
use config::load_config;
use cop::registry::CopRegistry;
use formatter::create_formatter;
use fs::discover_files;
use linter::{lint_source, run_linter};
use parse::source::SourceFile;

/// Run the linter. Returns the exit code: 0 = clean, 1 = offenses found.
/// Errors map to exit code 3 in `main`.
pub fn run(args: Args) -> Result<i32> {
    if args.list_cops {
        for name in CopRegistry::builtin_names() {
            println!("{name}");
        }
        return Ok(0);
    }

    let search_dir = match args.paths.first() {
        Some(p) if p.is_file() => p.parent().unwrap_or(Path::new(".")),
        Some(p) => p.as_path(),
        None => Path::new("."),
    };
    let config_start = std::time::Instant::now();
    let config = load_config(args.config.as_deref(), search_dir)?;
    debug!(
        path = ?config.path(),
        global_excludes = ?config.global_excludes(),
        elapsed = ?config_start.elapsed(),
        "configuration loaded"
    );

    let registry =
        CopRegistry::from_config(&config).context("failed to load cops from configuration")?;

    let result = if let Some(ref display_path) = args.stdin {
        let mut input = Vec::new();
        std::io::stdin()
            .read_to_end(&mut input)
            .context("failed to read stdin")?;
        let source = SourceFile::from_vec(display_path.clone(), input);
        lint_source(&source, &registry)
    } else {
        let files = discover_files(&args.paths, &config)?;
        debug!(files = files.len(), "discovered files");
        run_linter(&files, &registry)
    };

    create_formatter(&args.format)
        .print(&result.diagnostics, result.file_count)
        .context("failed to write output")?;

    Ok(if result.has_offenses() { 1 } else { 0 })
}
