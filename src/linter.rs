use std::path::PathBuf;

use rayon::prelude::*;
use tracing::{debug, warn};

use crate::ast::Tree;
use crate::cop::Offense;
use crate::cop::registry::CopRegistry;
use crate::cop::walker::CopWalker;
use crate::diagnostic::Diagnostic;
use crate::parse::parse_tree;
use crate::parse::source::SourceFile;

pub struct LintResult {
    pub diagnostics: Vec<Diagnostic>,
    pub file_count: usize,
}

impl LintResult {
    pub fn has_offenses(&self) -> bool {
        !self.diagnostics.is_empty()
    }
}

/// Lint a single SourceFile (already loaded into memory). Used for --stdin mode.
pub fn lint_source(source: &SourceFile, registry: &CopRegistry) -> LintResult {
    let mut diagnostics = check_source(source, registry);
    diagnostics.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
    LintResult {
        diagnostics,
        file_count: 1,
    }
}

/// Lint every file in parallel. Output is sorted by path, line and column.
pub fn run_linter(files: &[PathBuf], registry: &CopRegistry) -> LintResult {
    let wall_start = std::time::Instant::now();

    let mut diagnostics: Vec<Diagnostic> = files
        .par_iter()
        .flat_map(|path| match SourceFile::from_path(path) {
            Ok(source) => check_source(&source, registry),
            Err(e) => {
                warn!("{e:#}");
                Vec::new()
            }
        })
        .collect();
    diagnostics.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));

    debug!(
        files = files.len(),
        offenses = diagnostics.len(),
        elapsed = ?wall_start.elapsed(),
        "lint finished"
    );
    LintResult {
        diagnostics,
        file_count: files.len(),
    }
}

/// Parse, walk and resolve offenses for one file. Runs on a rayon worker,
/// so the tree and offense list stay local to this call.
fn check_source(source: &SourceFile, registry: &CopRegistry) -> Vec<Diagnostic> {
    let cops = registry.cops_for(&source.path);
    if cops.is_empty() {
        return Vec::new();
    }

    let tree = match parse_tree(source.as_bytes()) {
        Ok(tree) => tree,
        Err(e) => {
            warn!(path = %source.path.display(), "failed to build syntax tree: {e}");
            return Vec::new();
        }
    };

    let offenses = CopWalker::new(&cops).walk(&tree);
    offenses
        .into_iter()
        .map(|offense| to_diagnostic(source, &tree, offense, registry))
        .collect()
}

fn to_diagnostic(
    source: &SourceFile,
    tree: &Tree,
    offense: Offense,
    registry: &CopRegistry,
) -> Diagnostic {
    Diagnostic {
        path: source.path_str().to_string(),
        location: source.span_location(tree.span(offense.node)),
        severity: registry.severity(offense.cop_name),
        cop_name: offense.cop_name.to_string(),
        message: offense.message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ResolvedConfig;
    use crate::diagnostic::Severity;

    const INTERLEAVED: &str = "class UserType < BaseObject\n  field :first_name, String\n  def first_name; end\n  field :last_name, String\nend\n";

    fn registry(yaml: &str) -> CopRegistry {
        CopRegistry::from_config(&ResolvedConfig::from_yaml(yaml).unwrap()).unwrap()
    }

    fn source(path: &str, text: &str) -> SourceFile {
        SourceFile::from_vec(PathBuf::from(path), text.as_bytes().to_vec())
    }

    #[test]
    fn lint_source_reports_locations() {
        let result = lint_source(&source("user_type.rb", INTERLEAVED), &registry(""));
        assert_eq!(result.file_count, 1);
        assert_eq!(result.diagnostics.len(), 1);
        assert_eq!(
            result.diagnostics[0].to_string(),
            "user_type.rb:4:2: C: GraphQL/FieldDefinitions: Group all field definitions together."
        );
    }

    #[test]
    fn configured_severity_is_applied() {
        let reg = registry("GraphQL/FieldDefinitions:\n  Severity: error\n");
        let result = lint_source(&source("user_type.rb", INTERLEAVED), &reg);
        assert_eq!(result.diagnostics[0].severity, Severity::Error);
    }

    #[test]
    fn excluded_paths_are_skipped() {
        let reg = registry("GraphQL/FieldDefinitions:\n  Exclude:\n    - 'spec/**'\n");
        let result = lint_source(&source("spec/user_type.rb", INTERLEAVED), &reg);
        assert!(!result.has_offenses());
    }

    #[test]
    fn syntax_errors_do_not_abort() {
        let text = format!("{INTERLEAVED}def broken(\n");
        let result = lint_source(&source("broken.rb", &text), &registry(""));
        assert_eq!(result.file_count, 1);
    }

    #[test]
    fn run_linter_sorts_across_files() {
        let dir = tempfile::tempdir().unwrap();
        let b = dir.path().join("b.rb");
        let a = dir.path().join("a.rb");
        std::fs::write(&b, INTERLEAVED).unwrap();
        std::fs::write(&a, INTERLEAVED).unwrap();

        let result = run_linter(&[b, a.clone()], &registry(""));
        assert_eq!(result.file_count, 2);
        assert_eq!(result.diagnostics.len(), 2);
        assert_eq!(result.diagnostics[0].path, a.to_str().unwrap());
    }

    #[test]
    fn unreadable_file_is_skipped() {
        let result = run_linter(&[PathBuf::from("/no/such/file.rb")], &registry(""));
        assert_eq!(result.file_count, 1);
        assert!(!result.has_offenses());
    }
}
