use crate::cop::Cop;
use crate::cop::walker::CopWalker;
use crate::diagnostic::Diagnostic;
use crate::parse::parse_tree;
use crate::parse::source::SourceFile;

/// An expected offense parsed from a fixture annotation.
#[derive(Debug, Clone)]
pub struct ExpectedOffense {
    pub line: usize,
    pub column: usize,
    pub cop_name: String,
    pub message: String,
}

struct RawAnnotation {
    column: usize,
    cop_name: String,
    message: String,
}

/// Try to parse an annotation line.
///
/// Annotation format: optional leading whitespace, then one or more `^` characters,
/// then a space, then `Department/CopName: Message`.
///
/// The column of the offense is the byte position of the first `^` in the line.
///
/// This intentionally rejects lines that merely contain `^` in other contexts
/// (e.g., Ruby XOR `x ^ y`, caret in strings) because:
/// - The `^` must be the first non-whitespace character
/// - Must be followed by ` Department/CopName: message` (with `/` and `: `)
fn try_parse_annotation(line: &str) -> Option<RawAnnotation> {
    let trimmed = line.trim_start();
    if !trimmed.starts_with('^') {
        return None;
    }

    let caret_count = trimmed.bytes().take_while(|&b| b == b'^').count();
    let after_carets = &trimmed[caret_count..];
    if !after_carets.starts_with(' ') {
        return None;
    }

    let rest = after_carets[1..].trim_end();
    let colon_space = rest.find(": ")?;
    let cop_name = &rest[..colon_space];
    let message = &rest[colon_space + 2..];

    // Cop names must contain '/' (e.g., GraphQL/FieldDefinitions)
    if !cop_name.contains('/') {
        return None;
    }

    // Column = byte position of first '^' in the original line
    let column = line.len() - trimmed.len();

    Some(RawAnnotation {
        column,
        cop_name: cop_name.to_string(),
        message: message.to_string(),
    })
}

/// Parse fixture content into clean source bytes and expected offenses.
///
/// Annotation lines (lines starting with `^^^` markers after optional whitespace)
/// are stripped from the source. Line numbers in expected offenses refer to the
/// clean source (1-indexed).
///
/// # Convention
///
/// Annotations must appear *after* the source line they reference. The annotated
/// line number is the count of source lines seen so far (i.e., the previous
/// non-annotation line).
///
/// # Panics
///
/// Panics if an annotation appears before any source line, which would produce
/// an invalid line number of 0.
pub fn parse_fixture(raw: &[u8]) -> (Vec<u8>, Vec<ExpectedOffense>) {
    let text = std::str::from_utf8(raw).expect("fixture must be valid UTF-8");
    let elements: Vec<&str> = text.split('\n').collect();

    let mut source_lines: Vec<&str> = Vec::new();
    let mut expected: Vec<ExpectedOffense> = Vec::new();

    for (raw_idx, element) in elements.iter().enumerate() {
        if let Some(annotation) = try_parse_annotation(element) {
            assert!(
                !source_lines.is_empty(),
                "Annotation on raw line {} appears before any source line. \
                 Annotations must follow the source line they reference.\n\
                 Line: {:?}",
                raw_idx + 1,
                element,
            );
            // Annotation refers to the last source line added
            let source_line_number = source_lines.len(); // 1-indexed
            expected.push(ExpectedOffense {
                line: source_line_number,
                column: annotation.column,
                cop_name: annotation.cop_name,
                message: annotation.message,
            });
        } else {
            source_lines.push(element);
        }
    }

    let clean = source_lines.join("\n");
    (clean.into_bytes(), expected)
}

/// Run a cop on raw source bytes and return the diagnostics.
///
/// Use this for custom assertions where the standard `assert_cop_offenses`
/// helpers don't fit (e.g., checking severity or partial matching).
pub fn run_cop(cop: &dyn Cop, source_bytes: &[u8]) -> Vec<Diagnostic> {
    let source = SourceFile::from_bytes("test.rb", source_bytes.to_vec());
    let tree = parse_tree(source.as_bytes()).expect("test source must lower");
    let mut diagnostics: Vec<Diagnostic> = CopWalker::new(&[cop])
        .walk(&tree)
        .into_iter()
        .map(|offense| Diagnostic {
            path: source.path_str().to_string(),
            location: source.span_location(tree.span(offense.node)),
            severity: cop.default_severity(),
            cop_name: offense.cop_name.to_string(),
            message: offense.message,
        })
        .collect();
    diagnostics.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
    diagnostics
}

/// Run a cop on fixture bytes (with annotations) and assert offenses match.
///
/// Expected offenses are sorted by (line, column) before comparison, so
/// annotation order in the fixture doesn't need to match the cop's
/// emission order.
pub fn assert_cop_offenses(cop: &dyn Cop, fixture_bytes: &[u8]) {
    let (clean_source, mut expected) = parse_fixture(fixture_bytes);
    let diagnostics = run_cop(cop, &clean_source);
    expected.sort_by_key(|e| (e.line, e.column));

    assert_eq!(
        diagnostics.len(),
        expected.len(),
        "Expected {} offense(s) but got {}.\nExpected:\n{}\nActual:\n{}",
        expected.len(),
        diagnostics.len(),
        format_expected(&expected),
        format_diagnostics(&diagnostics),
    );

    for (i, (diag, exp)) in diagnostics.iter().zip(expected.iter()).enumerate() {
        assert_eq!(
            diag.location.line, exp.line,
            "Offense #{}: line mismatch (expected {} got {})\n  expected: {}:{} {}: {}\n  actual:   {d}",
            i + 1, exp.line, diag.location.line,
            exp.line, exp.column, exp.cop_name, exp.message,
            d = diag,
        );
        assert_eq!(
            diag.location.column, exp.column,
            "Offense #{}: column mismatch (expected {} got {})\n  expected: {}:{} {}: {}\n  actual:   {d}",
            i + 1, exp.column, diag.location.column,
            exp.line, exp.column, exp.cop_name, exp.message,
            d = diag,
        );
        assert_eq!(
            diag.cop_name, exp.cop_name,
            "Offense #{}: cop name mismatch\n  expected: {}\n  actual:   {}",
            i + 1, exp.cop_name, diag.cop_name,
        );
        assert_eq!(
            diag.message, exp.message,
            "Offense #{}: message mismatch for {}\n  expected: {:?}\n  actual:   {:?}",
            i + 1, exp.cop_name, exp.message, diag.message,
        );
    }
}

/// Assert a cop produces no offenses on the given source bytes.
pub fn assert_cop_no_offenses(cop: &dyn Cop, source_bytes: &[u8]) {
    let diagnostics = run_cop(cop, source_bytes);
    assert!(
        diagnostics.is_empty(),
        "Expected no offenses but got {}:\n{}",
        diagnostics.len(),
        format_diagnostics(&diagnostics),
    );
}

/// Generate `offense_fixture` and `no_offense_fixture` tests for a cop from
/// `tests/fixtures/<dir>/offense.rb` and `no_offense.rb`.
#[macro_export]
macro_rules! cop_fixture_tests {
    ($cop:expr, $dir:literal) => {
        #[test]
        fn offense_fixture() {
            let cop = $cop;
            $crate::testutil::assert_cop_offenses(
                &cop,
                include_bytes!(concat!(
                    env!("CARGO_MANIFEST_DIR"),
                    "/tests/fixtures/",
                    $dir,
                    "/offense.rb"
                )),
            );
        }

        #[test]
        fn no_offense_fixture() {
            let cop = $cop;
            $crate::testutil::assert_cop_no_offenses(
                &cop,
                include_bytes!(concat!(
                    env!("CARGO_MANIFEST_DIR"),
                    "/tests/fixtures/",
                    $dir,
                    "/no_offense.rb"
                )),
            );
        }
    };
}

fn format_expected(expected: &[ExpectedOffense]) -> String {
    expected
        .iter()
        .map(|e| format!("  {}:{} {}: {}", e.line, e.column, e.cop_name, e.message))
        .collect::<Vec<_>>()
        .join("\n")
}

fn format_diagnostics(diagnostics: &[Diagnostic]) -> String {
    diagnostics
        .iter()
        .map(|d| format!("  {d}"))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cop::graphql::field_definitions::{FieldDefinitions, FieldDefinitionsStyle};
    use crate::diagnostic::Severity;

    const GROUP_MSG: &str = "Group all field definitions together.";

    fn grouping() -> FieldDefinitions {
        FieldDefinitions::new(FieldDefinitionsStyle::GroupDefinitions).unwrap()
    }

    #[test]
    fn annotation_column_is_the_field_indentation() {
        let ann = try_parse_annotation(
            "    ^^^^^^^^^^^^^^^^^^^ GraphQL/FieldDefinitions: Group all field definitions together.",
        )
        .unwrap();
        assert_eq!(ann.column, 4);
        assert_eq!(ann.cop_name, "GraphQL/FieldDefinitions");
        assert_eq!(ann.message, GROUP_MSG);
    }

    #[test]
    fn ruby_lines_with_carets_are_not_annotations() {
        assert!(try_parse_annotation("  field :mask, Integer, default: 1 ^ 2").is_none());
        assert!(try_parse_annotation("  # ^ resolver lives below").is_none());
        assert!(try_parse_annotation("  ^^^ FieldDefinitions: missing department").is_none());
        assert!(try_parse_annotation("  ^^^GraphQL/FieldDefinitions: no space").is_none());
        assert!(try_parse_annotation("  ^^^ GraphQL/FieldDefinitions no colon").is_none());
    }

    #[test]
    fn nested_type_annotation_maps_to_the_field_line() {
        let raw = b"module Types\n  class PostType < BaseObject\n    field :title, String\n\n    def title; end\n    field :author, User\n    ^^^^^^^^^^^^^^^^^^^ GraphQL/FieldDefinitions: Group all field definitions together.\n  end\nend\n";
        let (clean, expected) = parse_fixture(raw);
        assert_eq!(
            clean,
            b"module Types\n  class PostType < BaseObject\n    field :title, String\n\n    def title; end\n    field :author, User\n  end\nend\n"
        );
        assert_eq!(expected.len(), 1);
        assert_eq!((expected[0].line, expected[0].column), (6, 4));

        assert_cop_offenses(&grouping(), raw);
    }

    #[test]
    fn block_field_is_anchored_on_its_first_line() {
        let raw = b"class UserType < BaseObject\n  field :name, String\n  def name; end\n  field :phone, String do\n  ^^^^^^^^^^^^^^^^^^^^^^^ GraphQL/FieldDefinitions: Group all field definitions together.\n    argument :format, String\n  end\nend\n";
        let (_, expected) = parse_fixture(raw);
        assert_eq!((expected[0].line, expected[0].column), (4, 2));
        assert_cop_offenses(&grouping(), raw);
    }

    #[test]
    #[should_panic(expected = "Annotation on raw line 1 appears before any source line")]
    fn annotation_before_any_source_panics() {
        parse_fixture(b"^^^ GraphQL/FieldDefinitions: too early\nfield :a, String\n");
    }

    #[test]
    fn run_cop_returns_diagnostics() {
        let source = b"class T < Base\n  field :a, String\n  def a; end\n  field :b, String\nend\n";
        let diags = run_cop(&grouping(), source);
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].location.line, 4);
        assert_eq!(diags[0].location.column, 2);
        assert_eq!(diags[0].severity, Severity::Convention);
        assert_eq!(diags[0].cop_name, "GraphQL/FieldDefinitions");
        assert_eq!(diags[0].message, GROUP_MSG);
    }

    #[test]
    #[should_panic(expected = "Expected no offenses")]
    fn assert_cop_no_offenses_detects_offenses() {
        assert_cop_no_offenses(
            &grouping(),
            b"class T < Base\n  field :a, String\n  def a; end\n  field :b, String\nend\n",
        );
    }
}
