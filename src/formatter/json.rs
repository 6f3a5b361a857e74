use std::io::Write;

use serde::Serialize;

use crate::diagnostic::Diagnostic;
use crate::formatter::Formatter;

pub struct JsonFormatter;

#[derive(Serialize)]
struct JsonOutput<'a> {
    metadata: Metadata,
    offenses: Vec<Offense<'a>>,
}

#[derive(Serialize)]
struct Metadata {
    files_inspected: usize,
    offense_count: usize,
}

#[derive(Serialize)]
struct Offense<'a> {
    path: &'a str,
    line: usize,
    column: usize,
    severity: &'static str,
    cop_name: &'a str,
    message: &'a str,
}

impl Formatter for JsonFormatter {
    fn format_to(
        &self,
        diagnostics: &[Diagnostic],
        file_count: usize,
        out: &mut dyn Write,
    ) -> std::io::Result<()> {
        let output = JsonOutput {
            metadata: Metadata {
                files_inspected: file_count,
                offense_count: diagnostics.len(),
            },
            offenses: diagnostics
                .iter()
                .map(|d| Offense {
                    path: &d.path,
                    line: d.location.line,
                    column: d.location.column,
                    severity: d.severity.name(),
                    cop_name: &d.cop_name,
                    message: &d.message,
                })
                .collect(),
        };
        serde_json::to_writer_pretty(&mut *out, &output)?;
        writeln!(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostic::{Location, Severity};

    fn render(diagnostics: &[Diagnostic], file_count: usize) -> serde_json::Value {
        let mut buf = Vec::new();
        JsonFormatter
            .format_to(diagnostics, file_count, &mut buf)
            .unwrap();
        serde_json::from_slice(&buf).unwrap()
    }

    #[test]
    fn empty_produces_valid_json() {
        let parsed = render(&[], 0);
        assert_eq!(parsed["metadata"]["files_inspected"], 0);
        assert_eq!(parsed["metadata"]["offense_count"], 0);
        assert_eq!(parsed["offenses"].as_array().unwrap().len(), 0);
    }

    #[test]
    fn offense_fields() {
        let d = Diagnostic {
            path: "user_type.rb".to_string(),
            location: Location { line: 4, column: 2 },
            severity: Severity::Warning,
            cop_name: "GraphQL/FieldDefinitions".to_string(),
            message: "Group all field definitions together.".to_string(),
        };
        let parsed = render(&[d], 3);
        assert_eq!(parsed["metadata"]["files_inspected"], 3);
        assert_eq!(parsed["metadata"]["offense_count"], 1);
        let offense = &parsed["offenses"][0];
        assert_eq!(offense["path"], "user_type.rb");
        assert_eq!(offense["line"], 4);
        assert_eq!(offense["column"], 2);
        assert_eq!(offense["severity"], "warning");
        assert_eq!(offense["cop_name"], "GraphQL/FieldDefinitions");
        assert_eq!(offense["message"], "Group all field definitions together.");
    }
}
