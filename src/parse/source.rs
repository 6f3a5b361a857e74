use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::ast::Span;
use crate::diagnostic::Location;

/// A Ruby file held in memory, with a line index for turning node spans
/// into line/column positions.
#[derive(Debug)]
pub struct SourceFile {
    pub path: PathBuf,
    pub content: Vec<u8>,
    /// Byte offsets where each line starts (0-indexed into content)
    line_starts: Vec<usize>,
}

impl SourceFile {
    pub fn from_path(path: &Path) -> Result<Self> {
        let content =
            std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
        Ok(Self::from_vec(path.to_path_buf(), content))
    }

    /// Create a SourceFile from raw bytes, using `path` for display and
    /// Include/Exclude matching.
    pub fn from_vec(path: PathBuf, content: Vec<u8>) -> Self {
        let line_starts = compute_line_starts(&content);
        Self {
            path,
            content,
            line_starts,
        }
    }

    /// Create a SourceFile from raw bytes (for testing).
    #[cfg(test)]
    pub fn from_bytes(path: &str, content: Vec<u8>) -> Self {
        Self::from_vec(PathBuf::from(path), content)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.content
    }

    pub fn path_str(&self) -> &str {
        self.path.to_str().unwrap_or("<non-utf8 path>")
    }

    /// Convert a byte offset into a (1-indexed line, 0-indexed column) pair.
    /// Column is a character offset (UTF-8 codepoint count) within the line.
    pub fn offset_to_line_col(&self, byte_offset: usize) -> (usize, usize) {
        let byte_offset = byte_offset.min(self.content.len());
        let line_idx = match self.line_starts.binary_search(&byte_offset) {
            Ok(idx) => idx,
            Err(idx) => idx.saturating_sub(1),
        };
        let line_bytes = &self.content[self.line_starts[line_idx]..byte_offset];
        // Count bytes that are NOT UTF-8 continuation bytes (0x80..0xBF).
        let col = line_bytes.iter().filter(|&&b| (b & 0xC0) != 0x80).count();
        (line_idx + 1, col)
    }

    /// Location of the first character of `span`.
    pub fn span_location(&self, span: Span) -> Location {
        let (line, column) = self.offset_to_line_col(span.start);
        Location { line, column }
    }
}

fn compute_line_starts(content: &[u8]) -> Vec<usize> {
    let mut starts = vec![0];
    for (i, &byte) in content.iter().enumerate() {
        if byte == b'\n' && i + 1 < content.len() {
            starts.push(i + 1);
        }
    }
    starts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(s: &str) -> SourceFile {
        SourceFile::from_bytes("test.rb", s.as_bytes().to_vec())
    }

    #[test]
    fn line_starts_multiple_lines() {
        let sf = source("abc\ndef\nghi");
        assert_eq!(sf.line_starts, vec![0, 4, 8]);
    }

    #[test]
    fn line_starts_trailing_newline() {
        // No line start after the final \n since nothing follows it
        let sf = source("abc\n");
        assert_eq!(sf.line_starts, vec![0]);
    }

    #[test]
    fn offset_to_line_col_positions() {
        let sf = source("abc\ndef\nghi");
        assert_eq!(sf.offset_to_line_col(0), (1, 0));
        assert_eq!(sf.offset_to_line_col(2), (1, 2));
        assert_eq!(sf.offset_to_line_col(4), (2, 0));
        assert_eq!(sf.offset_to_line_col(9), (3, 1));
    }

    #[test]
    fn columns_count_characters() {
        // "é" is two bytes
        let sf = source("# é\n  field :a");
        assert_eq!(sf.offset_to_line_col(4), (1, 3));
        let field = "# é\n  ".len();
        assert_eq!(sf.offset_to_line_col(field), (2, 2));
    }

    #[test]
    fn span_location_uses_span_start() {
        let sf = source("class T\n  field :a\nend\n");
        let loc = sf.span_location(Span::new(10, 18));
        assert_eq!(loc, Location { line: 2, column: 2 });
    }

    #[test]
    fn from_path_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("user_type.rb");
        std::fs::write(&file, b"field :a\n").unwrap();
        let sf = SourceFile::from_path(&file).unwrap();
        assert_eq!(sf.as_bytes(), b"field :a\n");
        assert_eq!(sf.path, file);
    }

    #[test]
    fn from_path_nonexistent() {
        let result = SourceFile::from_path(Path::new("/nonexistent/file.rb"));
        assert!(result.is_err());
    }

    mod prop_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn line_starts_follow_newlines(content in prop::collection::vec(any::<u8>(), 0..500)) {
                let starts = compute_line_starts(&content);
                prop_assert_eq!(starts[0], 0);
                for pair in starts.windows(2) {
                    prop_assert!(pair[0] < pair[1]);
                }
                for &start in &starts[1..] {
                    prop_assert!(start > 0 && content[start - 1] == b'\n');
                }
            }

            #[test]
            fn offset_to_line_col_is_monotonic(content in prop::collection::vec(any::<u8>(), 1..500)) {
                let sf = SourceFile::from_bytes("test.rb", content.clone());
                let mut prev = (0usize, 0usize);
                for offset in 0..=content.len() {
                    let cur = sf.offset_to_line_col(offset);
                    prop_assert!(cur >= prev);
                    prop_assert!(cur.0 >= 1 && cur.0 <= sf.line_starts.len());
                    prev = cur;
                }
            }
        }
    }
}
