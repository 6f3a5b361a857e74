pub mod source;

use tracing::debug;

use crate::ast::{Tree, TreeError, lower_program};

/// Parse Ruby source bytes using Prism.
///
/// This must be called on the thread that will use the result, since
/// `ParseResult` is `!Send + !Sync`.
pub fn parse_source(source: &[u8]) -> ruby_prism::ParseResult<'_> {
    ruby_prism::parse(source)
}

/// Parse and lower `source` into a `Tree`.
///
/// Syntax errors do not fail the parse: Prism recovers and the recovered
/// tree is returned.
pub fn parse_tree(source: &[u8]) -> Result<Tree, TreeError> {
    let result = parse_source(source);
    let errors = result.errors().count();
    if errors > 0 {
        debug!(errors, "source has syntax errors, linting recovered tree");
    }
    lower_program(&result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::NodeType;

    #[test]
    fn parse_valid_ruby() {
        let result = parse_source(b"field :name, String");
        assert_eq!(result.errors().count(), 0);
    }

    #[test]
    fn parse_syntax_error_still_returns() {
        let result = parse_source(b"def foo(");
        assert!(result.errors().count() > 0);
    }

    #[test]
    fn parse_tree_lowers_program() {
        let tree = parse_tree(b"field :name, String").unwrap();
        assert_eq!(tree.node_type(tree.root()), NodeType::Send);
    }

    #[test]
    fn parse_tree_recovers_from_syntax_errors() {
        let tree = parse_tree(b"field :a\nfoo(\n").unwrap();
        assert!(
            tree.pre_order(tree.root())
                .any(|n| tree.send_method_name(n) == Some("field"))
        );
    }
}
