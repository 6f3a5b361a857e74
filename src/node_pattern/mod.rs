//! NodePattern DSL support: lexer, parser, compiler, and interpreter.
//!
//! A pattern is compiled once, when the cop that owns it is registered, and
//! then matched against any number of nodes:
//!
//! ```text
//! source ──lexer──▶ tokens ──parser──▶ PatternNode ──compiler──▶ Matcher
//! ```
//!
//! All syntax problems surface from `NodePattern::compile`. Matching itself
//! cannot fail; a node that does not fit is `MatchResult::NoMatch`.

pub mod compiler;
pub mod interpreter;
pub mod lexer;
pub mod parser;

use std::fmt;

use crate::ast::{Child, NodeId, Tree};

pub use compiler::Matcher;
pub use lexer::{Lexer, Token};
pub use parser::{Parser, PatternKind, PatternNode};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SyntaxErrorKind {
    #[error("unexpected character `{0}`")]
    UnexpectedChar(char),
    #[error("unterminated string literal")]
    UnterminatedString,
    #[error("unexpected end of pattern")]
    UnexpectedEnd,
    #[error("unexpected `{0}`")]
    UnexpectedToken(String),
    #[error("empty pattern")]
    Empty,
    #[error("unknown node type `{0}`")]
    UnknownNodeType(String),
    #[error("{0} are not supported")]
    Unsupported(&'static str),
    #[error("sequence head must be a node type, `_`, or a union of node types")]
    InvalidSequenceHead,
    #[error("`...` must be the last element of its sequence")]
    RestNotLast,
    #[error("`...` is only allowed as a sequence element")]
    RestOutsideSequence,
    #[error("union branches capture different numbers of values")]
    UnevenUnionCaptures,
    #[error("captures are not allowed under `!`")]
    CaptureInNegation,
}

/// A malformed pattern, reported when the pattern is compiled.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind} at offset {offset} in pattern `{pattern}`")]
pub struct PatternSyntaxError {
    pub kind: SyntaxErrorKind,
    pub offset: usize,
    pub pattern: String,
}

impl PatternSyntaxError {
    pub fn new(kind: SyntaxErrorKind, offset: usize, pattern: &str) -> Self {
        Self {
            kind,
            offset,
            pattern: pattern.to_string(),
        }
    }
}

/// A value bound by a `$` capture point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Capture {
    One(Child),
    /// Everything consumed by `$...`.
    Seq(Vec<Child>),
}

impl Capture {
    pub fn as_node(&self) -> Option<NodeId> {
        match self {
            Capture::One(child) => child.as_node(),
            Capture::Seq(_) => None,
        }
    }

    /// Symbol or string value of a captured slot.
    pub fn as_name(&self) -> Option<&str> {
        match self {
            Capture::One(child) => child.as_name(),
            Capture::Seq(_) => None,
        }
    }

    pub fn as_seq(&self) -> Option<&[Child]> {
        match self {
            Capture::Seq(children) => Some(children),
            Capture::One(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchResult {
    NoMatch,
    /// Captures in the order their `$` appears in the pattern source.
    Matched(Vec<Capture>),
}

impl MatchResult {
    pub fn is_match(&self) -> bool {
        matches!(self, MatchResult::Matched(_))
    }

    pub fn captures(self) -> Option<Vec<Capture>> {
        match self {
            MatchResult::Matched(captures) => Some(captures),
            MatchResult::NoMatch => None,
        }
    }
}

/// A compiled NodePattern.
#[derive(Debug, Clone)]
pub struct NodePattern {
    source: String,
    matcher: Matcher,
    capture_count: usize,
}

impl NodePattern {
    pub fn compile(source: &str) -> Result<Self, PatternSyntaxError> {
        let tokens = Lexer::new(source).tokenize()?;
        let ast = Parser::new(source, tokens).parse()?;
        let (matcher, capture_count) = compiler::compile(&ast, source)?;
        Ok(Self {
            source: source.to_string(),
            matcher,
            capture_count,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn matcher(&self) -> &Matcher {
        &self.matcher
    }

    /// Number of values a successful match yields.
    pub fn capture_count(&self) -> usize {
        self.capture_count
    }

    pub fn match_node(&self, tree: &Tree, node: NodeId) -> MatchResult {
        self.match_child(tree, &Child::Node(node))
    }

    /// Match against any child slot, including absent and literal slots.
    pub fn match_child(&self, tree: &Tree, child: &Child) -> MatchResult {
        let mut captures = Vec::with_capacity(self.capture_count);
        if interpreter::matches(&self.matcher, tree, child, &mut captures) {
            debug_assert_eq!(captures.len(), self.capture_count);
            MatchResult::Matched(captures)
        } else {
            MatchResult::NoMatch
        }
    }

    pub fn matches(&self, tree: &Tree, node: NodeId) -> bool {
        self.match_node(tree, node).is_match()
    }
}

impl fmt::Display for NodePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}
