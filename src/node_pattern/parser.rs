//! NodePattern DSL parser.
//!
//! Parses a token stream into a `PatternNode` syntax tree. The parser only
//! checks bracket structure; meaning (known node types, where `...` may go,
//! capture arity) is the compiler's job.

use std::fmt;

use super::lexer::{Spanned, Token};
use super::{PatternSyntaxError, SyntaxErrorKind};

#[derive(Debug, Clone, PartialEq)]
pub struct PatternNode {
    pub kind: PatternKind,
    /// Byte offset of the node's first token in the pattern source.
    pub offset: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PatternKind {
    /// (head child1 child2 ...)
    Sequence {
        head: Box<PatternNode>,
        children: Vec<PatternNode>,
    },
    /// {a | b | c}
    Alternatives(Vec<PatternNode>),
    /// [a b c]
    Conjunction(Vec<PatternNode>),
    /// $pattern
    Capture(Box<PatternNode>),
    /// _
    Wildcard,
    /// ...
    Rest,
    /// !pattern
    Negation(Box<PatternNode>),
    /// :symbol
    SymbolLiteral(String),
    IntLiteral(i64),
    StringLiteral(String),
    /// nil? — absent child, e.g. no receiver
    NilPredicate,
    /// Type predicate: int?, str?, sym?, etc.
    TypePredicate(String),
    /// ^pattern — parent node
    ParentRef(Box<PatternNode>),
    /// `pattern — descend
    DescendRef(Box<PatternNode>),
    /// Node type names, plus `nil`/`true`/`false`
    Ident(String),
}

pub struct Parser<'a> {
    source: &'a str,
    tokens: Vec<Spanned>,
    pos: usize,
}

fn describe(token: &Token) -> String {
    match token {
        Token::LParen => "(".to_string(),
        Token::RParen => ")".to_string(),
        Token::LBrace => "{".to_string(),
        Token::RBrace => "}".to_string(),
        Token::LBracket => "[".to_string(),
        Token::RBracket => "]".to_string(),
        Token::Capture => "$".to_string(),
        Token::Wildcard => "_".to_string(),
        Token::Rest => "...".to_string(),
        Token::Negation => "!".to_string(),
        Token::Pipe => "|".to_string(),
        Token::Caret => "^".to_string(),
        Token::Backtick => "`".to_string(),
        Token::HelperCall(name) => format!("#{name}"),
        Token::ParamRef(name) => format!("%{name}"),
        Token::SymbolLiteral(name) => format!(":{name}"),
        Token::IntLiteral(n) => n.to_string(),
        Token::StringLiteral(s) => format!("{s:?}"),
        Token::NilPredicate => "nil?".to_string(),
        Token::TypePredicate(name) => format!("{name}?"),
        Token::Ident(name) => name.clone(),
    }
}

impl<'a> Parser<'a> {
    pub fn new(source: &'a str, tokens: Vec<Spanned>) -> Self {
        Self {
            source,
            tokens,
            pos: 0,
        }
    }

    fn peek(&self) -> Option<&Spanned> {
        self.tokens.get(self.pos)
    }

    fn error(&self, kind: SyntaxErrorKind, offset: usize) -> PatternSyntaxError {
        PatternSyntaxError::new(kind, offset, self.source)
    }

    fn unexpected_end(&self) -> PatternSyntaxError {
        self.error(SyntaxErrorKind::UnexpectedEnd, self.source.len())
    }

    /// Parse exactly one pattern spanning the whole token stream.
    pub fn parse(&mut self) -> Result<PatternNode, PatternSyntaxError> {
        if self.tokens.is_empty() {
            return Err(self.error(SyntaxErrorKind::Empty, 0));
        }
        let node = self.parse_node()?;
        if let Some(extra) = self.peek() {
            return Err(self.error(
                SyntaxErrorKind::UnexpectedToken(describe(&extra.token)),
                extra.offset,
            ));
        }
        Ok(node)
    }

    fn parse_node(&mut self) -> Result<PatternNode, PatternSyntaxError> {
        let Some(Spanned { token, offset }) = self.peek().cloned() else {
            return Err(self.unexpected_end());
        };

        let kind = match token {
            Token::LParen => return self.parse_sequence(offset),
            Token::LBrace => {
                self.pos += 1;
                let alts = self.parse_list(&Token::RBrace, true)?;
                PatternKind::Alternatives(alts)
            }
            Token::LBracket => {
                self.pos += 1;
                let items = self.parse_list(&Token::RBracket, false)?;
                PatternKind::Conjunction(items)
            }
            Token::Capture => {
                self.pos += 1;
                PatternKind::Capture(Box::new(self.parse_node()?))
            }
            Token::Negation => {
                self.pos += 1;
                PatternKind::Negation(Box::new(self.parse_node()?))
            }
            Token::Caret => {
                self.pos += 1;
                PatternKind::ParentRef(Box::new(self.parse_node()?))
            }
            Token::Backtick => {
                self.pos += 1;
                PatternKind::DescendRef(Box::new(self.parse_node()?))
            }
            Token::HelperCall(_) => {
                return Err(self.error(
                    SyntaxErrorKind::Unsupported("helper method calls"),
                    offset,
                ));
            }
            Token::ParamRef(_) => {
                return Err(self.error(
                    SyntaxErrorKind::Unsupported("pattern parameters"),
                    offset,
                ));
            }
            Token::RParen | Token::RBrace | Token::RBracket | Token::Pipe => {
                return Err(self.error(SyntaxErrorKind::UnexpectedToken(describe(&token)), offset));
            }
            Token::Wildcard => {
                self.pos += 1;
                PatternKind::Wildcard
            }
            Token::Rest => {
                self.pos += 1;
                PatternKind::Rest
            }
            Token::NilPredicate => {
                self.pos += 1;
                PatternKind::NilPredicate
            }
            Token::TypePredicate(name) => {
                self.pos += 1;
                PatternKind::TypePredicate(name)
            }
            Token::SymbolLiteral(name) => {
                self.pos += 1;
                PatternKind::SymbolLiteral(name)
            }
            Token::IntLiteral(n) => {
                self.pos += 1;
                PatternKind::IntLiteral(n)
            }
            Token::StringLiteral(s) => {
                self.pos += 1;
                PatternKind::StringLiteral(s)
            }
            Token::Ident(name) => {
                self.pos += 1;
                PatternKind::Ident(name)
            }
        };

        Ok(PatternNode { kind, offset })
    }

    fn parse_sequence(&mut self, offset: usize) -> Result<PatternNode, PatternSyntaxError> {
        self.pos += 1; // (
        if let Some(next) = self.peek().filter(|t| t.token == Token::RParen) {
            return Err(self.error(SyntaxErrorKind::UnexpectedToken(")".to_string()), next.offset));
        }
        let head = self.parse_node()?;
        let children = self.parse_list(&Token::RParen, false)?;
        Ok(PatternNode {
            kind: PatternKind::Sequence {
                head: Box::new(head),
                children,
            },
            offset,
        })
    }

    /// Parse elements up to and including `close`.
    fn parse_list(
        &mut self,
        close: &Token,
        allow_pipes: bool,
    ) -> Result<Vec<PatternNode>, PatternSyntaxError> {
        let mut items = Vec::new();
        loop {
            let Some(next) = self.peek() else {
                return Err(self.unexpected_end());
            };
            if &next.token == close {
                if items.is_empty() && *close != Token::RParen {
                    return Err(self.error(SyntaxErrorKind::Empty, next.offset));
                }
                self.pos += 1;
                return Ok(items);
            }
            if allow_pipes && next.token == Token::Pipe {
                self.pos += 1;
                continue;
            }
            items.push(self.parse_node()?);
        }
    }
}

impl fmt::Display for PatternNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn join(items: &[PatternNode]) -> String {
            items
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(" ")
        }

        match &self.kind {
            PatternKind::Sequence { head, children } if children.is_empty() => {
                write!(f, "({head})")
            }
            PatternKind::Sequence { head, children } => {
                write!(f, "({head} {})", join(children))
            }
            PatternKind::Alternatives(alts) => {
                let inner: Vec<String> = alts.iter().map(ToString::to_string).collect();
                write!(f, "{{{}}}", inner.join(" | "))
            }
            PatternKind::Conjunction(items) => write!(f, "[{}]", join(items)),
            PatternKind::Capture(inner) => write!(f, "${inner}"),
            PatternKind::Wildcard => f.write_str("_"),
            PatternKind::Rest => f.write_str("..."),
            PatternKind::Negation(inner) => write!(f, "!{inner}"),
            PatternKind::SymbolLiteral(s) => write!(f, ":{s}"),
            PatternKind::IntLiteral(n) => write!(f, "{n}"),
            PatternKind::StringLiteral(s) => write!(f, "{s:?}"),
            PatternKind::NilPredicate => f.write_str("nil?"),
            PatternKind::TypePredicate(t) => write!(f, "{t}?"),
            PatternKind::ParentRef(inner) => write!(f, "^{inner}"),
            PatternKind::DescendRef(inner) => write!(f, "`{inner}"),
            PatternKind::Ident(name) => f.write_str(name),
        }
    }
}
