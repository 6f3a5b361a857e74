//! Compiles a parsed `PatternNode` into an executable `Matcher` tree.
//!
//! Compilation resolves node type names, validates where `...` may appear and
//! counts capture points. A `Matcher` that comes out of here is always
//! well-formed, so the interpreter never has an error path.

use crate::ast::NodeType;

use super::parser::{PatternKind, PatternNode};
use super::{PatternSyntaxError, SyntaxErrorKind};

/// Compiled pattern element.
#[derive(Debug, Clone, PartialEq)]
pub enum Matcher {
    /// `_`
    Any,
    /// `nil?` / `nil`: the slot is empty.
    Absent,
    /// A node of the given type.
    Type(NodeType),
    Symbol(String),
    Int(i64),
    Str(String),
    Sequence {
        head: Head,
        children: Vec<Matcher>,
        rest: Option<Rest>,
    },
    Capture(Box<Matcher>),
    Union(Vec<Matcher>),
    All(Vec<Matcher>),
    Not(Box<Matcher>),
    Parent(Box<Matcher>),
    Descendant(Box<Matcher>),
}

/// Type constraint in the head position of a sequence.
#[derive(Debug, Clone, PartialEq)]
pub enum Head {
    Any,
    OneOf(Vec<NodeType>),
}

impl Head {
    pub fn accepts(&self, node_type: NodeType) -> bool {
        match self {
            Head::Any => true,
            Head::OneOf(types) => types.contains(&node_type),
        }
    }
}

/// Trailing `...` of a sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rest {
    Skip,
    Capture,
}

struct Compiler<'a> {
    source: &'a str,
}

/// Compile a pattern, returning the matcher and how many captures it yields.
pub fn compile(node: &PatternNode, source: &str) -> Result<(Matcher, usize), PatternSyntaxError> {
    Compiler { source }.compile(node)
}

impl Compiler<'_> {
    fn error(&self, kind: SyntaxErrorKind, offset: usize) -> PatternSyntaxError {
        PatternSyntaxError::new(kind, offset, self.source)
    }

    fn node_type(&self, name: &str, offset: usize) -> Result<NodeType, PatternSyntaxError> {
        NodeType::from_name(name)
            .ok_or_else(|| self.error(SyntaxErrorKind::UnknownNodeType(name.to_string()), offset))
    }

    fn compile(&self, node: &PatternNode) -> Result<(Matcher, usize), PatternSyntaxError> {
        let compiled = match &node.kind {
            PatternKind::Wildcard => (Matcher::Any, 0),
            PatternKind::NilPredicate => (Matcher::Absent, 0),
            PatternKind::Ident(name) if name == "nil" => (Matcher::Absent, 0),
            PatternKind::Ident(name) | PatternKind::TypePredicate(name) => {
                (Matcher::Type(self.node_type(name, node.offset)?), 0)
            }
            PatternKind::SymbolLiteral(s) => (Matcher::Symbol(s.clone()), 0),
            PatternKind::IntLiteral(n) => (Matcher::Int(*n), 0),
            PatternKind::StringLiteral(s) => (Matcher::Str(s.clone()), 0),
            PatternKind::Rest => {
                return Err(self.error(SyntaxErrorKind::RestOutsideSequence, node.offset));
            }
            PatternKind::Capture(inner) => {
                if inner.kind == PatternKind::Rest {
                    return Err(self.error(SyntaxErrorKind::RestOutsideSequence, inner.offset));
                }
                let (matcher, count) = self.compile(inner)?;
                (Matcher::Capture(Box::new(matcher)), count + 1)
            }
            PatternKind::Negation(inner) => {
                let (matcher, count) = self.compile(inner)?;
                if count > 0 {
                    return Err(self.error(SyntaxErrorKind::CaptureInNegation, node.offset));
                }
                (Matcher::Not(Box::new(matcher)), 0)
            }
            PatternKind::ParentRef(inner) => {
                let (matcher, count) = self.compile(inner)?;
                (Matcher::Parent(Box::new(matcher)), count)
            }
            PatternKind::DescendRef(inner) => {
                let (matcher, count) = self.compile(inner)?;
                (Matcher::Descendant(Box::new(matcher)), count)
            }
            PatternKind::Alternatives(branches) => {
                let mut matchers = Vec::with_capacity(branches.len());
                let mut expected = None;
                for branch in branches {
                    let (matcher, count) = self.compile(branch)?;
                    match expected {
                        None => expected = Some(count),
                        Some(n) if n != count => {
                            return Err(
                                self.error(SyntaxErrorKind::UnevenUnionCaptures, branch.offset)
                            );
                        }
                        Some(_) => {}
                    }
                    matchers.push(matcher);
                }
                (Matcher::Union(matchers), expected.unwrap_or(0))
            }
            PatternKind::Conjunction(items) => {
                let mut matchers = Vec::with_capacity(items.len());
                let mut total = 0;
                for item in items {
                    let (matcher, count) = self.compile(item)?;
                    matchers.push(matcher);
                    total += count;
                }
                (Matcher::All(matchers), total)
            }
            PatternKind::Sequence { head, children } => self.sequence(head, children)?,
        };
        Ok(compiled)
    }

    fn head(&self, head: &PatternNode) -> Result<Head, PatternSyntaxError> {
        match &head.kind {
            PatternKind::Wildcard => Ok(Head::Any),
            PatternKind::Ident(name) | PatternKind::TypePredicate(name) => {
                Ok(Head::OneOf(vec![self.node_type(name, head.offset)?]))
            }
            PatternKind::Alternatives(branches) => {
                let mut types = Vec::with_capacity(branches.len());
                for branch in branches {
                    match &branch.kind {
                        PatternKind::Ident(name) | PatternKind::TypePredicate(name) => {
                            types.push(self.node_type(name, branch.offset)?);
                        }
                        _ => {
                            return Err(
                                self.error(SyntaxErrorKind::InvalidSequenceHead, branch.offset)
                            );
                        }
                    }
                }
                Ok(Head::OneOf(types))
            }
            _ => Err(self.error(SyntaxErrorKind::InvalidSequenceHead, head.offset)),
        }
    }

    fn sequence(
        &self,
        head: &PatternNode,
        children: &[PatternNode],
    ) -> Result<(Matcher, usize), PatternSyntaxError> {
        let head = self.head(head)?;
        let mut matchers = Vec::with_capacity(children.len());
        let mut rest = None;
        let mut count = 0;

        for (idx, child) in children.iter().enumerate() {
            let is_last = idx + 1 == children.len();
            let rest_here = match &child.kind {
                PatternKind::Rest => Some(Rest::Skip),
                PatternKind::Capture(inner) if inner.kind == PatternKind::Rest => {
                    Some(Rest::Capture)
                }
                _ => None,
            };
            if let Some(mode) = rest_here {
                if !is_last {
                    return Err(self.error(SyntaxErrorKind::RestNotLast, child.offset));
                }
                if mode == Rest::Capture {
                    count += 1;
                }
                rest = Some(mode);
                continue;
            }
            let (matcher, n) = self.compile(child)?;
            matchers.push(matcher);
            count += n;
        }

        Ok((
            Matcher::Sequence {
                head,
                children: matchers,
                rest,
            },
            count,
        ))
    }
}
