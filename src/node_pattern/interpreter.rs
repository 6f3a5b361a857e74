//! NodePattern interpreter: evaluates a compiled `Matcher` against a child
//! slot of a `Tree`.
//!
//! Captures are appended to a shared vector as they are bound. A branch that
//! fails rolls the vector back to where it started, so a union only keeps the
//! captures of the branch that matched.

use crate::ast::{Child, Tree};

use super::Capture;
use super::compiler::{Matcher, Rest};

/// Returns `true` if `matcher` accepts `child`. On success `captures` holds
/// every bound value in pattern-source order.
pub fn matches(matcher: &Matcher, tree: &Tree, child: &Child, captures: &mut Vec<Capture>) -> bool {
    match matcher {
        Matcher::Any => true,
        Matcher::Absent => matches!(child, Child::Absent),
        Matcher::Type(expected) => child
            .as_node()
            .is_some_and(|id| tree.node_type(id) == *expected),
        Matcher::Symbol(expected) => matches!(child, Child::Symbol(s) if s == expected),
        Matcher::Int(expected) => matches!(child, Child::Int(n) if n == expected),
        Matcher::Str(expected) => matches!(child, Child::Str(s) if s == expected),
        Matcher::Sequence {
            head,
            children,
            rest,
        } => {
            let Some(id) = child.as_node() else {
                return false;
            };
            if !head.accepts(tree.node_type(id)) {
                return false;
            }
            let actual = tree.children(id);
            let arity_ok = match rest {
                None => actual.len() == children.len(),
                Some(_) => actual.len() >= children.len(),
            };
            if !arity_ok {
                return false;
            }
            let mark = captures.len();
            for (pattern, slot) in children.iter().zip(actual) {
                if !matches(pattern, tree, slot, captures) {
                    captures.truncate(mark);
                    return false;
                }
            }
            if *rest == Some(Rest::Capture) {
                captures.push(Capture::Seq(actual[children.len()..].to_vec()));
            }
            true
        }
        Matcher::Capture(inner) => {
            // Reserve the slot first: an outer capture precedes the captures
            // nested inside it.
            let mark = captures.len();
            captures.push(Capture::One(child.clone()));
            if matches(inner, tree, child, captures) {
                true
            } else {
                captures.truncate(mark);
                false
            }
        }
        Matcher::Union(branches) => {
            let mark = captures.len();
            for branch in branches {
                if matches(branch, tree, child, captures) {
                    return true;
                }
                captures.truncate(mark);
            }
            false
        }
        Matcher::All(items) => {
            let mark = captures.len();
            for item in items {
                if !matches(item, tree, child, captures) {
                    captures.truncate(mark);
                    return false;
                }
            }
            true
        }
        Matcher::Not(inner) => {
            // The compiler rejects captures under `!`, so the scratch vector
            // stays empty.
            let mut scratch = Vec::new();
            !matches(inner, tree, child, &mut scratch)
        }
        Matcher::Parent(inner) => {
            let Some(parent) = child.as_node().and_then(|id| tree.parent(id)) else {
                return false;
            };
            matches(inner, tree, &Child::Node(parent), captures)
        }
        Matcher::Descendant(inner) => {
            let Some(id) = child.as_node() else {
                return false;
            };
            let mark = captures.len();
            for candidate in tree.pre_order(id) {
                if matches(inner, tree, &Child::Node(candidate), captures) {
                    return true;
                }
                captures.truncate(mark);
            }
            false
        }
    }
}
