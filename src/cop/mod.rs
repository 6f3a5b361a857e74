pub mod graphql;
pub mod registry;
pub mod walker;

use std::collections::HashMap;

use crate::ast::{NodeId, NodeType, Tree};
use crate::diagnostic::Severity;
use crate::node_pattern::PatternSyntaxError;

/// Per-cop configuration extracted from .rubocop.yml.
#[derive(Debug, Clone)]
pub struct CopConfig {
    pub enabled: bool,
    pub severity: Option<Severity>,
    pub exclude: Vec<String>,
    pub include: Vec<String>,
    pub options: HashMap<String, serde_yml::Value>,
}

impl Default for CopConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            severity: None,
            exclude: Vec::new(),
            include: Vec::new(),
            options: HashMap::new(),
        }
    }
}

impl CopConfig {
    /// String option such as `EnforcedStyle`, or `default` when unset.
    pub fn get_str<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.options
            .get(key)
            .and_then(|v| v.as_str())
            .unwrap_or(default)
    }
}

/// Errors raised while building a cop from its configuration.
#[derive(Debug, thiserror::Error)]
pub enum CopLoadError {
    #[error("{cop}: invalid pattern")]
    Pattern {
        cop: &'static str,
        #[source]
        source: PatternSyntaxError,
    },
    #[error("{cop}: unsupported EnforcedStyle `{value}` (expected one of: {expected})")]
    UnsupportedStyle {
        cop: &'static str,
        value: String,
        expected: &'static str,
    },
    #[error("{cop}: invalid Include/Exclude glob")]
    Glob {
        cop: &'static str,
        #[source]
        source: globset::Error,
    },
}

/// A finding reported by a cop during a walk. Locations are resolved
/// later from the node's span.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Offense {
    pub cop_name: &'static str,
    pub node: NodeId,
    pub message: String,
}

/// A lint rule. Implementations must be Send + Sync so they can be shared
/// across rayon worker threads.
pub trait Cop: Send + Sync {
    /// The fully-qualified cop name, e.g. "GraphQL/FieldDefinitions".
    fn name(&self) -> &'static str;

    fn default_severity(&self) -> Severity {
        Severity::Convention
    }

    /// Node types this cop wants `check_node` called for.
    fn interested_types(&self) -> &'static [NodeType];

    /// Called once for every node whose type is in `interested_types`.
    fn check_node(&self, tree: &Tree, node: NodeId) -> Vec<Offense>;

    fn offense(&self, node: NodeId, message: impl Into<String>) -> Offense
    where
        Self: Sized,
    {
        Offense {
            cop_name: self.name(),
            node,
            message: message.into(),
        }
    }
}
