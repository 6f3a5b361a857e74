use std::collections::HashMap;

use crate::ast::{NodeType, Tree};
use crate::cop::{Cop, Offense};

/// Walks a tree once and hands each node to the cops interested in its type.
pub struct CopWalker<'a> {
    dispatch: HashMap<NodeType, Vec<&'a dyn Cop>>,
}

impl<'a> CopWalker<'a> {
    /// Cops keep their relative order within each per-type bucket.
    pub fn new(cops: &[&'a dyn Cop]) -> Self {
        let mut dispatch: HashMap<NodeType, Vec<&'a dyn Cop>> = HashMap::new();
        for &cop in cops {
            for &node_type in cop.interested_types() {
                dispatch.entry(node_type).or_default().push(cop);
            }
        }
        Self { dispatch }
    }

    /// Visit every node in pre-order and return offenses in emission order.
    pub fn walk(&self, tree: &Tree) -> Vec<Offense> {
        let mut offenses = Vec::new();
        if self.dispatch.is_empty() {
            return offenses;
        }
        for node in tree.pre_order(tree.root()) {
            let Some(cops) = self.dispatch.get(&tree.node_type(node)) else {
                continue;
            };
            for cop in cops {
                offenses.extend(cop.check_node(tree, node));
            }
        }
        offenses
    }
}
