//! Arena-held AST in Parser-gem shape.
//!
//! Every node lives in a `Tree` and is addressed by a `NodeId`. Parent links
//! are plain indices, so the tree owns all of its nodes and nothing points
//! back with ownership. Trees are assembled bottom-up with `TreeBuilder` and
//! are read-only once finished.

pub mod lower;

use std::fmt;

pub use lower::lower_program;

/// Index of a node inside its `Tree`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Byte range of a node in its source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub const fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }
}

/// One positional child slot.
///
/// Parser-gem children are heterogeneous: a `send` holds its receiver (or
/// nothing), the method name as a bare symbol, then argument nodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Child {
    Node(NodeId),
    /// An empty slot, e.g. a call without an explicit receiver.
    Absent,
    Symbol(String),
    Str(String),
    Int(i64),
}

impl Child {
    pub fn as_node(&self) -> Option<NodeId> {
        match self {
            Child::Node(id) => Some(*id),
            _ => None,
        }
    }

    pub fn as_symbol(&self) -> Option<&str> {
        match self {
            Child::Symbol(s) => Some(s),
            _ => None,
        }
    }

    /// Symbol or string value, whichever this slot carries.
    pub fn as_name(&self) -> Option<&str> {
        match self {
            Child::Symbol(s) | Child::Str(s) => Some(s),
            _ => None,
        }
    }
}

macro_rules! node_types {
    ($($variant:ident => $name:literal),+ $(,)?) => {
        /// Node type tags, named after the Parser gem's node types.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum NodeType {
            $($variant),+
        }

        impl NodeType {
            pub const ALL: &'static [NodeType] = &[$(NodeType::$variant),+];

            pub fn as_str(self) -> &'static str {
                match self {
                    $(NodeType::$variant => $name),+
                }
            }

            /// Look up a type by its NodePattern name (`send`, `sym`, ...).
            pub fn from_name(name: &str) -> Option<NodeType> {
                match name {
                    $($name => Some(NodeType::$variant),)+
                    _ => None,
                }
            }
        }
    };
}

node_types! {
    Send => "send",
    Csend => "csend",
    Block => "block",
    BlockPass => "block_pass",
    Sym => "sym",
    Dsym => "dsym",
    Str => "str",
    Dstr => "dstr",
    Int => "int",
    Float => "float",
    Regexp => "regexp",
    Array => "array",
    Hash => "hash",
    Pair => "pair",
    Kwsplat => "kwsplat",
    Splat => "splat",
    Def => "def",
    Defs => "defs",
    Args => "args",
    Arg => "arg",
    Optarg => "optarg",
    Class => "class",
    Module => "module",
    Sclass => "sclass",
    Begin => "begin",
    Const => "const",
    Cbase => "cbase",
    Lvar => "lvar",
    Ivar => "ivar",
    Cvar => "cvar",
    Gvar => "gvar",
    Lvasgn => "lvasgn",
    Ivasgn => "ivasgn",
    Casgn => "casgn",
    True => "true",
    False => "false",
    Nil => "nil",
    SelfRef => "self",
    If => "if",
    Case => "case",
    When => "when",
    While => "while",
    Until => "until",
    For => "for",
    Kwbegin => "kwbegin",
    Rescue => "rescue",
    Resbody => "resbody",
    Ensure => "ensure",
    And => "and",
    Or => "or",
    Return => "return",
    Yield => "yield",
    Super => "super",
    Zsuper => "zsuper",
    Lambda => "lambda",
    Other => "other",
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TreeError {
    #[error("node {0:?} does not belong to this builder")]
    UnknownNode(NodeId),
    #[error("node {0:?} already has a parent")]
    AlreadyAttached(NodeId),
    #[error("root node {0:?} is attached to a parent")]
    RootHasParent(NodeId),
}

#[derive(Debug, Clone)]
struct NodeData {
    node_type: NodeType,
    children: Vec<Child>,
    parent: Option<NodeId>,
    sibling_index: usize,
    span: Span,
}

/// Bottom-up tree construction. Children must be pushed before the node that
/// adopts them; adoption records the parent link and sibling index.
#[derive(Debug, Default)]
pub struct TreeBuilder {
    nodes: Vec<NodeData>,
}

impl TreeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(
        &mut self,
        node_type: NodeType,
        children: Vec<Child>,
        span: Span,
    ) -> Result<NodeId, TreeError> {
        let id = NodeId(self.nodes.len() as u32);
        // Validate everything before linking so a rejected push leaves the
        // builder untouched.
        let mut adopted: Vec<NodeId> = Vec::new();
        for child_id in children.iter().filter_map(Child::as_node) {
            let data = self
                .nodes
                .get(child_id.index())
                .ok_or(TreeError::UnknownNode(child_id))?;
            if data.parent.is_some() || adopted.contains(&child_id) {
                return Err(TreeError::AlreadyAttached(child_id));
            }
            adopted.push(child_id);
        }
        for (idx, child) in children.iter().enumerate() {
            if let Child::Node(child_id) = child {
                let data = &mut self.nodes[child_id.index()];
                data.parent = Some(id);
                data.sibling_index = idx;
            }
        }
        self.nodes.push(NodeData {
            node_type,
            children,
            parent: None,
            sibling_index: 0,
            span,
        });
        Ok(id)
    }

    /// Convenience for nodes without children.
    pub fn leaf(&mut self, node_type: NodeType, span: Span) -> Result<NodeId, TreeError> {
        self.push(node_type, Vec::new(), span)
    }

    pub fn finish(self, root: NodeId) -> Result<Tree, TreeError> {
        let data = self
            .nodes
            .get(root.index())
            .ok_or(TreeError::UnknownNode(root))?;
        if data.parent.is_some() {
            return Err(TreeError::RootHasParent(root));
        }
        Ok(Tree {
            nodes: self.nodes,
            root,
        })
    }
}

/// An immutable syntax tree.
#[derive(Debug, Clone)]
pub struct Tree {
    nodes: Vec<NodeData>,
    root: NodeId,
}

impl Tree {
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Number of nodes in the arena, including any left unattached.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn data(&self, id: NodeId) -> &NodeData {
        // NodeIds are only minted by the builder that produced this tree.
        &self.nodes[id.index()]
    }

    pub fn node_type(&self, id: NodeId) -> NodeType {
        self.data(id).node_type
    }

    pub fn children(&self, id: NodeId) -> &[Child] {
        &self.data(id).children
    }

    /// Child slots that hold nodes, in sibling order.
    pub fn child_nodes(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.children(id).iter().filter_map(Child::as_node)
    }

    pub fn child(&self, id: NodeId, index: usize) -> Option<&Child> {
        self.children(id).get(index)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.data(id).parent
    }

    pub fn sibling_index(&self, id: NodeId) -> usize {
        self.data(id).sibling_index
    }

    pub fn span(&self, id: NodeId) -> Span {
        self.data(id).span
    }

    /// Name of a `def` or `defs` node; `None` for anything else.
    pub fn method_name(&self, id: NodeId) -> Option<&str> {
        let slot = match self.node_type(id) {
            NodeType::Def => 0,
            NodeType::Defs => 1,
            _ => return None,
        };
        self.child(id, slot).and_then(Child::as_symbol)
    }

    /// Method name of a `send`/`csend` node.
    pub fn send_method_name(&self, id: NodeId) -> Option<&str> {
        match self.node_type(id) {
            NodeType::Send | NodeType::Csend => self.child(id, 1).and_then(Child::as_symbol),
            _ => None,
        }
    }

    /// Value of a `sym` or `str` literal node.
    pub fn literal_name(&self, id: NodeId) -> Option<&str> {
        match self.node_type(id) {
            NodeType::Sym | NodeType::Str => self.child(id, 0).and_then(Child::as_name),
            _ => None,
        }
    }

    /// Source text covered by a node.
    pub fn source_text<'s>(&self, id: NodeId, source: &'s [u8]) -> &'s [u8] {
        let span = self.span(id);
        source.get(span.start..span.end).unwrap_or_default()
    }

    /// Iterate `start` and its descendants, parents before children and
    /// children in sibling order.
    pub fn pre_order(&self, start: NodeId) -> PreOrder<'_> {
        PreOrder {
            tree: self,
            stack: vec![start],
        }
    }

    /// Chain of ancestors from the parent of `id` up to the root.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(id), move |&n| self.parent(n))
    }

    /// Render as an S-expression, mostly useful in test failures.
    pub fn to_sexp(&self, id: NodeId) -> String {
        let mut out = format!("({}", self.node_type(id));
        for child in self.children(id) {
            out.push(' ');
            match child {
                Child::Node(c) => out.push_str(&self.to_sexp(*c)),
                Child::Absent => out.push_str("nil"),
                Child::Symbol(s) => {
                    out.push(':');
                    out.push_str(s);
                }
                Child::Str(s) => out.push_str(&format!("{s:?}")),
                Child::Int(n) => out.push_str(&n.to_string()),
            }
        }
        out.push(')');
        out
    }
}

pub struct PreOrder<'t> {
    tree: &'t Tree,
    stack: Vec<NodeId>,
}

impl Iterator for PreOrder<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.stack.pop()?;
        let children = self.tree.children(id);
        self.stack
            .extend(children.iter().rev().filter_map(Child::as_node));
        Some(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sym(b: &mut TreeBuilder, name: &str) -> NodeId {
        b.push(NodeType::Sym, vec![Child::Symbol(name.into())], Span::default())
            .unwrap()
    }

    fn sample() -> Tree {
        let mut b = TreeBuilder::new();
        let name = sym(&mut b, "name");
        let field = b
            .push(
                NodeType::Send,
                vec![Child::Absent, Child::Symbol("field".into()), Child::Node(name)],
                Span::new(0, 11),
            )
            .unwrap();
        let args = b.leaf(NodeType::Args, Span::default()).unwrap();
        let def = b
            .push(
                NodeType::Def,
                vec![Child::Symbol("name".into()), Child::Node(args), Child::Absent],
                Span::new(12, 24),
            )
            .unwrap();
        let body = b
            .push(
                NodeType::Begin,
                vec![Child::Node(field), Child::Node(def)],
                Span::new(0, 24),
            )
            .unwrap();
        b.finish(body).unwrap()
    }

    #[test]
    fn parent_and_sibling_index_are_consistent() {
        let tree = sample();
        for id in tree.pre_order(tree.root()) {
            let Some(parent) = tree.parent(id) else {
                assert_eq!(id, tree.root());
                continue;
            };
            assert_eq!(
                tree.children(parent)[tree.sibling_index(id)],
                Child::Node(id)
            );
        }
    }

    #[test]
    fn pre_order_visits_parents_first() {
        let tree = sample();
        let order: Vec<NodeType> = tree.pre_order(tree.root()).map(|n| tree.node_type(n)).collect();
        assert_eq!(
            order,
            vec![
                NodeType::Begin,
                NodeType::Send,
                NodeType::Sym,
                NodeType::Def,
                NodeType::Args
            ]
        );
    }

    #[test]
    fn method_name_only_for_defs() {
        let tree = sample();
        let kids: Vec<NodeId> = tree.child_nodes(tree.root()).collect();
        assert_eq!(tree.method_name(kids[1]), Some("name"));
        assert_eq!(tree.method_name(kids[0]), None);
        assert_eq!(tree.send_method_name(kids[0]), Some("field"));
    }

    #[test]
    fn sexp_rendering() {
        let tree = sample();
        assert_eq!(
            tree.to_sexp(tree.root()),
            "(begin (send nil :field (sym :name)) (def :name (args) nil))"
        );
    }

    #[test]
    fn double_adoption_is_rejected() {
        let mut b = TreeBuilder::new();
        let leaf = b.leaf(NodeType::Nil, Span::default()).unwrap();
        b.push(NodeType::Begin, vec![Child::Node(leaf)], Span::default())
            .unwrap();
        let err = b
            .push(NodeType::Begin, vec![Child::Node(leaf)], Span::default())
            .unwrap_err();
        assert_eq!(err, TreeError::AlreadyAttached(leaf));
    }

    #[test]
    fn attached_root_is_rejected() {
        let mut b = TreeBuilder::new();
        let leaf = b.leaf(NodeType::Nil, Span::default()).unwrap();
        b.push(NodeType::Begin, vec![Child::Node(leaf)], Span::default())
            .unwrap();
        assert_eq!(b.finish(leaf).unwrap_err(), TreeError::RootHasParent(leaf));
    }

    #[test]
    fn node_type_names_round_trip() {
        for &ty in NodeType::ALL {
            assert_eq!(NodeType::from_name(ty.as_str()), Some(ty));
        }
        assert_eq!(NodeType::from_name("nope"), None);
    }
}
