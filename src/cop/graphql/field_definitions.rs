use crate::ast::{Child, NodeId, NodeType, Tree};
use crate::cop::walker::CopWalker;
use crate::cop::{Cop, CopConfig, CopLoadError, Offense};
use crate::node_pattern::{Capture, NodePattern};

pub const NAME: &str = "GraphQL/FieldDefinitions";

const GROUP_MSG: &str = "Group all field definitions together.";
const RESOLVER_MSG: &str = "Define resolver method after field definition.";

/// Keyword arguments that point the field somewhere other than a method of
/// the same name.
const EXPLICIT_RESOLVER_KEYS: &[&str] = &["resolver", "method", "hash_key"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FieldDefinitionsStyle {
    /// Field declarations form one uninterrupted run.
    #[default]
    GroupDefinitions,
    /// Each field's resolver method comes right after the field.
    ResolverAfterDefinition,
}

impl FieldDefinitionsStyle {
    pub const EXPECTED: &'static str = "group_definitions, resolver_after_definition";

    pub fn as_str(self) -> &'static str {
        match self {
            FieldDefinitionsStyle::GroupDefinitions => "group_definitions",
            FieldDefinitionsStyle::ResolverAfterDefinition => "resolver_after_definition",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "group_definitions" => Some(FieldDefinitionsStyle::GroupDefinitions),
            "resolver_after_definition" => Some(FieldDefinitionsStyle::ResolverAfterDefinition),
            _ => None,
        }
    }
}

struct Patterns {
    field: NodePattern,
    field_with_body: NodePattern,
    field_name: NodePattern,
    field_args: NodePattern,
    kwargs: NodePattern,
    pair: NodePattern,
    sym_value: NodePattern,
}

impl Patterns {
    fn compile() -> Result<Self, CopLoadError> {
        let compile = |src: &str| {
            NodePattern::compile(src).map_err(|source| CopLoadError::Pattern { cop: NAME, source })
        };
        Ok(Self {
            field: compile("(send nil? :field ...)")?,
            field_with_body: compile("(block (send nil? :field ...) ...)")?,
            field_name: compile("(send nil? :field {(sym $_) (str $_)} ...)")?,
            field_args: compile("(send nil? :field $...)")?,
            kwargs: compile("(hash $...)")?,
            pair: compile("(pair (sym $_) $_)")?,
            sym_value: compile("(sym $_)")?,
        })
    }
}

/// Checks how GraphQL type classes lay out `field` declarations.
///
/// With `group_definitions`, all fields sharing a body must be contiguous:
///
/// ```ruby
/// # bad
/// field :first_name, String
/// def first_name; end
/// field :last_name, String
///
/// # good
/// field :first_name, String
/// field :last_name, String
/// def first_name; end
/// ```
///
/// With `resolver_after_definition`, a field's resolver method must directly
/// follow the field. Fields with `resolver:`, `method:` or `hash_key:` are
/// skipped, and `resolver_method:` renames the expected method.
pub struct FieldDefinitions {
    style: FieldDefinitionsStyle,
    patterns: Patterns,
}

impl FieldDefinitions {
    pub fn new(style: FieldDefinitionsStyle) -> Result<Self, CopLoadError> {
        Ok(Self {
            style,
            patterns: Patterns::compile()?,
        })
    }

    pub fn from_config(config: &CopConfig) -> Result<Self, CopLoadError> {
        let value = config.get_str("EnforcedStyle", FieldDefinitionsStyle::default().as_str());
        let style =
            FieldDefinitionsStyle::from_name(value).ok_or_else(|| CopLoadError::UnsupportedStyle {
                cop: NAME,
                value: value.to_string(),
                expected: FieldDefinitionsStyle::EXPECTED,
            })?;
        Self::new(style)
    }

    pub fn style(&self) -> FieldDefinitionsStyle {
        self.style
    }

    /// Walk `tree` with this cop alone.
    pub fn check(&self, tree: &Tree) -> Vec<Offense> {
        let cops: [&dyn Cop; 1] = [self];
        CopWalker::new(&cops).walk(tree)
    }

    /// The node that stands for the field among its siblings: the `block`
    /// when the call has a literal body, otherwise the call itself.
    fn field_statement(&self, tree: &Tree, send: NodeId) -> NodeId {
        match tree.parent(send) {
            Some(parent)
                if tree.sibling_index(send) == 0
                    && self.patterns.field_with_body.matches(tree, parent) =>
            {
                parent
            }
            _ => send,
        }
    }

    fn is_field_statement(&self, tree: &Tree, node: NodeId) -> bool {
        self.patterns.field.matches(tree, node) || self.patterns.field_with_body.matches(tree, node)
    }

    fn check_grouping(&self, tree: &Tree, statement: NodeId) -> Option<Offense> {
        let parent = tree.parent(statement)?;
        let fields: Vec<NodeId> = tree
            .child_nodes(parent)
            .filter(|&n| self.is_field_statement(tree, n))
            .collect();
        let first = tree.sibling_index(*fields.first()?);
        let idx = fields.iter().position(|&n| n == statement)?;
        if tree.sibling_index(statement) != first + idx {
            return Some(self.offense(statement, GROUP_MSG));
        }
        None
    }

    /// `(key, value)` of each `key: value` pair in the trailing keyword hash.
    fn keyword_arguments(&self, tree: &Tree, send: NodeId) -> Vec<(String, Child)> {
        let Some(args) = self.patterns.field_args.match_node(tree, send).captures() else {
            return Vec::new();
        };
        let Some(last) = args.first().and_then(|c| c.as_seq()).and_then(|s| s.last()) else {
            return Vec::new();
        };
        let Some(pairs) = self.patterns.kwargs.match_child(tree, last).captures() else {
            return Vec::new();
        };
        let Some(pairs) = pairs.first().and_then(|c| c.as_seq()) else {
            return Vec::new();
        };

        pairs
            .iter()
            .filter_map(|pair| {
                let captures = self.patterns.pair.match_child(tree, pair).captures()?;
                let key = captures.first()?.as_name()?.to_string();
                let value = match captures.get(1)? {
                    Capture::One(child) => child.clone(),
                    Capture::Seq(_) => return None,
                };
                Some((key, value))
            })
            .collect()
    }

    fn resolver_method_name(&self, tree: &Tree, send: NodeId) -> Option<String> {
        let kwargs = self.keyword_arguments(tree, send);
        if kwargs
            .iter()
            .any(|(key, _)| EXPLICIT_RESOLVER_KEYS.contains(&key.as_str()))
        {
            return None;
        }

        let renamed = kwargs
            .iter()
            .find(|(key, _)| key == "resolver_method")
            .and_then(|(_, value)| self.patterns.sym_value.match_child(tree, value).captures())
            .and_then(|c| c.first().and_then(|v| v.as_name()).map(str::to_string));
        if renamed.is_some() {
            return renamed;
        }

        let captures = self.patterns.field_name.match_node(tree, send).captures()?;
        captures.first()?.as_name().map(str::to_string)
    }

    fn check_resolver(&self, tree: &Tree, send: NodeId, statement: NodeId) -> Option<Offense> {
        let expected = self.resolver_method_name(tree, send)?;
        let parent = tree.parent(statement)?;
        let method = tree.child_nodes(parent).find(|&n| {
            tree.node_type(n) == NodeType::Def && tree.method_name(n) == Some(expected.as_str())
        })?;

        let distance = tree.sibling_index(method) as isize - tree.sibling_index(statement) as isize;
        if distance > 1 {
            return Some(self.offense(statement, RESOLVER_MSG));
        }
        None
    }
}

impl Cop for FieldDefinitions {
    fn name(&self) -> &'static str {
        NAME
    }

    fn interested_types(&self) -> &'static [NodeType] {
        &[NodeType::Send]
    }

    fn check_node(&self, tree: &Tree, node: NodeId) -> Vec<Offense> {
        if !self.patterns.field.matches(tree, node) {
            return Vec::new();
        }
        let statement = self.field_statement(tree, node);
        let offense = match self.style {
            FieldDefinitionsStyle::GroupDefinitions => self.check_grouping(tree, statement),
            FieldDefinitionsStyle::ResolverAfterDefinition => {
                self.check_resolver(tree, node, statement)
            }
        };
        offense.into_iter().collect()
    }
}

/// Run `GraphQL/FieldDefinitions` with the given style over a whole tree.
///
/// # Panics
///
/// Panics if the built-in patterns fail to compile, which the unit tests
/// rule out.
pub fn check(tree: &Tree, style: FieldDefinitionsStyle) -> Vec<Offense> {
    FieldDefinitions::new(style)
        .expect("GraphQL/FieldDefinitions patterns should compile")
        .check(tree)
}
