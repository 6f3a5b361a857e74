//! Lowering from Prism's AST into the Parser-gem shaped `Tree`.
//!
//! Node kinds that cops and patterns care about get their exact Parser-gem
//! child layout (`send`, `block`, `def`, `class`, `hash`, `pair`, literals,
//! constants, variables, and the `if`/`case`/`while`/`begin`/`rescue`
//! control structures). Everything else keeps its node children in source
//! order under a best-effort type tag, so walks still reach every node.

use ruby_prism::Visit;

use super::{Child, NodeId, NodeType, Span, Tree, TreeBuilder, TreeError};

/// Lower a whole Prism parse result. The root is the single top-level
/// statement, or a `begin` holding all of them.
pub fn lower_program(result: &ruby_prism::ParseResult<'_>) -> Result<Tree, TreeError> {
    let mut lowering = Lowering {
        builder: TreeBuilder::new(),
    };
    let root = lowering.lower(&result.node())?;
    lowering.builder.finish(root)
}

struct Lowering {
    builder: TreeBuilder,
}

fn span_of(loc: &ruby_prism::Location<'_>) -> Span {
    Span::new(loc.start_offset(), loc.end_offset())
}

fn name_of(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

/// Collects the direct node children of one node.
///
/// Prism only exposes children through typed accessors or full visits; the
/// depth counter keeps the first level of a full visit.
struct DirectChildren<'pr> {
    depth: usize,
    found: Vec<ruby_prism::Node<'pr>>,
}

impl<'pr> Visit<'pr> for DirectChildren<'pr> {
    fn visit_branch_node_enter(&mut self, node: ruby_prism::Node<'pr>) {
        if self.depth == 1 {
            self.found.push(node);
        }
        self.depth += 1;
    }

    fn visit_branch_node_leave(&mut self) {
        self.depth -= 1;
    }

    fn visit_leaf_node_enter(&mut self, node: ruby_prism::Node<'pr>) {
        if self.depth == 1 {
            self.found.push(node);
        }
    }

    // Prism visits fields of a concrete node kind without the enter/leave
    // hooks. These kinds have their own lowering, so keep them as one child.
    fn visit_statements_node(&mut self, node: &ruby_prism::StatementsNode<'pr>) {
        self.field(node.as_node());
    }

    fn visit_else_node(&mut self, node: &ruby_prism::ElseNode<'pr>) {
        self.field(node.as_node());
    }

    fn visit_rescue_node(&mut self, node: &ruby_prism::RescueNode<'pr>) {
        self.field(node.as_node());
    }

    fn visit_ensure_node(&mut self, node: &ruby_prism::EnsureNode<'pr>) {
        self.field(node.as_node());
    }
}

impl<'pr> DirectChildren<'pr> {
    fn field(&mut self, node: ruby_prism::Node<'pr>) {
        if self.depth == 1 {
            self.found.push(node);
        }
    }
}

/// End of one rescue clause, excluding the clauses chained after it.
fn resbody_end(rescue: &ruby_prism::RescueNode<'_>) -> usize {
    if let Some(stmts) = rescue.statements() {
        return stmts.location().end_offset();
    }
    if let Some(reference) = rescue.reference() {
        return reference.location().end_offset();
    }
    rescue
        .exceptions()
        .iter()
        .last()
        .map_or(rescue.keyword_loc().end_offset(), |n| n.location().end_offset())
}

/// Type tag for node kinds lowered without a dedicated layout.
fn generic_type(node: &ruby_prism::Node<'_>) -> NodeType {
    match node {
        ruby_prism::Node::ParametersNode { .. } => NodeType::Args,
        ruby_prism::Node::BlockParametersNode { .. } => NodeType::Args,
        ruby_prism::Node::BlockArgumentNode { .. } => NodeType::BlockPass,
        ruby_prism::Node::SplatNode { .. } => NodeType::Splat,
        ruby_prism::Node::InterpolatedStringNode { .. } => NodeType::Dstr,
        ruby_prism::Node::InterpolatedSymbolNode { .. } => NodeType::Dsym,
        ruby_prism::Node::AndNode { .. } => NodeType::And,
        ruby_prism::Node::OrNode { .. } => NodeType::Or,
        ruby_prism::Node::ReturnNode { .. } => NodeType::Return,
        ruby_prism::Node::YieldNode { .. } => NodeType::Yield,
        ruby_prism::Node::SuperNode { .. } => NodeType::Super,
        ruby_prism::Node::ForwardingSuperNode { .. } => NodeType::Zsuper,
        ruby_prism::Node::LambdaNode { .. } => NodeType::Lambda,
        _ => NodeType::Other,
    }
}

impl Lowering {
    fn push(
        &mut self,
        node_type: NodeType,
        children: Vec<Child>,
        span: Span,
    ) -> Result<NodeId, TreeError> {
        self.builder.push(node_type, children, span)
    }

    fn optional(&mut self, node: Option<ruby_prism::Node<'_>>) -> Result<Child, TreeError> {
        match node {
            Some(n) => Ok(Child::Node(self.lower(&n)?)),
            None => Ok(Child::Absent),
        }
    }

    fn lower_all<'pr>(
        &mut self,
        nodes: impl Iterator<Item = ruby_prism::Node<'pr>>,
    ) -> Result<Vec<Child>, TreeError> {
        nodes.map(|n| self.lower(&n).map(Child::Node)).collect()
    }

    /// A statement list collapses to its only statement, as in the Parser gem.
    fn statements(
        &mut self,
        stmts: &ruby_prism::StatementsNode<'_>,
        span: Span,
    ) -> Result<NodeId, TreeError> {
        let body: Vec<ruby_prism::Node<'_>> = stmts.body().iter().collect();
        if let [only] = body.as_slice() {
            return self.lower(only);
        }
        let children = self.lower_all(body.into_iter())?;
        self.push(NodeType::Begin, children, span)
    }

    /// Body slot of a control structure: absent, one statement, or `begin`.
    fn body(
        &mut self,
        stmts: Option<ruby_prism::StatementsNode<'_>>,
    ) -> Result<Child, TreeError> {
        match stmts {
            Some(s) => Ok(Child::Node(self.statements(&s, span_of(&s.location()))?)),
            None => Ok(Child::Absent),
        }
    }

    fn else_body(
        &mut self,
        clause: Option<ruby_prism::ElseNode<'_>>,
    ) -> Result<Child, TreeError> {
        match clause {
            Some(e) => self.body(e.statements()),
            None => Ok(Child::Absent),
        }
    }

    fn generic(
        &mut self,
        node: &ruby_prism::Node<'_>,
        node_type: NodeType,
        span: Span,
    ) -> Result<NodeId, TreeError> {
        let mut collector = DirectChildren {
            depth: 0,
            found: Vec::new(),
        };
        collector.visit(node);
        let children = self.lower_all(collector.found.into_iter())?;
        self.push(node_type, children, span)
    }

    fn empty_args(&mut self, at: usize) -> Result<NodeId, TreeError> {
        self.builder.leaf(NodeType::Args, Span::new(at, at))
    }

    fn lower(&mut self, node: &ruby_prism::Node<'_>) -> Result<NodeId, TreeError> {
        let span = span_of(&node.location());

        if let Some(program) = node.as_program_node() {
            return self.statements(&program.statements(), span);
        }
        if let Some(stmts) = node.as_statements_node() {
            return self.statements(&stmts, span);
        }
        if let Some(call) = node.as_call_node() {
            return self.call(&call, span);
        }
        if let Some(if_node) = node.as_if_node() {
            let cond = Child::Node(self.lower(&if_node.predicate())?);
            let then = self.body(if_node.statements())?;
            let otherwise = match if_node.subsequent() {
                Some(next) => match next.as_else_node() {
                    Some(e) => self.body(e.statements())?,
                    None => Child::Node(self.lower(&next)?),
                },
                None => Child::Absent,
            };
            return self.push(NodeType::If, vec![cond, then, otherwise], span);
        }
        if let Some(unless) = node.as_unless_node() {
            let cond = Child::Node(self.lower(&unless.predicate())?);
            let then = self.body(unless.statements())?;
            let otherwise = self.else_body(unless.else_clause())?;
            return self.push(NodeType::If, vec![cond, otherwise, then], span);
        }
        if let Some(w) = node.as_while_node() {
            let cond = Child::Node(self.lower(&w.predicate())?);
            let body = self.body(w.statements())?;
            return self.push(NodeType::While, vec![cond, body], span);
        }
        if let Some(u) = node.as_until_node() {
            let cond = Child::Node(self.lower(&u.predicate())?);
            let body = self.body(u.statements())?;
            return self.push(NodeType::Until, vec![cond, body], span);
        }
        if let Some(f) = node.as_for_node() {
            let index = Child::Node(self.lower(&f.index())?);
            let collection = Child::Node(self.lower(&f.collection())?);
            let body = self.body(f.statements())?;
            return self.push(NodeType::For, vec![index, collection, body], span);
        }
        if let Some(case) = node.as_case_node() {
            let mut children = vec![self.optional(case.predicate())?];
            children.extend(self.lower_all(case.conditions().iter())?);
            children.push(self.else_body(case.else_clause())?);
            return self.push(NodeType::Case, children, span);
        }
        if let Some(when) = node.as_when_node() {
            let mut children = self.lower_all(when.conditions().iter())?;
            children.push(self.body(when.statements())?);
            return self.push(NodeType::When, children, span);
        }
        if let Some(begin) = node.as_begin_node() {
            return self.begin(&begin, span);
        }
        if let Some(parens) = node.as_parentheses_node() {
            let children = match parens.body() {
                Some(body) => match body.as_statements_node() {
                    Some(stmts) => self.lower_all(stmts.body().iter())?,
                    None => vec![Child::Node(self.lower(&body)?)],
                },
                None => Vec::new(),
            };
            return self.push(NodeType::Begin, children, span);
        }
        if let Some(e) = node.as_else_node() {
            return match e.statements() {
                Some(stmts) => self.statements(&stmts, span),
                None => self.builder.leaf(NodeType::Begin, span),
            };
        }
        if let Some(rescue) = node.as_rescue_node() {
            return self.resbody(&rescue);
        }
        if let Some(ensure) = node.as_ensure_node() {
            return match ensure.statements() {
                Some(stmts) => self.statements(&stmts, span),
                None => self.builder.leaf(NodeType::Begin, span),
            };
        }
        if let Some(class) = node.as_class_node() {
            let name = Child::Node(self.lower(&class.constant_path())?);
            let superclass = self.optional(class.superclass())?;
            let body = self.optional(class.body())?;
            return self.push(NodeType::Class, vec![name, superclass, body], span);
        }
        if let Some(module) = node.as_module_node() {
            let name = Child::Node(self.lower(&module.constant_path())?);
            let body = self.optional(module.body())?;
            return self.push(NodeType::Module, vec![name, body], span);
        }
        if let Some(sclass) = node.as_singleton_class_node() {
            let target = Child::Node(self.lower(&sclass.expression())?);
            let body = self.optional(sclass.body())?;
            return self.push(NodeType::Sclass, vec![target, body], span);
        }
        if let Some(def) = node.as_def_node() {
            let name = Child::Symbol(name_of(def.name().as_slice()));
            let args = match def.parameters() {
                Some(params) => self.lower(&params.as_node())?,
                None => self.empty_args(span.start)?,
            };
            let body = self.optional(def.body())?;
            return match def.receiver() {
                Some(receiver) => {
                    let receiver = Child::Node(self.lower(&receiver)?);
                    self.push(
                        NodeType::Defs,
                        vec![receiver, name, Child::Node(args), body],
                        span,
                    )
                }
                None => self.push(NodeType::Def, vec![name, Child::Node(args), body], span),
            };
        }
        if let Some(params) = node.as_block_parameters_node() {
            return match params.parameters() {
                Some(inner) => self.lower(&inner.as_node()),
                None => self.empty_args(span.start),
            };
        }
        if let Some(sym) = node.as_symbol_node() {
            let value = Child::Symbol(name_of(sym.unescaped()));
            return self.push(NodeType::Sym, vec![value], span);
        }
        if let Some(s) = node.as_string_node() {
            let value = Child::Str(name_of(s.unescaped()));
            return self.push(NodeType::Str, vec![value], span);
        }
        if let Some(re) = node.as_regular_expression_node() {
            let value = Child::Str(name_of(re.unescaped()));
            return self.push(NodeType::Regexp, vec![value], span);
        }
        if let Some(int) = node.as_integer_node() {
            let value: Result<i64, _> = int.value().try_into();
            let children = match value {
                Ok(v) => vec![Child::Int(v)],
                Err(_) => Vec::new(),
            };
            return self.push(NodeType::Int, children, span);
        }
        if node.as_float_node().is_some() {
            return self.builder.leaf(NodeType::Float, span);
        }
        if let Some(hash) = node.as_hash_node() {
            let children = self.lower_all(hash.elements().iter())?;
            return self.push(NodeType::Hash, children, span);
        }
        if let Some(hash) = node.as_keyword_hash_node() {
            let children = self.lower_all(hash.elements().iter())?;
            return self.push(NodeType::Hash, children, span);
        }
        if let Some(assoc) = node.as_assoc_node() {
            let key = Child::Node(self.lower(&assoc.key())?);
            let value = Child::Node(self.lower(&assoc.value())?);
            return self.push(NodeType::Pair, vec![key, value], span);
        }
        if let Some(splat) = node.as_assoc_splat_node() {
            let value = self.optional(splat.value())?;
            return self.push(NodeType::Kwsplat, vec![value], span);
        }
        if let Some(array) = node.as_array_node() {
            let children = self.lower_all(array.elements().iter())?;
            return self.push(NodeType::Array, children, span);
        }
        if let Some(c) = node.as_constant_read_node() {
            let name = Child::Symbol(name_of(c.name().as_slice()));
            return self.push(NodeType::Const, vec![Child::Absent, name], span);
        }
        if let Some(cp) = node.as_constant_path_node() {
            let scope = match cp.parent() {
                Some(parent) => Child::Node(self.lower(&parent)?),
                None => Child::Node(
                    self.builder
                        .leaf(NodeType::Cbase, Span::new(span.start, span.start + 2))?,
                ),
            };
            let name = match cp.name() {
                Some(n) => Child::Symbol(name_of(n.as_slice())),
                None => Child::Absent,
            };
            return self.push(NodeType::Const, vec![scope, name], span);
        }
        if let Some(v) = node.as_local_variable_read_node() {
            let name = Child::Symbol(name_of(v.name().as_slice()));
            return self.push(NodeType::Lvar, vec![name], span);
        }
        if let Some(v) = node.as_instance_variable_read_node() {
            let name = Child::Symbol(name_of(v.name().as_slice()));
            return self.push(NodeType::Ivar, vec![name], span);
        }
        if let Some(v) = node.as_class_variable_read_node() {
            let name = Child::Symbol(name_of(v.name().as_slice()));
            return self.push(NodeType::Cvar, vec![name], span);
        }
        if let Some(v) = node.as_global_variable_read_node() {
            let name = Child::Symbol(name_of(v.name().as_slice()));
            return self.push(NodeType::Gvar, vec![name], span);
        }
        if let Some(t) = node.as_local_variable_target_node() {
            let name = Child::Symbol(name_of(t.name().as_slice()));
            return self.push(NodeType::Lvasgn, vec![name], span);
        }
        if let Some(w) = node.as_local_variable_write_node() {
            let name = Child::Symbol(name_of(w.name().as_slice()));
            let value = Child::Node(self.lower(&w.value())?);
            return self.push(NodeType::Lvasgn, vec![name, value], span);
        }
        if let Some(w) = node.as_instance_variable_write_node() {
            let name = Child::Symbol(name_of(w.name().as_slice()));
            let value = Child::Node(self.lower(&w.value())?);
            return self.push(NodeType::Ivasgn, vec![name, value], span);
        }
        if let Some(w) = node.as_constant_write_node() {
            let name = Child::Symbol(name_of(w.name().as_slice()));
            let value = Child::Node(self.lower(&w.value())?);
            return self.push(NodeType::Casgn, vec![Child::Absent, name, value], span);
        }
        if let Some(p) = node.as_required_parameter_node() {
            let name = Child::Symbol(name_of(p.name().as_slice()));
            return self.push(NodeType::Arg, vec![name], span);
        }
        if let Some(p) = node.as_optional_parameter_node() {
            let name = Child::Symbol(name_of(p.name().as_slice()));
            let value = Child::Node(self.lower(&p.value())?);
            return self.push(NodeType::Optarg, vec![name, value], span);
        }
        if node.as_true_node().is_some() {
            return self.builder.leaf(NodeType::True, span);
        }
        if node.as_false_node().is_some() {
            return self.builder.leaf(NodeType::False, span);
        }
        if node.as_nil_node().is_some() {
            return self.builder.leaf(NodeType::Nil, span);
        }
        if node.as_self_node().is_some() {
            return self.builder.leaf(NodeType::SelfRef, span);
        }

        self.generic(node, generic_type(node), span)
    }

    /// `begin ... end` is `kwbegin`. Rescue clauses nest as
    /// `(rescue body resbody... else)` and an ensure wraps everything as
    /// `(ensure inner body)`. A method-level rescue has no `kwbegin`.
    fn begin(
        &mut self,
        begin: &ruby_prism::BeginNode<'_>,
        span: Span,
    ) -> Result<NodeId, TreeError> {
        let keyword = begin.begin_keyword_loc().is_some();
        if begin.rescue_clause().is_none() && begin.ensure_clause().is_none() {
            let children = match begin.statements() {
                Some(stmts) => self.lower_all(stmts.body().iter())?,
                None => Vec::new(),
            };
            let node_type = if keyword {
                NodeType::Kwbegin
            } else {
                NodeType::Begin
            };
            return self.push(node_type, children, span);
        }

        let inner_start = begin
            .statements()
            .map(|s| s.location().start_offset())
            .or_else(|| begin.rescue_clause().map(|r| r.location().start_offset()))
            .or_else(|| begin.ensure_clause().map(|e| e.location().start_offset()))
            .unwrap_or(span.start);
        let mut inner = self.body(begin.statements())?;

        if let Some(first) = begin.rescue_clause() {
            let mut children = vec![inner];
            let mut end = inner_start;
            let mut clause = Some(first);
            while let Some(rescue) = clause {
                end = end.max(resbody_end(&rescue));
                children.push(Child::Node(self.resbody(&rescue)?));
                clause = rescue.subsequent();
            }
            if let Some(stmts) = begin.else_clause().and_then(|e| e.statements()) {
                end = end.max(stmts.location().end_offset());
            }
            children.push(self.else_body(begin.else_clause())?);
            let rescue = self.push(NodeType::Rescue, children, Span::new(inner_start, end))?;
            inner = Child::Node(rescue);
        }

        if let Some(ensure) = begin.ensure_clause() {
            let end = ensure
                .statements()
                .map_or(ensure.ensure_keyword_loc().end_offset(), |s| {
                    s.location().end_offset()
                });
            let body = self.body(ensure.statements())?;
            let ensure = self.push(
                NodeType::Ensure,
                vec![inner, body],
                Span::new(inner_start, end),
            )?;
            inner = Child::Node(ensure);
        }

        match inner {
            Child::Node(id) if !keyword => Ok(id),
            child => self.push(NodeType::Kwbegin, vec![child], span),
        }
    }

    /// `(resbody (array exceptions...) var body)`, with `nil` for a bare
    /// `rescue` or a missing `=> var`.
    fn resbody(&mut self, rescue: &ruby_prism::RescueNode<'_>) -> Result<NodeId, TreeError> {
        let span = Span::new(
            rescue.keyword_loc().start_offset(),
            resbody_end(rescue),
        );
        let exceptions: Vec<ruby_prism::Node<'_>> = rescue.exceptions().iter().collect();
        let list = exceptions
            .first()
            .zip(exceptions.last())
            .map(|(first, last)| {
                Span::new(first.location().start_offset(), last.location().end_offset())
            });
        let classes = match list {
            Some(list) => {
                let items = self.lower_all(exceptions.into_iter())?;
                Child::Node(self.push(NodeType::Array, items, list)?)
            }
            None => Child::Absent,
        };
        let var = self.optional(rescue.reference())?;
        let body = self.body(rescue.statements())?;
        self.push(NodeType::Resbody, vec![classes, var, body], span)
    }

    /// `send`/`csend` children are `[receiver, :name, args...]`. A literal
    /// block wraps the call: `(block (send ...) (args ...) body)`.
    fn call(&mut self, call: &ruby_prism::CallNode<'_>, span: Span) -> Result<NodeId, TreeError> {
        let node_type = if call
            .call_operator_loc()
            .is_some_and(|loc| loc.as_slice() == b"&.")
        {
            NodeType::Csend
        } else {
            NodeType::Send
        };

        let mut children = vec![
            self.optional(call.receiver())?,
            Child::Symbol(name_of(call.name().as_slice())),
        ];
        if let Some(args) = call.arguments() {
            children.extend(self.lower_all(args.arguments().iter())?);
        }

        let block = call.block();
        let block_node = block.as_ref().and_then(|b| b.as_block_node());
        if let Some(block_arg) = block.as_ref().and_then(|b| b.as_block_argument_node()) {
            children.push(Child::Node(self.lower(&block_arg.as_node())?));
        }

        let Some(block_node) = block_node else {
            return self.push(node_type, children, span);
        };

        let send_end = call
            .closing_loc()
            .map(|loc| loc.end_offset())
            .or_else(|| call.arguments().map(|a| a.location().end_offset()))
            .or_else(|| call.message_loc().map(|loc| loc.end_offset()))
            .unwrap_or(span.end);
        let send = self.push(node_type, children, Span::new(span.start, send_end))?;

        let block_start = block_node.location().start_offset();
        let params = match block_node.parameters() {
            Some(p) => self.lower(&p)?,
            None => self.empty_args(block_start)?,
        };
        let body = self.optional(block_node.body())?;
        self.push(
            NodeType::Block,
            vec![Child::Node(send), Child::Node(params), body],
            span,
        )
    }
}
