use crate::graph::DataFlowGraph;
use irflow_core::{
    CallTarget, Expr, ExprId, ExprKind, FunctionId, Instruction, InstructionId, InstructionKind,
    OperandRole, Program, SourceLocation, Type, THIS_ARGUMENT_INDEX,
};
use std::collections::HashSet;
use std::fmt;

/// A data-flow node. Each node wraps exactly one instruction and each
/// instruction has exactly one node, so comparing nodes compares the
/// instructions behind them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Node(NodeRepr);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
enum NodeRepr {
    Instruction(InstructionId),
}

/// The node wrapping `id`.
pub fn instruction_node(id: InstructionId) -> Node {
    Node(NodeRepr::Instruction(id))
}

impl Node {
    pub fn as_instruction(&self) -> InstructionId {
        match self.0 {
            NodeRepr::Instruction(id) => id,
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            NodeRepr::Instruction(id) => write!(f, "node({})", id),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Expression,
    Parameter,
    PostUpdate,
    DefinitionByReference,
    Instruction,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NodeKind::Expression => "expr",
            NodeKind::Parameter => "param",
            NodeKind::PostUpdate => "post-update",
            NodeKind::DefinitionByReference => "def-by-ref",
            NodeKind::Instruction => "inst",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParameterPosition {
    Explicit(usize),
    This,
}

/// A formal parameter of a specific function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParameterRef<'p> {
    pub function: FunctionId,
    pub position: ParameterPosition,
    pub name: &'p str,
    pub param_type: &'p Type,
}

impl fmt::Display for ParameterRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.position {
            ParameterPosition::Explicit(_) => f.write_str(self.name),
            ParameterPosition::This => f.write_str("this"),
        }
    }
}

/// Supplies a tighter static type for a node than its result type.
pub trait TypeBoundProvider: Send + Sync {
    fn type_bound(&self, program: &Program, instruction: &Instruction) -> Option<Type>;
}

/// The value a call writes through an output argument.
#[derive(Debug, Clone, Copy)]
pub struct DefinitionByReferenceNode<'p> {
    program: &'p Program,
    node: Node,
    call: &'p Instruction,
    index: i32,
}

impl<'p> DefinitionByReferenceNode<'p> {
    pub fn node(&self) -> Node {
        self.node
    }

    pub fn call(&self) -> &'p Instruction {
        self.call
    }

    /// Positional argument index, or [`THIS_ARGUMENT_INDEX`] for the receiver.
    pub fn index(&self) -> i32 {
        self.index
    }

    /// The instruction passed at the written argument position.
    pub fn argument_instruction(&self) -> Option<InstructionId> {
        if self.index == THIS_ARGUMENT_INDEX {
            return self.call.kind.operand_with_role(OperandRole::ThisArgument);
        }
        let index = usize::try_from(self.index).ok()?;
        self.call.kind.operand_with_role(OperandRole::Argument(index))
    }

    /// The source expression of the written argument.
    pub fn argument(&self) -> Option<&'p Expr> {
        let argument = self.program.instruction(self.argument_instruction()?)?;
        unconverted_expr(self.program, argument)
    }

    /// The callee's formal parameter at the written position. Only resolved
    /// for statically known callees; receiver writes have no formal parameter.
    pub fn parameter(&self) -> Option<ParameterRef<'p>> {
        let InstructionKind::Call {
            target: CallTarget::Static(callee),
            ..
        } = &self.call.kind
        else {
            return None;
        };
        let index = usize::try_from(self.index).ok()?;
        let callee = self.program.function(*callee)?;
        let param = callee.parameter(index)?;
        Some(ParameterRef {
            function: callee.id,
            position: ParameterPosition::Explicit(index),
            name: &param.name,
            param_type: &param.param_type,
        })
    }
}

/// The state of a location after a may-write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PostUpdateNode {
    node: Node,
    pre_update: Node,
}

impl PostUpdateNode {
    pub fn node(&self) -> Node {
        self.node
    }

    pub fn pre_update_node(&self) -> Node {
        self.pre_update
    }
}

/// Follows conversion expressions down to the first non-conversion.
fn unconverted_expr<'p>(program: &'p Program, inst: &Instruction) -> Option<&'p Expr> {
    let mut expr = program.expr(inst.expr?)?;
    let mut seen = HashSet::new();
    while seen.insert(expr.id) {
        match expr.kind {
            ExprKind::Conversion { operand: Some(operand) } => expr = program.expr(operand)?,
            ExprKind::Conversion { operand: None } => return None,
            ExprKind::Other => return Some(expr),
        }
    }
    None
}

impl<'p> DataFlowGraph<'p> {
    pub fn instruction_node(&self, id: InstructionId) -> Node {
        instruction_node(id)
    }

    pub fn instruction(&self, node: Node) -> Option<&'p Instruction> {
        self.program.instruction(node.as_instruction())
    }

    pub fn kind(&self, node: Node) -> Option<NodeKind> {
        let inst = self.instruction(node)?;
        let kind = match inst.kind {
            InstructionKind::InitializeParameter { .. } | InstructionKind::InitializeThis => {
                NodeKind::Parameter
            }
            InstructionKind::WriteSideEffect { .. } => NodeKind::DefinitionByReference,
            InstructionKind::Chi { .. } => NodeKind::PostUpdate,
            _ if unconverted_expr(self.program, inst).is_some() => NodeKind::Expression,
            _ => NodeKind::Instruction,
        };
        Some(kind)
    }

    /// Nodes of one function, in block order.
    pub fn nodes(&self, function: FunctionId) -> Vec<Node> {
        self.function(function)
            .map(|f| f.instructions().map(|inst| instruction_node(inst.id)).collect())
            .unwrap_or_default()
    }

    /// The source expression this node computes, with conversions stripped.
    /// `None` when the conversion chain ends in a synthesized conversion.
    pub fn as_expr(&self, node: Node) -> Option<&'p Expr> {
        unconverted_expr(self.program, self.instruction(node)?)
    }

    /// The expression this node computes, conversions included.
    pub fn as_converted_expr(&self, node: Node) -> Option<&'p Expr> {
        self.program.expr(self.instruction(node)?.expr?)
    }

    pub fn as_parameter(&self, node: Node) -> Option<ParameterRef<'p>> {
        let inst = self.instruction(node)?;
        let function = self.function(inst.function)?;
        match inst.kind {
            InstructionKind::InitializeParameter { index } => {
                let param = function.parameter(index)?;
                Some(ParameterRef {
                    function: function.id,
                    position: ParameterPosition::Explicit(index),
                    name: &param.name,
                    param_type: &param.param_type,
                })
            }
            InstructionKind::InitializeThis => Some(ParameterRef {
                function: function.id,
                position: ParameterPosition::This,
                name: "this",
                param_type: function.signature.this_type.as_ref()?,
            }),
            _ => None,
        }
    }

    pub fn as_definition_by_reference(&self, node: Node) -> Option<DefinitionByReferenceNode<'p>> {
        let inst = self.instruction(node)?;
        let InstructionKind::WriteSideEffect { call, index } = inst.kind else {
            return None;
        };
        let call = self.program.instruction(call)?;
        Some(DefinitionByReferenceNode {
            program: self.program,
            node,
            call,
            index,
        })
    }

    /// The call argument whose referent this node defines.
    pub fn as_defining_argument(&self, node: Node) -> Option<&'p Expr> {
        self.as_definition_by_reference(node)?.argument()
    }

    pub fn as_post_update(&self, node: Node) -> Option<PostUpdateNode> {
        match self.instruction(node)?.kind {
            InstructionKind::Chi { total, .. } => Some(PostUpdateNode {
                node,
                pre_update: instruction_node(total),
            }),
            _ => None,
        }
    }

    /// The node computing `expr` itself, conversions included.
    pub fn expr_node(&self, expr: ExprId) -> Option<Node> {
        self.program
            .instructions()
            .find(|inst| inst.expr == Some(expr))
            .map(|inst| instruction_node(inst.id))
    }

    pub fn parameter_node(&self, function: FunctionId, position: ParameterPosition) -> Option<Node> {
        self.function(function)?
            .instructions()
            .find(|inst| match (position, &inst.kind) {
                (ParameterPosition::Explicit(i), InstructionKind::InitializeParameter { index }) => {
                    i == *index
                }
                (ParameterPosition::This, InstructionKind::InitializeThis) => true,
                _ => false,
            })
            .map(|inst| instruction_node(inst.id))
    }

    pub fn enclosing_function(&self, node: Node) -> Option<FunctionId> {
        self.instruction(node).map(|inst| inst.function)
    }

    pub fn node_type(&self, node: Node) -> Option<&'p Type> {
        self.instruction(node).map(|inst| &inst.result_type)
    }

    /// An upper bound on the node's static type. Without a registered
    /// [`TypeBoundProvider`] this is the result type.
    pub fn type_bound(&self, node: Node) -> Option<Type> {
        let inst = self.instruction(node)?;
        self.type_bounds
            .as_ref()
            .and_then(|provider| provider.type_bound(self.program, inst))
            .or_else(|| Some(inst.result_type.clone()))
    }

    pub fn location(&self, node: Node) -> Option<&'p SourceLocation> {
        self.instruction(node).map(|inst| &inst.location)
    }

    pub fn display(&self, node: Node) -> NodeDisplay<'_, 'p> {
        NodeDisplay { graph: self, node }
    }
}

pub struct NodeDisplay<'g, 'p> {
    graph: &'g DataFlowGraph<'p>,
    node: Node,
}

impl fmt::Display for NodeDisplay<'_, '_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let graph = self.graph;
        if let Some(param) = graph.as_parameter(self.node) {
            return write!(f, "{}", param);
        }
        if let Some(def) = graph.as_definition_by_reference(self.node) {
            return match def.argument() {
                Some(arg) => write!(f, "ref arg {}", arg.text),
                None => write!(f, "ref arg #{}", def.index()),
            };
        }
        if let Some(post) = graph.as_post_update(self.node) {
            return write!(f, "post-update of {}", graph.display(post.pre_update_node()));
        }
        if let Some(expr) = graph.as_expr(self.node) {
            return f.write_str(&expr.text);
        }
        match graph.instruction(self.node) {
            Some(inst) => write!(f, "{}", inst),
            None => write!(f, "{}", self.node),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use irflow_core::IRBuilder;
    use pretty_assertions::assert_eq;

    struct WidenEverything;

    impl TypeBoundProvider for WidenEverything {
        fn type_bound(&self, _: &Program, inst: &Instruction) -> Option<Type> {
            inst.result_type.is_numeric().then(|| Type::int(64))
        }
    }

    #[test]
    fn test_classification_and_parameters() {
        let mut builder = IRBuilder::new();
        let mut func = builder.function("Widget::poke");
        func.this_type(Type::class("Widget")).param("n", Type::int(32));
        let (this, n, sum, c) = {
            let mut entry = func.entry_block();
            let this = entry.init_this().unwrap();
            let n = entry.init_param(0).unwrap();
            let c = entry.constant_int(1, 32);
            let sum = entry.add(n, c, Type::int(32));
            let e = entry.expr("n + 1");
            entry.bind_expr(sum, e).unwrap();
            entry.return_void().unwrap();
            (this, n, sum, c)
        };
        let f = func.build().unwrap();
        let program = builder.finish().unwrap();
        let graph = DataFlowGraph::new(&program);

        let kinds: Vec<_> = [this, n, sum, c]
            .iter()
            .map(|id| graph.kind(graph.instruction_node(*id)).unwrap())
            .collect();
        assert_eq!(
            kinds,
            vec![
                NodeKind::Parameter,
                NodeKind::Parameter,
                NodeKind::Expression,
                NodeKind::Instruction,
            ]
        );

        let param = graph.as_parameter(instruction_node(n)).unwrap();
        assert_eq!(param.position, ParameterPosition::Explicit(0));
        assert_eq!(param.name, "n");
        assert_eq!(param.function, f);

        let receiver = graph.as_parameter(instruction_node(this)).unwrap();
        assert_eq!(receiver.position, ParameterPosition::This);
        assert_eq!(receiver.param_type, &Type::class("Widget"));

        assert_eq!(
            graph.parameter_node(f, ParameterPosition::This),
            Some(instruction_node(this))
        );
        assert_eq!(graph.parameter_node(f, ParameterPosition::Explicit(3)), None);
        assert_eq!(graph.as_parameter(instruction_node(sum)), None);

        assert_eq!(graph.display(instruction_node(sum)).to_string(), "n + 1");
        assert_eq!(graph.display(instruction_node(this)).to_string(), "this");
        assert_eq!(instruction_node(sum).to_string(), format!("node({})", sum));
    }

    #[test]
    fn test_type_bound_override() {
        let mut builder = IRBuilder::new();
        let mut func = builder.function("f");
        let (flag, num) = {
            let mut entry = func.entry_block();
            let flag = entry.constant_bool(true);
            let num = entry.constant_int(3, 8);
            entry.return_void().unwrap();
            (flag, num)
        };
        func.build().unwrap();
        let program = builder.finish().unwrap();

        let plain = DataFlowGraph::new(&program);
        assert_eq!(plain.type_bound(instruction_node(num)), Some(Type::int(8)));

        let bounded = DataFlowGraph::new(&program).with_type_bounds(WidenEverything);
        assert_eq!(bounded.type_bound(instruction_node(num)), Some(Type::int(64)));
        assert_eq!(bounded.type_bound(instruction_node(flag)), Some(Type::Bool));
        assert_eq!(bounded.node_type(instruction_node(num)), Some(&Type::int(8)));
    }

    #[test]
    fn test_unknown_instruction() {
        let program = Program::new();
        let graph = DataFlowGraph::new(&program);
        let ghost = instruction_node(InstructionId(5));

        assert_eq!(ghost.as_instruction(), InstructionId(5));
        assert_eq!(graph.kind(ghost), None);
        assert_eq!(graph.as_expr(ghost), None);
        assert_eq!(graph.enclosing_function(ghost), None);
        assert_eq!(graph.display(ghost).to_string(), "node(i5)");
    }
}
