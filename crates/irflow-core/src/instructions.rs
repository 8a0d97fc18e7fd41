use crate::block::BlockId;
use crate::types::Type;
use crate::values::{Constant, ExprId, FunctionId, InstructionId, SourceLocation};
use serde::{Deserialize, Serialize};

/// A single IR operation. Immutable once the enclosing program is built.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Instruction {
    pub id: InstructionId,
    pub function: FunctionId,
    pub block: BlockId,
    pub kind: InstructionKind,
    pub result_type: Type,
    /// The syntactic expression whose value this instruction computes, if any.
    pub expr: Option<ExprId>,
    pub location: SourceLocation,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InstructionKind {
    Constant(Constant),
    VariableAddress {
        name: String,
    },
    InitializeParameter {
        index: usize,
    },
    InitializeThis,

    Copy {
        source: InstructionId,
    },
    Load {
        address: InstructionId,
        source: InstructionId,
    },
    Store {
        address: InstructionId,
        value: InstructionId,
    },

    Phi {
        incoming: Vec<(BlockId, InstructionId)>,
    },

    Convert {
        operand: InstructionId,
    },
    CheckedConvert {
        operand: InstructionId,
    },
    ConvertToBase {
        operand: InstructionId,
    },
    ConvertToDerived {
        operand: InstructionId,
    },

    Chi {
        total: InstructionId,
        partial: InstructionId,
    },

    Binary {
        op: BinaryOp,
        left: InstructionId,
        right: InstructionId,
    },
    Compare {
        op: CompareOp,
        left: InstructionId,
        right: InstructionId,
    },

    Call {
        target: CallTarget,
        arguments: Vec<InstructionId>,
        this_argument: Option<InstructionId>,
    },
    /// Memory written through a call's output argument. `index` is the
    /// positional argument, or [`THIS_ARGUMENT_INDEX`] for the receiver.
    WriteSideEffect {
        call: InstructionId,
        index: i32,
    },

    Return {
        value: Option<InstructionId>,
    },
}

/// Side-effect index denoting the implicit receiver of a call.
pub const THIS_ARGUMENT_INDEX: i32 = -1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Opcode {
    Constant,
    VariableAddress,
    InitializeParameter,
    InitializeThis,
    Copy,
    Load,
    Store,
    Phi,
    Convert,
    CheckedConvert,
    ConvertToBase,
    ConvertToDerived,
    Chi,
    Binary,
    Compare,
    Call,
    WriteSideEffect,
    Return,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    And,
    Or,
    Xor,
    Shl,
    Shr,
    PointerAdd,
}

impl BinaryOp {
    pub fn is_commutative(&self) -> bool {
        matches!(
            self,
            BinaryOp::Add | BinaryOp::Mul | BinaryOp::And | BinaryOp::Or | BinaryOp::Xor
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CallTarget {
    /// A direct call whose callee is known at IR construction time.
    Static(FunctionId),
    /// A call through a function pointer or virtual dispatch.
    Indirect(InstructionId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperandRole {
    SourceValue,
    PhiIncoming(BlockId),
    Unary,
    ChiTotal,
    ChiPartial,
    Left,
    Right,
    Address,
    Argument(usize),
    ThisArgument,
    CallTarget,
    SideEffectCall,
    ReturnValue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Operand {
    pub role: OperandRole,
    pub def: InstructionId,
}

impl Operand {
    fn new(role: OperandRole, def: InstructionId) -> Self {
        Self { role, def }
    }
}

impl Instruction {
    pub fn opcode(&self) -> Opcode {
        self.kind.opcode()
    }

    pub fn operands(&self) -> Vec<Operand> {
        self.kind.operands()
    }

    pub fn is_conversion(&self) -> bool {
        self.kind.is_conversion()
    }

    pub fn has_unknown_result(&self) -> bool {
        self.result_type.is_unknown()
    }
}

impl InstructionKind {
    pub fn opcode(&self) -> Opcode {
        match self {
            InstructionKind::Constant(_) => Opcode::Constant,
            InstructionKind::VariableAddress { .. } => Opcode::VariableAddress,
            InstructionKind::InitializeParameter { .. } => Opcode::InitializeParameter,
            InstructionKind::InitializeThis => Opcode::InitializeThis,
            InstructionKind::Copy { .. } => Opcode::Copy,
            InstructionKind::Load { .. } => Opcode::Load,
            InstructionKind::Store { .. } => Opcode::Store,
            InstructionKind::Phi { .. } => Opcode::Phi,
            InstructionKind::Convert { .. } => Opcode::Convert,
            InstructionKind::CheckedConvert { .. } => Opcode::CheckedConvert,
            InstructionKind::ConvertToBase { .. } => Opcode::ConvertToBase,
            InstructionKind::ConvertToDerived { .. } => Opcode::ConvertToDerived,
            InstructionKind::Chi { .. } => Opcode::Chi,
            InstructionKind::Binary { .. } => Opcode::Binary,
            InstructionKind::Compare { .. } => Opcode::Compare,
            InstructionKind::Call { .. } => Opcode::Call,
            InstructionKind::WriteSideEffect { .. } => Opcode::WriteSideEffect,
            InstructionKind::Return { .. } => Opcode::Return,
        }
    }

    pub fn is_conversion(&self) -> bool {
        matches!(
            self,
            InstructionKind::Convert { .. }
                | InstructionKind::CheckedConvert { .. }
                | InstructionKind::ConvertToBase { .. }
                | InstructionKind::ConvertToDerived { .. }
        )
    }

    /// Operands in a stable order, each tagged with the role it plays.
    pub fn operands(&self) -> Vec<Operand> {
        match self {
            InstructionKind::Constant(_)
            | InstructionKind::VariableAddress { .. }
            | InstructionKind::InitializeParameter { .. }
            | InstructionKind::InitializeThis => Vec::new(),

            InstructionKind::Copy { source } => {
                vec![Operand::new(OperandRole::SourceValue, *source)]
            }
            InstructionKind::Load { address, source } => vec![
                Operand::new(OperandRole::Address, *address),
                Operand::new(OperandRole::SourceValue, *source),
            ],
            InstructionKind::Store { address, value } => vec![
                Operand::new(OperandRole::Address, *address),
                Operand::new(OperandRole::SourceValue, *value),
            ],

            InstructionKind::Phi { incoming } => incoming
                .iter()
                .map(|(pred, def)| Operand::new(OperandRole::PhiIncoming(*pred), *def))
                .collect(),

            InstructionKind::Convert { operand }
            | InstructionKind::CheckedConvert { operand }
            | InstructionKind::ConvertToBase { operand }
            | InstructionKind::ConvertToDerived { operand } => {
                vec![Operand::new(OperandRole::Unary, *operand)]
            }

            InstructionKind::Chi { total, partial } => vec![
                Operand::new(OperandRole::ChiTotal, *total),
                Operand::new(OperandRole::ChiPartial, *partial),
            ],

            InstructionKind::Binary { left, right, .. }
            | InstructionKind::Compare { left, right, .. } => vec![
                Operand::new(OperandRole::Left, *left),
                Operand::new(OperandRole::Right, *right),
            ],

            InstructionKind::Call {
                target,
                arguments,
                this_argument,
            } => {
                let mut operands = Vec::with_capacity(arguments.len() + 2);
                if let CallTarget::Indirect(callee) = target {
                    operands.push(Operand::new(OperandRole::CallTarget, *callee));
                }
                if let Some(this) = this_argument {
                    operands.push(Operand::new(OperandRole::ThisArgument, *this));
                }
                operands.extend(
                    arguments
                        .iter()
                        .enumerate()
                        .map(|(i, arg)| Operand::new(OperandRole::Argument(i), *arg)),
                );
                operands
            }
            InstructionKind::WriteSideEffect { call, .. } => {
                vec![Operand::new(OperandRole::SideEffectCall, *call)]
            }

            InstructionKind::Return { value } => value
                .iter()
                .map(|v| Operand::new(OperandRole::ReturnValue, *v))
                .collect(),
        }
    }

    pub fn operand_with_role(&self, role: OperandRole) -> Option<InstructionId> {
        self.operands()
            .into_iter()
            .find(|operand| operand.role == role)
            .map(|operand| operand.def)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExprKind {
    /// An implicit or explicit conversion. `operand` is `None` for
    /// conversions the front-end synthesized without a source expression.
    Conversion { operand: Option<ExprId> },
    Other,
}

/// A node of the source-level expression tree an instruction was lowered from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expr {
    pub id: ExprId,
    pub kind: ExprKind,
    pub text: String,
    pub location: SourceLocation,
}

impl Expr {
    pub fn is_conversion(&self) -> bool {
        matches!(self.kind, ExprKind::Conversion { .. })
    }
}
