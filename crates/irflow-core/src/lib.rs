/*! SSA intermediate representation for local data-flow analysis.
 *
 * Data-flow rules need a representation where every value has exactly one definition and where
 * imprecise memory writes are explicit. This crate provides that substrate: typed instructions with
 * role-tagged operands, phi and chi merge points, the source expressions instructions were lowered
 * from, and the control-flow, dominance and value-numbering analyses the data-flow layer consumes.
 */

pub mod analysis;
pub mod block;
pub mod builder;
pub mod format;
pub mod function;
pub mod instructions;
pub mod ir_persist;
pub mod program;
pub mod types;
pub mod values;

pub use block::{BasicBlock, BlockId, Terminator};
pub use builder::{FunctionBuilder, IRBuilder};
pub use function::{Function, FunctionBody, FunctionSignature, Parameter};
pub use instructions::{
    BinaryOp, CallTarget, CompareOp, Expr, ExprKind, Instruction, InstructionKind, Opcode,
    Operand, OperandRole, THIS_ARGUMENT_INDEX,
};
pub use program::{Program, ProgramStats};
pub use types::Type;
pub use values::{Constant, ExprId, FunctionId, InstructionId, SourceLocation};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum IrError {
    #[error("Invalid instruction: {0}")]
    InvalidInstruction(String),
    #[error("Builder error: {0}")]
    BuilderError(String),
    #[error("Function not found: {0}")]
    FunctionNotFound(String),
}

pub type Result<T> = std::result::Result<T, IrError>;

#[cfg(test)]
mod tests;
