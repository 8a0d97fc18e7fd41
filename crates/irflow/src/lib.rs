/*! Single entry point for building SSA programs and querying local data flow.
 *
 * Build or load a [`Program`], wrap it in a [`DataFlowGraph`], then ask
 * about nodes, one-step and transitive flow, and barrier guards.
 */

pub use irflow_core as core;
pub use irflow_dataflow as dataflow;

pub use irflow_core::{
    block::{BasicBlock, BlockId, Terminator},
    function::Function,
    instructions::{Expr, Instruction, InstructionKind},
    ir_persist::{load_program, save_program},
    types::Type,
    values::{ExprId, InstructionId},
    IRBuilder, Program,
};

pub use irflow_dataflow::{
    BarrierGuard, DataFlowGraph, FlowConfig, GuardCondition, GuardRegistry, Node, NodeKind,
    PartialChiPolicy,
};
