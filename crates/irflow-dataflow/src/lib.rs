/*! Local data flow over the irflow SSA representation.
 *
 * Security and correctness rules ask where a value comes from and where it goes. This crate answers
 * the intra-procedural part: it maps instructions onto data-flow nodes, relates nodes by single-step
 * and transitive flow through copies, phis, conversions and chi merges, and computes which nodes are
 * protected by a validating branch.
 */

pub mod barrier_guard;
pub mod cache;
pub mod config;
pub mod graph;
pub mod local_flow;
pub mod node;

pub use barrier_guard::{BarrierGuard, FunctionAnalyses, GuardCondition, GuardRegistry};
pub use cache::{CacheStatistics, FlowCache};
pub use config::{FlowConfig, PartialChiPolicy};
pub use graph::DataFlowGraph;
pub use local_flow::StepIndex;
pub use node::{
    instruction_node, DefinitionByReferenceNode, Node, NodeKind, ParameterPosition, ParameterRef,
    PostUpdateNode, TypeBoundProvider,
};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DataFlowError {
    #[error("Unknown function: {0}")]
    UnknownFunction(String),
    #[error("Unknown instruction: {0}")]
    UnknownInstruction(String),
}
