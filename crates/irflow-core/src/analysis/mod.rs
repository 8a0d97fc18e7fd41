/*! Function-level analyses consumed by the data-flow layer.
 *
 * Guard reasoning needs to know which blocks a branch edge controls and which instructions compute the
 * same value. These analyses provide block-level control flow, dominance and hash-consing value
 * numbering over a single function.
 */

pub mod cfg;
pub mod dominator;
pub mod value_numbering;

pub use cfg::ControlFlowGraph;
pub use dominator::DominatorTree;
pub use value_numbering::{ValueNumber, ValueNumbering};
