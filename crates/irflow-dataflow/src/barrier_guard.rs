use crate::graph::DataFlowGraph;
use crate::node::{instruction_node, Node};
use irflow_core::{
    analysis::{ControlFlowGraph, DominatorTree, ValueNumbering},
    BlockId, Function, FunctionId, Instruction, Terminator,
};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

/// A branch condition that validates some property of the values it tests.
///
/// Implementations decide which instructions a condition checks for each
/// branch outcome. Guards registered together must not trigger on the same
/// condition, or one check is counted as two.
pub trait BarrierGuard: Send + Sync {
    /// Whether `condition` evaluating to `outcome` validates `instruction`.
    fn checks(&self, condition: &GuardCondition<'_>, instruction: &Instruction, outcome: bool)
        -> bool;

    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// Control-flow facts about one function, shared by every guard query on it.
#[derive(Debug)]
pub struct FunctionAnalyses {
    pub cfg: ControlFlowGraph,
    pub dominators: DominatorTree,
    pub value_numbering: ValueNumbering,
}

impl FunctionAnalyses {
    pub fn compute(function: &Function) -> Self {
        let cfg = ControlFlowGraph::build(function);
        let dominators = DominatorTree::from_cfg(&cfg);
        let value_numbering = ValueNumbering::compute(function);
        Self {
            cfg,
            dominators,
            value_numbering,
        }
    }
}

/// The condition of a two-way branch, with the block that branches on it.
#[derive(Debug, Clone, Copy)]
pub struct GuardCondition<'p> {
    condition: &'p Instruction,
    block: BlockId,
    then_block: BlockId,
    else_block: BlockId,
}

impl<'p> GuardCondition<'p> {
    /// The guard ending `block`, if `block` ends in a conditional branch.
    pub fn of_block(function: &'p Function, block: BlockId) -> Option<Self> {
        let Terminator::Branch {
            condition,
            then_block,
            else_block,
        } = function.body.get_block(block)?.terminator
        else {
            return None;
        };
        Some(Self {
            condition: function.instruction(condition)?,
            block,
            then_block,
            else_block,
        })
    }

    pub fn instruction(&self) -> &'p Instruction {
        self.condition
    }

    pub fn block(&self) -> BlockId {
        self.block
    }

    pub fn successor(&self, outcome: bool) -> BlockId {
        if outcome {
            self.then_block
        } else {
            self.else_block
        }
    }

    /// Whether every path to `block` leaves the guard along its `outcome`
    /// edge: the edge's target dominates `block`, and every other way into
    /// that target comes from a block the target dominates.
    pub fn controls(&self, analyses: &FunctionAnalyses, block: BlockId, outcome: bool) -> bool {
        let target = self.successor(outcome);
        if target == self.successor(!outcome) {
            return false;
        }
        if !analyses.cfg.is_reachable(target) {
            return false;
        }
        if !analyses.dominators.dominates(target, block) {
            return false;
        }

        analyses
            .cfg
            .predecessors(target)
            .iter()
            .filter(|&&pred| pred != self.block)
            .all(|&pred| analyses.dominators.dominates(target, pred))
    }
}

impl<'p> DataFlowGraph<'p> {
    pub(crate) fn analyses(&self, function: FunctionId) -> Option<Arc<FunctionAnalyses>> {
        let f = self.function(function)?;
        Some(
            self.cache
                .analyses
                .get_or_compute(function, || FunctionAnalyses::compute(f)),
        )
    }

    /// Guarded nodes of one function.
    pub fn guarded_nodes_in(&self, function: FunctionId, guard: &dyn BarrierGuard) -> HashSet<Node> {
        let mut guarded = HashSet::new();
        let (Some(f), Some(analyses)) = (self.function(function), self.analyses(function)) else {
            return guarded;
        };

        for block in f.body.blocks.keys() {
            let Some(condition) = GuardCondition::of_block(f, *block) else {
                continue;
            };
            for outcome in [true, false] {
                for checked in f.instructions() {
                    if !guard.checks(&condition, checked, outcome) {
                        continue;
                    }
                    for &member in analyses.value_numbering.class_members(checked.id) {
                        let Some(inst) = f.instruction(member) else {
                            continue;
                        };
                        if condition.controls(&analyses, inst.block, outcome) {
                            guarded.insert(instruction_node(member));
                        }
                    }
                }
            }
        }

        debug!(
            function = %f.name(),
            guard = guard.name(),
            guarded = guarded.len(),
            "computed guarded nodes"
        );
        guarded
    }

    /// Every node equal in value to an instruction `guard` checks, in a block
    /// only reachable through the checking branch outcome.
    pub fn guarded_nodes(&self, guard: &dyn BarrierGuard) -> HashSet<Node> {
        self.program
            .functions
            .keys()
            .flat_map(|function| self.guarded_nodes_in(*function, guard))
            .collect()
    }

    /// Membership in [`Self::guarded_nodes`], decided from the node's own
    /// value-number class.
    pub fn is_guarded(&self, node: Node, guard: &dyn BarrierGuard) -> bool {
        let (Some(inst), Some(function)) = (self.instruction(node), self.enclosing_function(node))
        else {
            return false;
        };
        let (Some(f), Some(analyses)) = (self.function(function), self.analyses(function)) else {
            return false;
        };
        let members = analyses.value_numbering.class_members(inst.id);

        f.body
            .blocks
            .keys()
            .filter_map(|block| GuardCondition::of_block(f, *block))
            .any(|condition| {
                [true, false].into_iter().any(|outcome| {
                    condition.controls(&analyses, inst.block, outcome)
                        && members
                            .iter()
                            .filter_map(|member| f.instruction(*member))
                            .any(|checked| guard.checks(&condition, checked, outcome))
                })
            })
    }
}

/// An open set of guards queried as one.
#[derive(Default)]
pub struct GuardRegistry {
    guards: Vec<Box<dyn BarrierGuard>>,
}

impl GuardRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, guard: impl BarrierGuard + 'static) -> &mut Self {
        self.guards.push(Box::new(guard));
        self
    }

    pub fn guards(&self) -> impl Iterator<Item = &dyn BarrierGuard> + '_ {
        self.guards.iter().map(|g| g.as_ref())
    }

    pub fn len(&self) -> usize {
        self.guards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.guards.is_empty()
    }

    pub fn guarded_nodes(&self, graph: &DataFlowGraph<'_>) -> HashSet<Node> {
        self.guards()
            .flat_map(|guard| graph.guarded_nodes(guard))
            .collect()
    }

    pub fn is_guarded(&self, graph: &DataFlowGraph<'_>, node: Node) -> bool {
        self.guards().any(|guard| graph.is_guarded(node, guard))
    }
}

impl std::fmt::Debug for GuardRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.guards().map(|g| g.name()))
            .finish()
    }
}
