use crate::graph::DataFlowGraph;
use crate::node::{instruction_node, Node};
use irflow_core::{ExprId, FunctionId, Instruction, InstructionId, InstructionKind};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use tracing::{debug, trace};

/// One-hop flow edges of a single function, in both directions.
#[derive(Debug, Default)]
pub struct StepIndex {
    successors: HashMap<Node, Vec<Node>>,
    predecessors: HashMap<Node, Vec<Node>>,
}

impl StepIndex {
    pub fn successors(&self, node: Node) -> &[Node] {
        self.successors
            .get(&node)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    pub fn predecessors(&self, node: Node) -> &[Node] {
        self.predecessors
            .get(&node)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    pub fn edge_count(&self) -> usize {
        self.successors.values().map(Vec::len).sum()
    }
}

impl<'p> DataFlowGraph<'p> {
    /// The definitions that flow into `inst` in exactly one step.
    fn step_sources(&self, inst: &Instruction) -> Vec<InstructionId> {
        match &inst.kind {
            InstructionKind::Copy { source } | InstructionKind::Load { source, .. } => {
                vec![*source]
            }
            InstructionKind::Store { value, .. } => vec![*value],
            InstructionKind::Phi { incoming } => incoming.iter().map(|(_, def)| *def).collect(),
            InstructionKind::Convert { operand }
            | InstructionKind::CheckedConvert { operand }
            | InstructionKind::ConvertToBase { operand }
                if self.config.track_conversions =>
            {
                vec![*operand]
            }
            InstructionKind::Chi { total, partial } => {
                let mut sources = vec![*total];
                if self.config.partial_chi.allows(inst.has_unknown_result()) {
                    sources.push(*partial);
                }
                sources
            }
            _ => Vec::new(),
        }
    }

    /// Whether data moves from `from` to `to` in exactly one step.
    pub fn local_flow_step(&self, from: Node, to: Node) -> bool {
        match self.instruction(to) {
            Some(inst) => self.step_sources(inst).contains(&from.as_instruction()),
            None => false,
        }
    }

    pub(crate) fn step_index(&self, function: FunctionId) -> Arc<StepIndex> {
        self.cache.step_indexes.get_or_compute(function, || {
            let mut index = StepIndex::default();
            if let Some(f) = self.function(function) {
                for inst in f.instructions() {
                    let to = instruction_node(inst.id);
                    for source in self.step_sources(inst) {
                        let from = instruction_node(source);
                        index.successors.entry(from).or_default().push(to);
                        index.predecessors.entry(to).or_default().push(from);
                    }
                }
                debug!(
                    function = %f.name(),
                    edges = index.edge_count(),
                    "built local flow step index"
                );
            }
            index
        })
    }

    pub fn successors(&self, node: Node) -> Vec<Node> {
        match self.enclosing_function(node) {
            Some(function) => self.step_index(function).successors(node).to_vec(),
            None => Vec::new(),
        }
    }

    pub fn predecessors(&self, node: Node) -> Vec<Node> {
        match self.enclosing_function(node) {
            Some(function) => self.step_index(function).predecessors(node).to_vec(),
            None => Vec::new(),
        }
    }

    /// Every node reachable from `node` through zero or more steps.
    pub fn reachable_from(&self, node: Node) -> Arc<HashSet<Node>> {
        let Some(function) = self.enclosing_function(node) else {
            return Arc::new(HashSet::from([node]));
        };

        let key = (function, node);
        if self.cache.closures.get(&key).is_some() {
            trace!(%node, "local flow closure cache hit");
        }

        self.cache.closures.get_or_compute(key, || {
            let index = self.step_index(function);
            let mut visited = HashSet::from([node]);
            let mut queue = VecDeque::from([node]);

            while let Some(current) = queue.pop_front() {
                for &next in index.successors(current) {
                    if visited.insert(next) {
                        queue.push_back(next);
                    }
                }
            }

            debug!(%node, reachable = visited.len(), "computed local flow closure");
            visited
        })
    }

    /// Reflexive-transitive closure of [`Self::local_flow_step`]. Terminates
    /// on phi cycles.
    pub fn local_flow(&self, from: Node, to: Node) -> bool {
        if from == to {
            return true;
        }
        match (self.enclosing_function(from), self.enclosing_function(to)) {
            (Some(a), Some(b)) if a == b => self.reachable_from(from).contains(&to),
            _ => false,
        }
    }

    pub fn local_expr_flow(&self, from: ExprId, to: ExprId) -> bool {
        match (self.expr_node(from), self.expr_node(to)) {
            (Some(from), Some(to)) => self.local_flow(from, to),
            _ => false,
        }
    }
}
