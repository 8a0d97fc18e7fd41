use crate::{block::BlockId, function::Function};
use std::collections::{HashMap, HashSet, VecDeque};

/// Block-level successor and predecessor edges of one function.
///
/// A branch whose two targets coincide contributes a single edge.
#[derive(Debug, Clone)]
pub struct ControlFlowGraph {
    entry: BlockId,
    exits: Vec<BlockId>,
    predecessors: HashMap<BlockId, Vec<BlockId>>,
    successors: HashMap<BlockId, Vec<BlockId>>,
}

impl ControlFlowGraph {
    pub fn build(function: &Function) -> Self {
        let entry = function.entry_block();
        let mut predecessors: HashMap<BlockId, Vec<BlockId>> = HashMap::new();
        let mut successors = HashMap::new();
        let mut exits = Vec::new();

        for (&block_id, block) in &function.body.blocks {
            let mut succs = block.successors();
            succs.dedup();

            if succs.is_empty() {
                exits.push(block_id);
            }

            for &succ in &succs {
                predecessors.entry(succ).or_default().push(block_id);
            }
            successors.insert(block_id, succs);
        }

        Self {
            entry,
            exits,
            predecessors,
            successors,
        }
    }

    pub fn entry(&self) -> BlockId {
        self.entry
    }

    pub fn exits(&self) -> &[BlockId] {
        &self.exits
    }

    pub fn predecessors(&self, block: BlockId) -> &[BlockId] {
        self.predecessors
            .get(&block)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    pub fn successors(&self, block: BlockId) -> &[BlockId] {
        self.successors
            .get(&block)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    pub fn is_reachable(&self, block: BlockId) -> bool {
        self.reachable_blocks().contains(&block)
    }

    pub fn reachable_blocks(&self) -> HashSet<BlockId> {
        let mut visited = HashSet::new();
        let mut queue = VecDeque::new();
        queue.push_back(self.entry);

        while let Some(current) = queue.pop_front() {
            if visited.insert(current) {
                for &succ in self.successors(current) {
                    queue.push_back(succ);
                }
            }
        }

        visited
    }

    /// Reachable blocks in reverse postorder from the entry.
    pub fn reverse_postorder(&self) -> Vec<BlockId> {
        let mut visited = HashSet::new();
        let mut postorder = Vec::new();
        let mut stack = vec![(self.entry, false)];

        while let Some((block, processed)) = stack.pop() {
            if processed {
                postorder.push(block);
                continue;
            }
            if !visited.insert(block) {
                continue;
            }

            stack.push((block, true));
            for &succ in self.successors(block).iter().rev() {
                if !visited.contains(&succ) {
                    stack.push((succ, false));
                }
            }
        }

        postorder.reverse();
        postorder
    }
}
