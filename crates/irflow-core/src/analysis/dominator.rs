use super::cfg::ControlFlowGraph;
use crate::{block::BlockId, function::Function};
use std::collections::{HashMap, HashSet};

/// Dominator tree over the blocks reachable from the entry.
///
/// Unreachable blocks have no immediate dominator and are dominated only by
/// themselves.
#[derive(Debug, Clone)]
pub struct DominatorTree {
    idom: HashMap<BlockId, BlockId>,
    children: HashMap<BlockId, Vec<BlockId>>,
}

impl DominatorTree {
    pub fn build(function: &Function) -> Self {
        Self::from_cfg(&ControlFlowGraph::build(function))
    }

    pub fn from_cfg(cfg: &ControlFlowGraph) -> Self {
        let entry = cfg.entry();
        let mut idom = HashMap::new();
        let mut children: HashMap<BlockId, Vec<BlockId>> = HashMap::new();

        let blocks = cfg.reverse_postorder();

        if blocks.len() <= 1 {
            return Self { idom, children };
        }

        let mut doms: HashMap<BlockId, HashSet<BlockId>> = HashMap::new();

        doms.insert(entry, HashSet::from([entry]));

        for &block in &blocks[1..] {
            doms.insert(block, blocks.iter().copied().collect());
        }

        let mut changed = true;
        while changed {
            changed = false;

            for &block in &blocks[1..] {
                let mut new_dom: Option<HashSet<BlockId>> = None;
                for pred in cfg.predecessors(block) {
                    // Unreachable predecessors impose no constraint.
                    if let Some(pred_dom) = doms.get(pred) {
                        new_dom = Some(match new_dom {
                            Some(acc) => acc.intersection(pred_dom).copied().collect(),
                            None => pred_dom.clone(),
                        });
                    }
                }

                if let Some(mut new_dom_set) = new_dom {
                    new_dom_set.insert(block);

                    if doms.get(&block) != Some(&new_dom_set) {
                        doms.insert(block, new_dom_set);
                        changed = true;
                    }
                }
            }
        }

        // The immediate dominator is the strict dominator with the most
        // dominators of its own.
        for &block in &blocks[1..] {
            let candidate = doms[&block]
                .iter()
                .filter(|&&d| d != block)
                .max_by_key(|d| doms.get(*d).map_or(0, |s| s.len()));

            if let Some(&parent) = candidate {
                idom.insert(block, parent);
                children.entry(parent).or_default().push(block);
            }
        }

        Self { idom, children }
    }

    pub fn dominates(&self, dominator: BlockId, dominated: BlockId) -> bool {
        if dominator == dominated {
            return true;
        }

        let mut current = dominated;
        while let Some(&idom) = self.idom.get(&current) {
            if idom == dominator {
                return true;
            }
            current = idom;
        }

        false
    }

    pub fn strictly_dominates(&self, dominator: BlockId, dominated: BlockId) -> bool {
        dominator != dominated && self.dominates(dominator, dominated)
    }

    pub fn idom(&self, block: BlockId) -> Option<BlockId> {
        self.idom.get(&block).copied()
    }

    pub fn children(&self, block: BlockId) -> &[BlockId] {
        self.children
            .get(&block)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }
}
