//! Block-level control flow graph.
//!
//! Uses `petgraph::DiGraph` with one node per basic block (node index equals
//! block index) and one edge per terminator successor.

use petgraph::algo::dominators::{self, Dominators};
use petgraph::graph::{DiGraph, NodeIndex};

use sprig_core::{BlockId, Function};

/// Control flow graph of one function, with dominators from its entry.
pub(crate) struct BlockGraph {
    dominators: Option<Dominators<NodeIndex>>,
    reachable: Vec<bool>,
}

impl BlockGraph {
    /// Build the graph. Branches to nonexistent blocks are ignored here;
    /// the operand check reports them.
    pub(crate) fn new(function: &Function) -> Self {
        let blocks = function.blocks();
        let mut graph: DiGraph<BlockId, ()> = DiGraph::with_capacity(blocks.len(), blocks.len());
        for i in 0..blocks.len() {
            graph.add_node(BlockId::new(i as u32));
        }
        for (i, block) in blocks.iter().enumerate() {
            for inst in block.instructions() {
                for succ in inst.successors() {
                    if succ.as_usize() < blocks.len() {
                        graph.add_edge(NodeIndex::new(i), NodeIndex::new(succ.as_usize()), ());
                    }
                }
            }
        }

        let dominators = function
            .entry_block()
            .map(|entry| dominators::simple_fast(&graph, NodeIndex::new(entry.as_usize())));

        let reachable = (0..blocks.len())
            .map(|i| match &dominators {
                Some(doms) => {
                    i == 0 || doms.immediate_dominator(NodeIndex::new(i)).is_some()
                }
                None => false,
            })
            .collect();

        Self {
            dominators,
            reachable,
        }
    }

    /// Whether the block can be reached from the entry.
    pub(crate) fn is_reachable(&self, block: BlockId) -> bool {
        self.reachable.get(block.as_usize()).copied().unwrap_or(false)
    }

    /// Whether `a` dominates `b` and `a != b`.
    pub(crate) fn strictly_dominates(&self, a: BlockId, b: BlockId) -> bool {
        let Some(doms) = &self.dominators else {
            return false;
        };
        let target = NodeIndex::new(a.as_usize());
        let mut current = doms.immediate_dominator(NodeIndex::new(b.as_usize()));
        while let Some(node) = current {
            if node == target {
                return true;
            }
            current = doms.immediate_dominator(node);
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sprig_core::{Instruction, Linkage, Signature, primitives};

    fn chain(edges: &[(u32, u32)], blocks: u32) -> Function {
        let mut f = Function::new(
            "f",
            Signature::new(primitives::VOID, vec![], false),
            Linkage::External,
        );
        for i in 0..blocks {
            f.add_block(format!("b{i}"));
        }
        for (from, to) in edges {
            if let Some(block) = f.block_mut(BlockId::new(*from)) {
                block.push(Instruction::Br {
                    target: BlockId::new(*to),
                });
            }
        }
        f
    }

    #[test]
    fn straight_line_dominance() {
        let f = chain(&[(0, 1), (1, 2)], 3);
        let g = BlockGraph::new(&f);
        assert!(g.strictly_dominates(BlockId::new(0), BlockId::new(2)));
        assert!(g.strictly_dominates(BlockId::new(1), BlockId::new(2)));
        assert!(!g.strictly_dominates(BlockId::new(2), BlockId::new(1)));
        assert!(!g.strictly_dominates(BlockId::new(1), BlockId::new(1)));
    }

    #[test]
    fn unreachable_blocks() {
        let f = chain(&[(0, 2)], 3);
        let g = BlockGraph::new(&f);
        assert!(g.is_reachable(BlockId::new(0)));
        assert!(!g.is_reachable(BlockId::new(1)));
        assert!(g.is_reachable(BlockId::new(2)));
    }

    #[test]
    fn empty_function() {
        let f = chain(&[], 0);
        let g = BlockGraph::new(&f);
        assert!(!g.is_reachable(BlockId::new(0)));
        assert!(!g.strictly_dominates(BlockId::new(0), BlockId::new(0)));
    }
}
