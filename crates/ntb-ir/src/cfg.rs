//! Control-flow graph of a single function.

use std::collections::VecDeque;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::block::{BasicBlock, BlockId};
use crate::decl::Decls;
use crate::terminator::Terminator;

/// How control reaches a successor.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum EdgeKind {
    /// Goto, return, or fallthrough into the next case body.
    Unconditional,
    /// Taken when the branch condition is non-zero.
    ConditionalTrue,
    /// Taken when the branch condition is zero.
    ConditionalFalse,
    /// Switch dispatch to a case-labeled block.
    Case,
    /// Switch dispatch when no case label matched.
    Default,
}

/// A directed edge out of a block.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct CfgEdge {
    pub target: BlockId,
    pub kind: EdgeKind,
}

/// Control-flow graph. Absent block numbers are null blocks.
#[derive(Clone, Debug)]
pub struct Cfg {
    blocks: Vec<Option<BasicBlock>>,
    entry: BlockId,
    exit: BlockId,
    predecessors: FxHashMap<BlockId, Vec<BlockId>>,
}

impl Cfg {
    pub(crate) fn new(blocks: Vec<Option<BasicBlock>>, entry: BlockId, exit: BlockId) -> Self {
        let mut cfg = Self {
            blocks,
            entry,
            exit,
            predecessors: FxHashMap::default(),
        };
        cfg.predecessors = cfg.build_predecessors();
        cfg
    }

    fn build_predecessors(&self) -> FxHashMap<BlockId, Vec<BlockId>> {
        let mut predecessors: FxHashMap<BlockId, Vec<BlockId>> = FxHashMap::default();
        for block in self.blocks() {
            for succ in self.successors(block.id) {
                let preds = predecessors.entry(succ).or_default();
                if !preds.contains(&block.id) {
                    preds.push(block.id);
                }
            }
        }
        predecessors
    }

    pub const fn entry(&self) -> BlockId {
        self.entry
    }

    pub const fn exit(&self) -> BlockId {
        self.exit
    }

    /// Look up a block; `None` for null blocks.
    pub fn block(&self, id: BlockId) -> Option<&BasicBlock> {
        self.blocks.get(id.index()).and_then(Option::as_ref)
    }

    /// All non-null blocks in ascending block number.
    pub fn blocks(&self) -> impl Iterator<Item = &BasicBlock> {
        self.blocks.iter().flatten()
    }

    /// One past the highest block number.
    pub fn num_block_ids(&self) -> usize {
        self.blocks.len()
    }

    /// Number of non-null blocks.
    pub fn len(&self) -> usize {
        self.blocks().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Outgoing edges of `id` in terminator order.
    pub fn edges(&self, id: BlockId) -> Vec<CfgEdge> {
        let Some(block) = self.block(id) else {
            return Vec::new();
        };
        let edge = |target, kind| CfgEdge { target, kind };
        match &block.terminator {
            Terminator::Goto(target) => vec![edge(*target, EdgeKind::Unconditional)],
            Terminator::Branch {
                then_target,
                else_target,
                ..
            } => vec![
                edge(*then_target, EdgeKind::ConditionalTrue),
                edge(*else_target, EdgeKind::ConditionalFalse),
            ],
            Terminator::Switch { cases, default, .. } => cases
                .iter()
                .map(|&case| edge(case, EdgeKind::Case))
                .chain(std::iter::once(edge(*default, EdgeKind::Default)))
                .collect(),
            Terminator::Return => vec![edge(self.exit, EdgeKind::Unconditional)],
            Terminator::Exit => Vec::new(),
        }
    }

    /// Kinds of every edge from `pred` to `succ`.
    pub fn edge_kinds(&self, pred: BlockId, succ: BlockId) -> Vec<EdgeKind> {
        self.edges(pred)
            .into_iter()
            .filter(|e| e.target == succ)
            .map(|e| e.kind)
            .collect()
    }

    /// Distinct successors of `id`.
    pub fn successors(&self, id: BlockId) -> Vec<BlockId> {
        let mut succs = Vec::new();
        for edge in self.edges(id) {
            if !succs.contains(&edge.target) {
                succs.push(edge.target);
            }
        }
        succs
    }

    /// Distinct predecessors of `id`.
    pub fn predecessors(&self, id: BlockId) -> &[BlockId] {
        self.predecessors.get(&id).map_or(&[], Vec::as_slice)
    }

    /// Blocks reachable from the entry block.
    pub fn reachable(&self) -> FxHashSet<BlockId> {
        let mut seen = FxHashSet::default();
        let mut queue = VecDeque::new();
        if self.block(self.entry).is_some() {
            seen.insert(self.entry);
            queue.push_back(self.entry);
        }
        while let Some(id) = queue.pop_front() {
            for succ in self.successors(id) {
                if self.block(succ).is_some() && seen.insert(succ) {
                    queue.push_back(succ);
                }
            }
        }
        seen
    }

    /// Non-null blocks ordered by block number from higher to lower.
    pub fn ordered_blocks(&self) -> Vec<BlockId> {
        self.blocks.iter().flatten().rev().map(|b| b.id).collect()
    }
}

/// A function body ready for analysis.
#[derive(Clone, Debug)]
pub struct Function {
    pub name: String,
    pub decls: Decls,
    pub cfg: Cfg,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Expr, FunctionBuilder, VarKind};

    fn diamond() -> Function {
        let mut b = FunctionBuilder::new("diamond");
        let x = b.param("x", VarKind::Other);
        let entry = b.block(3);
        let then_b = b.block(2);
        let join = b.block(1);
        let exit = b.block(0);
        b.entry(entry).exit(exit);
        b.terminate(entry, Terminator::branch(Expr::var(x), then_b, join));
        b.terminate(then_b, Terminator::Goto(join));
        b.terminate(join, Terminator::Return);
        b.build().unwrap()
    }

    #[test]
    fn test_predecessors() {
        let f = diamond();
        let mut preds = f.cfg.predecessors(BlockId(1)).to_vec();
        preds.sort();
        assert_eq!(preds, vec![BlockId(2), BlockId(3)]);
        assert_eq!(f.cfg.predecessors(BlockId(0)), &[BlockId(1)]);
        assert!(f.cfg.predecessors(BlockId(3)).is_empty());
    }

    #[test]
    fn test_edge_kinds() {
        let f = diamond();
        assert_eq!(
            f.cfg.edge_kinds(BlockId(3), BlockId(2)),
            vec![EdgeKind::ConditionalTrue]
        );
        assert_eq!(
            f.cfg.edge_kinds(BlockId(3), BlockId(1)),
            vec![EdgeKind::ConditionalFalse]
        );
    }

    #[test]
    fn test_ordered_blocks_descending() {
        let f = diamond();
        assert_eq!(
            f.cfg.ordered_blocks(),
            vec![BlockId(3), BlockId(2), BlockId(1), BlockId(0)]
        );
    }

    #[test]
    fn test_unreachable_block() {
        let mut b = FunctionBuilder::new("dead");
        let entry = b.block(2);
        let dead = b.block(1);
        let exit = b.block(0);
        b.entry(entry).exit(exit);
        b.terminate(dead, Terminator::Goto(exit));
        let f = b.build().unwrap();
        let reachable = f.cfg.reachable();
        assert!(reachable.contains(&entry));
        assert!(reachable.contains(&exit));
        assert!(!reachable.contains(&dead));
    }
}
