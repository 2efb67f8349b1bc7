//! FIFO work queue with at most one pending entry per block.

use std::collections::VecDeque;

use ntb_ir::BlockId;
use rustc_hash::FxHashSet;

#[derive(Debug, Default)]
pub struct QueueSet {
    queue: VecDeque<BlockId>,
    in_worklist: FxHashSet<BlockId>,
}

impl QueueSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueue `id` unless it is already pending. Returns whether it was added.
    pub fn push(&mut self, id: BlockId) -> bool {
        if self.in_worklist.insert(id) {
            self.queue.push_back(id);
            true
        } else {
            false
        }
    }

    pub fn pop(&mut self) -> Option<BlockId> {
        let id = self.queue.pop_front()?;
        self.in_worklist.remove(&id);
        Some(id)
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}
