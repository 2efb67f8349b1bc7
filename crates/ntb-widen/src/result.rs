//! Widened bounds handed to the bounds checker.

use std::collections::BTreeMap;

use ntb_canon::expr_deref_offset;
use ntb_ir::{BlockId, ConstEvaluator, Expr, VarId};

use crate::facts::{Bound, BoundsMap, VarSet};

/// A statement of a block. `index == stmts.len()` names the terminator condition.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct StmtRef {
    pub block: BlockId,
    pub index: usize,
}

impl StmtRef {
    pub const fn new(block: BlockId, index: usize) -> Self {
        Self { block, index }
    }
}

/// Facts immediately before and after one statement.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StmtFacts {
    pub before: BoundsMap,
    pub after: BoundsMap,
}

/// Final dataflow sets of one block.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BlockFacts {
    pub in_facts: BoundsMap,
    /// Out set including the widening of the terminator's null test.
    pub out: BoundsMap,
    pub generated: BoundsMap,
    pub kill: VarSet,
    pub stmts: Vec<StmtFacts>,
}

/// How a fact relates to the declared upper bound of its variable.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Widening {
    /// Declared upper bound plus a constant.
    Offset(i64),
    /// Not provably related to the declared bound.
    Unrelated(Expr),
}

/// Result of bounds widening for one function.
#[derive(Clone, Debug)]
pub struct WidenedBounds {
    pub(crate) function: String,
    pub(crate) blocks: BTreeMap<BlockId, BlockFacts>,
    pub(crate) declared: BTreeMap<VarId, Expr>,
    pub(crate) eval: ConstEvaluator,
    pub(crate) converged: bool,
    pub(crate) iterations: usize,
}

impl WidenedBounds {
    /// A result with no facts at all.
    pub(crate) const fn empty(
        function: String,
        declared: BTreeMap<VarId, Expr>,
        eval: ConstEvaluator,
        iterations: usize,
    ) -> Self {
        Self {
            function,
            blocks: BTreeMap::new(),
            declared,
            eval,
            converged: false,
            iterations,
        }
    }

    pub fn function(&self) -> &str {
        &self.function
    }

    /// False when the iteration limit was hit and all facts were dropped.
    pub const fn converged(&self) -> bool {
        self.converged
    }

    pub const fn iterations(&self) -> usize {
        self.iterations
    }

    pub fn block(&self, id: BlockId) -> Option<&BlockFacts> {
        self.blocks.get(&id)
    }

    /// Analyzed blocks in descending block number.
    pub fn blocks(&self) -> impl Iterator<Item = (BlockId, &BlockFacts)> {
        self.blocks.iter().rev().map(|(id, facts)| (*id, facts))
    }

    pub fn stmt(&self, stmt: StmtRef) -> Option<&StmtFacts> {
        self.blocks.get(&stmt.block)?.stmts.get(stmt.index)
    }

    /// Facts valid immediately before `stmt`.
    pub fn before(&self, stmt: StmtRef) -> Option<&BoundsMap> {
        self.stmt(stmt).map(|s| &s.before)
    }

    /// Facts valid immediately after `stmt`.
    pub fn after(&self, stmt: StmtRef) -> Option<&BoundsMap> {
        self.stmt(stmt).map(|s| &s.after)
    }

    /// Offset of `var`'s bound after `stmt` from its declared upper bound.
    pub fn widened_offset(&self, var: VarId, stmt: StmtRef) -> Option<i64> {
        let fact = self.after(stmt)?.get(&var)?.upper()?;
        let declared = self.declared.get(&var)?;
        expr_deref_offset(declared, fact, self.eval)
    }

    /// Facts after `stmt` that differ from the declared upper bounds.
    pub fn widenings(&self, stmt: StmtRef) -> Vec<(VarId, Widening)> {
        let Some(after) = self.after(stmt) else {
            return Vec::new();
        };
        after
            .iter()
            .filter_map(|(&var, bound)| {
                let Bound::Upper(upper) = bound else {
                    return None;
                };
                let related = self
                    .declared
                    .get(&var)
                    .and_then(|declared| expr_deref_offset(declared, upper, self.eval));
                match related {
                    Some(0) => None,
                    Some(offset) => Some((var, Widening::Offset(offset))),
                    None => Some((var, Widening::Unrelated(upper.clone()))),
                }
            })
            .collect()
    }
}
