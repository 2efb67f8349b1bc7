//! Basic block IR.

use std::fmt;

use crate::expr::Expr;
use crate::stmt::Stmt;
use crate::terminator::Terminator;

/// Block number. Numbers decrease from the entry block to the exit block.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct BlockId(pub u32);

impl BlockId {
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "B{}", self.0)
    }
}

/// Switch label attached to the first statement of a block.
#[derive(Clone, Debug)]
pub enum CaseLabel {
    /// `case lo:` or the GNU range `case lo ... hi:`.
    Case { lo: Expr, hi: Option<Expr> },
    /// `default:`.
    Default,
}

impl CaseLabel {
    pub const fn case(value: Expr) -> Self {
        Self::Case {
            lo: value,
            hi: None,
        }
    }

    pub const fn range(lo: Expr, hi: Expr) -> Self {
        Self::Case { lo, hi: Some(hi) }
    }

    pub const fn is_default(&self) -> bool {
        matches!(self, Self::Default)
    }
}

/// A basic block: straight-line statements followed by a terminator.
#[derive(Clone, Debug)]
pub struct BasicBlock {
    pub id: BlockId,
    pub label: Option<CaseLabel>,
    pub stmts: Vec<Stmt>,
    pub terminator: Terminator,
}

impl BasicBlock {
    /// Create an empty block that returns.
    pub const fn new(id: BlockId) -> Self {
        Self {
            id,
            label: None,
            stmts: Vec::new(),
            terminator: Terminator::Return,
        }
    }

    /// Number of analysis elements: statements plus the terminator condition.
    pub fn element_count(&self) -> usize {
        self.stmts.len() + usize::from(self.terminator.condition().is_some())
    }

    /// Index the terminator condition occupies among the block elements.
    pub fn terminator_index(&self) -> Option<usize> {
        self.terminator.condition().map(|_| self.stmts.len())
    }

    pub fn len(&self) -> usize {
        self.stmts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stmts.is_empty()
    }
}
