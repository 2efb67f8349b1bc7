//! Block terminator IR.

use crate::block::BlockId;
use crate::expr::Expr;

/// Block terminator - controls where execution goes next.
#[derive(Clone, Debug)]
pub enum Terminator {
    /// Unconditional transfer, including fallthrough between switch cases.
    Goto(BlockId),
    /// Two-way conditional branch on `cond`.
    Branch {
        cond: Expr,
        then_target: BlockId,
        else_target: BlockId,
    },
    /// Multi-way branch on `cond`. Case targets carry their labels.
    Switch {
        cond: Expr,
        cases: Vec<BlockId>,
        /// Explicit `default:` block, or the block following the switch.
        default: BlockId,
    },
    /// Return from the function (edge to the exit block).
    Return,
    /// Terminator of the exit block itself.
    Exit,
}

impl Default for Terminator {
    fn default() -> Self {
        Self::Return
    }
}

impl Terminator {
    /// Create a conditional branch terminator.
    pub const fn branch(cond: Expr, then_target: BlockId, else_target: BlockId) -> Self {
        Self::Branch {
            cond,
            then_target,
            else_target,
        }
    }

    /// Create a switch terminator.
    pub const fn switch(cond: Expr, cases: Vec<BlockId>, default: BlockId) -> Self {
        Self::Switch {
            cond,
            cases,
            default,
        }
    }

    /// The controlling condition, if this terminator is conditional.
    pub const fn condition(&self) -> Option<&Expr> {
        match self {
            Self::Branch { cond, .. } | Self::Switch { cond, .. } => Some(cond),
            _ => None,
        }
    }

    /// Check if this terminator is a two-way branch.
    pub const fn is_branch(&self) -> bool {
        matches!(self, Self::Branch { .. })
    }

    /// Check if this terminator is a switch.
    pub const fn is_switch(&self) -> bool {
        matches!(self, Self::Switch { .. })
    }

    /// Get static targets. `Return` resolves to `exit`.
    pub fn targets(&self, exit: BlockId) -> Vec<BlockId> {
        match self {
            Self::Goto(target) => vec![*target],
            Self::Branch {
                then_target,
                else_target,
                ..
            } => vec![*then_target, *else_target],
            Self::Switch { cases, default, .. } => {
                let mut targets = cases.clone();
                targets.push(*default);
                targets
            }
            Self::Return => vec![exit],
            Self::Exit => Vec::new(),
        }
    }
}
