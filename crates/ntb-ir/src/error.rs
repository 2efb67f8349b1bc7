use thiserror::Error;

use crate::block::BlockId;
use crate::decl::VarId;

/// Errors raised while assembling a function.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IrError {
    #[error("entry block not set")]
    MissingEntry,
    #[error("exit block not set")]
    MissingExit,
    #[error("block {0} declared twice")]
    DuplicateBlock(BlockId),
    #[error("block {from} targets undeclared block {to}")]
    UnknownTarget { from: BlockId, to: BlockId },
    #[error("block {0} is not declared")]
    UnknownBlock(BlockId),
    #[error("exit block {0} must not have statements or successors")]
    NonEmptyExit(BlockId),
    #[error("exit block {exit} must be numbered below entry block {entry}")]
    ExitAfterEntry { entry: BlockId, exit: BlockId },
    #[error("variable {0} is not declared")]
    UnknownVar(VarId),
}
