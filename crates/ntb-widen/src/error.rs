use ntb_ir::{ConstEvalError, VarId};
use thiserror::Error;

/// Errors raised when the analysis input violates the host contract.
///
/// Imprecision is never an error; it only drops facts.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WideningError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConstEvalError),
    #[error("bounds annotation names undeclared variable {0}")]
    UnknownVar(VarId),
}
