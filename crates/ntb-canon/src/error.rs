use thiserror::Error;

/// Reasons a canonical tree could not be produced.
///
/// Callers treat every error as "not provably related".
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CanonError {
    #[error("integer overflow while folding constants")]
    Overflow,
    #[error("malformed canonical tree: {0}")]
    Malformed(&'static str),
}
