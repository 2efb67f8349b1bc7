use thiserror::Error;

/// Analysis errors.
#[derive(Error, Debug)]
pub enum Error {
    #[error("IR error: {0}")]
    Ir(#[from] ntb_ir::IrError),
    #[error("widening error: {0}")]
    Widening(#[from] ntb_widen::WideningError),
    #[error("dump pattern failed to compile: {0}")]
    Pattern(#[from] regex::Error),
    #[error("malformed dump at line {line}: {reason}")]
    MalformedDump { line: usize, reason: &'static str },
}

pub type Result<T> = std::result::Result<T, Error>;
