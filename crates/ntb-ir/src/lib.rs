//! Host-neutral IR for bounds widening of null-terminated pointers.
//!
//! This crate models the parts of a C front end the analysis consumes:
//! expressions, declarations with bounds annotations, statements, and a
//! per-function control-flow graph. It knows nothing about widening itself.

mod block;
mod builder;
mod cfg;
mod const_eval;
mod decl;
mod error;
mod expr;
mod stmt;
mod terminator;

pub use block::*;
pub use builder::*;
pub use cfg::*;
pub use const_eval::*;
pub use decl::*;
pub use error::*;
pub use expr::*;
pub use stmt::*;
pub use terminator::*;
