//! Bounds widening for pointers into null-terminated arrays.
//!
//! A forward dataflow analysis computes, for every statement, the upper
//! bounds of NT-pointers proven by earlier dereferences and null tests.
//! Facts flow along CFG edges; only edges implied by a non-null outcome carry
//! the widening of a null test.

mod config;
mod dump;
mod error;
mod facts;
mod gen_kill;
mod prune;
mod result;
mod solver;
mod worklist;

pub use config::*;
pub use dump::DumpDisplay;
pub use error::*;
pub use facts::{Bound, BoundsLattice, BoundsMap, VarSet, apply};
pub use gen_kill::{BoundsIndex, DerefTest, GenKill, Polarity, StmtEffect};
pub use result::*;
pub use solver::*;
pub use worklist::QueueSet;

#[cfg(test)]
mod tests;
