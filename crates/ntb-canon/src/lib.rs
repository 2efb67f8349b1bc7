//! Canonical expression trees.
//!
//! Two expressions that denote the same pointer or integer computation,
//! modulo commutativity and associativity of `+`/`*` and constant arithmetic,
//! normalize to trees that compare equal. Trees that differ only in one
//! constant operand of their additive root are related by a provable offset.

mod compare;
mod error;
mod normalize;
mod pretty;
mod tree;

pub use compare::{compare, deref_offset, equivalent, expr_deref_offset};
pub use error::*;
pub use pretty::TreeDisplay;
pub use tree::*;
