//! NTB - bounds widening for null-terminated array pointers
//!
//! Proves, per statement, how far the upper bound of a `_Nt_array_ptr` can be
//! extended past its declared bound after dereferences and null tests.
//!
//! # Example
//!
//! ```ignore
//! use ntb::{Analyzer, FunctionBuilder, WideningConfig};
//!
//! let func = builder.build()?;
//! let analyzer = Analyzer::new(WideningConfig::default());
//! let widened = analyzer.analyze(&func)?;
//! println!("{}", widened.display(&func));
//! ```

// Re-export from sub-crates
pub use ntb_canon::{
    CanonError, CanonicalTree, Leaf, NodeId, NodeKind, TreeDisplay, compare, deref_offset,
    equivalent, expr_deref_offset,
};
pub use ntb_ir::{
    BasicBlock, BinaryOp, BlockId, BoundsExpr, CaseLabel, CastKind, Cfg, ConstEvalError,
    ConstEvaluator, Decls, EdgeKind, Expr, FieldId, Function, FunctionBuilder, IrError, Names,
    Stmt, StmtKind, Terminator, UnaryOp, VarDecl, VarId, VarKind, WhereClause,
};
pub use ntb_widen::{
    BlockFacts, Bound, BoundsMap, DumpDisplay, StmtFacts, StmtRef, WidenedBounds, Widening,
    WideningConfig, WideningError, widen_bounds,
};

mod analyzer;
mod dump_parse;
mod error;

pub use analyzer::*;
pub use dump_parse::*;
pub use error::*;
