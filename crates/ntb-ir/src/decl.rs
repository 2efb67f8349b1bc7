//! Variable declarations and bounds annotations.

use std::fmt;

use crate::expr::{Expr, Names};

/// Handle for a declared variable. The numeric order is declaration order.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct VarId(pub u32);

/// Handle for a declared struct field. The numeric order is declaration order.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct FieldId(pub u32);

impl VarId {
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl FieldId {
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Declared type category relevant to bounds widening.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum VarKind {
    /// `_Nt_array_ptr<T>`.
    NtArrayPtr,
    /// `T a _Nt_checked[N]`.
    NtCheckedArray,
    /// Anything else (integers, plain pointers, structs).
    Other,
}

impl VarKind {
    /// Check if values of this kind point into a null-terminated array.
    pub const fn is_null_terminated(self) -> bool {
        matches!(self, Self::NtArrayPtr | Self::NtCheckedArray)
    }
}

/// A declared bounds expression.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum BoundsExpr {
    /// `bounds(lower, upper)`.
    Range { lower: Expr, upper: Expr },
    /// `count(e)`, meaning `bounds(v, v + e)` for the annotated variable `v`.
    Count(Expr),
}

impl BoundsExpr {
    pub const fn range(lower: Expr, upper: Expr) -> Self {
        Self::Range { lower, upper }
    }

    pub const fn count(count: Expr) -> Self {
        Self::Count(count)
    }

    /// Lower bound of `var` under this annotation.
    pub fn lower_for(&self, var: VarId) -> Expr {
        match self {
            Self::Range { lower, .. } => lower.clone(),
            Self::Count(_) => Expr::var(var),
        }
    }

    /// Upper bound of `var` under this annotation.
    pub fn upper_for(&self, var: VarId) -> Expr {
        match self {
            Self::Range { upper, .. } => upper.clone(),
            Self::Count(count) => Expr::add(Expr::var(var), count.clone()),
        }
    }
}

/// A variable declaration as seen by the analysis.
#[derive(Clone, Debug)]
pub struct VarDecl {
    pub id: VarId,
    pub name: String,
    pub kind: VarKind,
    /// Declared bounds, if any.
    pub bounds: Option<BoundsExpr>,
    pub is_param: bool,
}

impl VarDecl {
    /// Check if this variable is subject to bounds widening.
    pub const fn is_null_terminated(&self) -> bool {
        self.kind.is_null_terminated()
    }

    /// Declared upper bound, normalized to an expression.
    pub fn declared_upper(&self) -> Option<Expr> {
        self.bounds.as_ref().map(|b| b.upper_for(self.id))
    }

    /// Declared lower bound, normalized to an expression.
    pub fn declared_lower(&self) -> Option<Expr> {
        self.bounds.as_ref().map(|b| b.lower_for(self.id))
    }
}

/// Declaration table for one function.
#[derive(Clone, Debug, Default)]
pub struct Decls {
    vars: Vec<VarDecl>,
    fields: Vec<String>,
}

impl Decls {
    pub(crate) const fn new(vars: Vec<VarDecl>, fields: Vec<String>) -> Self {
        Self { vars, fields }
    }

    /// Look up a variable.
    pub fn var(&self, id: VarId) -> Option<&VarDecl> {
        self.vars.get(id.index())
    }

    /// All variables in declaration order.
    pub fn vars(&self) -> impl Iterator<Item = &VarDecl> {
        self.vars.iter()
    }

    /// Variables that point into null-terminated arrays.
    pub fn null_terminated(&self) -> impl Iterator<Item = &VarDecl> {
        self.vars.iter().filter(|v| v.is_null_terminated())
    }

    /// Check if `id` names a null-terminated pointer.
    pub fn is_null_terminated(&self, id: VarId) -> bool {
        self.var(id).is_some_and(VarDecl::is_null_terminated)
    }

    /// Declared upper bound of `id`, if it has declared bounds.
    pub fn declared_upper(&self, id: VarId) -> Option<Expr> {
        self.var(id).and_then(VarDecl::declared_upper)
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

impl Names for Decls {
    fn var_name(&self, id: VarId) -> &str {
        self.var(id).map_or("<unknown>", |v| v.name.as_str())
    }

    fn field_name(&self, id: FieldId) -> &str {
        self.fields.get(id.index()).map_or("<unknown>", String::as_str)
    }
}

impl fmt::Display for VarId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}
