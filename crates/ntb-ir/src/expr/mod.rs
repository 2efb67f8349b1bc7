//! Expression IR.

mod display;

pub use display::*;

use rustc_hash::FxHashSet;

use crate::decl::{FieldId, VarId};

/// Unary operations.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum UnaryOp {
    PostInc,
    PostDec,
    PreInc,
    PreDec,
    AddrOf,
    Deref,
    Plus,
    Minus,
    BitNot,
    Not,
}

impl UnaryOp {
    /// Source spelling of the operator.
    pub const fn spelling(self) -> &'static str {
        match self {
            Self::PostInc | Self::PreInc => "++",
            Self::PostDec | Self::PreDec => "--",
            Self::AddrOf => "&",
            Self::Deref => "*",
            Self::Plus => "+",
            Self::Minus => "-",
            Self::BitNot => "~",
            Self::Not => "!",
        }
    }

    /// Check if the operator is written after its operand.
    pub const fn is_postfix(self) -> bool {
        matches!(self, Self::PostInc | Self::PostDec)
    }

    /// Check if the operator writes to its operand.
    pub const fn is_increment_or_decrement(self) -> bool {
        matches!(
            self,
            Self::PostInc | Self::PostDec | Self::PreInc | Self::PreDec
        )
    }
}

/// Binary operations, in host opcode order.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum BinaryOp {
    Mul,
    Div,
    Rem,
    Add,
    Sub,
    Shl,
    Shr,
    Lt,
    Gt,
    Le,
    Ge,
    Eq,
    Ne,
    BitAnd,
    BitXor,
    BitOr,
    LAnd,
    LOr,
    Assign,
    MulAssign,
    DivAssign,
    RemAssign,
    AddAssign,
    SubAssign,
    ShlAssign,
    ShrAssign,
    AndAssign,
    XorAssign,
    OrAssign,
    Comma,
}

impl BinaryOp {
    /// Source spelling of the operator.
    pub const fn spelling(self) -> &'static str {
        match self {
            Self::Mul => "*",
            Self::Div => "/",
            Self::Rem => "%",
            Self::Add => "+",
            Self::Sub => "-",
            Self::Shl => "<<",
            Self::Shr => ">>",
            Self::Lt => "<",
            Self::Gt => ">",
            Self::Le => "<=",
            Self::Ge => ">=",
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::BitAnd => "&",
            Self::BitXor => "^",
            Self::BitOr => "|",
            Self::LAnd => "&&",
            Self::LOr => "||",
            Self::Assign => "=",
            Self::MulAssign => "*=",
            Self::DivAssign => "/=",
            Self::RemAssign => "%=",
            Self::AddAssign => "+=",
            Self::SubAssign => "-=",
            Self::ShlAssign => "<<=",
            Self::ShrAssign => ">>=",
            Self::AndAssign => "&=",
            Self::XorAssign => "^=",
            Self::OrAssign => "|=",
            Self::Comma => ",",
        }
    }

    /// Operators whose operands may be freely reordered and regrouped.
    ///
    /// Only `+` and `*` qualify. Division and remainder are neither
    /// commutative nor associative, and bitwise operators are excluded because
    /// nothing downstream folds them.
    pub const fn is_commutative_and_associative(self) -> bool {
        matches!(self, Self::Add | Self::Mul)
    }

    /// Check if this is `=` or a compound assignment.
    pub const fn is_assignment(self) -> bool {
        matches!(
            self,
            Self::Assign
                | Self::MulAssign
                | Self::DivAssign
                | Self::RemAssign
                | Self::AddAssign
                | Self::SubAssign
                | Self::ShlAssign
                | Self::ShrAssign
                | Self::AndAssign
                | Self::XorAssign
                | Self::OrAssign
        )
    }

    /// Check if this is a relational or equality comparison.
    pub const fn is_comparison(self) -> bool {
        matches!(
            self,
            Self::Lt | Self::Gt | Self::Le | Self::Ge | Self::Eq | Self::Ne
        )
    }
}

/// Conversion kinds carried by casts.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum CastKind {
    LValueToRValue,
    NoOp,
    ArrayToPointerDecay,
    BitCast,
    IntegralCast,
    IntegralToPointer,
    PointerToIntegral,
    NullToPointer,
}

impl CastKind {
    /// Casts that never change the value they convert.
    pub const fn is_value_preserving(self) -> bool {
        matches!(
            self,
            Self::LValueToRValue | Self::NoOp | Self::ArrayToPointerDecay
        )
    }

    /// Host name of the conversion.
    pub const fn name(self) -> &'static str {
        match self {
            Self::LValueToRValue => "LValueToRValue",
            Self::NoOp => "NoOp",
            Self::ArrayToPointerDecay => "ArrayToPointerDecay",
            Self::BitCast => "BitCast",
            Self::IntegralCast => "IntegralCast",
            Self::IntegralToPointer => "IntegralToPointer",
            Self::PointerToIntegral => "PointerToIntegral",
            Self::NullToPointer => "NullToPointer",
        }
    }
}

/// Expression tree node.
///
/// The derived ordering is a structural total order: variant first, then
/// fields. Variables therefore compare by declaration order.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum Expr {
    Int(i64),
    Var(VarId),
    Str(String),
    Unary {
        op: UnaryOp,
        expr: Box<Self>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Self>,
        right: Box<Self>,
    },
    Index {
        base: Box<Self>,
        index: Box<Self>,
    },
    Member {
        base: Box<Self>,
        field: FieldId,
        arrow: bool,
    },
    Cast {
        kind: CastKind,
        implicit: bool,
        expr: Box<Self>,
    },
    Paren(Box<Self>),
    Call {
        callee: Box<Self>,
        args: Vec<Self>,
    },
}

// These are factory methods, not trait implementations
#[allow(clippy::should_implement_trait)]
impl Expr {
    /// Create an integer literal.
    pub const fn int(value: i64) -> Self {
        Self::Int(value)
    }

    /// Create a variable reference.
    pub const fn var(id: VarId) -> Self {
        Self::Var(id)
    }

    /// Create a string literal.
    #[must_use]
    pub fn str(value: &str) -> Self {
        Self::Str(value.to_string())
    }

    pub fn unary(op: UnaryOp, expr: Self) -> Self {
        Self::Unary {
            op,
            expr: Box::new(expr),
        }
    }

    pub fn binary(op: BinaryOp, left: Self, right: Self) -> Self {
        Self::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    // ===== Unary =====

    pub fn deref(expr: Self) -> Self {
        Self::unary(UnaryOp::Deref, expr)
    }

    pub fn addr_of(expr: Self) -> Self {
        Self::unary(UnaryOp::AddrOf, expr)
    }

    pub fn plus(expr: Self) -> Self {
        Self::unary(UnaryOp::Plus, expr)
    }

    pub fn neg(expr: Self) -> Self {
        Self::unary(UnaryOp::Minus, expr)
    }

    pub fn not(expr: Self) -> Self {
        Self::unary(UnaryOp::Not, expr)
    }

    pub fn bit_not(expr: Self) -> Self {
        Self::unary(UnaryOp::BitNot, expr)
    }

    pub fn pre_inc(expr: Self) -> Self {
        Self::unary(UnaryOp::PreInc, expr)
    }

    pub fn pre_dec(expr: Self) -> Self {
        Self::unary(UnaryOp::PreDec, expr)
    }

    pub fn post_inc(expr: Self) -> Self {
        Self::unary(UnaryOp::PostInc, expr)
    }

    pub fn post_dec(expr: Self) -> Self {
        Self::unary(UnaryOp::PostDec, expr)
    }

    // ===== Binary =====

    pub fn add(left: Self, right: Self) -> Self {
        Self::binary(BinaryOp::Add, left, right)
    }

    pub fn sub(left: Self, right: Self) -> Self {
        Self::binary(BinaryOp::Sub, left, right)
    }

    pub fn mul(left: Self, right: Self) -> Self {
        Self::binary(BinaryOp::Mul, left, right)
    }

    pub fn div(left: Self, right: Self) -> Self {
        Self::binary(BinaryOp::Div, left, right)
    }

    pub fn rem(left: Self, right: Self) -> Self {
        Self::binary(BinaryOp::Rem, left, right)
    }

    pub fn eq(left: Self, right: Self) -> Self {
        Self::binary(BinaryOp::Eq, left, right)
    }

    pub fn ne(left: Self, right: Self) -> Self {
        Self::binary(BinaryOp::Ne, left, right)
    }

    pub fn lt(left: Self, right: Self) -> Self {
        Self::binary(BinaryOp::Lt, left, right)
    }

    pub fn land(left: Self, right: Self) -> Self {
        Self::binary(BinaryOp::LAnd, left, right)
    }

    pub fn lor(left: Self, right: Self) -> Self {
        Self::binary(BinaryOp::LOr, left, right)
    }

    pub fn assign(target: Self, value: Self) -> Self {
        Self::binary(BinaryOp::Assign, target, value)
    }

    pub fn comma(left: Self, right: Self) -> Self {
        Self::binary(BinaryOp::Comma, left, right)
    }

    // ===== Postfix and primary =====

    /// Create an array subscript `base[index]`.
    pub fn index(base: Self, index: Self) -> Self {
        Self::Index {
            base: Box::new(base),
            index: Box::new(index),
        }
    }

    /// Create a member access `base->field`.
    pub fn arrow(base: Self, field: FieldId) -> Self {
        Self::Member {
            base: Box::new(base),
            field,
            arrow: true,
        }
    }

    /// Create a member access `base.field`.
    pub fn dot(base: Self, field: FieldId) -> Self {
        Self::Member {
            base: Box::new(base),
            field,
            arrow: false,
        }
    }

    /// Create an implicit conversion inserted by the host.
    pub fn implicit_cast(kind: CastKind, expr: Self) -> Self {
        Self::Cast {
            kind,
            implicit: true,
            expr: Box::new(expr),
        }
    }

    /// Create an explicit (source-level) cast.
    pub fn explicit_cast(kind: CastKind, expr: Self) -> Self {
        Self::Cast {
            kind,
            implicit: false,
            expr: Box::new(expr),
        }
    }

    /// Wrap in parentheses.
    pub fn paren(expr: Self) -> Self {
        Self::Paren(Box::new(expr))
    }

    /// Create a call expression.
    pub fn call(callee: Self, args: Vec<Self>) -> Self {
        Self::Call {
            callee: Box::new(callee),
            args,
        }
    }

    // ===== Queries =====

    /// Strip parentheses and casts that do not change the value.
    pub fn ignore_value_preserving(&self) -> &Self {
        let mut expr = self;
        loop {
            match expr {
                Self::Paren(inner) => expr = inner,
                Self::Cast { kind, expr: inner, .. } if kind.is_value_preserving() => {
                    expr = inner;
                }
                _ => return expr,
            }
        }
    }

    /// The variable this expression names, ignoring value-preserving wrappers.
    pub fn as_var(&self) -> Option<VarId> {
        match self.ignore_value_preserving() {
            Self::Var(id) => Some(*id),
            _ => None,
        }
    }

    /// Visit each direct subexpression.
    pub fn for_each_child<'a>(&'a self, mut f: impl FnMut(&'a Self)) {
        match self {
            Self::Int(_) | Self::Var(_) | Self::Str(_) => {}
            Self::Unary { expr, .. } | Self::Cast { expr, .. } | Self::Paren(expr) => f(expr),
            Self::Member { base, .. } => f(base),
            Self::Binary { left, right, .. } => {
                f(left);
                f(right);
            }
            Self::Index { base, index } => {
                f(base);
                f(index);
            }
            Self::Call { callee, args } => {
                f(callee);
                args.iter().for_each(f);
            }
        }
    }

    /// Collect every variable referenced by this expression.
    pub fn collect_vars(&self, out: &mut FxHashSet<VarId>) {
        if let Self::Var(id) = self {
            out.insert(*id);
        }
        self.for_each_child(|child| child.collect_vars(out));
    }

    /// Every variable referenced by this expression.
    pub fn vars(&self) -> FxHashSet<VarId> {
        let mut out = FxHashSet::default();
        self.collect_vars(&mut out);
        out
    }

    /// Collect every variable this expression may write.
    ///
    /// Assignment targets, increment/decrement operands and variables whose
    /// address escapes are all treated as written.
    pub fn collect_modified_vars(&self, out: &mut FxHashSet<VarId>) {
        match self {
            Self::Binary { op, left, .. } if op.is_assignment() => {
                if let Some(var) = left.as_var() {
                    out.insert(var);
                }
            }
            Self::Unary { op, expr } if op.is_increment_or_decrement() => {
                if let Some(var) = expr.as_var() {
                    out.insert(var);
                }
            }
            Self::Unary {
                op: UnaryOp::AddrOf,
                expr,
            } => {
                if let Some(var) = expr.as_var() {
                    out.insert(var);
                }
            }
            _ => {}
        }
        self.for_each_child(|child| child.collect_modified_vars(out));
    }

    /// Every variable this expression may write.
    pub fn modified_vars(&self) -> FxHashSet<VarId> {
        let mut out = FxHashSet::default();
        self.collect_modified_vars(&mut out);
        out
    }
}
