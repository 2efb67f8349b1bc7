//! C-like rendering of expressions.

use std::fmt;

use super::Expr;
use crate::decl::{FieldId, VarId};

/// Name lookup used when rendering expressions.
pub trait Names {
    fn var_name(&self, id: VarId) -> &str;
    fn field_name(&self, id: FieldId) -> &str;
}

/// Display adapter returned by [`Expr::display`].
pub struct ExprDisplay<'a, N: Names + ?Sized> {
    expr: &'a Expr,
    names: &'a N,
}

impl Expr {
    /// Render this expression with declaration names resolved through `names`.
    pub fn display<'a, N: Names + ?Sized>(&'a self, names: &'a N) -> ExprDisplay<'a, N> {
        ExprDisplay { expr: self, names }
    }
}

impl<N: Names + ?Sized> ExprDisplay<'_, N> {
    fn child<'b>(&'b self, expr: &'b Expr) -> ExprDisplay<'b, N> {
        ExprDisplay {
            expr,
            names: self.names,
        }
    }
}

impl<N: Names + ?Sized> fmt::Display for ExprDisplay<'_, N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.expr {
            Expr::Int(value) => write!(f, "{value}"),
            Expr::Var(id) => f.write_str(self.names.var_name(*id)),
            Expr::Str(value) => write!(f, "{value:?}"),
            Expr::Unary { op, expr } => {
                if op.is_postfix() {
                    write!(f, "{}{}", self.child(expr), op.spelling())
                } else {
                    write!(f, "{}{}", op.spelling(), self.child(expr))
                }
            }
            Expr::Binary { op, left, right } => {
                if *op == super::BinaryOp::Comma {
                    write!(f, "{}, {}", self.child(left), self.child(right))
                } else {
                    write!(
                        f,
                        "{} {} {}",
                        self.child(left),
                        op.spelling(),
                        self.child(right)
                    )
                }
            }
            Expr::Index { base, index } => {
                write!(f, "{}[{}]", self.child(base), self.child(index))
            }
            Expr::Member { base, field, arrow } => {
                let sep = if *arrow { "->" } else { "." };
                write!(
                    f,
                    "{}{sep}{}",
                    self.child(base),
                    self.names.field_name(*field)
                )
            }
            // Implicit conversions are invisible in source.
            Expr::Cast {
                implicit: true,
                expr,
                ..
            } => write!(f, "{}", self.child(expr)),
            Expr::Cast { kind, expr, .. } => write!(f, "({}){}", kind.name(), self.child(expr)),
            Expr::Paren(expr) => write!(f, "({})", self.child(expr)),
            Expr::Call { callee, args } => {
                write!(f, "{}(", self.child(callee))?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", self.child(arg))?;
                }
                f.write_str(")")
            }
        }
    }
}
