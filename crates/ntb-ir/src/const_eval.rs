//! Integer constant evaluation at a fixed signed width.

use thiserror::Error;

use crate::expr::{BinaryOp, CastKind, Expr, UnaryOp};

/// Width of `int` on the hosts we model.
pub const DEFAULT_INT_WIDTH: u32 = 32;

/// Why an expression has no constant value.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstEvalError {
    #[error("expression is not an integer constant")]
    NotConstant,
    #[error("constant overflows {0}-bit signed integer")]
    Overflow(u32),
    #[error("division by zero in constant expression")]
    DivisionByZero,
    #[error("unsupported integer width {0}")]
    UnsupportedWidth(u32),
}

/// Evaluates integer constant expressions as signed `width`-bit values.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ConstEvaluator {
    width: u32,
}

impl Default for ConstEvaluator {
    fn default() -> Self {
        Self {
            width: DEFAULT_INT_WIDTH,
        }
    }
}

impl ConstEvaluator {
    /// Create an evaluator for `width`-bit signed integers (8 to 64 bits).
    pub fn new(width: u32) -> Result<Self, ConstEvalError> {
        if !(8..=64).contains(&width) {
            return Err(ConstEvalError::UnsupportedWidth(width));
        }
        Ok(Self { width })
    }

    pub const fn width(self) -> u32 {
        self.width
    }

    const fn min(self) -> i128 {
        -(1i128 << (self.width - 1))
    }

    const fn max(self) -> i128 {
        (1i128 << (self.width - 1)) - 1
    }

    /// Check if `value` is representable.
    pub const fn fits(self, value: i128) -> bool {
        value >= self.min() && value <= self.max()
    }

    fn narrow(self, value: i128) -> Result<i64, ConstEvalError> {
        if self.fits(value) {
            i64::try_from(value).map_err(|_| ConstEvalError::Overflow(self.width))
        } else {
            Err(ConstEvalError::Overflow(self.width))
        }
    }

    pub fn checked_add(self, a: i64, b: i64) -> Result<i64, ConstEvalError> {
        self.narrow(i128::from(a) + i128::from(b))
    }

    pub fn checked_sub(self, a: i64, b: i64) -> Result<i64, ConstEvalError> {
        self.narrow(i128::from(a) - i128::from(b))
    }

    pub fn checked_mul(self, a: i64, b: i64) -> Result<i64, ConstEvalError> {
        self.narrow(i128::from(a) * i128::from(b))
    }

    pub fn checked_neg(self, a: i64) -> Result<i64, ConstEvalError> {
        self.narrow(-i128::from(a))
    }

    /// Evaluate `expr` to a constant.
    pub fn eval(self, expr: &Expr) -> Result<i64, ConstEvalError> {
        match expr {
            Expr::Int(value) => self.narrow(i128::from(*value)),
            Expr::Paren(inner) => self.eval(inner),
            // An explicit integral cast may truncate to a narrower type whose
            // width is unknown here.
            Expr::Cast {
                kind,
                implicit,
                expr,
            } => match kind {
                CastKind::IntegralCast if *implicit => self.eval(expr),
                k if k.is_value_preserving() => self.eval(expr),
                _ => Err(ConstEvalError::NotConstant),
            },
            Expr::Unary { op, expr } => {
                let v = self.eval(expr)?;
                match op {
                    UnaryOp::Plus => Ok(v),
                    UnaryOp::Minus => self.checked_neg(v),
                    UnaryOp::BitNot => self.narrow(i128::from(!v)),
                    UnaryOp::Not => Ok(i64::from(v == 0)),
                    _ => Err(ConstEvalError::NotConstant),
                }
            }
            Expr::Binary { op, left, right } => self.eval_binary(*op, left, right),
            _ => Err(ConstEvalError::NotConstant),
        }
    }

    fn eval_binary(self, op: BinaryOp, left: &Expr, right: &Expr) -> Result<i64, ConstEvalError> {
        // Short-circuit operators only need the left side when it decides.
        if matches!(op, BinaryOp::LAnd | BinaryOp::LOr) {
            let l = self.eval(left)? != 0;
            if op == BinaryOp::LAnd && !l {
                return Ok(0);
            }
            if op == BinaryOp::LOr && l {
                return Ok(1);
            }
            return Ok(i64::from(self.eval(right)? != 0));
        }

        let a = i128::from(self.eval(left)?);
        let b = i128::from(self.eval(right)?);
        let value = match op {
            BinaryOp::Add => a + b,
            BinaryOp::Sub => a - b,
            BinaryOp::Mul => a * b,
            BinaryOp::Div | BinaryOp::Rem => {
                if b == 0 {
                    return Err(ConstEvalError::DivisionByZero);
                }
                if op == BinaryOp::Div { a / b } else { a % b }
            }
            BinaryOp::Shl | BinaryOp::Shr => {
                let shift = u32::try_from(b).map_err(|_| ConstEvalError::NotConstant)?;
                if shift >= self.width {
                    return Err(ConstEvalError::Overflow(self.width));
                }
                if op == BinaryOp::Shl { a << shift } else { a >> shift }
            }
            BinaryOp::Lt => i128::from(a < b),
            BinaryOp::Gt => i128::from(a > b),
            BinaryOp::Le => i128::from(a <= b),
            BinaryOp::Ge => i128::from(a >= b),
            BinaryOp::Eq => i128::from(a == b),
            BinaryOp::Ne => i128::from(a != b),
            BinaryOp::BitAnd => a & b,
            BinaryOp::BitXor => a ^ b,
            BinaryOp::BitOr => a | b,
            BinaryOp::Comma => b,
            _ => return Err(ConstEvalError::NotConstant),
        };
        self.narrow(value)
    }
}
