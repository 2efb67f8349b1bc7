//! Statement IR.

use std::fmt;

use rustc_hash::FxHashSet;

use crate::decl::{BoundsExpr, Decls, VarId};
use crate::expr::{Expr, Names};

/// Bounds facts asserted by a `where` clause attached to a statement.
#[derive(Clone, Debug, Default)]
pub struct WhereClause {
    pub facts: Vec<(VarId, BoundsExpr)>,
}

impl WhereClause {
    /// Create a where clause with a single bounds fact.
    pub fn bounds(var: VarId, bounds: BoundsExpr) -> Self {
        Self {
            facts: vec![(var, bounds)],
        }
    }

    /// Add another bounds fact.
    #[must_use]
    pub fn and(mut self, var: VarId, bounds: BoundsExpr) -> Self {
        self.facts.push((var, bounds));
        self
    }
}

/// Statement kinds.
#[derive(Clone, Debug)]
pub enum StmtKind {
    /// Local declaration, optionally initialized.
    Decl { var: VarId, init: Option<Expr> },
    /// Expression statement.
    Expr(Expr),
}

/// A statement of a basic block.
#[derive(Clone, Debug)]
pub struct Stmt {
    pub kind: StmtKind,
    pub where_clause: Option<WhereClause>,
}

impl Stmt {
    /// Create a declaration without initializer.
    pub const fn decl(var: VarId) -> Self {
        Self {
            kind: StmtKind::Decl { var, init: None },
            where_clause: None,
        }
    }

    /// Create an initialized declaration.
    pub const fn decl_init(var: VarId, init: Expr) -> Self {
        Self {
            kind: StmtKind::Decl {
                var,
                init: Some(init),
            },
            where_clause: None,
        }
    }

    /// Create an expression statement.
    pub const fn expr(expr: Expr) -> Self {
        Self {
            kind: StmtKind::Expr(expr),
            where_clause: None,
        }
    }

    /// Attach a where clause.
    #[must_use]
    pub fn with_where(mut self, clause: WhereClause) -> Self {
        self.where_clause = Some(clause);
        self
    }

    /// The expression evaluated by this statement, if any.
    pub const fn value(&self) -> Option<&Expr> {
        match &self.kind {
            StmtKind::Decl { init, .. } => init.as_ref(),
            StmtKind::Expr(expr) => Some(expr),
        }
    }

    /// Variables written by this statement.
    ///
    /// A declaration writes the declared variable even without initializer.
    pub fn modified_vars(&self) -> FxHashSet<VarId> {
        let mut out = FxHashSet::default();
        if let StmtKind::Decl { var, .. } = &self.kind {
            out.insert(*var);
        }
        if let Some(expr) = self.value() {
            expr.collect_modified_vars(&mut out);
        }
        out
    }

    /// Render with declaration names.
    pub fn display<'a>(&'a self, decls: &'a Decls) -> StmtDisplay<'a> {
        StmtDisplay { stmt: self, decls }
    }
}

/// Display adapter returned by [`Stmt::display`].
pub struct StmtDisplay<'a> {
    stmt: &'a Stmt,
    decls: &'a Decls,
}

impl fmt::Display for StmtDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.stmt.kind {
            StmtKind::Decl { var, init } => {
                let kind = self.decls.var(*var).map(|v| v.kind);
                let ty = match kind {
                    Some(crate::VarKind::NtArrayPtr) => "_Nt_array_ptr<char> ",
                    Some(crate::VarKind::NtCheckedArray) => "char _Nt_checked ",
                    _ => "",
                };
                write!(f, "{ty}{}", self.decls.var_name(*var))?;
                if let Some(bounds) = self.decls.var(*var).and_then(|v| v.bounds.as_ref()) {
                    write!(f, " : ")?;
                    write_bounds(f, bounds, self.decls)?;
                }
                if let Some(init) = init {
                    write!(f, " = {}", init.display(self.decls))?;
                }
            }
            StmtKind::Expr(expr) => write!(f, "{}", expr.display(self.decls))?,
        }
        if let Some(clause) = &self.stmt.where_clause {
            f.write_str(" where ")?;
            for (i, (var, bounds)) in clause.facts.iter().enumerate() {
                if i > 0 {
                    f.write_str(" _And ")?;
                }
                write!(f, "{} : ", self.decls.var_name(*var))?;
                write_bounds(f, bounds, self.decls)?;
            }
        }
        Ok(())
    }
}

fn write_bounds(f: &mut fmt::Formatter<'_>, bounds: &BoundsExpr, decls: &Decls) -> fmt::Result {
    match bounds {
        BoundsExpr::Range { lower, upper } => write!(
            f,
            "bounds({}, {})",
            lower.display(decls),
            upper.display(decls)
        ),
        BoundsExpr::Count(count) => write!(f, "count({})", count.display(decls)),
    }
}
