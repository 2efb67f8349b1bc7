//! Gen and Kill sets of individual statements.

use std::collections::BTreeSet;

use ntb_canon::{CanonicalTree, deref_offset};
use ntb_ir::{BinaryOp, CastKind, ConstEvaluator, Decls, Expr, Function, Stmt, UnaryOp, VarId};
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::trace;

use crate::error::WideningError;
use crate::facts::{Bound, BoundsMap, VarSet};

/// Maps each variable to the NT-pointers whose candidate bounds mention it.
///
/// Candidate bounds are the declared bounds and every where clause of the
/// function. An NT-pointer always depends on itself.
#[derive(Clone, Debug, Default)]
pub struct BoundsIndex {
    dependents: FxHashMap<VarId, BTreeSet<VarId>>,
}

impl BoundsIndex {
    /// Index the declarations and where clauses of `func`.
    pub fn build(func: &Function) -> Result<Self, WideningError> {
        let mut index = Self::default();
        for decl in func.decls.null_terminated() {
            index.add(decl.id, decl.id);
            if let Some(bounds) = &decl.bounds {
                index.add_bounds(decl.id, &bounds.lower_for(decl.id));
                index.add_bounds(decl.id, &bounds.upper_for(decl.id));
            }
        }
        for block in func.cfg.blocks() {
            for stmt in &block.stmts {
                let Some(clause) = &stmt.where_clause else {
                    continue;
                };
                for (var, bounds) in &clause.facts {
                    if func.decls.var(*var).is_none() {
                        return Err(WideningError::UnknownVar(*var));
                    }
                    if func.decls.is_null_terminated(*var) {
                        index.add_bounds(*var, &bounds.lower_for(*var));
                        index.add_bounds(*var, &bounds.upper_for(*var));
                    }
                }
            }
        }
        Ok(index)
    }

    fn add(&mut self, var: VarId, nt_ptr: VarId) {
        self.dependents.entry(var).or_default().insert(nt_ptr);
    }

    fn add_bounds(&mut self, nt_ptr: VarId, bounds: &Expr) {
        for var in bounds.vars() {
            self.add(var, nt_ptr);
        }
    }

    /// NT-pointers whose bounds become stale when `var` is written.
    pub fn dependents(&self, var: VarId) -> impl Iterator<Item = VarId> + '_ {
        self.dependents.get(&var).into_iter().flatten().copied()
    }
}

/// Gen and Kill sets of one statement. Every generated variable is also killed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StmtEffect {
    pub generated: BoundsMap,
    pub kill: VarSet,
}

impl StmtEffect {
    /// Sequential composition: `self` followed by `next`.
    pub fn then(&self, next: &Self) -> Self {
        let mut generated: BoundsMap = self
            .generated
            .iter()
            .filter(|(var, _)| !next.kill.contains(*var))
            .map(|(var, bound)| (*var, bound.clone()))
            .collect();
        crate::facts::union_into(&mut generated, &next.generated);
        let kill = self.kill.union(&next.kill).copied().collect();
        Self { generated, kill }
    }
}

/// Which outcome of a block condition proves the dereferenced element non-null.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Polarity {
    NonNullOnTrue,
    NonNullOnFalse,
}

impl Polarity {
    const fn flip(self) -> Self {
        match self {
            Self::NonNullOnTrue => Self::NonNullOnFalse,
            Self::NonNullOnFalse => Self::NonNullOnTrue,
        }
    }
}

/// A memory read tested by a block's terminator condition.
#[derive(Clone, Debug)]
pub struct DerefTest<'f> {
    /// Operands whose sum is the dereferenced pointer.
    pub operands: Vec<&'f Expr>,
    pub polarity: Polarity,
    /// Bound proven once the element is known to be non-null.
    pub widened: Expr,
}

impl DerefTest<'_> {
    /// Every variable occurring in the pointer operand.
    pub fn vars(&self) -> FxHashSet<VarId> {
        let mut out = FxHashSet::default();
        for operand in &self.operands {
            operand.collect_vars(&mut out);
        }
        out
    }
}

/// Computes Gen/Kill sets for the statements of one function.
#[derive(Debug)]
pub struct GenKill<'f> {
    decls: &'f Decls,
    index: BoundsIndex,
    eval: ConstEvaluator,
    dump_trees: bool,
}

impl<'f> GenKill<'f> {
    pub const fn new(
        decls: &'f Decls,
        index: BoundsIndex,
        eval: ConstEvaluator,
        dump_trees: bool,
    ) -> Self {
        Self {
            decls,
            index,
            eval,
            dump_trees,
        }
    }

    /// Static effect of a statement: resets caused by writes, then the
    /// declared bounds of a declaration, then its where clause.
    pub fn stmt(&self, stmt: &Stmt) -> StmtEffect {
        let mut effect = StmtEffect::default();
        self.reset_modified(&stmt.modified_vars(), &mut effect);
        if let Some(clause) = &stmt.where_clause {
            for (var, bounds) in &clause.facts {
                if self.decls.is_null_terminated(*var) {
                    effect.kill.insert(*var);
                    effect
                        .generated
                        .insert(*var, Bound::Upper(bounds.upper_for(*var)));
                }
            }
        }
        effect
    }

    /// Static effect of a terminator condition.
    pub fn condition(&self, cond: &Expr) -> StmtEffect {
        let mut effect = StmtEffect::default();
        self.reset_modified(&cond.modified_vars(), &mut effect);
        effect
    }

    /// Writing a variable resets every NT-pointer whose bounds mention it.
    fn reset_modified(&self, modified: &FxHashSet<VarId>, effect: &mut StmtEffect) {
        for &var in modified {
            for nt_ptr in self.index.dependents(var) {
                effect.kill.insert(nt_ptr);
                match self.decls.declared_upper(nt_ptr) {
                    Some(upper) => {
                        effect.generated.insert(nt_ptr, Bound::Upper(upper));
                    }
                    None => {
                        effect.generated.remove(&nt_ptr);
                    }
                }
            }
        }
    }

    /// Find the dereference tested by a block condition, if any.
    ///
    /// For `a && b` and `a || b` the block evaluates `b`. Comparisons against
    /// a null constant and logical negation adjust the polarity. The test is
    /// dropped when no outcome of the whole condition fixes the value of `b`
    /// that implies a non-null element.
    pub fn deref_test<'e>(&self, cond: &'e Expr) -> Option<DerefTest<'e>> {
        let (operand, forced) = block_condition(cond);
        let mut test = self.operand_test(operand)?;
        let non_null_value = test.polarity == Polarity::NonNullOnTrue;
        test.polarity = if forced.on_true == Some(non_null_value) {
            Polarity::NonNullOnTrue
        } else if forced.on_false == Some(non_null_value) {
            Polarity::NonNullOnFalse
        } else {
            trace!("short-circuit outcome does not decide the dereference");
            return None;
        };
        Some(test)
    }

    /// Dereference tested by a condition without short-circuit operators.
    /// The polarity refers to the value of `expr` itself.
    fn operand_test<'e>(&self, mut expr: &'e Expr) -> Option<DerefTest<'e>> {
        let mut polarity = Polarity::NonNullOnTrue;
        loop {
            expr = expr.ignore_value_preserving();
            match expr {
                Expr::Unary {
                    op: UnaryOp::Not,
                    expr: inner,
                } => {
                    polarity = polarity.flip();
                    expr = &**inner;
                }
                Expr::Binary {
                    op: op @ (BinaryOp::Eq | BinaryOp::Ne),
                    left,
                    right,
                } => {
                    let tested = if self.is_null_constant(right) {
                        left
                    } else if self.is_null_constant(left) {
                        right
                    } else {
                        return None;
                    };
                    if *op == BinaryOp::Eq {
                        polarity = polarity.flip();
                    }
                    expr = &**tested;
                }
                Expr::Unary {
                    op: UnaryOp::Deref,
                    expr: ptr,
                } => {
                    return Some(DerefTest {
                        operands: vec![&**ptr],
                        polarity,
                        widened: Expr::add((**ptr).clone(), Expr::int(1)),
                    });
                }
                Expr::Index { base, index } => {
                    let sum = Expr::add((**base).clone(), (**index).clone());
                    return Some(DerefTest {
                        operands: vec![&**base, &**index],
                        polarity,
                        widened: Expr::add(sum, Expr::int(1)),
                    });
                }
                _ => return None,
            }
        }
    }

    fn is_null_constant(&self, expr: &Expr) -> bool {
        match expr.ignore_value_preserving() {
            Expr::Cast {
                kind: CastKind::NullToPointer | CastKind::IntegralCast | CastKind::BitCast,
                expr: inner,
                ..
            } => self.is_null_constant(inner),
            other => self.eval.eval(other) == Ok(0),
        }
    }

    /// Facts generated on the non-null outcome of `test`.
    ///
    /// `before` holds the facts immediately before the condition. An
    /// NT-pointer of the pointer operand is widened to `ptr + 1` when the
    /// dereference sits exactly at its current upper bound.
    pub fn terminator_gen(
        &self,
        test: &DerefTest<'_>,
        cond: &Expr,
        before: &BoundsMap,
    ) -> BoundsMap {
        let mut generated = BoundsMap::new();
        let ptr_vars = test.vars();
        if cond.modified_vars().iter().any(|v| ptr_vars.contains(v)) {
            trace!("condition modifies its own pointer operand");
            return generated;
        }
        let Ok(ptr_tree) = CanonicalTree::from_sum(&test.operands, self.eval) else {
            return generated;
        };

        let mut nt_vars: Vec<VarId> = ptr_vars
            .into_iter()
            .filter(|v| self.decls.is_null_terminated(*v))
            .collect();
        nt_vars.sort_unstable();

        for var in nt_vars {
            let upper = match before.get(&var) {
                Some(Bound::Upper(upper)) => upper.clone(),
                Some(Bound::Top) => continue,
                None => match self.decls.declared_upper(var) {
                    Some(upper) => upper,
                    None => continue,
                },
            };
            let Ok(upper_tree) = CanonicalTree::from_expr(&upper, self.eval) else {
                continue;
            };
            if self.dump_trees {
                trace!(
                    var = self.decls.var(var).map_or("?", |d| d.name.as_str()),
                    bound = %upper_tree.pretty(self.decls),
                    deref = %ptr_tree.pretty(self.decls),
                    "canonical trees"
                );
            }
            let offset = deref_offset(&upper_tree, &ptr_tree);
            trace!(%var, ?offset, "dereference offset from current bound");
            if offset == Some(0) {
                generated.insert(var, Bound::Upper(test.widened.clone()));
            }
        }
        generated
    }
}

/// Value of the evaluated operand fixed by each outcome of a condition.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct ForcedValue {
    on_true: Option<bool>,
    on_false: Option<bool>,
}

/// Strip short-circuit operators down to the operand the block evaluates.
///
/// `a && b` is true only if `b` is true; `a || b` is false only if `b` is
/// false. The other outcome says nothing about `b`.
fn block_condition(cond: &Expr) -> (&Expr, ForcedValue) {
    let mut expr = cond.ignore_value_preserving();
    let mut forced = ForcedValue {
        on_true: Some(true),
        on_false: Some(false),
    };
    while let Expr::Binary {
        op: op @ (BinaryOp::LAnd | BinaryOp::LOr),
        right,
        ..
    } = expr
    {
        let kept = Some(*op == BinaryOp::LAnd);
        for value in [&mut forced.on_true, &mut forced.on_false] {
            if *value != kept {
                *value = None;
            }
        }
        expr = right.ignore_value_preserving();
    }
    (expr, forced)
}
