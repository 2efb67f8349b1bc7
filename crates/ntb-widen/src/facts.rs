//! Bounds facts and the lattice they live in.

use std::collections::{BTreeMap, BTreeSet};

use ntb_canon::expr_deref_offset;
use ntb_ir::{ConstEvaluator, Decls, Expr, VarId};
use tracing::trace;

/// Upper bound known for an NT-pointer at a program point.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Bound {
    /// Not yet computed. Identity of the meet.
    Top,
    /// Known upper bound expression.
    Upper(Expr),
}

impl Bound {
    pub const fn upper(&self) -> Option<&Expr> {
        match self {
            Self::Top => None,
            Self::Upper(expr) => Some(expr),
        }
    }

    pub const fn is_top(&self) -> bool {
        matches!(self, Self::Top)
    }
}

/// Facts at a program point. A missing variable has no known bound.
pub type BoundsMap = BTreeMap<VarId, Bound>;

/// Set of variables whose facts a statement invalidates.
pub type VarSet = BTreeSet<VarId>;

/// `(facts - kill) ∪ generated`, with `generated` taking precedence.
pub fn apply(facts: &BoundsMap, kill: &VarSet, generated: &BoundsMap) -> BoundsMap {
    let mut out: BoundsMap = facts
        .iter()
        .filter(|(var, _)| !kill.contains(*var))
        .map(|(var, bound)| (*var, bound.clone()))
        .collect();
    union_into(&mut out, generated);
    out
}

/// Insert every fact of `generated` into `facts`, replacing existing ones.
pub fn union_into(facts: &mut BoundsMap, generated: &BoundsMap) {
    for (var, bound) in generated {
        facts.insert(*var, bound.clone());
    }
}

/// Meet operator over fact sets.
#[derive(Clone, Copy, Debug)]
pub struct BoundsLattice<'a> {
    decls: &'a Decls,
    eval: ConstEvaluator,
}

impl<'a> BoundsLattice<'a> {
    pub const fn new(decls: &'a Decls, eval: ConstEvaluator) -> Self {
        Self { decls, eval }
    }

    /// All of `vars` mapped to `Top`.
    pub fn top(vars: impl IntoIterator<Item = VarId>) -> BoundsMap {
        vars.into_iter().map(|v| (v, Bound::Top)).collect()
    }

    /// Meet of two fact sets. Only variables known on both sides survive.
    pub fn meet(&self, a: &BoundsMap, b: &BoundsMap) -> BoundsMap {
        a.iter()
            .filter_map(|(var, ba)| {
                let bb = b.get(var)?;
                self.meet_bound(*var, ba, bb).map(|bound| (*var, bound))
            })
            .collect()
    }

    /// Meet of two bounds of `var`.
    ///
    /// Bounds related by a provable offset meet to the smaller one; unrelated
    /// bounds fall back to the declared upper bound.
    pub fn meet_bound(&self, var: VarId, a: &Bound, b: &Bound) -> Option<Bound> {
        let (ua, ub) = match (a, b) {
            (Bound::Top, other) | (other, Bound::Top) => return Some(other.clone()),
            (Bound::Upper(ua), Bound::Upper(ub)) => (ua, ub),
        };
        if ua == ub {
            return Some(a.clone());
        }
        match expr_deref_offset(ua, ub, self.eval) {
            Some(offset) if offset >= 0 => Some(a.clone()),
            Some(_) => Some(b.clone()),
            None => {
                trace!(%var, "unrelated bounds meet to declared bound");
                self.decls.declared_upper(var).map(Bound::Upper)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ntb_ir::{BoundsExpr, FunctionBuilder, VarKind};

    fn setup() -> (Decls, VarId, VarId) {
        let mut b = FunctionBuilder::new("f");
        let i = b.param("i", VarKind::Other);
        let p = b.param("p", VarKind::NtArrayPtr);
        b.bounds(p, BoundsExpr::count(Expr::var(i)));
        (b.decls(), p, i)
    }

    fn upper_plus(p: VarId, i: VarId, k: i64) -> Bound {
        Bound::Upper(Expr::add(Expr::add(Expr::var(p), Expr::var(i)), Expr::int(k)))
    }

    #[test]
    fn test_apply() {
        let (_, p, i) = setup();
        let facts = BoundsMap::from([(p, Bound::Top), (i, Bound::Top)]);
        let kill = VarSet::from([p]);
        let generated = BoundsMap::from([(p, upper_plus(p, i, 1))]);
        let out = apply(&facts, &kill, &generated);
        assert_eq!(out.get(&p), Some(&upper_plus(p, i, 1)));
        assert_eq!(out.get(&i), Some(&Bound::Top));
    }

    #[test]
    fn test_meet_top_is_identity() {
        let (decls, p, i) = setup();
        let lattice = BoundsLattice::new(&decls, ConstEvaluator::default());
        assert_eq!(
            lattice.meet_bound(p, &Bound::Top, &upper_plus(p, i, 1)),
            Some(upper_plus(p, i, 1))
        );
    }

    #[test]
    fn test_meet_keeps_smaller_bound() {
        let (decls, p, i) = setup();
        let lattice = BoundsLattice::new(&decls, ConstEvaluator::default());
        assert_eq!(
            lattice.meet_bound(p, &upper_plus(p, i, 2), &upper_plus(p, i, 1)),
            Some(upper_plus(p, i, 1))
        );
        assert_eq!(
            lattice.meet_bound(p, &upper_plus(p, i, 1), &upper_plus(p, i, 3)),
            Some(upper_plus(p, i, 1))
        );
    }

    #[test]
    fn test_meet_unrelated_falls_back_to_declared() {
        let (decls, p, i) = setup();
        let lattice = BoundsLattice::new(&decls, ConstEvaluator::default());
        let other = Bound::Upper(Expr::add(Expr::var(p), Expr::mul(Expr::var(i), Expr::int(2))));
        assert_eq!(
            lattice.meet_bound(p, &upper_plus(p, i, 1), &other),
            Some(Bound::Upper(Expr::add(Expr::var(p), Expr::var(i))))
        );
    }

    #[test]
    fn test_meet_drops_one_sided_facts() {
        let (decls, p, i) = setup();
        let lattice = BoundsLattice::new(&decls, ConstEvaluator::default());
        let a = BoundsMap::from([(p, upper_plus(p, i, 1))]);
        let b = BoundsMap::new();
        assert!(lattice.meet(&a, &b).is_empty());
    }
}
