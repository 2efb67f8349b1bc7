//! Structural total order over canonical trees, and dereference offsets.

use std::cmp::Ordering;

use ntb_ir::{BinaryOp, ConstEvaluator, Expr};
use tracing::trace;

use crate::tree::{CanonicalTree, Leaf, NodeId, NodeKind};

const fn kind_rank(kind: &NodeKind<'_>) -> u8 {
    match kind {
        NodeKind::Binary { .. } => 0,
        NodeKind::Unary { .. } => 1,
        NodeKind::Member { .. } => 2,
        NodeKind::Cast { .. } => 3,
        NodeKind::Leaf(_) => 4,
    }
}

fn compare_leaves(a: &Leaf<'_>, b: &Leaf<'_>) -> Ordering {
    match (a, b) {
        (Leaf::Const(x), Leaf::Const(y)) => x.cmp(y),
        (Leaf::Const(_), Leaf::Expr(_)) => Ordering::Less,
        (Leaf::Expr(_), Leaf::Const(_)) => Ordering::Greater,
        (Leaf::Expr(x), Leaf::Expr(y)) => x.cmp(y),
    }
}

/// Compare node `a` of tree `ta` with node `b` of tree `tb`.
///
/// Order: node kind, then operator, field or conversion kind, then children
/// in list order.
pub(crate) fn compare_nodes(
    ta: &CanonicalTree<'_>,
    a: NodeId,
    tb: &CanonicalTree<'_>,
    b: NodeId,
) -> Ordering {
    let (ka, kb) = (ta.kind(a), tb.kind(b));
    let by_kind = kind_rank(ka).cmp(&kind_rank(kb));
    if by_kind != Ordering::Equal {
        return by_kind;
    }
    match (ka, kb) {
        (
            NodeKind::Binary {
                op: op_a,
                children: ca,
            },
            NodeKind::Binary {
                op: op_b,
                children: cb,
            },
        ) => op_a
            .cmp(op_b)
            .then_with(|| ca.len().cmp(&cb.len()))
            .then_with(|| {
                ca.iter()
                    .zip(cb)
                    .map(|(&x, &y)| compare_nodes(ta, x, tb, y))
                    .find(|o| *o != Ordering::Equal)
                    .unwrap_or(Ordering::Equal)
            }),
        (
            NodeKind::Unary {
                op: op_a,
                child: ca,
            },
            NodeKind::Unary {
                op: op_b,
                child: cb,
            },
        ) => op_a
            .cmp(op_b)
            .then_with(|| compare_nodes(ta, *ca, tb, *cb)),
        // Arrow members order first.
        (
            NodeKind::Member {
                field: fa,
                arrow: aa,
                base: ba,
            },
            NodeKind::Member {
                field: fb,
                arrow: ab,
                base: bb,
            },
        ) => ab
            .cmp(aa)
            .then_with(|| fa.cmp(fb))
            .then_with(|| compare_nodes(ta, *ba, tb, *bb)),
        (
            NodeKind::Cast {
                kind: cast_a,
                child: ca,
            },
            NodeKind::Cast {
                kind: cast_b,
                child: cb,
            },
        ) => cast_a.cmp(cast_b).then_with(|| compare_nodes(ta, *ca, tb, *cb)),
        (NodeKind::Leaf(la), NodeKind::Leaf(lb)) => compare_leaves(la, lb),
        _ => by_kind,
    }
}

/// Total order over whole trees.
pub fn compare(a: &CanonicalTree<'_>, b: &CanonicalTree<'_>) -> Ordering {
    compare_nodes(a, a.root(), b, b.root())
}

/// Offset of `deref` from `upper`, when the two trees differ only in one
/// pair of constant operands of their additive roots.
///
/// Returns `deref - upper`, or `None` when the trees are unrelated or the
/// difference overflows.
pub fn deref_offset(upper: &CanonicalTree<'_>, deref: &CanonicalTree<'_>) -> Option<i64> {
    let NodeKind::Binary {
        op: op_u,
        children: cu,
    } = upper.kind(upper.root())
    else {
        return None;
    };
    let NodeKind::Binary {
        op: op_d,
        children: cd,
    } = deref.kind(deref.root())
    else {
        return None;
    };
    if op_u != op_d || cu.len() != cd.len() {
        return None;
    }

    let mut offset = None;
    for (&u, &d) in cu.iter().zip(cd) {
        if compare_nodes(upper, u, deref, d) == Ordering::Equal {
            continue;
        }
        let (NodeKind::Leaf(Leaf::Const(uc)), NodeKind::Leaf(Leaf::Const(dc))) =
            (upper.kind(u), deref.kind(d))
        else {
            return None;
        };
        if *op_u != BinaryOp::Add || offset.is_some() {
            return None;
        }
        offset = Some(upper.evaluator().checked_sub(*dc, *uc).ok()?);
    }
    Some(offset.unwrap_or(0))
}

/// Check whether two expressions have equal canonical forms.
pub fn equivalent(a: &Expr, b: &Expr, eval: ConstEvaluator) -> bool {
    match (
        CanonicalTree::from_expr(a, eval),
        CanonicalTree::from_expr(b, eval),
    ) {
        (Ok(ta), Ok(tb)) => compare(&ta, &tb) == Ordering::Equal,
        (Err(err), _) | (_, Err(err)) => {
            trace!(%err, "canonicalization failed");
            false
        }
    }
}

/// [`deref_offset`] on the canonical forms of two expressions.
pub fn expr_deref_offset(upper: &Expr, deref: &Expr, eval: ConstEvaluator) -> Option<i64> {
    let tu = CanonicalTree::from_expr(upper, eval)
        .map_err(|err| trace!(%err, "canonicalization of bound failed"))
        .ok()?;
    let td = CanonicalTree::from_expr(deref, eval)
        .map_err(|err| trace!(%err, "canonicalization of dereference failed"))
        .ok()?;
    deref_offset(&tu, &td)
}
