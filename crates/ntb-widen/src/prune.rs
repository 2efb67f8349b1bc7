//! Edge pruning: which CFG edges carry the facts of a null test's non-null outcome.

use ntb_ir::{BasicBlock, BlockId, CaseLabel, Cfg, ConstEvaluator, EdgeKind, Terminator};

use crate::gen_kill::Polarity;

/// Check whether every edge from `pred` to `curr` implies the dereference
/// tested by `pred`'s terminator read a non-null element.
pub fn edge_is_non_null(
    cfg: &Cfg,
    pred: &BasicBlock,
    curr: BlockId,
    polarity: Polarity,
    eval: ConstEvaluator,
) -> bool {
    match &pred.terminator {
        Terminator::Branch {
            then_target,
            else_target,
            ..
        } => {
            // Both outcomes reach the same block.
            if then_target == else_target {
                return false;
            }
            match polarity {
                Polarity::NonNullOnTrue => *then_target == curr,
                Polarity::NonNullOnFalse => *else_target == curr,
            }
        }
        Terminator::Switch { cases, .. } => {
            // A switch dispatches on the value itself.
            if polarity != Polarity::NonNullOnTrue {
                return false;
            }
            let kinds = cfg.edge_kinds(pred.id, curr);
            !kinds.is_empty()
                && kinds.iter().all(|kind| match kind {
                    EdgeKind::Case => label_of(cfg, curr)
                        .is_some_and(|label| label_excludes_null(label, eval)),
                    EdgeKind::Default => cases.iter().any(|&case| {
                        label_of(cfg, case).is_some_and(|label| label_tests_null(label, eval))
                    }),
                    _ => false,
                })
        }
        _ => false,
    }
}

fn label_of(cfg: &Cfg, id: BlockId) -> Option<&CaseLabel> {
    cfg.block(id)?.label.as_ref()
}

/// `case 0:` or a case range containing 0.
fn label_tests_null(label: &CaseLabel, eval: ConstEvaluator) -> bool {
    match label {
        CaseLabel::Case { lo, hi: None } => eval.eval(lo) == Ok(0),
        CaseLabel::Case { lo, hi: Some(hi) } => match (eval.eval(lo), eval.eval(hi)) {
            (Ok(lo), Ok(hi)) => lo <= 0 && 0 <= hi,
            _ => false,
        },
        CaseLabel::Default => false,
    }
}

/// A case label that provably cannot match 0.
fn label_excludes_null(label: &CaseLabel, eval: ConstEvaluator) -> bool {
    match label {
        CaseLabel::Case { lo, hi: None } => eval.eval(lo).is_ok_and(|v| v != 0),
        CaseLabel::Case { lo, hi: Some(hi) } => match (eval.eval(lo), eval.eval(hi)) {
            (Ok(lo), Ok(hi)) => !(lo <= 0 && 0 <= hi),
            _ => false,
        },
        CaseLabel::Default => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ntb_ir::{Expr, Function, FunctionBuilder, VarKind};

    fn branch_fn(same_target: bool) -> (Function, BlockId, BlockId) {
        let mut b = FunctionBuilder::new("f");
        let p = b.param("p", VarKind::NtArrayPtr);
        let entry = b.block(3);
        let then_b = b.block(2);
        let else_b = b.block(1);
        let exit = b.block(0);
        b.entry(entry).exit(exit);
        let else_target = if same_target { then_b } else { else_b };
        b.terminate(
            entry,
            Terminator::branch(Expr::deref(Expr::var(p)), then_b, else_target),
        );
        b.terminate(else_b, Terminator::Goto(then_b));
        (b.build().unwrap(), then_b, else_b)
    }

    #[test]
    fn test_branch_polarity() {
        let (func, then_b, else_b) = branch_fn(false);
        let eval = ConstEvaluator::default();
        let entry = func.cfg.block(func.cfg.entry()).unwrap();
        assert!(edge_is_non_null(&func.cfg, entry, then_b, Polarity::NonNullOnTrue, eval));
        assert!(!edge_is_non_null(&func.cfg, entry, else_b, Polarity::NonNullOnTrue, eval));
        assert!(edge_is_non_null(&func.cfg, entry, else_b, Polarity::NonNullOnFalse, eval));
    }

    #[test]
    fn test_branch_to_same_block() {
        let (func, then_b, _) = branch_fn(true);
        let entry = func.cfg.block(func.cfg.entry()).unwrap();
        let eval = ConstEvaluator::default();
        assert!(!edge_is_non_null(&func.cfg, entry, then_b, Polarity::NonNullOnTrue, eval));
    }

    #[test]
    fn test_switch_labels() {
        let mut b = FunctionBuilder::new("s");
        let p = b.param("p", VarKind::NtArrayPtr);
        let n = b.param("n", VarKind::Other);
        let entry = b.block(6);
        let case_a = b.block(5);
        let case_null = b.block(4);
        let case_var = b.block(3);
        let default = b.block(2);
        let exit = b.block(0);
        b.entry(entry).exit(exit);
        b.label(case_a, CaseLabel::case(Expr::int(97)));
        b.label(case_null, CaseLabel::case(Expr::int(0)));
        b.label(case_var, CaseLabel::case(Expr::var(n)));
        b.label(default, CaseLabel::Default);
        b.terminate(
            entry,
            Terminator::switch(
                Expr::deref(Expr::var(p)),
                vec![case_a, case_null, case_var],
                default,
            ),
        );
        let func = b.build().unwrap();
        let eval = ConstEvaluator::default();
        let sw = func.cfg.block(entry).unwrap();
        let on_true = Polarity::NonNullOnTrue;
        assert!(edge_is_non_null(&func.cfg, sw, case_a, on_true, eval));
        assert!(!edge_is_non_null(&func.cfg, sw, case_null, on_true, eval));
        assert!(!edge_is_non_null(&func.cfg, sw, case_var, on_true, eval));
        // `case 0:` catches the null terminator, so `default:` never sees it.
        assert!(edge_is_non_null(&func.cfg, sw, default, on_true, eval));
    }

    #[test]
    fn test_case_ranges() {
        let eval = ConstEvaluator::default();
        let range = |lo, hi| CaseLabel::range(Expr::int(lo), Expr::int(hi));
        assert!(label_excludes_null(&range(1, 9), eval));
        assert!(!label_excludes_null(&range(-1, 9), eval));
        assert!(label_tests_null(&range(-1, 9), eval));
        assert!(!label_tests_null(&range(1, 9), eval));
    }
}
