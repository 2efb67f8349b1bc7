use ntb_ir::{
    BlockId, BoundsExpr, CaseLabel, Expr, Function, FunctionBuilder, Stmt, Terminator, VarId,
    VarKind, WhereClause,
};
use tracing_subscriber::EnvFilter;

use super::*;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn widen(func: &Function) -> WidenedBounds {
    init_tracing();
    widen_bounds(func, &WideningConfig::default()).unwrap()
}

fn at(block: BlockId, index: usize) -> StmtRef {
    StmtRef::new(block, index)
}

/// Every analyzed block satisfies `Out = (In - Kill) ∪ Gen`.
fn assert_transfer_holds(result: &WidenedBounds) {
    for (id, facts) in result.blocks() {
        assert_eq!(
            facts.out,
            apply(&facts.in_facts, &facts.kill, &facts.generated),
            "transfer function at {id}"
        );
    }
}

struct F1 {
    func: Function,
    p: VarId,
    i: VarId,
    entry: BlockId,
    then_b: BlockId,
    join: BlockId,
}

/// ```c
/// void f1(int i) {
///   int a;
///   _Nt_array_ptr<char> p : bounds(p, p + i) = "a";
///   if (*(i + p)) { a = 1; }
/// }
/// ```
fn f1() -> F1 {
    let mut b = FunctionBuilder::new("f1");
    let i = b.param("i", VarKind::Other);
    let a = b.local("a", VarKind::Other);
    let p = b.local("p", VarKind::NtArrayPtr);
    b.bounds(
        p,
        BoundsExpr::range(Expr::var(p), Expr::add(Expr::var(p), Expr::var(i))),
    );
    let entry = b.block(3);
    let then_b = b.block(2);
    let join = b.block(1);
    let exit = b.block(0);
    b.entry(entry).exit(exit);
    b.push(entry, Stmt::decl(a));
    b.push(entry, Stmt::decl_init(p, Expr::str("a")));
    b.terminate(
        entry,
        Terminator::branch(
            Expr::deref(Expr::paren(Expr::add(Expr::var(i), Expr::var(p)))),
            then_b,
            join,
        ),
    );
    b.push(then_b, Stmt::expr(Expr::assign(Expr::var(a), Expr::int(1))));
    b.terminate(then_b, Terminator::Goto(join));
    F1 {
        func: b.build().unwrap(),
        p,
        i,
        entry,
        then_b,
        join,
    }
}

#[test]
fn test_f1_widens_after_null_test() {
    let f = f1();
    let result = widen(&f.func);
    assert!(result.converged());

    // Declaration establishes the declared bound.
    assert_eq!(result.widened_offset(f.p, at(f.entry, 1)), Some(0));
    // The null test proves one more element.
    assert_eq!(result.widened_offset(f.p, at(f.entry, 2)), Some(1));
    assert_eq!(result.widened_offset(f.p, at(f.then_b, 0)), Some(1));
    // Both paths join at the declared bound.
    assert_eq!(result.widened_offset(f.p, at(f.join, 0)), None);
    let join_in = &result.block(f.join).unwrap().in_facts;
    assert_eq!(
        join_in.get(&f.p),
        Some(&Bound::Upper(Expr::add(Expr::var(f.p), Expr::var(f.i))))
    );
    assert_transfer_holds(&result);
}

#[test]
fn test_f1_dump() {
    let f = f1();
    let result = widen(&f.func);
    let dump = result.dump(&f.func);
    assert_eq!(format!("{}", result.display(&f.func)), dump);
    assert!(dump.starts_with("In function: f1\n[B3]\n"), "{dump}");
    assert!(
        dump.contains("  3: *(i + p)\n    upper_bound(p) = 1\n[B2]\n  1: a = 1\n    upper_bound(p) = 1\n[B1]\n"),
        "{dump}"
    );
    assert!(!dump.contains("[B0]"));
}

#[test]
fn test_sequential_dereferences() {
    // if (*p) if (*(p + 1)) a = 0;
    let mut b = FunctionBuilder::new("seq");
    let p = b.param("p", VarKind::NtArrayPtr);
    let a = b.local("a", VarKind::Other);
    b.bounds(p, BoundsExpr::count(Expr::int(0)));
    let first = b.block(4);
    let second = b.block(3);
    let body = b.block(2);
    let join = b.block(1);
    let exit = b.block(0);
    b.entry(first).exit(exit);
    b.terminate(
        first,
        Terminator::branch(Expr::deref(Expr::var(p)), second, join),
    );
    b.terminate(
        second,
        Terminator::branch(
            Expr::deref(Expr::add(Expr::var(p), Expr::int(1))),
            body,
            join,
        ),
    );
    b.push(body, Stmt::expr(Expr::assign(Expr::var(a), Expr::int(0))));
    b.terminate(body, Terminator::Goto(join));
    let func = b.build().unwrap();

    let result = widen(&func);
    assert_eq!(result.widened_offset(p, at(first, 0)), Some(1));
    assert_eq!(result.widened_offset(p, at(second, 0)), Some(2));
    assert_eq!(result.widened_offset(p, at(body, 0)), Some(2));
    // Entry is a parameter bound: `p + 0`.
    assert_eq!(
        result.block(join).unwrap().in_facts.get(&p),
        Some(&Bound::Upper(Expr::add(Expr::var(p), Expr::int(0))))
    );
    assert_transfer_holds(&result);
}

#[test]
fn test_dereference_below_bound_does_not_widen() {
    // p : count(2); if (*p) ...
    let mut b = FunctionBuilder::new("below");
    let p = b.param("p", VarKind::NtArrayPtr);
    b.bounds(p, BoundsExpr::count(Expr::int(2)));
    let entry = b.block(2);
    let then_b = b.block(1);
    let exit = b.block(0);
    b.entry(entry).exit(exit);
    b.terminate(
        entry,
        Terminator::branch(Expr::deref(Expr::var(p)), then_b, exit),
    );
    let func = b.build().unwrap();

    let result = widen(&func);
    assert_eq!(result.widened_offset(p, at(entry, 0)), Some(0));
    assert!(result.widenings(at(entry, 0)).is_empty());
}

#[test]
fn test_negated_test_widens_false_edge() {
    // if (!*p) return; else a = 0;
    let mut b = FunctionBuilder::new("neg");
    let p = b.param("p", VarKind::NtArrayPtr);
    let a = b.local("a", VarKind::Other);
    b.bounds(p, BoundsExpr::count(Expr::int(0)));
    let entry = b.block(3);
    let null_b = b.block(2);
    let non_null = b.block(1);
    let exit = b.block(0);
    b.entry(entry).exit(exit);
    b.terminate(
        entry,
        Terminator::branch(Expr::not(Expr::deref(Expr::var(p))), null_b, non_null),
    );
    b.push(null_b, Stmt::expr(Expr::assign(Expr::var(a), Expr::int(1))));
    b.push(non_null, Stmt::expr(Expr::assign(Expr::var(a), Expr::int(0))));
    let func = b.build().unwrap();

    let result = widen(&func);
    assert_eq!(result.widened_offset(p, at(null_b, 0)), Some(0));
    assert_eq!(result.widened_offset(p, at(non_null, 0)), Some(1));
}

/// `if (<cond>) a = 1; else a = 0;` with `cond` built from `c` and `*p`.
/// Returns the widened offsets of `p` in the then and else blocks.
fn short_circuit_offsets(cond: impl Fn(Expr, Expr) -> Expr) -> (Option<i64>, Option<i64>) {
    let mut b = FunctionBuilder::new("short_circuit");
    let c = b.param("c", VarKind::Other);
    let p = b.param("p", VarKind::NtArrayPtr);
    let a = b.local("a", VarKind::Other);
    b.bounds(p, BoundsExpr::count(Expr::int(0)));
    let entry = b.block(3);
    let then_b = b.block(2);
    let else_b = b.block(1);
    let exit = b.block(0);
    b.entry(entry).exit(exit);
    b.terminate(
        entry,
        Terminator::branch(cond(Expr::var(c), Expr::deref(Expr::var(p))), then_b, else_b),
    );
    b.push(then_b, Stmt::expr(Expr::assign(Expr::var(a), Expr::int(1))));
    b.push(else_b, Stmt::expr(Expr::assign(Expr::var(a), Expr::int(0))));
    let func = b.build().unwrap();

    let result = widen(&func);
    assert_transfer_holds(&result);
    (
        result.widened_offset(p, at(then_b, 0)),
        result.widened_offset(p, at(else_b, 0)),
    )
}

#[test]
fn test_logical_and_widens_true_edge() {
    // if (c && *p)
    assert_eq!(short_circuit_offsets(Expr::land), (Some(1), Some(0)));
    // if (c && !*p): the false edge is also taken when `c` is zero.
    assert_eq!(
        short_circuit_offsets(|c, d| Expr::land(c, Expr::not(d))),
        (Some(0), Some(0))
    );
}

#[test]
fn test_logical_or_does_not_widen_true_edge() {
    // if (c || *p): the true edge is also taken when only `c` holds.
    assert_eq!(short_circuit_offsets(Expr::lor), (Some(0), Some(0)));
    // if (c || !*p): the false edge needs `*p` to be non-null.
    assert_eq!(
        short_circuit_offsets(|c, d| Expr::lor(c, Expr::not(d))),
        (Some(0), Some(1))
    );
}

#[test]
fn test_loop_converges() {
    // while (*p) a++;
    let mut b = FunctionBuilder::new("loop");
    let p = b.param("p", VarKind::NtArrayPtr);
    let a = b.local("a", VarKind::Other);
    b.bounds(p, BoundsExpr::count(Expr::int(0)));
    let entry = b.block(4);
    let header = b.block(3);
    let body = b.block(2);
    let after = b.block(1);
    let exit = b.block(0);
    b.entry(entry).exit(exit);
    b.terminate(entry, Terminator::Goto(header));
    b.terminate(
        header,
        Terminator::branch(Expr::deref(Expr::var(p)), body, after),
    );
    b.push(body, Stmt::expr(Expr::post_inc(Expr::var(a))));
    b.terminate(body, Terminator::Goto(header));
    b.push(after, Stmt::expr(Expr::assign(Expr::var(a), Expr::int(0))));
    let func = b.build().unwrap();

    let result = widen(&func);
    assert!(result.converged());
    assert_eq!(result.widened_offset(p, at(header, 0)), Some(1));
    assert_eq!(result.widened_offset(p, at(body, 0)), Some(1));
    // The back edge meets the entry path at the declared bound.
    assert_eq!(
        result.block(header).unwrap().in_facts.get(&p),
        Some(&Bound::Upper(Expr::add(Expr::var(p), Expr::int(0))))
    );
    assert_eq!(result.widened_offset(p, at(after, 0)), Some(0));
    assert_transfer_holds(&result);
}

#[test]
fn test_assignment_kills_widened_bound() {
    // p : bounds(p, p + i); if (*(p + i)) { i = 0; }
    let mut b = FunctionBuilder::new("kill");
    let i = b.param("i", VarKind::Other);
    let p = b.param("p", VarKind::NtArrayPtr);
    b.bounds(
        p,
        BoundsExpr::range(Expr::var(p), Expr::add(Expr::var(p), Expr::var(i))),
    );
    let entry = b.block(2);
    let body = b.block(1);
    let exit = b.block(0);
    b.entry(entry).exit(exit);
    b.terminate(
        entry,
        Terminator::branch(
            Expr::deref(Expr::add(Expr::var(p), Expr::var(i))),
            body,
            exit,
        ),
    );
    b.push(body, Stmt::expr(Expr::assign(Expr::var(i), Expr::int(0))));
    let func = b.build().unwrap();

    let result = widen(&func);
    let before = result.before(at(body, 0)).unwrap();
    assert!(matches!(before.get(&p), Some(Bound::Upper(_))));
    assert_ne!(
        before.get(&p),
        Some(&Bound::Upper(Expr::add(Expr::var(p), Expr::var(i))))
    );
    assert_eq!(result.widened_offset(p, at(body, 0)), Some(0));
    assert!(result.block(body).unwrap().kill.contains(&p));
    assert_transfer_holds(&result);
}

#[test]
fn test_condition_modifying_pointer_does_not_widen() {
    // if (*p++) ...
    let mut b = FunctionBuilder::new("inc");
    let p = b.param("p", VarKind::NtArrayPtr);
    let x = b.local("x", VarKind::Other);
    b.bounds(p, BoundsExpr::count(Expr::int(0)));
    let entry = b.block(2);
    let body = b.block(1);
    let exit = b.block(0);
    b.entry(entry).exit(exit);
    b.terminate(
        entry,
        Terminator::branch(Expr::deref(Expr::post_inc(Expr::var(p))), body, exit),
    );
    b.push(body, Stmt::expr(Expr::assign(Expr::var(x), Expr::int(0))));
    let func = b.build().unwrap();

    let result = widen(&func);
    assert!(result.widenings(at(entry, 0)).is_empty());
    assert_eq!(result.widened_offset(p, at(body, 0)), Some(0));
}

#[test]
fn test_switch_on_dereference() {
    // switch (*p) { case 'a': x = 1; break; default: x = 2; }
    let mut b = FunctionBuilder::new("sw");
    let p = b.param("p", VarKind::NtArrayPtr);
    let x = b.local("x", VarKind::Other);
    b.bounds(p, BoundsExpr::count(Expr::int(0)));
    let entry = b.block(4);
    let case_a = b.block(3);
    let default = b.block(2);
    let exit = b.block(0);
    b.entry(entry).exit(exit);
    b.label(case_a, CaseLabel::case(Expr::int(97)));
    b.label(default, CaseLabel::Default);
    b.terminate(
        entry,
        Terminator::switch(Expr::deref(Expr::var(p)), vec![case_a], default),
    );
    b.push(case_a, Stmt::expr(Expr::assign(Expr::var(x), Expr::int(1))));
    b.push(default, Stmt::expr(Expr::assign(Expr::var(x), Expr::int(2))));
    let func = b.build().unwrap();

    let result = widen(&func);
    assert_eq!(result.widened_offset(p, at(case_a, 0)), Some(1));
    // Without `case 0:` the default edge may see the terminator.
    assert_eq!(result.widened_offset(p, at(default, 0)), Some(0));
    assert_transfer_holds(&result);
}

#[test]
fn test_where_clause_fact() {
    // x = 0 where p : bounds(p, p + n);
    let mut b = FunctionBuilder::new("wh");
    let n = b.param("n", VarKind::Other);
    let p = b.param("p", VarKind::NtArrayPtr);
    let x = b.local("x", VarKind::Other);
    b.bounds(p, BoundsExpr::count(Expr::int(0)));
    let entry = b.block(1);
    let exit = b.block(0);
    b.entry(entry).exit(exit);
    b.push(
        entry,
        Stmt::expr(Expr::assign(Expr::var(x), Expr::int(0))).with_where(WhereClause::bounds(
            p,
            BoundsExpr::range(Expr::var(p), Expr::add(Expr::var(p), Expr::var(n))),
        )),
    );
    b.push(entry, Stmt::expr(Expr::assign(Expr::var(n), Expr::int(0))));
    let func = b.build().unwrap();

    let result = widen(&func);
    assert_eq!(
        result.widenings(at(entry, 0)),
        vec![(
            p,
            Widening::Unrelated(Expr::add(Expr::var(p), Expr::var(n)))
        )]
    );
    // Writing `n` invalidates the clause bound.
    assert!(result.widenings(at(entry, 1)).is_empty());

    let dump = result.dump(&func);
    assert!(dump.contains("    upper_bound(p) = p + n\n"), "{dump}");
}

#[test]
fn test_unreachable_block_is_not_analyzed() {
    let mut b = FunctionBuilder::new("dead");
    let p = b.param("p", VarKind::NtArrayPtr);
    b.bounds(p, BoundsExpr::count(Expr::int(0)));
    let entry = b.block(2);
    let dead = b.block(1);
    let exit = b.block(0);
    b.entry(entry).exit(exit);
    b.terminate(dead, Terminator::Goto(exit));
    let func = b.build().unwrap();

    let result = widen(&func);
    assert!(result.block(entry).is_some());
    assert!(result.block(dead).is_none());
}

#[test]
fn test_iteration_limit_drops_all_facts() {
    let f = f1();
    let config = WideningConfig::default().with_max_iterations_multiplier(0);
    let result = widen_bounds(&f.func, &config).unwrap();
    assert!(!result.converged());
    assert_eq!(result.blocks().count(), 0);
    assert_eq!(result.widened_offset(f.p, at(f.entry, 2)), None);
}

#[test]
fn test_invalid_config_is_error() {
    let f = f1();
    let config = WideningConfig::default().with_int_width(128);
    assert!(matches!(
        widen_bounds(&f.func, &config),
        Err(WideningError::Config(_))
    ));
}
