//! Fixpoint iteration of bounds facts over the CFG.

use std::collections::BTreeMap;

use ntb_ir::{BasicBlock, BlockId, ConstEvaluator, Expr, Function, VarId};
use tracing::{debug, debug_span, trace, trace_span, warn};

use crate::config::WideningConfig;
use crate::error::WideningError;
use crate::facts::{Bound, BoundsLattice, BoundsMap, apply, union_into};
use crate::gen_kill::{BoundsIndex, DerefTest, GenKill, StmtEffect};
use crate::prune::edge_is_non_null;
use crate::result::{BlockFacts, StmtFacts, WidenedBounds};
use crate::worklist::QueueSet;

/// Per-block analysis state, rebuilt for every run.
#[derive(Debug)]
struct BlockState<'f> {
    block: &'f BasicBlock,
    /// `prefix[k]` is the composed static effect of elements `0..=k`.
    prefix: Vec<StmtEffect>,
    test: Option<DerefTest<'f>>,
    in_facts: BoundsMap,
    /// Out including the terminator's widening.
    out: BoundsMap,
    out_unwidened: BoundsMap,
    term_gen: BoundsMap,
}

impl BlockState<'_> {
    fn before(&self, k: usize) -> BoundsMap {
        match k.checked_sub(1).and_then(|prev| self.prefix.get(prev)) {
            Some(effect) => apply(&self.in_facts, &effect.kill, &effect.generated),
            None => self.in_facts.clone(),
        }
    }

    fn after(&self, k: usize) -> BoundsMap {
        let mut facts = match self.prefix.get(k) {
            Some(effect) => apply(&self.in_facts, &effect.kill, &effect.generated),
            None => self.in_facts.clone(),
        };
        if k == self.block.stmts.len() {
            union_into(&mut facts, &self.term_gen);
        }
        facts
    }

    fn block_effect(&self) -> StmtEffect {
        let term = StmtEffect {
            generated: self.term_gen.clone(),
            kill: self.term_gen.keys().copied().collect(),
        };
        match self.prefix.last() {
            Some(effect) => effect.then(&term),
            None => term,
        }
    }

    fn facts(&self) -> BlockFacts {
        let effect = self.block_effect();
        BlockFacts {
            in_facts: self.in_facts.clone(),
            out: self.out.clone(),
            generated: effect.generated,
            kill: effect.kill,
            stmts: (0..self.prefix.len())
                .map(|k| StmtFacts {
                    before: self.before(k),
                    after: self.after(k),
                })
                .collect(),
        }
    }
}

/// Forward dataflow analysis widening the upper bounds of NT-pointers.
#[derive(Debug)]
pub struct BoundsWidening<'f> {
    func: &'f Function,
    eval: ConstEvaluator,
    max_iterations_multiplier: usize,
    gen_kill: GenKill<'f>,
    lattice: BoundsLattice<'f>,
    entry_in: BoundsMap,
    states: BTreeMap<BlockId, BlockState<'f>>,
}

impl<'f> BoundsWidening<'f> {
    /// Prepare the analysis: index bounds, compute static Gen/Kill sets and
    /// initialize In/Out of every reachable block.
    pub fn new(func: &'f Function, config: &WideningConfig) -> Result<Self, WideningError> {
        let _span = trace_span!("prepare").entered();
        let eval = config.evaluator()?;
        let index = BoundsIndex::build(func)?;
        let gen_kill = GenKill::new(&func.decls, index, eval, config.dump_canonical_trees);
        let lattice = BoundsLattice::new(&func.decls, eval);

        let cfg = &func.cfg;
        let reachable = cfg.reachable();
        let top = BoundsLattice::top(func.decls.null_terminated().map(|d| d.id));
        let entry_in = entry_facts(func);
        let mut states = BTreeMap::new();
        for block in cfg.blocks() {
            if block.id == cfg.exit() || !reachable.contains(&block.id) {
                continue;
            }
            let cond = block.terminator.condition();
            let mut prefix: Vec<StmtEffect> = Vec::with_capacity(block.element_count());
            let effects = block
                .stmts
                .iter()
                .map(|stmt| gen_kill.stmt(stmt))
                .chain(cond.map(|cond| gen_kill.condition(cond)));
            for effect in effects {
                let composed = match prefix.last() {
                    Some(prev) => prev.then(&effect),
                    None => effect,
                };
                prefix.push(composed);
            }
            let in_facts = if block.id == cfg.entry() {
                entry_in.clone()
            } else {
                top.clone()
            };
            states.insert(
                block.id,
                BlockState {
                    block,
                    prefix,
                    test: cond.and_then(|cond| gen_kill.deref_test(cond)),
                    in_facts,
                    out: top.clone(),
                    out_unwidened: top.clone(),
                    term_gen: BoundsMap::new(),
                },
            );
        }

        Ok(Self {
            func,
            eval,
            max_iterations_multiplier: config.max_iterations_multiplier,
            gen_kill,
            lattice,
            entry_in,
            states,
        })
    }

    /// Iterate to a fixpoint and collect the per-statement facts.
    pub fn run(mut self) -> WidenedBounds {
        let _span = debug_span!("widen_bounds", function = %self.func.name).entered();

        let mut queue = QueueSet::new();
        for id in self.states.keys().rev() {
            queue.push(*id);
        }
        let max_iterations = self.states.len().max(1) * self.max_iterations_multiplier;

        let mut iterations = 0;
        {
            let _span = trace_span!("worklist").entered();
            while let Some(id) = queue.pop() {
                if iterations >= max_iterations {
                    warn!(
                        function = %self.func.name,
                        iterations,
                        "bounds widening did not converge, dropping all facts"
                    );
                    return WidenedBounds::empty(
                        self.func.name.clone(),
                        declared_uppers(self.func),
                        self.eval,
                        iterations,
                    );
                }
                iterations += 1;

                self.compute_in(id);
                if self.compute_out(id) {
                    for succ in self.func.cfg.successors(id) {
                        if self.states.contains_key(&succ) {
                            queue.push(succ);
                        }
                    }
                }
            }
        }
        trace!(iterations, "worklist complete");

        let result = self.finish(iterations);
        debug!(
            blocks = result.blocks.len(),
            iterations,
            widened = self.states.values().filter(|s| !s.term_gen.is_empty()).count(),
            "bounds widening complete"
        );
        result
    }

    /// In = meet of the pruned Out sets of analyzed predecessors. The entry
    /// block also meets the parameter facts.
    fn compute_in(&mut self, id: BlockId) {
        let mut in_facts = (id == self.func.cfg.entry()).then(|| self.entry_in.clone());
        for pred in self.func.cfg.predecessors(id) {
            let Some(facts) = self.pruned_out(*pred, id) else {
                continue;
            };
            in_facts = Some(match in_facts {
                None => facts.clone(),
                Some(acc) => self.lattice.meet(&acc, facts),
            });
        }
        if let (Some(in_facts), Some(state)) = (in_facts, self.states.get_mut(&id)) {
            state.in_facts = in_facts;
        }
    }

    /// Out set of `pred` as seen along its edges into `curr`.
    fn pruned_out(&self, pred: BlockId, curr: BlockId) -> Option<&BoundsMap> {
        let state = self.states.get(&pred)?;
        let widened = state.test.as_ref().is_some_and(|test| {
            edge_is_non_null(&self.func.cfg, state.block, curr, test.polarity, self.eval)
        });
        Some(if widened {
            &state.out
        } else {
            &state.out_unwidened
        })
    }

    /// Recompute Out of `id`. Returns whether either Out set changed.
    fn compute_out(&mut self, id: BlockId) -> bool {
        let Some(state) = self.states.get(&id) else {
            return false;
        };
        let out_unwidened = state.prefix.last().map_or_else(
            || state.in_facts.clone(),
            |effect| apply(&state.in_facts, &effect.kill, &effect.generated),
        );
        let term_gen = match (&state.test, state.block.terminator.condition()) {
            (Some(test), Some(cond)) => {
                let before = state.before(state.block.stmts.len());
                self.gen_kill.terminator_gen(test, cond, &before)
            }
            _ => BoundsMap::new(),
        };
        let mut out = out_unwidened.clone();
        union_into(&mut out, &term_gen);

        let changed = out != state.out || out_unwidened != state.out_unwidened;
        trace!(block = %id, changed, widened = !term_gen.is_empty(), "computed out");
        if let Some(state) = self.states.get_mut(&id) {
            state.out = out;
            state.out_unwidened = out_unwidened;
            state.term_gen = term_gen;
        }
        changed
    }

    fn finish(&self, iterations: usize) -> WidenedBounds {
        WidenedBounds {
            function: self.func.name.clone(),
            blocks: self
                .states
                .iter()
                .map(|(id, state)| (*id, state.facts()))
                .collect(),
            declared: declared_uppers(self.func),
            eval: self.eval,
            converged: true,
            iterations,
        }
    }
}

/// Declared upper bounds of NT parameters hold on entry.
fn entry_facts(func: &Function) -> BoundsMap {
    func.decls
        .null_terminated()
        .filter(|decl| decl.is_param)
        .filter_map(|decl| Some((decl.id, Bound::Upper(decl.declared_upper()?))))
        .collect()
}

fn declared_uppers(func: &Function) -> BTreeMap<VarId, Expr> {
    func.decls
        .null_terminated()
        .filter_map(|decl| Some((decl.id, decl.declared_upper()?)))
        .collect()
}

/// Run bounds widening over one function.
pub fn widen_bounds(
    func: &Function,
    config: &WideningConfig,
) -> Result<WidenedBounds, WideningError> {
    Ok(BoundsWidening::new(func, config)?.run())
}
