//! Textual dump of widened bounds, one block at a time.

use std::fmt;

use ntb_ir::{Function, Names};

use crate::result::{StmtRef, WidenedBounds, Widening};

/// Display adapter returned by [`WidenedBounds::display`].
pub struct DumpDisplay<'a> {
    bounds: &'a WidenedBounds,
    func: &'a Function,
}

impl WidenedBounds {
    /// Render the facts of `func` as:
    ///
    /// ```text
    /// In function: f1
    /// [B2]
    ///   1: _Nt_array_ptr<char> p : bounds(p, p + i) = "a"
    ///   2: *(i + p)
    ///     upper_bound(p) = 1
    /// ```
    ///
    /// Blocks appear in descending block number. Only facts that differ from
    /// the declared upper bound are listed.
    pub const fn display<'a>(&'a self, func: &'a Function) -> DumpDisplay<'a> {
        DumpDisplay { bounds: self, func }
    }

    /// [`Self::display`] collected into a string.
    pub fn dump(&self, func: &Function) -> String {
        self.display(func).to_string()
    }
}

impl fmt::Display for DumpDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let func = self.func;
        let decls = &func.decls;
        writeln!(f, "In function: {}", func.name)?;
        for id in func.cfg.ordered_blocks() {
            if id == func.cfg.exit() {
                continue;
            }
            let Some(block) = func.cfg.block(id) else {
                continue;
            };
            writeln!(f, "[{id}]")?;
            let cond = block.terminator.condition();
            let stmts = block.stmts.iter().map(|stmt| stmt.display(decls).to_string());
            let lines = stmts.chain(cond.map(|cond| cond.display(decls).to_string()));
            for (index, line) in lines.enumerate() {
                writeln!(f, "  {}: {line}", index + 1)?;
                for (var, widening) in self.bounds.widenings(StmtRef::new(id, index)) {
                    let name = decls.var_name(var);
                    match widening {
                        Widening::Offset(offset) => {
                            writeln!(f, "    upper_bound({name}) = {offset}")?;
                        }
                        Widening::Unrelated(expr) => {
                            writeln!(f, "    upper_bound({name}) = {}", expr.display(decls))?;
                        }
                    }
                }
            }
        }
        Ok(())
    }
}
