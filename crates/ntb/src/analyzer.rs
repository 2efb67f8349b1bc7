//! Entry points for one function or a whole translation unit.

use std::time::Instant;

use ntb_ir::Function;
use ntb_widen::{WidenedBounds, WideningConfig, widen_bounds};
use rayon::prelude::*;
use tracing::{debug, debug_span};

use crate::error::Result;

/// Runs bounds widening with a fixed configuration.
#[derive(Clone, Debug, Default)]
pub struct Analyzer {
    config: WideningConfig,
}

impl Analyzer {
    pub const fn new(config: WideningConfig) -> Self {
        Self { config }
    }

    /// Create an analyzer with default configuration.
    pub fn with_defaults() -> Self {
        Self::default()
    }

    pub const fn config(&self) -> &WideningConfig {
        &self.config
    }

    /// Analyze one function.
    pub fn analyze(&self, func: &Function) -> Result<WidenedBounds> {
        Ok(widen_bounds(func, &self.config)?)
    }

    /// Analyze every function in parallel. Results keep input order.
    ///
    /// Each function owns its analysis state, so nothing is shared between
    /// workers.
    pub fn analyze_all(&self, funcs: &[Function]) -> Result<Vec<WidenedBounds>> {
        let _span = debug_span!("analyze_all", functions = funcs.len()).entered();
        let start = Instant::now();
        let results = funcs
            .par_iter()
            .map(|func| self.analyze(func))
            .collect::<Result<Vec<_>>>()?;
        let unconverged = results.iter().filter(|r| !r.converged()).count();
        debug!(
            functions = funcs.len(),
            unconverged,
            elapsed_ms = start.elapsed().as_millis(),
            "translation unit analyzed"
        );
        Ok(results)
    }

    /// Analyze `funcs` and concatenate their dumps in input order.
    pub fn dump_all(&self, funcs: &[Function]) -> Result<String> {
        let results = self.analyze_all(funcs)?;
        Ok(funcs
            .iter()
            .zip(&results)
            .map(|(func, result)| result.dump(func))
            .collect())
    }
}
