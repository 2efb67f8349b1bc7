//! Widening configuration.

use ntb_ir::{ConstEvaluator, DEFAULT_INT_WIDTH};

use crate::error::WideningError;

/// Default bound on fixpoint iterations, per block.
pub const DEFAULT_MAX_ITERATIONS_MULTIPLIER: usize = 20;

/// Bounds widening configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WideningConfig {
    /// Width of `int` in bits, used for constant arithmetic.
    pub int_width: u32,
    /// The fixpoint gives up after `blocks * max_iterations_multiplier` steps.
    pub max_iterations_multiplier: usize,
    /// Log every canonical tree built for a dereference test at trace level.
    pub dump_canonical_trees: bool,
}

impl Default for WideningConfig {
    fn default() -> Self {
        Self {
            int_width: DEFAULT_INT_WIDTH,
            max_iterations_multiplier: DEFAULT_MAX_ITERATIONS_MULTIPLIER,
            dump_canonical_trees: false,
        }
    }
}

impl WideningConfig {
    /// Set the `int` width.
    #[must_use]
    pub const fn with_int_width(mut self, bits: u32) -> Self {
        self.int_width = bits;
        self
    }

    /// Set the iteration multiplier.
    #[must_use]
    pub const fn with_max_iterations_multiplier(mut self, multiplier: usize) -> Self {
        self.max_iterations_multiplier = multiplier;
        self
    }

    /// Enable canonical tree dumps.
    #[must_use]
    pub const fn with_dump_canonical_trees(mut self, enabled: bool) -> Self {
        self.dump_canonical_trees = enabled;
        self
    }

    /// Constant evaluator for the configured width.
    pub fn evaluator(&self) -> Result<ConstEvaluator, WideningError> {
        Ok(ConstEvaluator::new(self.int_width)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = WideningConfig::default();
        assert_eq!(config.int_width, 32);
        assert_eq!(config.max_iterations_multiplier, 20);
        assert!(!config.dump_canonical_trees);
        assert_eq!(config.evaluator().unwrap().width(), 32);
    }

    #[test]
    fn test_invalid_width() {
        let config = WideningConfig::default().with_int_width(3);
        assert!(matches!(
            config.evaluator(),
            Err(WideningError::Config(_))
        ));
    }
}
