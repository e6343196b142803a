//! Configuration for operator construction

use crate::{Error, ExecutionStrategy, Result};
use serde::{Deserialize, Serialize};

/// Diagonal shift applied by `add_jitter` when nothing else is configured
pub const DEFAULT_JITTER: f64 = 1e-3;

/// Settings shared by leaf and composite operators
///
/// Leaves read `jitter`; composites read `strategy` and `validate_shapes`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OperatorConfig {
    /// Diagonal shift added by `add_jitter`
    pub jitter: f64,
    /// How composites evaluate their children
    pub strategy: ExecutionStrategy,
    /// Check that all children of a composite share one size at construction
    pub validate_shapes: bool,
}

impl Default for OperatorConfig {
    fn default() -> Self {
        Self {
            jitter: DEFAULT_JITTER,
            strategy: ExecutionStrategy::Sequential,
            validate_shapes: true,
        }
    }
}

impl OperatorConfig {
    pub fn with_jitter(mut self, jitter: f64) -> Self {
        self.jitter = jitter;
        self
    }

    pub fn with_strategy(mut self, strategy: ExecutionStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_validate_shapes(mut self, validate: bool) -> Self {
        self.validate_shapes = validate;
        self
    }

    /// Jitter must be finite and non-negative
    pub fn validate(&self) -> Result<()> {
        if !self.jitter.is_finite() || self.jitter < 0.0 {
            return Err(Error::InvalidInput(format!(
                "jitter must be finite and non-negative, got {}",
                self.jitter
            )));
        }
        Ok(())
    }
}
