//! Execution strategy for fanning work out across child operators
//!
//! Composite operators evaluate their children's closures independently.
//! The strategy decides whether that happens in the current thread or on the
//! Rayon pool. Either way results come back in child order, so the final
//! combination step (sum or concatenation) is deterministic.

use crate::Result;
use serde::{Deserialize, Serialize};

/// Execution strategy for per-child work
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStrategy {
    /// Evaluate children one after another
    #[default]
    Sequential,
    /// Evaluate children on the Rayon pool (sequential without the `parallel` feature)
    Parallel,
}

impl ExecutionStrategy {
    /// Whether work actually runs in parallel in this build
    pub fn is_parallel(&self) -> bool {
        cfg!(feature = "parallel") && matches!(self, ExecutionStrategy::Parallel)
    }

    /// Get the number of threads available
    pub fn num_threads(&self) -> usize {
        #[cfg(feature = "parallel")]
        if self.is_parallel() {
            return rayon::current_num_threads();
        }
        1
    }

    /// Map `f` over `items`, returning results in input order
    pub fn map_ordered<T, R, F>(&self, items: &[T], f: F) -> Vec<R>
    where
        T: Sync,
        R: Send,
        F: Fn(&T) -> R + Sync + Send,
    {
        #[cfg(feature = "parallel")]
        if self.is_parallel() {
            use rayon::prelude::*;
            return items.par_iter().map(f).collect();
        }
        items.iter().map(f).collect()
    }

    /// Fallible [`map_ordered`](Self::map_ordered); the first error in child order wins
    pub fn try_map_ordered<T, R, F>(&self, items: &[T], f: F) -> Result<Vec<R>>
    where
        T: Sync,
        R: Send,
        F: Fn(&T) -> Result<R> + Sync + Send,
    {
        self.map_ordered(items, f).into_iter().collect()
    }
}
