//! Predictive covariance cache values

use crate::tensor::Tensor;

/// Precomputed training-dependent state for GP predictive covariances
///
/// Leaves produce `Root`; composites produce one entry per child, in child
/// order. The entries are opaque to everyone except the operator that built
/// them.
#[derive(Debug, Clone, PartialEq)]
pub enum PredictiveCache {
    Root(Tensor),
    Children(Vec<PredictiveCache>),
}

impl PredictiveCache {
    /// Number of per-child entries (1 for a leaf cache)
    pub fn len(&self) -> usize {
        match self {
            PredictiveCache::Root(_) => 1,
            PredictiveCache::Children(entries) => entries.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, PredictiveCache::Children(entries) if entries.is_empty())
    }

    pub fn children(&self) -> Option<&[PredictiveCache]> {
        match self {
            PredictiveCache::Children(entries) => Some(entries),
            PredictiveCache::Root(_) => None,
        }
    }
}
