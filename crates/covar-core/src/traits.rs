//! Core operator trait
//!
//! Every operator, leaf or composite, implements [`LazyOperator`]. Consumers
//! (solvers, trace estimators, prediction code) only ever see this trait;
//! they never materialize the matrix unless they call [`LazyOperator::evaluate`].
//!
//! # Closure factories
//!
//! Differentiation happens with respect to an operator's *representation*,
//! the ordered list of tensors returned by [`LazyOperator::representation`].
//! A solver flattens the representation of a whole operator tree, may replace
//! the tensors (for example with perturbed copies), and hands the list back to
//! [`LazyOperator::matmul_closure_factory`] or
//! [`LazyOperator::derivative_quad_form_factory`]. The returned closures must
//! only read their own slice of that list.

use crate::cache::PredictiveCache;
use crate::tensor::{Shape, Tensor};
use crate::types::{OperatorOrValue, Selector};
use crate::{Error, Result};
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Shared handle to any operator
pub type Operator = Arc<dyn LazyOperator>;

/// `rhs -> A * rhs`
pub type MatmulClosure = Box<dyn Fn(&Tensor) -> Result<Tensor> + Send + Sync>;

/// `(left, right) -> d/dθ Σ_k leftₖᵀ A(θ) rightₖ`, one tensor per representation element
pub type QuadFormClosure = Box<dyn Fn(&Tensor, &Tensor) -> Result<Vec<Tensor>> + Send + Sync>;

/// Helper trait for types that can be downcast
///
/// Used to recognise concrete composites behind an [`Operator`] handle.
pub trait AsAny {
    fn as_any(&self) -> &dyn Any;
}

impl<T: 'static> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// A lazily represented matrix (or batch of matrices)
pub trait LazyOperator: AsAny + fmt::Debug + Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// Ordered tensors that determine this operator's values
    fn representation(&self) -> Vec<Tensor>;

    /// Number of tensors in [`representation`](Self::representation)
    fn representation_len(&self) -> usize {
        self.representation().len()
    }

    /// Build `rhs -> A * rhs` from a representation slice
    fn matmul_closure_factory(&self, repr: &[Tensor]) -> Result<MatmulClosure>;

    /// Build the quadratic-form gradient closure from a representation slice
    fn derivative_quad_form_factory(&self, repr: &[Tensor]) -> Result<QuadFormClosure>;

    fn size(&self) -> Shape;

    fn transpose(&self) -> Result<Operator>;

    /// Main diagonal as an `n x 1` column (batched for batch operators)
    fn diagonal(&self) -> Result<Tensor>;

    /// Entries at `(left[k], right[k])`, as an `n x 1` column
    fn get_indices(&self, left: &[usize], right: &[usize]) -> Result<Tensor>;

    /// Entries at `(batch[k], left[k], right[k])` of a batch operator
    fn batch_get_indices(&self, batch: &[usize], left: &[usize], right: &[usize]) -> Result<Tensor>;

    /// Copy with a small positive diagonal shift
    fn add_jitter(&self) -> Result<Operator>;

    /// Collapse the leading batch dimension, see [`Tensor::sum_batch`]
    fn sum_batch(&self, group: Option<usize>) -> Result<Operator>;

    /// Apply a selector; single entries degenerate to values
    fn select(&self, selector: &Selector) -> Result<OperatorOrValue>;

    /// Precompute the training-dependent part of the predictive covariance
    ///
    /// Leaves cache the inverse root itself.
    fn predictive_cache(
        &self,
        train_train_inv_root: &Tensor,
        _test_train: &dyn LazyOperator,
    ) -> Result<PredictiveCache> {
        Ok(PredictiveCache::Root(train_train_inv_root.clone()))
    }

    /// Root of the predictive covariance correction, `test_train * cache` for leaves
    fn predictive_root(
        &self,
        cache: &PredictiveCache,
        test_train: &dyn LazyOperator,
    ) -> Result<Tensor> {
        match cache {
            PredictiveCache::Root(root) => test_train.matmul(root),
            PredictiveCache::Children(entries) => Err(Error::CacheMismatch(format!(
                "{} received a composite cache with {} entries",
                self.name(),
                entries.len()
            ))),
        }
    }

    /// `A * rhs` using this operator's own representation
    fn matmul(&self, rhs: &Tensor) -> Result<Tensor> {
        let repr = self.representation();
        let closure = self.matmul_closure_factory(&repr)?;
        closure(rhs)
    }

    /// Dense materialization
    fn evaluate(&self) -> Result<Tensor> {
        self.matmul(&Tensor::identity(self.size().cols))
    }
}

impl<'a> dyn LazyOperator + 'a {
    /// Downcast to a concrete operator type
    pub fn downcast_ref<T: LazyOperator + 'static>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    pub fn is<T: LazyOperator + 'static>(&self) -> bool {
        self.as_any().is::<T>()
    }
}
