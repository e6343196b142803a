//! Predictive covariance cache protocol for sums
//!
//! At prediction time the train/train and test/train covariances are built
//! from the same kernel structure, so a sum over `k` kernels is paired with a
//! test/train sum over the same `k` kernels in the same order. Each child
//! builds and consumes its own cache against its matching test/train child.

use crate::SumOperator;
use covar_core::{
    Error, ExecutionStrategy, LazyOperator, Operator, PredictiveCache, Result, Tensor,
};
use tracing::{debug, instrument};

/// Children of `test_train`, which must be a sum paired with `children`
fn paired_children<'a>(
    children: &[Operator],
    test_train: &'a dyn LazyOperator,
) -> Result<&'a [Operator]> {
    let test_train = test_train.downcast_ref::<SumOperator>().ok_or_else(|| {
        Error::CacheMismatch(format!(
            "test/train covariance must be a sum, got {}",
            test_train.name()
        ))
    })?;
    if test_train.children().len() != children.len() {
        return Err(Error::CacheMismatch(format!(
            "sum of {} children paired with test/train sum of {} children",
            children.len(),
            test_train.children().len()
        )));
    }
    Ok(test_train.children())
}

#[instrument(skip_all, fields(children = children.len()))]
pub(crate) fn build_cache(
    children: &[Operator],
    strategy: ExecutionStrategy,
    train_train_inv_root: &Tensor,
    test_train: &dyn LazyOperator,
) -> Result<PredictiveCache> {
    let test_train = paired_children(children, test_train)?;
    let pairs: Vec<(&Operator, &Operator)> = children.iter().zip(test_train).collect();
    let entries = strategy.try_map_ordered(&pairs, |&(child, test_train_child)| {
        child.predictive_cache(train_train_inv_root, test_train_child.as_ref())
    })?;
    debug!(entries = entries.len(), "built predictive cache");
    Ok(PredictiveCache::Children(entries))
}

#[instrument(skip_all, fields(children = children.len()))]
pub(crate) fn apply_cache(
    children: &[Operator],
    strategy: ExecutionStrategy,
    cache: &PredictiveCache,
    test_train: &dyn LazyOperator,
) -> Result<Tensor> {
    let entries = match cache {
        PredictiveCache::Children(entries) if entries.len() == children.len() => entries,
        PredictiveCache::Children(entries) => {
            return Err(Error::CacheMismatch(format!(
                "{} cache entries for {} children",
                entries.len(),
                children.len()
            )))
        }
        PredictiveCache::Root(_) => {
            return Err(Error::CacheMismatch(
                "sum received a leaf cache".to_string(),
            ))
        }
    };
    let test_train = paired_children(children, test_train)?;

    let triples: Vec<(&Operator, &PredictiveCache, &Operator)> = children
        .iter()
        .zip(entries)
        .zip(test_train)
        .map(|((child, entry), test_train_child)| (child, entry, test_train_child))
        .collect();
    let roots = strategy.try_map_ordered(&triples, |&(child, entry, test_train_child)| {
        child.predictive_root(entry, test_train_child.as_ref())
    })?;
    Tensor::sum_all(roots)
}
