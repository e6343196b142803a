//! Closure factories for the additive composite
//!
//! Both factories follow the same pattern: split the flattened
//! representation into per-child slices, build one closure per child from its
//! slice, and return an outer closure that fans the run-time arguments out to
//! every child closure. Matmul results are summed; gradient tuples are
//! concatenated so each tensor lines up with the representation element it
//! belongs to.

use covar_core::representation::partition;
use covar_core::{
    ExecutionStrategy, LazyOperator, MatmulClosure, Operator, QuadFormClosure, Result, Tensor,
};
use tracing::debug;

/// Build one closure per child from that child's slice of `args`
fn child_closures<C, F>(children: &[Operator], args: &[Tensor], factory: F) -> Result<Vec<C>>
where
    F: Fn(&dyn LazyOperator, &[Tensor]) -> Result<C>,
{
    let slices = partition(children, args)?;
    children
        .iter()
        .zip(slices)
        .map(|(child, slice)| factory(child.as_ref(), slice))
        .collect()
}

/// `rhs -> Σ_k child_k(rhs)`
pub(crate) fn sum_matmul_closure(
    children: &[Operator],
    strategy: ExecutionStrategy,
    args: &[Tensor],
) -> Result<MatmulClosure> {
    let sub_closures = child_closures(children, args, |child, slice| {
        child.matmul_closure_factory(slice)
    })?;
    debug!(
        children = sub_closures.len(),
        ?strategy,
        threads = strategy.num_threads(),
        "built sum matmul closure"
    );

    Ok(Box::new(move |rhs: &Tensor| {
        let parts = strategy.try_map_ordered(&sub_closures, |f| f(rhs))?;
        Tensor::sum_all(parts)
    }))
}

/// `(left, right) -> child_1(left, right) ++ child_2(left, right) ++ ...`
pub(crate) fn concat_quad_form_closure(
    children: &[Operator],
    strategy: ExecutionStrategy,
    args: &[Tensor],
) -> Result<QuadFormClosure> {
    let sub_closures = child_closures(children, args, |child, slice| {
        child.derivative_quad_form_factory(slice)
    })?;
    debug!(
        children = sub_closures.len(),
        ?strategy,
        threads = strategy.num_threads(),
        "built sum quadratic form closure"
    );

    Ok(Box::new(move |left: &Tensor, right: &Tensor| {
        let parts = strategy.try_map_ordered(&sub_closures, |g| g(left, right))?;
        Ok(parts.into_iter().flatten().collect())
    }))
}
