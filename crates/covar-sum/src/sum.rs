//! Additive composite operator

use crate::closures::{concat_quad_form_closure, sum_matmul_closure};
use crate::predictive::{apply_cache, build_cache};
use covar_core::representation::{flatten, total_len};
use covar_core::{
    Error, LazyOperator, MatmulClosure, Operand, Operator, OperatorConfig, OperatorOrValue,
    PredictiveCache, QuadFormClosure, Result, Selector, Shape, Tensor,
};
use std::ops::Add;
use std::sync::Arc;
use tracing::{debug, instrument, trace};

/// Elementwise sum of child operators of identical size
///
/// Every capability is answered by fanning the request out to the children
/// and combining their answers: matmul results, diagonals and entries are
/// summed, gradient tuples are concatenated, predictive caches are kept per
/// child. A `SumOperator` is never mutated; combinators return new sums that
/// share the untouched children.
///
/// # Example
///
/// ```rust
/// use covar_core::{DiagOperator, LazyOperator, Operand, Tensor};
/// use covar_sum::SumOperator;
/// use nalgebra::DMatrix;
///
/// let sum = SumOperator::new([
///     Operand::from(DMatrix::from_element(3, 3, 0.1)),
///     Operand::operator(DiagOperator::constant(3, 1.0)),
/// ])
/// .unwrap();
///
/// let out = sum.matmul(&Tensor::column(&[1.0, 1.0, 1.0])).unwrap();
/// assert!(out.max_abs_diff(&Tensor::column(&[1.3, 1.3, 1.3])).unwrap() < 1e-12);
/// ```
#[derive(Debug, Clone)]
pub struct SumOperator {
    children: Vec<Operator>,
    config: OperatorConfig,
}

impl SumOperator {
    /// Sum of `operands` with the default configuration
    ///
    /// Operands are kept as given: a sum passed here stays a single nested
    /// child. Use [`try_add`](Self::try_add) to merge child lists.
    pub fn new<I, O>(operands: I) -> Result<Self>
    where
        I: IntoIterator<Item = O>,
        O: Into<Operand>,
    {
        Self::with_config(operands, OperatorConfig::default())
    }

    /// Sum of `operands`; raw tensors are lifted into dense leaves
    pub fn with_config<I, O>(operands: I, config: OperatorConfig) -> Result<Self>
    where
        I: IntoIterator<Item = O>,
        O: Into<Operand>,
    {
        config.validate()?;
        let children = operands
            .into_iter()
            .map(|operand| operand.into().into_operator(&config))
            .collect::<Result<Vec<_>>>()?;
        Self::from_children(children, config)
    }

    /// Sum over already-normalized children
    #[instrument(skip_all, fields(children = children.len()))]
    pub fn from_children(children: Vec<Operator>, config: OperatorConfig) -> Result<Self> {
        let first = children.first().ok_or_else(|| {
            Error::Construction("a sum requires at least one operand".to_string())
        })?;
        if config.validate_shapes {
            let expected = first.size();
            for child in &children[1..] {
                if child.size() != expected {
                    return Err(Error::shape_mismatch(expected, child.size(), "sum operands"));
                }
            }
        }
        debug!(size = %first.size(), "constructed sum operator");
        Ok(Self { children, config })
    }

    pub fn children(&self) -> &[Operator] {
        &self.children
    }

    pub fn num_children(&self) -> usize {
        self.children.len()
    }

    pub fn config(&self) -> &OperatorConfig {
        &self.config
    }

    /// Same configuration, different children
    fn rebuild(&self, children: Vec<Operator>) -> Result<Self> {
        Self::from_children(children, self.config)
    }

    /// Additive composition
    ///
    /// Another sum contributes its children (no nested sums are built), a
    /// single operator is appended. Raw tensors and scalars are rejected.
    pub fn try_add(&self, other: impl Into<Operand>) -> Result<Self> {
        let mut children = self.children.clone();
        match other.into() {
            Operand::Operator(op) => match op.downcast_ref::<SumOperator>() {
                Some(sum) => {
                    trace!(appended = sum.num_children(), "flattening nested sum");
                    children.extend(sum.children.iter().cloned());
                }
                None => children.push(op),
            },
            Operand::Tensor(_) | Operand::Scalar(_) => {
                return Err(Error::InvalidOperand(
                    "other must be an operator".to_string(),
                ))
            }
        }
        self.rebuild(children)
    }

    /// Per-child predictive caches, see [`LazyOperator::predictive_cache`]
    pub fn build_predictive_cache(
        &self,
        train_train_inv_root: &Tensor,
        test_train: &SumOperator,
    ) -> Result<PredictiveCache> {
        self.predictive_cache(train_train_inv_root, test_train)
    }

    /// Summed per-child predictive roots, see [`LazyOperator::predictive_root`]
    pub fn apply_predictive_cache(
        &self,
        cache: &PredictiveCache,
        test_train: &SumOperator,
    ) -> Result<Tensor> {
        self.predictive_root(cache, test_train)
    }
}

impl From<SumOperator> for Operand {
    fn from(sum: SumOperator) -> Self {
        Operand::Operator(Arc::new(sum))
    }
}

impl<O: Into<Operand>> Add<O> for SumOperator {
    type Output = Result<SumOperator>;

    fn add(self, other: O) -> Self::Output {
        self.try_add(other)
    }
}

impl<O: Into<Operand>> Add<O> for &SumOperator {
    type Output = Result<SumOperator>;

    fn add(self, other: O) -> Self::Output {
        self.try_add(other)
    }
}

impl LazyOperator for SumOperator {
    fn name(&self) -> &'static str {
        "sum"
    }

    fn representation(&self) -> Vec<Tensor> {
        flatten(&self.children)
    }

    fn representation_len(&self) -> usize {
        total_len(&self.children)
    }

    fn matmul_closure_factory(&self, repr: &[Tensor]) -> Result<MatmulClosure> {
        sum_matmul_closure(&self.children, self.config.strategy, repr)
    }

    fn derivative_quad_form_factory(&self, repr: &[Tensor]) -> Result<QuadFormClosure> {
        concat_quad_form_closure(&self.children, self.config.strategy, repr)
    }

    fn size(&self) -> Shape {
        self.children[0].size()
    }

    fn transpose(&self) -> Result<Operator> {
        let children = self
            .children
            .iter()
            .map(|child| child.transpose())
            .collect::<Result<Vec<_>>>()?;
        Ok(Arc::new(self.rebuild(children)?))
    }

    fn diagonal(&self) -> Result<Tensor> {
        let parts = self
            .config
            .strategy
            .try_map_ordered(&self.children, |child| child.diagonal())?;
        Tensor::sum_all(parts)
    }

    fn get_indices(&self, left: &[usize], right: &[usize]) -> Result<Tensor> {
        let parts = self
            .config
            .strategy
            .try_map_ordered(&self.children, |child| child.get_indices(left, right))?;
        Tensor::sum_all(parts)
    }

    fn batch_get_indices(&self, batch: &[usize], left: &[usize], right: &[usize]) -> Result<Tensor> {
        let parts = self.config.strategy.try_map_ordered(&self.children, |child| {
            child.batch_get_indices(batch, left, right)
        })?;
        Tensor::sum_all(parts)
    }

    /// Only the last child is jittered; it is conventionally the noise term
    fn add_jitter(&self) -> Result<Operator> {
        let mut children = self.children.clone();
        if let Some(last) = children.last_mut() {
            *last = last.add_jitter()?;
        }
        Ok(Arc::new(self.rebuild(children)?))
    }

    fn sum_batch(&self, group: Option<usize>) -> Result<Operator> {
        let children = self
            .children
            .iter()
            .map(|child| child.sum_batch(group))
            .collect::<Result<Vec<_>>>()?;
        Ok(Arc::new(self.rebuild(children)?))
    }

    fn select(&self, selector: &Selector) -> Result<OperatorOrValue> {
        let results = self
            .children
            .iter()
            .map(|child| child.select(selector))
            .collect::<Result<Vec<_>>>()?;

        if results.iter().all(OperatorOrValue::is_operator) {
            let children = results.into_iter().filter_map(OperatorOrValue::into_operator).collect();
            return Ok(OperatorOrValue::Operator(Arc::new(self.rebuild(children)?)));
        }
        if results.iter().any(OperatorOrValue::is_operator) {
            return Err(Error::InvalidSelector(format!(
                "{selector:?} produced a mix of operators and values"
            )));
        }
        let values = results.into_iter().filter_map(OperatorOrValue::into_value);
        Ok(OperatorOrValue::Value(Tensor::sum_all(values)?))
    }

    fn predictive_cache(
        &self,
        train_train_inv_root: &Tensor,
        test_train: &dyn LazyOperator,
    ) -> Result<PredictiveCache> {
        build_cache(&self.children, self.config.strategy, train_train_inv_root, test_train)
    }

    fn predictive_root(
        &self,
        cache: &PredictiveCache,
        test_train: &dyn LazyOperator,
    ) -> Result<Tensor> {
        apply_cache(&self.children, self.config.strategy, cache, test_train)
    }
}
