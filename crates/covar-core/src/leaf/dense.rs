//! Dense leaf operator

use crate::config::{OperatorConfig, DEFAULT_JITTER};
use crate::representation::expect_len;
use crate::tensor::{Shape, Tensor};
use crate::traits::{LazyOperator, MatmulClosure, Operator, QuadFormClosure};
use crate::types::{OperatorOrValue, Selector};
use crate::{Error, Result};
use nalgebra::DMatrix;
use std::sync::Arc;

/// Operator backed by one explicit matrix (or batch of matrices)
///
/// Raw tensors handed to a composite are lifted into this type.
#[derive(Debug, Clone, PartialEq)]
pub struct DenseOperator {
    tensor: Tensor,
    jitter: f64,
}

impl DenseOperator {
    pub fn new(matrix: DMatrix<f64>) -> Self {
        Self {
            tensor: Tensor::Matrix(matrix),
            jitter: DEFAULT_JITTER,
        }
    }

    /// Wrap a tensor; batches must be non-empty and not ragged
    pub fn from_tensor(tensor: Tensor) -> Result<Self> {
        let shape = tensor.validate()?;
        if shape.rows == 0 || shape.cols == 0 {
            return Err(Error::InvalidInput(format!(
                "dense operator requires a non-empty matrix, got {shape}"
            )));
        }
        Ok(Self {
            tensor,
            jitter: DEFAULT_JITTER,
        })
    }

    pub fn with_jitter(mut self, jitter: f64) -> Self {
        self.jitter = jitter;
        self
    }

    pub fn with_config(self, config: &OperatorConfig) -> Self {
        self.with_jitter(config.jitter)
    }

    pub fn tensor(&self) -> &Tensor {
        &self.tensor
    }

    pub fn jitter(&self) -> f64 {
        self.jitter
    }

    fn rewrap(&self, tensor: Tensor) -> Operator {
        Arc::new(Self {
            tensor,
            jitter: self.jitter,
        })
    }
}

impl LazyOperator for DenseOperator {
    fn name(&self) -> &'static str {
        "dense"
    }

    fn representation(&self) -> Vec<Tensor> {
        vec![self.tensor.clone()]
    }

    fn representation_len(&self) -> usize {
        1
    }

    fn matmul_closure_factory(&self, repr: &[Tensor]) -> Result<MatmulClosure> {
        expect_len(repr, 1)?;
        let matrix = repr[0].clone();
        Ok(Box::new(move |rhs: &Tensor| matrix.matmul(rhs)))
    }

    /// Gradient w.r.t. the matrix itself is `left * rightᵀ`
    fn derivative_quad_form_factory(&self, repr: &[Tensor]) -> Result<QuadFormClosure> {
        expect_len(repr, 1)?;
        let shape = repr[0].shape();
        Ok(Box::new(move |left: &Tensor, right: &Tensor| {
            let grad = left.matmul(&right.transpose())?;
            // Batch dimension included: one gradient per representation element
            if grad.shape() != shape {
                return Err(Error::shape_mismatch(shape, grad.shape(), "dense quadratic form"));
            }
            Ok(vec![grad])
        }))
    }

    fn size(&self) -> Shape {
        self.tensor.shape()
    }

    fn transpose(&self) -> Result<Operator> {
        Ok(self.rewrap(self.tensor.transpose()))
    }

    fn diagonal(&self) -> Result<Tensor> {
        self.tensor.diagonal()
    }

    fn get_indices(&self, left: &[usize], right: &[usize]) -> Result<Tensor> {
        self.tensor.gather(None, left, right)
    }

    fn batch_get_indices(&self, batch: &[usize], left: &[usize], right: &[usize]) -> Result<Tensor> {
        self.tensor.gather(Some(batch), left, right)
    }

    fn add_jitter(&self) -> Result<Operator> {
        Ok(self.rewrap(self.tensor.add_diagonal(self.jitter)?))
    }

    fn sum_batch(&self, group: Option<usize>) -> Result<Operator> {
        Ok(self.rewrap(self.tensor.sum_batch(group)?))
    }

    fn select(&self, selector: &Selector) -> Result<OperatorOrValue> {
        match selector {
            Selector::Entry { row, col } => Ok(OperatorOrValue::Value(Tensor::scalar(
                self.tensor.entry(None, *row, *col)?,
            ))),
            Selector::BatchEntry { batch, row, col } => Ok(OperatorOrValue::Value(Tensor::scalar(
                self.tensor.entry(Some(*batch), *row, *col)?,
            ))),
            Selector::Block { rows, cols } => Ok(OperatorOrValue::Operator(
                self.rewrap(self.tensor.block(rows.clone(), cols.clone())?),
            )),
            Selector::Batch(index) => Ok(OperatorOrValue::Operator(
                self.rewrap(self.tensor.batch_item(*index)?),
            )),
        }
    }
}
