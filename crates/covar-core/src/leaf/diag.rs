//! Diagonal leaf operator
//!
//! The usual last summand of a covariance: observation noise or jitter.

use crate::config::{OperatorConfig, DEFAULT_JITTER};
use crate::leaf::DenseOperator;
use crate::representation::expect_len;
use crate::tensor::{check_index_lists, Shape, Tensor};
use crate::traits::{LazyOperator, MatmulClosure, Operator, QuadFormClosure};
use crate::types::{OperatorOrValue, Selector};
use crate::{Error, Result};
use std::sync::Arc;

/// Square operator with an explicit diagonal and zeros elsewhere
///
/// The representation is the diagonal itself, stored as an `n x 1` column
/// (or a batch of columns).
#[derive(Debug, Clone, PartialEq)]
pub struct DiagOperator {
    diag: Tensor,
    jitter: f64,
}

impl DiagOperator {
    pub fn new(values: &[f64]) -> Self {
        Self {
            diag: Tensor::column(values),
            jitter: DEFAULT_JITTER,
        }
    }

    /// `value * I` of size `n`
    pub fn constant(n: usize, value: f64) -> Self {
        Self::new(&vec![value; n])
    }

    /// Wrap a column tensor (or batch of columns)
    pub fn from_tensor(diag: Tensor) -> Result<Self> {
        let shape = diag.validate()?;
        if shape.cols != 1 || shape.rows == 0 {
            return Err(Error::InvalidInput(format!(
                "diagonal must be a non-empty n x 1 column, got {shape}"
            )));
        }
        Ok(Self {
            diag,
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

    pub fn values(&self) -> &Tensor {
        &self.diag
    }

    fn rewrap(&self, diag: Tensor) -> Operator {
        Arc::new(Self {
            diag,
            jitter: self.jitter,
        })
    }

    fn entry_at(&self, batch: Option<usize>, row: usize, col: usize) -> Result<f64> {
        let n = self.diag.shape().rows;
        if col >= n {
            return Err(Error::out_of_bounds(col, n, "column index"));
        }
        let value = self.diag.entry(batch, row, 0)?;
        Ok(if row == col { value } else { 0.0 })
    }

    fn gather(&self, batch: Option<&[usize]>, left: &[usize], right: &[usize]) -> Result<Tensor> {
        check_index_lists(batch, left, right)?;
        let values = (0..left.len())
            .map(|k| self.entry_at(batch.map(|b| b[k]), left[k], right[k]))
            .collect::<Result<Vec<_>>>()?;
        Ok(Tensor::column(&values))
    }
}

impl LazyOperator for DiagOperator {
    fn name(&self) -> &'static str {
        "diag"
    }

    fn representation(&self) -> Vec<Tensor> {
        vec![self.diag.clone()]
    }

    fn representation_len(&self) -> usize {
        1
    }

    fn matmul_closure_factory(&self, repr: &[Tensor]) -> Result<MatmulClosure> {
        expect_len(repr, 1)?;
        let diag = repr[0].clone();
        Ok(Box::new(move |rhs: &Tensor| diag.scale_rows(rhs)))
    }

    /// Gradient w.r.t. the diagonal is the row-wise sum of `left ∘ right`
    fn derivative_quad_form_factory(&self, repr: &[Tensor]) -> Result<QuadFormClosure> {
        expect_len(repr, 1)?;
        let shape = repr[0].shape();
        Ok(Box::new(move |left: &Tensor, right: &Tensor| {
            let grad = left.row_dots(right)?;
            if grad.shape() != shape {
                return Err(Error::shape_mismatch(shape, grad.shape(), "diagonal quadratic form"));
            }
            Ok(vec![grad])
        }))
    }

    fn size(&self) -> Shape {
        let shape = self.diag.shape();
        Shape {
            batch: shape.batch,
            rows: shape.rows,
            cols: shape.rows,
        }
    }

    fn transpose(&self) -> Result<Operator> {
        Ok(Arc::new(self.clone()))
    }

    fn diagonal(&self) -> Result<Tensor> {
        Ok(self.diag.clone())
    }

    fn get_indices(&self, left: &[usize], right: &[usize]) -> Result<Tensor> {
        self.gather(None, left, right)
    }

    fn batch_get_indices(&self, batch: &[usize], left: &[usize], right: &[usize]) -> Result<Tensor> {
        self.gather(Some(batch), left, right)
    }

    fn add_jitter(&self) -> Result<Operator> {
        let jitter = self.jitter;
        Ok(self.rewrap(self.diag.map_matrices(|d| d.add_scalar(jitter))))
    }

    fn sum_batch(&self, group: Option<usize>) -> Result<Operator> {
        Ok(self.rewrap(self.diag.sum_batch(group)?))
    }

    fn select(&self, selector: &Selector) -> Result<OperatorOrValue> {
        match selector {
            Selector::Entry { row, col } => Ok(OperatorOrValue::Value(Tensor::scalar(
                self.entry_at(None, *row, *col)?,
            ))),
            Selector::BatchEntry { batch, row, col } => Ok(OperatorOrValue::Value(Tensor::scalar(
                self.entry_at(Some(*batch), *row, *col)?,
            ))),
            // Blocks centred on the diagonal stay diagonal
            Selector::Block { rows, cols } if rows == cols => Ok(OperatorOrValue::Operator(
                self.rewrap(self.diag.block(rows.clone(), 0..1)?),
            )),
            Selector::Block { rows, cols } => {
                let dense = DenseOperator::from_tensor(self.evaluate()?.block(rows.clone(), cols.clone())?)?
                    .with_jitter(self.jitter);
                Ok(OperatorOrValue::Operator(Arc::new(dense)))
            }
            Selector::Batch(index) => Ok(OperatorOrValue::Operator(
                self.rewrap(self.diag.batch_item(*index)?),
            )),
        }
    }
}
