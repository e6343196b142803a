//! Shared utilities for integration tests

#![allow(dead_code)]

use covar_core::{
    DenseOperator, Error, LazyOperator, MatmulClosure, Operator, OperatorOrValue,
    QuadFormClosure, Result, Selector, Shape, Tensor, DEFAULT_JITTER,
};
use nalgebra::DMatrix;
use std::sync::Arc;

pub use approx::assert_relative_eq;

pub const EPSILON: f64 = 1e-10;

/// `scale * base`, represented by two tensors: the base matrix and a `1 x 1` scale
///
/// Its representation length differs from the leaves', which makes slicing
/// mistakes visible.
#[derive(Debug, Clone)]
pub struct ScaledOperator {
    base: DMatrix<f64>,
    scale: f64,
}

impl ScaledOperator {
    pub fn new(base: DMatrix<f64>, scale: f64) -> Self {
        Self { base, scale }
    }
}

fn unpack(repr: &[Tensor]) -> Result<(DMatrix<f64>, f64)> {
    if repr.len() != 2 {
        return Err(Error::RepresentationLengthMismatch {
            expected: 2,
            actual: repr.len(),
        });
    }
    let base = repr[0]
        .as_matrix()
        .cloned()
        .ok_or_else(|| Error::InvalidInput("scaled base must be a matrix".to_string()))?;
    let scale = repr[1]
        .as_scalar()
        .ok_or_else(|| Error::InvalidInput("scale must be 1 x 1".to_string()))?;
    Ok((base, scale))
}

impl LazyOperator for ScaledOperator {
    fn name(&self) -> &'static str {
        "scaled"
    }

    fn representation(&self) -> Vec<Tensor> {
        vec![Tensor::Matrix(self.base.clone()), Tensor::scalar(self.scale)]
    }

    fn matmul_closure_factory(&self, repr: &[Tensor]) -> Result<MatmulClosure> {
        let (base, scale) = unpack(repr)?;
        let base = Tensor::Matrix(base);
        Ok(Box::new(move |rhs: &Tensor| {
            Ok(base.matmul(rhs)?.map_matrices(|m| m * scale))
        }))
    }

    /// `[scale * left rightᵀ, Σ left ∘ (base right)]`
    fn derivative_quad_form_factory(&self, repr: &[Tensor]) -> Result<QuadFormClosure> {
        let (base, scale) = unpack(repr)?;
        Ok(Box::new(move |left: &Tensor, right: &Tensor| {
            let (l, r) = match (left.as_matrix(), right.as_matrix()) {
                (Some(l), Some(r)) => (l, r),
                _ => return Err(Error::InvalidInput("batched vectors".to_string())),
            };
            let grad_base = l * r.transpose() * scale;
            let grad_scale = l.component_mul(&(&base * r)).sum();
            Ok(vec![Tensor::Matrix(grad_base), Tensor::scalar(grad_scale)])
        }))
    }

    fn size(&self) -> Shape {
        Shape::matrix(self.base.nrows(), self.base.ncols())
    }

    fn transpose(&self) -> Result<Operator> {
        Ok(Arc::new(Self::new(self.base.transpose(), self.scale)))
    }

    fn diagonal(&self) -> Result<Tensor> {
        Ok(Tensor::Matrix(self.base.clone())
            .diagonal()?
            .map_matrices(|d| d * self.scale))
    }

    fn get_indices(&self, left: &[usize], right: &[usize]) -> Result<Tensor> {
        Ok(Tensor::Matrix(self.base.clone())
            .gather(None, left, right)?
            .map_matrices(|v| v * self.scale))
    }

    fn batch_get_indices(&self, _batch: &[usize], _left: &[usize], _right: &[usize]) -> Result<Tensor> {
        Err(Error::InvalidInput("scaled operator is not batched".to_string()))
    }

    fn add_jitter(&self) -> Result<Operator> {
        let jittered = self.evaluate()?.add_diagonal(DEFAULT_JITTER)?;
        Ok(Arc::new(DenseOperator::from_tensor(jittered)?))
    }

    fn sum_batch(&self, _group: Option<usize>) -> Result<Operator> {
        Err(Error::InvalidInput("scaled operator is not batched".to_string()))
    }

    fn select(&self, selector: &Selector) -> Result<OperatorOrValue> {
        match selector {
            Selector::Entry { row, col } => {
                let v = Tensor::Matrix(self.base.clone()).entry(None, *row, *col)?;
                Ok(OperatorOrValue::Value(Tensor::scalar(v * self.scale)))
            }
            other => Err(Error::InvalidSelector(format!("{other:?}"))),
        }
    }
}

pub fn dense(rows: usize, cols: usize, values: &[f64]) -> Operator {
    Arc::new(DenseOperator::new(DMatrix::from_row_slice(rows, cols, values)))
}

pub fn scaled(rows: usize, cols: usize, values: &[f64], scale: f64) -> Operator {
    Arc::new(ScaledOperator::new(
        DMatrix::from_row_slice(rows, cols, values),
        scale,
    ))
}

/// Assert two tensors agree elementwise within `EPSILON`
pub fn assert_tensor_close(actual: &Tensor, expected: &Tensor) {
    match actual.max_abs_diff(expected) {
        Some(diff) => assert!(
            diff < EPSILON,
            "tensors differ by {diff}: {actual:?} vs {expected:?}"
        ),
        None => panic!(
            "shape mismatch: {} vs {}",
            actual.shape(),
            expected.shape()
        ),
    }
}
