//! Operand, selector and selection result types

use crate::config::OperatorConfig;
use crate::leaf::DenseOperator;
use crate::tensor::Tensor;
use crate::traits::{LazyOperator, Operator};
use crate::{Error, Result};
use nalgebra::DMatrix;
use std::ops::Range;
use std::sync::Arc;

/// Anything a caller may hand to a composite constructor
#[derive(Debug, Clone)]
pub enum Operand {
    /// Kept as-is
    Operator(Operator),
    /// Lifted into a [`DenseOperator`]
    Tensor(Tensor),
    /// Neither an operator nor a matrix; always rejected
    Scalar(f64),
}

impl Operand {
    pub fn operator<O: LazyOperator + 'static>(op: O) -> Self {
        Operand::Operator(Arc::new(op))
    }

    /// Normalize to an operator, lifting raw tensors into dense leaves
    ///
    /// This is the only place raw values become operators.
    pub fn into_operator(self, config: &OperatorConfig) -> Result<Operator> {
        match self {
            Operand::Operator(op) => Ok(op),
            Operand::Tensor(t) => {
                let leaf = DenseOperator::from_tensor(t)
                    .map_err(|e| Error::Construction(format!("cannot lift tensor operand: {e}")))?
                    .with_jitter(config.jitter);
                Ok(Arc::new(leaf))
            }
            Operand::Scalar(_) => Err(Error::not_an_operand("scalar")),
        }
    }
}

impl From<Operator> for Operand {
    fn from(op: Operator) -> Self {
        Operand::Operator(op)
    }
}

impl From<&Operator> for Operand {
    fn from(op: &Operator) -> Self {
        Operand::Operator(Arc::clone(op))
    }
}

impl From<Tensor> for Operand {
    fn from(t: Tensor) -> Self {
        Operand::Tensor(t)
    }
}

impl From<DMatrix<f64>> for Operand {
    fn from(m: DMatrix<f64>) -> Self {
        Operand::Tensor(Tensor::Matrix(m))
    }
}

impl From<f64> for Operand {
    fn from(v: f64) -> Self {
        Operand::Scalar(v)
    }
}

/// What to pick out of an operator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    /// One entry of a non-batched operator
    Entry { row: usize, col: usize },
    /// One entry of a batch operator
    BatchEntry { batch: usize, row: usize, col: usize },
    /// Contiguous sub-block
    Block { rows: Range<usize>, cols: Range<usize> },
    /// One member of a batch operator
    Batch(usize),
}

impl Selector {
    /// Whether this selector collapses an operator to a plain value
    pub fn is_entry(&self) -> bool {
        matches!(self, Selector::Entry { .. } | Selector::BatchEntry { .. })
    }
}

/// Result of a selection: still an operator, or degenerated to a value
#[derive(Debug, Clone)]
pub enum OperatorOrValue {
    Operator(Operator),
    Value(Tensor),
}

impl OperatorOrValue {
    pub fn is_operator(&self) -> bool {
        matches!(self, OperatorOrValue::Operator(_))
    }

    pub fn into_operator(self) -> Option<Operator> {
        match self {
            OperatorOrValue::Operator(op) => Some(op),
            OperatorOrValue::Value(_) => None,
        }
    }

    pub fn into_value(self) -> Option<Tensor> {
        match self {
            OperatorOrValue::Value(t) => Some(t),
            OperatorOrValue::Operator(_) => None,
        }
    }
}
