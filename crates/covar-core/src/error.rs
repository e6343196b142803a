//! Error types for lazy covariance operators
//!
//! Provides a unified error type for all lazy-covar crates.

use crate::tensor::Shape;
use thiserror::Error;

/// Core error type for lazy operator algebra
#[derive(Error, Debug)]
pub enum Error {
    /// An operand to a composite is neither an operator nor a tensor
    #[error("Construction error: {0}")]
    Construction(String),

    /// Additive composition against something that is not an operator
    #[error("Invalid operand: {0}")]
    InvalidOperand(String),

    /// Operands or tensors of incompatible shape were combined
    #[error("Shape mismatch in {context}: expected {expected}, got {actual}")]
    ShapeMismatch {
        expected: Shape,
        actual: Shape,
        context: String,
    },

    /// Flattened representation arguments do not match the children's lengths
    #[error("Representation length mismatch: children declare {expected} tensors, got {actual}")]
    RepresentationLengthMismatch { expected: usize, actual: usize },

    /// Predictive cache and test/train operator are not paired child-for-child
    #[error("Predictive cache mismatch: {0}")]
    CacheMismatch(String),

    /// Index outside the operator bounds
    #[error("Index {index} out of bounds for {context} of length {bound}")]
    IndexOutOfBounds {
        index: usize,
        bound: usize,
        context: String,
    },

    /// Selector that cannot be applied
    #[error("Invalid selector: {0}")]
    InvalidSelector(String),

    /// Invalid input data
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Other errors
    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

// Helper functions for common error patterns

impl Error {
    /// Create an error for operands of unequal shape
    pub fn shape_mismatch(expected: Shape, actual: Shape, context: &str) -> Self {
        Self::ShapeMismatch {
            expected,
            actual,
            context: context.to_string(),
        }
    }

    /// Create an error for an out-of-range index
    pub fn out_of_bounds(index: usize, bound: usize, context: &str) -> Self {
        Self::IndexOutOfBounds {
            index,
            bound,
            context: context.to_string(),
        }
    }

    /// Create the error raised for operands that cannot be lifted into operators
    pub fn not_an_operand(what: &str) -> Self {
        Self::Construction(format!(
            "all operands must be operators or tensors (got {what})"
        ))
    }
}
