//! Lazy linear operator algebra for Gaussian process covariances
//!
//! Covariance matrices are kept as trees of operators instead of dense
//! arrays. Leaves hold explicit tensors; composites such as [`SumOperator`]
//! answer every request (matrix products, gradients, diagonals, predictive
//! caches) by delegating to their children.
//!
//! # Crates
//!
//! - [`covar_core`] - the [`LazyOperator`] trait, tensors, leaf operators, errors
//!   and configuration
//! - [`covar_sum`] - the additive composite and its `+` operator
//!
//! # Example
//!
//! ```rust
//! use lazy_covar::prelude::*;
//! use nalgebra::DMatrix;
//!
//! // signal kernel + observation noise
//! let kernel = Operand::from(DMatrix::from_element(4, 4, 0.5));
//! let noise = Operand::operator(DiagOperator::constant(4, 0.1));
//! let covar = SumOperator::new([kernel, noise]).unwrap();
//!
//! let diag = covar.diagonal().unwrap();
//! assert!(diag.max_abs_diff(&Tensor::column(&[0.6; 4])).unwrap() < 1e-12);
//! ```

pub use covar_core;
pub use covar_sum;

pub use covar_core::{
    DenseOperator, DiagOperator, Error, ExecutionStrategy, LazyOperator, Operand, Operator,
    OperatorConfig, OperatorOrValue, PredictiveCache, Result, Selector, Shape, Tensor,
    DEFAULT_JITTER,
};
pub use covar_sum::{SumExt, SumOperator};

/// Prelude module for convenient imports
pub mod prelude {
    pub use covar_core::prelude::*;
    pub use covar_sum::prelude::*;
}
