//! Additive composition of lazy covariance operators
//!
//! [`SumOperator`] is the N-ary composite used to build GP covariances such
//! as `signal kernel + noise`. It forwards every operator capability to its
//! children and combines their answers, redistributing flattened
//! representation arguments so that each child's closure sees only its own
//! slice.
//!
//! # Example
//!
//! ```rust
//! use covar_core::{DenseOperator, DiagOperator, LazyOperator, Operand, Tensor};
//! use covar_sum::SumOperator;
//! use nalgebra::DMatrix;
//!
//! let kernel = SumOperator::new([
//!     Operand::operator(DenseOperator::new(DMatrix::identity(3, 3))),
//!     Operand::operator(DiagOperator::constant(3, 0.1)),
//! ])
//! .unwrap();
//!
//! assert_eq!(kernel.representation_len(), 2);
//! let diag = kernel.diagonal().unwrap();
//! assert!(diag.max_abs_diff(&Tensor::column(&[1.1, 1.1, 1.1])).unwrap() < 1e-12);
//! ```

mod closures;
mod ext;
mod predictive;
mod sum;

pub use ext::SumExt;
pub use sum::SumOperator;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{SumExt, SumOperator};
    pub use covar_core::prelude::*;
}
