//! Core traits and types for lazy covariance operators
//!
//! This crate provides the operator abstraction that Gaussian process code
//! programs against, the dense tensor substrate the leaves are stored in, and
//! the bookkeeping composites need to split flattened representations back
//! into per-child slices.
//!
//! # Architecture Overview
//!
//! 1. **Tensors** - dense matrices and batches of matrices ([`Tensor`])
//! 2. **Operators** - the [`LazyOperator`] trait and its leaves
//!    ([`DenseOperator`], [`DiagOperator`])
//! 3. **Composition support** - representation slicing, execution strategy
//!    and predictive cache values used by composite operators
//!
//! # Example
//!
//! ```rust
//! use covar_core::{DenseOperator, LazyOperator, Tensor};
//! use nalgebra::DMatrix;
//!
//! let op = DenseOperator::new(DMatrix::identity(3, 3));
//! let out = op.matmul(&Tensor::column(&[1.0, 2.0, 3.0])).unwrap();
//! assert_eq!(out, Tensor::column(&[1.0, 2.0, 3.0]));
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod execution;
pub mod leaf;
pub mod representation;
pub mod tensor;
pub mod traits;
pub mod types;

// Re-export core types
pub use error::{Error, Result};

pub use cache::PredictiveCache;
pub use config::{OperatorConfig, DEFAULT_JITTER};
pub use execution::ExecutionStrategy;
pub use leaf::{DenseOperator, DiagOperator};
pub use tensor::{Shape, Tensor};
pub use traits::{AsAny, LazyOperator, MatmulClosure, Operator, QuadFormClosure};
pub use types::{Operand, OperatorOrValue, Selector};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        DenseOperator, DiagOperator, ExecutionStrategy, LazyOperator, Operand, Operator,
        OperatorConfig, OperatorOrValue, PredictiveCache, Result, Selector, Shape, Tensor,
        DEFAULT_JITTER,
    };

    pub use crate::error::Error;
}
