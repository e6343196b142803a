//! Leaf operators
//!
//! Leaves have no children. Their representation is a single tensor, so the
//! closure factories only ever see a one-element slice.

mod dense;
mod diag;

pub use dense::DenseOperator;
pub use diag::DiagOperator;
