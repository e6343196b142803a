//! Shared utilities for integration tests

#![allow(dead_code)]

use covar_core::Tensor;
use nalgebra::DMatrix;

pub use approx::assert_relative_eq;

pub const EPSILON: f64 = 1e-10;

/// Matrix sizes that cover the degenerate and small cases
pub fn edge_case_sizes() -> Vec<usize> {
    vec![
        1, // Single entry
        2,
        3,
        5,  // Odd
        8,  // Power of 2
        13, // Prime
    ]
}

/// Deterministic, non-symmetric `rows x cols` matrix
pub fn patterned(rows: usize, cols: usize) -> DMatrix<f64> {
    DMatrix::from_fn(rows, cols, |i, j| {
        ((i * cols + j) as f64 * 0.37).sin() + if i == j { 2.0 } else { 0.0 }
    })
}

/// Assert two tensors agree elementwise within `EPSILON`
pub fn assert_tensor_close(actual: &Tensor, expected: &Tensor, context: &str) {
    match actual.max_abs_diff(expected) {
        Some(diff) => assert!(
            diff < EPSILON,
            "{}: tensors differ by {}",
            context,
            diff
        ),
        None => panic!(
            "{}: shape mismatch {} vs {}",
            context,
            actual.shape(),
            expected.shape()
        ),
    }
}
