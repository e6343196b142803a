//! Dense tensor substrate
//!
//! Operators store their leaves as [`Tensor`] values: either a single dense
//! matrix or a batch of equally shaped matrices. Vectors are `n x 1`
//! matrices and scalars are `1 x 1` matrices, so every arithmetic result can
//! be fed back into another operator without conversions.
//!
//! All binary operations check shapes and report [`Error::ShapeMismatch`]
//! instead of panicking inside nalgebra.

use crate::{Error, Result};
use nalgebra::DMatrix;
use std::fmt;
use std::ops::Range;

/// Shape of a tensor or operator: optional leading batch dimension, rows, cols
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Shape {
    pub batch: Option<usize>,
    pub rows: usize,
    pub cols: usize,
}

impl Shape {
    pub fn matrix(rows: usize, cols: usize) -> Self {
        Self {
            batch: None,
            rows,
            cols,
        }
    }

    pub fn batch(batch: usize, rows: usize, cols: usize) -> Self {
        Self {
            batch: Some(batch),
            rows,
            cols,
        }
    }

    pub fn is_square(&self) -> bool {
        self.rows == self.cols
    }

    pub fn is_batch(&self) -> bool {
        self.batch.is_some()
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.batch {
            Some(b) => write!(f, "{}x{}x{}", b, self.rows, self.cols),
            None => write!(f, "{}x{}", self.rows, self.cols),
        }
    }
}

/// Dense matrix or batch of matrices
#[derive(Debug, Clone, PartialEq)]
pub enum Tensor {
    Matrix(DMatrix<f64>),
    Batch(Vec<DMatrix<f64>>),
}

impl From<DMatrix<f64>> for Tensor {
    fn from(m: DMatrix<f64>) -> Self {
        Tensor::Matrix(m)
    }
}

impl Tensor {
    /// Build a matrix from row-major values
    pub fn from_row_slice(rows: usize, cols: usize, values: &[f64]) -> Self {
        Tensor::Matrix(DMatrix::from_row_slice(rows, cols, values))
    }

    /// Column vector (`n x 1`)
    pub fn column(values: &[f64]) -> Self {
        Tensor::Matrix(DMatrix::from_column_slice(values.len(), 1, values))
    }

    /// `1 x 1` scalar
    pub fn scalar(value: f64) -> Self {
        Tensor::Matrix(DMatrix::from_element(1, 1, value))
    }

    pub fn identity(n: usize) -> Self {
        Tensor::Matrix(DMatrix::identity(n, n))
    }

    pub fn from_element(rows: usize, cols: usize, value: f64) -> Self {
        Tensor::Matrix(DMatrix::from_element(rows, cols, value))
    }

    /// Batch of matrices; all members must share one shape
    pub fn batch(mats: Vec<DMatrix<f64>>) -> Result<Self> {
        let t = Tensor::Batch(mats);
        t.validate()?;
        Ok(t)
    }

    /// Shape of the tensor, taken from the first batch member
    pub fn shape(&self) -> Shape {
        match self {
            Tensor::Matrix(m) => Shape::matrix(m.nrows(), m.ncols()),
            Tensor::Batch(mats) => match mats.first() {
                Some(m) => Shape::batch(mats.len(), m.nrows(), m.ncols()),
                None => Shape::batch(0, 0, 0),
            },
        }
    }

    /// Check that a batch is non-empty and not ragged
    pub fn validate(&self) -> Result<Shape> {
        if let Tensor::Batch(mats) = self {
            let first = mats
                .first()
                .ok_or_else(|| Error::InvalidInput("empty tensor batch".to_string()))?;
            for m in mats.iter().skip(1) {
                if m.shape() != first.shape() {
                    return Err(Error::shape_mismatch(
                        Shape::matrix(first.nrows(), first.ncols()),
                        Shape::matrix(m.nrows(), m.ncols()),
                        "tensor batch",
                    ));
                }
            }
        }
        Ok(self.shape())
    }

    pub fn as_matrix(&self) -> Option<&DMatrix<f64>> {
        match self {
            Tensor::Matrix(m) => Some(m),
            Tensor::Batch(_) => None,
        }
    }

    /// Value of a `1 x 1` matrix
    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            Tensor::Matrix(m) if m.nrows() == 1 && m.ncols() == 1 => Some(m[(0, 0)]),
            _ => None,
        }
    }

    /// Elementwise map over every batch member
    pub fn map_matrices<F>(&self, f: F) -> Tensor
    where
        F: Fn(&DMatrix<f64>) -> DMatrix<f64>,
    {
        match self {
            Tensor::Matrix(m) => Tensor::Matrix(f(m)),
            Tensor::Batch(mats) => Tensor::Batch(mats.iter().map(f).collect()),
        }
    }

    /// Pair up matrices of two tensors, broadcasting a plain matrix over a batch
    fn zip_with<F>(&self, other: &Tensor, context: &str, f: F) -> Result<Tensor>
    where
        F: Fn(&DMatrix<f64>, &DMatrix<f64>) -> Result<DMatrix<f64>>,
    {
        match (self, other) {
            (Tensor::Matrix(a), Tensor::Matrix(b)) => Ok(Tensor::Matrix(f(a, b)?)),
            (Tensor::Batch(a), Tensor::Matrix(b)) => a
                .iter()
                .map(|a| f(a, b))
                .collect::<Result<Vec<_>>>()
                .map(Tensor::Batch),
            (Tensor::Matrix(a), Tensor::Batch(b)) => b
                .iter()
                .map(|b| f(a, b))
                .collect::<Result<Vec<_>>>()
                .map(Tensor::Batch),
            (Tensor::Batch(a), Tensor::Batch(b)) => {
                if a.len() != b.len() {
                    return Err(Error::shape_mismatch(self.shape(), other.shape(), context));
                }
                a.iter()
                    .zip(b)
                    .map(|(a, b)| f(a, b))
                    .collect::<Result<Vec<_>>>()
                    .map(Tensor::Batch)
            }
        }
    }

    /// Elementwise sum; shapes must agree exactly
    pub fn try_add(&self, other: &Tensor) -> Result<Tensor> {
        if self.shape() != other.shape() {
            return Err(Error::shape_mismatch(self.shape(), other.shape(), "tensor addition"));
        }
        self.zip_with(other, "tensor addition", |a, b| Ok(a + b))
    }

    /// Sum an ordered sequence of tensors, left to right
    pub fn sum_all<I>(tensors: I) -> Result<Tensor>
    where
        I: IntoIterator<Item = Tensor>,
    {
        let mut iter = tensors.into_iter();
        let first = iter
            .next()
            .ok_or_else(|| Error::InvalidInput("cannot sum an empty list of tensors".to_string()))?;
        iter.try_fold(first, |acc, t| acc.try_add(&t))
    }

    /// Matrix product with batch broadcasting
    pub fn matmul(&self, rhs: &Tensor) -> Result<Tensor> {
        let (lhs_shape, rhs_shape) = (self.shape(), rhs.shape());
        self.zip_with(rhs, "matmul", |a, b| {
            if a.ncols() != b.nrows() {
                return Err(Error::shape_mismatch(lhs_shape, rhs_shape, "matmul"));
            }
            Ok(a * b)
        })
    }

    pub fn transpose(&self) -> Tensor {
        self.map_matrices(|m| m.transpose())
    }

    /// Diagonal as an `n x 1` column (per batch member)
    pub fn diagonal(&self) -> Result<Tensor> {
        let shape = self.shape();
        if !shape.is_square() {
            return Err(Error::InvalidInput(format!(
                "diagonal requires a square tensor, got {shape}"
            )));
        }
        Ok(self.map_matrices(|m| DMatrix::from_fn(m.nrows(), 1, |i, _| m[(i, i)])))
    }

    /// Add `value` to every diagonal entry
    pub fn add_diagonal(&self, value: f64) -> Result<Tensor> {
        let shape = self.shape();
        if !shape.is_square() {
            return Err(Error::InvalidInput(format!(
                "diagonal shift requires a square tensor, got {shape}"
            )));
        }
        Ok(self.map_matrices(|m| {
            let mut out = m.clone();
            for i in 0..out.nrows() {
                out[(i, i)] += value;
            }
            out
        }))
    }

    /// Treat `self` as a diagonal column and scale the rows of `rhs` by it
    pub fn scale_rows(&self, rhs: &Tensor) -> Result<Tensor> {
        let (diag_shape, rhs_shape) = (self.shape(), rhs.shape());
        self.zip_with(rhs, "diagonal matmul", |d, r| {
            if d.ncols() != 1 || d.nrows() != r.nrows() {
                return Err(Error::shape_mismatch(diag_shape, rhs_shape, "diagonal matmul"));
            }
            Ok(DMatrix::from_fn(r.nrows(), r.ncols(), |i, j| d[(i, 0)] * r[(i, j)]))
        })
    }

    /// Row-wise inner products of two equally shaped tensors, as an `n x 1` column
    pub fn row_dots(&self, other: &Tensor) -> Result<Tensor> {
        let (lhs_shape, rhs_shape) = (self.shape(), other.shape());
        self.zip_with(other, "row dot", |a, b| {
            if a.shape() != b.shape() {
                return Err(Error::shape_mismatch(lhs_shape, rhs_shape, "row dot"));
            }
            Ok(DMatrix::from_fn(a.nrows(), 1, |i, _| a.row(i).dot(&b.row(i))))
        })
    }

    /// Collapse the batch dimension
    ///
    /// `None` sums the whole batch into one matrix. `Some(k)` sums consecutive
    /// groups of `k` members and keeps the result batched.
    pub fn sum_batch(&self, group: Option<usize>) -> Result<Tensor> {
        let mats = match self {
            Tensor::Batch(mats) => mats,
            Tensor::Matrix(_) => {
                return Err(Error::InvalidInput(
                    "sum_batch requires a batched tensor".to_string(),
                ))
            }
        };
        let shape = self.validate()?;
        let add_all = |chunk: &[DMatrix<f64>]| {
            chunk
                .iter()
                .skip(1)
                .fold(chunk[0].clone(), |acc, m| acc + m)
        };
        match group {
            None => Ok(Tensor::Matrix(add_all(mats))),
            Some(0) => Err(Error::InvalidInput("sum_batch group size must be positive".to_string())),
            Some(k) if mats.len() % k != 0 => Err(Error::InvalidInput(format!(
                "batch of {} cannot be summed in groups of {k} ({shape})",
                mats.len()
            ))),
            Some(k) => Ok(Tensor::Batch(mats.chunks(k).map(add_all).collect())),
        }
    }

    /// Batch member `index`
    pub fn batch_item(&self, index: usize) -> Result<Tensor> {
        match self {
            Tensor::Batch(mats) => mats
                .get(index)
                .cloned()
                .map(Tensor::Matrix)
                .ok_or_else(|| Error::out_of_bounds(index, mats.len(), "batch index")),
            Tensor::Matrix(_) => Err(Error::InvalidSelector(
                "batch selection on a non-batched tensor".to_string(),
            )),
        }
    }

    /// Single entry, `batch` must be given exactly when the tensor is batched
    pub fn entry(&self, batch: Option<usize>, row: usize, col: usize) -> Result<f64> {
        let m = match (self, batch) {
            (Tensor::Matrix(m), None) => m,
            (Tensor::Batch(mats), Some(b)) => mats
                .get(b)
                .ok_or_else(|| Error::out_of_bounds(b, mats.len(), "batch index"))?,
            (Tensor::Matrix(_), Some(_)) => {
                return Err(Error::InvalidInput(
                    "batch index given for a non-batched tensor".to_string(),
                ))
            }
            (Tensor::Batch(_), None) => {
                return Err(Error::InvalidInput(
                    "batch index required for a batched tensor".to_string(),
                ))
            }
        };
        if row >= m.nrows() {
            return Err(Error::out_of_bounds(row, m.nrows(), "row index"));
        }
        if col >= m.ncols() {
            return Err(Error::out_of_bounds(col, m.ncols(), "column index"));
        }
        Ok(m[(row, col)])
    }

    /// Entries at paired `(batch, left, right)` indices, as an `n x 1` column
    pub fn gather(&self, batch: Option<&[usize]>, left: &[usize], right: &[usize]) -> Result<Tensor> {
        check_index_lists(batch, left, right)?;
        let values = (0..left.len())
            .map(|k| self.entry(batch.map(|b| b[k]), left[k], right[k]))
            .collect::<Result<Vec<_>>>()?;
        Ok(Tensor::column(&values))
    }

    /// Contiguous sub-block of every batch member
    pub fn block(&self, rows: Range<usize>, cols: Range<usize>) -> Result<Tensor> {
        let shape = self.shape();
        if rows.start >= rows.end || rows.end > shape.rows {
            return Err(Error::InvalidSelector(format!(
                "row range {rows:?} invalid for {shape}"
            )));
        }
        if cols.start >= cols.end || cols.end > shape.cols {
            return Err(Error::InvalidSelector(format!(
                "column range {cols:?} invalid for {shape}"
            )));
        }
        Ok(self.map_matrices(|m| {
            DMatrix::from_fn(rows.len(), cols.len(), |i, j| {
                m[(rows.start + i, cols.start + j)]
            })
        }))
    }

    /// Largest absolute elementwise difference, `None` if shapes differ
    pub fn max_abs_diff(&self, other: &Tensor) -> Option<f64> {
        if self.shape() != other.shape() {
            return None;
        }
        let pairs: Vec<(&DMatrix<f64>, &DMatrix<f64>)> = match (self, other) {
            (Tensor::Matrix(a), Tensor::Matrix(b)) => vec![(a, b)],
            (Tensor::Batch(a), Tensor::Batch(b)) => a.iter().zip(b).collect(),
            _ => return None,
        };
        Some(
            pairs
                .into_iter()
                .flat_map(|(a, b)| a.iter().zip(b.iter()).map(|(x, y)| (x - y).abs()))
                .fold(0.0, f64::max),
        )
    }
}

/// Paired index lists must have equal length
pub fn check_index_lists(batch: Option<&[usize]>, left: &[usize], right: &[usize]) -> Result<()> {
    if left.len() != right.len() {
        return Err(Error::InvalidInput(format!(
            "left and right index lists differ in length ({} vs {})",
            left.len(),
            right.len()
        )));
    }
    if let Some(b) = batch {
        if b.len() != left.len() {
            return Err(Error::InvalidInput(format!(
                "batch index list has length {}, expected {}",
                b.len(),
                left.len()
            )));
        }
    }
    Ok(())
}
