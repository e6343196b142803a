//! Representation flattening and slicing for composite operators
//!
//! A composite's representation is the concatenation of its children's
//! representations, in child order. Closure factories receive that flattened
//! list and must hand each child exactly its own slice. All offset
//! bookkeeping lives here.

use crate::tensor::Tensor;
use crate::traits::Operator;
use crate::{Error, Result};
use tracing::trace;

/// Concatenate the children's representations in child order
pub fn flatten(children: &[Operator]) -> Vec<Tensor> {
    children
        .iter()
        .flat_map(|child| child.representation())
        .collect()
}

/// Sum of the children's representation lengths
pub fn total_len(children: &[Operator]) -> usize {
    children.iter().map(|child| child.representation_len()).sum()
}

/// Split a flattened argument list into one slice per child
///
/// Child `k` receives `args[offset_k .. offset_k + len_k]` where `len_k` is
/// its `representation_len()`. The lengths must account for `args` exactly.
pub fn partition<'a>(children: &[Operator], args: &'a [Tensor]) -> Result<Vec<&'a [Tensor]>> {
    let lengths: Vec<usize> = children
        .iter()
        .map(|child| child.representation_len())
        .collect();
    let expected: usize = lengths.iter().sum();
    if expected != args.len() {
        return Err(Error::RepresentationLengthMismatch {
            expected,
            actual: args.len(),
        });
    }

    let mut slices = Vec::with_capacity(children.len());
    let mut offset = 0;
    for (child, len) in children.iter().zip(lengths) {
        trace!(child = child.name(), offset, len, "representation slice");
        slices.push(&args[offset..offset + len]);
        offset += len;
    }
    Ok(slices)
}

/// Check that a leaf received exactly `expected` representation tensors
pub fn expect_len(repr: &[Tensor], expected: usize) -> Result<()> {
    if repr.len() != expected {
        return Err(Error::RepresentationLengthMismatch {
            expected,
            actual: repr.len(),
        });
    }
    Ok(())
}
