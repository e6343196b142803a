//! Tests for redistributing flattened representations to children
//!
//! Aggregate outputs can hide a slicing bug that corrupts one child while the
//! others stay correct, so these tests look at every child's slice.

mod common;

use common::*;
use covar_core::representation::partition;
use covar_core::{
    DiagOperator, Error, ExecutionStrategy, LazyOperator, Operator, OperatorConfig, Tensor,
};
use covar_sum::SumOperator;
use std::sync::Arc;

fn mixed_children() -> Vec<Operator> {
    vec![
        scaled(2, 2, &[1.0, 2.0, 3.0, 4.0], 0.5),
        dense(2, 2, &[0.0, 1.0, 1.0, 0.0]),
        Arc::new(DiagOperator::new(&[3.0, 7.0])),
        scaled(2, 2, &[2.0, 0.0, 0.0, 2.0], 3.0),
    ]
}

fn mixed_sum() -> SumOperator {
    SumOperator::new(mixed_children().iter()).unwrap()
}

#[test]
fn test_representation_is_concatenation_of_children() {
    let sum = mixed_sum();
    let repr = sum.representation();
    let lengths: Vec<usize> = sum.children().iter().map(|c| c.representation_len()).collect();

    assert_eq!(lengths, vec![2, 1, 1, 2]);
    assert_eq!(sum.representation_len(), 6);
    assert_eq!(repr.len(), 6);

    let expected: Vec<Tensor> = sum
        .children()
        .iter()
        .flat_map(|c| c.representation())
        .collect();
    assert_eq!(repr, expected);
}

#[test]
fn test_slices_reproduce_standalone_child_closures() {
    let sum = mixed_sum();
    let repr = sum.representation();
    let rhs = Tensor::from_row_slice(2, 3, &[1.0, -1.0, 0.5, 2.0, 0.0, 1.5]);

    let slices = partition(sum.children(), &repr).unwrap();
    for (child, slice) in sum.children().iter().zip(slices) {
        let from_slice = child.matmul_closure_factory(slice).unwrap()(&rhs).unwrap();
        let standalone = child.matmul(&rhs).unwrap();
        assert_tensor_close(&from_slice, &standalone);
    }
}

#[test]
fn test_perturbing_one_slice_only_changes_that_child() {
    let sum = mixed_sum();
    let rhs = Tensor::column(&[1.0, 1.0]);
    let baseline = sum.matmul(&rhs).unwrap();

    // Index 3 is the diagonal of the third child: offsets are [0, 2, 3, 4]
    let mut repr = sum.representation();
    repr[3] = Tensor::column(&[13.0, 17.0]);
    let perturbed = sum.matmul_closure_factory(&repr).unwrap()(&rhs).unwrap();

    let delta = Tensor::column(&[10.0, 10.0]);
    assert_tensor_close(&perturbed, &baseline.try_add(&delta).unwrap());

    // Index 5 is the scale of the last child
    let mut repr = sum.representation();
    repr[5] = Tensor::scalar(0.0);
    let without_last = sum.matmul_closure_factory(&repr).unwrap()(&rhs).unwrap();
    let last = sum.children()[3].matmul(&rhs).unwrap();
    assert_tensor_close(&without_last.try_add(&last).unwrap(), &baseline);
}

#[test]
fn test_gradient_tuple_follows_representation_order() {
    let sum = mixed_sum();
    let repr = sum.representation();
    let left = Tensor::from_row_slice(2, 2, &[1.0, 0.5, -1.0, 2.0]);
    let right = Tensor::from_row_slice(2, 2, &[0.25, 1.0, 3.0, -0.5]);

    let grads = sum.derivative_quad_form_factory(&repr).unwrap()(&left, &right).unwrap();
    assert_eq!(grads.len(), repr.len());

    let mut offset = 0;
    for child in sum.children() {
        let own = child
            .derivative_quad_form_factory(&child.representation())
            .unwrap()(&left, &right)
            .unwrap();
        for (k, g) in own.iter().enumerate() {
            assert_tensor_close(&grads[offset + k], g);
            // Gradients have the shape of the element they belong to
            assert_eq!(grads[offset + k].shape(), repr[offset + k].shape());
        }
        offset += own.len();
    }
    assert_eq!(offset, grads.len());
}

#[test]
fn test_two_leaf_gradient_order() {
    let a = dense(2, 2, &[1.0, 0.0, 0.0, 1.0]);
    let b: Operator = Arc::new(DiagOperator::new(&[2.0, 2.0]));
    let sum = SumOperator::new([&a, &b]).unwrap();

    let left = Tensor::column(&[1.0, 2.0]);
    let right = Tensor::column(&[3.0, 5.0]);
    let grads = sum
        .derivative_quad_form_factory(&sum.representation())
        .unwrap()(&left, &right)
        .unwrap();

    let grad_a = a.derivative_quad_form_factory(&a.representation()).unwrap()(&left, &right)
        .unwrap();
    let grad_b = b.derivative_quad_form_factory(&b.representation()).unwrap()(&left, &right)
        .unwrap();

    assert_eq!(grads.len(), 2);
    assert_eq!(grads[0], grad_a[0]);
    assert_eq!(grads[1], grad_b[0]);
    assert_eq!(grads[1], Tensor::column(&[3.0, 10.0]));
}

#[test]
fn test_nested_sum_slices_recursively() {
    let inner = SumOperator::new(mixed_children()[..2].iter()).unwrap();
    let outer = SumOperator::new([
        covar_core::Operand::from(inner),
        covar_core::Operand::from(&mixed_children()[2]),
    ])
    .unwrap();
    // Explicit construction keeps the nested sum as one child
    assert_eq!(outer.num_children(), 2);
    assert_eq!(outer.representation_len(), 4);

    let rhs = Tensor::column(&[1.0, -2.0]);
    let expected = Tensor::sum_all(
        mixed_children()[..3]
            .iter()
            .map(|c| c.matmul(&rhs).unwrap()),
    )
    .unwrap();
    assert_tensor_close(&outer.matmul(&rhs).unwrap(), &expected);

    let grads = outer
        .derivative_quad_form_factory(&outer.representation())
        .unwrap()(&rhs, &rhs)
        .unwrap();
    assert_eq!(grads.len(), 4);
}

#[test]
fn test_short_argument_list_is_rejected() {
    let sum = mixed_sum();
    let repr = sum.representation();
    match sum.matmul_closure_factory(&repr[..5]) {
        Err(Error::RepresentationLengthMismatch { expected, actual }) => {
            assert_eq!(expected, 6);
            assert_eq!(actual, 5);
        }
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("short argument list accepted"),
    }
}

#[test]
fn test_parallel_strategy_matches_sequential() {
    let parallel = OperatorConfig::default().with_strategy(ExecutionStrategy::Parallel);
    let par_sum = SumOperator::with_config(mixed_children().iter(), parallel).unwrap();
    let seq_sum = mixed_sum();

    let rhs = Tensor::from_row_slice(2, 2, &[1.0, 2.0, 3.0, 4.0]);
    assert_eq!(par_sum.matmul(&rhs).unwrap(), seq_sum.matmul(&rhs).unwrap());

    let par_grads = par_sum
        .derivative_quad_form_factory(&par_sum.representation())
        .unwrap()(&rhs, &rhs)
        .unwrap();
    let seq_grads = seq_sum
        .derivative_quad_form_factory(&seq_sum.representation())
        .unwrap()(&rhs, &rhs)
        .unwrap();
    assert_eq!(par_grads, seq_grads);
}
