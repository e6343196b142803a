//! Addition starting from any operator handle

use crate::SumOperator;
use covar_core::{Operand, Operator, OperatorConfig, Result};

/// Start (or extend) a sum from an [`Operator`]
///
/// If the operator already is a sum it is extended, otherwise a new
/// two-child sum is built. Both sides are flattened.
pub trait SumExt {
    fn plus(&self, other: impl Into<Operand>) -> Result<SumOperator>;
}

impl SumExt for Operator {
    fn plus(&self, other: impl Into<Operand>) -> Result<SumOperator> {
        match self.downcast_ref::<SumOperator>() {
            Some(sum) => sum.try_add(other),
            None => {
                SumOperator::from_children(vec![self.clone()], OperatorConfig::default())?
                    .try_add(other)
            }
        }
    }
}
