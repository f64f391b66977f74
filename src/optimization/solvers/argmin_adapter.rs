use super::traits::Problem;
use argmin::core::{CostFunction, Error};

/// Exposes a [`Problem`] to argmin's executor over `Vec<f64>`.
pub(crate) struct VectorCost<'a> {
    pub problem: &'a dyn Problem,
}

impl CostFunction for VectorCost<'_> {
    type Param = Vec<f64>;
    type Output = f64;

    fn cost(&self, param: &Self::Param) -> Result<Self::Output, Error> {
        Ok(self.problem.cost(param)?)
    }
}

/// Exposes a single-parameter [`Problem`] as a scalar function.
pub(crate) struct ScalarCost<'a> {
    pub problem: &'a dyn Problem,
}

impl CostFunction for ScalarCost<'_> {
    type Param = f64;
    type Output = f64;

    fn cost(&self, param: &Self::Param) -> Result<Self::Output, Error> {
        Ok(self.problem.cost(&[*param])?)
    }
}
