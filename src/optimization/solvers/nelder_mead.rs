use super::argmin_adapter::VectorCost;
use super::traits::{Problem, Solver, SolverResult};
use crate::error::{OptimizerError, Result};
use crate::optimization::callback::ProgressObserver;
use argmin::core::observers::ObserverMode;
use argmin::core::{Executor, State, TerminationReason, TerminationStatus};
use argmin::solver::neldermead::NelderMead;

/// Relative step used to span the initial simplex.
const SIMPLEX_STEP: f64 = 0.05;
/// Absolute step for coordinates starting at zero.
const SIMPLEX_ZERO_STEP: f64 = 0.00025;

/// Derivative-free simplex search; the default for both modes.
pub struct NelderMeadOptimizer {
    max_iter: u64,
    tolerance: f64,
}

impl NelderMeadOptimizer {
    pub fn new(max_iter: u64, tolerance: f64) -> Self {
        Self {
            max_iter,
            tolerance,
        }
    }

    /// `x0` plus one vertex per coordinate, nudged along that axis.
    pub fn initial_simplex(x0: &[f64]) -> Vec<Vec<f64>> {
        let mut simplex = Vec::with_capacity(x0.len() + 1);
        simplex.push(x0.to_vec());
        for i in 0..x0.len() {
            let mut vertex = x0.to_vec();
            vertex[i] = if vertex[i] != 0.0 {
                vertex[i] * (1.0 + SIMPLEX_STEP)
            } else {
                SIMPLEX_ZERO_STEP
            };
            simplex.push(vertex);
        }
        simplex
    }
}

impl Solver for NelderMeadOptimizer {
    fn name(&self) -> &str {
        "nelder-mead"
    }

    fn solve(&mut self, problem: &dyn Problem) -> Result<SolverResult> {
        let x0 = problem.initial_params().to_vec();
        let max_iter = self.max_iter;

        let solver = NelderMead::new(Self::initial_simplex(&x0))
            .with_sd_tolerance(self.tolerance)
            .map_err(OptimizerError::from_solver)?;

        let res = Executor::new(VectorCost { problem }, solver)
            .configure(|state| state.max_iters(max_iter))
            .add_observer(ProgressObserver::new(self.name()), ObserverMode::Always)
            .run()
            .map_err(OptimizerError::from_solver)?;

        let state = res.state();
        let termination = state.get_termination_status();
        let success = matches!(
            termination,
            TerminationStatus::Terminated(TerminationReason::SolverConverged)
                | TerminationStatus::Terminated(TerminationReason::TargetCostReached)
        );

        Ok(SolverResult {
            success,
            cost: state.get_best_cost(),
            iterations: state.get_iter(),
            message: termination.to_string(),
            params: state.get_best_param().cloned().unwrap_or(x0),
        })
    }
}
