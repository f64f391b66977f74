use super::argmin_adapter::ScalarCost;
use super::traits::{Problem, Solver, SolverResult};
use crate::error::{OptimizerError, Result};
use crate::optimization::callback::ProgressObserver;
use argmin::core::observers::ObserverMode;
use argmin::core::{Executor, State, TerminationReason, TerminationStatus};
use argmin::solver::brent::BrentRoot;

/// Bracket width, relative to the run tolerance, at which the search stops.
/// The run tolerance bounds `|f|`, so the bracket has to be much narrower
/// for steep functions to meet it.
const BRACKET_TOLERANCE_SCALE: f64 = 1e-6;

/// Bracketing root finder for a single parameter over its bounds.
///
/// The program's output must change sign between the lower and upper
/// bound of the parameter.
pub struct BrentRootFinder {
    max_iter: u64,
    tolerance: f64,
}

impl BrentRootFinder {
    pub fn new(max_iter: u64, tolerance: f64) -> Self {
        Self {
            max_iter,
            tolerance,
        }
    }
}

impl Solver for BrentRootFinder {
    fn name(&self) -> &str {
        "brent"
    }

    fn is_root_finder(&self) -> bool {
        true
    }

    fn solve(&mut self, problem: &dyn Problem) -> Result<SolverResult> {
        let &[(min, max)] = problem.bounds() else {
            return Err(OptimizerError::InvalidConfig(format!(
                "brent root finding needs exactly one parameter, got {}",
                problem.num_params()
            )));
        };
        let max_iter = self.max_iter;

        let solver = BrentRoot::new(min, max, self.tolerance * BRACKET_TOLERANCE_SCALE);
        let res = Executor::new(ScalarCost { problem }, solver)
            .configure(|state| state.max_iters(max_iter))
            .add_observer(ProgressObserver::new(self.name()), ObserverMode::Always)
            .run()
            .map_err(OptimizerError::from_solver)?;

        let state = res.state();
        let termination = state.get_termination_status();
        // best_param tracks the lowest signed cost; the root is the last iterate
        let root = state.get_param().copied().unwrap_or((min + max) / 2.0);

        Ok(SolverResult {
            success: matches!(
                termination,
                TerminationStatus::Terminated(TerminationReason::SolverConverged)
                    | TerminationStatus::Terminated(TerminationReason::TargetCostReached)
            ),
            cost: state.get_cost(),
            iterations: state.get_iter(),
            message: termination.to_string(),
            params: vec![root],
        })
    }
}
