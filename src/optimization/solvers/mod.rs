mod argmin_adapter;
mod brent;
mod nelder_mead;
pub mod traits;

pub use brent::BrentRootFinder;
pub use nelder_mead::NelderMeadOptimizer;
pub use traits::{Problem, Solver, SolverResult};

use crate::core::OptimizationMode;
use crate::error::{OptimizerError, Result};

pub const DEFAULT_MINIMIZATION_SOLVER: &str = "nelder-mead";
pub const DEFAULT_ROOT_SOLVER: &str = "nelder-mead";

/// Build the solver named `name` for `mode`.
///
/// `nelder-mead` serves both modes (root mode minimizes `|f|`); `brent`
/// brackets a true zero and is only available for a single parameter in
/// root mode.
pub fn select_solver(
    mode: OptimizationMode,
    name: &str,
    num_params: usize,
    max_iterations: u64,
    tolerance: f64,
) -> Result<Box<dyn Solver>> {
    let unknown = || OptimizerError::UnknownSolver {
        name: name.to_string(),
        mode: mode.to_string(),
    };

    match (name.to_ascii_lowercase().as_str(), mode) {
        ("nelder-mead" | "neldermead" | "nelder_mead", _) => {
            Ok(Box::new(NelderMeadOptimizer::new(max_iterations, tolerance)))
        }
        ("brent", OptimizationMode::Root) if num_params == 1 => {
            Ok(Box::new(BrentRootFinder::new(max_iterations, tolerance)))
        }
        ("brent", OptimizationMode::Root) => Err(OptimizerError::InvalidConfig(format!(
            "solver 'brent' needs exactly one parameter, got {num_params}"
        ))),
        _ => Err(unknown()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn picks_solvers_by_name() {
        let nm = select_solver(OptimizationMode::Minimum, "Nelder-Mead", 3, 100, 1e-4).unwrap();
        assert_eq!(nm.name(), "nelder-mead");

        let brent = select_solver(OptimizationMode::Root, "brent", 1, 100, 1e-4).unwrap();
        assert_eq!(brent.name(), "brent");
    }

    #[test]
    fn rejects_unusable_combinations() {
        assert!(matches!(
            select_solver(OptimizationMode::Minimum, "brent", 1, 100, 1e-4),
            Err(OptimizerError::UnknownSolver { .. })
        ));
        assert!(matches!(
            select_solver(OptimizationMode::Root, "brent", 2, 100, 1e-4),
            Err(OptimizerError::InvalidConfig(_))
        ));
        assert!(matches!(
            select_solver(OptimizationMode::Minimum, "hybr", 2, 100, 1e-4),
            Err(OptimizerError::UnknownSolver { .. })
        ));
    }
}
