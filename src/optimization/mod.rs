pub mod callback;
pub mod problem;
pub mod solvers;

pub use callback::ProgressObserver;
pub use problem::{BoundedMagnitude, EvaluationFunction, EvaluationStats};
pub use solvers::{
    BrentRootFinder, DEFAULT_MINIMIZATION_SOLVER, DEFAULT_ROOT_SOLVER, NelderMeadOptimizer,
    Problem, Solver, SolverResult, select_solver,
};
