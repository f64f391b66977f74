use crate::error::Result;

#[derive(Clone, Debug)]
pub struct SolverResult {
    pub success: bool,
    pub cost: f64,
    pub iterations: u64,
    pub message: String,
    pub params: Vec<f64>,
}

/// Objective seen by a solver: a scalar function of a plain `f64` vector.
pub trait Problem {
    /// Evaluate cost for given parameters (may run the external program)
    fn cost(&self, params: &[f64]) -> Result<f64>;

    /// Number of parameters
    fn num_params(&self) -> usize;

    /// Starting point of the search
    fn initial_params(&self) -> &[f64];

    /// Parameter bounds (min, max) for each parameter. Advisory unless a
    /// solver or adapter enforces them.
    fn bounds(&self) -> &[(f64, f64)];
}

/// Search procedure driving a [`Problem`]. Treats the problem as a black box.
pub trait Solver {
    fn name(&self) -> &str;

    /// True when the solver locates a zero of the cost itself rather than
    /// a minimum.
    fn is_root_finder(&self) -> bool {
        false
    }

    fn solve(&mut self, problem: &dyn Problem) -> Result<SolverResult>;
}
