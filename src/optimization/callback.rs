use argmin::core::observers::Observe;
use argmin::core::{Error, KV, State};
use tracing::info;

/// Logs solver progress once per iteration.
pub struct ProgressObserver {
    solver: String,
}

impl ProgressObserver {
    pub fn new(solver: impl Into<String>) -> Self {
        Self {
            solver: solver.into(),
        }
    }
}

impl<I> Observe<I> for ProgressObserver
where
    I: State<Float = f64>,
{
    fn observe_iter(&mut self, state: &I, _kv: &KV) -> Result<(), Error> {
        info!(
            solver = %self.solver,
            iteration = state.get_iter(),
            cost = state.get_cost(),
            best = state.get_best_cost(),
            "solver iteration"
        );
        Ok(())
    }
}
