use super::solvers::traits::Problem;
use crate::cache::ResultCache;
use crate::core::{ParameterSpec, ParameterVector, values_of, with_values};
use crate::error::{OptimizerError, Result};
use crate::evaluation::{ExternalEvaluator, format_value};
use std::cell::{Cell, RefCell};
use tracing::info;

/// Counters for one run of the evaluation function.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EvaluationStats {
    /// Calls made by the solver
    pub calls: usize,
    /// Calls answered from the cache
    pub cache_hits: usize,
    /// Calls that ran the external program
    pub evaluations: usize,
}

/// The objective handed to the solver.
///
/// Turns a plain vector into a parameter vector, answers from the cache
/// when it can, and otherwise runs the external program and records the
/// result before returning it. Bounds are not enforced here.
pub struct EvaluationFunction {
    parameters: ParameterVector,
    initial: Vec<f64>,
    bounds: Vec<(f64, f64)>,
    evaluator: ExternalEvaluator,
    cache: Option<RefCell<ResultCache>>,
    stats: Cell<EvaluationStats>,
    /// Point whose result was closest to zero, with that signed result
    closest_to_zero: RefCell<Option<(Vec<f64>, f64)>>,
}

impl EvaluationFunction {
    pub fn new(
        parameters: ParameterVector,
        evaluator: ExternalEvaluator,
        cache: Option<ResultCache>,
    ) -> Self {
        let initial = values_of(&parameters);
        let bounds = parameters.iter().map(ParameterSpec::bounds).collect();
        Self {
            parameters,
            initial,
            bounds,
            evaluator,
            cache: cache.map(RefCell::new),
            stats: Cell::new(EvaluationStats::default()),
            closest_to_zero: RefCell::new(None),
        }
    }

    pub fn stats(&self) -> EvaluationStats {
        self.stats.get()
    }

    /// Signed program result at `x`.
    ///
    /// Answered without a new call when `x` is the point whose result was
    /// closest to zero so far, which is where a root search ends.
    pub fn value_at(&self, x: &[f64]) -> Result<f64> {
        let known = self
            .closest_to_zero
            .borrow()
            .as_ref()
            .filter(|(point, _)| point.as_slice() == x)
            .map(|&(_, value)| value);
        match known {
            Some(value) => Ok(value),
            None => self.call(x),
        }
    }

    /// Evaluate the program at `x`, positionally matched to the parameters.
    pub fn call(&self, x: &[f64]) -> Result<f64> {
        if x.len() != self.parameters.len() {
            return Err(OptimizerError::Solver(format!(
                "expected {} values, got {}",
                self.parameters.len(),
                x.len()
            )));
        }
        let proposal = with_values(&self.parameters, x);
        let program = self.evaluator.command();
        self.bump(|s| s.calls += 1);

        if let Some(cache) = &self.cache {
            let hit = cache.borrow().lookup(program, &proposal)?;
            if let Some(value) = hit {
                self.bump(|s| s.cache_hits += 1);
                self.remember(x, value);
                return Ok(value);
            }
        }

        log_proposal(&proposal);
        let value = self.evaluator.evaluate(&proposal)?;
        self.bump(|s| s.evaluations += 1);

        if let Some(cache) = &self.cache {
            let mut cache = cache.borrow_mut();
            cache.store(program, &proposal, value)?;
            cache.persist()?;
        }

        self.remember(x, value);
        Ok(value)
    }

    /// Rewrite the parameter file for `x` without running the program.
    pub fn write_parameter_file(&self, x: &[f64]) -> Result<ParameterVector> {
        let parameters = with_values(&self.parameters, x);
        self.evaluator
            .writer()
            .write(self.evaluator.parameter_file(), &parameters)?;
        Ok(parameters)
    }

    fn remember(&self, x: &[f64], value: f64) {
        let mut closest = self.closest_to_zero.borrow_mut();
        if closest.as_ref().is_none_or(|&(_, best)| value.abs() < best.abs()) {
            *closest = Some((x.to_vec(), value));
        }
    }

    fn bump(&self, update: impl FnOnce(&mut EvaluationStats)) {
        let mut stats = self.stats.get();
        update(&mut stats);
        self.stats.set(stats);
    }
}

fn log_proposal(parameters: &[ParameterSpec]) {
    info!("running program with parameters:");
    for p in parameters {
        info!(
            "{:<20} = {} [ {}, {} ]",
            p.name(),
            format_value(p.value()),
            format_value(p.min()),
            format_value(p.max())
        );
    }
}

impl Problem for EvaluationFunction {
    fn cost(&self, params: &[f64]) -> Result<f64> {
        self.call(params)
    }

    fn num_params(&self) -> usize {
        self.parameters.len()
    }

    fn initial_params(&self) -> &[f64] {
        &self.initial
    }

    fn bounds(&self) -> &[(f64, f64)] {
        &self.bounds
    }
}

/// Root search by minimization: `|f(x)|` with `x` clamped into the bounds.
pub struct BoundedMagnitude<'a> {
    inner: &'a dyn Problem,
}

impl<'a> BoundedMagnitude<'a> {
    pub fn new(inner: &'a dyn Problem) -> Self {
        Self { inner }
    }

    pub fn clamp(&self, params: &[f64]) -> Vec<f64> {
        params
            .iter()
            .zip(self.inner.bounds())
            .map(|(&x, &(min, max))| x.clamp(min, max))
            .collect()
    }
}

impl Problem for BoundedMagnitude<'_> {
    fn cost(&self, params: &[f64]) -> Result<f64> {
        Ok(self.inner.cost(&self.clamp(params))?.abs())
    }

    fn num_params(&self) -> usize {
        self.inner.num_params()
    }

    fn initial_params(&self) -> &[f64] {
        self.inner.initial_params()
    }

    fn bounds(&self) -> &[(f64, f64)] {
        self.inner.bounds()
    }
}
