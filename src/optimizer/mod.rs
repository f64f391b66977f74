use crate::cache::ResultCache;
use crate::config::RunConfig;
use crate::core::{OptimizationMode, OptimizationResult};
use crate::error::{OptimizerError, Result};
use crate::evaluation::{ExternalEvaluator, format_value};
use crate::optimization::{BoundedMagnitude, EvaluationFunction, SolverResult, select_solver};
use std::fs;
use tracing::{info, warn};

/// Runs one optimization of the external program described by a [`RunConfig`].
pub struct Optimizer {
    config: RunConfig,
}

impl Optimizer {
    pub fn new(config: RunConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Search, then leave the parameter file holding the reported optimum.
    pub fn run(&self) -> Result<OptimizationResult> {
        let config = &self.config;
        info!(
            mode = %config.mode,
            solver = config.solver_name(),
            tolerance = config.tolerance,
            parameters = config.parameters.len(),
            command = %config.program_command,
            "starting optimization"
        );

        let cache = config
            .cache_file
            .as_ref()
            .map(|path| ResultCache::open(path, config.cache_tolerance, &config.parameters))
            .transpose()?;

        let evaluator = ExternalEvaluator::new(
            config.program_command.clone(),
            config.parameter_file.clone(),
            config.parameter_format,
            config.result_file.clone(),
        );
        let fun = EvaluationFunction::new(config.parameters.clone(), evaluator, cache);

        let mut solver = select_solver(
            config.mode,
            config.solver_name(),
            config.parameters.len(),
            config.max_iterations,
            config.tolerance,
        )?;

        let outcome = match config.mode {
            OptimizationMode::Root if !solver.is_root_finder() => {
                let magnitude = BoundedMagnitude::new(&fun);
                let mut outcome = solver.solve(&magnitude)?;
                outcome.params = magnitude.clamp(&outcome.params);
                outcome
            }
            _ => solver.solve(&fun)?,
        };

        let (value, success) = match config.mode {
            OptimizationMode::Minimum => (outcome.cost, outcome.success),
            OptimizationMode::Root => {
                let value = fun.value_at(&outcome.params)?;
                (value, outcome.success && value.abs() <= config.tolerance)
            }
        };

        let parameters = fun.write_parameter_file(&outcome.params)?;
        let stats = fun.stats();

        let result = OptimizationResult {
            success,
            mode: config.mode,
            solver: solver.name().to_string(),
            value,
            iterations: outcome.iterations,
            evaluations: stats.evaluations,
            cache_hits: stats.cache_hits,
            message: outcome.message.clone(),
            parameters,
        };

        log_summary(&result, &outcome);
        if let Some(path) = &config.report_file {
            write_report(path, &result)?;
        }

        Ok(result)
    }
}

fn log_summary(result: &OptimizationResult, outcome: &SolverResult) {
    if result.success {
        info!(
            iterations = result.iterations,
            evaluations = result.evaluations,
            cache_hits = result.cache_hits,
            "optimization finished: {}",
            outcome.message
        );
    } else {
        warn!(
            iterations = result.iterations,
            evaluations = result.evaluations,
            cache_hits = result.cache_hits,
            "optimization did not converge: {}",
            outcome.message
        );
    }
    info!("final value = {}", format_value(result.value));
    for p in &result.parameters {
        info!("{:<20} = {}", p.name(), format_value(p.value()));
    }
}

fn write_report(path: &std::path::Path, result: &OptimizationResult) -> Result<()> {
    let json = serde_json::to_string_pretty(result)?;
    fs::write(path, json).map_err(|e| OptimizerError::io(path, e))?;
    info!(path = %path.display(), "wrote optimization report");
    Ok(())
}
