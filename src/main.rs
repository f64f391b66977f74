use clap::Parser;
use paramopt::{ConfigLayer, OptimizationMode, Optimizer, ParameterEntry};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::error;
use tracing_subscriber::EnvFilter;

/// Optimize / find root of a model in an external program.
///
/// Every candidate is written to the parameter file, the program command
/// runs, and the first number in the result file is the model's value.
#[derive(Parser, Debug)]
#[command(name = "paramopt")]
#[command(version)]
#[command(about, long_about = None)]
struct Cli {
    /// JSON run configuration; flags below override its fields
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Look for a minimum or a root [minimum, root]
    #[arg(long)]
    optimization_choice: Option<String>,

    /// Minimization solver name
    #[arg(long)]
    optimization_solver_minimization: Option<String>,

    /// Root-finding solver name (nelder-mead minimizes |f|, brent brackets a zero)
    #[arg(long)]
    optimization_solver_root: Option<String>,

    /// Convergence tolerance
    #[arg(long)]
    optimization_tolerance: Option<f64>,

    /// Maximum solver iterations
    #[arg(long)]
    max_iterations: Option<u64>,

    /// How parameters are passed: ini, raw-data-list (data-txt),
    /// header-constants (header-const) or header-defines (header-define)
    #[arg(long)]
    parameter_passing: Option<String>,

    /// Program or script to execute [shell command]
    #[arg(long)]
    program_command: Option<String>,

    /// File into which the parameters are written
    #[arg(long)]
    parameter_file: Option<PathBuf>,

    /// File that contains the result of the model
    #[arg(long)]
    result_file: Option<PathBuf>,

    /// If set, results of program calls are cached and reused
    #[arg(long)]
    calculation_cache_file: Option<PathBuf>,

    /// Relative tolerance on parameter values for cache lookups
    #[arg(long)]
    calculation_cache_tol: Option<f64>,

    /// Write the final result as JSON to this file
    #[arg(long)]
    report_file: Option<PathBuf>,

    /// Parameter to optimize, repeatable: --parameter=<name>:<min>:<max>[:<initial>]
    #[arg(long = "parameter", value_name = "SPEC")]
    parameters: Vec<String>,

    /// Log at debug level (RUST_LOG takes precedence)
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn layer(&self) -> paramopt::Result<ConfigLayer> {
        Ok(ConfigLayer {
            mode: self
                .optimization_choice
                .as_deref()
                .map(str::parse::<OptimizationMode>)
                .transpose()?,
            minimization_solver: self.optimization_solver_minimization.clone(),
            root_solver: self.optimization_solver_root.clone(),
            tolerance: self.optimization_tolerance,
            max_iterations: self.max_iterations,
            parameters: self
                .parameters
                .iter()
                .cloned()
                .map(ParameterEntry::Spec)
                .collect(),
            program_command: self.program_command.clone(),
            parameter_file: self.parameter_file.clone(),
            parameter_format: self.parameter_passing.clone(),
            result_file: self.result_file.clone(),
            cache_file: self.calculation_cache_file.clone(),
            cache_tolerance: self.calculation_cache_tol,
            report_file: self.report_file.clone(),
        })
    }
}

fn enable_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_target(false)
        .try_init();
}

fn run(cli: &Cli) -> paramopt::Result<bool> {
    let base = match &cli.config {
        Some(path) => ConfigLayer::from_json_file(path)?,
        None => ConfigLayer::default(),
    };
    let config = base.merge(cli.layer()?).resolve()?;
    let result = Optimizer::new(config)?.run()?;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(result.success)
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    enable_tracing(cli.verbose);

    match run(&cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(2),
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}
