//! Drive an external program toward a minimum or a root of its scalar output.
//!
//! Each candidate vector proposed by the solver is written to a parameter
//! file, the program is run through the shell, and its result is read back
//! from a result file. An optional on-disk cache answers repeated
//! proposals without running the program again.

pub mod cache;
pub mod config;
pub mod core;
pub mod error;
pub mod evaluation;
pub mod optimization;
pub mod optimizer;

pub use crate::cache::{CacheRecord, CacheSchema, ResultCache};
pub use crate::config::{ConfigLayer, ParameterEntry, RunConfig};
pub use crate::core::*;
pub use crate::error::{OptimizerError, Result};
pub use crate::evaluation::{ExternalEvaluator, ParameterFileWriter};
pub use crate::optimization::{EvaluationFunction, EvaluationStats, Problem, Solver, SolverResult};
pub use crate::optimizer::Optimizer;
