use std::path::PathBuf;
use thiserror::Error;

/// Every way a run can fail. None of them are retried.
#[derive(Debug, Error)]
pub enum OptimizerError {
    #[error("invalid parameter specification '{spec}': {reason}")]
    InvalidParameterSpec { spec: String, reason: String },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("unknown parameter format '{0}' (expected ini, raw-data-list, header-constants or header-defines)")]
    UnknownFormat(String),

    #[error("unknown solver '{name}' for {mode} mode")]
    UnknownSolver { name: String, mode: String },

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to spawn '{command}': {source}")]
    ProcessSpawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("'{command}' exited with {status}: {stderr}")]
    ProcessFailed {
        command: String,
        status: String,
        stderr: String,
    },

    #[error("result file {} was not written", .0.display())]
    ResultMissing(PathBuf),

    #[error("result file {} is empty", .0.display())]
    ResultEmpty(PathBuf),

    #[error("result file {}: '{token}' is not a number", .path.display())]
    ResultParse { path: PathBuf, token: String },

    #[error("{matches} cached records match the lookup for '{program}'; the cache or its tolerance is inconsistent")]
    CacheAmbiguity { program: String, matches: usize },

    #[error("malformed cache file {} (line {line}): {reason}", .path.display())]
    CacheFormat {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    #[error("cache columns {found:?} do not match the run parameters {expected:?}")]
    CacheSchemaMismatch {
        expected: Vec<String>,
        found: Vec<String>,
    },

    #[error("solver failed: {0}")]
    Solver(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl OptimizerError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Recover the original error from one that travelled through argmin.
    pub(crate) fn from_solver(err: argmin::core::Error) -> Self {
        match err.downcast::<OptimizerError>() {
            Ok(inner) => inner,
            Err(other) => Self::Solver(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, OptimizerError>;
