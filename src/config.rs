//! Run-level configuration.
//!
//! A run is described by a [`ConfigLayer`] read from a JSON file, with a
//! second layer (the command line) laid over it. [`ConfigLayer::resolve`]
//! fills defaults and validates everything before the external program is
//! ever invoked.

use crate::core::{
    OptimizationMode, ParameterFormat, ParameterSpec, parse_parameter, validate_parameters,
};
use crate::error::{OptimizerError, Result};
use crate::optimization::{DEFAULT_MINIMIZATION_SOLVER, DEFAULT_ROOT_SOLVER, select_solver};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_TOLERANCE: f64 = 1e-4;
pub const DEFAULT_CACHE_TOLERANCE: f64 = 1e-8;
pub const DEFAULT_MAX_ITERATIONS: u64 = 1000;

/// A parameter as written in a config file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParameterEntry {
    /// `name:min:max[:initial]`
    Spec(String),
    Table {
        name: String,
        min: f64,
        max: f64,
        #[serde(default)]
        initial: Option<f64>,
    },
}

impl ParameterEntry {
    fn to_spec(&self) -> Result<ParameterSpec> {
        match self {
            Self::Spec(spec) => parse_parameter(spec),
            Self::Table {
                name,
                min,
                max,
                initial,
            } => Ok(match initial {
                Some(value) => ParameterSpec::new(name.clone(), *min, *max, *value),
                None => ParameterSpec::centered(name.clone(), *min, *max),
            }),
        }
    }
}

/// Partially specified configuration; every field is optional.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigLayer {
    pub mode: Option<OptimizationMode>,
    pub minimization_solver: Option<String>,
    pub root_solver: Option<String>,
    pub tolerance: Option<f64>,
    pub max_iterations: Option<u64>,
    #[serde(default)]
    pub parameters: Vec<ParameterEntry>,
    pub program_command: Option<String>,
    pub parameter_file: Option<PathBuf>,
    pub parameter_format: Option<String>,
    pub result_file: Option<PathBuf>,
    pub cache_file: Option<PathBuf>,
    pub cache_tolerance: Option<f64>,
    pub report_file: Option<PathBuf>,
}

impl ConfigLayer {
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| OptimizerError::io(path, e))?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// `overrides` wins field by field; its parameter list replaces this
    /// one only when non-empty.
    pub fn merge(self, overrides: ConfigLayer) -> Self {
        Self {
            mode: overrides.mode.or(self.mode),
            minimization_solver: overrides.minimization_solver.or(self.minimization_solver),
            root_solver: overrides.root_solver.or(self.root_solver),
            tolerance: overrides.tolerance.or(self.tolerance),
            max_iterations: overrides.max_iterations.or(self.max_iterations),
            parameters: if overrides.parameters.is_empty() {
                self.parameters
            } else {
                overrides.parameters
            },
            program_command: overrides.program_command.or(self.program_command),
            parameter_file: overrides.parameter_file.or(self.parameter_file),
            parameter_format: overrides.parameter_format.or(self.parameter_format),
            result_file: overrides.result_file.or(self.result_file),
            cache_file: overrides.cache_file.or(self.cache_file),
            cache_tolerance: overrides.cache_tolerance.or(self.cache_tolerance),
            report_file: overrides.report_file.or(self.report_file),
        }
    }

    /// Apply defaults and validate.
    pub fn resolve(self) -> Result<RunConfig> {
        let missing = |field: &str| OptimizerError::InvalidConfig(format!("'{field}' is required"));

        let parameters = self
            .parameters
            .iter()
            .map(ParameterEntry::to_spec)
            .collect::<Result<Vec<_>>>()?;

        let config = RunConfig {
            mode: self.mode.unwrap_or_default(),
            minimization_solver: self
                .minimization_solver
                .unwrap_or_else(|| DEFAULT_MINIMIZATION_SOLVER.to_string()),
            root_solver: self
                .root_solver
                .unwrap_or_else(|| DEFAULT_ROOT_SOLVER.to_string()),
            tolerance: self.tolerance.unwrap_or(DEFAULT_TOLERANCE),
            max_iterations: self.max_iterations.unwrap_or(DEFAULT_MAX_ITERATIONS),
            parameters,
            program_command: self.program_command.ok_or_else(|| missing("program_command"))?,
            parameter_file: self.parameter_file.ok_or_else(|| missing("parameter_file"))?,
            parameter_format: self
                .parameter_format
                .ok_or_else(|| missing("parameter_format"))?
                .parse()?,
            result_file: self.result_file.ok_or_else(|| missing("result_file"))?,
            cache_file: self.cache_file,
            cache_tolerance: self.cache_tolerance.unwrap_or(DEFAULT_CACHE_TOLERANCE),
            report_file: self.report_file,
        };
        config.validate()?;
        Ok(config)
    }
}

/// Fully resolved settings of one run.
#[derive(Clone, Debug, Serialize)]
pub struct RunConfig {
    pub mode: OptimizationMode,
    pub minimization_solver: String,
    pub root_solver: String,
    pub tolerance: f64,
    pub max_iterations: u64,
    pub parameters: Vec<ParameterSpec>,
    pub program_command: String,
    pub parameter_file: PathBuf,
    pub parameter_format: ParameterFormat,
    pub result_file: PathBuf,
    pub cache_file: Option<PathBuf>,
    pub cache_tolerance: f64,
    pub report_file: Option<PathBuf>,
}

impl RunConfig {
    /// Solver name in effect for the configured mode.
    pub fn solver_name(&self) -> &str {
        match self.mode {
            OptimizationMode::Minimum => &self.minimization_solver,
            OptimizationMode::Root => &self.root_solver,
        }
    }

    pub fn validate(&self) -> Result<()> {
        validate_parameters(&self.parameters)?;

        positive("tolerance", self.tolerance)?;
        positive("cache_tolerance", self.cache_tolerance)?;
        if self.max_iterations == 0 {
            return Err(OptimizerError::InvalidConfig("max_iterations must be at least 1".into()));
        }
        if self.program_command.trim().is_empty() {
            return Err(OptimizerError::InvalidConfig("program_command is empty".into()));
        }
        for (field, path) in [
            ("parameter_file", &self.parameter_file),
            ("result_file", &self.result_file),
        ] {
            if path.as_os_str().is_empty() {
                return Err(OptimizerError::InvalidConfig(format!("{field} is empty")));
            }
        }
        if self.parameter_file == self.result_file {
            return Err(OptimizerError::InvalidConfig(
                "parameter_file and result_file must differ".into(),
            ));
        }

        select_solver(
            self.mode,
            self.solver_name(),
            self.parameters.len(),
            self.max_iterations,
            self.tolerance,
        )?;

        Ok(())
    }
}

fn positive(field: &str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(OptimizerError::InvalidConfig(format!(
            "{field} must be a positive number, got {value}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = r#"{
        "mode": "minimum",
        "parameters": ["a:-1:1:0.5", {"name": "b", "min": -1, "max": 1, "initial": 0.5}],
        "program_command": "./model",
        "parameter_file": "params.txt",
        "parameter_format": "data-txt",
        "result_file": "result.txt"
    }"#;

    #[test]
    fn defaults_fill_the_gaps() {
        let config = ConfigLayer::from_json(BASE).unwrap().resolve().unwrap();

        assert_eq!(config.mode, OptimizationMode::Minimum);
        assert_eq!(config.solver_name(), "nelder-mead");
        assert_eq!(config.tolerance, DEFAULT_TOLERANCE);
        assert_eq!(config.cache_tolerance, DEFAULT_CACHE_TOLERANCE);
        assert_eq!(config.parameter_format, ParameterFormat::RawDataList);
        assert_eq!(config.parameters[1].value(), 0.5);
        assert!(config.cache_file.is_none());
    }

    #[test]
    fn overrides_win() {
        let file = ConfigLayer::from_json(BASE).unwrap();
        let cli = ConfigLayer {
            mode: Some(OptimizationMode::Root),
            tolerance: Some(1e-6),
            parameters: vec![ParameterEntry::Spec("x:0:2".into())],
            ..Default::default()
        };
        let config = file.merge(cli).resolve().unwrap();

        assert_eq!(config.mode, OptimizationMode::Root);
        assert_eq!(config.tolerance, 1e-6);
        assert_eq!(config.parameters.len(), 1);
        assert_eq!(config.parameters[0].value(), 1.0);
        assert_eq!(config.program_command, "./model");
    }

    #[test]
    fn configuration_errors_are_caught_up_front() {
        let resolve =
            |patch: ConfigLayer| ConfigLayer::from_json(BASE).unwrap().merge(patch).resolve();

        assert!(matches!(
            resolve(ConfigLayer {
                parameter_format: Some("yaml".into()),
                ..Default::default()
            }),
            Err(OptimizerError::UnknownFormat(_))
        ));
        assert!(matches!(
            resolve(ConfigLayer {
                tolerance: Some(0.0),
                ..Default::default()
            }),
            Err(OptimizerError::InvalidConfig(_))
        ));
        assert!(matches!(
            resolve(ConfigLayer {
                minimization_solver: Some("simplex-ish".into()),
                ..Default::default()
            }),
            Err(OptimizerError::UnknownSolver { .. })
        ));
        assert!(matches!(
            resolve(ConfigLayer {
                result_file: Some("params.txt".into()),
                ..Default::default()
            }),
            Err(OptimizerError::InvalidConfig(_))
        ));
        assert!(matches!(
            resolve(ConfigLayer {
                parameters: vec![ParameterEntry::Spec("a:0".into())],
                ..Default::default()
            }),
            Err(OptimizerError::InvalidParameterSpec { .. })
        ));
    }

    #[test]
    fn missing_required_fields_and_unknown_keys() {
        assert!(matches!(
            ConfigLayer::default().resolve(),
            Err(OptimizerError::InvalidConfig(_))
        ));
        assert!(matches!(
            ConfigLayer::from_json(r#"{"program": "x"}"#),
            Err(OptimizerError::Json(_))
        ));
    }
}
