use crate::error::{OptimizerError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ===== ENUMS =====

/// What the run is looking for in the program's scalar output.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptimizationMode {
    #[default]
    #[serde(alias = "minimize")]
    Minimum,
    #[serde(alias = "find-root")]
    Root,
}

impl fmt::Display for OptimizationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Minimum => f.write_str("minimum"),
            Self::Root => f.write_str("root"),
        }
    }
}

impl FromStr for OptimizationMode {
    type Err = OptimizerError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "minimum" | "minimize" => Ok(Self::Minimum),
            "root" | "find-root" => Ok(Self::Root),
            other => Err(OptimizerError::InvalidConfig(format!(
                "unknown optimization choice '{other}' (expected minimum or root)"
            ))),
        }
    }
}

/// Layout of the file the external program reads its parameters from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ParameterFormat {
    /// `[parameters]` section with `name = value` lines
    Ini,
    /// One bare value per line, name implied by position
    #[serde(alias = "data-txt")]
    RawDataList,
    /// `#pragma once` followed by `const double name = value;`
    #[serde(alias = "header-const")]
    HeaderConstants,
    /// `#pragma once` followed by `#define name value`
    #[serde(alias = "header-define")]
    HeaderDefines,
}

impl ParameterFormat {
    pub const ALL: [ParameterFormat; 4] = [
        Self::Ini,
        Self::RawDataList,
        Self::HeaderConstants,
        Self::HeaderDefines,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ini => "ini",
            Self::RawDataList => "raw-data-list",
            Self::HeaderConstants => "header-constants",
            Self::HeaderDefines => "header-defines",
        }
    }
}

impl fmt::Display for ParameterFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ParameterFormat {
    type Err = OptimizerError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "ini" => Ok(Self::Ini),
            "raw-data-list" | "data-txt" => Ok(Self::RawDataList),
            "header-constants" | "header-const" => Ok(Self::HeaderConstants),
            "header-defines" | "header-define" => Ok(Self::HeaderDefines),
            other => Err(OptimizerError::UnknownFormat(other.to_string())),
        }
    }
}

// ===== CORE DATA TYPES =====

/// One named, bounded input of the external program.
///
/// Values are never changed in place: every proposal from the solver
/// produces fresh copies through [`ParameterSpec::with_value`], so a
/// vector handed out earlier keeps describing the evaluation it came from.
/// `min <= value <= max` is advisory and not checked here.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ParameterSpec {
    name: String,
    min: f64,
    max: f64,
    value: f64,
}

impl ParameterSpec {
    pub fn new(name: impl Into<String>, min: f64, max: f64, value: f64) -> Self {
        Self {
            name: name.into(),
            min,
            max,
            value,
        }
    }

    /// Bounded parameter starting at the middle of its range.
    pub fn centered(name: impl Into<String>, min: f64, max: f64) -> Self {
        Self::new(name, min, max, (min + max) / 2.0)
    }

    /// Copy of this parameter carrying `value` instead.
    pub fn with_value(&self, value: f64) -> Self {
        Self {
            value,
            ..self.clone()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn bounds(&self) -> (f64, f64) {
        (self.min, self.max)
    }
}

/// Ordered parameters; the order is the solver's column order and the
/// line order of every parameter file.
pub type ParameterVector = Vec<ParameterSpec>;

/// Rebuild `parameters` positionally with the values in `x`.
///
/// Names and bounds come from `parameters`; extra trailing entries on
/// either side are ignored, like a zip.
pub fn with_values(parameters: &[ParameterSpec], x: &[f64]) -> ParameterVector {
    parameters
        .iter()
        .zip(x.iter())
        .map(|(parameter, &value)| parameter.with_value(value))
        .collect()
}

pub fn values_of(parameters: &[ParameterSpec]) -> Vec<f64> {
    parameters.iter().map(ParameterSpec::value).collect()
}

pub fn names_of(parameters: &[ParameterSpec]) -> Vec<String> {
    parameters.iter().map(|p| p.name.clone()).collect()
}

/// Outcome of a complete run.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OptimizationResult {
    pub success: bool,
    pub mode: OptimizationMode,
    pub solver: String,
    /// Final scalar reported by the external program at `parameters`
    pub value: f64,
    pub iterations: u64,
    pub evaluations: usize,
    pub cache_hits: usize,
    pub message: String,
    pub parameters: ParameterVector,
}

impl OptimizationResult {
    pub fn get_parameter(&self, name: &str) -> Option<&ParameterSpec> {
        self.parameters.iter().find(|p| p.name == name)
    }
}
