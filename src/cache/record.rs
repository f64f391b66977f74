use crate::core::{ParameterSpec, names_of};
use crate::error::{OptimizerError, Result};
use indexmap::IndexMap;

pub const PROGRAM_COLUMN: &str = "program";
pub const VALUE_COLUMN: &str = "value";

/// Column layout of a cache, fixed when the cache is opened.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CacheSchema {
    parameters: Vec<String>,
}

impl CacheSchema {
    pub fn new(parameters: Vec<String>) -> Result<Self> {
        if let Some(reserved) = parameters
            .iter()
            .find(|name| *name == PROGRAM_COLUMN || *name == VALUE_COLUMN)
        {
            return Err(OptimizerError::InvalidConfig(format!(
                "parameter name '{reserved}' collides with a cache column"
            )));
        }
        Ok(Self { parameters })
    }

    pub fn from_parameters(parameters: &[ParameterSpec]) -> Result<Self> {
        Self::new(names_of(parameters))
    }

    pub fn parameters(&self) -> &[String] {
        &self.parameters
    }

    /// Header row: program, one column per parameter, value.
    pub fn columns(&self) -> Vec<&str> {
        std::iter::once(PROGRAM_COLUMN)
            .chain(self.parameters.iter().map(String::as_str))
            .chain(std::iter::once(VALUE_COLUMN))
            .collect()
    }

    /// True when `names` holds exactly this schema's parameters, in any order.
    pub fn accepts<'a>(&self, names: impl IntoIterator<Item = &'a str>) -> bool {
        let mut names: Vec<&str> = names.into_iter().collect();
        let mut expected: Vec<&str> = self.parameters.iter().map(String::as_str).collect();
        names.sort_unstable();
        expected.sort_unstable();
        names == expected
    }

    pub(crate) fn mismatch<'a>(&self, found: impl IntoIterator<Item = &'a str>) -> OptimizerError {
        OptimizerError::CacheSchemaMismatch {
            expected: self.parameters.clone(),
            found: found.into_iter().map(str::to_string).collect(),
        }
    }
}

/// One executed evaluation: program, inputs, scalar output.
#[derive(Clone, Debug, PartialEq)]
pub struct CacheRecord {
    pub program: String,
    pub parameter_values: IndexMap<String, f64>,
    pub value: f64,
}

impl CacheRecord {
    /// Record for `parameters`, with columns laid out in schema order.
    pub fn new(
        schema: &CacheSchema,
        program: &str,
        parameters: &[ParameterSpec],
        value: f64,
    ) -> Result<Self> {
        if !schema.accepts(parameters.iter().map(ParameterSpec::name)) {
            return Err(schema.mismatch(parameters.iter().map(ParameterSpec::name)));
        }

        let parameter_values = schema
            .parameters()
            .iter()
            .map(|name| {
                let value = parameters
                    .iter()
                    .find(|p| p.name() == name)
                    .map(ParameterSpec::value)
                    .unwrap_or(f64::NAN);
                (name.clone(), value)
            })
            .collect();

        Ok(Self {
            program: program.to_string(),
            parameter_values,
            value,
        })
    }

    /// Relative tolerance match against a query vector.
    ///
    /// Every query parameter must satisfy `|cached - query| < tolerance * query`.
    /// The bound scales with the query value, so a zero or negative query
    /// value never matches.
    pub fn matches(&self, program: &str, query: &[ParameterSpec], tolerance: f64) -> bool {
        self.program == program
            && query.iter().all(|parameter| {
                self.parameter_values
                    .get(parameter.name())
                    .is_some_and(|&cached| {
                        (cached - parameter.value()).abs() < tolerance * parameter.value()
                    })
            })
    }
}
