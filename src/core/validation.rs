use super::types::ParameterSpec;
use crate::error::{OptimizerError, Result};
use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

/// Names end up as identifiers in C headers and ini keys.
static PARAMETER_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("static pattern"));

/// Parse `name:min:max` or `name:min:max:initial`.
///
/// Without an explicit initial value the parameter starts at the middle
/// of its range.
pub fn parse_parameter(spec: &str) -> Result<ParameterSpec> {
    let invalid = |reason: String| OptimizerError::InvalidParameterSpec {
        spec: spec.to_string(),
        reason,
    };

    let fields: Vec<&str> = spec.split(':').map(str::trim).collect();
    if !(3..=4).contains(&fields.len()) {
        return Err(invalid(format!(
            "expected name:min:max[:initial], got {} field(s)",
            fields.len()
        )));
    }

    let number = |field: &str, what: &str| -> Result<f64> {
        field
            .parse::<f64>()
            .map_err(|e| invalid(format!("{what} '{field}': {e}")))
    };

    let name = fields[0];
    let min = number(fields[1], "min")?;
    let max = number(fields[2], "max")?;

    let parameter = match fields.get(3) {
        Some(initial) => ParameterSpec::new(name, min, max, number(initial, "initial value")?),
        None => ParameterSpec::centered(name, min, max),
    };

    validate_parameter(&parameter).map_err(|e| match e {
        OptimizerError::InvalidParameterSpec { reason, .. } => invalid(reason),
        other => other,
    })?;

    Ok(parameter)
}

fn validate_parameter(parameter: &ParameterSpec) -> Result<()> {
    let invalid = |reason: String| OptimizerError::InvalidParameterSpec {
        spec: parameter.name().to_string(),
        reason,
    };

    if !PARAMETER_NAME.is_match(parameter.name()) {
        return Err(invalid(format!(
            "'{}' is not a valid identifier",
            parameter.name()
        )));
    }
    if !parameter.min().is_finite()
        || !parameter.max().is_finite()
        || !parameter.value().is_finite()
    {
        return Err(invalid("bounds and initial value must be finite".into()));
    }
    if parameter.min() > parameter.max() {
        return Err(invalid(format!(
            "min {} is greater than max {}",
            parameter.min(),
            parameter.max()
        )));
    }

    Ok(())
}

/// Validate the full parameter list of a run.
///
/// Checks every parameter on its own, then rejects empty lists and
/// duplicated names.
pub fn validate_parameters(parameters: &[ParameterSpec]) -> Result<()> {
    if parameters.is_empty() {
        return Err(OptimizerError::InvalidConfig(
            "at least one parameter is required".into(),
        ));
    }

    let mut seen = HashSet::with_capacity(parameters.len());
    for parameter in parameters {
        validate_parameter(parameter)?;
        if !seen.insert(parameter.name()) {
            return Err(OptimizerError::InvalidConfig(format!(
                "parameter '{}' is declared more than once",
                parameter.name()
            )));
        }
    }

    Ok(())
}
