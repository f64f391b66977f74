use super::format::format_value;
use crate::core::{ParameterFormat, ParameterSpec};
use crate::error::{OptimizerError, Result};
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

/// Renders parameter vectors into the file the external program reads.
#[derive(Clone, Copy, Debug)]
pub struct ParameterFileWriter {
    format: ParameterFormat,
}

impl ParameterFileWriter {
    pub fn new(format: ParameterFormat) -> Self {
        Self { format }
    }

    pub fn format(&self) -> ParameterFormat {
        self.format
    }

    fn preamble(&self) -> Option<&'static str> {
        match self.format {
            ParameterFormat::Ini => Some("[parameters]"),
            ParameterFormat::RawDataList => None,
            ParameterFormat::HeaderConstants | ParameterFormat::HeaderDefines => {
                Some("#pragma once")
            }
        }
    }

    fn line(&self, parameter: &ParameterSpec) -> String {
        let value = format_value(parameter.value());
        match self.format {
            ParameterFormat::Ini => format!("{} = {}", parameter.name(), value),
            ParameterFormat::RawDataList => value,
            ParameterFormat::HeaderConstants => {
                format!("const double {} = {};", parameter.name(), value)
            }
            ParameterFormat::HeaderDefines => format!("#define {} {}", parameter.name(), value),
        }
    }

    /// Full file contents for `parameters`, in order.
    pub fn render(&self, parameters: &[ParameterSpec]) -> String {
        let mut text = String::new();
        if let Some(preamble) = self.preamble() {
            text.push_str(preamble);
            text.push('\n');
        }
        for parameter in parameters {
            // writing into a String cannot fail
            let _ = writeln!(text, "{}", self.line(parameter));
        }
        text
    }

    /// Replace the contents of `path` with the rendered parameters.
    pub fn write(&self, path: &Path, parameters: &[ParameterSpec]) -> Result<()> {
        fs::write(path, self.render(parameters)).map_err(|e| OptimizerError::io(path, e))
    }
}
