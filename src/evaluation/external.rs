use super::parameter_file::ParameterFileWriter;
use crate::core::{ParameterFormat, ParameterSpec};
use crate::error::{OptimizerError, Result};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tracing::debug;

/// Runs the external program once per parameter vector.
///
/// The parameter and result files are shared with the program; callers
/// must not run two evaluations against the same pair at once.
#[derive(Clone, Debug)]
pub struct ExternalEvaluator {
    command: String,
    parameter_file: PathBuf,
    result_file: PathBuf,
    writer: ParameterFileWriter,
}

impl ExternalEvaluator {
    pub fn new(
        command: impl Into<String>,
        parameter_file: impl Into<PathBuf>,
        format: ParameterFormat,
        result_file: impl Into<PathBuf>,
    ) -> Self {
        Self {
            command: command.into(),
            parameter_file: parameter_file.into(),
            result_file: result_file.into(),
            writer: ParameterFileWriter::new(format),
        }
    }

    /// Shell command string; doubles as the program identity in the cache.
    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn parameter_file(&self) -> &Path {
        &self.parameter_file
    }

    pub fn result_file(&self) -> &Path {
        &self.result_file
    }

    pub fn writer(&self) -> &ParameterFileWriter {
        &self.writer
    }

    /// Write `parameters`, run the command to completion and read its result.
    pub fn evaluate(&self, parameters: &[ParameterSpec]) -> Result<f64> {
        self.writer.write(&self.parameter_file, parameters)?;
        self.clear_result()?;

        let output = shell(&self.command)
            .output()
            .map_err(|source| OptimizerError::ProcessSpawn {
                command: self.command.clone(),
                source,
            })?;
        self.check_status(&output)?;

        read_result(&self.result_file)
    }

    /// A program that exits cleanly without writing must not see the
    /// previous evaluation's value.
    fn clear_result(&self) -> Result<()> {
        match fs::remove_file(&self.result_file) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(OptimizerError::io(&self.result_file, e)),
        }
    }

    fn check_status(&self, output: &Output) -> Result<()> {
        let stdout = String::from_utf8_lossy(&output.stdout);
        for line in stdout.lines().filter(|l| !l.trim().is_empty()) {
            debug!(target: "paramopt::program", "{line}");
        }

        if !output.status.success() {
            return Err(OptimizerError::ProcessFailed {
                command: self.command.clone(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(())
    }
}

#[cfg(unix)]
fn shell(command: &str) -> Command {
    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg(command);
    cmd
}

#[cfg(windows)]
fn shell(command: &str) -> Command {
    let mut cmd = Command::new("cmd");
    cmd.arg("/C").arg(command);
    cmd
}

/// First whitespace-separated token of the first line, as `f64`.
pub fn read_result(path: &Path) -> Result<f64> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(OptimizerError::ResultMissing(path.to_path_buf()));
        }
        Err(e) => return Err(OptimizerError::io(path, e)),
    };

    let token = content
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().next())
        .ok_or_else(|| OptimizerError::ResultEmpty(path.to_path_buf()))?;

    token.parse::<f64>().map_err(|_| OptimizerError::ResultParse {
        path: path.to_path_buf(),
        token: token.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_first_token_of_first_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("result.txt");

        fs::write(&path, "  1.25e-3  extra words\n99\n").unwrap();
        assert_eq!(read_result(&path).unwrap(), 1.25e-3);

        fs::write(&path, "42").unwrap();
        assert_eq!(read_result(&path).unwrap(), 42.0);
    }

    #[test]
    fn result_failures_are_distinct() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("result.txt");

        assert!(matches!(read_result(&path), Err(OptimizerError::ResultMissing(_))));

        fs::write(&path, "").unwrap();
        assert!(matches!(read_result(&path), Err(OptimizerError::ResultEmpty(_))));

        fs::write(&path, "   \n1.0\n").unwrap();
        assert!(matches!(read_result(&path), Err(OptimizerError::ResultEmpty(_))));

        fs::write(&path, "cost=3\n").unwrap();
        assert!(matches!(
            read_result(&path),
            Err(OptimizerError::ResultParse { token, .. }) if token == "cost=3"
        ));
    }

    #[cfg(unix)]
    mod process {
        use super::*;

        fn evaluator(dir: &Path, command: &str) -> ExternalEvaluator {
            ExternalEvaluator::new(
                command,
                dir.join("params.txt"),
                ParameterFormat::RawDataList,
                dir.join("result.txt"),
            )
        }

        #[test]
        fn runs_command_against_written_parameters() {
            let dir = tempfile::tempdir().unwrap();
            let command = format!(
                "cd '{}' && awk '{{ s += $1 }} END {{ print s }}' params.txt > result.txt",
                dir.path().display()
            );
            let params = vec![
                ParameterSpec::new("a", 0.0, 10.0, 1.5),
                ParameterSpec::new("b", 0.0, 10.0, 2.0),
            ];

            let value = evaluator(dir.path(), &command).evaluate(&params).unwrap();
            assert_eq!(value, 3.5);
        }

        #[test]
        fn nonzero_exit_is_fatal() {
            let dir = tempfile::tempdir().unwrap();
            let err = evaluator(dir.path(), "echo broken >&2; exit 3")
                .evaluate(&[ParameterSpec::new("a", 0.0, 1.0, 0.5)])
                .unwrap_err();

            match err {
                OptimizerError::ProcessFailed { stderr, .. } => assert_eq!(stderr, "broken"),
                other => panic!("unexpected error: {other}"),
            }
        }

        #[test]
        fn stale_result_is_not_reused() {
            let dir = tempfile::tempdir().unwrap();
            fs::write(dir.path().join("result.txt"), "7\n").unwrap();

            let err = evaluator(dir.path(), "true")
                .evaluate(&[ParameterSpec::new("a", 0.0, 1.0, 0.5)])
                .unwrap_err();
            assert!(matches!(err, OptimizerError::ResultMissing(_)));
        }
    }
}
