//! Run an external command to completion

use std::path::PathBuf;
use std::process::Command;

use serde::Serialize;
use tracing::{debug, error, info};

use super::ToolError;

/// A fully specified command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: PathBuf,
    pub args: Vec<String>,
    /// Extra environment variables for the child; the rest is inherited
    pub env: Vec<(String, String)>,
}

impl CommandSpec {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn envs(mut self, env: Vec<(String, String)>) -> Self {
        self.env.extend(env);
        self
    }

    pub fn program_name(&self) -> String {
        self.program
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.program.display().to_string())
    }

    /// The command line as it would be typed; environment values are not shown
    pub fn display(&self) -> String {
        let mut parts = vec![self.program.display().to_string()];
        parts.extend(self.args.iter().cloned());
        parts.join(" ")
    }
}

/// Captured result of a finished command
#[derive(Debug, Clone, Serialize)]
pub struct CommandOutcome {
    pub command: String,
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutcome {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// Turn a non-zero exit into [`ToolError::Failed`]
    pub fn into_result(self, program: &str) -> Result<CommandOutcome, ToolError> {
        if self.success() {
            Ok(self)
        } else {
            Err(ToolError::Failed {
                program: program.to_string(),
                code: self.code,
                stderr: self.stderr.trim().to_string(),
            })
        }
    }
}

/// Run a command, waiting for it to exit
///
/// Only a failure to start the process is an error here; a non-zero exit is
/// reported through [`CommandOutcome::code`].
pub fn run_command(spec: &CommandSpec) -> Result<CommandOutcome, ToolError> {
    let command = spec.display();
    info!("running: {}", command);

    let output = Command::new(&spec.program)
        .args(&spec.args)
        .envs(spec.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
        .output()
        .map_err(|e| ToolError::Spawn {
            program: spec.program_name(),
            source: e,
        })?;

    let outcome = CommandOutcome {
        command,
        code: output.status.code(),
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
    };

    if outcome.success() {
        debug!("{} finished successfully", spec.program_name());
    } else {
        error!(
            "{} failed with code {:?}: {}",
            spec.program_name(),
            outcome.code,
            outcome.stderr.trim()
        );
    }
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_joins_arguments() {
        let spec = CommandSpec::new("/usr/bin/pg_dump")
            .args(["-h", "localhost"])
            .arg("-v")
            .envs(vec![("PGPASSWORD".into(), "s3cret".into())]);
        assert_eq!(spec.display(), "/usr/bin/pg_dump -h localhost -v");
        assert_eq!(spec.program_name(), "pg_dump");
    }

    #[test]
    #[cfg(unix)]
    fn test_run_command_success_captures_stdout() {
        let spec = CommandSpec::new("sh").args(["-c", "echo hello"]);
        let outcome = run_command(&spec).unwrap();
        assert!(outcome.success());
        assert_eq!(outcome.stdout.trim(), "hello");
    }

    #[test]
    #[cfg(unix)]
    fn test_run_command_failure_captures_stderr() {
        let spec = CommandSpec::new("sh").args(["-c", "echo broken >&2; exit 3"]);
        let outcome = run_command(&spec).unwrap();
        assert!(!outcome.success());
        assert_eq!(outcome.code, Some(3));

        match outcome.into_result("sh") {
            Err(ToolError::Failed { code, stderr, .. }) => {
                assert_eq!(code, Some(3));
                assert_eq!(stderr, "broken");
            }
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[test]
    #[cfg(unix)]
    fn test_run_command_passes_environment() {
        let spec = CommandSpec::new("sh")
            .args(["-c", "printf %s \"$PGPASSWORD\""])
            .envs(vec![("PGPASSWORD".into(), "s3cret".into())]);
        let outcome = run_command(&spec).unwrap();
        assert_eq!(outcome.stdout, "s3cret");
    }

    #[test]
    fn test_run_command_missing_program() {
        let spec = CommandSpec::new("/nonexistent/pgutils/pg_dump");
        let err = run_command(&spec).unwrap_err();
        assert!(matches!(err, ToolError::Spawn { .. }));
    }
}
