//! External PostgreSQL client tools
//!
//! Backups and restores are delegated to `pg_dump`, `pg_restore` and `psql`.
//! This module finds those binaries, builds their command lines from the
//! configured connection and runs them to completion.
//!
//! - `locate`: which-style lookup of a binary on `PATH`
//! - `runner`: run a command, capturing exit status, stdout and stderr
//! - `backup`: `pg_dump` in custom format
//! - `restore`: drop, recreate and `pg_restore` a database

mod backup;
mod locate;
mod restore;
mod runner;

pub use backup::{BackupReport, BackupTool};
pub use locate::{locate_binary, locate_in};
pub use restore::{RestoreReport, RestoreStep, RestoreTool};
pub use runner::{run_command, CommandOutcome, CommandSpec};

use std::path::PathBuf;
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::info;

use crate::config::ConnectionConfig;
use crate::database::DbError;

pub const DEFAULT_HOST: &str = "postgres";
pub const DEFAULT_PORT: u16 = 5432;
pub const DEFAULT_DBNAME: &str = "postgres";
pub const DEFAULT_USER: &str = "postgres";

/// Environment variable the client tools read the password from
pub const PASSWORD_ENV: &str = "PGPASSWORD";

#[derive(Error, Debug)]
pub enum ToolError {
    #[error("{binary} not found; check that the PostgreSQL client tools are installed")]
    NotFound { binary: String },

    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} exited with {}: {stderr}", exit_label(.code))]
    Failed {
        program: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error(transparent)]
    Identifier(#[from] DbError),
}

fn exit_label(code: &Option<i32>) -> String {
    code.map(|c| c.to_string())
        .unwrap_or_else(|| "a signal".to_string())
}

/// Connection parameters as passed to the client tools
///
/// Unlike [`ConnectionConfig`], every field except the password has a value:
/// the tools fall back to a `postgres` server with the default superuser.
#[derive(Clone, PartialEq, Eq)]
pub struct ToolTarget {
    pub host: String,
    pub port: u16,
    pub dbname: String,
    pub user: String,
    pub password: Option<String>,
}

impl ToolTarget {
    pub fn from_config(config: &ConnectionConfig) -> Self {
        Self {
            host: config
                .host
                .clone()
                .unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: config.port.unwrap_or(DEFAULT_PORT),
            dbname: config
                .dbname
                .clone()
                .unwrap_or_else(|| DEFAULT_DBNAME.to_string()),
            user: config
                .user
                .clone()
                .unwrap_or_else(|| DEFAULT_USER.to_string()),
            password: config.password.clone(),
        }
    }

    /// `-h HOST -p PORT -U USER -d DBNAME`
    pub fn connection_args(&self, dbname: &str) -> Vec<String> {
        vec![
            "-h".to_string(),
            self.host.clone(),
            "-p".to_string(),
            self.port.to_string(),
            "-U".to_string(),
            self.user.clone(),
            "-d".to_string(),
            dbname.to_string(),
        ]
    }

    /// Environment handed to the child process
    pub fn env(&self) -> Vec<(String, String)> {
        self.password
            .iter()
            .map(|p| (PASSWORD_ENV.to_string(), p.clone()))
            .collect()
    }
}

impl std::fmt::Debug for ToolTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolTarget")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("dbname", &self.dbname)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "********"))
            .finish()
    }
}

/// Run `f` and log how long it took
pub(crate) fn timed<T>(label: &str, f: impl FnOnce() -> T) -> (T, Duration) {
    let start = Instant::now();
    let out = f();
    let elapsed = start.elapsed();
    info!("{} took {:.2} seconds", label, elapsed.as_secs_f64());
    (out, elapsed)
}

/// Find `binary` in the configured directory first, then on `PATH`
pub(crate) fn find_tool(binary: &str, bin_dir: Option<&str>) -> Result<PathBuf, ToolError> {
    let path = locate_binary(binary, bin_dir.map(std::path::Path::new))?;
    info!("{} found at {}", binary, path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_defaults() {
        let target = ToolTarget::from_config(&ConnectionConfig::default());
        assert_eq!(target.host, "postgres");
        assert_eq!(target.port, 5432);
        assert_eq!(target.dbname, "postgres");
        assert_eq!(target.user, "postgres");
        assert!(target.env().is_empty());
    }

    #[test]
    fn test_target_connection_args_and_password_env() {
        let target = ToolTarget::from_config(&ConnectionConfig {
            host: Some("db.internal".into()),
            port: Some(6543),
            dbname: Some("shop".into()),
            user: Some("admin".into()),
            password: Some("s3cret".into()),
        });
        assert_eq!(
            target.connection_args("shop"),
            vec!["-h", "db.internal", "-p", "6543", "-U", "admin", "-d", "shop"]
        );
        assert_eq!(
            target.env(),
            vec![("PGPASSWORD".to_string(), "s3cret".to_string())]
        );
        assert!(!format!("{:?}", target).contains("s3cret"));
    }

    #[test]
    fn test_failed_error_message() {
        let e = ToolError::Failed {
            program: "pg_dump".into(),
            code: Some(1),
            stderr: "connection refused".into(),
        };
        assert_eq!(e.to_string(), "pg_dump exited with 1: connection refused");
        let e = ToolError::Failed {
            program: "pg_dump".into(),
            code: None,
            stderr: String::new(),
        };
        assert!(e.to_string().contains("a signal"));
    }
}
