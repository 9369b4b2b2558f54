//! Database dump through `pg_dump`

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Serialize;
use tracing::info;

use super::runner::{run_command, CommandSpec};
use super::{find_tool, timed, ToolError, ToolTarget};
use crate::config::PgUtilsConfig;

pub const PG_DUMP: &str = "pg_dump";

/// Result of a successful backup
#[derive(Debug, Clone, Serialize)]
pub struct BackupReport {
    pub pg_dump: PathBuf,
    pub backup_file: PathBuf,
    pub elapsed_secs: f64,
    pub stdout: String,
    /// pg_dump writes its verbose progress here
    pub stderr: String,
}

/// Creates custom-format dumps of the configured database
#[derive(Debug, Clone)]
pub struct BackupTool {
    target: ToolTarget,
    backup_file: PathBuf,
    bin_dir: Option<String>,
}

impl BackupTool {
    pub fn new(config: &PgUtilsConfig) -> Self {
        Self {
            target: ToolTarget::from_config(&config.connection),
            backup_file: PathBuf::from(&config.backup_file),
            bin_dir: config.bin_dir.clone(),
        }
    }

    /// Write the dump somewhere other than the configured backup file
    pub fn with_backup_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.backup_file = path.into();
        self
    }

    pub fn backup_file(&self) -> &Path {
        &self.backup_file
    }

    /// `pg_dump <conn> -F c -b -v -f FILE`: custom format, large objects included
    pub fn dump_command(&self, pg_dump: &Path) -> CommandSpec {
        CommandSpec::new(pg_dump)
            .args(self.target.connection_args(&self.target.dbname))
            .args(["-F", "c", "-b", "-v", "-f"])
            .arg(self.backup_file.to_string_lossy())
            .envs(self.target.env())
    }

    pub fn create_backup(&self) -> Result<BackupReport, ToolError> {
        let (result, elapsed) = timed("backup", || self.run());
        let (pg_dump, outcome) = result?;
        info!("backup written to {}", self.backup_file.display());

        Ok(BackupReport {
            pg_dump,
            backup_file: self.backup_file.clone(),
            elapsed_secs: secs(elapsed),
            stdout: outcome.stdout,
            stderr: outcome.stderr,
        })
    }

    fn run(&self) -> Result<(PathBuf, super::CommandOutcome), ToolError> {
        let pg_dump = find_tool(PG_DUMP, self.bin_dir.as_deref())?;
        let outcome = run_command(&self.dump_command(&pg_dump))?.into_result(PG_DUMP)?;
        Ok((pg_dump, outcome))
    }
}

pub(crate) fn secs(elapsed: Duration) -> f64 {
    (elapsed.as_secs_f64() * 100.0).round() / 100.0
}
