//! Database restore through `psql` and `pg_restore`
//!
//! The target database is dropped and recreated from the `postgres`
//! maintenance database before the dump is loaded, so the restore always
//! starts from an empty database. The first failing step stops the restore.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::info;

use super::backup::secs;
use super::runner::{run_command, CommandOutcome, CommandSpec};
use super::{find_tool, timed, ToolError, ToolTarget};
use crate::config::PgUtilsConfig;
use crate::database::Identifier;

pub const PG_RESTORE: &str = "pg_restore";
pub const PSQL: &str = "psql";

/// Database psql connects to while the target is dropped and recreated
const MAINTENANCE_DB: &str = "postgres";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RestoreStep {
    DropDatabase,
    CreateDatabase,
    Restore,
}

impl std::fmt::Display for RestoreStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RestoreStep::DropDatabase => write!(f, "drop database"),
            RestoreStep::CreateDatabase => write!(f, "create database"),
            RestoreStep::Restore => write!(f, "restore"),
        }
    }
}

/// Result of a successful restore, one entry per step in execution order
#[derive(Debug, Clone, Serialize)]
pub struct RestoreReport {
    pub dbname: String,
    pub backup_file: PathBuf,
    pub steps: Vec<(RestoreStep, CommandOutcome)>,
    pub elapsed_secs: f64,
}

/// Recreates the configured database from a custom-format dump
#[derive(Debug, Clone)]
pub struct RestoreTool {
    target: ToolTarget,
    backup_file: PathBuf,
    bin_dir: Option<String>,
}

impl RestoreTool {
    pub fn new(config: &PgUtilsConfig) -> Self {
        Self {
            target: ToolTarget::from_config(&config.connection),
            backup_file: PathBuf::from(&config.backup_file),
            bin_dir: config.bin_dir.clone(),
        }
    }

    /// Restore from somewhere other than the configured backup file
    pub fn with_backup_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.backup_file = path.into();
        self
    }

    /// Database and owner names end up in SQL text, so both must be plain identifiers
    fn names(&self) -> Result<(Identifier, Identifier), ToolError> {
        Ok((
            Identifier::parse(&self.target.dbname)?,
            Identifier::parse(&self.target.user)?,
        ))
    }

    pub fn drop_database_command(&self, psql: &Path) -> Result<CommandSpec, ToolError> {
        let (dbname, _) = self.names()?;
        Ok(CommandSpec::new(psql)
            .args(self.target.connection_args(MAINTENANCE_DB))
            .arg("-c")
            .arg(format!("DROP DATABASE IF EXISTS {};", dbname.quoted()))
            .envs(self.target.env()))
    }

    pub fn create_database_command(&self, psql: &Path) -> Result<CommandSpec, ToolError> {
        let (dbname, owner) = self.names()?;
        Ok(CommandSpec::new(psql)
            .args(self.target.connection_args(MAINTENANCE_DB))
            .arg("-c")
            .arg(format!(
                "CREATE DATABASE {} WITH OWNER = {} ENCODING = 'UTF8' TEMPLATE = template0;",
                dbname.quoted(),
                owner.quoted()
            ))
            .envs(self.target.env()))
    }

    /// `pg_restore <conn> -v --no-owner FILE`
    pub fn restore_command(&self, pg_restore: &Path) -> CommandSpec {
        CommandSpec::new(pg_restore)
            .args(self.target.connection_args(&self.target.dbname))
            .args(["-v", "--no-owner"])
            .arg(self.backup_file.to_string_lossy())
            .envs(self.target.env())
    }

    pub fn restore_backup(&self) -> Result<RestoreReport, ToolError> {
        let (result, elapsed) = timed("restore", || self.run());
        let steps = result?;
        info!("restore of {} completed", self.target.dbname);

        Ok(RestoreReport {
            dbname: self.target.dbname.clone(),
            backup_file: self.backup_file.clone(),
            steps,
            elapsed_secs: secs(elapsed),
        })
    }

    fn run(&self) -> Result<Vec<(RestoreStep, CommandOutcome)>, ToolError> {
        // validate names before touching anything
        self.names()?;
        let pg_restore = find_tool(PG_RESTORE, self.bin_dir.as_deref())?;
        let psql = find_tool(PSQL, self.bin_dir.as_deref())?;

        let plan = [
            (
                RestoreStep::DropDatabase,
                PSQL,
                self.drop_database_command(&psql)?,
            ),
            (
                RestoreStep::CreateDatabase,
                PSQL,
                self.create_database_command(&psql)?,
            ),
            (
                RestoreStep::Restore,
                PG_RESTORE,
                self.restore_command(&pg_restore),
            ),
        ];

        let mut steps = Vec::with_capacity(plan.len());
        for (step, program, spec) in plan {
            info!("restore step: {}", step);
            let outcome = run_command(&spec)?.into_result(program)?;
            steps.push((step, outcome));
        }
        Ok(steps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(pairs: &[(&str, &str)]) -> PgUtilsConfig {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        PgUtilsConfig::load(None, env).unwrap()
    }

    fn shop_tool() -> RestoreTool {
        RestoreTool::new(&config(&[
            ("host", "db.internal"),
            ("dbname", "shop"),
            ("user", "admin"),
            ("password", "s3cret"),
            ("db_backup", "shop.dump"),
        ]))
    }

    #[test]
    fn test_psql_commands_use_maintenance_database() {
        let tool = shop_tool();
        let drop = tool.drop_database_command(Path::new("psql")).unwrap();
        assert_eq!(
            drop.args,
            vec![
                "-h",
                "db.internal",
                "-p",
                "5432",
                "-U",
                "admin",
                "-d",
                "postgres",
                "-c",
                "DROP DATABASE IF EXISTS \"shop\";"
            ]
        );

        let create = tool.create_database_command(Path::new("psql")).unwrap();
        assert_eq!(
            create.args.last().map(String::as_str),
            Some("CREATE DATABASE \"shop\" WITH OWNER = \"admin\" ENCODING = 'UTF8' TEMPLATE = template0;")
        );
        assert_eq!(
            create.env,
            vec![("PGPASSWORD".to_string(), "s3cret".to_string())]
        );
    }

    #[test]
    fn test_restore_command_flags() {
        let spec = shop_tool().restore_command(Path::new("pg_restore"));
        assert_eq!(
            spec.display(),
            "pg_restore -h db.internal -p 5432 -U admin -d shop -v --no-owner shop.dump"
        );
    }

    #[test]
    fn test_mixed_case_database_is_targeted_consistently() {
        let tool = RestoreTool::new(&config(&[("dbname", "ShopDb"), ("user", "Admin")]));
        let drop = tool.drop_database_command(Path::new("psql")).unwrap();
        assert_eq!(
            drop.args.last().map(String::as_str),
            Some("DROP DATABASE IF EXISTS \"ShopDb\";")
        );
        let create = tool.create_database_command(Path::new("psql")).unwrap();
        assert!(create
            .args
            .last()
            .unwrap()
            .starts_with("CREATE DATABASE \"ShopDb\" WITH OWNER = \"Admin\""));
        // connection arguments are taken literally, so they need no quoting
        let restore = tool.restore_command(Path::new("pg_restore"));
        assert!(restore.display().contains("-d ShopDb "));
    }

    #[test]
    fn test_unsafe_database_name_is_rejected() {
        let tool = RestoreTool::new(&config(&[("dbname", "shop; DROP DATABASE prod")]));
        let err = tool.drop_database_command(Path::new("psql")).unwrap_err();
        assert!(matches!(err, ToolError::Identifier(_)));
        assert!(matches!(tool.restore_backup(), Err(ToolError::Identifier(_))));
    }

    #[cfg(unix)]
    fn stub(dir: &Path, name: &str, body: &str) {
        use std::os::unix::fs::PermissionsExt;
        let path = dir.join(name);
        std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    }

    #[test]
    #[cfg(unix)]
    fn test_restore_runs_every_step() {
        let bin = tempfile::tempdir().unwrap();
        stub(bin.path(), PSQL, "echo psql ok");
        stub(bin.path(), PG_RESTORE, "echo restored");

        let mut cfg = config(&[("dbname", "shop")]);
        cfg.bin_dir = Some(bin.path().to_string_lossy().to_string());

        let report = RestoreTool::new(&cfg).restore_backup().unwrap();
        let steps: Vec<RestoreStep> = report.steps.iter().map(|(s, _)| *s).collect();
        assert_eq!(
            steps,
            vec![
                RestoreStep::DropDatabase,
                RestoreStep::CreateDatabase,
                RestoreStep::Restore
            ]
        );
        assert_eq!(report.steps[2].1.stdout.trim(), "restored");
    }

    #[test]
    #[cfg(unix)]
    fn test_restore_stops_at_first_failure() {
        let bin = tempfile::tempdir().unwrap();
        let marker = bin.path().join("restore-ran");
        stub(
            bin.path(),
            PSQL,
            "case \"$*\" in *CREATE*) echo 'permission denied' >&2; exit 2;; esac",
        );
        stub(
            bin.path(),
            PG_RESTORE,
            &format!("touch '{}'", marker.display()),
        );

        let mut cfg = config(&[("dbname", "shop")]);
        cfg.bin_dir = Some(bin.path().to_string_lossy().to_string());

        match RestoreTool::new(&cfg).restore_backup() {
            Err(ToolError::Failed { program, code, .. }) => {
                assert_eq!(program, "psql");
                assert_eq!(code, Some(2));
            }
            other => panic!("expected psql failure, got {:?}", other),
        }
        assert!(!marker.exists());
    }
}
