#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

//! pgutils - small administrative utilities for PostgreSQL
//!
//! pgutils bundles three tools behind one library and one command-line binary:
//! a thin query wrapper for maintenance statements, a `pg_dump` backup invoker
//! and a `pg_restore` restore invoker.
//!
//! # Feature Flags
//!
//! | Feature | Description | Key Dependencies |
//! |---------|-------------|------------------|
//! | (none) | Query wrapper, admin operations, dump/restore tools | `postgres`, `rusqlite` |
//! | `display` | Table formatting with `tabled` | `tabled` |
//! | `cli` | The `pgutils` binary | All above + `clap`, `tracing-subscriber` |
//!
//! # Architecture
//!
//! - **[`database`]**: connection handle, scoped cursor, transactional
//!   execute/fetch and the administrative operations built on them
//! - **[`tools`]**: `pg_dump`, `pg_restore` and `psql` invocation
//! - **[`config`]**: configuration from file and environment
//! - **[`utils`]**: output formatting
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use pgutils::{AdminOps, DatabaseConn, FetchOutcome, PgUtilsConfig};
//!
//! let config = PgUtilsConfig::new(&None)?;
//! let mut db = DatabaseConn::connect(&config.connection)?;
//!
//! // Statements run in their own transaction and roll back on failure
//! db.execute("INSERT INTO audit (note) VALUES ($1)", &["cleanup".into()])?;
//!
//! // Fetch distinguishes "no rows" from failure
//! match db.fetch("SELECT id FROM audit", &[])? {
//!     FetchOutcome::Rows(rows) => println!("{} rows", rows.len()),
//!     FetchOutcome::Empty => println!("no rows"),
//! }
//!
//! let mut ops = AdminOps::new(&mut db);
//! ops.delete_data("audit")?;
//! ops.drop_table("legacy_audit")?;
//! ```
//!
//! ## Backup and Restore
//!
//! ```rust,ignore
//! use pgutils::{BackupTool, PgUtilsConfig, RestoreTool};
//!
//! let config = PgUtilsConfig::new(&None)?;
//! let report = BackupTool::new(&config).create_backup()?;
//! println!("backup took {:.2}s", report.elapsed_secs);
//!
//! RestoreTool::new(&config).restore_backup()?;
//! ```

pub mod config;
pub mod database;
pub mod tools;
pub mod utils;

pub use config::{ConnectionConfig, PgUtilsConfig};

pub use database::{
    AdminOps, Cursor, DatabaseConn, DbError, DbResult, Dialect, FetchOutcome, Identifier,
    MigrationEntry, MigrationRemovalReport, Record, SqlValue,
};

pub use tools::{BackupReport, BackupTool, RestoreReport, RestoreTool, ToolError};

pub use utils::OutputFormat;
