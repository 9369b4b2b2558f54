//! Database module
//!
//! This module provides all database functionality for pgutils, organized into:
//!
//! - **core**: connection handle, scoped cursor and the backend seam
//! - **query**: transactional statement execution and row fetching
//! - **admin**: named maintenance operations built on the query layer
//! - **identifier**: validation for names that must be written into SQL text
//!
//! # Architecture
//!
//! ```text
//! database/
//! ├── core/           # Foundation
//! │   ├── connection  # DatabaseConn handle and Cursor guard
//! │   ├── backend     # SqlBackend trait and Dialect
//! │   ├── pg          # PostgreSQL backend (postgres crate)
//! │   └── sqlite      # Embedded backend (rusqlite)
//! │
//! ├── query           # execute (commit/rollback) and fetch
//! ├── admin           # drop/list/delete tables, migration bookkeeping
//! └── identifier      # allow-listed SQL identifiers
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use pgutils::config::ConnectionConfig;
//! use pgutils::database::{AdminOps, DatabaseConn, MigrationEntry};
//!
//! let mut db = DatabaseConn::connect(&ConnectionConfig::default())?;
//!
//! let tables = AdminOps::new(&mut db).list_tables()?;
//! for record in tables.records() {
//!     println!("{}", record["tablename"]);
//! }
//!
//! AdminOps::new(&mut db).drop_table("orders")?;
//! let report = AdminOps::new(&mut db)
//!     .remove_migration_entries(&[MigrationEntry::new("app1", "0001_initial")]);
//! ```

pub mod admin;
pub mod core;
pub mod identifier;
pub mod query;

pub use admin::{AdminOps, MigrationEntry, MigrationRemoval, MigrationRemovalReport};
pub use core::{
    Cursor, DatabaseConn, DbError, DbResult, Dialect, PostgresBackend, Record, SqlBackend,
    SqlValue, SqliteBackend,
};
pub use identifier::Identifier;
pub use query::FetchOutcome;
