//! Core database infrastructure
//!
//! This module provides the foundational database components used throughout pgutils:
//! - `DatabaseConn`: connection handle owning one live connection
//! - `Cursor`: scoped cursor acquired per statement
//! - `SqlBackend`/`Dialect`: the seam between the handle and a concrete client
//! - `SqlValue`/`Record`: parameter and row values

mod backend;
mod connection;
mod error;
mod pg;
mod sqlite;
mod value;

pub use backend::{Dialect, SqlBackend};
pub use connection::{Cursor, DatabaseConn};
pub use error::{DbError, DbResult};
pub use pg::PostgresBackend;
pub use sqlite::SqliteBackend;
pub use value::{Record, SqlValue};
