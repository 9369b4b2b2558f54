//! Database connection management
//!
//! This module provides the connection handle used by every query in pgutils,
//! and the scoped cursor each statement runs through.

use tracing::{debug, error, info};

use super::backend::{Dialect, SqlBackend};
use super::error::DbResult;
use super::pg::PostgresBackend;
use super::sqlite::SqliteBackend;
use super::value::{Record, SqlValue};
use crate::config::ConnectionConfig;

/// Core database connection handle
///
/// `DatabaseConn` owns exactly one live connection for its whole lifetime.
/// All statement execution goes through a [`Cursor`] borrowed from it, so the
/// borrow checker rules out two statements interleaving on one connection.
pub struct DatabaseConn {
    backend: Box<dyn SqlBackend>,
    cursors_acquired: u64,
    cursors_released: u64,
}

impl DatabaseConn {
    /// Connect to a PostgreSQL server
    ///
    /// A failure here is not retried; callers that cannot work without a
    /// database should treat it as fatal.
    pub fn connect(config: &ConnectionConfig) -> DbResult<Self> {
        match PostgresBackend::connect(config) {
            Ok(backend) => {
                info!("connected to {}", config.describe());
                Ok(Self::from_backend(Box::new(backend)))
            }
            Err(e) => {
                error!("{}", e);
                Err(e)
            }
        }
    }

    /// Open a SQLite database at the specified path
    ///
    /// If the path is `None`, an in-memory database is created.
    pub fn open(path: Option<&str>) -> DbResult<Self> {
        let backend = SqliteBackend::open(path)?;
        info!("opened sqlite database {}", path.unwrap_or(":memory:"));
        Ok(Self::from_backend(Box::new(backend)))
    }

    /// Open a SQLite database file (convenience method)
    pub fn open_path(path: &str) -> DbResult<Self> {
        Self::open(Some(path))
    }

    /// Create an in-memory SQLite database
    pub fn open_in_memory() -> DbResult<Self> {
        Self::open(None)
    }

    /// Wrap an already connected backend
    pub fn from_backend(backend: Box<dyn SqlBackend>) -> Self {
        DatabaseConn {
            backend,
            cursors_acquired: 0,
            cursors_released: 0,
        }
    }

    pub fn dialect(&self) -> Dialect {
        self.backend.dialect()
    }

    /// Acquire a cursor for one statement
    ///
    /// The cursor is released when it goes out of scope, on every exit path.
    pub fn cursor(&mut self) -> Cursor<'_> {
        self.cursors_acquired += 1;
        let id = self.cursors_acquired;
        debug!("cursor {} acquired", id);
        Cursor { conn: self, id }
    }

    /// Number of cursors acquired but not yet released
    pub fn open_cursors(&self) -> u64 {
        self.cursors_acquired - self.cursors_released
    }
}

/// A cursor bound to a [`DatabaseConn`] for the duration of one statement
///
/// Rows come back as mapping-typed [`Record`]s rather than positional tuples.
pub struct Cursor<'c> {
    conn: &'c mut DatabaseConn,
    id: u64,
}

impl Cursor<'_> {
    pub fn begin(&mut self) -> DbResult<()> {
        self.conn.backend.begin()
    }

    pub fn commit(&mut self) -> DbResult<()> {
        self.conn.backend.commit()
    }

    pub fn rollback(&mut self) -> DbResult<()> {
        self.conn.backend.rollback()
    }

    pub fn execute(&mut self, sql: &str, params: &[SqlValue]) -> DbResult<u64> {
        self.conn.backend.execute(sql, params)
    }

    pub fn query(&mut self, sql: &str, params: &[SqlValue]) -> DbResult<Vec<Record>> {
        self.conn.backend.query(sql, params)
    }
}

impl Drop for Cursor<'_> {
    fn drop(&mut self) {
        self.conn.cursors_released += 1;
        debug!("cursor {} released", self.id);
    }
}
