//! Backend seam between the connection handle and a concrete database client

use super::error::DbResult;
use super::value::{Record, SqlValue};

/// SQL dialect of a backend
///
/// Only the statements whose text differs between engines live here; everything
/// else is plain SQL shared by both backends. Positional parameters are written
/// as `$1`, `$2`, ... which both PostgreSQL and SQLite accept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Postgres,
    Sqlite,
}

impl Dialect {
    /// Statement listing user tables as rows with a single `tablename` column
    pub fn list_tables_sql(&self) -> &'static str {
        match self {
            Dialect::Postgres => "SELECT tablename FROM pg_tables WHERE schemaname = 'public'",
            Dialect::Sqlite => {
                "SELECT name AS tablename FROM sqlite_master \
                 WHERE type = 'table' AND name NOT LIKE 'sqlite_%'"
            }
        }
    }

    /// `DROP TABLE` for an already validated and quoted table name
    pub fn drop_table_sql(&self, table: &str) -> String {
        match self {
            Dialect::Postgres => format!("DROP TABLE IF EXISTS {} CASCADE", table),
            // SQLite has no CASCADE
            Dialect::Sqlite => format!("DROP TABLE IF EXISTS {}", table),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Dialect::Postgres => "postgres",
            Dialect::Sqlite => "sqlite",
        }
    }
}

/// A live connection to one database
///
/// Implementations run exactly the statement they are given. Transaction
/// boundaries are driven by the caller through `begin`/`commit`/`rollback`.
pub trait SqlBackend {
    fn dialect(&self) -> Dialect;

    fn begin(&mut self) -> DbResult<()>;

    fn commit(&mut self) -> DbResult<()>;

    fn rollback(&mut self) -> DbResult<()>;

    /// Run a statement that returns no rows, yielding the affected row count
    fn execute(&mut self, sql: &str, params: &[SqlValue]) -> DbResult<u64>;

    /// Run a statement and collect every result row
    fn query(&mut self, sql: &str, params: &[SqlValue]) -> DbResult<Vec<Record>>;
}
