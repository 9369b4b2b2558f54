use thiserror::Error;

use super::pg::describe_pg_error;

pub type DbResult<T> = std::result::Result<T, DbError>;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("connection error: {0}")]
    Connect(String),

    /// Rendered with the server's severity, SQLSTATE, message and detail
    #[error("postgres error: {}", describe_pg_error(.0))]
    Postgres(#[from] postgres::Error),

    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("invalid identifier '{name}': {reason}")]
    InvalidIdentifier { name: String, reason: String },

    #[error("cannot decode column '{column}' of type {type_name}: {reason}")]
    Decode {
        column: String,
        type_name: String,
        reason: String,
    },
}
