//! Statement execution on top of the connection handle
//!
//! - [`DatabaseConn::execute`] runs one mutating statement in its own
//!   transaction: committed on success, rolled back on failure.
//! - [`DatabaseConn::fetch`] runs one read-only statement and returns every
//!   row as a [`Record`].
//!
//! Failures are logged and returned to the caller; nothing here retries.

use serde::{Serialize, Serializer};
use tracing::{error, info, warn};

use crate::database::core::{DatabaseConn, DbResult, Record, SqlValue};

/// Successful result of a read-only statement
///
/// A failed statement is an `Err`, so "no rows" and "query failed" can never
/// be confused.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    Rows(Vec<Record>),
    Empty,
}

impl FetchOutcome {
    fn from_records(records: Vec<Record>) -> Self {
        if records.is_empty() {
            FetchOutcome::Empty
        } else {
            FetchOutcome::Rows(records)
        }
    }

    pub fn records(&self) -> &[Record] {
        match self {
            FetchOutcome::Rows(records) => records,
            FetchOutcome::Empty => &[],
        }
    }

    pub fn into_records(self) -> Vec<Record> {
        match self {
            FetchOutcome::Rows(records) => records,
            FetchOutcome::Empty => Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.records().len()
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, FetchOutcome::Empty)
    }
}

/// Serializes as the list of records; `Empty` becomes `[]`.
impl Serialize for FetchOutcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.records().serialize(serializer)
    }
}

impl DatabaseConn {
    /// Run a mutating statement (DDL or DML) inside a transaction
    ///
    /// Parameter values are bound, never interpolated. Returns the number of
    /// affected rows. On failure the transaction is rolled back and the
    /// statement's error is returned.
    pub fn execute(&mut self, statement: &str, params: &[SqlValue]) -> DbResult<u64> {
        let mut cursor = self.cursor();

        let result = cursor.begin().and_then(|_| {
            let affected = cursor.execute(statement, params)?;
            cursor.commit()?;
            Ok(affected)
        });

        match result {
            Ok(affected) => {
                info!("statement executed: {} ({} rows)", statement, affected);
                Ok(affected)
            }
            Err(e) => {
                if let Err(rollback_err) = cursor.rollback() {
                    warn!("rollback failed: {}", rollback_err);
                }
                error!("statement failed: {}: {}", statement, e);
                Err(e)
            }
        }
    }

    /// Run a read-only statement and collect every result row
    ///
    /// No transaction control is issued.
    pub fn fetch(&mut self, statement: &str, params: &[SqlValue]) -> DbResult<FetchOutcome> {
        let mut cursor = self.cursor();
        match cursor.query(statement, params) {
            Ok(records) => Ok(FetchOutcome::from_records(records)),
            Err(e) => {
                error!("query failed: {}: {}", statement, e);
                Err(e)
            }
        }
    }
}
