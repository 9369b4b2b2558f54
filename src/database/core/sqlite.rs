//! Embedded SQLite backend
//!
//! Used for local database files (`--sqlite`) and as the engine behind the
//! test suite, so the query wrapper can be exercised without a server.

use rusqlite::types::{ToSqlOutput, Value, ValueRef};
use rusqlite::{params_from_iter, Connection};

use super::backend::{Dialect, SqlBackend};
use super::error::{DbError, DbResult};
use super::value::{Record, SqlValue};

pub struct SqliteBackend {
    conn: Connection,
}

impl SqliteBackend {
    /// Open a database at the specified path
    ///
    /// If the path is `None`, an in-memory database is created.
    pub fn open(path: Option<&str>) -> DbResult<Self> {
        let conn = match path {
            Some(p) => Connection::open(p).map_err(|e| {
                DbError::Connect(format!("failed to open database at '{}': {}", p, e))
            })?,
            None => Connection::open_in_memory().map_err(|e| {
                DbError::Connect(format!("failed to create in-memory database: {}", e))
            })?,
        };

        let backend = SqliteBackend { conn };
        backend.configure()?;
        Ok(backend)
    }

    fn configure(&self) -> DbResult<()> {
        let _: String = self
            .conn
            .query_row("PRAGMA journal_mode=WAL", [], |row| row.get(0))?;
        self.conn.execute("PRAGMA synchronous=NORMAL", [])?;
        // DROP/DELETE semantics should match the server with FKs enforced
        self.conn.execute("PRAGMA foreign_keys=ON", [])?;
        Ok(())
    }
}

impl SqlBackend for SqliteBackend {
    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    fn begin(&mut self) -> DbResult<()> {
        self.conn.execute_batch("BEGIN")?;
        Ok(())
    }

    fn commit(&mut self) -> DbResult<()> {
        self.conn.execute_batch("COMMIT")?;
        Ok(())
    }

    fn rollback(&mut self) -> DbResult<()> {
        self.conn.execute_batch("ROLLBACK")?;
        Ok(())
    }

    fn execute(&mut self, sql: &str, params: &[SqlValue]) -> DbResult<u64> {
        let affected = self.conn.execute(sql, params_from_iter(params.iter()))?;
        Ok(affected as u64)
    }

    fn query(&mut self, sql: &str, params: &[SqlValue]) -> DbResult<Vec<Record>> {
        let mut stmt = self.conn.prepare(sql)?;
        let columns: Vec<String> = stmt
            .column_names()
            .into_iter()
            .map(|c| c.to_string())
            .collect();

        let mut rows = stmt.query(params_from_iter(params.iter()))?;
        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            let mut record = Record::with_capacity(columns.len());
            for (idx, name) in columns.iter().enumerate() {
                let value = sqlite_value(name, row.get_ref(idx)?)?;
                record.insert(name.clone(), value);
            }
            records.push(record);
        }
        Ok(records)
    }
}

fn sqlite_value(column: &str, value: ValueRef<'_>) -> DbResult<SqlValue> {
    match value {
        ValueRef::Null => Ok(SqlValue::Null),
        ValueRef::Integer(v) => Ok(SqlValue::Int(v)),
        ValueRef::Real(v) => Ok(SqlValue::Float(v)),
        ValueRef::Text(v) => {
            let text = std::str::from_utf8(v).map_err(|e| DbError::Decode {
                column: column.to_string(),
                type_name: "TEXT".to_string(),
                reason: e.to_string(),
            })?;
            Ok(SqlValue::Text(text.to_string()))
        }
        ValueRef::Blob(v) => Ok(SqlValue::Bytes(v.to_vec())),
    }
}

impl rusqlite::ToSql for SqlValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        let out = match self {
            SqlValue::Null => ToSqlOutput::Owned(Value::Null),
            SqlValue::Bool(v) => ToSqlOutput::Owned(Value::Integer(*v as i64)),
            SqlValue::Int(v) => ToSqlOutput::Owned(Value::Integer(*v)),
            SqlValue::Float(v) => ToSqlOutput::Owned(Value::Real(*v)),
            SqlValue::Text(v) => ToSqlOutput::Borrowed(ValueRef::Text(v.as_bytes())),
            SqlValue::Bytes(v) => ToSqlOutput::Borrowed(ValueRef::Blob(v.as_slice())),
            SqlValue::Json(v) => ToSqlOutput::Owned(Value::Text(v.to_string())),
        };
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_in_memory() {
        let backend = SqliteBackend::open(None);
        assert!(backend.is_ok());
    }

    #[test]
    fn test_open_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("local.sqlite3");
        let mut backend = SqliteBackend::open(path.to_str()).unwrap();
        backend
            .execute("CREATE TABLE t (id INTEGER PRIMARY KEY)", &[])
            .unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_query_decodes_each_storage_class() {
        let mut backend = SqliteBackend::open(None).unwrap();
        let rows = backend
            .query(
                "SELECT 1 AS i, 2.5 AS f, 'x' AS t, X'00FF' AS b, NULL AS n",
                &[],
            )
            .unwrap();
        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row["i"], SqlValue::Int(1));
        assert_eq!(row["f"], SqlValue::Float(2.5));
        assert_eq!(row["t"], SqlValue::Text("x".into()));
        assert_eq!(row["b"], SqlValue::Bytes(vec![0x00, 0xff]));
        assert_eq!(row["n"], SqlValue::Null);
        // column order follows the statement
        let names: Vec<&str> = row.keys().map(|k| k.as_str()).collect();
        assert_eq!(names, vec!["i", "f", "t", "b", "n"]);
    }

    #[test]
    fn test_dollar_placeholders_bind_in_order() {
        let mut backend = SqliteBackend::open(None).unwrap();
        let rows = backend
            .query(
                "SELECT $1 AS a, $2 AS b",
                &[SqlValue::from("first"), SqlValue::from(2i64)],
            )
            .unwrap();
        assert_eq!(rows[0]["a"], SqlValue::Text("first".into()));
        assert_eq!(rows[0]["b"], SqlValue::Int(2));
    }

    #[test]
    fn test_execute_rejects_bad_sql() {
        let mut backend = SqliteBackend::open(None).unwrap();
        let result = backend.execute("INSERT INTO missing VALUES (1)", &[]);
        assert!(matches!(result, Err(DbError::Sqlite(_))));
    }
}
