//! Administrative operations
//!
//! Named maintenance operations built entirely on [`DatabaseConn::execute`] and
//! [`DatabaseConn::fetch`]: dropping tables, listing tables, emptying tables and
//! removing Django migration bookkeeping rows.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::database::core::{DatabaseConn, DbResult, SqlValue};
use crate::database::identifier::Identifier;
use crate::database::query::FetchOutcome;

/// Django keeps one row per applied migration here
const DELETE_MIGRATION_SQL: &str = "DELETE FROM django_migrations WHERE app = $1 AND name = $2";

/// One migration bookkeeping row, identified by application and migration name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationEntry {
    pub app_name: String,
    pub migration_name: String,
}

impl MigrationEntry {
    pub fn new(app_name: impl Into<String>, migration_name: impl Into<String>) -> Self {
        Self {
            app_name: app_name.into(),
            migration_name: migration_name.into(),
        }
    }

    /// Parse the `app:migration` shorthand used on the command line
    pub fn parse_pair(s: &str) -> Option<Self> {
        let (app, name) = s.split_once(':')?;
        if app.is_empty() || name.is_empty() {
            return None;
        }
        Some(Self::new(app, name))
    }
}

/// Outcome of removing one migration entry
#[derive(Debug, Clone, Serialize)]
pub struct MigrationRemoval {
    pub entry: MigrationEntry,
    /// Rows deleted, or `None` when the statement failed
    pub removed: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Per-entry results of [`AdminOps::remove_migration_entries`]
#[derive(Debug, Clone, Default, Serialize)]
pub struct MigrationRemovalReport {
    pub results: Vec<MigrationRemoval>,
}

impl MigrationRemovalReport {
    pub fn removed_rows(&self) -> u64 {
        self.results.iter().filter_map(|r| r.removed).sum()
    }

    pub fn failures(&self) -> impl Iterator<Item = &MigrationRemoval> {
        self.results.iter().filter(|r| r.error.is_some())
    }

    pub fn all_succeeded(&self) -> bool {
        self.failures().next().is_none()
    }
}

/// Administrative operations over one connection handle
pub struct AdminOps<'a> {
    db: &'a mut DatabaseConn,
}

impl<'a> AdminOps<'a> {
    pub fn new(db: &'a mut DatabaseConn) -> Self {
        Self { db }
    }

    /// Drop a table and everything depending on it; a missing table is not an error
    pub fn drop_table(&mut self, name: &str) -> DbResult<()> {
        let table = Identifier::parse(name)?;
        let sql = self.db.dialect().drop_table_sql(&table.quoted());
        self.db.execute(&sql, &[])?;
        info!("table '{}' dropped (if it existed)", table);
        Ok(())
    }

    /// List the user tables as records with a single `tablename` column
    pub fn list_tables(&mut self) -> DbResult<FetchOutcome> {
        let sql = self.db.dialect().list_tables_sql();
        self.db.fetch(sql, &[])
    }

    /// Convenience over [`AdminOps::list_tables`] returning just the names
    pub fn table_names(&mut self) -> DbResult<Vec<String>> {
        Ok(self
            .list_tables()?
            .records()
            .iter()
            .filter_map(|r| r.get("tablename").and_then(SqlValue::as_str))
            .map(|s| s.to_string())
            .collect())
    }

    /// Delete every row of a table, keeping its structure
    pub fn delete_data(&mut self, name: &str) -> DbResult<u64> {
        let table = Identifier::parse(name)?;
        let removed = self.db.execute(&format!("DELETE FROM {}", table.quoted()), &[])?;
        info!("deleted {} rows from table '{}'", removed, table);
        Ok(removed)
    }

    /// Remove migration bookkeeping rows, one statement per entry
    ///
    /// Entries are processed in order. A failing entry is recorded in the
    /// report and does not stop the remaining ones.
    pub fn remove_migration_entries(
        &mut self,
        entries: &[MigrationEntry],
    ) -> MigrationRemovalReport {
        let mut report = MigrationRemovalReport::default();
        for entry in entries {
            let params = [
                SqlValue::from(entry.app_name.as_str()),
                SqlValue::from(entry.migration_name.as_str()),
            ];
            let result = match self.db.execute(DELETE_MIGRATION_SQL, &params) {
                Ok(removed) => {
                    info!(
                        "migration entry {}:{} removed ({} rows)",
                        entry.app_name, entry.migration_name, removed
                    );
                    MigrationRemoval {
                        entry: entry.clone(),
                        removed: Some(removed),
                        error: None,
                    }
                }
                Err(e) => {
                    warn!(
                        "could not remove migration entry {}:{}: {}",
                        entry.app_name, entry.migration_name, e
                    );
                    MigrationRemoval {
                        entry: entry.clone(),
                        removed: None,
                        error: Some(e.to_string()),
                    }
                }
            };
            report.results.push(result);
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::core::DbError;

    fn setup() -> DatabaseConn {
        let mut db = DatabaseConn::open_in_memory().unwrap();
        db.execute("CREATE TABLE users (id INTEGER PRIMARY KEY)", &[])
            .unwrap();
        db.execute(
            "CREATE TABLE orders (id INTEGER PRIMARY KEY, amount INTEGER)",
            &[],
        )
        .unwrap();
        db
    }

    fn sorted_tables(db: &mut DatabaseConn) -> Vec<String> {
        let mut names = AdminOps::new(db).table_names().unwrap();
        names.sort();
        names
    }

    #[test]
    fn test_list_then_drop() {
        let mut db = setup();
        let outcome = AdminOps::new(&mut db).list_tables().unwrap();
        assert_eq!(outcome.len(), 2);
        for record in outcome.records() {
            assert_eq!(record.len(), 1);
            assert!(record.contains_key("tablename"));
        }
        assert_eq!(sorted_tables(&mut db), vec!["orders", "users"]);

        AdminOps::new(&mut db).drop_table("users").unwrap();
        let outcome = AdminOps::new(&mut db).list_tables().unwrap();
        assert_eq!(outcome.len(), 1);
        assert_eq!(
            outcome.records()[0]["tablename"],
            SqlValue::Text("orders".into())
        );
    }

    #[test]
    fn test_drop_table_is_idempotent() {
        let mut db = setup();
        let mut ops = AdminOps::new(&mut db);
        ops.drop_table("users").unwrap();
        ops.drop_table("users").unwrap();
        ops.drop_table("never_existed").unwrap();
        assert_eq!(sorted_tables(&mut db), vec!["orders"]);
    }

    #[test]
    fn test_delete_data_keeps_table() {
        let mut db = setup();
        db.execute(
            "INSERT INTO orders (id, amount) VALUES (1, 10), (2, 20), (3, 30)",
            &[],
        )
        .unwrap();

        let removed = AdminOps::new(&mut db).delete_data("orders").unwrap();
        assert_eq!(removed, 3);

        let rows = db.fetch("SELECT * FROM orders", &[]).unwrap();
        assert!(rows.is_empty());
        assert!(sorted_tables(&mut db).contains(&"orders".to_string()));
    }

    #[test]
    fn test_mixed_case_table_round_trip() {
        let mut db = setup();
        db.execute("CREATE TABLE \"ShopOrders\" (id INTEGER PRIMARY KEY)", &[])
            .unwrap();
        db.execute("INSERT INTO \"ShopOrders\" (id) VALUES (1), (2)", &[])
            .unwrap();

        let names = sorted_tables(&mut db);
        assert!(names.contains(&"ShopOrders".to_string()));

        let mut ops = AdminOps::new(&mut db);
        assert_eq!(ops.delete_data("ShopOrders").unwrap(), 2);
        ops.drop_table("ShopOrders").unwrap();
        assert_eq!(sorted_tables(&mut db), vec!["orders", "users"]);
    }

    #[test]
    fn test_invalid_table_name_is_rejected_before_running() {
        let mut db = setup();
        let err = AdminOps::new(&mut db)
            .drop_table("users; DROP TABLE orders")
            .unwrap_err();
        assert!(matches!(err, DbError::InvalidIdentifier { .. }));
        assert!(AdminOps::new(&mut db)
            .delete_data("orders WHERE 1=1")
            .is_err());
        assert_eq!(sorted_tables(&mut db), vec!["orders", "users"]);
        assert_eq!(db.open_cursors(), 0);
    }

    #[test]
    fn test_remove_migration_entries() {
        let mut db = DatabaseConn::open_in_memory().unwrap();
        db.execute(
            "CREATE TABLE django_migrations (id INTEGER PRIMARY KEY, app TEXT NOT NULL, name TEXT NOT NULL)",
            &[],
        )
        .unwrap();
        db.execute(
            "INSERT INTO django_migrations (app, name) VALUES \
             ('app1', '0001_initial'), ('app1', '0002_more'), ('app2', '0001_initial')",
            &[],
        )
        .unwrap();

        let report = AdminOps::new(&mut db)
            .remove_migration_entries(&[MigrationEntry::new("app1", "0001_initial")]);
        assert!(report.all_succeeded());
        assert_eq!(report.removed_rows(), 1);

        let rows = db
            .fetch("SELECT app, name FROM django_migrations ORDER BY id", &[])
            .unwrap()
            .into_records();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["name"], SqlValue::Text("0002_more".into()));
        assert_eq!(rows[1]["app"], SqlValue::Text("app2".into()));
    }

    #[test]
    fn test_remove_migration_entries_continues_past_failure() {
        let mut db = DatabaseConn::open_in_memory().unwrap();
        // no bookkeeping table: every entry fails, and every entry is attempted
        let entries = vec![
            MigrationEntry::new("app1", "0001_initial"),
            MigrationEntry::new("app2", "0001_initial"),
        ];
        let report = AdminOps::new(&mut db).remove_migration_entries(&entries);
        assert_eq!(report.results.len(), 2);
        assert_eq!(report.failures().count(), 2);
        assert_eq!(report.removed_rows(), 0);
        assert_eq!(db.open_cursors(), 0);
    }

    #[test]
    fn test_migration_entry_deserialize_and_parse() {
        let entries: Vec<MigrationEntry> = serde_json::from_str(
            r#"[{"app_name": "app1", "migration_name": "0001_initial"}]"#,
        )
        .unwrap();
        assert_eq!(entries, vec![MigrationEntry::new("app1", "0001_initial")]);

        assert_eq!(
            MigrationEntry::parse_pair("auth:0012_alter_user"),
            Some(MigrationEntry::new("auth", "0012_alter_user"))
        );
        assert_eq!(MigrationEntry::parse_pair("auth"), None);
        assert_eq!(MigrationEntry::parse_pair(":0001"), None);
    }
}
