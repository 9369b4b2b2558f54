use clap::Args;
use pgutils::utils::format_records;
use pgutils::{AdminOps, DatabaseConn, Identifier, OutputFormat};
use serde::Serialize;

use super::{confirm, print_value};

/// Arguments for the drop-table and delete-data commands
#[derive(Args)]
pub struct TableNamesArgs {
    /// Table names, optionally schema-qualified (e.g. public.orders); case is kept
    #[clap(required = true)]
    pub tables: Vec<Identifier>,

    /// Skip the confirmation prompt
    #[clap(short = 'y', long)]
    pub yes: bool,
}

#[derive(Serialize)]
struct TableResult {
    table: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    rows_deleted: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

fn names(tables: &[Identifier]) -> String {
    tables
        .iter()
        .map(Identifier::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn run_list(db: &mut DatabaseConn, output_format: OutputFormat) {
    let outcome = match AdminOps::new(db).list_tables() {
        Ok(o) => o,
        Err(e) => {
            eprintln!("ERROR: Failed to list tables: {}", e);
            std::process::exit(1);
        }
    };

    match format_records(outcome.records(), output_format) {
        Ok(out) => println!("{}", out),
        Err(e) => eprintln!("ERROR: Failed to serialize tables: {}", e),
    }
}

pub fn run_drop(db: &mut DatabaseConn, args: TableNamesArgs, output_format: OutputFormat) {
    let TableNamesArgs { tables, yes } = args;

    let message = format!(
        "This will drop {} table(s) and everything depending on them: {}",
        tables.len(),
        names(&tables)
    );
    if !confirm(&message, yes, output_format) {
        return;
    }

    let mut ops = AdminOps::new(db);
    let results: Vec<TableResult> = tables
        .into_iter()
        .map(|table| {
            let error = ops.drop_table(table.as_str()).err().map(|e| e.to_string());
            TableResult {
                table: table.to_string(),
                rows_deleted: None,
                error,
            }
        })
        .collect();

    report(&results, output_format, |r| format!("Dropped table '{}'", r.table));
}

pub fn run_delete(db: &mut DatabaseConn, args: TableNamesArgs, output_format: OutputFormat) {
    let TableNamesArgs { tables, yes } = args;

    let message = format!(
        "This will delete all rows from {} table(s): {}",
        tables.len(),
        names(&tables)
    );
    if !confirm(&message, yes, output_format) {
        return;
    }

    let mut ops = AdminOps::new(db);
    let results: Vec<TableResult> = tables
        .into_iter()
        .map(|table| match ops.delete_data(table.as_str()) {
            Ok(n) => TableResult {
                table: table.to_string(),
                rows_deleted: Some(n),
                error: None,
            },
            Err(e) => TableResult {
                table: table.to_string(),
                rows_deleted: None,
                error: Some(e.to_string()),
            },
        })
        .collect();

    report(&results, output_format, |r| {
        format!(
            "Deleted {} rows from '{}'",
            r.rows_deleted.unwrap_or_default(),
            r.table
        )
    });
}

fn report(
    results: &[TableResult],
    output_format: OutputFormat,
    ok_line: impl Fn(&TableResult) -> String,
) {
    let text = results
        .iter()
        .map(|r| match &r.error {
            Some(e) => format!("ERROR: {}: {}", r.table, e),
            None => ok_line(r),
        })
        .collect::<Vec<_>>()
        .join("\n");
    print_value(&results, output_format, &text);

    if results.iter().any(|r| r.error.is_some()) {
        std::process::exit(1);
    }
}
