use clap::Args;
use pgutils::utils::format_records;
use pgutils::{DatabaseConn, OutputFormat, SqlValue};
use serde_json::json;

use super::print_value;

/// Arguments for the exec and query commands
#[derive(Args)]
pub struct SqlArgs {
    /// SQL statement, with $1, $2, ... placeholders for parameters
    pub sql: String,

    /// Parameter values as a JSON array, e.g. '[1, "alice", null]'
    #[clap(short, long)]
    pub params: Option<String>,
}

fn parse_params(params: Option<&str>) -> Result<Vec<SqlValue>, String> {
    let Some(raw) = params else {
        return Ok(Vec::new());
    };
    match serde_json::from_str::<serde_json::Value>(raw) {
        Ok(serde_json::Value::Array(values)) => {
            Ok(values.into_iter().map(SqlValue::from).collect())
        }
        Ok(_) => Err("--params must be a JSON array".to_string()),
        Err(e) => Err(format!("Invalid --params JSON: {}", e)),
    }
}

fn params_or_exit(args: &SqlArgs) -> Vec<SqlValue> {
    match parse_params(args.params.as_deref()) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("ERROR: {}", e);
            std::process::exit(1);
        }
    }
}

pub fn run_exec(db: &mut DatabaseConn, args: SqlArgs, output_format: OutputFormat) {
    let params = params_or_exit(&args);

    match db.execute(&args.sql, &params) {
        Ok(affected) => print_value(
            &json!({ "rows_affected": affected }),
            output_format,
            &format!("OK ({} rows affected)", affected),
        ),
        Err(e) => {
            eprintln!("ERROR: {}", e);
            std::process::exit(1);
        }
    }
}

pub fn run_query(db: &mut DatabaseConn, args: SqlArgs, output_format: OutputFormat) {
    let params = params_or_exit(&args);

    let outcome = match db.fetch(&args.sql, &params) {
        Ok(o) => o,
        Err(e) => {
            eprintln!("ERROR: {}", e);
            std::process::exit(1);
        }
    };

    if outcome.is_empty() && !output_format.is_json() {
        println!("(no rows)");
        return;
    }

    match format_records(outcome.records(), output_format) {
        Ok(out) => println!("{}", out),
        Err(e) => eprintln!("ERROR: Failed to serialize rows: {}", e),
    }
}
