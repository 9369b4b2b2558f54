//! Output formatting shared by the command-line tools
//!
//! Result rows have no fixed shape, so tables are built column by column from
//! the record keys rather than derived from a struct.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::database::Record;

/// How a command prints its result
///
/// Row-returning commands (`tables`, `query`) go through [`format_records`];
/// the others print a one-line summary unless a JSON variant is chosen, in
/// which case their report struct is serialized instead.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutputFormat {
    /// Rounded `tabled` table, `NULL` for nulls, `(no rows)` when empty
    #[default]
    Table,
    /// Markdown table, same cells as `Table`
    Markdown,
    /// One JSON array of row objects, nulls as `null`
    Json,
    /// Indented JSON array
    JsonPretty,
    /// One JSON object per row, nothing at all for an empty result
    JsonLine,
    /// Header of column names then one `|`-joined line per row; a column
    /// missing from a row is an empty cell, a null is `NULL`
    Psv,
}

impl OutputFormat {
    pub fn is_json(&self) -> bool {
        matches!(self, Self::Json | Self::JsonPretty | Self::JsonLine)
    }

    /// Names accepted by `--format`, for help and error text
    pub fn all_names() -> &'static [&'static str] {
        &[
            "table",
            "markdown",
            "json",
            "json-pretty",
            "json-line",
            "psv",
        ]
    }

    /// Serialize a report; only `JsonPretty` indents, every other format is compact
    pub fn to_json<T: Serialize + ?Sized>(&self, value: &T) -> serde_json::Result<String> {
        match self {
            Self::JsonPretty => serde_json::to_string_pretty(value),
            _ => serde_json::to_string(value),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Table => "table",
            Self::Markdown => "markdown",
            Self::Json => "json",
            Self::JsonPretty => "json-pretty",
            Self::JsonLine => "json-line",
            Self::Psv => "psv",
        })
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" => Ok(Self::Table),
            "markdown" | "md" => Ok(Self::Markdown),
            "json" => Ok(Self::Json),
            "json-pretty" => Ok(Self::JsonPretty),
            "json-line" | "jsonl" => Ok(Self::JsonLine),
            "psv" => Ok(Self::Psv),
            _ => Err(format!(
                "unknown output format '{}', expected one of: {}",
                s,
                Self::all_names().join(", ")
            )),
        }
    }
}

/// Column names in first-seen order across all records
fn columns(records: &[Record]) -> Vec<String> {
    let mut cols: Vec<String> = Vec::new();
    for record in records {
        for key in record.keys() {
            if !cols.contains(key) {
                cols.push(key.clone());
            }
        }
    }
    cols
}

fn row(record: &Record, cols: &[String]) -> Vec<String> {
    cols.iter()
        .map(|c| record.get(c).map(|v| v.to_string()).unwrap_or_default())
        .collect()
}

/// Render result records in the requested format
pub fn format_records(records: &[Record], format: OutputFormat) -> serde_json::Result<String> {
    match format {
        OutputFormat::Json | OutputFormat::JsonPretty => format.to_json(records),
        OutputFormat::JsonLine => {
            let lines: serde_json::Result<Vec<String>> =
                records.iter().map(serde_json::to_string).collect();
            Ok(lines?.join("\n"))
        }
        OutputFormat::Psv => Ok(format_psv(records)),
        OutputFormat::Table | OutputFormat::Markdown => Ok(format_table(records, format)),
    }
}

fn format_psv(records: &[Record]) -> String {
    let cols = columns(records);
    let mut lines = vec![cols.join("|")];
    lines.extend(records.iter().map(|r| row(r, &cols).join("|")));
    lines.join("\n")
}

#[cfg(feature = "display")]
fn format_table(records: &[Record], format: OutputFormat) -> String {
    use tabled::builder::Builder;
    use tabled::settings::Style;

    if records.is_empty() {
        return "(no rows)".to_string();
    }

    let cols = columns(records);
    let mut builder = Builder::default();
    builder.push_record(cols.clone());
    for record in records {
        builder.push_record(row(record, &cols));
    }

    let mut table = builder.build();
    match format {
        OutputFormat::Markdown => table.with(Style::markdown()).to_string(),
        _ => table.with(Style::rounded()).to_string(),
    }
}

#[cfg(not(feature = "display"))]
fn format_table(records: &[Record], _format: OutputFormat) -> String {
    format_psv(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::SqlValue;

    fn records() -> Vec<Record> {
        ["users", "orders"]
            .iter()
            .map(|name| {
                let mut r = Record::new();
                r.insert("tablename".to_string(), SqlValue::from(*name));
                r
            })
            .collect()
    }

    #[test]
    fn test_output_format_from_str() {
        assert_eq!(
            OutputFormat::from_str("table").unwrap(),
            OutputFormat::Table
        );
        assert_eq!(
            OutputFormat::from_str("md").unwrap(),
            OutputFormat::Markdown
        );
        assert_eq!(OutputFormat::from_str("json").unwrap(), OutputFormat::Json);
        assert_eq!(
            OutputFormat::from_str("jsonl").unwrap(),
            OutputFormat::JsonLine
        );
        assert_eq!(OutputFormat::from_str("psv").unwrap(), OutputFormat::Psv);
        assert!(OutputFormat::from_str("invalid").is_err());
    }

    #[test]
    fn test_output_format_display_round_trips() {
        for name in OutputFormat::all_names() {
            let format = OutputFormat::from_str(name).unwrap();
            assert_eq!(format.to_string(), *name);
        }
    }

    #[test]
    fn test_format_records_json() {
        let out = format_records(&records(), OutputFormat::Json).unwrap();
        assert_eq!(out, r#"[{"tablename":"users"},{"tablename":"orders"}]"#);

        let out = format_records(&records(), OutputFormat::JsonLine).unwrap();
        assert_eq!(out, "{\"tablename\":\"users\"}\n{\"tablename\":\"orders\"}");
    }

    #[test]
    fn test_format_records_psv() {
        let out = format_records(&records(), OutputFormat::Psv).unwrap();
        assert_eq!(out, "tablename\nusers\norders");
    }

    #[test]
    fn test_format_records_table_contains_values() {
        let out = format_records(&records(), OutputFormat::Table).unwrap();
        assert!(out.contains("tablename"));
        assert!(out.contains("users"));
        assert!(out.contains("orders"));
    }

    #[test]
    fn test_columns_union_in_first_seen_order() {
        let mut a = Record::new();
        a.insert("id".into(), SqlValue::Int(1));
        let mut b = Record::new();
        b.insert("id".into(), SqlValue::Int(2));
        b.insert("extra".into(), SqlValue::Null);
        assert_eq!(columns(&[a.clone(), b.clone()]), vec!["id", "extra"]);
        assert_eq!(format_psv(&[a, b]), "id|extra\n1|\n2|NULL");
    }
}
