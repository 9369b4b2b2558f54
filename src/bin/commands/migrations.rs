use std::path::PathBuf;

use clap::Args;
use pgutils::{AdminOps, DatabaseConn, MigrationEntry, OutputFormat};

use super::print_value;

/// Arguments for the remove-migrations command
#[derive(Args)]
pub struct RemoveMigrationsArgs {
    /// Entries as APP:MIGRATION, e.g. auth:0012_alter_user_first_name_max_length
    pub entries: Vec<String>,

    /// JSON file holding a list of {"app_name": ..., "migration_name": ...} objects
    #[clap(long)]
    pub file: Option<PathBuf>,
}

fn collect_entries(args: RemoveMigrationsArgs) -> Result<Vec<MigrationEntry>, String> {
    let mut entries = Vec::new();

    if let Some(path) = &args.file {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
        let from_file: Vec<MigrationEntry> = serde_json::from_str(&content)
            .map_err(|e| format!("Invalid migration list in {}: {}", path.display(), e))?;
        entries.extend(from_file);
    }

    for pair in &args.entries {
        match MigrationEntry::parse_pair(pair) {
            Some(entry) => entries.push(entry),
            None => return Err(format!("Invalid entry '{}', expected APP:MIGRATION", pair)),
        }
    }

    if entries.is_empty() {
        return Err("No migration entries given".to_string());
    }
    Ok(entries)
}

pub fn run(db: &mut DatabaseConn, args: RemoveMigrationsArgs, output_format: OutputFormat) {
    let entries = match collect_entries(args) {
        Ok(e) => e,
        Err(e) => {
            eprintln!("ERROR: {}", e);
            std::process::exit(1);
        }
    };

    let report = AdminOps::new(db).remove_migration_entries(&entries);

    let mut lines: Vec<String> = report
        .results
        .iter()
        .map(|r| match (&r.error, r.removed) {
            (Some(e), _) => format!(
                "ERROR: {}:{}: {}",
                r.entry.app_name, r.entry.migration_name, e
            ),
            (None, n) => format!(
                "{}:{} removed ({} rows)",
                r.entry.app_name,
                r.entry.migration_name,
                n.unwrap_or_default()
            ),
        })
        .collect();
    lines.push(format!(
        "{} rows removed, {} failed",
        report.removed_rows(),
        report.failures().count()
    ));
    print_value(&report, output_format, &lines.join("\n"));

    if !report.all_succeeded() {
        std::process::exit(1);
    }
}
