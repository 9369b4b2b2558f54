use std::path::PathBuf;

use clap::Args;
use pgutils::{OutputFormat, PgUtilsConfig, RestoreTool};

use super::{confirm, print_value};

/// Arguments for the restore command
#[derive(Args)]
pub struct RestoreArgs {
    /// Backup file to restore from, overriding the configured one
    #[clap(short, long)]
    pub input: Option<PathBuf>,

    /// Skip the confirmation prompt
    #[clap(short = 'y', long)]
    pub yes: bool,
}

pub fn run(config: &PgUtilsConfig, args: RestoreArgs, output_format: OutputFormat) {
    let mut tool = RestoreTool::new(config);
    if let Some(path) = args.input {
        tool = tool.with_backup_file(path);
    }

    let message = format!(
        "This will drop and recreate database {} before restoring it.",
        config.connection.describe()
    );
    if !confirm(&message, args.yes, output_format) {
        return;
    }

    match tool.restore_backup() {
        Ok(report) => {
            let mut lines: Vec<String> = report
                .steps
                .iter()
                .map(|(step, outcome)| format!("{}: {}", step, outcome.command))
                .collect();
            lines.push(format!(
                "Database '{}' restored from {} in {:.2}s",
                report.dbname,
                report.backup_file.display(),
                report.elapsed_secs
            ));
            print_value(&report, output_format, &lines.join("\n"));
        }
        Err(e) => {
            eprintln!("ERROR: Restore failed: {}", e);
            std::process::exit(1);
        }
    }
}
