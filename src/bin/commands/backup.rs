use std::path::PathBuf;

use clap::Args;
use pgutils::{BackupTool, OutputFormat, PgUtilsConfig};

use super::print_value;

/// Arguments for the backup command
#[derive(Args)]
pub struct BackupArgs {
    /// Backup file to write, overriding the configured one
    #[clap(short, long)]
    pub output: Option<PathBuf>,
}

pub fn run(config: &PgUtilsConfig, args: BackupArgs, output_format: OutputFormat) {
    let mut tool = BackupTool::new(config);
    if let Some(path) = args.output {
        tool = tool.with_backup_file(path);
    }

    if !output_format.is_json() {
        eprintln!(
            "Backing up {} to {} ...",
            config.connection.describe(),
            tool.backup_file().display()
        );
    }

    match tool.create_backup() {
        Ok(report) => print_value(
            &report,
            output_format,
            &format!(
                "Backup written to {} in {:.2}s",
                report.backup_file.display(),
                report.elapsed_secs
            ),
        ),
        Err(e) => {
            eprintln!("ERROR: Backup failed: {}", e);
            std::process::exit(1);
        }
    }
}
