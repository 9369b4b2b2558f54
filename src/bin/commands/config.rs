use clap::Args;
use pgutils::{OutputFormat, PgUtilsConfig};

use super::print_value;

/// Arguments for the config command
#[derive(Args)]
pub struct ConfigArgs {
    /// Only print the path of the default configuration file
    #[clap(long)]
    pub path: bool,
}

pub fn run(config: &PgUtilsConfig, args: ConfigArgs, output_format: OutputFormat) {
    if args.path {
        println!("{}", PgUtilsConfig::config_file_path());
        return;
    }

    let summary = config.summary();
    let show = |v: &Option<String>| v.clone().unwrap_or_else(|| "(driver default)".to_string());

    let text = [
        format!("Config file:  {}", PgUtilsConfig::config_file_path()),
        format!("Host:         {}", show(&summary.host)),
        format!(
            "Port:         {}",
            show(&summary.port.map(|p| p.to_string()))
        ),
        format!("Database:     {}", show(&summary.dbname)),
        format!("User:         {}", show(&summary.user)),
        format!("Password:     {}", show(&summary.password)),
        format!("Backup file:  {}", summary.backup_file),
        format!(
            "Binary dir:   {}",
            summary.bin_dir.clone().unwrap_or_else(|| "(PATH)".to_string())
        ),
    ]
    .join("\n");

    print_value(&summary, output_format, &text);
}
