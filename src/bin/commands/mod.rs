pub mod backup;
pub mod config;
pub mod migrations;
pub mod restore;
pub mod sql;
pub mod tables;

use pgutils::{DatabaseConn, OutputFormat, PgUtilsConfig};
use serde::Serialize;

/// Open the database the command works on; failing to connect ends the process
pub(crate) fn open_database(config: &PgUtilsConfig, sqlite: Option<&str>) -> DatabaseConn {
    let result = match sqlite {
        Some(path) => DatabaseConn::open_path(path),
        None => DatabaseConn::connect(&config.connection),
    };
    match result {
        Ok(db) => db,
        Err(e) => {
            eprintln!("ERROR: {}", e);
            std::process::exit(1);
        }
    }
}

/// Ask before a destructive action unless `--yes` was given or output is JSON
pub(crate) fn confirm(message: &str, skip_confirm: bool, output_format: OutputFormat) -> bool {
    if skip_confirm || output_format.is_json() {
        return true;
    }

    eprintln!("{}", message);
    eprint!("Are you sure? [y/N] ");

    let mut input = String::new();
    if std::io::stdin().read_line(&mut input).is_ok() {
        let input = input.trim().to_lowercase();
        if input == "y" || input == "yes" {
            return true;
        }
    }
    eprintln!("Aborted.");
    false
}

/// Print a serializable value in a JSON format, or fall back to `text` for the others
pub(crate) fn print_value<T: Serialize>(value: &T, output_format: OutputFormat, text: &str) {
    if output_format.is_json() {
        match output_format.to_json(value) {
            Ok(json) => println!("{}", json),
            Err(e) => eprintln!("ERROR: Failed to serialize to JSON: {}", e),
        }
    } else {
        println!("{}", text);
    }
}
