use clap::{Parser, Subcommand};
use pgutils::{OutputFormat, PgUtilsConfig};
use tracing::Level;

mod commands;

use commands::backup::BackupArgs;
use commands::config::ConfigArgs;
use commands::migrations::RemoveMigrationsArgs;
use commands::restore::RestoreArgs;
use commands::sql::SqlArgs;
use commands::tables::TableNamesArgs;

#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
#[clap(propagate_version = true)]
struct Cli {
    /// configuration file path, by default $HOME/.pgutils/pgutils.toml is used
    #[clap(short, long)]
    config: Option<String>,

    /// Print debug information
    #[clap(long)]
    debug: bool,

    /// Output format: table, markdown, json, json-pretty, json-line, psv
    #[clap(short, long, global = true, default_value = "table")]
    format: OutputFormat,

    /// Use a local SQLite database file instead of the configured PostgreSQL server
    #[clap(long, global = true)]
    sqlite: Option<String>,

    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the tables of the public schema
    Tables,

    /// Drop tables (and everything depending on them); missing tables are skipped
    DropTable(TableNamesArgs),

    /// Delete every row of the given tables, keeping the tables
    DeleteData(TableNamesArgs),

    /// Remove Django migration bookkeeping rows
    RemoveMigrations(RemoveMigrationsArgs),

    /// Run a mutating statement (DDL/DML) in its own transaction
    Exec(SqlArgs),

    /// Run a read-only statement and print the rows
    Query(SqlArgs),

    /// Dump the database with pg_dump
    Backup(BackupArgs),

    /// Drop, recreate and restore the database with psql and pg_restore
    Restore(RestoreArgs),

    /// Show the resolved configuration
    Config(ConfigArgs),
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(if cli.debug { Level::DEBUG } else { Level::WARN })
        .with_writer(std::io::stderr)
        .init();

    let config = match PgUtilsConfig::new(&cli.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("ERROR: {}", e);
            std::process::exit(1);
        }
    };

    let format = cli.format;
    let sqlite = cli.sqlite.as_deref();

    match cli.command {
        Commands::Tables => {
            let mut db = commands::open_database(&config, sqlite);
            commands::tables::run_list(&mut db, format)
        }
        Commands::DropTable(args) => {
            let mut db = commands::open_database(&config, sqlite);
            commands::tables::run_drop(&mut db, args, format)
        }
        Commands::DeleteData(args) => {
            let mut db = commands::open_database(&config, sqlite);
            commands::tables::run_delete(&mut db, args, format)
        }
        Commands::RemoveMigrations(args) => {
            let mut db = commands::open_database(&config, sqlite);
            commands::migrations::run(&mut db, args, format)
        }
        Commands::Exec(args) => {
            let mut db = commands::open_database(&config, sqlite);
            commands::sql::run_exec(&mut db, args, format)
        }
        Commands::Query(args) => {
            let mut db = commands::open_database(&config, sqlite);
            commands::sql::run_query(&mut db, args, format)
        }
        Commands::Backup(args) => commands::backup::run(&config, args, format),
        Commands::Restore(args) => commands::restore::run(&config, args, format),
        Commands::Config(args) => commands::config::run(&config, args, format),
    }
}
