use anyhow::{anyhow, Result};
use config::Config;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::path::Path;

/// Prefix for environment variables, e.g. `PGUTILS_HOST`
pub const ENV_PREFIX: &str = "PGUTILS";

/// Unprefixed lowercase variables understood for compatibility with existing
/// deployment scripts, mapped to their configuration keys
const BARE_ENV_KEYS: &[(&str, &str)] = &[
    ("host", "host"),
    ("port", "port"),
    ("dbname", "dbname"),
    ("user", "user"),
    ("password", "password"),
    ("db_backup", "backup_file"),
];

pub const DEFAULT_BACKUP_FILE: &str = "db_backup.sql";

const EMPTY_CONFIG: &str = r#"### pgutils configuration file

### database connection (unset values fall back to the PostgreSQL driver defaults)
# host = "localhost"
# port = 5432
# dbname = "postgres"
# user = "postgres"
# password = ""

### backup file written by `pgutils backup` and read by `pgutils restore`
# backup_file = "db_backup.sql"

### directory holding pg_dump, pg_restore and psql (searched before PATH)
# bin_dir = "/usr/lib/postgresql/16/bin"
"#;

/// Connection settings for one PostgreSQL database
///
/// Every field is optional; unset fields are left to the driver defaults.
#[derive(Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConnectionConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub dbname: Option<String>,
    pub user: Option<String>,
    #[serde(skip_serializing)]
    pub password: Option<String>,
}

impl ConnectionConfig {
    /// `user@host:port/dbname`, with `-` for unset parts. Never includes the password.
    pub fn describe(&self) -> String {
        format!(
            "{}@{}:{}/{}",
            self.user.as_deref().unwrap_or("-"),
            self.host.as_deref().unwrap_or("-"),
            self.port
                .map(|p| p.to_string())
                .unwrap_or_else(|| "-".to_string()),
            self.dbname.as_deref().unwrap_or("-"),
        )
    }
}

impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("dbname", &self.dbname)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "********"))
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct PgUtilsConfig {
    /// Database the query wrapper and the dump/restore tools talk to
    pub connection: ConnectionConfig,

    /// Backup file written by pg_dump and read by pg_restore
    pub backup_file: String,

    /// Directory searched for the PostgreSQL client binaries before `PATH`
    pub bin_dir: Option<String>,
}

impl Default for PgUtilsConfig {
    fn default() -> Self {
        Self {
            connection: ConnectionConfig::default(),
            backup_file: DEFAULT_BACKUP_FILE.to_string(),
            bin_dir: None,
        }
    }
}

impl PgUtilsConfig {
    /// Function to create and initialize a new configuration
    ///
    /// Sources, lowest precedence first: the TOML file, a `.env` file in the
    /// working directory, bare variables (`host`, `dbname`, ...), then
    /// `PGUTILS_*` variables.
    pub fn new(path: &Option<String>) -> Result<PgUtilsConfig> {
        let config_file = match path {
            Some(p) => {
                if Path::new(p.as_str()).exists() {
                    Some(p.clone())
                } else {
                    std::fs::write(p.as_str(), EMPTY_CONFIG)
                        .map_err(|e| anyhow!("Unable to create config file: {}", e))?;
                    None
                }
            }
            None => {
                let pgutils_dir = Self::config_dir()?;
                std::fs::create_dir_all(pgutils_dir.as_str())
                    .map_err(|e| anyhow!("Unable to create pgutils directory: {}", e))?;
                let p = format!("{}/pgutils.toml", pgutils_dir.as_str());
                if Path::new(p.as_str()).exists() {
                    Some(p)
                } else {
                    std::fs::write(p.as_str(), EMPTY_CONFIG).map_err(|e| {
                        anyhow!("Unable to create config file {}: {}", p.as_str(), e)
                    })?;
                    None
                }
            }
        };

        // A missing .env file is fine
        let _ = dotenvy::dotenv();

        Self::load(config_file.as_deref(), std::env::vars().collect())
    }

    /// Build a configuration from an optional TOML file and an environment snapshot
    pub fn load(file: Option<&str>, env: HashMap<String, String>) -> Result<PgUtilsConfig> {
        let mut builder = Config::builder();

        if let Some(p) = file {
            builder = builder.add_source(config::File::with_name(p));
        }

        let bare: config::Map<String, String> = BARE_ENV_KEYS
            .iter()
            .filter_map(|(var, key)| env.get(*var).map(|v| (key.to_string(), v.clone())))
            .collect();
        builder = builder.add_source(config::Environment::default().source(Some(bare)));

        // E.g., `PGUTILS_HOST=db.internal pgutils tables` sets the host
        let prefixed: config::Map<String, String> = env.into_iter().collect();
        builder = builder
            .add_source(config::Environment::with_prefix(ENV_PREFIX).source(Some(prefixed)));

        let settings = builder
            .build()
            .map_err(|e| anyhow!("Failed to build configuration: {}", e))?;

        let config = settings
            .try_deserialize::<HashMap<String, String>>()
            .map_err(|e| anyhow!("Failed to deserialize configuration: {}", e))?;

        Self::from_settings(&config)
    }

    fn from_settings(config: &HashMap<String, String>) -> Result<PgUtilsConfig> {
        let get = |key: &str| {
            config
                .get(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let port = match get("port") {
            Some(p) => Some(
                p.parse::<u16>()
                    .map_err(|e| anyhow!("Invalid port '{}': {}", p, e))?,
            ),
            None => None,
        };

        Ok(PgUtilsConfig {
            connection: ConnectionConfig {
                host: get("host"),
                port,
                dbname: get("dbname"),
                user: get("user"),
                password: get("password"),
            },
            backup_file: get("backup_file").unwrap_or_else(|| DEFAULT_BACKUP_FILE.to_string()),
            bin_dir: get("bin_dir"),
        })
    }

    /// Directory holding the default configuration file
    pub fn config_dir() -> Result<String> {
        let home_dir = dirs::home_dir()
            .ok_or_else(|| anyhow!("Could not find home directory"))?
            .to_str()
            .ok_or_else(|| anyhow!("Could not convert home directory path to string"))?
            .to_owned();
        Ok(format!("{}/.pgutils", home_dir))
    }

    /// Get the default config file path
    pub fn config_file_path() -> String {
        let home_dir = dirs::home_dir()
            .map(|h| h.to_string_lossy().to_string())
            .unwrap_or_else(|| "~".to_string());
        format!("{}/.pgutils/pgutils.toml", home_dir)
    }

    /// Display configuration summary
    pub fn summary(&self) -> ConfigSummary {
        let c = &self.connection;
        ConfigSummary {
            host: c.host.clone(),
            port: c.port,
            dbname: c.dbname.clone(),
            user: c.user.clone(),
            password: c.password.as_ref().map(|_| "********".to_string()),
            backup_file: self.backup_file.clone(),
            bin_dir: self.bin_dir.clone(),
        }
    }
}

/// Printable view of the configuration with the password masked
#[derive(Debug, Clone, Serialize)]
pub struct ConfigSummary {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub dbname: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub backup_file: String,
    pub bin_dir: Option<String>,
}
