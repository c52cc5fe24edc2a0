//! Profile file and connection settings
//!
//! A profile is an optional TOML file with connection and path defaults:
//!
//! ```toml
//! [connection]
//! driver = "mysql"
//! host = "db.internal"
//! port = 3306
//! user = "deploy"
//! database = "inventory"
//!
//! [paths]
//! query_dir = "/srv/migrations"
//! backup_dir = "/var/backups/mysql"
//! log_dir = "/var/log/dbexec"
//! ```
//!
//! Passwords are never read from a profile. Command-line arguments and
//! environment variables override profile values.

use dbexec_core::{ConnectRequest, DbExecError, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_DRIVER: &str = "mysql";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Profile {
    #[serde(default)]
    pub connection: ConnectionProfile,

    #[serde(default)]
    pub paths: PathsProfile,

    /// Set when the file contained a password that was dropped
    #[serde(skip)]
    pub ignored_password: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConnectionProfile {
    /// Driver name (mysql, sqlite)
    #[serde(default)]
    pub driver: Option<String>,

    #[serde(default)]
    pub host: Option<String>,

    #[serde(default)]
    pub port: Option<u16>,

    #[serde(default)]
    pub user: Option<String>,

    /// Database name, or file path for SQLite
    #[serde(default)]
    pub database: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PathsProfile {
    /// Root folder of the scripts to run
    #[serde(default)]
    pub query_dir: Option<PathBuf>,

    /// Folder the database server writes backups to
    #[serde(default)]
    pub backup_dir: Option<PathBuf>,

    #[serde(default)]
    pub log_dir: Option<PathBuf>,
}

impl Profile {
    /// Load a profile from an explicit path; the file must exist
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(DbExecError::NotFound(format!(
                "profile '{}' does not exist",
                path.display()
            )));
        }

        let content = fs::read_to_string(path)?;
        Self::parse(&content).map_err(|e| match e {
            DbExecError::Configuration(message) => DbExecError::Configuration(format!(
                "failed to parse profile '{}': {}",
                path.display(),
                message
            )),
            other => other,
        })
    }

    /// Load the default profile if one exists, otherwise use an empty one
    pub fn load_default() -> Result<Self> {
        match Self::default_path() {
            Some(path) if path.exists() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }

    /// `<config dir>/dbexec/dbexec.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("dbexec").join("dbexec.toml"))
    }

    pub fn parse(content: &str) -> Result<Self> {
        let table: toml::Table = content
            .parse()
            .map_err(|e: toml::de::Error| DbExecError::Configuration(e.to_string()))?;

        let ignored_password = table
            .get("connection")
            .and_then(|connection| connection.get("password"))
            .is_some();

        let mut profile: Profile = toml::Value::Table(table)
            .try_into()
            .map_err(|e: toml::de::Error| DbExecError::Configuration(e.to_string()))?;
        profile.ignored_password = ignored_password;
        Ok(profile)
    }
}

/// Connection arguments shared by every subcommand that talks to a database
#[derive(Debug, Clone, Default, clap::Args)]
pub struct ConnectionArgs {
    /// Database driver [default: mysql]
    #[arg(long, env = "DBEXEC_DRIVER", global = true)]
    pub driver: Option<String>,

    /// Database server host
    #[arg(long, env = "DBEXEC_HOST", global = true)]
    pub host: Option<String>,

    /// Database server port [default: 3306]
    #[arg(long, env = "DBEXEC_PORT", global = true)]
    pub port: Option<String>,

    #[arg(long, env = "DBEXEC_USER", global = true)]
    pub user: Option<String>,

    #[arg(long, env = "DBEXEC_PASSWORD", hide_env_values = true, global = true)]
    pub password: Option<String>,

    /// Database name (file path for sqlite)
    #[arg(long, env = "DBEXEC_DATABASE", global = true)]
    pub database: Option<String>,
}

/// Connection inputs after merging arguments over the profile
#[derive(Clone, Default)]
pub struct ConnectionSettings {
    pub driver: String,
    pub host: String,
    /// Empty selects the driver's default port
    pub port: String,
    pub user: String,
    password: String,
    pub database: String,
}

impl ConnectionSettings {
    pub fn resolve(args: &ConnectionArgs, profile: &ConnectionProfile) -> Self {
        fn pick(arg: &Option<String>, profile: &Option<String>) -> String {
            arg.clone().or_else(|| profile.clone()).unwrap_or_default()
        }

        let driver = pick(&args.driver, &profile.driver);
        Self {
            driver: if driver.is_empty() {
                DEFAULT_DRIVER.to_string()
            } else {
                driver
            },
            host: pick(&args.host, &profile.host),
            port: args
                .port
                .clone()
                .or_else(|| profile.port.map(|port| port.to_string()))
                .unwrap_or_default(),
            user: pick(&args.user, &profile.user),
            password: args.password.clone().unwrap_or_default(),
            database: pick(&args.database, &profile.database),
        }
    }

    pub fn request(&self) -> ConnectRequest<'_> {
        ConnectRequest {
            host: &self.host,
            port: &self.port,
            user: &self.user,
            password: &self.password,
            database: &self.database,
        }
    }
}

impl std::fmt::Debug for ConnectionSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionSettings")
            .field("driver", &self.driver)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("database", &self.database)
            .finish()
    }
}

/// Use the argument if given, otherwise the profile value, otherwise fail
pub fn require_dir(arg: Option<PathBuf>, profile: Option<&PathBuf>, what: &str) -> Result<PathBuf> {
    arg.or_else(|| profile.cloned())
        .filter(|dir| !dir.as_os_str().is_empty())
        .ok_or_else(|| DbExecError::Configuration(format!("{} not selected", what)))
}
