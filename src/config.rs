//! Configuration management for Rango
//!
//! Loads settings from TOML file at ~/.rango/config.toml

use crate::error::{RangoError, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Session cookie and backend configuration
    #[serde(default)]
    pub session: SessionConfig,

    /// Log output configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Data directory (defaults to ~/.rango)
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .map(|p| p.join(".rango"))
        .unwrap_or_else(|| PathBuf::from(".rango"))
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server port (default: 8000)
    #[serde(default = "default_port")]
    pub port: u16,

    /// Server host (default: 127.0.0.1 - localhost only)
    #[serde(default = "default_host")]
    pub host: String,

    /// Bearer key for the /admin routes.
    /// Admin routes are disabled when unset.
    #[serde(default)]
    pub admin_key: Option<String>,
}

fn default_port() -> u16 {
    8000
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            port: default_port(),
            host: default_host(),
            admin_key: None,
        }
    }
}

/// Where session records are kept
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SessionBackend {
    /// SQLite `sessions` table, survives restarts
    #[default]
    Db,
    /// In-process map, lost on restart
    Memory,
}

impl std::str::FromStr for SessionBackend {
    type Err = RangoError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "db" => Ok(SessionBackend::Db),
            "memory" => Ok(SessionBackend::Memory),
            other => Err(RangoError::Config(format!(
                "Unknown session backend '{}', expected \"db\" or \"memory\"",
                other
            ))),
        }
    }
}

/// Session configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Name of the cookie carrying the session key
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,

    /// Session storage backend
    #[serde(default)]
    pub backend: SessionBackend,

    /// Days of inactivity before a session expires
    #[serde(default = "default_max_age_days")]
    pub max_age_days: i64,

    /// Minutes between expired-session purges
    #[serde(default = "default_cleanup_interval")]
    pub cleanup_interval_minutes: u64,

    /// Mark the session cookie `Secure` (HTTPS only)
    #[serde(default)]
    pub secure_cookie: bool,
}

fn default_cookie_name() -> String {
    "sessionid".to_string()
}

fn default_max_age_days() -> i64 {
    14
}

fn default_cleanup_interval() -> u64 {
    60
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            cookie_name: default_cookie_name(),
            backend: SessionBackend::default(),
            max_age_days: default_max_age_days(),
            cleanup_interval_minutes: default_cleanup_interval(),
            secure_cookie: false,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LoggingConfig {
    /// Directory for daily-rolling log files; stdout only when unset
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig::default(),
            session: SessionConfig::default(),
            logging: LoggingConfig::default(),
            data_dir: default_data_dir(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let expanded_path = expand_path(path.as_ref());

        if !expanded_path.exists() {
            return Err(RangoError::Config(format!(
                "Configuration file not found: {}",
                expanded_path.display()
            )));
        }

        let content = std::fs::read_to_string(&expanded_path)?;
        let config: Config = toml::from_str(&content)?;

        Ok(config)
    }

    /// Get the default configuration file path
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .map(|p| p.join(".rango").join("config.toml"))
            .unwrap_or_else(|| PathBuf::from(".rango/config.toml"))
    }

    /// Get the data directory, expanding ~ if present
    pub fn data_dir(&self) -> PathBuf {
        expand_path(&self.data_dir)
    }

    /// Path of the SQLite database file
    pub fn db_path(&self) -> PathBuf {
        self.data_dir().join("rango.db")
    }

    /// Get the server socket address
    pub fn server_addr(&self) -> SocketAddr {
        use std::net::ToSocketAddrs;

        format!("{}:{}", self.server.host, self.server.port)
            .to_socket_addrs()
            .ok()
            .and_then(|mut addrs| addrs.next())
            .unwrap_or_else(|| SocketAddr::from(([127, 0, 0, 1], self.server.port)))
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(host) = std::env::var("RANGO_SERVER_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("RANGO_SERVER_PORT") {
            self.server.port = port.parse().map_err(|_| {
                RangoError::Config(format!("RANGO_SERVER_PORT is not a valid port: {}", port))
            })?;
        }
        if let Ok(key) = std::env::var("RANGO_ADMIN_KEY") {
            self.server.admin_key = if key.is_empty() { None } else { Some(key) };
        }
        if let Ok(data_dir) = std::env::var("RANGO_DATA_DIR") {
            self.data_dir = PathBuf::from(data_dir);
        }
        if let Ok(backend) = std::env::var("RANGO_SESSION_BACKEND") {
            self.session.backend = backend.parse()?;
        }
        Ok(())
    }

    /// Create a default configuration file at the given path
    pub fn create_default<P: AsRef<Path>>(path: P) -> Result<()> {
        let content = r#"# Rango Configuration

# Where the SQLite database lives
data_dir = "~/.rango"

[server]
# Port to listen on (default: 8000)
port = 8000

# Host to bind to
# "127.0.0.1" = localhost only
# "0.0.0.0" = all interfaces
host = "127.0.0.1"

# Bearer key for the /admin routes (admin routes are disabled when unset)
# admin_key = "your-secret-key"

[session]
cookie_name = "sessionid"
# "db" keeps sessions in SQLite, "memory" loses them on restart
backend = "db"
max_age_days = 14
cleanup_interval_minutes = 60
secure_cookie = false

[logging]
# Write daily-rolling log files to this directory in addition to stdout
# dir = "~/.rango/logs"
"#;

        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;

        Ok(())
    }
}

/// Expand ~ to home directory in paths
pub fn expand_path(path: &Path) -> PathBuf {
    if let Ok(rest) = path.strip_prefix("~") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    path.to_path_buf()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.server.host, "127.0.0.1");
        assert!(config.server.admin_key.is_none());
        assert_eq!(config.session.cookie_name, "sessionid");
        assert_eq!(config.session.backend, SessionBackend::Db);
        assert_eq!(config.session.max_age_days, 14);
    }

    #[test]
    fn test_parse_config() {
        let toml = r#"
data_dir = "/tmp/rango"

[server]
port = 9000
host = "0.0.0.0"
admin_key = "sekrit"

[session]
backend = "memory"
max_age_days = 2
"#;

        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.admin_key.as_deref(), Some("sekrit"));
        assert_eq!(config.session.backend, SessionBackend::Memory);
        assert_eq!(config.session.max_age_days, 2);
        assert_eq!(config.session.cookie_name, "sessionid");
        assert_eq!(config.db_path(), PathBuf::from("/tmp/rango/rango.db"));
    }

    #[test]
    fn test_default_file_parses() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        Config::create_default(&path).unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.session.cleanup_interval_minutes, 60);
        assert!(config.logging.dir.is_none());
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let err = Config::from_file("/definitely/not/here/config.toml").unwrap_err();
        assert!(matches!(err, RangoError::Config(_)));
    }

    #[test]
    fn test_unknown_backend_rejected() {
        assert!("redis".parse::<SessionBackend>().is_err());
        assert_eq!("memory".parse::<SessionBackend>().unwrap(), SessionBackend::Memory);
    }
}
