//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and environment variable overrides.

use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::websocket::HubConfig;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub websocket: WebSocketConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Trailing window served by the history endpoint
    #[serde(default = "default_history_window_hours")]
    pub history_window_hours: u32,

    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3001
}

fn default_history_window_hours() -> u32 {
    24
}

/// Longest history window served (ten years)
pub const MAX_HISTORY_WINDOW_HOURS: u32 = 24 * 365 * 10;

fn default_max_body_bytes() -> usize {
    64 * 1024
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            history_window_hours: default_history_window_hours(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

impl ServerConfig {
    /// Get the socket address string
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// History window, capped at [`MAX_HISTORY_WINDOW_HOURS`]
    pub fn history_window(&self) -> chrono::Duration {
        let hours = self.history_window_hours.min(MAX_HISTORY_WINDOW_HOURS);
        chrono::Duration::hours(i64::from(hours))
    }
}

/// Database configuration
///
/// `host`, `user` and `password` are accepted so deployments can keep their
/// existing environment, but the embedded SQLite engine has no server to
/// connect to and no accounts. See [`DatabaseConfig::ignored_settings`].
#[derive(Clone, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_host")]
    pub host: String,

    #[serde(default = "default_db_user")]
    pub user: String,

    #[serde(default)]
    pub password: String,

    /// Database name; the file is `<dir>/<name>.db`
    #[serde(default = "default_db_name")]
    pub name: String,

    #[serde(default = "default_db_dir")]
    pub dir: String,

    #[serde(default = "default_pool_size")]
    pub pool_size: usize,

    #[serde(default = "default_busy_timeout")]
    pub busy_timeout_ms: u64,
}

fn default_db_host() -> String {
    "localhost".to_string()
}

fn default_db_user() -> String {
    "root".to_string()
}

fn default_db_name() -> String {
    "weather_station".to_string()
}

fn default_db_dir() -> String {
    ".".to_string()
}

fn default_pool_size() -> usize {
    10
}

fn default_busy_timeout() -> u64 {
    5000
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            host: default_db_host(),
            user: default_db_user(),
            password: String::new(),
            name: default_db_name(),
            dir: default_db_dir(),
            pool_size: default_pool_size(),
            busy_timeout_ms: default_busy_timeout(),
        }
    }
}

impl DatabaseConfig {
    /// Path of the SQLite database file
    pub fn db_path(&self) -> PathBuf {
        Path::new(&self.dir).join(format!("{}.db", self.name))
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }

    /// Settings that were set to something the embedded engine cannot honour
    pub fn ignored_settings(&self) -> Vec<&'static str> {
        let mut ignored = Vec::new();
        if !matches!(self.host.as_str(), "localhost" | "127.0.0.1" | "::1" | "") {
            ignored.push("DB_HOST");
        }
        if self.user != default_db_user() && !self.user.is_empty() {
            ignored.push("DB_USER");
        }
        if !self.password.is_empty() {
            ignored.push("DB_PASSWORD");
        }
        ignored
    }
}

impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("host", &self.host)
            .field("user", &self.user)
            .field("password", &if self.password.is_empty() { "" } else { "<redacted>" })
            .field("name", &self.name)
            .field("dir", &self.dir)
            .field("pool_size", &self.pool_size)
            .field("busy_timeout_ms", &self.busy_timeout_ms)
            .finish()
    }
}

/// Real-time push configuration
#[derive(Debug, Clone, Deserialize)]
pub struct WebSocketConfig {
    /// Messages buffered per observer before sends start waiting
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,

    /// Per-observer send timeout; a slower observer is dropped
    #[serde(default = "default_send_timeout")]
    pub send_timeout_ms: u64,
}

fn default_channel_capacity() -> usize {
    32
}

fn default_send_timeout() -> u64 {
    3000
}

impl Default for WebSocketConfig {
    fn default() -> Self {
        Self {
            channel_capacity: default_channel_capacity(),
            send_timeout_ms: default_send_timeout(),
        }
    }
}

impl WebSocketConfig {
    pub fn hub_config(&self) -> HubConfig {
        HubConfig {
            channel_capacity: self.channel_capacity.max(1),
            send_timeout: Duration::from_millis(self.send_timeout_ms),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl LoggingConfig {
    pub fn is_json(&self) -> bool {
        self.format.eq_ignore_ascii_case("json")
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Self::parse(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })
    }

    /// Parse configuration from TOML text
    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from an explicit path, or fall back to the default locations
    pub fn resolve(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        match explicit {
            Some(path) => Self::load_with_env(path),
            None => Ok(Self::load_default()),
        }
    }

    /// Load from default locations or environment
    pub fn load_default() -> Self {
        let config_paths = [
            dirs::config_dir().map(|p| p.join("weather-station").join("config.toml")),
            Some(PathBuf::from("./config.toml")),
        ];

        for path in config_paths.iter().flatten() {
            if path.exists() {
                match Self::load_with_env(path) {
                    Ok(config) => {
                        tracing::info!("Loaded config from {:?}", path);
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load config from {:?}: {}", path, e);
                    }
                }
            }
        }

        tracing::info!("Using default config with environment overrides");
        Self::from_env()
    }

    /// Apply environment variable overrides to an existing config
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from any key lookup (the process environment in production)
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        // Server overrides
        if let Some(host) = lookup("HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("PORT").and_then(|p| p.parse().ok()) {
            self.server.port = port;
        }
        if let Some(hours) = lookup("HISTORY_WINDOW_HOURS").and_then(|h| h.parse().ok()) {
            self.server.history_window_hours = hours;
        }

        // Database overrides
        if let Some(host) = lookup("DB_HOST") {
            self.database.host = host;
        }
        if let Some(user) = lookup("DB_USER") {
            self.database.user = user;
        }
        if let Some(password) = lookup("DB_PASSWORD") {
            self.database.password = password;
        }
        if let Some(name) = lookup("DB_NAME") {
            self.database.name = name;
        }
        if let Some(dir) = lookup("DB_DIR") {
            self.database.dir = dir;
        }
        if let Some(size) = lookup("DB_POOL_SIZE").and_then(|s| s.parse().ok()) {
            self.database.pool_size = size;
        }

        // Logging overrides
        if let Some(level) = lookup("LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = lookup("LOG_FORMAT") {
            self.logging.format = format;
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# Weather Station Configuration
#
# Environment variables override these settings:
# - HOST, PORT, HISTORY_WINDOW_HOURS
# - DB_HOST, DB_USER, DB_PASSWORD, DB_NAME, DB_DIR, DB_POOL_SIZE
# - LOG_LEVEL, LOG_FORMAT

[server]
# Address to bind
host = "0.0.0.0"
port = 3001

# Trailing window returned by /api/weather/history (hours)
history_window_hours = 24

# Maximum request body size (bytes)
max_body_bytes = 65536

[database]
# Readings are stored in <dir>/<name>.db
name = "weather_station"
dir = "."

# Concurrent database connections; extra requests wait for a free one
pool_size = 10

# How long a write waits on a locked database (ms)
busy_timeout_ms = 5000

[websocket]
# Messages buffered per connected viewer
channel_capacity = 32

# A viewer that cannot take a message within this time is disconnected (ms)
send_timeout_ms = 3000

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty (for development) or json (for production)
format = "pretty"
"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.server.port, 3001);
        assert_eq!(config.server.history_window_hours, 24);
        assert_eq!(config.database.name, "weather_station");
        assert_eq!(config.database.user, "root");
        assert_eq!(config.database.pool_size, 10);
        assert_eq!(config.database.db_path(), PathBuf::from("./weather_station.db"));
        assert!(config.database.ignored_settings().is_empty());
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        config.apply_overrides(lookup_from(&[
            ("PORT", "8080"),
            ("DB_NAME", "station"),
            ("DB_DIR", "/var/lib/weather"),
            ("DB_POOL_SIZE", "4"),
            ("HISTORY_WINDOW_HOURS", "48"),
            ("LOG_FORMAT", "json"),
        ]));

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.history_window(), chrono::Duration::hours(48));
        assert_eq!(config.database.pool_size, 4);
        assert_eq!(
            config.database.db_path(),
            PathBuf::from("/var/lib/weather/station.db")
        );
        assert!(config.logging.is_json());
    }

    #[test]
    fn test_history_window_is_capped() {
        let mut config = Config::default();
        config.apply_overrides(lookup_from(&[("HISTORY_WINDOW_HOURS", "4294967295")]));

        assert_eq!(config.server.history_window_hours, u32::MAX);
        assert_eq!(
            config.server.history_window(),
            chrono::Duration::hours(i64::from(MAX_HISTORY_WINDOW_HOURS))
        );
    }

    #[test]
    fn test_unparseable_env_values_keep_defaults() {
        let mut config = Config::default();
        config.apply_overrides(lookup_from(&[("PORT", "not-a-port"), ("DB_POOL_SIZE", "-3")]));

        assert_eq!(config.server.port, 3001);
        assert_eq!(config.database.pool_size, 10);
    }

    #[test]
    fn test_ignored_remote_settings() {
        let mut config = Config::default();
        config.apply_overrides(lookup_from(&[
            ("DB_HOST", "db.internal"),
            ("DB_USER", "station"),
            ("DB_PASSWORD", "hunter2"),
        ]));

        assert_eq!(
            config.database.ignored_settings(),
            vec!["DB_HOST", "DB_USER", "DB_PASSWORD"]
        );

        let debug = format!("{:?}", config.database);
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn test_parse_partial_toml() {
        let config = Config::parse(
            r#"
            [server]
            port = 9000

            [websocket]
            send_timeout_ms = 500
            "#,
        )
        .unwrap();

        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.database.pool_size, 10);
        assert_eq!(
            config.websocket.hub_config().send_timeout,
            Duration::from_millis(500)
        );
    }

    #[test]
    fn test_generated_config_parses() {
        let config = Config::parse(&generate_default_config()).unwrap();
        assert_eq!(config.server.port, 3001);
        assert_eq!(config.database.name, "weather_station");
        assert_eq!(config.websocket.channel_capacity, 32);
        assert_eq!(config.logging.format, "pretty");
    }

    #[test]
    fn test_load_missing_file() {
        let result = Config::load(Path::new("/nonexistent/weather/config.toml"));
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }
}
