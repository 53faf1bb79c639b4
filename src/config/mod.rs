//! Configuration management
//!
//! Built-in defaults, then an optional TOML file, then `CALLCTL__`-prefixed
//! environment variables (`CALLCTL__SERVER__PORT=9090`).

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// File read when no explicit path is given
pub const DEFAULT_CONFIG_FILE: &str = "callctl.toml";

/// Environment variable naming an alternative config file
pub const CONFIG_PATH_ENV: &str = "CALLCTL_CONFIG";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub store: StoreConfig,
    pub database: DatabaseSettings,
    pub forwarding: ForwardingSettings,
    pub transfer: TransferSettings,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl ServerConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Record store backend
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    #[default]
    Memory,
    Postgres,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: StoreBackend,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout_secs: u64,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            url: "postgres://postgres@localhost/callctl".to_string(),
            max_connections: 10,
            min_connections: 2,
            connect_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForwardingSettings {
    /// Length of one ring, used to turn ring counts into timers
    pub ring_cycle_secs: u64,
    /// Used when a no-answer rule does not set its own ring count
    pub default_rings_before_forward: u32,
}

impl Default for ForwardingSettings {
    fn default() -> Self {
        Self {
            ring_cycle_secs: 6,
            default_rings_before_forward: 4,
        }
    }
}

impl ForwardingSettings {
    pub fn ring_cycle(&self) -> Duration {
        Duration::from_secs(self.ring_cycle_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransferSettings {
    /// Consultations older than this are cancelled by the reaper
    pub consult_timeout_secs: u64,
    /// 0 disables the reaper
    pub reap_interval_secs: u64,
}

impl Default for TransferSettings {
    fn default() -> Self {
        Self {
            consult_timeout_secs: 300,
            reap_interval_secs: 30,
        }
    }
}

impl TransferSettings {
    pub fn consult_timeout(&self) -> chrono::Duration {
        chrono::Duration::seconds(i64::try_from(self.consult_timeout_secs).unwrap_or(i64::MAX))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directives, overridden by `RUST_LOG`
    pub filter: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info,callctl=debug".to_string(),
            json: false,
        }
    }
}

impl Config {
    /// Load configuration from `path` (or the default file if it exists)
    /// layered under the environment
    pub fn load(path: Option<&Path>) -> Result<Self, ::config::ConfigError> {
        let mut builder = ::config::Config::builder()
            .add_source(::config::Config::try_from(&Config::default())?);

        builder = match path {
            Some(path) => builder.add_source(::config::File::from(path)),
            None => builder.add_source(::config::File::with_name(DEFAULT_CONFIG_FILE).required(false)),
        };

        builder
            .add_source(
                ::config::Environment::with_prefix("CALLCTL")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()
    }

    /// Load using `CALLCTL_CONFIG` when set
    pub fn from_env() -> Result<Self, ::config::ConfigError> {
        match std::env::var_os(CONFIG_PATH_ENV) {
            Some(path) => Self::load(Some(Path::new(&path))),
            None => Self::load(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.server.bind_address(), "0.0.0.0:8080");
        assert_eq!(config.store.backend, StoreBackend::Memory);
        assert_eq!(config.forwarding.ring_cycle(), Duration::from_secs(6));
        assert_eq!(config.transfer.consult_timeout(), chrono::Duration::seconds(300));
    }

    #[test]
    fn test_load_file_over_defaults() {
        let path = std::env::temp_dir().join(format!("callctl-{}.toml", uuid::Uuid::new_v4()));
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            "[server]\nport = 9090\n\n[store]\nbackend = \"postgres\"\n\n[forwarding]\nring_cycle_secs = 5"
        )
        .unwrap();

        let config = Config::load(Some(&path)).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(config.server.port, 9090);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.store.backend, StoreBackend::Postgres);
        assert_eq!(config.forwarding.ring_cycle_secs, 5);
        assert_eq!(config.forwarding.default_rings_before_forward, 4);
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let path = std::env::temp_dir().join("callctl-does-not-exist.toml");
        assert!(Config::load(Some(&path)).is_err());
    }
}
