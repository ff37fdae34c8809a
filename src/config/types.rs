//! Core settings types and loading.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use super::defaults::{
    default_connect_timeout, default_filter, default_keepalive, default_queue_capacity,
    default_settle_ms, default_tick_ms,
};

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read or write settings file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse settings: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to serialize settings: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Persisted settings.
///
/// The connection keys sit at the top level under the names the settings
/// form writes; tuning lives in optional tables.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(rename = "postgresHost", default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(rename = "postgresPort", default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(rename = "postgresUser", default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(rename = "postgresPass", default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(rename = "postgresDB", default, skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,

    /// Connection lifecycle tuning.
    #[serde(default)]
    pub connection: ConnectionTuning,
    /// Tracker tuning.
    #[serde(default)]
    pub timer: TimerConfig,
    /// Local outbox for undelivered entries. Absent = disabled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outbox: Option<OutboxConfig>,
    /// Log filter used by [`crate::telemetry::init_logging`].
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Settings {
    /// Load settings from a TOML file, or defaults when the file is absent.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let settings: Settings = toml::from_str(&content)?;
        Ok(settings)
    }

    /// Write settings to a TOML file, creating the parent directory.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

/// Parameters for one connect attempt. All fields are required.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
}

impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("database", &self.database)
            .finish()
    }
}

/// Connection lifecycle tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionTuning {
    /// Milliseconds to wait after spawning the drive loop before probing (default: 100).
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,
    /// Seconds between keep-alive pings in the drive loop (default: 30).
    #[serde(default = "default_keepalive")]
    pub keepalive_secs: u64,
    /// Seconds to wait for the transport before a round trip fails (default: 5).
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

impl Default for ConnectionTuning {
    fn default() -> Self {
        Self {
            settle_ms: default_settle_ms(),
            keepalive_secs: default_keepalive(),
            connect_timeout_secs: default_connect_timeout(),
        }
    }
}

impl ConnectionTuning {
    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    pub fn keepalive(&self) -> Duration {
        Duration::from_secs(self.keepalive_secs.max(1))
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs.max(1))
    }
}

/// Tracker tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimerConfig {
    /// Milliseconds between ticks while a session runs (default: 1000).
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,
    /// Capacity of the channel between the tracker and the writer (default: 64).
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            tick_ms: default_tick_ms(),
            queue_capacity: default_queue_capacity(),
        }
    }
}

/// Local outbox configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboxConfig {
    /// Path to the SQLite outbox file.
    pub path: String,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `EnvFilter` directive, overridden by `RUST_LOG` (default: "info").
    #[serde(default = "default_filter")]
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_filter(),
        }
    }
}
