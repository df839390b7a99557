//! # Configuration Management
//!
//! Centralized configuration for the relay core.
//!
//! This module provides structured configuration for the local listener and
//! the upstream endpoint, including connection parameters, timeouts, frame
//! limits, and logging options.
//!
//! ## Configuration Sources
//! - TOML files via `from_file()`
//! - Direct instantiation with defaults
//! - Environment-specific overrides
//!
//! ## Security Considerations
//! - Default frame size limit (64 KB) bounds decoder memory per connection
//! - Connect timeout prevents a dead upstream from wedging session startup

use crate::error::{RelayError, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::time::Duration;
use tracing::Level;

/// Wire delimiter separating frames on the byte stream
pub const FRAME_DELIMITER: u8 = 0x00;

/// Max allowed frame size before the decoder gives up on the stream
pub const MAX_FRAME_SIZE: usize = 64 * 1024;

/// Prefix character that turns a chat message into a command invocation
pub const COMMAND_PREFIX: char = '!';

/// Default timeout for dialing the upstream endpoint
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default timeout for graceful listener shutdown
pub const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

/// Main relay configuration structure that contains all configurable settings
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct RelayConfig {
    /// Local listener configuration
    #[serde(default)]
    pub listener: ListenerConfig,

    /// Upstream endpoint configuration
    #[serde(default)]
    pub remote: RemoteConfig,

    /// Relay behavior tunables
    #[serde(default)]
    pub relay: RelayTunables,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl RelayConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut file = File::open(path)
            .map_err(|e| RelayError::ConfigError(format!("Failed to open config file: {e}")))?;

        let mut contents = String::new();
        file.read_to_string(&mut contents)
            .map_err(|e| RelayError::ConfigError(format!("Failed to read config file: {e}")))?;

        Self::from_toml(&contents)
    }

    /// Load configuration from TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str::<Self>(content)
            .map_err(|e| RelayError::ConfigError(format!("Failed to parse TOML: {e}")))
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Start with defaults
        let mut config = Self::default();

        // Override with environment variables
        if let Ok(addr) = std::env::var("RELAY_CORE_LISTEN_ADDRESS") {
            config.listener.address = addr;
        }

        if let Ok(host) = std::env::var("RELAY_CORE_REMOTE_HOST") {
            config.remote.host = host;
        }

        if let Ok(port) = std::env::var("RELAY_CORE_REMOTE_PORT") {
            if let Ok(val) = port.parse::<u16>() {
                config.remote.port = val;
            }
        }

        if let Ok(timeout) = std::env::var("RELAY_CORE_CONNECT_TIMEOUT_MS") {
            if let Ok(val) = timeout.parse::<u64>() {
                config.remote.connect_timeout = Duration::from_millis(val);
            }
        }

        if let Ok(size) = std::env::var("RELAY_CORE_MAX_FRAME_SIZE") {
            if let Ok(val) = size.parse::<usize>() {
                config.relay.max_frame_size = val;
            }
        }

        Ok(config)
    }

    /// Apply overrides to the default configuration
    pub fn default_with_overrides<F>(mutator: F) -> Self
    where
        F: FnOnce(&mut Self),
    {
        let mut config = Self::default();
        mutator(&mut config);
        config
    }

    /// Generate example configuration file content
    pub fn example_config() -> String {
        toml::to_string_pretty(&Self::default())
            .unwrap_or_else(|_| String::from("# Failed to generate example config"))
    }

    /// Save configuration to a file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| RelayError::ConfigError(format!("Failed to serialize config: {e}")))?;

        std::fs::write(path, content)
            .map_err(|e| RelayError::ConfigError(format!("Failed to write config file: {e}")))?;

        Ok(())
    }

    /// Validate the configuration for common issues and misconfigurations
    ///
    /// Returns a list of validation errors. Empty list means configuration is valid.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        errors.extend(self.listener.validate());
        errors.extend(self.remote.validate());
        errors.extend(self.relay.validate());
        errors.extend(self.logging.validate());

        errors
    }

    /// Validate and return Result - convenience method
    pub fn validate_strict(&self) -> Result<()> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(RelayError::ConfigError(format!(
                "Configuration validation failed:\n  - {}",
                errors.join("\n  - ")
            )))
        }
    }
}

/// Local listener configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ListenerConfig {
    /// Listen address the patched game client connects to (e.g., "127.0.0.1:9339")
    pub address: String,

    /// Timeout for graceful listener shutdown
    #[serde(with = "duration_serde")]
    pub shutdown_timeout: Duration,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            address: String::from("127.0.0.1:9339"),
            shutdown_timeout: SHUTDOWN_TIMEOUT,
        }
    }
}

impl ListenerConfig {
    /// Validate listener configuration
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.address.is_empty() {
            errors.push("Listener address cannot be empty".to_string());
        } else if self.address.parse::<std::net::SocketAddr>().is_err() {
            errors.push(format!(
                "Invalid listener address format: '{}' (expected format: '127.0.0.1:9339')",
                self.address
            ));
        }

        if self.shutdown_timeout.as_secs() < 1 {
            errors.push("Shutdown timeout too short (minimum: 1s)".to_string());
        } else if self.shutdown_timeout.as_secs() > 60 {
            errors.push("Shutdown timeout too long (maximum: 60s)".to_string());
        }

        errors
    }
}

/// Upstream endpoint configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RemoteConfig {
    /// Hostname or address of the authoritative game server
    pub host: String,

    /// Port of the authoritative game server
    pub port: u16,

    /// Timeout for connection attempts
    #[serde(with = "duration_serde")]
    pub connect_timeout: Duration,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            host: String::from("127.0.0.1"),
            port: 9340,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }
}

impl RemoteConfig {
    /// The endpoint in `host:port` form, as passed to the dialer
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Validate upstream configuration
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.host.is_empty() {
            errors.push("Remote host cannot be empty".to_string());
        }

        if self.port == 0 {
            errors.push("Remote port cannot be 0".to_string());
        }

        if self.connect_timeout.as_millis() < 100 {
            errors.push("Connect timeout too short (minimum: 100ms)".to_string());
        } else if self.connect_timeout.as_secs() > 300 {
            errors.push("Connect timeout too long (maximum: 300s)".to_string());
        }

        errors
    }
}

/// Relay behavior tunables
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RelayTunables {
    /// Maximum allowed frame size in bytes
    pub max_frame_size: usize,

    /// Capacity of the session event broadcast channel
    pub event_buffer: usize,

    /// Message kinds whose text payload is scanned for command invocations
    #[serde(default = "default_chat_kinds")]
    pub chat_kinds: Vec<String>,
}

fn default_chat_kinds() -> Vec<String> {
    vec![String::from("pubMsg"), String::from("ua")]
}

impl Default for RelayTunables {
    fn default() -> Self {
        Self {
            max_frame_size: MAX_FRAME_SIZE,
            event_buffer: 256,
            chat_kinds: default_chat_kinds(),
        }
    }
}

impl RelayTunables {
    /// Validate relay tunables
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.max_frame_size == 0 {
            errors.push("Max frame size cannot be 0".to_string());
        } else if self.max_frame_size < 1024 {
            errors.push("Max frame size too small (minimum: 1 KB)".to_string());
        } else if self.max_frame_size > 16 * 1024 * 1024 {
            errors.push(format!(
                "Max frame size too large: {} bytes (maximum recommended: 16 MB)",
                self.max_frame_size
            ));
        }

        if self.event_buffer == 0 {
            errors.push("Event buffer capacity must be greater than 0".to_string());
        }

        if self.chat_kinds.iter().any(String::is_empty) {
            errors.push("Chat kinds cannot contain empty strings".to_string());
        }

        errors
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Application name for logs
    pub app_name: String,

    /// Log level
    #[serde(with = "log_level_serde")]
    pub log_level: Level,

    /// Whether to log to console
    pub log_to_console: bool,

    /// Whether to use JSON formatting for logs
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            app_name: String::from("relay-core"),
            log_level: Level::INFO,
            log_to_console: true,
            json_format: false,
        }
    }
}

impl LoggingConfig {
    /// Validate logging configuration
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.app_name.is_empty() {
            errors.push("Application name cannot be empty".to_string());
        } else if self.app_name.len() > 64 {
            errors.push(format!(
                "Application name too long: {} characters (maximum: 64)",
                self.app_name.len()
            ));
        }

        errors
    }
}

/// Helper module for Duration serialization/deserialization
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let millis = duration.as_millis() as u64;
        millis.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

/// Helper module for tracing::Level serialization/deserialization
mod log_level_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::str::FromStr;
    use tracing::Level;

    pub fn serialize<S>(level: &Level, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let level_str = match *level {
            Level::TRACE => "trace",
            Level::DEBUG => "debug",
            Level::INFO => "info",
            Level::WARN => "warn",
            Level::ERROR => "error",
        };
        level_str.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Level, D::Error>
    where
        D: Deserializer<'de>,
    {
        let level_str = String::deserialize(deserializer)?;
        Level::from_str(&level_str)
            .map_err(|_| serde::de::Error::custom(format!("Invalid log level: {level_str}")))
    }
}
