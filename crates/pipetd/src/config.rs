// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 pipetd contributors

//! Server configuration.

use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::Path;
use std::time::Duration;

use crate::motion::Bounds;

/// Robot server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address to bind to (default: 0.0.0.0)
    #[serde(default = "default_bind_address")]
    pub bind_address: IpAddr,

    /// TCP port to listen on (default: 65432)
    #[serde(default = "default_port")]
    pub port: u16,

    /// Maximum number of concurrent client sessions
    #[serde(default = "default_max_clients")]
    pub max_clients: usize,

    /// Idle time after which a session is force-closed, in seconds
    #[serde(default = "default_keep_alive")]
    pub keep_alive_secs: u64,

    /// Poll timeout per scheduler tick, in milliseconds
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,

    /// Maximum message size (bytes)
    #[serde(default = "default_max_message_size")]
    pub max_message_size: usize,

    /// Safe operating envelope for motion targets
    #[serde(default)]
    pub bounds: Bounds,
}

fn default_bind_address() -> IpAddr {
    IpAddr::from([0, 0, 0, 0])
}

fn default_port() -> u16 {
    65432
}

fn default_max_clients() -> usize {
    5
}

fn default_keep_alive() -> u64 {
    30
}

fn default_poll_interval() -> u64 {
    100
}

fn default_max_message_size() -> usize {
    64 * 1024
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
            max_clients: default_max_clients(),
            keep_alive_secs: default_keep_alive(),
            poll_interval_ms: default_poll_interval(),
            max_message_size: default_max_message_size(),
            bounds: Bounds::default(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::Io(e.to_string()))?;

        serde_json::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Save configuration to a JSON file.
    pub fn to_file(&self, path: &Path) -> Result<(), ConfigError> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::Serialize(e.to_string()))?;

        std::fs::write(path, content).map_err(|e| ConfigError::Io(e.to_string()))
    }

    /// Get the keep-alive window as a Duration.
    pub fn keep_alive(&self) -> Duration {
        Duration::from_secs(self.keep_alive_secs)
    }

    /// Get the per-tick poll timeout as a Duration.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_clients == 0 {
            return Err(ConfigError::InvalidValue("max_clients cannot be 0".into()));
        }
        if self.keep_alive_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "keep_alive_secs cannot be 0".into(),
            ));
        }
        if self.max_message_size == 0 {
            return Err(ConfigError::InvalidValue(
                "max_message_size cannot be 0".into(),
            ));
        }
        self.bounds
            .validate()
            .map_err(|e| ConfigError::InvalidValue(format!("bounds: {}", e)))?;
        Ok(())
    }
}

/// Configuration error types.
#[derive(Debug, Clone)]
pub enum ConfigError {
    Io(String),
    Parse(String),
    Serialize(String),
    InvalidValue(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(s) => write!(f, "I/O error: {}", s),
            Self::Parse(s) => write!(f, "Parse error: {}", s),
            Self::Serialize(s) => write!(f, "Serialize error: {}", s),
            Self::InvalidValue(s) => write!(f, "Invalid value: {}", s),
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.port, 65432);
        assert_eq!(config.max_clients, 5);
        assert_eq!(config.keep_alive(), Duration::from_secs(30));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_serialization() {
        let config = ServerConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let parsed: ServerConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config.port, parsed.port);
        assert_eq!(config.bounds, parsed.bounds);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let parsed: ServerConfig =
            serde_json::from_str(r#"{"port": 9000, "bounds": {"max_x": 150.0}}"#).unwrap();
        assert_eq!(parsed.port, 9000);
        assert_eq!(parsed.max_clients, 5);
        assert_eq!(parsed.bounds.max_x, 150.0);
        assert_eq!(parsed.bounds.min_x, -300.0);
    }

    #[test]
    fn test_validation_zero_slots() {
        let config = ServerConfig {
            max_clients: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_inverted_bounds() {
        let mut config = ServerConfig::default();
        config.bounds.min_z = 500.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pipetd.json");

        let config = ServerConfig {
            port: 7777,
            keep_alive_secs: 10,
            ..Default::default()
        };
        config.to_file(&path).unwrap();

        let loaded = ServerConfig::from_file(&path).unwrap();
        assert_eq!(loaded.port, 7777);
        assert_eq!(loaded.keep_alive_secs, 10);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = ServerConfig::from_file(Path::new("/nonexistent/pipetd.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
