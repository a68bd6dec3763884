//! Connector configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for one SHDR connector.
///
/// Deserializes from the upstream-source section of an agent configuration;
/// every field except `server` has a default.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectorConfig {
    /// Host name or IP of the upstream data source
    pub server: String,

    /// TCP port of the upstream data source (default: 7878)
    #[serde(default = "default_port")]
    pub port: u16,

    /// Receive watchdog in seconds before a heartbeat is negotiated (default: 10)
    #[serde(default = "default_legacy_timeout")]
    pub legacy_timeout_secs: u64,

    /// Wait between reconnect attempts in milliseconds (default: 10000)
    #[serde(default = "default_reconnect_interval")]
    pub reconnect_interval_ms: u64,

    /// Scheduling-priority hint; informational only
    #[serde(default)]
    pub real_time: bool,
}

fn default_port() -> u16 {
    7878
}

fn default_legacy_timeout() -> u64 {
    10
}

fn default_reconnect_interval() -> u64 {
    10_000
}

impl Default for ConnectorConfig {
    fn default() -> Self {
        Self {
            server: "localhost".to_string(),
            port: default_port(),
            legacy_timeout_secs: default_legacy_timeout(),
            reconnect_interval_ms: default_reconnect_interval(),
            real_time: false,
        }
    }
}

impl ConnectorConfig {
    /// Create a configuration for `server:port` with default timings.
    pub fn new(server: impl Into<String>, port: u16) -> Self {
        Self {
            server: server.into(),
            port,
            legacy_timeout_secs: default_legacy_timeout(),
            reconnect_interval_ms: default_reconnect_interval(),
            real_time: false,
        }
    }

    /// Receive watchdog used until a PONG negotiates a heartbeat.
    pub fn legacy_timeout(&self) -> Duration {
        Duration::from_secs(self.legacy_timeout_secs)
    }

    /// Fixed wait between reconnect attempts.
    pub fn reconnect_interval(&self) -> Duration {
        Duration::from_millis(self.reconnect_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_protocol_conventions() {
        let config = ConnectorConfig::new("mill-12", 7878);
        assert_eq!(config.legacy_timeout(), Duration::from_secs(10));
        assert_eq!(config.reconnect_interval(), Duration::from_millis(10_000));
        assert!(!config.real_time);
    }

    #[test]
    fn deserializes_with_partial_fields() {
        let config: ConnectorConfig =
            serde_json::from_str(r#"{"server": "10.0.0.5", "real_time": true}"#).unwrap();
        assert_eq!(config.server, "10.0.0.5");
        assert_eq!(config.port, 7878);
        assert_eq!(config.legacy_timeout_secs, 10);
        assert!(config.real_time);
    }

    #[test]
    fn default_matches_the_field_defaults() {
        let config = ConnectorConfig::default();
        assert_eq!(config.server, "localhost");
        assert_eq!(config.port, 7878);
        assert_eq!(config.legacy_timeout_secs, 10);
        assert_eq!(config.reconnect_interval_ms, 10_000);
        assert!(!config.real_time);
    }
}
