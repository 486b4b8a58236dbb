use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tmonbus_frame::is_valid_address;

use crate::error::{ControllerError, Result};

/// Default wait for a REPLY after each POLL (200 ms).
pub const DEFAULT_REPLY_TIMEOUT_MS: u64 = 200;

/// Default pause between polling cycles.
pub const DEFAULT_INTERVAL_MS: u64 = 5_000;

/// Poller settings.
///
/// ```json
/// { "nodes": [1, 2, 3], "reply_timeout_ms": 200, "interval_ms": 5000 }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PollerConfig {
    /// Node addresses, polled in this order.
    pub nodes: Vec<u8>,

    #[serde(default = "default_reply_timeout_ms")]
    pub reply_timeout_ms: u64,

    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
}

fn default_reply_timeout_ms() -> u64 {
    DEFAULT_REPLY_TIMEOUT_MS
}

fn default_interval_ms() -> u64 {
    DEFAULT_INTERVAL_MS
}

impl PollerConfig {
    /// Poll `nodes` with default timings.
    pub fn new(nodes: Vec<u8>) -> Self {
        Self {
            nodes,
            reply_timeout_ms: DEFAULT_REPLY_TIMEOUT_MS,
            interval_ms: DEFAULT_INTERVAL_MS,
        }
    }

    /// Parse and validate a JSON document.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text =
            std::fs::read_to_string(path).map_err(|source| ControllerError::ConfigRead {
                path: path.to_path_buf(),
                source,
            })?;
        Self::from_json_str(&text)
    }

    pub fn validate(&self) -> Result<()> {
        if self.nodes.is_empty() {
            return Err(ControllerError::InvalidConfig(
                "node list must not be empty".to_string(),
            ));
        }
        let mut seen = HashSet::with_capacity(self.nodes.len());
        for &address in &self.nodes {
            if !is_valid_address(address) {
                return Err(ControllerError::InvalidAddress(address));
            }
            if !seen.insert(address) {
                return Err(ControllerError::InvalidConfig(format!(
                    "node {address} listed more than once"
                )));
            }
        }
        if self.reply_timeout_ms == 0 {
            return Err(ControllerError::InvalidConfig(
                "reply_timeout_ms must be greater than zero".to_string(),
            ));
        }
        if self.interval_ms == 0 {
            return Err(ControllerError::InvalidConfig(
                "interval_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn reply_timeout(&self) -> Duration {
        Duration::from_millis(self.reply_timeout_ms)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_in() {
        let config = PollerConfig::from_json_str(r#"{ "nodes": [1, 2, 3] }"#).unwrap();
        assert_eq!(config, PollerConfig::new(vec![1, 2, 3]));
        assert_eq!(config.reply_timeout(), Duration::from_millis(200));
        assert_eq!(config.interval(), Duration::from_secs(5));
    }

    #[test]
    fn explicit_timings() {
        let config = PollerConfig::from_json_str(
            r#"{ "nodes": [7], "reply_timeout_ms": 50, "interval_ms": 1000 }"#,
        )
        .unwrap();
        assert_eq!(config.reply_timeout(), Duration::from_millis(50));
        assert_eq!(config.interval(), Duration::from_secs(1));
    }

    #[test]
    fn empty_node_list_rejected() {
        assert!(matches!(
            PollerConfig::from_json_str(r#"{ "nodes": [] }"#),
            Err(ControllerError::InvalidConfig(_))
        ));
    }

    #[test]
    fn reserved_address_rejected() {
        assert!(matches!(
            PollerConfig::new(vec![1, 0]).validate(),
            Err(ControllerError::InvalidAddress(0))
        ));
        assert!(matches!(
            PollerConfig::new(vec![248]).validate(),
            Err(ControllerError::InvalidAddress(248))
        ));
    }

    #[test]
    fn duplicate_address_rejected() {
        let err = PollerConfig::new(vec![1, 2, 1]).validate().unwrap_err();
        assert!(err.to_string().contains("node 1 listed more than once"));
    }

    #[test]
    fn zero_durations_rejected() {
        let mut config = PollerConfig::new(vec![1]);
        config.reply_timeout_ms = 0;
        assert!(config.validate().is_err());

        let mut config = PollerConfig::new(vec![1]);
        config.interval_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_file_reported_with_path() {
        let path = std::env::temp_dir().join("tmonbus-poller-config-does-not-exist.json");
        assert!(matches!(
            PollerConfig::load(&path),
            Err(ControllerError::ConfigRead { .. })
        ));
    }
}
