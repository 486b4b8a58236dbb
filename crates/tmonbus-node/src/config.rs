use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tmonbus_frame::is_valid_address;

use crate::error::{NodeError, Result};

/// Default bound on a single receive while serving (200 ms).
pub const DEFAULT_RECEIVE_TIMEOUT_MS: u64 = 200;

/// Node settings.
///
/// Loadable from JSON:
///
/// ```json
/// { "address": 3, "push_to": "192.168.1.10:5555", "push_interval_ms": 1000 }
/// ```
///
/// Without `push_to` the node answers POLLs; with it the node pushes
/// unsolicited REPLYs to that address every `push_interval_ms` instead.
/// An interval without a target is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NodeConfig {
    pub address: u8,

    #[serde(default)]
    pub promiscuous: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub push_to: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub push_interval_ms: Option<u64>,

    #[serde(default = "default_receive_timeout_ms")]
    pub receive_timeout_ms: u64,
}

fn default_receive_timeout_ms() -> u64 {
    DEFAULT_RECEIVE_TIMEOUT_MS
}

impl NodeConfig {
    /// Polled node at `address` with default timings.
    pub fn new(address: u8) -> Self {
        Self {
            address,
            promiscuous: false,
            push_to: None,
            push_interval_ms: None,
            receive_timeout_ms: DEFAULT_RECEIVE_TIMEOUT_MS,
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
        let text = std::fs::read_to_string(path).map_err(|source| NodeError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    pub fn validate(&self) -> Result<()> {
        if !is_valid_address(self.address) {
            return Err(NodeError::InvalidAddress(self.address));
        }
        if self.receive_timeout_ms == 0 {
            return Err(NodeError::InvalidConfig(
                "receive_timeout_ms must be greater than zero".to_string(),
            ));
        }
        if self.push_interval_ms == Some(0) {
            return Err(NodeError::InvalidConfig(
                "push_interval_ms must be greater than zero".to_string(),
            ));
        }
        match self.push_to.as_deref() {
            Some(target) if target.trim().is_empty() => Err(NodeError::InvalidConfig(
                "push_to must not be empty".to_string(),
            )),
            None if self.push_interval_ms.is_some() => Err(NodeError::InvalidConfig(
                "push_interval_ms is set but push_to is missing".to_string(),
            )),
            _ => Ok(()),
        }
    }

    /// True when the node pushes readings instead of answering POLLs.
    pub fn is_push(&self) -> bool {
        self.push_to.is_some()
    }

    /// Push period, when running in push mode.
    pub fn push_interval(&self) -> Option<Duration> {
        self.push_interval_ms.map(Duration::from_millis)
    }

    pub fn receive_timeout(&self) -> Duration {
        Duration::from_millis(self.receive_timeout_ms)
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self::new(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_document_gets_defaults() {
        let config = NodeConfig::from_json_str(r#"{ "address": 3 }"#).unwrap();
        assert_eq!(config, NodeConfig::new(3));
        assert_eq!(config.receive_timeout(), Duration::from_millis(200));
        assert_eq!(config.push_interval(), None);
        assert!(!config.is_push());
    }

    #[test]
    fn push_mode_document() {
        let config = NodeConfig::from_json_str(
            r#"{ "address": 12, "promiscuous": true,
                 "push_to": "127.0.0.1:5555", "push_interval_ms": 1500 }"#,
        )
        .unwrap();
        assert!(config.promiscuous);
        assert!(config.is_push());
        assert_eq!(config.push_to.as_deref(), Some("127.0.0.1:5555"));
        assert_eq!(config.push_interval(), Some(Duration::from_millis(1500)));
    }

    #[test]
    fn reserved_addresses_rejected() {
        for address in [0, 248, 255] {
            let json = format!(r#"{{ "address": {address} }}"#);
            assert!(matches!(
                NodeConfig::from_json_str(&json),
                Err(NodeError::InvalidAddress(a)) if a == address
            ));
        }
    }

    #[test]
    fn zero_durations_rejected() {
        assert!(matches!(
            NodeConfig::from_json_str(r#"{ "address": 3, "receive_timeout_ms": 0 }"#),
            Err(NodeError::InvalidConfig(_))
        ));
        assert!(matches!(
            NodeConfig::from_json_str(
                r#"{ "address": 3, "push_to": "127.0.0.1:5555", "push_interval_ms": 0 }"#
            ),
            Err(NodeError::InvalidConfig(_))
        ));
    }

    #[test]
    fn push_interval_without_target_rejected() {
        let err = NodeConfig::from_json_str(r#"{ "address": 3, "push_interval_ms": 1000 }"#)
            .unwrap_err();
        assert!(matches!(err, NodeError::InvalidConfig(ref msg) if msg.contains("push_to")));
        assert!(matches!(
            NodeConfig::from_json_str(r#"{ "address": 3, "push_to": " " }"#),
            Err(NodeError::InvalidConfig(_))
        ));
    }

    #[test]
    fn unknown_fields_and_bad_json_rejected() {
        assert!(matches!(
            NodeConfig::from_json_str(r#"{ "address": 3, "adress": 4 }"#),
            Err(NodeError::Json(_))
        ));
        assert!(matches!(
            NodeConfig::from_json_str("{"),
            Err(NodeError::Json(_))
        ));
    }

    #[test]
    fn load_reports_missing_file() {
        let path = std::env::temp_dir().join("tmonbus-node-config-does-not-exist.json");
        assert!(matches!(
            NodeConfig::load(&path),
            Err(NodeError::ConfigRead { path: p, .. }) if p == path
        ));
    }

    #[test]
    fn load_from_file() {
        let path = std::env::temp_dir().join(format!(
            "tmonbus-node-config-{}.json",
            std::process::id()
        ));
        std::fs::write(&path, r#"{ "address": 7, "receive_timeout_ms": 50 }"#).unwrap();
        let config = NodeConfig::load(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(config.address, 7);
        assert_eq!(config.receive_timeout(), Duration::from_millis(50));
    }
}
