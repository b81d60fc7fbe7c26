//! Connection settings handed to the controller at construction.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::transport::protocol::DEFAULT_PORT;

/// Default socket timeout for connect, read and write
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub host: String,
    pub port: u16,
    /// Socket timeout, in milliseconds on disk
    #[serde(with = "duration_ms")]
    pub timeout: Duration,
    /// Push local slot edits to the remote as they happen
    pub mirror_slot_edits: bool,
    /// Follow local box navigation on the remote
    pub mirror_box_selection: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            host: "192.168.0.1".to_string(),
            port: DEFAULT_PORT,
            timeout: DEFAULT_TIMEOUT,
            mirror_slot_edits: false,
            mirror_box_selection: false,
        }
    }
}

impl SyncConfig {
    pub fn builder() -> SyncConfigBuilder {
        SyncConfigBuilder::default()
    }
}

#[derive(Debug, Clone, Default)]
pub struct SyncConfigBuilder {
    host: Option<String>,
    port: Option<u16>,
    timeout: Option<Duration>,
    mirror_slot_edits: Option<bool>,
    mirror_box_selection: Option<bool>,
}

impl SyncConfigBuilder {
    pub fn host<S: Into<String>>(mut self, host: S) -> Self {
        self.host = Some(host.into());
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn mirror_slot_edits(mut self, enabled: bool) -> Self {
        self.mirror_slot_edits = Some(enabled);
        self
    }

    pub fn mirror_box_selection(mut self, enabled: bool) -> Self {
        self.mirror_box_selection = Some(enabled);
        self
    }

    pub fn build(self) -> SyncConfig {
        let default = SyncConfig::default();
        SyncConfig {
            host: self.host.unwrap_or(default.host),
            port: self.port.unwrap_or(default.port),
            timeout: self.timeout.unwrap_or(default.timeout),
            mirror_slot_edits: self.mirror_slot_edits.unwrap_or(default.mirror_slot_edits),
            mirror_box_selection: self
                .mirror_box_selection
                .unwrap_or(default.mirror_box_selection),
        }
    }
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let config = SyncConfig::builder().host("10.0.0.5").build();
        assert_eq!(config.host, "10.0.0.5");
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.timeout, DEFAULT_TIMEOUT);
        assert!(!config.mirror_slot_edits);
        assert!(!config.mirror_box_selection);
    }

    #[test]
    fn test_builder_overrides() {
        let config = SyncConfig::builder()
            .port(7000)
            .timeout(Duration::from_millis(250))
            .mirror_slot_edits(true)
            .mirror_box_selection(true)
            .build();
        assert_eq!(config.port, 7000);
        assert_eq!(config.timeout, Duration::from_millis(250));
        assert!(config.mirror_slot_edits && config.mirror_box_selection);
    }

    #[test]
    fn test_json_timeout_in_millis() {
        let json = r#"{"host":"10.0.0.9","timeout":1500}"#;
        let config: SyncConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.host, "10.0.0.9");
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.timeout, Duration::from_millis(1500));

        let back = serde_json::to_string(&config).unwrap();
        assert!(back.contains("\"timeout\":1500"));
    }
}
