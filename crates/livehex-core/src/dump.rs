//! Box snapshots saved to and loaded from JSON files.
//!
//! Each slot is stored as an uppercase hex string so dumps stay readable
//! and diffable.

use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::collection::BoxSnapshot;
use crate::error::{Error, Result};
use crate::version::TargetVersion;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoxDump {
    /// Layout the box was read with
    pub version: TargetVersion,
    /// Zero-based box index
    pub box_index: u8,
    pub created_at: DateTime<Utc>,
    /// One hex string per slot, in slot order
    pub slots: Vec<String>,
}

impl BoxDump {
    pub fn from_snapshot(version: TargetVersion, snapshot: &BoxSnapshot) -> Self {
        Self {
            version,
            box_index: snapshot.box_index,
            created_at: Utc::now(),
            slots: snapshot.slots.iter().map(|s| to_hex(s)).collect(),
        }
    }

    pub fn to_snapshot(&self) -> Result<BoxSnapshot> {
        let slots = self
            .slots
            .iter()
            .enumerate()
            .map(|(i, hex)| {
                from_hex(hex).map_err(|e| {
                    Error::InvalidInput(format!("dump slot {}: {}", i + 1, e))
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(BoxSnapshot {
            box_index: self.box_index,
            slots,
        })
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let dump: BoxDump = serde_json::from_str(&content)?;
        debug!(
            "Loaded box {} dump ({}, {} slots) from {}",
            u16::from(dump.box_index) + 1,
            dump.version,
            dump.slots.len(),
            path.display()
        );
        Ok(dump)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(&path, content)?;
        info!(
            "Saved box {} dump to {}",
            u16::from(self.box_index) + 1,
            path.as_ref().display()
        );
        Ok(())
    }
}

/// Uppercase hex without separators.
pub fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02X}", b)).collect()
}

fn from_hex(hex: &str) -> std::result::Result<Vec<u8>, String> {
    if hex.len() % 2 != 0 {
        return Err(format!("odd number of hex digits ({})", hex.len()));
    }
    (0..hex.len())
        .step_by(2)
        .map(|i| {
            hex.get(i..i + 2)
                .and_then(|pair| u8::from_str_radix(pair, 16).ok())
                .ok_or_else(|| format!("invalid hex at position {}", i))
        })
        .collect()
}
