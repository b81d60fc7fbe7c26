use std::sync::mpsc::Sender;

use tracing::{info, warn};

use crate::collection::SlotRef;
use crate::version::TargetVersion;

/// Notifications raised outside the call that caused them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    Connected {
        version: TargetVersion,
        validated: bool,
    },
    /// Running on a layout that never matched the remote. Writes may corrupt it.
    UnvalidatedLayout { version: TargetVersion },
    Disconnected { reason: Option<String> },
    MirrorWritten { slot: SlotRef },
    MirrorFailed { slot: SlotRef, error: String },
    BoxSelectionFailed { box_index: u8, error: String },
}

/// Side channel for [`SyncEvent`]s.
pub trait EventSink: Send + Sync {
    fn report(&self, event: SyncEvent);
}

/// Writes events to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl EventSink for LogSink {
    fn report(&self, event: SyncEvent) {
        match event {
            SyncEvent::Connected { version, validated } => {
                info!("Connected using {} (validated: {})", version, validated)
            }
            SyncEvent::UnvalidatedLayout { version } => warn!(
                "Layout {} was not confirmed by the remote; writes may land on the wrong data",
                version
            ),
            SyncEvent::Disconnected { reason: Some(reason) } => {
                warn!("Disconnected: {}", reason)
            }
            SyncEvent::Disconnected { reason: None } => info!("Disconnected"),
            SyncEvent::MirrorWritten { slot } => info!("Mirrored {}", slot),
            SyncEvent::MirrorFailed { slot, error } => {
                warn!("Mirroring {} failed: {}", slot, error)
            }
            SyncEvent::BoxSelectionFailed { box_index, error } => warn!(
                "Remote box change to {} failed: {}",
                u16::from(box_index) + 1,
                error
            ),
        }
    }
}

impl EventSink for Sender<SyncEvent> {
    fn report(&self, event: SyncEvent) {
        let _ = self.send(event);
    }
}
