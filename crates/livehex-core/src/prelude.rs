//! Prelude module for convenient imports
//!
//! ```ignore
//! use livehex_core::prelude::*;
//! ```
//!
//! This brings the following into scope:
//!
//! - Controller and worker: `LiveSyncController`, `SyncWorker`, `Job`
//! - Configuration: `SyncConfig`, `SyncConfigBuilder`
//! - Collection: `BoxCollection`, `BoxSnapshot`, `SlotRef`, `SlotPublisher`
//! - Layouts: `TargetVersion`, `RecordFormat`
//! - Error handling: `Error`, `Result`

// Sync
pub use crate::bridge::RawMemoryBridge;
pub use crate::sync::{LinkState, LiveSyncController, SyncEvent};
pub use crate::worker::{Job, JobOutput, SyncWorker};

// Configuration
pub use crate::config::{SyncConfig, SyncConfigBuilder};

// Collection
pub use crate::collection::{BoxCollection, BoxSnapshot, SlotListener, SlotPublisher, SlotRef};

// Layouts
pub use crate::version::{RecordFormat, TargetVersion};

// Trainer data
pub use crate::trainer::{HasTrainerBlock, TrainerInfo};

// Error handling
pub use crate::error::{Error, Result};
