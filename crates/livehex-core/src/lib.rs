//! # livehex-core
//!
//! Live synchronization between a local record collection and the boxes of a
//! game running on a console with a sys-botbase debug server.
//!
//! This crate provides:
//! - Static memory layouts per supported game build, with slot addressing
//! - A blocking TCP client for the sys-botbase `peek`/`poke` protocol
//! - PK8/PB7 record decryption and checksum validation
//! - Version probing against the remote process
//! - A sync controller that reads and writes boxes, mirrors local edits and
//!   pulls the trainer block
//! - Raw peek/poke with operator input validation
//! - A background worker and JSON box dumps

pub mod bridge;
pub mod collection;
pub mod config;
pub mod dump;
pub mod error;
pub mod offsets;
pub mod prelude;
pub mod probe;
pub mod record;
pub mod sync;
pub mod trainer;
pub mod transport;
pub mod version;
pub mod worker;

pub use bridge::{RawMemoryBridge, parse_hex_bytes, parse_hex_offset, parse_size};
pub use collection::{
    BoxCollection, BoxSnapshot, ChangeKind, SlotListener, SlotLocation, SlotPublisher,
    SlotPublisherSource, SlotRef, SubscriptionId,
};
pub use config::{SyncConfig, SyncConfigBuilder};
pub use dump::BoxDump;
pub use error::{Error, ErrorKind, Result};
pub use offsets::{OffsetEntry, lookup, valid_versions};
pub use probe::{ProbeOutcome, ProbeWatch, VersionProber};
pub use record::{
    Pkx, PkxDecoder, Record, RecordDecoder, RecordVerdict, blank_record, validate_record,
};
pub use sync::{EventSink, LinkState, LinkStatus, LiveSyncController, LogSink, SyncEvent};
pub use trainer::{HasTrainerBlock, TrainerInfo};
pub use transport::{AbortHandle, Connector, MemoryTransport, SysBotClient, TcpConnector};
pub use version::{RecordFormat, TargetVersion, TrainerBlockKind};
pub use worker::{Job, JobId, JobOutput, JobResult, MirrorForwarder, SyncWorker};
