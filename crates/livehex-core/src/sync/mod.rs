//! Live box synchronization against a connected remote process.

mod controller;
mod events;
mod state;

pub use controller::LiveSyncController;
pub use events::{EventSink, LogSink, SyncEvent};
pub use state::{LinkState, LinkStatus};
