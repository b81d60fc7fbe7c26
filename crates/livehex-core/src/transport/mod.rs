//! Blocking request/response access to remote memory.

pub mod protocol;
mod tcp;

#[cfg(test)]
pub(crate) mod mock;

use std::sync::Arc;
use std::time::Duration;

use crate::error::Result;

pub use tcp::{SysBotClient, TcpConnector};

/// One open connection to the remote process.
///
/// Calls block until the remote answers or the socket timeout expires.
/// Nothing here retries.
pub trait MemoryTransport: Send {
    /// Read exactly `length` bytes starting at `offset`.
    fn read_bytes(&mut self, offset: u32, length: usize) -> Result<Vec<u8>>;

    fn write_bytes(&mut self, offset: u32, data: &[u8]) -> Result<()>;

    /// Close the connection. Safe to call more than once.
    fn disconnect(&mut self);

    fn is_connected(&self) -> bool;

    /// Handle that can break a blocked call from another thread.
    fn abort_handle(&self) -> Arc<dyn AbortHandle>;

    /// `host:port` of the remote, for logging.
    fn peer(&self) -> &str;
}

/// Interrupts whatever call is in flight on a transport.
pub trait AbortHandle: Send + Sync {
    fn abort(&self);
}

/// Opens fresh transports.
pub trait Connector: Send + Sync {
    fn connect(&self, host: &str, port: u16, timeout: Duration)
    -> Result<Box<dyn MemoryTransport>>;
}
