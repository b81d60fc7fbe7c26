use thiserror::Error;

/// Coarse classification of [`Error`] used when reporting failures to the operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The socket could not be established, or there is no session.
    Connection,
    /// A read or write against the remote failed, timed out or came back short.
    Io,
    /// Bytes did not decode to a plausible record or block.
    Format,
    /// Operator input was rejected before any network traffic.
    Input,
    /// Local file or serialization failure.
    Local,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("Failed to connect to {address}: {message}")]
    ConnectionFailed { address: String, message: String },

    #[error("Not connected to a remote process")]
    NotConnected,

    #[error("Remote memory access at 0x{offset:08X} failed: {message}")]
    RemoteIo { offset: u32, message: String },

    #[error("Short read at 0x{offset:08X}: expected {expected} bytes, got {actual}")]
    ShortRead {
        offset: u32,
        expected: usize,
        actual: usize,
    },

    #[error("Operation aborted by disconnect")]
    Aborted,

    #[error("Box {box_index} write failed at slot {slot}: {source}")]
    BoxWriteFailed {
        box_index: u8,
        slot: u8,
        #[source]
        source: Box<Error>,
    },

    #[error("Invalid record data: {0}")]
    Format(String),

    #[error("Trainer block mismatch: layout uses {expected}, target holds {actual}")]
    TrainerBlockMismatch { expected: String, actual: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Box {box_index} slot {slot} is outside the layout ({boxes} boxes x {slots} slots)")]
    OutOfRange {
        box_index: u8,
        slot: u8,
        boxes: u32,
        slots: u32,
    },

    #[error("Unsupported for this layout: {0}")]
    Unsupported(String),

    #[error("IO error: {0}")]
    File(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Sync worker has stopped")]
    WorkerStopped,
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::ConnectionFailed { .. } | Error::NotConnected => ErrorKind::Connection,
            Error::RemoteIo { .. }
            | Error::ShortRead { .. }
            | Error::Aborted
            | Error::BoxWriteFailed { .. } => ErrorKind::Io,
            Error::Format(_) | Error::TrainerBlockMismatch { .. } => ErrorKind::Format,
            Error::InvalidInput(_) | Error::OutOfRange { .. } | Error::Unsupported(_) => {
                ErrorKind::Input
            }
            Error::File(_) | Error::Json(_) | Error::WorkerStopped => ErrorKind::Local,
        }
    }

    /// Whether this failure means the session can no longer be trusted.
    pub fn is_io(&self) -> bool {
        self.kind() == ErrorKind::Io
    }

    /// Wrap a socket error raised while talking to `offset`.
    pub(crate) fn remote(offset: u32, err: std::io::Error) -> Self {
        Error::RemoteIo {
            offset,
            message: err.to_string(),
        }
    }
}
