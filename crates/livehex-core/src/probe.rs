//! Remote layout detection.
//!
//! The remote never reports which game build it runs, so each candidate
//! layout is tested by reading its first box slot and checking that the bytes
//! decode to a plausible record.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::offsets::{lookup, valid_versions};
use crate::record::{RecordDecoder, RecordVerdict, validate_record};
use crate::transport::{AbortHandle, Connector, MemoryTransport};
use crate::version::{RecordFormat, TargetVersion};

/// Result of a successful probe. The transport is left open.
pub struct ProbeOutcome {
    pub version: TargetVersion,
    /// `false` when no candidate validated and the fallback layout was assumed
    pub validated: bool,
    pub transport: Box<dyn MemoryTransport>,
}

impl std::fmt::Debug for ProbeOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProbeOutcome")
            .field("version", &self.version)
            .field("validated", &self.validated)
            .field("peer", &self.transport.peer())
            .finish()
    }
}

/// Lets the caller cancel a probe from another thread.
pub trait ProbeWatch: Sync {
    /// Checked before each connection is opened.
    fn is_cancelled(&self) -> bool;

    /// Called with each connection's abort handle as soon as it is open.
    fn opened(&self, abort: Arc<dyn AbortHandle>);
}

pub struct VersionProber<'a> {
    connector: &'a dyn Connector,
    decoder: &'a dyn RecordDecoder,
    timeout: Duration,
    watch: Option<&'a dyn ProbeWatch>,
}

impl<'a> VersionProber<'a> {
    pub fn new(
        connector: &'a dyn Connector,
        decoder: &'a dyn RecordDecoder,
        timeout: Duration,
    ) -> Self {
        Self {
            connector,
            decoder,
            timeout,
            watch: None,
        }
    }

    pub fn with_watch(mut self, watch: &'a dyn ProbeWatch) -> Self {
        self.watch = Some(watch);
        self
    }

    fn is_cancelled(&self) -> bool {
        self.watch.is_some_and(|w| w.is_cancelled())
    }

    /// Open a connection, publishing its abort handle to the watch.
    fn open(&self, host: &str, port: u16) -> Result<Box<dyn MemoryTransport>> {
        if self.is_cancelled() {
            return Err(Error::Aborted);
        }
        let mut transport = self.connector.connect(host, port, self.timeout)?;
        if let Some(watch) = self.watch {
            watch.opened(transport.abort_handle());
            // A cancel may have raced the publish.
            if watch.is_cancelled() {
                transport.disconnect();
                return Err(Error::Aborted);
            }
        }
        Ok(transport)
    }

    /// Pick the first candidate for `format` whose box 1 / slot 1 holds a valid record.
    ///
    /// If none does, a connection using [`TargetVersion::FALLBACK`] is returned
    /// with `validated == false`. That layout was never checked against the
    /// remote and writes through it may land on unrelated memory.
    ///
    /// Fails with [`Error::Aborted`] once the watch reports a cancel.
    pub fn probe(&self, host: &str, port: u16, format: RecordFormat) -> Result<ProbeOutcome> {
        let candidates = valid_versions(format);

        for (attempt, &version) in candidates.iter().enumerate() {
            match self.try_candidate(host, port, version) {
                Ok(Some(transport)) => {
                    info!("Detected remote layout {}", version);
                    return Ok(ProbeOutcome {
                        version,
                        validated: true,
                        transport,
                    });
                }
                Ok(None) => {}
                Err(Error::Aborted) => return Err(Error::Aborted),
                Err(e) => {
                    debug!(
                        "Candidate {} unreachable: {} (attempt {}/{})",
                        version,
                        e,
                        attempt + 1,
                        candidates.len()
                    );
                }
            }
        }

        warn!(
            "No candidate layout validated for {}; assuming {} without validation",
            format,
            TargetVersion::FALLBACK
        );
        let transport = self.open(host, port)?;
        Ok(ProbeOutcome {
            version: TargetVersion::FALLBACK,
            validated: false,
            transport,
        })
    }

    fn try_candidate(
        &self,
        host: &str,
        port: u16,
        version: TargetVersion,
    ) -> Result<Option<Box<dyn MemoryTransport>>> {
        let entry = lookup(version);
        let mut transport = self.open(host, port)?;

        let address = entry.slot_address(0, 0)?;
        let verdict = match transport.read_bytes(address, entry.slot_size as usize) {
            Ok(bytes) => validate_record(self.decoder, &bytes),
            Err(e) => RecordVerdict::Undecodable(e.to_string()),
        };

        if verdict.is_valid() {
            return Ok(Some(transport));
        }

        debug!(
            "Candidate {} rejected at 0x{:08X}: {:?}",
            version, address, verdict
        );
        transport.disconnect();
        Ok(None)
    }
}
