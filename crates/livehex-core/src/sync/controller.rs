use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use tracing::{debug, info, warn};

use super::events::{EventSink, LogSink, SyncEvent};
use super::state::{LinkState, LinkStatus};
use crate::collection::{
    BoxSnapshot, ChangeKind, SlotListener, SlotLocation, SlotPublisher, SlotPublisherSource,
    SlotRef, SubscriptionId,
};
use crate::config::SyncConfig;
use crate::error::{Error, Result};
use crate::offsets::OffsetEntry;
use crate::probe::{ProbeWatch, VersionProber};
use crate::record::{PkxDecoder, RecordDecoder, validate_record};
use crate::trainer::HasTrainerBlock;
use crate::transport::protocol::check_span;
use crate::transport::{AbortHandle, Connector, MemoryTransport, TcpConnector};
use crate::version::TargetVersion;

struct Session {
    transport: Box<dyn MemoryTransport>,
    version: TargetVersion,
    entry: &'static OffsetEntry,
}

/// Keeps the local record collection and the remote process's boxes in step.
///
/// Every transport call runs under one session lock, so operations against the
/// remote complete in the order they were issued and never interleave on the
/// socket. A bulk `write_box` holds the lock for the whole box; a mirrored
/// slot edit therefore lands entirely before or entirely after it.
///
/// Any I/O failure drops the controller to [`LinkState::Disconnected`]. Nothing
/// is retried and nothing reconnects on its own.
pub struct LiveSyncController {
    config: SyncConfig,
    connector: Box<dyn Connector>,
    decoder: Box<dyn RecordDecoder>,
    publisher: Arc<dyn SlotPublisher>,
    events: Box<dyn EventSink>,
    session: Mutex<Option<Session>>,
    status: Mutex<LinkStatus>,
    abort: Mutex<Option<Arc<dyn AbortHandle>>>,
    connect_cancelled: AtomicBool,
    subscription: Mutex<Option<SubscriptionId>>,
    mirror_slot_edits: AtomicBool,
    mirror_box_selection: AtomicBool,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl LiveSyncController {
    /// Controller speaking TCP and decoding with the collection's own format.
    pub fn new(config: SyncConfig, publisher: Arc<dyn SlotPublisher>) -> Self {
        let decoder = PkxDecoder::new(publisher.record_format());
        Self {
            mirror_slot_edits: AtomicBool::new(config.mirror_slot_edits),
            mirror_box_selection: AtomicBool::new(config.mirror_box_selection),
            config,
            connector: Box::new(TcpConnector),
            decoder: Box::new(decoder),
            publisher,
            events: Box::new(LogSink),
            session: Mutex::new(None),
            status: Mutex::new(LinkStatus::default()),
            abort: Mutex::new(None),
            connect_cancelled: AtomicBool::new(false),
            subscription: Mutex::new(None),
        }
    }

    /// Controller bound to the collection a host editor exposes.
    pub fn for_host(config: SyncConfig, host: &dyn SlotPublisherSource) -> Self {
        Self::new(config, host.slot_publisher())
    }

    pub fn with_connector(mut self, connector: Box<dyn Connector>) -> Self {
        self.connector = connector;
        self
    }

    pub fn with_decoder(mut self, decoder: Box<dyn RecordDecoder>) -> Self {
        self.decoder = decoder;
        self
    }

    pub fn with_events(mut self, events: Box<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn publisher(&self) -> &Arc<dyn SlotPublisher> {
        &self.publisher
    }

    pub fn status(&self) -> LinkStatus {
        *lock(&self.status)
    }

    pub fn state(&self) -> LinkState {
        self.status().state
    }

    pub fn is_connected(&self) -> bool {
        self.state() == LinkState::Connected
    }

    pub fn version(&self) -> Option<TargetVersion> {
        self.status().version
    }

    pub fn set_mirror_slot_edits(&self, enabled: bool) {
        self.mirror_slot_edits.store(enabled, Ordering::SeqCst);
    }

    pub fn mirror_slot_edits(&self) -> bool {
        self.mirror_slot_edits.load(Ordering::SeqCst)
    }

    pub fn set_mirror_box_selection(&self, enabled: bool) {
        self.mirror_box_selection.store(enabled, Ordering::SeqCst);
    }

    pub fn mirror_box_selection(&self) -> bool {
        self.mirror_box_selection.load(Ordering::SeqCst)
    }

    fn set_status(&self, state: LinkState, version: Option<TargetVersion>, validated: bool) {
        let mut status = lock(&self.status);
        if !status.state.can_transition_to(state) {
            debug!("Link state {} -> {}", status.state, state);
        }
        *status = LinkStatus {
            state,
            version,
            validated,
        };
    }

    /// Subscribe to local edits. The publisher only holds a weak reference.
    pub fn attach(self: &Arc<Self>) {
        let mut subscription = lock(&self.subscription);
        if subscription.is_some() {
            return;
        }
        let listener = Arc::new(WeakListener(Arc::downgrade(self)));
        *subscription = Some(self.publisher.subscribe(listener));
    }

    pub fn detach(&self) {
        if let Some(id) = lock(&self.subscription).take() {
            self.publisher.unsubscribe(id);
        }
    }

    /// Probe the remote, open a session and pull the currently selected box.
    ///
    /// When `trainer` is given, the trainer block is copied into it as well.
    /// Returns the layout in use; check [`LinkStatus::validated`] before
    /// writing, since an unconfirmed fallback layout may be active.
    ///
    /// A [`disconnect`](Self::disconnect) while probing aborts the probe and
    /// this returns [`Error::Aborted`].
    pub fn connect(&self, trainer: Option<&mut dyn HasTrainerBlock>) -> Result<TargetVersion> {
        let version = {
            let mut session = lock(&self.session);
            if let Some(existing) = session.as_ref() {
                debug!("Already connected using {}", existing.version);
                return Ok(existing.version);
            }

            self.connect_cancelled.store(false, Ordering::SeqCst);
            self.set_status(LinkState::Connecting, None, false);
            info!(
                "Connecting to {}:{} ({})",
                self.config.host,
                self.config.port,
                self.publisher.record_format()
            );

            let watch = ConnectWatch {
                cancelled: &self.connect_cancelled,
                abort: &self.abort,
            };
            let prober =
                VersionProber::new(&*self.connector, &*self.decoder, self.config.timeout)
                    .with_watch(&watch);
            let outcome = match prober.probe(
                &self.config.host,
                self.config.port,
                self.publisher.record_format(),
            ) {
                Ok(outcome) => outcome,
                Err(e) => {
                    lock(&self.abort).take();
                    self.set_status(LinkState::Disconnected, None, false);
                    self.events.report(SyncEvent::Disconnected {
                        reason: Some(e.to_string()),
                    });
                    return Err(e);
                }
            };

            *lock(&self.abort) = Some(outcome.transport.abort_handle());
            *session = Some(Session {
                transport: outcome.transport,
                version: outcome.version,
                entry: crate::offsets::lookup(outcome.version),
            });
            self.set_status(
                LinkState::Connected,
                Some(outcome.version),
                outcome.validated,
            );
            self.events.report(SyncEvent::Connected {
                version: outcome.version,
                validated: outcome.validated,
            });
            if !outcome.validated {
                self.events.report(SyncEvent::UnvalidatedLayout {
                    version: outcome.version,
                });
            }
            outcome.version
        };

        self.read_box(self.publisher.current_box())?;

        if let Some(trainer) = trainer {
            match self.pull_trainer_block(trainer) {
                Ok(()) => {}
                Err(Error::TrainerBlockMismatch { expected, actual }) => {
                    warn!(
                        "Trainer data not loaded: layout has {}, save has {}",
                        expected, actual
                    );
                }
                Err(e) => return Err(e),
            }
        }

        Ok(version)
    }

    /// Close the session. Aborts any call in flight, probing included; that
    /// call fails with an I/O error.
    pub fn disconnect(&self) {
        // Set before taking the handle so a probe publishing a new one sees it.
        self.connect_cancelled.store(true, Ordering::SeqCst);
        let abort = lock(&self.abort).take();
        if let Some(abort) = abort {
            abort.abort();
        }

        let mut session = lock(&self.session);
        if let Some(mut active) = session.take() {
            active.transport.disconnect();
            self.events.report(SyncEvent::Disconnected { reason: None });
        }
        self.set_status(LinkState::Disconnected, None, false);
    }

    /// Run `op` against the live session, dropping it on I/O failure.
    fn with_session<T>(&self, op: impl FnOnce(&mut Session) -> Result<T>) -> Result<T> {
        let mut guard = lock(&self.session);
        let Some(session) = guard.as_mut() else {
            return Err(Error::NotConnected);
        };

        let result = op(session);
        if let Err(e) = &result
            && e.is_io()
            && let Some(mut failed) = guard.take()
        {
            warn!("Session with {} lost: {}", failed.transport.peer(), e);
            failed.transport.disconnect();
            lock(&self.abort).take();
            self.set_status(LinkState::Disconnected, None, false);
            self.events.report(SyncEvent::Disconnected {
                reason: Some(e.to_string()),
            });
        }
        result
    }

    /// Layout of the active session.
    pub fn layout(&self) -> Result<&'static OffsetEntry> {
        self.version()
            .map(crate::offsets::lookup)
            .ok_or(Error::NotConnected)
    }

    fn check_slot_len(entry: &OffsetEntry, data: &[u8]) -> Result<()> {
        if data.len() != entry.slot_size as usize {
            return Err(Error::InvalidInput(format!(
                "slot data is {} bytes, layout expects {}",
                data.len(),
                entry.slot_size
            )));
        }
        Ok(())
    }

    /// Read every slot of a box and publish it into the local collection.
    pub fn read_box(&self, box_index: u8) -> Result<BoxSnapshot> {
        let snapshot = self.with_session(|session| {
            let entry = session.entry;
            entry.check_box(box_index)?;
            let mut slots = Vec::with_capacity(entry.slots_per_box as usize);
            for slot in 0..entry.slots_per_box as u8 {
                let address = entry.slot_address(box_index, slot)?;
                slots.push(
                    session
                        .transport
                        .read_bytes(address, entry.slot_size as usize)?,
                );
            }
            Ok(BoxSnapshot { box_index, slots })
        })?;

        debug!("Read box {}", u16::from(box_index) + 1);
        self.publisher.replace_box(&snapshot);
        Ok(snapshot)
    }

    /// Write every slot of `snapshot` to the remote, in slot order.
    ///
    /// Not transactional. If slot `k` fails, slots before it are already
    /// written and the remote box matches neither the old nor the new local
    /// state; re-read it before trusting either.
    pub fn write_box(&self, snapshot: &BoxSnapshot) -> Result<()> {
        let box_index = snapshot.box_index;
        self.with_session(|session| {
            let entry = session.entry;
            entry.check_box(box_index)?;
            if snapshot.slots.len() != entry.slots_per_box as usize {
                return Err(Error::InvalidInput(format!(
                    "box snapshot has {} slots, layout has {}",
                    snapshot.slots.len(),
                    entry.slots_per_box
                )));
            }
            for data in &snapshot.slots {
                Self::check_slot_len(entry, data)?;
            }

            for (slot, data) in snapshot.slots.iter().enumerate() {
                let slot = slot as u8;
                let address = entry.slot_address(box_index, slot)?;
                session
                    .transport
                    .write_bytes(address, data)
                    .map_err(|e| Error::BoxWriteFailed {
                        box_index,
                        slot,
                        source: Box::new(e),
                    })?;
            }
            Ok(())
        })?;

        debug!("Wrote box {}", u16::from(box_index) + 1);
        Ok(())
    }

    /// Write a box as the local collection currently holds it.
    pub fn push_box(&self, box_index: u8) -> Result<()> {
        let entry = self.layout()?;
        entry.check_box(box_index)?;
        let slots = (0..entry.slots_per_box as u8)
            .map(|slot| {
                self.publisher
                    .slot_data(SlotRef::new(box_index, slot))
                    .ok_or_else(|| {
                        Error::InvalidInput(format!(
                            "local collection has no {}",
                            SlotRef::new(box_index, slot)
                        ))
                    })
            })
            .collect::<Result<Vec<_>>>()?;
        self.write_box(&BoxSnapshot { box_index, slots })
    }

    /// Read one slot and publish it into the local collection.
    pub fn read_active_slot(&self, box_index: u8, slot: u8) -> Result<Vec<u8>> {
        let data = self.with_session(|session| {
            let address = session.entry.slot_address(box_index, slot)?;
            session
                .transport
                .read_bytes(address, session.entry.slot_size as usize)
        })?;
        self.publisher
            .replace_slot(SlotRef::new(box_index, slot), &data);
        Ok(data)
    }

    pub fn write_active_slot(&self, box_index: u8, slot: u8, data: &[u8]) -> Result<()> {
        self.with_session(|session| {
            let address = session.entry.slot_address(box_index, slot)?;
            Self::check_slot_len(session.entry, data)?;
            session.transport.write_bytes(address, data)
        })
    }

    /// Select `box_index` on the remote by writing the game's current-box field.
    pub fn change_box(&self, box_index: u8) -> Result<()> {
        self.with_session(|session| {
            let version = session.version;
            let entry = session.entry;
            entry.check_box(box_index)?;
            let offset = entry.current_box_offset.ok_or_else(|| {
                Error::Unsupported(format!("{} has no current box field", version))
            })?;
            session
                .transport
                .write_bytes(offset, &u32::from(box_index).to_le_bytes())
        })
    }

    /// Local box navigation hook. Only reaches the remote when box selection
    /// mirroring is enabled; returns whether a write was issued.
    pub fn on_local_box_selected(&self, box_index: u8) -> bool {
        if !self.mirror_box_selection() || !self.is_connected() {
            return false;
        }
        if let Err(e) = self.change_box(box_index) {
            self.events.report(SyncEvent::BoxSelectionFailed {
                box_index,
                error: e.to_string(),
            });
        }
        true
    }

    /// Copy the trainer block into `target`.
    pub fn pull_trainer_block(&self, target: &mut dyn HasTrainerBlock) -> Result<()> {
        let data = self.with_session(|session| {
            let entry = session.entry;
            if entry.trainer_block_kind != target.trainer_block_kind() {
                return Err(Error::TrainerBlockMismatch {
                    expected: entry.trainer_block_kind.to_string(),
                    actual: target.trainer_block_kind().to_string(),
                });
            }
            session.transport.read_bytes(
                entry.trainer_block_offset,
                entry.trainer_block_size as usize,
            )
        })?;
        target.load_trainer_block(&data)
    }

    pub fn read_ram(&self, offset: u32, length: usize) -> Result<Vec<u8>> {
        if length == 0 {
            return Err(Error::InvalidInput("length must be positive".to_string()));
        }
        check_span(offset, length)?;
        self.with_session(|session| session.transport.read_bytes(offset, length))
    }

    pub fn write_ram(&self, offset: u32, data: &[u8]) -> Result<()> {
        if data.is_empty() {
            return Err(Error::InvalidInput("nothing to write".to_string()));
        }
        check_span(offset, data.len())?;
        self.with_session(|session| session.transport.write_bytes(offset, data))
    }

    /// Read one slot's worth of bytes at an arbitrary offset and keep them
    /// only if they decode to a plausible record.
    pub fn read_record_at(&self, offset: u32) -> Result<Option<Vec<u8>>> {
        let data = self.with_session(|session| {
            let length = session.entry.slot_size as usize;
            check_span(offset, length)?;
            session.transport.read_bytes(offset, length)
        })?;
        let verdict = validate_record(&*self.decoder, &data);
        if verdict.is_valid() {
            Ok(Some(data))
        } else {
            debug!("No record at 0x{:08X}: {:?}", offset, verdict);
            Ok(None)
        }
    }

    fn mirror_slot(&self, slot: SlotRef) {
        let Some(data) = self.publisher.slot_data(slot) else {
            warn!("{} changed but the collection has no data for it", slot);
            return;
        };
        let event = match self.write_active_slot(slot.box_index, slot.slot, &data) {
            Ok(()) => SyncEvent::MirrorWritten { slot },
            Err(e) => SyncEvent::MirrorFailed {
                slot,
                error: e.to_string(),
            },
        };
        self.events.report(event);
    }
}

impl SlotListener for LiveSyncController {
    fn on_slot_changed(&self, location: SlotLocation, kind: ChangeKind) {
        if !self.mirror_slot_edits() || !self.is_connected() || !kind.is_content_change() {
            return;
        }
        // Party slots live outside the box layout.
        if let SlotLocation::Box(slot) = location {
            self.mirror_slot(slot);
        }
    }
}

impl Drop for LiveSyncController {
    fn drop(&mut self) {
        self.detach();
        self.disconnect();
    }
}

/// Publishes probe connections to the controller's abort slot.
struct ConnectWatch<'a> {
    cancelled: &'a AtomicBool,
    abort: &'a Mutex<Option<Arc<dyn AbortHandle>>>,
}

impl ProbeWatch for ConnectWatch<'_> {
    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    fn opened(&self, abort: Arc<dyn AbortHandle>) {
        *lock(self.abort) = Some(abort);
    }
}

/// Publisher-side handle that does not keep the controller alive.
struct WeakListener(Weak<LiveSyncController>);

impl SlotListener for WeakListener {
    fn on_slot_changed(&self, location: SlotLocation, kind: ChangeKind) {
        if let Some(controller) = self.0.upgrade() {
            controller.on_slot_changed(location, kind);
        }
    }
}
