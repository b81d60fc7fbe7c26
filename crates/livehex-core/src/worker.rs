//! Background thread that runs controller operations off the caller's thread.
//!
//! Jobs run one at a time in submission order. Results come back on a
//! channel tagged with the id returned by [`SyncWorker::submit`].
//! [`SyncWorker::disconnect`] bypasses the queue so it can interrupt a job
//! that is stuck on the network.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, warn};

use crate::collection::{
    BoxSnapshot, ChangeKind, SlotListener, SlotLocation, SlotRef, SubscriptionId,
};
use crate::error::{Error, Result};
use crate::sync::LiveSyncController;
use crate::version::TargetVersion;

pub type JobId = u64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Job {
    Connect,
    ReadBox(u8),
    WriteBox(BoxSnapshot),
    PushBox(u8),
    ReadSlot(SlotRef),
    WriteSlot(SlotRef, Vec<u8>),
    ChangeBox(u8),
    /// Write the collection's current bytes for a slot, if mirroring allows it.
    Mirror(SlotRef),
    ReadRam { offset: u32, length: usize },
    WriteRam { offset: u32, data: Vec<u8> },
    LoadRecordAt(u32),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutput {
    Connected(TargetVersion),
    Box(BoxSnapshot),
    Bytes(Vec<u8>),
    Record(Option<Vec<u8>>),
    Done,
}

#[derive(Debug)]
pub struct JobResult {
    pub id: JobId,
    pub result: Result<JobOutput>,
}

enum Message {
    Run(JobId, Job),
    Shutdown,
}

#[derive(Clone)]
struct Queue {
    sender: Sender<Message>,
    next_id: Arc<AtomicU64>,
}

impl Queue {
    fn push(&self, job: Job) -> Result<JobId> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.sender
            .send(Message::Run(id, job))
            .map_err(|_| Error::WorkerStopped)?;
        Ok(id)
    }
}

pub struct SyncWorker {
    controller: Arc<LiveSyncController>,
    queue: Queue,
    results: Receiver<JobResult>,
    handle: Option<JoinHandle<()>>,
    subscription: Mutex<Option<SubscriptionId>>,
}

impl SyncWorker {
    pub fn spawn(controller: Arc<LiveSyncController>) -> Self {
        let (sender, jobs) = mpsc::channel();
        let (results_tx, results) = mpsc::channel();

        let worker_controller = controller.clone();
        let handle = thread::spawn(move || run(&worker_controller, &jobs, &results_tx));

        Self {
            controller,
            queue: Queue {
                sender,
                next_id: Arc::new(AtomicU64::new(1)),
            },
            results,
            handle: Some(handle),
            subscription: Mutex::new(None),
        }
    }

    pub fn controller(&self) -> &Arc<LiveSyncController> {
        &self.controller
    }

    /// Queue a job behind everything already submitted.
    pub fn submit(&self, job: Job) -> Result<JobId> {
        self.queue.push(job)
    }

    pub fn recv(&self) -> Result<JobResult> {
        self.results.recv().map_err(|_| Error::WorkerStopped)
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<JobResult> {
        match self.results.recv_timeout(timeout) {
            Ok(result) => Some(result),
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => None,
        }
    }

    pub fn try_recv(&self) -> Option<JobResult> {
        self.results.try_recv().ok()
    }

    /// Submit and wait for that job's result, discarding results of earlier jobs.
    pub fn run_blocking(&self, job: Job) -> Result<JobOutput> {
        let id = self.submit(job)?;
        loop {
            let result = self.recv()?;
            if result.id == id {
                return result.result;
            }
            debug!("Discarding result of job {}", result.id);
        }
    }

    /// Abort whatever is in flight and close the session. Does not wait in the queue.
    pub fn disconnect(&self) {
        self.controller.disconnect();
    }

    /// Listener that turns local slot edits into queued mirror jobs.
    pub fn forwarder(&self) -> Arc<MirrorForwarder> {
        Arc::new(MirrorForwarder {
            queue: self.queue.clone(),
        })
    }

    /// Route the collection's change notifications through this worker.
    pub fn attach(&self) {
        let mut subscription = self
            .subscription
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if subscription.is_none() {
            *subscription = Some(self.controller.publisher().subscribe(self.forwarder()));
        }
    }

    pub fn detach(&self) {
        let id = self
            .subscription
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        if let Some(id) = id {
            self.controller.publisher().unsubscribe(id);
        }
    }

    /// Finish queued jobs and stop the thread.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        self.detach();
        let _ = self.queue.sender.send(Message::Shutdown);
        if let Some(handle) = self.handle.take()
            && handle.join().is_err()
        {
            warn!("Sync worker thread panicked");
        }
    }
}

impl Drop for SyncWorker {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run(controller: &LiveSyncController, jobs: &Receiver<Message>, results: &Sender<JobResult>) {
    debug!("Sync worker started");
    while let Ok(Message::Run(id, job)) = jobs.recv() {
        debug!("Job {}: {:?}", id, JobLabel(&job));
        let result = execute(controller, job);
        if results.send(JobResult { id, result }).is_err() {
            break;
        }
    }
    debug!("Sync worker stopped");
}

fn execute(controller: &LiveSyncController, job: Job) -> Result<JobOutput> {
    match job {
        Job::Connect => controller.connect(None).map(JobOutput::Connected),
        Job::ReadBox(box_index) => controller.read_box(box_index).map(JobOutput::Box),
        Job::WriteBox(snapshot) => controller.write_box(&snapshot).map(|()| JobOutput::Done),
        Job::PushBox(box_index) => controller.push_box(box_index).map(|()| JobOutput::Done),
        Job::ReadSlot(slot) => controller
            .read_active_slot(slot.box_index, slot.slot)
            .map(JobOutput::Bytes),
        Job::WriteSlot(slot, data) => controller
            .write_active_slot(slot.box_index, slot.slot, &data)
            .map(|()| JobOutput::Done),
        Job::ChangeBox(box_index) => controller.change_box(box_index).map(|()| JobOutput::Done),
        Job::Mirror(slot) => {
            controller.on_slot_changed(SlotLocation::Box(slot), ChangeKind::Set);
            Ok(JobOutput::Done)
        }
        Job::ReadRam { offset, length } => controller.read_ram(offset, length).map(JobOutput::Bytes),
        Job::WriteRam { offset, data } => controller
            .write_ram(offset, &data)
            .map(|()| JobOutput::Done),
        Job::LoadRecordAt(offset) => controller.read_record_at(offset).map(JobOutput::Record),
    }
}

/// Debug view of a job without its payload bytes.
struct JobLabel<'a>(&'a Job);

impl std::fmt::Debug for JobLabel<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.0 {
            Job::WriteBox(snapshot) => write!(f, "WriteBox({})", snapshot.box_index),
            Job::WriteSlot(slot, data) => write!(f, "WriteSlot({:?}, {} bytes)", slot, data.len()),
            Job::WriteRam { offset, data } => {
                write!(f, "WriteRam(0x{:08X}, {} bytes)", offset, data.len())
            }
            other => write!(f, "{:?}", other),
        }
    }
}

/// Enqueues a mirror job for each content change instead of writing inline,
/// so the thread that edited the collection never waits on the network.
pub struct MirrorForwarder {
    queue: Queue,
}

impl SlotListener for MirrorForwarder {
    fn on_slot_changed(&self, location: SlotLocation, kind: ChangeKind) {
        let SlotLocation::Box(slot) = location else {
            return;
        };
        if !kind.is_content_change() {
            return;
        }
        if self.queue.push(Job::Mirror(slot)).is_err() {
            warn!("Sync worker stopped; {} not mirrored", slot);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::{BoxCollection, SlotPublisher};
    use crate::config::SyncConfig;
    use crate::offsets::lookup;
    use crate::record::pkx::test_util::encrypted_record;
    use crate::transport::mock::{MockCall, MockRemote};
    use crate::version::RecordFormat;

    const WAIT: Duration = Duration::from_secs(5);

    fn address(box_index: u8, slot: u8) -> u32 {
        lookup(TargetVersion::SwshRigel2)
            .slot_address(box_index, slot)
            .unwrap()
    }

    fn setup(config: SyncConfig) -> (MockRemote, Arc<BoxCollection>, SyncWorker) {
        let remote = MockRemote::new().with_bytes(
            address(0, 0),
            &encrypted_record(RecordFormat::Pk8, 0x5151_5151, 6),
        );
        let collection = Arc::new(BoxCollection::new(RecordFormat::Pk8, 32, 30));
        let controller = LiveSyncController::new(config, collection.clone())
            .with_connector(Box::new(remote.connector()));
        (remote, collection, SyncWorker::spawn(Arc::new(controller)))
    }

    #[test]
    fn test_connect_job() {
        let (_remote, _collection, worker) = setup(SyncConfig::default());

        let output = worker.run_blocking(Job::Connect).unwrap();

        assert_eq!(output, JobOutput::Connected(TargetVersion::SwshRigel2));
        assert!(worker.controller().is_connected());
    }

    #[test]
    fn test_jobs_run_in_submission_order() {
        let (remote, _collection, worker) = setup(SyncConfig::default());
        worker.run_blocking(Job::Connect).unwrap();
        remote.clear_calls();

        let ids: Vec<_> = (0..10u32)
            .map(|i| {
                worker
                    .submit(Job::WriteRam {
                        offset: 0x1000_0000 + i * 4,
                        data: i.to_le_bytes().to_vec(),
                    })
                    .unwrap()
            })
            .collect();

        let results: Vec<_> = (0..10).map(|_| worker.recv_timeout(WAIT).unwrap()).collect();
        let returned: Vec<_> = results.iter().map(|r| r.id).collect();
        assert_eq!(returned, ids);
        assert!(results.iter().all(|r| r.result.is_ok()));

        let offsets: Vec<_> = remote.writes().into_iter().map(|(o, _)| o).collect();
        let expected: Vec<_> = (0..10u32).map(|i| 0x1000_0000 + i * 4).collect();
        assert_eq!(offsets, expected);
    }

    #[test]
    fn test_failed_job_reports_error() {
        let (_remote, _collection, worker) = setup(SyncConfig::default());

        let err = worker.run_blocking(Job::ReadBox(0)).unwrap_err();

        assert!(matches!(err, Error::NotConnected));
    }

    #[test]
    fn test_forwarder_queues_content_changes_only() {
        let config = SyncConfig::builder().mirror_slot_edits(true).build();
        let (remote, collection, worker) = setup(config);
        worker.run_blocking(Job::Connect).unwrap();
        worker.attach();
        remote.clear_calls();

        let slot = SlotRef::new(1, 1);
        collection.select_slot(slot);
        collection.set_slot(slot, vec![0x5A; 344]);
        // Barrier: runs after the mirror job queued above.
        worker
            .run_blocking(Job::ReadRam {
                offset: 0x1000_0000,
                length: 1,
            })
            .unwrap();

        assert_eq!(
            remote.calls(),
            vec![
                MockCall::Write(address(1, 1), vec![0x5A; 344]),
                MockCall::Read(0x1000_0000, 1),
            ]
        );
    }

    #[test]
    fn test_reads_do_not_echo_through_forwarder() {
        let config = SyncConfig::builder().mirror_slot_edits(true).build();
        let (remote, _collection, worker) = setup(config);
        worker.run_blocking(Job::Connect).unwrap();
        worker.attach();

        worker.run_blocking(Job::ReadBox(3)).unwrap();
        worker.run_blocking(Job::ReadSlot(SlotRef::new(3, 3))).unwrap();

        assert!(remote.writes().is_empty());
    }

    #[test]
    fn test_disconnect_bypasses_queue() {
        let (remote, _collection, worker) = setup(SyncConfig::default());
        worker.run_blocking(Job::Connect).unwrap();
        remote.block_reads();

        let stuck = worker.submit(Job::ReadBox(0)).unwrap();
        let queued = worker.submit(Job::ReadBox(1)).unwrap();
        remote.wait_for_blocked_read();
        worker.disconnect();

        let first = worker.recv_timeout(WAIT).unwrap();
        assert_eq!(first.id, stuck);
        assert!(first.result.unwrap_err().is_io());
        let second = worker.recv_timeout(WAIT).unwrap();
        assert_eq!(second.id, queued);
        assert!(matches!(second.result, Err(Error::NotConnected)));
    }

    #[test]
    fn test_submit_after_shutdown_fails() {
        let (_remote, collection, worker) = setup(SyncConfig::default());
        let forwarder = worker.forwarder();
        collection.subscribe(forwarder.clone());
        worker.shutdown();

        assert!(matches!(
            forwarder.queue.push(Job::ChangeBox(0)),
            Err(Error::WorkerStopped)
        ));
        // Forwarder only logs the failure.
        collection.set_slot(SlotRef::new(0, 0), vec![0; 344]);
    }
}
