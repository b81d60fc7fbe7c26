//! Poll one box and report slots the console changes.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Result, bail};
use livehex_core::{
    BoxSnapshot, Job, JobOutput, PkxDecoder, RecordFormat, RecordVerdict, SyncWorker,
    validate_record,
};
use owo_colors::OwoColorize;
use tracing::{debug, warn};

use super::{box_index, connect, describe_slot};
use crate::cli::TargetArgs;
use crate::input;
use crate::shutdown::ShutdownSignal;

pub fn run(target: &TargetArgs, box_number: u8, interval_ms: u64) -> Result<()> {
    let index = box_index(box_number)?;
    let shutdown = ShutdownSignal::with_ctrlc()?;
    let _keyboard = input::spawn_keyboard_monitor(Arc::clone(&shutdown));

    let session = connect(target, None)?;
    let worker = SyncWorker::spawn(session.controller.clone());
    let interval = Duration::from_millis(interval_ms);

    println!(
        "Watching box {} every {} ms (press Esc or q to quit)",
        box_number, interval_ms
    );

    let mut previous: Option<BoxSnapshot> = None;
    while !shutdown.is_shutdown() {
        worker.submit(Job::ReadBox(index))?;

        // Poll for the result so a quit key can cut a slow read short.
        let result = loop {
            if let Some(result) = worker.recv_timeout(Duration::from_millis(100)) {
                break Some(result);
            }
            if shutdown.is_shutdown() {
                worker.disconnect();
                break None;
            }
        };
        let Some(result) = result else { break };

        match result.result {
            Ok(JobOutput::Box(snapshot)) => {
                report_changes(target, previous.as_ref(), &snapshot);
                previous = Some(snapshot);
            }
            Ok(other) => debug!("Unexpected job output: {:?}", other),
            Err(e) if e.is_io() => bail!("Lost connection: {}", e),
            Err(e) => warn!("Read failed: {}", e),
        }

        shutdown.wait(interval);
    }

    println!("Stopped watching.");
    Ok(())
}

fn report_changes(target: &TargetArgs, previous: Option<&BoxSnapshot>, current: &BoxSnapshot) {
    let Some(previous) = previous else {
        let filled = current
            .slots
            .iter()
            .filter(|s| is_occupied(target.format, s))
            .count();
        println!("Initial read: {} of {} slots hold data", filled, current.slots.len());
        return;
    };

    for slot in changed_slots(previous, current) {
        println!(
            "{} slot {}: {}",
            "Changed".cyan(),
            slot + 1,
            describe_slot(target.format, &current.slots[slot])
        );
    }
}

/// Anything but a valid empty record counts, damaged slots included.
fn is_occupied(format: RecordFormat, bytes: &[u8]) -> bool {
    let decoder = PkxDecoder::new(format);
    !matches!(
        validate_record(&decoder, bytes),
        RecordVerdict::Valid { species: 0 }
    )
}

fn changed_slots(previous: &BoxSnapshot, current: &BoxSnapshot) -> Vec<usize> {
    current
        .slots
        .iter()
        .enumerate()
        .filter(|(i, slot)| previous.slots.get(*i) != Some(*slot))
        .map(|(i, _)| i)
        .collect()
}
