//! Box read, write and selection commands.

use std::path::Path;

use anyhow::{Context, Result};
use livehex_core::{BoxDump, BoxSnapshot};
use tracing::{info, warn};

use super::{box_index, connect, describe_slot};
use crate::cli::TargetArgs;

pub fn read(target: &TargetArgs, box_number: u8, output: Option<&Path>) -> Result<()> {
    let index = box_index(box_number)?;
    let session = connect(target, None)?;
    let snapshot = session
        .controller
        .read_box(index)
        .with_context(|| format!("Failed to read box {}", box_number))?;

    if let Some(path) = output {
        BoxDump::from_snapshot(session.version, &snapshot)
            .save(path)
            .with_context(|| format!("Failed to save {}", path.display()))?;
        println!("Box {} saved to {}", box_number, path.display());
        return Ok(());
    }

    println!();
    println!("=== Box {} ===", box_number);
    for (slot, bytes) in snapshot.slots.iter().enumerate() {
        println!("  {:>2}: {}", slot + 1, describe_slot(target.format, bytes));
    }
    Ok(())
}

pub fn write(
    target: &TargetArgs,
    input: &Path,
    box_number: Option<u8>,
    force: bool,
) -> Result<()> {
    let dump = BoxDump::load(input).with_context(|| format!("Failed to load {}", input.display()))?;
    let mut snapshot = dump.to_snapshot()?;
    if let Some(number) = box_number {
        snapshot.box_index = box_index(number)?;
    }

    let session = connect(target, None)?;
    if dump.version != session.version {
        warn!(
            "Dump was read with {}, console is running {}",
            dump.version, session.version
        );
    }
    session.ensure_writable(force)?;

    session
        .controller
        .write_box(&snapshot)
        .with_context(|| format!("Failed to write box {}", box_number_of(&snapshot)))?;
    info!("Wrote {} slots", snapshot.slots.len());
    println!("Box {} written", box_number_of(&snapshot));
    Ok(())
}

pub fn change(target: &TargetArgs, box_number: u8) -> Result<()> {
    let index = box_index(box_number)?;
    let session = connect(target, None)?;
    session
        .controller
        .change_box(index)
        .with_context(|| format!("Failed to switch to box {}", box_number))?;
    println!("Console now shows box {}", box_number);
    Ok(())
}

/// One-based box number; box index 255 becomes 256.
fn box_number_of(snapshot: &BoxSnapshot) -> u16 {
    u16::from(snapshot.box_index) + 1
}
