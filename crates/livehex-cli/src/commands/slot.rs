//! Single slot commands.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use super::{box_index, connect, describe_slot, slot_index};
use crate::cli::TargetArgs;
use crate::hexdump;

pub fn read(
    target: &TargetArgs,
    box_number: u8,
    slot_number: u8,
    output: Option<&Path>,
) -> Result<()> {
    let (box_idx, slot_idx) = (box_index(box_number)?, slot_index(slot_number)?);
    let session = connect(target, None)?;
    let data = session
        .controller
        .read_active_slot(box_idx, slot_idx)
        .with_context(|| format!("Failed to read box {} slot {}", box_number, slot_number))?;

    println!(
        "Box {} slot {}: {}",
        box_number,
        slot_number,
        describe_slot(target.format, &data)
    );
    match output {
        Some(path) => {
            fs::write(path, &data).with_context(|| format!("Failed to write {}", path.display()))?;
            println!("Saved {} bytes to {}", data.len(), path.display());
        }
        None => {
            let address = session.controller.layout()?.slot_address(box_idx, slot_idx)?;
            for line in hexdump::format_lines(address, &data, false) {
                println!("{}", line);
            }
        }
    }
    Ok(())
}

pub fn write(
    target: &TargetArgs,
    box_number: u8,
    slot_number: u8,
    input: &Path,
    force: bool,
) -> Result<()> {
    let (box_idx, slot_idx) = (box_index(box_number)?, slot_index(slot_number)?);
    let data = fs::read(input).with_context(|| format!("Failed to read {}", input.display()))?;

    let session = connect(target, None)?;
    session.ensure_writable(force)?;
    session
        .controller
        .write_active_slot(box_idx, slot_idx, &data)
        .with_context(|| format!("Failed to write box {} slot {}", box_number, slot_number))?;

    println!(
        "Box {} slot {} written ({})",
        box_number,
        slot_number,
        describe_slot(target.format, &data)
    );
    Ok(())
}
