//! Probe and trainer commands.

use anyhow::Result;
use livehex_core::{TrainerInfo, lookup};

use super::connect;
use crate::cli::TargetArgs;

/// Detect the layout and show where boxes live.
pub fn run(target: &TargetArgs) -> Result<()> {
    let session = connect(target, None)?;
    let entry = lookup(session.version);

    println!();
    println!("Layout:       {}", session.version);
    println!("Validated:    {}", session.validated());
    println!("Box base:     0x{:08X}", entry.box_base_offset);
    println!(
        "Boxes:        {} x {} slots of {} bytes",
        entry.box_count, entry.slots_per_box, entry.slot_size
    );
    match entry.current_box_offset {
        Some(offset) => println!("Current box:  0x{:08X}", offset),
        None => println!("Current box:  not supported"),
    }
    Ok(())
}

/// Pull the trainer block during connect and print it.
pub fn run_trainer(target: &TargetArgs) -> Result<()> {
    let mut trainer = TrainerInfo::new(target.format.trainer_block_kind());
    let _session = connect(target, Some(&mut trainer))?;

    if !trainer.is_loaded() {
        println!("Trainer block was not loaded.");
        return Ok(());
    }

    println!();
    println!("OT:       {}", trainer.ot_name());
    println!("TID:      {:06}", trainer.display_tid());
    println!("TID16:    {:05}", trainer.tid());
    println!("SID16:    {:05}", trainer.sid());
    println!("Gender:   {}", trainer.gender());
    println!("Game:     {}", trainer.game());
    println!("Language: {}", trainer.language());
    Ok(())
}
