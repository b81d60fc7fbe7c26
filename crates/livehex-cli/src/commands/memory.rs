//! Raw memory commands: peek, poke and load-offset.
//!
//! Offsets and sizes are validated before connecting, so a typo never
//! opens a socket.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use livehex_core::{RawMemoryBridge, parse_hex_bytes, parse_hex_offset, parse_size};

use super::{connect, describe_slot};
use crate::cli::TargetArgs;
use crate::hexdump;

pub fn peek(target: &TargetArgs, offset_text: &str, size_text: &str, ascii: bool) -> Result<()> {
    let offset = parse_hex_offset(offset_text)?;
    let size = parse_size(size_text)?;

    let session = connect(target, None)?;
    let bridge = RawMemoryBridge::new(session.controller.clone());
    let bytes = bridge
        .read_ram(offset, size)
        .with_context(|| format!("Failed to read 0x{:08X}", offset))?;

    println!("Hexdump at 0x{:08X} ({} bytes):", offset, size);
    println!();
    for line in hexdump::format_lines(offset, &bytes, ascii) {
        println!("{}", line);
    }
    Ok(())
}

pub fn poke(target: &TargetArgs, offset_text: &str, data_text: &str) -> Result<()> {
    let offset = parse_hex_offset(offset_text)?;
    let data = parse_hex_bytes(data_text)?;

    let session = connect(target, None)?;
    let bridge = RawMemoryBridge::new(session.controller.clone());
    bridge
        .write_ram(offset, &data)
        .with_context(|| format!("Failed to write 0x{:08X}", offset))?;

    println!("Wrote {} bytes at 0x{:08X}", data.len(), offset);
    Ok(())
}

pub fn load_offset(target: &TargetArgs, offset_text: &str, output: Option<&Path>) -> Result<()> {
    let offset = parse_hex_offset(offset_text)?;

    let session = connect(target, None)?;
    let bridge = RawMemoryBridge::new(session.controller.clone());
    let Some(record) = bridge
        .load_record_at(offset)
        .with_context(|| format!("Failed to read 0x{:08X}", offset))?
    else {
        println!("No valid record at 0x{:08X}", offset);
        return Ok(());
    };

    println!(
        "Record at 0x{:08X}: {}",
        offset,
        describe_slot(target.format, &record)
    );
    if let Some(path) = output {
        fs::write(path, &record).with_context(|| format!("Failed to write {}", path.display()))?;
        println!("Saved {} bytes to {}", record.len(), path.display());
    }
    Ok(())
}
