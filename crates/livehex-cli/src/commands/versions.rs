//! Known layouts.

use anyhow::Result;
use livehex_core::{OffsetEntry, TargetVersion, lookup};
use serde::Serialize;
use strum::IntoEnumIterator;

#[derive(Serialize)]
struct VersionInfo {
    version: TargetVersion,
    name: &'static str,
    format: String,
    #[serde(flatten)]
    entry: &'static OffsetEntry,
}

pub fn run(json: bool) -> Result<()> {
    let versions: Vec<VersionInfo> = TargetVersion::iter()
        .map(|version| VersionInfo {
            version,
            name: version.name(),
            format: version.record_format().to_string(),
            entry: lookup(version),
        })
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&versions)?);
        return Ok(());
    }

    println!(
        "{:<12} {:<7} {:>10} {:>10} {:>6} {:>12}",
        "Layout", "Format", "Trainer", "Box base", "Slot", "Current box"
    );
    for info in &versions {
        let current_box = info
            .entry
            .current_box_offset
            .map(|o| format!("0x{:08X}", o))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<12} {:<7} 0x{:08X} 0x{:08X} {:>6} {:>12}",
            info.name,
            info.format,
            info.entry.trainer_block_offset,
            info.entry.box_base_offset,
            info.entry.slot_size,
            current_box
        );
    }
    println!();
    println!("Fallback when nothing matches: {}", TargetVersion::FALLBACK);
    Ok(())
}
