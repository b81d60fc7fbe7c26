//! Per-version RAM layout constants.
//!
//! Addresses are absolute offsets into the game's heap as seen by the
//! sys-botbase `peek`/`poke` commands.

use super::OffsetEntry;
use crate::version::{RecordFormat, TargetVersion, TrainerBlockKind};

/// Let's Go 1.0.2: 1000 storage slots kept as 40 boxes of 25, each slot
/// followed by 380 bytes of unrelated data.
const LGPE_V102: OffsetEntry = OffsetEntry {
    trainer_block_offset: 0x5358_2030,
    trainer_block_size: 0x168,
    trainer_block_kind: TrainerBlockKind::Status7b,
    box_base_offset: 0x5336_75B0,
    slot_size: 260,
    slot_gap: 380,
    slots_per_box: 25,
    box_count: 40,
    current_box_offset: None,
};

const SWSH_ORION: OffsetEntry = OffsetEntry {
    trainer_block_offset: 0x4293_5E48,
    trainer_block_size: 0x110,
    trainer_block_kind: TrainerBlockKind::MyStatus8,
    box_base_offset: 0x4293_D8B0,
    slot_size: 344,
    slot_gap: 0,
    slots_per_box: 30,
    box_count: 32,
    current_box_offset: Some(0x4293_D7F4),
};

const SWSH_RIGEL1: OffsetEntry = OffsetEntry {
    trainer_block_offset: 0x4506_1108,
    trainer_block_size: 0x110,
    trainer_block_kind: TrainerBlockKind::MyStatus8,
    box_base_offset: 0x4506_D890,
    slot_size: 344,
    slot_gap: 0,
    slots_per_box: 30,
    box_count: 32,
    current_box_offset: Some(0x4506_D7D4),
};

const SWSH_RIGEL2: OffsetEntry = OffsetEntry {
    trainer_block_offset: 0x4506_8F18,
    trainer_block_size: 0x110,
    trainer_block_kind: TrainerBlockKind::MyStatus8,
    box_base_offset: 0x4507_5880,
    slot_size: 344,
    slot_gap: 0,
    slots_per_box: 30,
    box_count: 32,
    current_box_offset: Some(0x4507_57C4),
};

/// Look up the layout for a version.
pub fn lookup(version: TargetVersion) -> &'static OffsetEntry {
    match version {
        TargetVersion::LgpeV102 => &LGPE_V102,
        TargetVersion::SwshOrion => &SWSH_ORION,
        TargetVersion::SwshRigel1 => &SWSH_RIGEL1,
        TargetVersion::SwshRigel2 => &SWSH_RIGEL2,
    }
}

/// Candidate layouts for a local record format, most recent build first.
pub fn valid_versions(format: RecordFormat) -> &'static [TargetVersion] {
    match format {
        RecordFormat::Pb7 => &[TargetVersion::LgpeV102],
        RecordFormat::Pk8 => &[
            TargetVersion::SwshRigel2,
            TargetVersion::SwshRigel1,
            TargetVersion::SwshOrion,
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_every_version_has_an_entry() {
        for version in TargetVersion::iter() {
            let entry = lookup(version);
            assert_ne!(entry.box_base_offset, 0, "{version}");
            assert_ne!(entry.trainer_block_offset, 0, "{version}");
            assert!(entry.slots_per_box > 0 && entry.box_count > 0);
        }
    }

    #[test]
    fn test_slot_size_matches_party_size() {
        for version in TargetVersion::iter() {
            let entry = lookup(version);
            assert_eq!(
                entry.slot_size as usize,
                version.record_format().party_size(),
                "{version}"
            );
        }
    }

    #[test]
    fn test_valid_versions_match_format() {
        for format in RecordFormat::iter() {
            let versions = valid_versions(format);
            assert!(!versions.is_empty());
            assert!(versions.iter().all(|v| v.record_format() == format));
        }
    }

    #[test]
    fn test_valid_versions_priority_order() {
        assert_eq!(
            valid_versions(RecordFormat::Pk8),
            &[
                TargetVersion::SwshRigel2,
                TargetVersion::SwshRigel1,
                TargetVersion::SwshOrion
            ]
        );
    }

    #[test]
    fn test_trainer_block_kind_follows_format() {
        for version in TargetVersion::iter() {
            assert_eq!(
                lookup(version).trainer_block_kind,
                version.record_format().trainer_block_kind(),
                "{version}"
            );
        }
    }
}
