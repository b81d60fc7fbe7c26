mod table;

pub use table::{lookup, valid_versions};

use serde::Serialize;

use crate::error::{Error, Result};
use crate::version::TrainerBlockKind;

/// Box and trainer addressing for one remote layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OffsetEntry {
    pub trainer_block_offset: u32,
    pub trainer_block_size: u32,
    pub trainer_block_kind: TrainerBlockKind,
    /// Address of box 0, slot 0
    pub box_base_offset: u32,
    /// Bytes per record slot
    pub slot_size: u32,
    /// Unrelated bytes between consecutive slots
    pub slot_gap: u32,
    pub slots_per_box: u32,
    pub box_count: u32,
    /// Where the game keeps the selected box index, if it has one
    pub current_box_offset: Option<u32>,
}

impl OffsetEntry {
    /// Distance between the starts of two consecutive slots.
    pub fn slot_pitch(&self) -> u32 {
        self.slot_size + self.slot_gap
    }

    pub fn box_stride(&self) -> u32 {
        self.slots_per_box * self.slot_pitch()
    }

    pub fn contains(&self, box_index: u8, slot: u8) -> bool {
        u32::from(box_index) < self.box_count && u32::from(slot) < self.slots_per_box
    }

    /// Address of a slot: `box_base + box * box_stride + slot * slot_pitch`.
    pub fn slot_address(&self, box_index: u8, slot: u8) -> Result<u32> {
        if !self.contains(box_index, slot) {
            return Err(Error::OutOfRange {
                box_index,
                slot,
                boxes: self.box_count,
                slots: self.slots_per_box,
            });
        }
        Ok(self.box_base_offset
            + u32::from(box_index) * self.box_stride()
            + u32::from(slot) * self.slot_pitch())
    }

    pub fn box_address(&self, box_index: u8) -> Result<u32> {
        self.slot_address(box_index, 0)
    }

    pub fn check_box(&self, box_index: u8) -> Result<()> {
        self.box_address(box_index).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::version::TargetVersion;
    use std::collections::HashSet;
    use strum::IntoEnumIterator;

    #[test]
    fn test_address_formula() {
        for version in TargetVersion::iter() {
            let e = lookup(version);
            for b in [0u8, 1, 5] {
                for s in [0u8, 1, 7] {
                    let expected = e.box_base_offset
                        + u32::from(b) * e.box_stride()
                        + u32::from(s) * e.slot_pitch();
                    assert_eq!(e.slot_address(b, s).unwrap(), expected);
                }
            }
        }
    }

    #[test]
    fn test_swsh_formula_uses_slot_size() {
        let e = lookup(TargetVersion::SwshRigel1);
        assert_eq!(e.slot_gap, 0);
        assert_eq!(
            e.slot_address(3, 4).unwrap(),
            e.box_base_offset + 3 * 30 * e.slot_size + 4 * e.slot_size
        );
    }

    #[test]
    fn test_addresses_are_unique_and_disjoint() {
        for version in TargetVersion::iter() {
            let e = lookup(version);
            let mut seen = HashSet::new();
            let mut addresses = Vec::new();
            for b in 0..e.box_count as u8 {
                for s in 0..e.slots_per_box as u8 {
                    let addr = e.slot_address(b, s).unwrap();
                    assert!(seen.insert(addr), "{version}: duplicate 0x{addr:08X}");
                    addresses.push(addr);
                }
            }
            addresses.sort_unstable();
            for pair in addresses.windows(2) {
                assert!(pair[1] - pair[0] >= e.slot_size, "{version}: overlap");
            }
        }
    }

    #[test]
    fn test_out_of_range() {
        let e = lookup(TargetVersion::SwshOrion);
        assert!(matches!(
            e.slot_address(32, 0),
            Err(Error::OutOfRange { box_index: 32, .. })
        ));
        assert!(e.slot_address(0, 30).is_err());
        assert!(e.slot_address(31, 29).is_ok());
    }
}
