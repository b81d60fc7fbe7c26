//! Trainer status block pulled once per connection.

use serde::Serialize;

use crate::error::{Error, Result};
use crate::version::TrainerBlockKind;

/// Save formats that carry a trainer status block the remote can fill.
pub trait HasTrainerBlock {
    fn trainer_block_kind(&self) -> TrainerBlockKind;

    /// Overwrite the block with bytes read from the remote.
    fn load_trainer_block(&mut self, data: &[u8]) -> Result<()>;
}

struct FieldLayout {
    tid: usize,
    sid: usize,
    game: usize,
    gender: usize,
    language: usize,
    ot_name: usize,
}

const OT_NAME_BYTES: usize = 0x1A;

const MY_STATUS_8: FieldLayout = FieldLayout {
    tid: 0xA0,
    sid: 0xA2,
    game: 0xA4,
    gender: 0xA5,
    language: 0xA7,
    ot_name: 0xB0,
};

const STATUS_7B: FieldLayout = FieldLayout {
    tid: 0x00,
    sid: 0x02,
    game: 0x04,
    gender: 0x05,
    language: 0x35,
    ot_name: 0x38,
};

fn layout(kind: TrainerBlockKind) -> &'static FieldLayout {
    match kind {
        TrainerBlockKind::MyStatus8 => &MY_STATUS_8,
        TrainerBlockKind::Status7b => &STATUS_7B,
    }
}

/// Decoded trainer status.
#[derive(Debug, Clone, Serialize)]
pub struct TrainerInfo {
    kind: TrainerBlockKind,
    #[serde(skip)]
    raw: Vec<u8>,
}

impl TrainerInfo {
    pub fn new(kind: TrainerBlockKind) -> Self {
        Self {
            kind,
            raw: Vec::new(),
        }
    }

    pub fn is_loaded(&self) -> bool {
        !self.raw.is_empty()
    }

    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    fn u16_at(&self, offset: usize) -> u16 {
        self.raw
            .get(offset..offset + 2)
            .map(|b| u16::from_le_bytes([b[0], b[1]]))
            .unwrap_or(0)
    }

    fn u8_at(&self, offset: usize) -> u8 {
        self.raw.get(offset).copied().unwrap_or(0)
    }

    pub fn tid(&self) -> u16 {
        self.u16_at(layout(self.kind).tid)
    }

    pub fn sid(&self) -> u16 {
        self.u16_at(layout(self.kind).sid)
    }

    pub fn game(&self) -> u8 {
        self.u8_at(layout(self.kind).game)
    }

    pub fn gender(&self) -> u8 {
        self.u8_at(layout(self.kind).gender)
    }

    pub fn language(&self) -> u8 {
        self.u8_at(layout(self.kind).language)
    }

    /// Displayed trainer ID (last six digits of the 32-bit ID).
    pub fn display_tid(&self) -> u32 {
        ((u32::from(self.sid()) << 16) | u32::from(self.tid())) % 1_000_000
    }

    pub fn ot_name(&self) -> String {
        let start = layout(self.kind).ot_name;
        let Some(bytes) = self.raw.get(start..start + OT_NAME_BYTES) else {
            return String::new();
        };
        let units: Vec<u16> = bytes
            .chunks_exact(2)
            .map(|c| u16::from_le_bytes([c[0], c[1]]))
            .take_while(|&u| u != 0)
            .collect();
        String::from_utf16_lossy(&units)
    }
}

impl HasTrainerBlock for TrainerInfo {
    fn trainer_block_kind(&self) -> TrainerBlockKind {
        self.kind
    }

    fn load_trainer_block(&mut self, data: &[u8]) -> Result<()> {
        let needed = layout(self.kind).ot_name + OT_NAME_BYTES;
        if data.len() < needed {
            return Err(Error::Format(format!(
                "{} block needs at least {} bytes, got {}",
                self.kind,
                needed,
                data.len()
            )));
        }
        self.raw = data.to_vec();
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::test_util::trainer_block;
    use super::*;

    #[test]
    fn test_decode_my_status_8() {
        let data = trainer_block(TrainerBlockKind::MyStatus8, 0x110, 0x3039, 0x0001, "Hop");
        let mut info = TrainerInfo::new(TrainerBlockKind::MyStatus8);
        info.load_trainer_block(&data).unwrap();

        assert!(info.is_loaded());
        assert_eq!(info.tid(), 0x3039);
        assert_eq!(info.sid(), 1);
        assert_eq!(info.gender(), 1);
        assert_eq!(info.ot_name(), "Hop");
        assert_eq!(info.display_tid(), (0x0001_3039u32) % 1_000_000);
    }

    #[test]
    fn test_decode_status_7b() {
        let data = trainer_block(TrainerBlockKind::Status7b, 0x168, 12345, 54321, "Trace");
        let mut info = TrainerInfo::new(TrainerBlockKind::Status7b);
        info.load_trainer_block(&data).unwrap();
        assert_eq!(info.tid(), 12345);
        assert_eq!(info.sid(), 54321);
        assert_eq!(info.ot_name(), "Trace");
    }

    #[test]
    fn test_short_block_rejected() {
        let mut info = TrainerInfo::new(TrainerBlockKind::MyStatus8);
        let err = info.load_trainer_block(&[0u8; 0x20]).unwrap_err();
        assert!(matches!(err, Error::Format(_)));
        assert!(!info.is_loaded());
    }
}
