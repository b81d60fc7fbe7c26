//! Record decoding seam.
//!
//! The sync core treats slots as opaque bytes; the only things it needs from
//! a decoded record are the checksum verdict and the species, which together
//! decide whether a speculative read landed on real data.

pub mod pkx;

pub use pkx::{Pkx, PkxDecoder, blank_record};

use crate::error::Result;

/// A decoded game-entity record.
pub trait Record {
    fn species(&self) -> i32;
    fn is_checksum_valid(&self) -> bool;
}

/// Turns raw slot bytes into a [`Record`].
pub trait RecordDecoder: Send + Sync {
    /// Fails with [`crate::Error::Format`] when the bytes cannot be a record.
    fn decode(&self, bytes: &[u8]) -> Result<Box<dyn Record>>;

    /// Highest species number the format can hold.
    fn max_species(&self) -> i32;
}

/// Why a buffer was or was not accepted as a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordVerdict {
    Valid { species: i32 },
    Undecodable(String),
    BadChecksum,
    SpeciesOutOfRange(i32),
}

impl RecordVerdict {
    pub fn is_valid(&self) -> bool {
        matches!(self, RecordVerdict::Valid { .. })
    }
}

/// Decode `bytes` and check checksum and species range.
pub fn validate_record(decoder: &dyn RecordDecoder, bytes: &[u8]) -> RecordVerdict {
    let record = match decoder.decode(bytes) {
        Ok(record) => record,
        Err(e) => return RecordVerdict::Undecodable(e.to_string()),
    };

    if !record.is_checksum_valid() {
        return RecordVerdict::BadChecksum;
    }

    let species = record.species();
    if !(0..=decoder.max_species()).contains(&species) {
        return RecordVerdict::SpeciesOutOfRange(species);
    }

    RecordVerdict::Valid { species }
}
