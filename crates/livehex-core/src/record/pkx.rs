//! Encrypted stored-record formats used by Let's Go (PB7) and Sword/Shield (PK8).
//!
//! Layout shared by both:
//!
//! ```text
//! 0x00  u32  encryption constant (also seeds the stream cipher)
//! 0x06  u16  checksum of the decrypted bytes [0x08, stored_size)
//! 0x08  u16  species
//! 0x08..     four shuffled blocks, then party stats
//! ```

use super::{Record, RecordDecoder};
use crate::error::{Error, Result};
use crate::version::RecordFormat;

const HEADER_SIZE: usize = 8;
const CHECKSUM: usize = 0x06;
const SPECIES: usize = 0x08;

/// Block order for each of the 24 shuffle values; rows 24..31 repeat rows 0..7.
#[rustfmt::skip]
const BLOCK_POSITION: [u8; 128] = [
    0, 1, 2, 3,  0, 1, 3, 2,  0, 2, 1, 3,  0, 3, 1, 2,
    0, 2, 3, 1,  0, 3, 2, 1,  1, 0, 2, 3,  1, 0, 3, 2,
    2, 0, 1, 3,  3, 0, 1, 2,  2, 0, 3, 1,  3, 0, 2, 1,
    1, 2, 0, 3,  1, 3, 0, 2,  2, 1, 0, 3,  3, 1, 0, 2,
    2, 3, 0, 1,  3, 2, 0, 1,  1, 2, 3, 0,  1, 3, 2, 0,
    2, 1, 3, 0,  3, 1, 2, 0,  2, 3, 1, 0,  3, 2, 1, 0,
    0, 1, 2, 3,  0, 1, 3, 2,  0, 2, 1, 3,  0, 3, 1, 2,
    0, 2, 3, 1,  0, 3, 2, 1,  1, 0, 2, 3,  1, 0, 3, 2,
];

fn read_u16(data: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([data[offset], data[offset + 1]])
}

fn read_u32(data: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        data[offset],
        data[offset + 1],
        data[offset + 2],
        data[offset + 3],
    ])
}

fn shuffle_value(encryption_constant: u32) -> usize {
    ((encryption_constant >> 13) & 31) as usize
}

/// XOR `data[start..end]` with the LCG keystream seeded by `seed`.
fn crypt(data: &mut [u8], mut seed: u32, start: usize, end: usize) {
    let mut i = start;
    while i + 1 < end {
        seed = seed.wrapping_mul(0x41C6_4E6D).wrapping_add(0x0000_6073);
        data[i] ^= (seed >> 16) as u8;
        data[i + 1] ^= (seed >> 24) as u8;
        i += 2;
    }
}

fn crypt_record(data: &mut [u8], encryption_constant: u32, format: RecordFormat) {
    let end = format.stored_size();
    crypt(data, encryption_constant, HEADER_SIZE, end);
    if data.len() > end {
        let len = data.len();
        crypt(data, encryption_constant, end, len);
    }
}

fn unshuffle(data: &mut [u8], sv: usize, block_size: usize) {
    let source = data[HEADER_SIZE..HEADER_SIZE + 4 * block_size].to_vec();
    for block in 0..4 {
        let from = BLOCK_POSITION[sv * 4 + block] as usize;
        let dst = HEADER_SIZE + block * block_size;
        data[dst..dst + block_size]
            .copy_from_slice(&source[from * block_size..(from + 1) * block_size]);
    }
}

fn shuffle(data: &mut [u8], sv: usize, block_size: usize) {
    let source = data[HEADER_SIZE..HEADER_SIZE + 4 * block_size].to_vec();
    for block in 0..4 {
        let to = BLOCK_POSITION[sv * 4 + block] as usize;
        let dst = HEADER_SIZE + to * block_size;
        data[dst..dst + block_size]
            .copy_from_slice(&source[block * block_size..(block + 1) * block_size]);
    }
}

/// 16-bit additive checksum over the decrypted block region.
pub fn checksum(decrypted: &[u8], format: RecordFormat) -> u16 {
    decrypted[HEADER_SIZE..format.stored_size()]
        .chunks_exact(2)
        .fold(0u16, |acc, pair| {
            acc.wrapping_add(u16::from_le_bytes([pair[0], pair[1]]))
        })
}

pub fn decrypt(encrypted: &[u8], format: RecordFormat) -> Result<Vec<u8>> {
    if encrypted.len() < format.stored_size() {
        return Err(Error::Format(format!(
            "{} record needs {} bytes, got {}",
            format,
            format.stored_size(),
            encrypted.len()
        )));
    }
    let mut data = encrypted.to_vec();
    let ec = read_u32(&data, 0);
    crypt_record(&mut data, ec, format);
    unshuffle(&mut data, shuffle_value(ec), format.block_size());
    Ok(data)
}

pub fn encrypt(decrypted: &[u8], format: RecordFormat) -> Result<Vec<u8>> {
    if decrypted.len() < format.stored_size() {
        return Err(Error::Format(format!(
            "{} record needs {} bytes, got {}",
            format,
            format.stored_size(),
            decrypted.len()
        )));
    }
    let mut data = decrypted.to_vec();
    let ec = read_u32(&data, 0);
    shuffle(&mut data, shuffle_value(ec), format.block_size());
    crypt_record(&mut data, ec, format);
    Ok(data)
}

/// Write a correct checksum into a decrypted record.
pub fn refresh_checksum(decrypted: &mut [u8], format: RecordFormat) {
    let sum = checksum(decrypted, format);
    decrypted[CHECKSUM..CHECKSUM + 2].copy_from_slice(&sum.to_le_bytes());
}

/// Encrypted bytes of an empty party-sized slot.
///
/// A zeroed record still needs its checksum and the keystream applied, so the
/// game reads it back as species 0 rather than as damaged data.
pub fn blank_record(format: RecordFormat) -> Vec<u8> {
    let mut data = vec![0u8; format.party_size()];
    refresh_checksum(&mut data, format);
    shuffle(&mut data, shuffle_value(0), format.block_size());
    crypt_record(&mut data, 0, format);
    data
}

/// A decrypted record.
#[derive(Debug, Clone)]
pub struct Pkx {
    format: RecordFormat,
    data: Vec<u8>,
}

impl Pkx {
    pub fn from_encrypted(bytes: &[u8], format: RecordFormat) -> Result<Self> {
        Ok(Self {
            format,
            data: decrypt(bytes, format)?,
        })
    }

    pub fn encryption_constant(&self) -> u32 {
        read_u32(&self.data, 0)
    }

    pub fn stored_checksum(&self) -> u16 {
        read_u16(&self.data, CHECKSUM)
    }

    pub fn decrypted(&self) -> &[u8] {
        &self.data
    }

    pub fn format(&self) -> RecordFormat {
        self.format
    }
}

impl Record for Pkx {
    fn species(&self) -> i32 {
        i32::from(read_u16(&self.data, SPECIES))
    }

    fn is_checksum_valid(&self) -> bool {
        checksum(&self.data, self.format) == self.stored_checksum()
    }
}

/// Decoder for one of the built-in encrypted formats.
#[derive(Debug, Clone, Copy)]
pub struct PkxDecoder {
    format: RecordFormat,
}

impl PkxDecoder {
    pub fn new(format: RecordFormat) -> Self {
        Self { format }
    }
}

impl RecordDecoder for PkxDecoder {
    fn decode(&self, bytes: &[u8]) -> Result<Box<dyn Record>> {
        Ok(Box::new(Pkx::from_encrypted(bytes, self.format)?))
    }

    fn max_species(&self) -> i32 {
        i32::from(self.format.max_species())
    }
}
