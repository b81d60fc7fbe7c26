//! Raw memory access for diagnostics.
//!
//! Operator-entered offsets and sizes are validated here, before anything
//! reaches the remote.

use std::sync::Arc;

use tracing::info;

use crate::error::{Error, Result};
use crate::sync::LiveSyncController;

/// Number of hex digits in a manually entered offset.
pub const OFFSET_DIGITS: usize = 8;

/// Parse an operator-entered offset: optional `0x`/`0X`, then exactly 8 hex digits.
///
/// The prefix is accepted whether the text was typed or pasted, so
/// `"0x12345678"` and `"12345678"` name the same offset. The digits after it
/// must still be the full 8.
///
/// # Examples
///
/// ```
/// use livehex_core::bridge::parse_hex_offset;
///
/// assert_eq!(parse_hex_offset("0x4506D890").unwrap(), 0x4506D890);
/// assert_eq!(parse_hex_offset("4506d890").unwrap(), 0x4506D890);
/// assert!(parse_hex_offset("123").is_err());
/// ```
pub fn parse_hex_offset(text: &str) -> Result<u32> {
    let trimmed = text.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);

    if digits.len() != OFFSET_DIGITS || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(Error::InvalidInput(format!(
            "offset must be {} hex digits, got {:?}",
            OFFSET_DIGITS, text
        )));
    }
    u32::from_str_radix(digits, 16)
        .map_err(|e| Error::InvalidInput(format!("invalid offset {:?}: {}", text, e)))
}

/// Parse an operator-entered byte count: a positive decimal integer.
pub fn parse_size(text: &str) -> Result<usize> {
    let size: usize = text
        .trim()
        .parse()
        .map_err(|_| Error::InvalidInput(format!("size must be a decimal number, got {:?}", text)))?;
    if size == 0 {
        return Err(Error::InvalidInput("size must be positive".to_string()));
    }
    Ok(size)
}

/// Parse a hex byte string such as `"DEADBEEF"` or `"de ad be ef"`.
pub fn parse_hex_bytes(text: &str) -> Result<Vec<u8>> {
    let trimmed = text.trim();
    let body = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    let digits: Vec<u8> = body.bytes().filter(|b| !b.is_ascii_whitespace()).collect();

    if digits.is_empty() || digits.len() % 2 != 0 {
        return Err(Error::InvalidInput(format!(
            "expected an even number of hex digits, got {:?}",
            text
        )));
    }
    digits
        .chunks(2)
        .map(|pair| {
            std::str::from_utf8(pair)
                .ok()
                .and_then(|s| u8::from_str_radix(s, 16).ok())
                .ok_or_else(|| Error::InvalidInput(format!("invalid hex byte in {:?}", text)))
        })
        .collect()
}

/// Peek/poke front door over a live controller.
pub struct RawMemoryBridge {
    controller: Arc<LiveSyncController>,
}

impl RawMemoryBridge {
    pub fn new(controller: Arc<LiveSyncController>) -> Self {
        Self { controller }
    }

    pub fn controller(&self) -> &Arc<LiveSyncController> {
        &self.controller
    }

    pub fn read_ram(&self, offset: u32, length: usize) -> Result<Vec<u8>> {
        self.controller.read_ram(offset, length)
    }

    pub fn write_ram(&self, offset: u32, data: &[u8]) -> Result<()> {
        self.controller.write_ram(offset, data)?;
        info!("Wrote {} bytes at 0x{:08X}", data.len(), offset);
        Ok(())
    }

    /// Read with operator-entered offset and size, both checked first.
    pub fn read_ram_text(&self, offset_text: &str, size_text: &str) -> Result<Vec<u8>> {
        let offset = parse_hex_offset(offset_text)?;
        let size = parse_size(size_text)?;
        self.read_ram(offset, size)
    }

    /// Write with operator-entered offset and hex payload, both checked first.
    pub fn write_ram_text(&self, offset_text: &str, hex_text: &str) -> Result<()> {
        let offset = parse_hex_offset(offset_text)?;
        let data = parse_hex_bytes(hex_text)?;
        self.write_ram(offset, &data)
    }

    /// Bytes at `offset` if they form a plausible record, `None` otherwise.
    pub fn load_record_at(&self, offset: u32) -> Result<Option<Vec<u8>>> {
        self.controller.read_record_at(offset)
    }

    pub fn load_record_at_text(&self, offset_text: &str) -> Result<Option<Vec<u8>>> {
        let offset = parse_hex_offset(offset_text)?;
        self.load_record_at(offset)
    }
}
