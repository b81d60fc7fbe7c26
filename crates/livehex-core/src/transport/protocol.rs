//! sys-botbase text protocol.
//!
//! Requests are single ASCII lines terminated by `\r\n`:
//!
//! ```text
//! peek 0x4506D890 344\r\n        -> "<688 hex digits>\n"
//! poke 0x4506D890 0x0A1B...\r\n  -> (no reply)
//! ```

use std::fmt::Write;

use crate::error::{Error, Result};

/// Port sys-botbase listens on unless configured otherwise.
pub const DEFAULT_PORT: u16 = 6000;

/// Largest single `peek`; bigger reads are split.
pub const MAX_PEEK_CHUNK: usize = 0x2000;

/// Largest `poke` payload per command, bounded by the server's line buffer.
pub const MAX_POKE_CHUNK: usize = 0x1C0;

pub fn peek_command(offset: u32, length: usize) -> String {
    format!("peek 0x{:08X} {}\r\n", offset, length)
}

pub fn poke_command(offset: u32, data: &[u8]) -> String {
    let mut command = String::with_capacity(20 + data.len() * 2);
    let _ = write!(command, "poke 0x{:08X} 0x", offset);
    for byte in data {
        let _ = write!(command, "{:02X}", byte);
    }
    command.push_str("\r\n");
    command
}

/// Decode a `peek` reply line into exactly `expected` bytes.
pub fn parse_peek_response(offset: u32, line: &str, expected: usize) -> Result<Vec<u8>> {
    let hex = line.trim_end_matches(['\r', '\n']);
    if hex.len() != expected * 2 {
        return Err(Error::ShortRead {
            offset,
            expected,
            actual: hex.len() / 2,
        });
    }

    (0..expected)
        .map(|i| {
            let pair = hex.get(i * 2..i * 2 + 2).ok_or_else(|| Error::RemoteIo {
                offset,
                message: "reply is not ASCII hex".to_string(),
            })?;
            u8::from_str_radix(pair, 16).map_err(|_| Error::RemoteIo {
                offset,
                message: format!("malformed hex byte {:?} at index {}", pair, i),
            })
        })
        .collect()
}

/// Reject `[offset, offset + length)` when it runs past the 32-bit address space.
pub fn check_span(offset: u32, length: usize) -> Result<()> {
    match u64::from(offset).checked_add(length as u64) {
        Some(end) if end <= 1 << 32 => Ok(()),
        _ => Err(Error::InvalidInput(format!(
            "{} bytes at 0x{:08X} run past the end of the address space",
            length, offset
        ))),
    }
}

/// Split `[offset, offset + length)` into `(offset, length)` pieces of at most `max` bytes.
pub fn chunks(
    offset: u32,
    length: usize,
    max: usize,
) -> Result<impl Iterator<Item = (u32, usize)>> {
    check_span(offset, length)?;
    Ok((0..length).step_by(max.max(1)).filter_map(move |start| {
        let len = (length - start).min(max);
        let start = u32::try_from(start).ok()?;
        Some((offset.checked_add(start)?, len))
    }))
}
