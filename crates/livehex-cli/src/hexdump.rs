//! Hexdump formatting for peeked memory.
//!
//! ```text
//! 0x4506D890: 48 65 6C 6C 6F 20 57 6F  72 6C 64 00 00 00 00 00  |Hello World.....|
//! ```

const BYTES_PER_LINE: usize = 16;

/// Format `bytes` as hexdump lines labelled with their remote address.
pub fn format_lines(base: u32, bytes: &[u8], ascii: bool) -> Vec<String> {
    bytes
        .chunks(BYTES_PER_LINE)
        .enumerate()
        .map(|(i, chunk)| {
            let address = base.wrapping_add((i * BYTES_PER_LINE) as u32);
            format_line(address, chunk, ascii)
        })
        .collect()
}

fn format_line(address: u32, chunk: &[u8], ascii: bool) -> String {
    let mut line = format!("0x{:08X}: ", address);

    for j in 0..BYTES_PER_LINE {
        if j == 8 {
            line.push(' ');
        }
        match chunk.get(j) {
            Some(byte) => line.push_str(&format!("{:02X} ", byte)),
            None => line.push_str("   "),
        }
    }

    if ascii {
        line.push_str(" |");
        for j in 0..BYTES_PER_LINE {
            line.push(match chunk.get(j) {
                Some(&b) if (0x20..0x7F).contains(&b) => b as char,
                Some(_) => '.',
                None => ' ',
            });
        }
        line.push('|');
    }

    line.trim_end().to_string()
}
