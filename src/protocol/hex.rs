//! Hex rendering of raw frames for logs and capture files

use std::fmt;

/// Displays a byte slice as space separated lowercase hex pairs.
///
/// ```rust
/// use m365::protocol::HexDump;
///
/// assert_eq!(HexDump(&[0x55, 0xaa, 0x04]).to_string(), "55 aa 04");
/// ```
#[derive(Debug, Clone, Copy)]
pub struct HexDump<'a>(pub &'a [u8]);

impl fmt::Display for HexDump<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, byte) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

/// Parse hex text back into bytes. Whitespace, `:` and `/x` separators are
/// accepted so both our own dumps and the classic `/x55/xaa` notation load.
pub fn parse_hex(text: &str) -> Option<Vec<u8>> {
    let digits: String = text
        .replace("/x", "")
        .replace("\\x", "")
        .chars()
        .filter(|c| !c.is_whitespace() && *c != ':')
        .collect();

    if !digits.is_ascii() || digits.len() % 2 != 0 {
        return None;
    }

    (0..digits.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&digits[i..i + 2], 16).ok())
        .collect()
}
