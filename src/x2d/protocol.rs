//! # X2D Protocol Constants
//!
//! Fixed wire values of the X2D 868MHz radio protocol.

/// Body header size (house, source, recipient, control fields)
pub const X2D_BODY_SIZE: usize = 6;

/// Footer size (big-endian checksum)
pub const X2D_FOOTER_SIZE: usize = 2;

/// Smallest valid frame: header + footer
pub const X2D_MIN_FRAME_SIZE: usize = X2D_BODY_SIZE + X2D_FOOTER_SIZE;

/// Line bytes of the default preamble (9 zeros, 6 ones, 1 zero)
///
/// The receiver's sync word detector consumes these, so they are put back
/// in front of every capture before decoding.
pub const X2D_SYNC_HEADER: [u8; 4] = [0x33, 0x33, 0x2A, 0xAB];

/// Carrier bytes sent before the first frame of a burst
pub const X2D_LEAD_IN: [u8; 2] = [0xFF, 0xFF];

/// Format bytes as lowercase hex without separators
pub fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|byte| format!("{:02x}", byte)).collect()
}

/// Parse hex, ignoring whitespace and `:` separators
///
/// Returns `None` on an odd digit count or a non-hex character.
pub fn from_hex(text: &str) -> Option<Vec<u8>> {
    let digits: Vec<u8> = text
        .bytes()
        .filter(|c| !c.is_ascii_whitespace() && *c != b':')
        .collect();
    if digits.len() % 2 != 0 {
        return None;
    }

    digits
        .chunks(2)
        .map(|pair| {
            let text = std::str::from_utf8(pair).ok()?;
            u8::from_str_radix(text, 16).ok()
        })
        .collect()
}
