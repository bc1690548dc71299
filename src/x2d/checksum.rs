//! # X2D Checksum
//!
//! 16-bit two's-complement byte sum, stored big-endian after the message.
//!
//! A valid message sums to zero (mod 2^16) once the two footer bytes are
//! weighted as a big-endian word.

use super::protocol::{X2D_FOOTER_SIZE, X2D_MIN_FRAME_SIZE};

/// Compute the checksum of `data`
///
/// # Arguments
///
/// * `data` - Message bytes, footer excluded
///
/// # Returns
///
/// * `u16` - Negated 16-bit wrapping sum of the bytes
///
/// # Examples
///
/// ```
/// use x2d_codec::x2d::checksum::compute;
///
/// let body = [0x2F, 0x68, 0x3E, 0x00, 0x05, 0x94, 0x1A];
/// assert_eq!(compute(&body), 0xFE78);
/// ```
pub fn compute(data: &[u8]) -> u16 {
    let sum = data
        .iter()
        .fold(0u16, |sum, &byte| sum.wrapping_add(byte as u16));
    sum.wrapping_neg()
}

/// Append the big-endian checksum to a copy of `body`
pub fn seal(body: &[u8]) -> Vec<u8> {
    let mut message = Vec::with_capacity(body.len() + X2D_FOOTER_SIZE);
    message.extend_from_slice(body);
    message.extend_from_slice(&compute(body).to_be_bytes());
    message
}

/// Length of a received frame without its footer, if the footer matches
///
/// Frames shorter than a header plus footer are rejected.
pub fn frame_size(frame: &[u8]) -> Option<usize> {
    if frame.len() < X2D_MIN_FRAME_SIZE {
        return None;
    }

    let size = frame.len() - X2D_FOOTER_SIZE;
    let footer = u16::from_be_bytes([frame[size], frame[size + 1]]);
    (compute(&frame[..size]) == footer).then_some(size)
}
