//! # X2D Burst Encoder
//!
//! Builds the air bytes of one transmission.
//!
//! A burst is the configured lead-in followed by the same message encoded
//! again and again on one encoder, so the receiver sees a single preamble
//! and then several copies of the frame. Copies are added while the burst
//! stays under half of the burst buffer.

use crate::codec::{Addressing, BitBuffer, X2dEncoder};
use crate::config::Config;
use crate::error::{Result, X2dError};
use bytes::Bytes;
use tracing::debug;

/// Encode a sealed message into MSB-first air bytes
///
/// # Arguments
///
/// * `config` - Codec and link configuration
/// * `message` - Message bytes, checksum footer included
///
/// # Returns
///
/// * `Result<Bytes>` - Lead-in plus as many frame copies as fit; the unused
///   bits of the last byte are zero
///
/// # Errors
///
/// Returns error if:
/// - The message is empty or longer than `max_message_len`
/// - Not even one copy fits in half of the burst buffer
///
/// # Examples
///
/// ```
/// use x2d_codec::config::Config;
/// use x2d_codec::x2d::{checksum, encoder::encode_burst};
///
/// let message = checksum::seal(&[0x2F, 0x68, 0x3E, 0x00, 0x05, 0x94, 0x1A]);
/// let air = encode_burst(&Config::default(), &message)?;
/// assert_eq!(&air[..6], &[0xFF, 0xFF, 0x33, 0x33, 0x2A, 0xAB]);
/// # Ok::<(), x2d_codec::error::X2dError>(())
/// ```
pub fn encode_burst(config: &Config, message: &[u8]) -> Result<Bytes> {
    if message.is_empty() {
        return Err(X2dError::Message("cannot encode an empty message".to_string()));
    }
    if message.len() > config.link.max_message_len {
        return Err(X2dError::Message(format!(
            "message too long: {} bytes, limit is {}",
            message.len(),
            config.link.max_message_len
        )));
    }

    let capacity = config.link.burst_capacity;
    let lead_in = &config.link.lead_in;
    if lead_in.len() >= capacity / 2 {
        return Err(X2dError::Message(format!(
            "lead-in of {} bytes leaves no room in a {}-byte burst",
            lead_in.len(),
            capacity
        )));
    }

    let mut storage = vec![0u8; capacity];
    storage[..lead_in.len()].copy_from_slice(lead_in);
    let mut air = BitBuffer::with_content(storage, Addressing::MsbFirst, lead_in.len() * 8);

    let mut encoder = X2dEncoder::new(&config.codec);
    let mut committed = air.len();
    let mut copies = 0;

    loop {
        let mut input = BitBuffer::with_content(message.to_vec(), Addressing::Byte, message.len());
        match encoder.encode(&mut input, &mut air, true) {
            Ok(()) if encoder.buffered() == 0 && air.len().div_ceil(8) < capacity / 2 => {
                committed = air.len();
                copies += 1;
            }
            Ok(()) => break,
            Err(stall) if stall.is_resumable() => break,
            Err(stall) => return Err(stall.into()),
        }
    }

    if copies == 0 {
        return Err(X2dError::Message(format!(
            "message of {} bytes does not fit in a {}-byte burst",
            message.len(),
            capacity
        )));
    }

    debug!("Encoded burst: {} copies in {} line bits", copies, committed);

    let mut bytes = air.into_inner();
    bytes.truncate(committed.div_ceil(8));
    let partial = committed % 8;
    if partial != 0 {
        if let Some(last) = bytes.last_mut() {
            *last &= 0xFFu8 << (8 - partial);
        }
    }

    Ok(Bytes::from(bytes))
}
