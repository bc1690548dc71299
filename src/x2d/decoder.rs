//! # X2D Capture Decoder
//!
//! Turns captured air bytes back into frames and checked messages.
//!
//! This module handles:
//! - Restoring the sync header swallowed by the receiver
//! - Driving the decode pipeline until no more frames come out
//! - Dropping frames with a bad checksum
//! - Suppressing the repeated copies of one burst
//! - JSON reports of received frames

use super::checksum::frame_size;
use super::protocol::{to_hex, X2D_SYNC_HEADER};
use crate::codec::{Addressing, BitBuffer, DecoderState, Stall, X2dDecoder};
use crate::config::{CodecConfig, Config};
use crate::error::Result;
use bytes::Bytes;
use serde::Serialize;
use tracing::{debug, warn};

/// Frame produced by [`CaptureDecoder::feed_frames`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceivedFrame {
    pub frame: Bytes,
    /// The decoder locked onto a preamble since the previous frame, so this
    /// frame starts a new burst
    pub new_burst: bool,
}

/// Streaming frame extractor over MSB-first air bytes
///
/// Keeps its decoder between calls, so a frame split across two
/// [`CaptureDecoder::feed`] calls still comes out whole.
#[derive(Debug, Clone)]
pub struct CaptureDecoder {
    decoder: X2dDecoder,
    frame: BitBuffer<Vec<u8>>,
    relocked: bool,
}

impl CaptureDecoder {
    pub fn new(config: &CodecConfig) -> Self {
        Self {
            decoder: X2dDecoder::new(config),
            frame: BitBuffer::new(vec![0u8; config.buffer_capacity], Addressing::Byte),
            relocked: true,
        }
    }

    /// Forget any partial frame
    pub fn reset(&mut self) {
        self.decoder.reset();
        self.frame.clear();
        self.relocked = true;
    }

    /// Decode `air`, returning every frame it completes
    ///
    /// # Errors
    ///
    /// Returns error only if the pipeline reports a non-resumable result,
    /// which means it was wired wrong.
    pub fn feed(&mut self, air: &[u8]) -> Result<Vec<Bytes>> {
        let frames = self.feed_frames(air)?;
        Ok(frames.into_iter().map(|received| received.frame).collect())
    }

    /// Decode `air`, marking the frames that follow a new preamble
    ///
    /// # Errors
    ///
    /// Returns error only if the pipeline reports a non-resumable result.
    pub fn feed_frames(&mut self, air: &[u8]) -> Result<Vec<ReceivedFrame>> {
        let mut input = BitBuffer::with_content(air.to_vec(), Addressing::MsbFirst, air.len() * 8);
        let mut frames = Vec::new();

        loop {
            let pending = (input.len(), self.decoder.buffered());
            let emitted = frames.len();

            self.watch_lock();
            let result = self.decoder.decode(&mut input, &mut self.frame, true);
            self.collect(result, &mut frames)?;

            loop {
                self.watch_lock();
                let result = self.decoder.drain(&mut self.frame);
                if !self.collect(result, &mut frames)? {
                    break;
                }
            }

            if frames.len() == emitted && (input.len(), self.decoder.buffered()) == pending {
                break;
            }
        }

        if !input.is_empty() {
            warn!("Dropping {} line bits the decoder could not take", input.len());
        }

        Ok(frames)
    }

    /// Note whether the frame decoder is hunting for a preamble
    ///
    /// It emits at most one frame per call, and only from the body states,
    /// so checking before every call catches each lock.
    fn watch_lock(&mut self) {
        if !matches!(
            self.decoder.frame_decoder().state(),
            DecoderState::Data | DecoderState::Trailing
        ) {
            self.relocked = true;
        }
    }

    /// Move one finished frame out of the output buffer
    fn collect(
        &mut self,
        result: std::result::Result<(), Stall>,
        frames: &mut Vec<ReceivedFrame>,
    ) -> Result<bool> {
        match result {
            Ok(()) => {
                debug!("Frame received: {}", to_hex(self.frame.as_bytes()));
                frames.push(ReceivedFrame {
                    frame: Bytes::copy_from_slice(self.frame.as_bytes()),
                    new_burst: self.relocked,
                });
                self.frame.clear();
                self.relocked = false;
                Ok(true)
            }
            Err(stall) if stall.is_resumable() => Ok(false),
            Err(stall) => Err(stall.into()),
        }
    }
}

/// Checksum filter with repeat suppression
///
/// A burst carries the same message several times; only the first valid
/// copy is passed on until a different message arrives.
#[derive(Debug, Clone, Default)]
pub struct MessageFilter {
    last: Option<Bytes>,
}

impl MessageFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Message body of `frame`, unless it is invalid or a repeat
    pub fn accept(&mut self, frame: &Bytes) -> Option<Bytes> {
        let Some(size) = frame_size(frame) else {
            warn!("Dropping frame with bad checksum: {}", to_hex(frame));
            return None;
        };

        let body = frame.slice(..size);
        if self.last.as_ref() == Some(&body) {
            debug!("Skipping repeated message");
            return None;
        }

        self.last = Some(body.clone());
        Some(body)
    }

    /// Let the next copy of the last message through again
    pub fn forget(&mut self) {
        self.last = None;
    }
}

/// Decode one capture into raw frames
///
/// The capture is taken as starting right after the receiver's sync word.
/// With `restore_sync_header` set, the swallowed preamble is put back first.
///
/// # Errors
///
/// Returns error if the decode pipeline is miswired.
pub fn decode_capture(config: &Config, capture: &[u8]) -> Result<Vec<Bytes>> {
    let mut decoder = CaptureDecoder::new(&config.codec);

    if config.link.restore_sync_header {
        let mut air = Vec::with_capacity(X2D_SYNC_HEADER.len() + capture.len());
        air.extend_from_slice(&X2D_SYNC_HEADER);
        air.extend_from_slice(capture);
        decoder.feed(&air)
    } else {
        decoder.feed(capture)
    }
}

/// Decode one capture into distinct, checksum-valid message bodies
///
/// # Errors
///
/// Returns error if the decode pipeline is miswired.
pub fn decode_messages(config: &Config, capture: &[u8]) -> Result<Vec<Bytes>> {
    let mut filter = MessageFilter::new();
    let messages = decode_capture(config, capture)?
        .iter()
        .filter_map(|frame| filter.accept(frame))
        .collect();
    Ok(messages)
}

/// One received frame, as written to the JSON report
#[derive(Debug, Clone, Serialize)]
pub struct FrameReport {
    pub timestamp: String,
    pub frame: String,
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl FrameReport {
    pub fn new(frame: &[u8]) -> Self {
        let size = frame_size(frame);
        Self {
            timestamp: chrono::Utc::now().to_rfc3339(),
            frame: to_hex(frame),
            valid: size.is_some(),
            message: size.map(|size| to_hex(&frame[..size])),
        }
    }

    /// Serialize as one JSON line
    pub fn to_json_line(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::x2d::checksum::seal;
    use crate::x2d::encoder::encode_burst;

    const BODY: [u8; 7] = [0x2F, 0x68, 0x3E, 0x00, 0x05, 0x94, 0x1A];

    /// What the receiver hands over: the burst minus lead-in and sync word
    fn capture_of(body: &[u8]) -> Vec<u8> {
        let air = encode_burst(&Config::default(), &seal(body)).unwrap();
        air[2 + X2D_SYNC_HEADER.len()..].to_vec()
    }

    #[test]
    fn test_decode_capture_returns_every_copy() {
        let frames = decode_capture(&Config::default(), &capture_of(&BODY)).unwrap();
        assert_eq!(frames.len(), 5);
        for frame in &frames {
            assert_eq!(frame.as_ref(), seal(&BODY).as_slice());
        }
    }

    #[test]
    fn test_decode_messages_dedupes_burst() {
        let messages = decode_messages(&Config::default(), &capture_of(&BODY)).unwrap();
        assert_eq!(messages, vec![Bytes::copy_from_slice(&BODY)]);
    }

    #[test]
    fn test_capture_without_header_restore() {
        let mut config = Config::default();
        config.link.restore_sync_header = false;

        // Nothing to lock onto once the preamble is gone
        assert!(decode_capture(&config, &capture_of(&BODY)).unwrap().is_empty());

        let air = encode_burst(&Config::default(), &seal(&BODY)).unwrap();
        assert_eq!(decode_capture(&config, &air[2..]).unwrap().len(), 5);
    }

    #[test]
    fn test_noise_yields_nothing() {
        let noise: Vec<u8> = (0..200u32).map(|i| (i.wrapping_mul(37) ^ 0x5A) as u8).collect();
        assert!(decode_messages(&Config::default(), &noise).unwrap().is_empty());
    }

    #[test]
    fn test_streaming_feed_across_chunks() {
        let mut decoder = CaptureDecoder::new(&CodecConfig::default());
        let mut frames = Vec::new();
        let air = encode_burst(&Config::default(), &seal(&BODY)).unwrap();
        for chunk in air[2..].chunks(3) {
            frames.extend(decoder.feed(chunk).unwrap());
        }
        assert_eq!(frames.len(), 5);
        assert!(frames.iter().all(|frame| frame.as_ref() == seal(&BODY).as_slice()));
    }

    #[test]
    fn test_streaming_feed_longest_message() {
        let config = Config::default();
        // All ones: the most stuffing a message of this length can get
        let body = vec![0xFF; config.link.max_message_len - 2];
        let message = seal(&body);
        let air = encode_burst(&config, &message).unwrap();

        let whole = CaptureDecoder::new(&config.codec).feed(&air[2..]).unwrap();
        assert!(whole.len() >= 2);

        let mut decoder = CaptureDecoder::new(&config.codec);
        let mut frames = Vec::new();
        for chunk in air[2..].chunks(3) {
            frames.extend(decoder.feed(chunk).unwrap());
        }
        assert_eq!(frames.len(), whole.len());
        assert!(frames.iter().all(|frame| frame.as_ref() == message.as_slice()));
    }

    #[test]
    fn test_feed_frames_marks_each_burst() {
        let mut decoder = CaptureDecoder::new(&CodecConfig::default());
        let air = encode_burst(&Config::default(), &seal(&BODY)).unwrap();

        let first = decoder.feed_frames(&air[2..]).unwrap();
        assert_eq!(first.len(), 5);
        assert!(first[0].new_burst);
        assert!(first[1..].iter().all(|received| !received.new_burst));

        // Quiet carrier decodes as ones until the watchdog gives up
        assert!(decoder.feed_frames(&[0x55; 64]).unwrap().is_empty());

        let second = decoder.feed_frames(&air[2..]).unwrap();
        assert_eq!(second.len(), 5);
        assert!(second[0].new_burst);
        assert!(second[1..].iter().all(|received| !received.new_burst));
    }

    #[test]
    fn test_filter_rejects_bad_checksum() {
        let mut filter = MessageFilter::new();
        let mut message = seal(&BODY);
        message[0] ^= 0x80;
        assert_eq!(filter.accept(&Bytes::from(message)), None);
    }

    #[test]
    fn test_filter_passes_new_message_after_repeat() {
        let mut filter = MessageFilter::new();
        let first = Bytes::from(seal(&BODY));
        let second = Bytes::from(seal(&[0x2F, 0x68, 0x3E, 0x01, 0x05, 0x90, 0x01, 0x03]));

        assert!(filter.accept(&first).is_some());
        assert!(filter.accept(&first).is_none());
        assert!(filter.accept(&second).is_some());
        assert!(filter.accept(&first).is_some());

        filter.forget();
        assert!(filter.accept(&first).is_some());
    }

    #[test]
    fn test_frame_report_json() {
        let report = FrameReport::new(&seal(&BODY));
        assert!(report.valid);
        assert_eq!(report.message.as_deref(), Some("2f683e0005941a"));

        let line = report.to_json_line().unwrap();
        let value: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["frame"], "2f683e0005941afe78");
        assert_eq!(value["valid"], true);
        assert!(value["timestamp"].is_string());
    }

    #[test]
    fn test_frame_report_invalid_frame() {
        let report = FrameReport::new(&[0x01, 0x02, 0x03]);
        assert!(!report.valid);
        let line = report.to_json_line().unwrap();
        assert!(!line.contains("message"));
    }
}
