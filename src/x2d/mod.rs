//! # X2D Protocol Module
//!
//! Message-level helpers around the streaming codec.
//!
//! This module handles:
//! - Two's-complement byte-sum checksum
//! - Transmit bursts (lead-in, one preamble, repeated frames)
//! - Capture decoding with sync header restoration
//! - Checksum filtering and repeat suppression of received frames

pub mod checksum;
pub mod decoder;
pub mod encoder;
pub mod protocol;
