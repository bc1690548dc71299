//! # X2D Codec Library
//!
//! Streaming line and frame codec for the X2D 868MHz home-automation radio
//! protocol.
//!
//! This library provides resumable encode and decode pipelines (bit-stuffed
//! framing, biphase-mark line code, byte/bit conversion), message-level
//! helpers for checksums and transmit bursts, and an async link to a
//! serial radio bridge.

pub mod codec;
pub mod config;
pub mod error;
pub mod radio;
pub mod x2d;
