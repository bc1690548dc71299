//! # Streaming Codec Module
//!
//! Resumable line/frame codecs for the X2D radio protocol.
//!
//! This module handles:
//! - Byte/bit views over fixed-capacity buffers
//! - Byte <-> bit width conversion
//! - Biphase-mark line coding
//! - Preamble, bit-stuffing and end-of-frame framing
//! - Chaining the stages into encode and decode pipelines
//!
//! Stages never block and never allocate. When a stage cannot make progress
//! it returns [`Process::NeedInputData`] or [`Process::NeedOutputSpace`] and
//! the caller re-invokes it once more input or output room is available.

pub mod biphase;
pub mod buffer;
pub mod frame;
pub mod pipeline;
pub mod transcoder;

pub use biphase::{BiphaseMarkDecoder, BiphaseMarkEncoder};
pub use buffer::{Addressing, BitBuffer};
pub use frame::{DecoderState, FrameDecoder, FrameEncoder};
pub use pipeline::{Pipeline, Stall, X2dDecoder, X2dEncoder};
pub use transcoder::BufferTranscoder;

use std::fmt;

/// Outcome of a single stage call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Process {
    /// Data was moved from input to output
    Ok,

    /// State was re-initialized, no data moved
    Reset,

    /// Input buffer has the wrong addressing mode for this stage
    InvalidInputType,

    /// Output buffer has the wrong addressing mode for this stage
    InvalidOutputType,

    /// Not enough input for one step
    NeedInputData,

    /// Not enough output room for one step
    NeedOutputSpace,
}

impl Process {
    pub fn is_ok(self) -> bool {
        self == Process::Ok
    }

    /// Whether the caller can retry after supplying input or draining output
    pub fn is_resumable(self) -> bool {
        matches!(self, Process::NeedInputData | Process::NeedOutputSpace)
    }
}

impl fmt::Display for Process {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Process::Ok => "ok",
            Process::Reset => "reset",
            Process::InvalidInputType => "invalid input type",
            Process::InvalidOutputType => "invalid output type",
            Process::NeedInputData => "need input data",
            Process::NeedOutputSpace => "need output space",
        };
        f.write_str(name)
    }
}

/// One step of a codec pipeline
///
/// A stage owns only its small state. Buffers are passed in on every call,
/// and a stage consumes input and produces output only for the units it
/// actually transformed, so partial progress survives across calls.
pub trait Stage {
    /// Re-initialize the stage state
    fn reset(&mut self) -> Process;

    /// Move as much data as possible from `input` to `output`
    fn process<I, O>(&mut self, input: &mut BitBuffer<I>, output: &mut BitBuffer<O>) -> Process
    where
        I: AsRef<[u8]> + AsMut<[u8]>,
        O: AsRef<[u8]> + AsMut<[u8]>;

    /// Whether a trailing partial group should be emitted
    ///
    /// Only width-converting stages care about this.
    fn set_flush(&mut self, _flush: bool) {}
}
