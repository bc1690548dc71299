//! # Codec Pipelines
//!
//! Chains four stages through three intermediate buffers.
//!
//! ```text
//! encode: bytes -> transcoder -> [LSB bits] -> frame -> [MSB bits] -> biphase -> [MSB bits] -> transcoder -> caller
//! decode: caller -> transcoder -> [MSB bits] -> biphase -> [MSB bits] -> frame -> [LSB bits] -> transcoder -> bytes
//! ```
//!
//! The intermediate buffers are allocated once with the configured capacity
//! and never grow. Data left in them by one call is picked up by the next.

use super::{
    Addressing, BiphaseMarkDecoder, BiphaseMarkEncoder, BitBuffer, BufferTranscoder,
    FrameDecoder, FrameEncoder, Process, Stage,
};
use crate::config::CodecConfig;
use thiserror::Error;
use tracing::trace;

/// First pipeline stage that did not return [`Process::Ok`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("pipeline stage {stage} stalled: {result}")]
pub struct Stall {
    /// 1-based stage index
    pub stage: usize,
    pub result: Process,
}

impl Stall {
    /// Whether more input or output room lets the pipeline continue
    pub fn is_resumable(&self) -> bool {
        self.result.is_resumable()
    }
}

fn check(stage: usize, result: Process) -> Result<(), Stall> {
    match result {
        Process::Ok => Ok(()),
        result => Err(Stall { stage, result }),
    }
}

/// Four stages joined by three owned buffers
#[derive(Debug, Clone)]
pub struct Pipeline<S1, S2, S3, S4> {
    first: S1,
    second: S2,
    third: S3,
    fourth: S4,
    a: BitBuffer<Vec<u8>>,
    b: BitBuffer<Vec<u8>>,
    c: BitBuffer<Vec<u8>>,
}

impl<S1, S2, S3, S4> Pipeline<S1, S2, S3, S4>
where
    S1: Stage,
    S2: Stage,
    S3: Stage,
    S4: Stage,
{
    /// Build a pipeline whose intermediate buffers hold `capacity` bytes each
    pub fn new(
        stages: (S1, S2, S3, S4),
        modes: [Addressing; 3],
        capacity: usize,
    ) -> Self {
        let (first, second, third, fourth) = stages;
        Self {
            first,
            second,
            third,
            fourth,
            a: BitBuffer::new(vec![0u8; capacity], modes[0]),
            b: BitBuffer::new(vec![0u8; capacity], modes[1]),
            c: BitBuffer::new(vec![0u8; capacity], modes[2]),
        }
    }

    /// Reset every stage and discard buffered data
    pub fn reset(&mut self) {
        self.first.reset();
        self.second.reset();
        self.third.reset();
        self.fourth.reset();
        self.a.clear();
        self.b.clear();
        self.c.clear();
    }

    /// Units held in the intermediate buffers
    pub fn buffered(&self) -> usize {
        self.a.len() + self.b.len() + self.c.len()
    }

    pub fn second(&self) -> &S2 {
        &self.second
    }

    pub fn third(&self) -> &S3 {
        &self.third
    }

    fn set_flush(&mut self, flush: bool) {
        self.first.set_flush(flush);
        self.second.set_flush(flush);
        self.third.set_flush(flush);
        self.fourth.set_flush(flush);
    }

    fn trace_levels(&self, stage: usize) {
        trace!(
            "after stage {}: a={} b={} c={}",
            stage,
            self.a.len(),
            self.b.len(),
            self.c.len()
        );
    }

    /// Drive `input` through all four stages into `output`
    ///
    /// Stops at the first stage that does not return [`Process::Ok`].
    ///
    /// # Errors
    ///
    /// Returns a [`Stall`] naming that stage and its result.
    pub fn run<I, O>(
        &mut self,
        input: &mut BitBuffer<I>,
        output: &mut BitBuffer<O>,
        flush: bool,
    ) -> Result<(), Stall>
    where
        I: AsRef<[u8]> + AsMut<[u8]>,
        O: AsRef<[u8]> + AsMut<[u8]>,
    {
        self.set_flush(flush);

        check(1, self.first.process(input, &mut self.a))?;
        self.trace_levels(1);
        check(2, self.second.process(&mut self.a, &mut self.b))?;
        self.trace_levels(2);
        check(3, self.third.process(&mut self.b, &mut self.c))?;
        self.trace_levels(3);
        check(4, self.fourth.process(&mut self.c, output))
    }

    /// Move data already held in the intermediate buffers into `output`
    ///
    /// Runs stages 2 to 4 without new input. A stage that cannot move more
    /// data is passed over as long as a later buffer still holds some.
    /// Returns `Ok` only when the last stage produced output.
    ///
    /// # Errors
    ///
    /// Returns a [`Stall`] naming the stage where data stopped moving.
    pub fn drain<O>(&mut self, output: &mut BitBuffer<O>) -> Result<(), Stall>
    where
        O: AsRef<[u8]> + AsMut<[u8]>,
    {
        let result = self.second.process(&mut self.a, &mut self.b);
        Self::pass_over(2, result, self.b.len() + self.c.len())?;
        let result = self.third.process(&mut self.b, &mut self.c);
        Self::pass_over(3, result, self.c.len())?;
        self.trace_levels(3);
        check(4, self.fourth.process(&mut self.c, output))
    }

    fn pass_over(stage: usize, result: Process, downstream: usize) -> Result<(), Stall> {
        if result.is_resumable() && downstream > 0 {
            return Ok(());
        }
        check(stage, result)
    }
}

type EncodePipeline = Pipeline<BufferTranscoder, FrameEncoder, BiphaseMarkEncoder, BufferTranscoder>;
type DecodePipeline = Pipeline<BufferTranscoder, BiphaseMarkDecoder, FrameDecoder, BufferTranscoder>;

/// Payload bytes to biphase-mark line bits
#[derive(Debug, Clone)]
pub struct X2dEncoder {
    pipeline: EncodePipeline,
}

impl X2dEncoder {
    pub fn new(config: &CodecConfig) -> Self {
        let stages = (
            BufferTranscoder::new(),
            FrameEncoder::new(config.preamble_zeros, config.preamble_ones),
            BiphaseMarkEncoder::new(),
            BufferTranscoder::new(),
        );
        Self {
            pipeline: Pipeline::new(
                stages,
                [Addressing::LsbFirst, Addressing::MsbFirst, Addressing::MsbFirst],
                config.buffer_capacity,
            ),
        }
    }

    /// Start a new transmission, the next frame carries a preamble again
    pub fn reset(&mut self) {
        self.pipeline.reset();
    }

    /// Frame and line-code the bytes of `input` into `output`
    ///
    /// `input` is normally byte addressed. `output` receives the line bits;
    /// a bit-addressed output takes them one per unit, a byte-addressed one
    /// packs them 8 per byte.
    ///
    /// # Errors
    ///
    /// Returns the first stage that could not complete.
    pub fn encode<I, O>(
        &mut self,
        input: &mut BitBuffer<I>,
        output: &mut BitBuffer<O>,
        flush: bool,
    ) -> Result<(), Stall>
    where
        I: AsRef<[u8]> + AsMut<[u8]>,
        O: AsRef<[u8]> + AsMut<[u8]>,
    {
        self.pipeline.run(input, output, flush)
    }

    /// Move line bits still held inside the pipeline into `output`
    ///
    /// # Errors
    ///
    /// Returns the stage where data stopped moving.
    pub fn drain<O>(&mut self, output: &mut BitBuffer<O>) -> Result<(), Stall>
    where
        O: AsRef<[u8]> + AsMut<[u8]>,
    {
        self.pipeline.drain(output)
    }

    pub fn buffered(&self) -> usize {
        self.pipeline.buffered()
    }

    pub fn frame_encoder(&self) -> &FrameEncoder {
        self.pipeline.second()
    }
}

impl Default for X2dEncoder {
    fn default() -> Self {
        Self::new(&CodecConfig::default())
    }
}

/// Biphase-mark line bits to payload bytes
#[derive(Debug, Clone)]
pub struct X2dDecoder {
    pipeline: DecodePipeline,
}

impl X2dDecoder {
    pub fn new(config: &CodecConfig) -> Self {
        let stages = (
            BufferTranscoder::new(),
            BiphaseMarkDecoder::new(),
            FrameDecoder::new(),
            BufferTranscoder::new(),
        );
        Self {
            pipeline: Pipeline::new(
                stages,
                [Addressing::MsbFirst, Addressing::MsbFirst, Addressing::LsbFirst],
                config.buffer_capacity,
            ),
        }
    }

    /// Drop any partial frame and wait for a new preamble
    pub fn reset(&mut self) {
        self.pipeline.reset();
    }

    /// Decode line bits from `input`, producing at most one frame
    ///
    /// # Errors
    ///
    /// Returns the first stage that could not complete. A stall at stage 3
    /// with [`Process::NeedInputData`] simply means no frame is complete yet.
    pub fn decode<I, O>(
        &mut self,
        input: &mut BitBuffer<I>,
        output: &mut BitBuffer<O>,
        flush: bool,
    ) -> Result<(), Stall>
    where
        I: AsRef<[u8]> + AsMut<[u8]>,
        O: AsRef<[u8]> + AsMut<[u8]>,
    {
        self.pipeline.run(input, output, flush)
    }

    /// Decode the next frame from line bits already inside the pipeline
    ///
    /// # Errors
    ///
    /// Returns the stage where data stopped moving.
    pub fn drain<O>(&mut self, output: &mut BitBuffer<O>) -> Result<(), Stall>
    where
        O: AsRef<[u8]> + AsMut<[u8]>,
    {
        self.pipeline.drain(output)
    }

    pub fn buffered(&self) -> usize {
        self.pipeline.buffered()
    }

    pub fn frame_decoder(&self) -> &FrameDecoder {
        self.pipeline.third()
    }
}

impl Default for X2dDecoder {
    fn default() -> Self {
        Self::new(&CodecConfig::default())
    }
}
