//! # X2D Frame Codec
//!
//! Preamble, bit-stuffing and end-of-frame framing.
//!
//! A transmission starts with a preamble of leading zeros, leading ones and
//! one spacer zero. Each frame body is followed by the END-OF-FRAME marker
//! and the SEPARATOR marker:
//!
//! ```text
//! 000000000 111111 0 | stuffed body | 111111110 | 1111110 | stuffed body | ...
//! ```
//!
//! A zero is stuffed after every 5 consecutive ones of the body, so the body
//! can never contain the 8 ones of the END-OF-FRAME marker nor the 6 ones
//! the receiver locks onto.

use super::{BitBuffer, Process, Stage};
use tracing::{debug, trace, warn};

/// End-of-frame marker
pub const END_OF_FRAME: [u8; 9] = [1, 1, 1, 1, 1, 1, 1, 1, 0];

/// Separator following every end-of-frame marker
pub const SEPARATOR: [u8; 7] = [1, 1, 1, 1, 1, 1, 0];

/// Default number of preamble zeros
pub const DEFAULT_PREAMBLE_ZEROS: u8 = 9;

/// Default number of preamble ones
pub const DEFAULT_PREAMBLE_ONES: u8 = 6;

/// Shortest zero run the decoder accepts as preamble
pub const MIN_LEADING_ZEROS: usize = 7;

/// Shortest one run the decoder accepts as preamble
pub const MIN_LEADING_ONES: usize = 6;

/// A zero is stuffed after this many consecutive ones
pub const MAX_SUCCESSIVE_ONES: usize = 5;

/// Spacer bits between preamble and first body
pub const EXTRA_ZERO_LENGTH: usize = 1;

/// Buffered body bits after which an unterminated frame is discarded
pub const WATCHDOG_BITS: usize = 16 * 8;

/// Write one bit at `*index` past the content end, if there is room
fn put<O>(output: &mut BitBuffer<O>, index: &mut usize, value: u8) -> bool
where
    O: AsRef<[u8]> + AsMut<[u8]>,
{
    if !output.has_space(*index, 1) {
        return false;
    }
    output.write(*index, value);
    *index += 1;
    true
}

/// Frame encoder
///
/// The preamble is emitted on the first call after a reset only; every
/// call then frames all available input bits as one body. A call is atomic:
/// if the whole frame does not fit, nothing is produced or consumed.
#[derive(Debug, Clone)]
pub struct FrameEncoder {
    preamble_sent: bool,
    preamble_zeros: u8,
    preamble_ones: u8,
}

impl FrameEncoder {
    /// Create an encoder with custom preamble lengths
    pub fn new(preamble_zeros: u8, preamble_ones: u8) -> Self {
        Self {
            preamble_sent: false,
            preamble_zeros,
            preamble_ones,
        }
    }

    pub fn preamble_sent(&self) -> bool {
        self.preamble_sent
    }

    /// Number of line bits the preamble occupies
    pub fn preamble_len(&self) -> usize {
        self.preamble_zeros as usize + self.preamble_ones as usize + EXTRA_ZERO_LENGTH
    }
}

impl Default for FrameEncoder {
    fn default() -> Self {
        Self::new(DEFAULT_PREAMBLE_ZEROS, DEFAULT_PREAMBLE_ONES)
    }
}

impl Stage for FrameEncoder {
    fn reset(&mut self) -> Process {
        self.preamble_sent = false;
        Process::Reset
    }

    fn process<I, O>(&mut self, input: &mut BitBuffer<I>, output: &mut BitBuffer<O>) -> Process
    where
        I: AsRef<[u8]> + AsMut<[u8]>,
        O: AsRef<[u8]> + AsMut<[u8]>,
    {
        if !input.is_bit_addressed() {
            return Process::InvalidInputType;
        }
        if !output.is_bit_addressed() {
            return Process::InvalidOutputType;
        }
        if input.is_empty() {
            return Process::NeedInputData;
        }

        let mut out_index = 0;

        if !self.preamble_sent {
            let preamble = std::iter::repeat(0)
                .take(self.preamble_zeros as usize)
                .chain(std::iter::repeat(1).take(self.preamble_ones as usize))
                .chain(std::iter::once(0));
            for value in preamble {
                if !put(output, &mut out_index, value) {
                    return Process::NeedOutputSpace;
                }
            }
        }

        let mut successive_ones = 0;
        for in_index in 0..input.len() {
            let value = input.read(in_index);
            if !put(output, &mut out_index, value) {
                return Process::NeedOutputSpace;
            }

            if value != 0 {
                successive_ones += 1;
                if successive_ones >= MAX_SUCCESSIVE_ONES {
                    if !put(output, &mut out_index, 0) {
                        return Process::NeedOutputSpace;
                    }
                    successive_ones = 0;
                }
            } else {
                successive_ones = 0;
            }
        }

        for &value in END_OF_FRAME.iter().chain(SEPARATOR.iter()) {
            if !put(output, &mut out_index, value) {
                return Process::NeedOutputSpace;
            }
        }

        trace!("Framed {} body bits into {} line bits", input.len(), out_index);

        input.consume(input.len());
        output.produce(out_index);
        self.preamble_sent = true;
        Process::Ok
    }
}

/// Frame decoder synchronization state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecoderState {
    /// Looking for the leading zeros
    Init,

    /// Leading zeros seen, looking for the leading ones
    LeadOnes,

    /// Preamble seen, skipping the spacer bit
    ExtraZero,

    /// Looking for the end-of-frame marker
    Data,

    /// Skipping the separator after a frame
    Trailing,
}

/// What the decoder does after a transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Consume and keep going
    Continue,

    /// Consume and wait for more input
    NeedInput,

    /// Destuff the first `body` bits to the output, then consume
    Emit { body: usize },
}

/// Result of one decoder transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Step {
    pub next: DecoderState,
    pub consume: usize,
    pub action: Action,
}

impl Step {
    fn wait(state: DecoderState) -> Self {
        Self {
            next: state,
            consume: 0,
            action: Action::NeedInput,
        }
    }
}

/// Run of identical bits at the head of a buffer
#[derive(Debug, Clone, Copy)]
struct Run {
    value: u8,
    len: usize,
    /// A different bit follows, so the run cannot grow
    confirmed: bool,
}

fn leading_run<S>(input: &BitBuffer<S>) -> Option<Run>
where
    S: AsRef<[u8]> + AsMut<[u8]>,
{
    if input.is_empty() {
        return None;
    }

    let value = input.read(0);
    let mut len = 1;
    while len < input.len() && input.read(len) == value {
        len += 1;
    }

    Some(Run {
        value,
        len,
        confirmed: len < input.len(),
    })
}

fn find_end_of_frame<S>(input: &BitBuffer<S>) -> Option<usize>
where
    S: AsRef<[u8]> + AsMut<[u8]>,
{
    let mut index = 0;
    while input.has_available(index, END_OF_FRAME.len()) {
        if END_OF_FRAME
            .iter()
            .enumerate()
            .all(|(i, &bit)| input.read(index + i) == bit)
        {
            return Some(index);
        }
        index += 1;
    }
    None
}

/// Compute the next decoder step from the buffered input
///
/// Pure: neither the state nor the buffer is modified.
///
/// A run that reaches the end of the buffer is not confirmed yet. It is
/// trimmed to the bits that still matter (the lock threshold when the run
/// has the wanted value, its last bit otherwise) so that long silence cannot
/// fill the buffer while the scan waits.
pub fn transition<S>(state: DecoderState, input: &BitBuffer<S>) -> Step
where
    S: AsRef<[u8]> + AsMut<[u8]>,
{
    match state {
        DecoderState::Init | DecoderState::LeadOnes => {
            let (wanted, threshold, locked) = if state == DecoderState::Init {
                (0, MIN_LEADING_ZEROS, DecoderState::LeadOnes)
            } else {
                (1, MIN_LEADING_ONES, DecoderState::ExtraZero)
            };

            let Some(run) = leading_run(input) else {
                return Step::wait(state);
            };

            if !run.confirmed {
                let keep = if run.value == wanted { threshold } else { 1 };
                return Step {
                    next: state,
                    consume: run.len.saturating_sub(keep),
                    action: Action::NeedInput,
                };
            }

            let next = if run.value == wanted && run.len >= threshold {
                locked
            } else {
                DecoderState::Init
            };
            Step {
                next,
                consume: run.len,
                action: Action::Continue,
            }
        }
        DecoderState::ExtraZero => {
            if !input.has_available(0, EXTRA_ZERO_LENGTH) {
                return Step::wait(state);
            }
            Step {
                next: DecoderState::Data,
                consume: EXTRA_ZERO_LENGTH,
                action: Action::Continue,
            }
        }
        DecoderState::Data => match find_end_of_frame(input) {
            Some(body) => Step {
                next: DecoderState::Trailing,
                consume: body + END_OF_FRAME.len(),
                action: Action::Emit { body },
            },
            None if input.len() >= WATCHDOG_BITS => Step {
                next: DecoderState::Init,
                consume: input.len(),
                action: Action::NeedInput,
            },
            None => Step::wait(state),
        },
        DecoderState::Trailing => {
            if !input.has_available(0, SEPARATOR.len()) {
                return Step::wait(state);
            }
            Step {
                next: DecoderState::Data,
                consume: SEPARATOR.len(),
                action: Action::Continue,
            }
        }
    }
}

/// Copy the first `body` bits of `input` to `output`, dropping stuffed zeros
///
/// Returns the number of bits written, or `None` if the output ran out of
/// room. Nothing is committed either way.
fn destuff<I, O>(input: &BitBuffer<I>, body: usize, output: &mut BitBuffer<O>) -> Option<usize>
where
    I: AsRef<[u8]> + AsMut<[u8]>,
    O: AsRef<[u8]> + AsMut<[u8]>,
{
    let mut successive_ones = 0;
    let mut out_index = 0;

    for in_index in 0..body {
        let value = input.read(in_index);
        if value != 0 {
            successive_ones += 1;
        } else if successive_ones >= MAX_SUCCESSIVE_ONES {
            // Stuffed bit
            successive_ones = 0;
            continue;
        } else {
            successive_ones = 0;
        }

        if !put(output, &mut out_index, value) {
            return None;
        }
    }

    Some(out_index)
}

/// Frame decoder
///
/// Locks onto the preamble, then emits the destuffed body of one frame per
/// successful call. After a frame it skips the separator and goes straight
/// back to looking for the next end-of-frame marker, since the frames of a
/// burst share one preamble.
#[derive(Debug, Clone)]
pub struct FrameDecoder {
    state: DecoderState,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self {
            state: DecoderState::Init,
        }
    }

    pub fn state(&self) -> DecoderState {
        self.state
    }

    fn enter(&mut self, next: DecoderState) {
        if next != self.state {
            debug!("Frame decoder {:?} -> {:?}", self.state, next);
        }
        self.state = next;
    }
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Stage for FrameDecoder {
    fn reset(&mut self) -> Process {
        self.state = DecoderState::Init;
        Process::Reset
    }

    fn process<I, O>(&mut self, input: &mut BitBuffer<I>, output: &mut BitBuffer<O>) -> Process
    where
        I: AsRef<[u8]> + AsMut<[u8]>,
        O: AsRef<[u8]> + AsMut<[u8]>,
    {
        if !input.is_bit_addressed() {
            return Process::InvalidInputType;
        }
        if !output.is_bit_addressed() {
            return Process::InvalidOutputType;
        }

        loop {
            let step = transition(self.state, input);
            match step.action {
                Action::Continue => {
                    input.consume(step.consume);
                    self.enter(step.next);
                }
                Action::NeedInput => {
                    if self.state == DecoderState::Data && step.next == DecoderState::Init {
                        warn!(
                            "No end-of-frame within {} bits, discarding {} bits",
                            WATCHDOG_BITS, step.consume
                        );
                    }
                    input.consume(step.consume);
                    self.enter(step.next);
                    return Process::NeedInputData;
                }
                Action::Emit { body } => {
                    let Some(produced) = destuff(input, body, output) else {
                        return Process::NeedOutputSpace;
                    };
                    debug!("Decoded frame: {} line bits, {} payload bits", body, produced);
                    input.consume(step.consume);
                    output.produce(produced);
                    self.enter(step.next);
                    return Process::Ok;
                }
            }
        }
    }
}
