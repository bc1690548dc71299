//! # Biphase-Mark Line Code
//!
//! Every data bit becomes two line bits. The first line bit always toggles
//! (the clock transition); the second toggles again for a 1 and holds for a
//! 0. The decoder only looks at whether the two halves of a cell differ, so
//! it does not care which polarity the encoder started from.

use super::{BitBuffer, Process, Stage};

/// Biphase-mark encoder, one data bit to two line bits
#[derive(Debug, Clone)]
pub struct BiphaseMarkEncoder {
    /// Current line level ("clock phase")
    phase: u8,
}

impl BiphaseMarkEncoder {
    pub fn new() -> Self {
        Self { phase: 1 }
    }

    pub fn phase(&self) -> u8 {
        self.phase
    }
}

impl Default for BiphaseMarkEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Stage for BiphaseMarkEncoder {
    fn reset(&mut self) -> Process {
        self.phase = 1;
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
        if !input.has_available(0, 1) {
            return Process::NeedInputData;
        }
        if !output.has_space(0, 2) {
            return Process::NeedOutputSpace;
        }

        let mut in_index = 0;
        let mut out_index = 0;
        while input.has_available(in_index, 1) && output.has_space(out_index, 2) {
            self.phase ^= 1;
            output.write(out_index, self.phase);
            self.phase = (self.phase + input.read(in_index)) & 0x01;
            output.write(out_index + 1, self.phase);
            in_index += 1;
            out_index += 2;
        }

        input.consume(in_index);
        output.produce(out_index);
        Process::Ok
    }
}

/// Biphase-mark decoder, two line bits to one data bit
///
/// Stateless: pair alignment comes from the stream starting on a cell
/// boundary.
#[derive(Debug, Clone, Default)]
pub struct BiphaseMarkDecoder;

impl BiphaseMarkDecoder {
    pub fn new() -> Self {
        Self
    }
}

impl Stage for BiphaseMarkDecoder {
    fn reset(&mut self) -> Process {
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
        if !input.has_available(0, 2) {
            return Process::NeedInputData;
        }
        if !output.has_space(0, 1) {
            return Process::NeedOutputSpace;
        }

        let mut in_index = 0;
        let mut out_index = 0;
        while input.has_available(in_index, 2) && output.has_space(out_index, 1) {
            output.write(out_index, input.read(in_index) ^ input.read(in_index + 1));
            in_index += 2;
            out_index += 1;
        }

        input.consume(in_index);
        output.produce(out_index);
        Process::Ok
    }
}
