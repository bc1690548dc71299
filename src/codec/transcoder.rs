//! # Buffer Transcoder
//!
//! Converts between byte-addressed and bit-addressed buffers.
//!
//! Bits map to bytes LSB first: unit 0 of each group of 8 is bit 0 of the
//! byte. When both buffers use the same unit width, units are copied one at
//! a time, which is how a stream changes bit addressing mode.

use super::{BitBuffer, Process, Stage};

/// Byte/bit width conversion stage
#[derive(Debug, Clone, Default)]
pub struct BufferTranscoder {
    flush: bool,
}

impl BufferTranscoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn flush(&self) -> bool {
        self.flush
    }

    /// Units of input one bits-to-bytes step needs
    fn min_bits(&self) -> usize {
        if self.flush {
            1
        } else {
            8
        }
    }

    fn copy_units<I, O>(input: &mut BitBuffer<I>, output: &mut BitBuffer<O>) -> Process
    where
        I: AsRef<[u8]> + AsMut<[u8]>,
        O: AsRef<[u8]> + AsMut<[u8]>,
    {
        if !input.has_available(0, 1) {
            return Process::NeedInputData;
        }
        if !output.has_space(0, 1) {
            return Process::NeedOutputSpace;
        }

        let mut index = 0;
        while input.has_available(index, 1) && output.has_space(index, 1) {
            output.write(index, input.read(index));
            index += 1;
        }

        input.consume(index);
        output.produce(index);
        Process::Ok
    }

    fn pack_bits<I, O>(&self, input: &mut BitBuffer<I>, output: &mut BitBuffer<O>) -> Process
    where
        I: AsRef<[u8]> + AsMut<[u8]>,
        O: AsRef<[u8]> + AsMut<[u8]>,
    {
        if !input.has_available(0, self.min_bits()) {
            return Process::NeedInputData;
        }
        if !output.has_space(0, 1) {
            return Process::NeedOutputSpace;
        }

        let mut in_index = 0;
        let mut out_index = 0;
        while input.has_available(in_index, self.min_bits()) && output.has_space(out_index, 1) {
            let mut value = 0u8;
            for bit in 0..8 {
                if !input.has_available(in_index, 1) {
                    // Flushing: missing high bits stay zero
                    break;
                }
                value |= input.read(in_index) << bit;
                in_index += 1;
            }
            output.write(out_index, value);
            out_index += 1;
        }

        input.consume(in_index);
        output.produce(out_index);
        Process::Ok
    }

    fn unpack_bytes<I, O>(input: &mut BitBuffer<I>, output: &mut BitBuffer<O>) -> Process
    where
        I: AsRef<[u8]> + AsMut<[u8]>,
        O: AsRef<[u8]> + AsMut<[u8]>,
    {
        if !input.has_available(0, 1) {
            return Process::NeedInputData;
        }
        if !output.has_space(0, 8) {
            return Process::NeedOutputSpace;
        }

        let mut in_index = 0;
        let mut out_index = 0;
        while input.has_available(in_index, 1) && output.has_space(out_index, 8) {
            let value = input.read(in_index);
            for bit in 0..8 {
                output.write(out_index, value >> bit);
                out_index += 1;
            }
            in_index += 1;
        }

        input.consume(in_index);
        output.produce(out_index);
        Process::Ok
    }
}

impl Stage for BufferTranscoder {
    fn reset(&mut self) -> Process {
        self.flush = false;
        Process::Reset
    }

    fn process<I, O>(&mut self, input: &mut BitBuffer<I>, output: &mut BitBuffer<O>) -> Process
    where
        I: AsRef<[u8]> + AsMut<[u8]>,
        O: AsRef<[u8]> + AsMut<[u8]>,
    {
        match (input.is_bit_addressed(), output.is_bit_addressed()) {
            (true, false) => self.pack_bits(input, output),
            (false, true) => Self::unpack_bytes(input, output),
            _ => Self::copy_units(input, output),
        }
    }

    fn set_flush(&mut self, flush: bool) {
        self.flush = flush;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::Addressing;

    fn bytes_to_bits(data: &[u8], mode: Addressing) -> BitBuffer<Vec<u8>> {
        let mut transcoder = BufferTranscoder::new();
        let mut input = BitBuffer::with_content(data.to_vec(), Addressing::Byte, data.len());
        let mut output = BitBuffer::new(vec![0u8; data.len()], mode);
        assert_eq!(transcoder.process(&mut input, &mut output), Process::Ok);
        assert!(input.is_empty());
        output
    }

    #[test]
    fn test_bytes_to_bits_lsb_first_keeps_layout() {
        let bits = bytes_to_bits(&[0x2F, 0x68], Addressing::LsbFirst);
        assert_eq!(bits.len(), 16);
        assert_eq!(bits.as_bytes(), &[0x2F, 0x68]);

        let units: Vec<u8> = bits.units().take(8).collect();
        assert_eq!(units, vec![1, 1, 1, 1, 0, 1, 0, 0]);
    }

    #[test]
    fn test_bytes_to_bits_msb_first_reverses_layout() {
        let bits = bytes_to_bits(&[0x01], Addressing::MsbFirst);
        assert_eq!(bits.as_bytes(), &[0x80]);
    }

    #[test]
    fn test_bits_to_bytes_round_trip_with_flush() {
        let data = [0x00, 0xFF, 0x5A, 0x2F, 0x94];
        let mut bits = bytes_to_bits(&data, Addressing::MsbFirst);

        let mut transcoder = BufferTranscoder::new();
        transcoder.set_flush(true);
        let mut output = BitBuffer::new([0u8; 8], Addressing::Byte);
        assert_eq!(transcoder.process(&mut bits, &mut output), Process::Ok);
        assert_eq!(output.as_bytes(), &data);
        assert!(bits.is_empty());
    }

    #[test]
    fn test_partial_group_without_flush_needs_input() {
        let mut bits = BitBuffer::with_content([0xFFu8, 0x80], Addressing::MsbFirst, 11);
        let mut transcoder = BufferTranscoder::new();
        let mut output = BitBuffer::new([0u8; 4], Addressing::Byte);

        assert_eq!(transcoder.process(&mut bits, &mut output), Process::Ok);
        assert_eq!(output.as_bytes(), &[0xFF]);
        assert_eq!(bits.len(), 3);

        assert_eq!(transcoder.process(&mut bits, &mut output), Process::NeedInputData);
        assert_eq!(output.len(), 1);
        assert_eq!(bits.len(), 3);
    }

    #[test]
    fn test_partial_group_with_flush_is_zero_padded() {
        let mut bits = BitBuffer::with_content([0b1010_0000u8], Addressing::MsbFirst, 3);
        let mut transcoder = BufferTranscoder::new();
        transcoder.set_flush(true);
        let mut output = BitBuffer::new([0u8; 1], Addressing::Byte);

        assert_eq!(transcoder.process(&mut bits, &mut output), Process::Ok);
        assert_eq!(output.as_bytes(), &[0b0000_0101]);
    }

    #[test]
    fn test_bit_copy_changes_addressing() {
        let mut input = BitBuffer::with_content([0b0000_0001u8], Addressing::LsbFirst, 8);
        let mut output = BitBuffer::new([0u8; 1], Addressing::MsbFirst);
        let mut transcoder = BufferTranscoder::new();

        assert_eq!(transcoder.process(&mut input, &mut output), Process::Ok);
        assert_eq!(output.as_bytes(), &[0b1000_0000]);
    }

    #[test]
    fn test_partial_progress_when_output_fills() {
        let mut input = BitBuffer::with_content(vec![1u8, 2, 3], Addressing::Byte, 3);
        let mut output = BitBuffer::new([0u8; 2], Addressing::LsbFirst);
        let mut transcoder = BufferTranscoder::new();

        assert_eq!(transcoder.process(&mut input, &mut output), Process::Ok);
        assert_eq!(output.as_bytes(), &[1, 2]);
        assert_eq!(input.as_bytes(), &[3]);

        assert_eq!(transcoder.process(&mut input, &mut output), Process::NeedOutputSpace);
        assert_eq!(input.len(), 1);
    }

    #[test]
    fn test_empty_input_needs_data() {
        let mut input = BitBuffer::new([0u8; 1], Addressing::Byte);
        let mut output = BitBuffer::new([0u8; 1], Addressing::MsbFirst);
        let mut transcoder = BufferTranscoder::new();
        assert_eq!(transcoder.process(&mut input, &mut output), Process::NeedInputData);
    }

    #[test]
    fn test_reset_clears_flush() {
        let mut transcoder = BufferTranscoder::new();
        transcoder.set_flush(true);
        assert_eq!(transcoder.reset(), Process::Reset);
        assert!(!transcoder.flush());
    }
}
