//! End-to-end tests of the encode and decode pipelines

use x2d_codec::codec::frame::{END_OF_FRAME, SEPARATOR};
use x2d_codec::codec::{
    Addressing, BiphaseMarkEncoder, BitBuffer, DecoderState, FrameDecoder, FrameEncoder, Process,
    Stage, X2dDecoder, X2dEncoder,
};
use x2d_codec::config::{CodecConfig, Config};
use x2d_codec::x2d::checksum::{frame_size, seal};
use x2d_codec::x2d::decoder::decode_messages;
use x2d_codec::x2d::encoder::encode_burst;

const MESSAGE: [u8; 9] = [0x2F, 0x68, 0x3E, 0x00, 0x05, 0x94, 0x1A, 0xFE, 0x78];

fn large_buffers() -> CodecConfig {
    CodecConfig {
        buffer_capacity: 256,
        ..CodecConfig::default()
    }
}

fn payload(len: usize, seed: u32) -> Vec<u8> {
    let mut state = seed;
    (0..len)
        .map(|_| {
            state = state.wrapping_mul(1_103_515_245).wrapping_add(12_345);
            (state >> 16) as u8
        })
        .collect()
}

fn encode(encoder: &mut X2dEncoder, payload: &[u8], capacity: usize) -> BitBuffer<Vec<u8>> {
    let mut input = BitBuffer::with_content(payload.to_vec(), Addressing::Byte, payload.len());
    let mut line = BitBuffer::new(vec![0u8; capacity], Addressing::MsbFirst);
    encoder.encode(&mut input, &mut line, true).unwrap();
    assert!(input.is_empty());
    assert_eq!(encoder.buffered(), 0);
    line
}

fn decode(decoder: &mut X2dDecoder, line: &mut BitBuffer<Vec<u8>>, capacity: usize) -> Vec<u8> {
    let mut output = BitBuffer::new(vec![0u8; capacity], Addressing::Byte);
    decoder.decode(line, &mut output, true).unwrap();
    output.as_bytes().to_vec()
}

/// Undo the line code: one frame bit per pair of line bits
fn frame_bits(line: &BitBuffer<Vec<u8>>) -> Vec<u8> {
    let units: Vec<u8> = line.units().collect();
    units.chunks(2).map(|pair| pair[0] ^ pair[1]).collect()
}

fn longest_run_of_ones(bits: &[u8]) -> usize {
    bits.split(|&bit| bit == 0).map(|run| run.len()).max().unwrap_or(0)
}

fn bit_buffer(bits: &[u8], capacity: usize) -> BitBuffer<Vec<u8>> {
    let mut buffer = BitBuffer::new(vec![0u8; capacity], Addressing::MsbFirst);
    for &bit in bits {
        assert!(buffer.push(bit));
    }
    buffer
}

fn line_code(bits: &[u8]) -> BitBuffer<Vec<u8>> {
    let mut input = bit_buffer(bits, bits.len().div_ceil(8));
    let mut line = BitBuffer::new(vec![0u8; bits.len().div_ceil(4)], Addressing::MsbFirst);
    assert_eq!(BiphaseMarkEncoder::new().process(&mut input, &mut line), Process::Ok);
    line
}

#[test]
fn test_payload_round_trip_1_to_60_bytes() {
    let config = large_buffers();

    for len in 1..=60 {
        let data = payload(len, len as u32);
        let mut line = encode(&mut X2dEncoder::new(&config), &data, 256);
        let decoded = decode(&mut X2dDecoder::new(&config), &mut line, 256);
        assert_eq!(decoded, data, "payload of {} bytes", len);
    }
}

#[test]
fn test_worst_case_stuffing_round_trip() {
    let config = large_buffers();

    for data in [vec![0xFF; 60], vec![0x00; 60], vec![0x1F; 60], vec![0xF8; 60]] {
        let mut line = encode(&mut X2dEncoder::new(&config), &data, 256);
        let decoded = decode(&mut X2dDecoder::new(&config), &mut line, 256);
        assert_eq!(decoded, data);
    }
}

#[test]
fn test_concrete_vector() {
    assert_eq!(seal(&MESSAGE[..7]), MESSAGE.to_vec());
    assert_eq!(frame_size(&MESSAGE), Some(7));

    let mut line = encode(&mut X2dEncoder::default(), &MESSAGE, 64);
    let bits = frame_bits(&line);

    let mut head = vec![0; 9];
    head.extend([1; 6]);
    head.push(0);
    assert_eq!(&bits[..16], head.as_slice());

    let mut tail = END_OF_FRAME.to_vec();
    tail.extend(SEPARATOR);
    assert_eq!(&bits[bits.len() - 16..], tail.as_slice());

    let decoded = decode(&mut X2dDecoder::default(), &mut line, 64);
    assert_eq!(decoded, MESSAGE.to_vec());
}

#[test]
fn test_stuffing_bounds_runs_of_ones() {
    let config = large_buffers();

    for seed in 0..32 {
        let data = payload(40, seed);
        let line = encode(&mut X2dEncoder::new(&config), &data, 256);
        let bits = frame_bits(&line);
        let body = &bits[16..bits.len() - 16];
        assert!(longest_run_of_ones(body) <= 5, "seed {}", seed);
    }

    let line = encode(&mut X2dEncoder::new(&config), &[0xFF; 8], 256);
    let bits = frame_bits(&line);
    assert_eq!(longest_run_of_ones(&bits[16..bits.len() - 16]), 5);
}

#[test]
fn test_resynchronization_over_noise() {
    let first: Vec<u8> = vec![1, 0, 1, 0, 0, 1, 0, 1, 1, 1, 0, 0];
    let second: Vec<u8> = vec![1, 1, 1, 1, 1, 1, 1, 0, 0, 1];

    let mut encoder = FrameEncoder::default();
    let mut framed = BitBuffer::new(vec![0u8; 16], Addressing::MsbFirst);
    for body in [&first, &second] {
        let mut input = bit_buffer(body, 2);
        assert_eq!(encoder.process(&mut input, &mut framed), Process::Ok);
    }

    let mut stream = vec![1, 0, 1, 1, 0, 0, 1, 1, 1, 1, 1, 1, 1, 1, 0, 1, 0, 0, 0, 1, 1, 0];
    stream.extend(framed.units());

    let mut decoder = FrameDecoder::new();
    let mut input = bit_buffer(&stream, 32);
    let mut output = BitBuffer::new(vec![0u8; 4], Addressing::LsbFirst);
    let mut frames = Vec::new();

    loop {
        match decoder.process(&mut input, &mut output) {
            Process::Ok => {
                frames.push(output.units().collect::<Vec<u8>>());
                output.clear();
            }
            Process::NeedInputData => break,
            other => panic!("unexpected result: {}", other),
        }
    }

    assert_eq!(frames, vec![first, second]);
    assert_eq!(decoder.state(), DecoderState::Data);
}

#[test]
fn test_resynchronization_through_pipeline() {
    let mut encoder = X2dEncoder::default();
    let frame1 = encode(&mut encoder, &[0x12, 0x34, 0x56], 64);
    let frame2 = encode(&mut encoder, &[0xAB, 0xCD], 64);

    // Noise with an even number of line bits keeps the line-code pairs aligned
    let mut stream: Vec<u8> = vec![0, 1, 1, 0, 1, 1, 1, 0, 0, 1, 0, 1, 1, 1, 1, 0, 1, 0, 0, 0];
    stream.extend(frame1.units());
    stream.extend(frame2.units());
    let mut line = bit_buffer(&stream, 64);

    let mut decoder = X2dDecoder::default();
    let mut output = BitBuffer::new(vec![0u8; 64], Addressing::Byte);

    decoder.decode(&mut line, &mut output, true).unwrap();
    assert_eq!(output.as_bytes(), &[0x12, 0x34, 0x56]);
    output.clear();

    decoder.drain(&mut output).unwrap();
    assert_eq!(output.as_bytes(), &[0xAB, 0xCD]);
}

#[test]
fn test_watchdog_recovery() {
    let mut decoder = X2dDecoder::default();
    let mut output = BitBuffer::new(vec![0u8; 64], Addressing::Byte);

    // Preamble then 200 bits that never end a frame
    let mut bits = vec![0; 9];
    bits.extend([1; 6]);
    bits.push(0);
    bits.extend((0..200).map(|i| (i % 2) as u8));
    let mut line = line_code(&bits);

    let stall = decoder.decode(&mut line, &mut output, true).unwrap_err();
    assert_eq!(stall.result, Process::NeedInputData);
    assert_eq!(decoder.frame_decoder().state(), DecoderState::Init);
    assert!(output.is_empty());

    // A fresh transmission is picked up without a reset
    let mut line = encode(&mut X2dEncoder::default(), &MESSAGE, 64);
    decoder.decode(&mut line, &mut output, true).unwrap();
    assert_eq!(output.as_bytes(), &MESSAGE);
}

#[test]
fn test_burst_to_messages() {
    let config = Config::default();
    let body = [0x2F, 0x68, 0x12, 0x00, 0x85, 0x90, 0x00];
    let air = encode_burst(&config, &seal(&body)).unwrap();

    // The receiver swallows lead-in and sync word
    let messages = decode_messages(&config, &air[6..]).unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].as_ref(), &body);
}
