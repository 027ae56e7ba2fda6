//! Tests for the frame accumulator
//!
//! These tests verify:
//! - Valid frames complete on their last byte
//! - Corrupt frames are dropped and the receiver goes back to Idle
//! - Partial frames are abandoned after the inter-byte timeout
//! - Oversized input is discarded
//! - Back-to-back frames are separated correctly

use std::time::{Duration, Instant};

use rtumaster::protocol::{build_frame, build_simple_frame, crc16};
use rtumaster::receiver::{AcceptOutcome, Accumulator, ReceiverState};
use rtumaster::{Config, FrameError, ResponseRecord};

// =============================================================================
// Helper Functions
// =============================================================================

const TIMEOUT: Duration = Duration::from_millis(10);

fn accumulator() -> Accumulator {
    Accumulator::new(TIMEOUT, 256)
}

/// Feed all bytes at `now`, collecting completed records
fn feed(acc: &mut Accumulator, bytes: &[u8], now: Instant) -> (Vec<ResponseRecord>, Vec<FrameError>) {
    let mut records = Vec::new();
    let mut dropped = Vec::new();
    for &b in bytes {
        match acc.accept_byte_at(b, now) {
            AcceptOutcome::Pending => {}
            AcceptOutcome::Complete(record) => records.push(record),
            AcceptOutcome::Dropped(err) => dropped.push(err),
        }
    }
    (records, dropped)
}

// =============================================================================
// Completion Tests
// =============================================================================

#[test]
fn test_valid_frame_resolves_to_idle() {
    let mut acc = accumulator();
    let frame = build_simple_frame(0x01, 0x06, 0x2000, 0x0008);

    let (records, dropped) = feed(&mut acc, frame.as_bytes(), Instant::now());

    assert_eq!(records.len(), 1);
    assert!(dropped.is_empty());
    assert_eq!(records[0].peer_address, 0x01);
    assert_eq!(records[0].function, 0x06);
    assert_eq!(acc.state(), ReceiverState::Idle);
}

#[test]
fn test_read_response_uses_byte_count() {
    let mut acc = accumulator();
    let raw = build_frame(0x01, 0x03, &[0x04, 0x00, 0x01, 0x00, 0x02]).unwrap();
    let now = Instant::now();

    let bytes = raw.as_bytes();
    let (records, _) = feed(&mut acc, &bytes[..bytes.len() - 1], now);
    assert!(records.is_empty());
    assert_eq!(acc.expected_len(), Some(9));

    let (records, _) = feed(&mut acc, &bytes[bytes.len() - 1..], now);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].registers(), vec![1, 2]);
}

#[test]
fn test_back_to_back_frames() {
    let mut acc = accumulator();
    let first = build_simple_frame(0x01, 0x06, 0x2000, 0x0008);
    let second = build_simple_frame(0x02, 0x06, 0x2000, 0x0004);

    let mut stream = first.as_bytes().to_vec();
    stream.extend_from_slice(second.as_bytes());

    let (records, dropped) = feed(&mut acc, &stream, Instant::now());
    assert!(dropped.is_empty());
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].peer_address, 0x01);
    assert_eq!(records[1].peer_address, 0x02);
}

#[test]
fn test_exception_frame() {
    let mut acc = accumulator();
    let (records, _) = feed(&mut acc, &[0x01, 0x86, 0x01, 0x83, 0xA0], Instant::now());

    assert_eq!(records.len(), 1);
    assert!(records[0].is_error);
    assert_eq!(records[0].function, 0x06);
    assert_eq!(records[0].error_code, 0x01);
}

#[test]
fn test_unknown_function_completes_on_crc() {
    let mut acc = accumulator();
    let body = [0x07, 0x41, 0x10, 0x20, 0x30];
    let mut raw = body.to_vec();
    raw.extend_from_slice(&crc16(&body).to_le_bytes());

    let (records, dropped) = feed(&mut acc, &raw, Instant::now());
    assert!(dropped.is_empty());
    assert_eq!(records.len(), 1);
    assert_eq!(&records[0].data[..], &[0x10, 0x20, 0x30]);
}

// =============================================================================
// Corruption Tests
// =============================================================================

#[test]
fn test_corrupted_last_byte_dropped() {
    let mut acc = accumulator();
    let mut raw = build_simple_frame(0x01, 0x06, 0x2000, 0x0008).as_bytes().to_vec();
    raw[7] ^= 0x01;

    let (records, dropped) = feed(&mut acc, &raw, Instant::now());

    assert!(records.is_empty());
    assert_eq!(dropped.len(), 1);
    assert!(matches!(dropped[0], FrameError::ChecksumMismatch { .. }));
    assert_eq!(acc.state(), ReceiverState::Idle);
}

#[test]
fn test_recovers_after_corrupt_frame() {
    let mut acc = accumulator();
    let mut bad = build_simple_frame(0x01, 0x06, 0x2000, 0x0008).as_bytes().to_vec();
    bad[3] ^= 0x40;
    let good = build_simple_frame(0x01, 0x06, 0x2000, 0x0009);

    let now = Instant::now();
    feed(&mut acc, &bad, now);
    let (records, dropped) = feed(&mut acc, good.as_bytes(), now);

    assert!(dropped.is_empty());
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].registers(), vec![0x2000, 0x0009]);
}

#[test]
fn test_oversized_noise_discarded() {
    let mut acc = Accumulator::new(TIMEOUT, 16);
    // Function 0x03 with byte count 0xFF: hinted length far above the limit
    let mut noise = vec![0x01, 0x03, 0xFF];
    noise.extend(std::iter::repeat(0xAA).take(14));

    let (records, dropped) = feed(&mut acc, &noise, Instant::now());

    assert!(records.is_empty());
    assert_eq!(dropped, vec![FrameError::FrameTooLarge { len: 17, max: 16 }]);
    assert_eq!(acc.state(), ReceiverState::Idle);
}

// =============================================================================
// Timeout Tests
// =============================================================================

#[test]
fn test_partial_frame_abandoned_after_timeout() {
    let mut acc = accumulator();
    let frame = build_simple_frame(0x01, 0x06, 0x2000, 0x0008);
    let start = Instant::now();

    feed(&mut acc, &frame.as_bytes()[..5], start);
    assert_eq!(acc.state(), ReceiverState::Collecting { len: 5 });

    assert!(acc.tick_at(start + TIMEOUT + Duration::from_millis(1)));
    assert_eq!(acc.state(), ReceiverState::Idle);
}

#[test]
fn test_fresh_frame_after_timeout() {
    let mut acc = accumulator();
    let frame = build_simple_frame(0x01, 0x06, 0x2000, 0x0008);
    let start = Instant::now();

    // Truncated frame, then silence
    feed(&mut acc, &frame.as_bytes()[..3], start);
    let later = start + Duration::from_millis(50);
    assert!(acc.tick_at(later));

    let (records, dropped) = feed(&mut acc, frame.as_bytes(), later);
    assert!(dropped.is_empty());
    assert_eq!(records.len(), 1);
}

#[test]
fn test_late_byte_starts_fresh_frame_without_tick() {
    let mut acc = accumulator();
    let frame = build_simple_frame(0x01, 0x06, 0x2000, 0x0008);
    let start = Instant::now();

    feed(&mut acc, &frame.as_bytes()[..3], start);

    // No tick in between: the gap alone must discard the stale bytes
    let later = start + Duration::from_millis(50);
    let (records, dropped) = feed(&mut acc, frame.as_bytes(), later);

    assert!(dropped.is_empty());
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].registers(), vec![0x2000, 0x0008]);
    assert_eq!(acc.state(), ReceiverState::Idle);
}

#[test]
fn test_byte_at_exact_timeout_continues_frame() {
    let mut acc = accumulator();
    let frame = build_simple_frame(0x01, 0x06, 0x2000, 0x0008);
    let start = Instant::now();
    let bytes = frame.as_bytes();

    feed(&mut acc, &bytes[..4], start);
    let (records, dropped) = feed(&mut acc, &bytes[4..], start + TIMEOUT);

    assert!(dropped.is_empty());
    assert_eq!(records.len(), 1);
}

#[test]
fn test_slow_bytes_within_timeout_survive_ticks() {
    let mut acc = accumulator();
    let frame = build_simple_frame(0x01, 0x06, 0x2000, 0x0008);
    let mut now = Instant::now();
    let mut records = Vec::new();

    for &b in frame.as_bytes() {
        assert!(!acc.tick_at(now));
        if let AcceptOutcome::Complete(record) = acc.accept_byte_at(b, now) {
            records.push(record);
        }
        now += Duration::from_millis(8);
        assert!(!acc.tick_at(now));
    }

    assert_eq!(records.len(), 1);
}

#[test]
fn test_always_returns_to_idle_within_one_tick() {
    // Valid, corrupt and truncated inputs all end Idle after one late tick
    let valid = build_simple_frame(0x01, 0x06, 0x2000, 0x0008).as_bytes().to_vec();
    let mut corrupt = valid.clone();
    corrupt[4] ^= 0x80;
    let truncated = valid[..6].to_vec();
    let noise = vec![0x13, 0x37, 0x00];

    for input in [valid, corrupt, truncated, noise] {
        let mut acc = accumulator();
        let start = Instant::now();
        feed(&mut acc, &input, start);
        acc.tick_at(start + TIMEOUT * 2);
        assert_eq!(acc.state(), ReceiverState::Idle, "input {:02X?}", input);
    }
}

#[test]
fn test_from_config_uses_limits() {
    let config = Config::builder().max_frame_size(8).inter_byte_timeout_ms(5).build();
    let mut acc = Accumulator::from_config(&config);
    let start = Instant::now();

    acc.accept_byte_at(0x01, start);
    assert!(!acc.tick_at(start + Duration::from_millis(5)));
    assert!(acc.tick_at(start + Duration::from_millis(6)));
}
