//! Protocol codec
//!
//! Pure encoding and decoding functions for the RTU wire format.
//!
//! ## Completion Rules
//! A received buffer is complete when it reaches the length implied by its
//! header (see [`expected_frame_len`]). Function codes without a known layout
//! are complete as soon as the trailing two bytes are a valid CRC of the rest.

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::FrameError;

use super::{
    crc16, Frame, FunctionCode, ResponseRecord, CRC_SIZE, EXCEPTION_FLAG, EXCEPTION_FRAME_LEN,
    MAX_ADU_SIZE, MIN_FRAME_SIZE, SIMPLE_FRAME_LEN,
};

// =============================================================================
// Frame Building
// =============================================================================

/// Build the fixed 8-byte request: address, function, register, value, CRC
///
/// Register and value go out big-endian, the CRC little-endian.
pub fn build_simple_frame(peer_address: u8, function: u8, register: u16, value: u16) -> Frame {
    let mut buf = BytesMut::with_capacity(SIMPLE_FRAME_LEN);
    buf.put_u8(peer_address);
    buf.put_u8(function);
    buf.put_u16(register);
    buf.put_u16(value);
    seal(buf)
}

/// Build a frame with an arbitrary payload
pub fn build_frame(peer_address: u8, function: u8, payload: &[u8]) -> Result<Frame, FrameError> {
    let total_len = 2 + payload.len() + CRC_SIZE;
    if total_len > MAX_ADU_SIZE {
        return Err(FrameError::InvalidInput(format!(
            "payload of {} bytes exceeds frame limit of {} bytes",
            payload.len(),
            MAX_ADU_SIZE
        )));
    }

    let mut buf = BytesMut::with_capacity(total_len);
    buf.put_u8(peer_address);
    buf.put_u8(function);
    buf.put_slice(payload);
    Ok(seal(buf))
}

/// Append the CRC and freeze
fn seal(mut buf: BytesMut) -> Frame {
    let crc = crc16(&buf);
    buf.put_u16_le(crc);
    Frame::from_encoded(buf.freeze())
}

// =============================================================================
// Frame Parsing
// =============================================================================

/// Total frame length implied by the header bytes seen so far
///
/// Returns `None` when the header is too short to tell, or when the function
/// code has no fixed layout.
pub fn expected_frame_len(header: &[u8]) -> Option<usize> {
    let function = *header.get(1)?;

    if function & EXCEPTION_FLAG != 0 {
        return Some(EXCEPTION_FRAME_LEN);
    }

    match FunctionCode::from_u8(function)? {
        code if code.is_read() => {
            let byte_count = *header.get(2)? as usize;
            Some(3 + byte_count + CRC_SIZE)
        }
        _ => Some(SIMPLE_FRAME_LEN),
    }
}

/// Validate and decode a received buffer
///
/// - fewer bytes than the frame needs: `Incomplete`
/// - length reached but the CRC is wrong: `ChecksumMismatch`
/// - otherwise the decoded record; bytes past the frame end are ignored
pub fn parse_frame(raw: &[u8]) -> Result<ResponseRecord, FrameError> {
    if raw.len() < MIN_FRAME_SIZE {
        return Err(FrameError::Incomplete {
            needed: MIN_FRAME_SIZE,
            got: raw.len(),
        });
    }

    match expected_frame_len(raw) {
        Some(len) => {
            if raw.len() < len {
                return Err(FrameError::Incomplete {
                    needed: len,
                    got: raw.len(),
                });
            }
            let frame = &raw[..len];
            verify_crc(frame)?;
            Ok(decode_body(frame))
        }
        None => {
            // No layout to go by: keep reading until the CRC checks out
            if verify_crc(raw).is_ok() {
                Ok(decode_body(raw))
            } else {
                Err(FrameError::Incomplete {
                    needed: raw.len() + 1,
                    got: raw.len(),
                })
            }
        }
    }
}

/// Compare the trailing CRC against one computed over everything before it
fn verify_crc(frame: &[u8]) -> Result<(), FrameError> {
    let body_end = frame.len() - CRC_SIZE;
    let expected = crc16(&frame[..body_end]);
    let actual = u16::from_le_bytes([frame[body_end], frame[body_end + 1]]);

    if expected != actual {
        return Err(FrameError::ChecksumMismatch { expected, actual });
    }
    Ok(())
}

/// Split a CRC-checked frame into a response record
fn decode_body(frame: &[u8]) -> ResponseRecord {
    let peer_address = frame[0];
    let function = frame[1];
    let body = &frame[2..frame.len() - CRC_SIZE];

    if function & EXCEPTION_FLAG != 0 {
        let error_code = body.first().copied().unwrap_or(0);
        return ResponseRecord::exception(peer_address, function & !EXCEPTION_FLAG, error_code);
    }

    let data = match FunctionCode::from_u8(function) {
        // Skip the byte-count prefix
        Some(code) if code.is_read() => &body[1..],
        _ => body,
    };

    ResponseRecord::ok(peer_address, function, Bytes::copy_from_slice(data))
}
