//! Protocol Module
//!
//! Defines the RTU wire format spoken between the master and its peers.
//!
//! ## Frame Format
//! ```text
//! ┌──────────┬──────────┬─────────────────────────────┬──────────────┐
//! │ Addr (1) │ Func (1) │           Payload           │ CRC (2, LE)  │
//! └──────────┴──────────┴─────────────────────────────┴──────────────┘
//! ```
//! The CRC is CRC-16/MODBUS (reflected polynomial 0xA001, init 0xFFFF)
//! over address, function and payload, sent low byte first.
//!
//! ### Simple Request (8 bytes)
//! ```text
//! ┌──────────┬──────────┬──────────────┬──────────────┬──────────┐
//! │ Addr (1) │ Func (1) │ Register (2) │  Value (2)   │ CRC (2)  │
//! └──────────┴──────────┴──────────────┴──────────────┴──────────┘
//! ```
//! Register and value are big-endian.
//!
//! ### Response Layouts
//! - 0x01..=0x04 (reads): addr + func + byte_count + data + CRC
//! - 0x05, 0x06, 0x0F, 0x10 (writes): 8-byte echo
//! - func | 0x80 (exception): addr + func + exception code + CRC
//! - anything else: complete once the trailing CRC validates

mod crc;
mod frame;
mod response;
mod codec;

pub use crc::{crc16, Crc16};
pub use frame::{hex_dump, Frame, FunctionCode};
pub use response::ResponseRecord;
pub use codec::{build_frame, build_simple_frame, expected_frame_len, parse_frame};

/// Smallest frame on the wire: address + function + CRC
pub const MIN_FRAME_SIZE: usize = 4;

/// Length of a simple register request (and of a write echo)
pub const SIMPLE_FRAME_LEN: usize = 8;

/// Length of an exception response
pub const EXCEPTION_FRAME_LEN: usize = 5;

/// Largest RTU application data unit
pub const MAX_ADU_SIZE: usize = 256;

/// Function code bit that marks an exception response
pub const EXCEPTION_FLAG: u8 = 0x80;

/// Size of the trailing checksum
pub const CRC_SIZE: usize = 2;
