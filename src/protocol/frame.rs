//! Frame definitions
//!
//! An encoded protocol message, ready for the wire.

use std::fmt;

use bytes::Bytes;

use super::CRC_SIZE;

/// Standard function codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum FunctionCode {
    ReadCoils = 0x01,
    ReadDiscreteInputs = 0x02,
    ReadHoldingRegisters = 0x03,
    ReadInputRegisters = 0x04,
    WriteSingleCoil = 0x05,
    WriteSingleRegister = 0x06,
    WriteMultipleCoils = 0x0F,
    WriteMultipleRegisters = 0x10,
}

impl FunctionCode {
    pub fn from_u8(code: u8) -> Option<Self> {
        match code {
            0x01 => Some(FunctionCode::ReadCoils),
            0x02 => Some(FunctionCode::ReadDiscreteInputs),
            0x03 => Some(FunctionCode::ReadHoldingRegisters),
            0x04 => Some(FunctionCode::ReadInputRegisters),
            0x05 => Some(FunctionCode::WriteSingleCoil),
            0x06 => Some(FunctionCode::WriteSingleRegister),
            0x0F => Some(FunctionCode::WriteMultipleCoils),
            0x10 => Some(FunctionCode::WriteMultipleRegisters),
            _ => None,
        }
    }

    /// Whether the response carries a byte-count prefixed data block
    pub fn is_read(self) -> bool {
        matches!(
            self,
            FunctionCode::ReadCoils
                | FunctionCode::ReadDiscreteInputs
                | FunctionCode::ReadHoldingRegisters
                | FunctionCode::ReadInputRegisters
        )
    }
}

/// One encoded frame: address, function, payload and trailing CRC
///
/// Only the codec constructs frames, so the checksum always matches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    bytes: Bytes,
}

impl Frame {
    pub(crate) fn from_encoded(bytes: Bytes) -> Self {
        Self { bytes }
    }

    pub fn peer_address(&self) -> u8 {
        self.bytes[0]
    }

    pub fn function(&self) -> u8 {
        self.bytes[1]
    }

    /// Bytes between the function code and the CRC
    pub fn payload(&self) -> &[u8] {
        &self.bytes[2..self.bytes.len() - CRC_SIZE]
    }

    /// The CRC as transmitted (little-endian on the wire)
    pub fn checksum(&self) -> u16 {
        let n = self.bytes.len();
        u16::from_le_bytes([self.bytes[n - 2], self.bytes[n - 1]])
    }

    /// The complete frame as it goes on the wire
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Cheap clone of the underlying buffer
    pub fn to_bytes(&self) -> Bytes {
        self.bytes.clone()
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn hex(&self) -> String {
        hex_dump(&self.bytes)
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.hex())
    }
}

/// Space separated upper-case hex, e.g. `01 06 20 00`
pub fn hex_dump(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 3);
    for (i, b) in bytes.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        out.push_str(&format!("{:02X}", b));
    }
    out
}
