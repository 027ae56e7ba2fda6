//! Response definitions
//!
//! The decoded form of a frame received from a peer.

use bytes::Bytes;

/// A validated response, handed to listeners
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseRecord {
    /// Address of the answering peer
    pub peer_address: u8,

    /// Function code with the exception bit cleared
    pub function: u8,

    /// Set when the peer answered with an exception
    pub is_error: bool,

    /// Exception code; zero unless `is_error`
    pub error_code: u8,

    /// Response data (empty for exceptions)
    pub data: Bytes,
}

impl ResponseRecord {
    /// Create a normal response
    pub fn ok(peer_address: u8, function: u8, data: Bytes) -> Self {
        Self {
            peer_address,
            function,
            is_error: false,
            error_code: 0,
            data,
        }
    }

    /// Create an exception response
    pub fn exception(peer_address: u8, function: u8, error_code: u8) -> Self {
        Self {
            peer_address,
            function,
            is_error: true,
            error_code,
            data: Bytes::new(),
        }
    }

    pub fn data_length(&self) -> usize {
        self.data.len()
    }

    /// Interpret the data block as big-endian 16-bit registers.
    /// A trailing odd byte is ignored.
    pub fn registers(&self) -> Vec<u16> {
        self.data
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect()
    }
}
