//! Error types for rtumaster
//!
//! Provides a unified error type for engine operations and a codec-level
//! error for frame validation.

use thiserror::Error;

/// Result type alias using MasterError
pub type Result<T> = std::result::Result<T, MasterError>;

/// Unified error type for rtumaster operations
#[derive(Debug, Error)]
pub enum MasterError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Bus Errors
    // -------------------------------------------------------------------------
    /// Another sender currently holds the transmit claim
    #[error("Bus busy: transmit already claimed")]
    Busy,

    /// The transport rejected the write; the transmit claim was released
    #[error("Transport write failed: {0}")]
    TransportWrite(String),

    #[error("Serial port error: {0}")]
    Serial(String),

    // -------------------------------------------------------------------------
    // Protocol Errors
    // -------------------------------------------------------------------------
    #[error("Frame error: {0}")]
    Frame(#[from] FrameError),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<serialport::Error> for MasterError {
    fn from(e: serialport::Error) -> Self {
        MasterError::Serial(e.to_string())
    }
}

/// Frame-level validation errors
///
/// Only `InvalidInput` is a caller mistake; the rest are normal outcomes of
/// reading a noisy line and never fatal to the engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    /// Not enough bytes yet; keep collecting
    #[error("Incomplete frame: need {needed} bytes, got {got}")]
    Incomplete { needed: usize, got: usize },

    #[error("CRC mismatch: expected {expected:#06x}, got {actual:#06x}")]
    ChecksumMismatch { expected: u16, actual: u16 },

    #[error("Frame too large: {len} bytes (max {max})")]
    FrameTooLarge { len: usize, max: usize },

    #[error("Invalid frame input: {0}")]
    InvalidInput(String),
}
