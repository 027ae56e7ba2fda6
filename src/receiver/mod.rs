//! Receiver Module
//!
//! Reassembles frames from the byte stream, one byte at a time.
//!
//! ## States
//! ```text
//!            byte                      frame resolved / dropped
//!   ┌──────┐ ────────► ┌────────────┐ ─────────────────────────► Idle
//!   │ Idle │           │ Collecting │
//!   └──────┘ ◄──────── └────────────┘
//!         inter-byte timeout (tick)
//! ```
//! A frame is resolved when the codec accepts it, dropped on CRC mismatch or
//! when it grows past the configured maximum size.

mod accumulator;

pub use accumulator::{AcceptOutcome, Accumulator};

/// Observable receiver state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiverState {
    /// No bytes buffered
    Idle,

    /// Part of a frame is buffered
    Collecting { len: usize },
}
