//! Frame accumulator
//!
//! Owns the in-progress receive buffer and decides when it is a frame.

use std::time::{Duration, Instant};

use bytes::BytesMut;

use crate::config::Config;
use crate::error::FrameError;
use crate::protocol::{expected_frame_len, hex_dump, parse_frame, ResponseRecord};

use super::ReceiverState;

/// Result of feeding one byte
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AcceptOutcome {
    /// Frame not finished yet
    Pending,

    /// A valid frame was decoded; the buffer is empty again
    Complete(ResponseRecord),

    /// The buffered bytes were thrown away (bad CRC or oversized)
    Dropped(FrameError),
}

/// Byte-at-a-time frame reassembly
///
/// Only `accept_byte_at` grows the buffer. Every resolution path (decoded,
/// dropped, timed out, explicit reset) leaves it empty.
pub struct Accumulator {
    /// Bytes of the current candidate frame
    buffer: BytesMut,

    /// When the last byte was accepted
    last_byte_at: Option<Instant>,

    /// Frame length derived from the header, once known
    expected_len: Option<usize>,

    inter_byte_timeout: Duration,
    max_frame_size: usize,
}

impl Accumulator {
    pub fn new(inter_byte_timeout: Duration, max_frame_size: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(max_frame_size),
            last_byte_at: None,
            expected_len: None,
            inter_byte_timeout,
            max_frame_size,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.inter_byte_timeout(), config.max_frame_size)
    }

    /// Feed one byte received at `now`
    ///
    /// A byte arriving after the inter-byte timeout starts a new frame even
    /// if no tick has run since the previous byte.
    pub fn accept_byte_at(&mut self, byte: u8, now: Instant) -> AcceptOutcome {
        self.tick_at(now);

        if self.buffer.len() >= self.max_frame_size {
            let err = FrameError::FrameTooLarge {
                len: self.buffer.len() + 1,
                max: self.max_frame_size,
            };
            tracing::warn!("Dropping oversized frame: {}", err);
            self.reset();
            return AcceptOutcome::Dropped(err);
        }

        self.buffer.extend_from_slice(&[byte]);
        self.last_byte_at = Some(now);

        if self.expected_len.is_none() {
            self.expected_len = expected_frame_len(&self.buffer);
        }

        // Known length not reached yet: nothing to validate
        if let Some(len) = self.expected_len {
            if self.buffer.len() < len {
                return AcceptOutcome::Pending;
            }
        }

        match parse_frame(&self.buffer) {
            Ok(record) => {
                tracing::trace!("Frame complete: {}", hex_dump(&self.buffer));
                self.reset();
                AcceptOutcome::Complete(record)
            }
            Err(FrameError::Incomplete { .. }) => AcceptOutcome::Pending,
            Err(err) => {
                tracing::warn!("Dropping frame {}: {}", hex_dump(&self.buffer), err);
                self.reset();
                AcceptOutcome::Dropped(err)
            }
        }
    }

    /// Abandon a partial frame whose last byte is older than the inter-byte
    /// timeout. Returns true when something was discarded.
    pub fn tick_at(&mut self, now: Instant) -> bool {
        let Some(last) = self.last_byte_at else {
            return false;
        };

        if self.buffer.is_empty() || now.saturating_duration_since(last) <= self.inter_byte_timeout {
            return false;
        }

        tracing::warn!(
            "Parser timeout: discarding {} buffered bytes ({})",
            self.buffer.len(),
            hex_dump(&self.buffer)
        );
        self.reset();
        true
    }

    /// Clear the buffer and return to Idle
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.last_byte_at = None;
        self.expected_len = None;
    }

    pub fn state(&self) -> ReceiverState {
        if self.buffer.is_empty() {
            ReceiverState::Idle
        } else {
            ReceiverState::Collecting {
                len: self.buffer.len(),
            }
        }
    }

    /// Bytes currently buffered
    pub fn buffered(&self) -> &[u8] {
        &self.buffer
    }

    pub fn expected_len(&self) -> Option<usize> {
        self.expected_len
    }
}
