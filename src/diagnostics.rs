//! Diagnostic counters
//!
//! Lock-free tallies of frames and the recoverable faults the engine absorbs.
//! Counting never changes control flow.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Live counters, updated from any thread
#[derive(Debug, Default)]
pub struct Diagnostics {
    frames_sent: AtomicU64,
    frames_received: AtomicU64,
    checksum_failures: AtomicU64,
    oversized_frames: AtomicU64,
    parser_timeouts: AtomicU64,
    busy_rejections: AtomicU64,
    write_failures: AtomicU64,
    reply_timeouts: AtomicU64,
    listener_panics: AtomicU64,
}

/// Point-in-time copy of the counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticsSnapshot {
    pub frames_sent: u64,
    pub frames_received: u64,
    pub checksum_failures: u64,
    pub oversized_frames: u64,
    pub parser_timeouts: u64,
    pub busy_rejections: u64,
    pub write_failures: u64,
    pub reply_timeouts: u64,
    pub listener_panics: u64,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frame_sent(&self) {
        self.frames_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn frame_received(&self) {
        self.frames_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn checksum_failure(&self) {
        self.checksum_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn oversized_frame(&self) {
        self.oversized_frames.fetch_add(1, Ordering::Relaxed);
    }

    pub fn parser_timeout(&self) {
        self.parser_timeouts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn busy_rejection(&self) {
        self.busy_rejections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn write_failure(&self) {
        self.write_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn reply_timeout(&self) {
        self.reply_timeouts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn listener_panics(&self, count: usize) {
        self.listener_panics.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> DiagnosticsSnapshot {
        DiagnosticsSnapshot {
            frames_sent: self.frames_sent.load(Ordering::Relaxed),
            frames_received: self.frames_received.load(Ordering::Relaxed),
            checksum_failures: self.checksum_failures.load(Ordering::Relaxed),
            oversized_frames: self.oversized_frames.load(Ordering::Relaxed),
            parser_timeouts: self.parser_timeouts.load(Ordering::Relaxed),
            busy_rejections: self.busy_rejections.load(Ordering::Relaxed),
            write_failures: self.write_failures.load(Ordering::Relaxed),
            reply_timeouts: self.reply_timeouts.load(Ordering::Relaxed),
            listener_panics: self.listener_panics.load(Ordering::Relaxed),
        }
    }
}
