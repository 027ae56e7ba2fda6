//! # rtumaster
//!
//! Master-side engine for a Modbus RTU style request/response protocol on a
//! shared, half-duplex serial bus:
//! - CRC-16 framed requests and responses
//! - Byte-at-a-time frame reassembly with inter-byte timeout recovery
//! - Scoped transmit claims for bus arbitration
//! - Filtered response listeners
//! - Reply timeouts for the outstanding request
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Application                              │
//! │            (requests out, listeners in)                      │
//! └──────────────┬───────────────────────────────▲──────────────┘
//!                │ send_request                  │ dispatch
//! ┌──────────────▼───────────────────────────────┴──────────────┐
//! │                        Engine                                │
//! │         (one lock around receiver + outstanding slot)        │
//! └──────┬──────────────────┬──────────────────────▲────────────┘
//!        │                  │                      │
//!        ▼                  ▼                      │
//!  ┌───────────┐     ┌─────────────┐        ┌─────────────┐
//!  │    Bus    │     │  Transport  │        │ Accumulator │ ◄── accept_byte
//!  │ (claim /  │     │   (write)   │        │  (+ codec)  │ ◄── tick
//!  │  release) │     └─────────────┘        └─────────────┘
//!  └───────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod protocol;
pub mod receiver;
pub mod bus;
pub mod listener;
pub mod diagnostics;
pub mod transport;
pub mod scheduler;
pub mod engine;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{FrameError, MasterError, Result};
pub use config::Config;
pub use engine::Engine;
pub use listener::{ListenerFilter, ListenerId};
pub use protocol::{build_frame, build_simple_frame, parse_frame, Frame, ResponseRecord};
pub use scheduler::TickScheduler;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of rtumaster
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
