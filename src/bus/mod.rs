//! Bus Module
//!
//! Half-duplex turn management: only one sender may drive the line at a time.
//!
//! ## Claim Lifecycle
//! - `claim_transmit()` hands out a [`TxGuard`] or `None` when the bus is taken
//! - the claim ends when the guard is dropped, released, or when
//!   `release_transmit()` is called
//! - releasing an unclaimed bus is a no-op

mod arbiter;

pub use arbiter::{BusArbiter, PendingTransmission, TxGuard};
