//! Bus arbiter
//!
//! Mutex-guarded transmit slot with a scoped release guard.

use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::{self, ThreadId};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

/// The single in-flight bus turn
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingTransmission {
    /// Distinguishes successive claims
    pub claim_id: u64,

    /// Thread that took the claim
    pub owner: ThreadId,

    pub acquired_at: Instant,
}

impl PendingTransmission {
    /// How long the claim has been held at `now`
    pub fn held_for(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.acquired_at)
    }
}

/// Grants exclusive transmit rights
///
/// ## Concurrency:
/// - `slot`: Protected by Mutex; `Some` while a claim is outstanding
/// - `released`: Wakes senders blocked in `claim_transmit_timeout`
pub struct BusArbiter {
    slot: Mutex<Option<PendingTransmission>>,
    released: Condvar,
    next_claim_id: AtomicU64,
}

impl BusArbiter {
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(None),
            released: Condvar::new(),
            next_claim_id: AtomicU64::new(1),
        }
    }

    /// Try to take the bus without waiting
    pub fn claim_transmit(&self) -> Option<TxGuard<'_>> {
        let mut slot = self.slot.lock();
        if slot.is_some() {
            return None;
        }
        Some(self.grant(&mut slot))
    }

    /// Take the bus, waiting up to `timeout` for the current holder to release
    pub fn claim_transmit_timeout(&self, timeout: Duration) -> Option<TxGuard<'_>> {
        let deadline = Instant::now() + timeout;
        let mut slot = self.slot.lock();

        while slot.is_some() {
            if self.released.wait_until(&mut slot, deadline).timed_out() {
                if slot.is_some() {
                    return None;
                }
                break;
            }
        }

        Some(self.grant(&mut slot))
    }

    fn grant(&self, slot: &mut Option<PendingTransmission>) -> TxGuard<'_> {
        let claim_id = self.next_claim_id.fetch_add(1, Ordering::Relaxed);
        *slot = Some(PendingTransmission {
            claim_id,
            owner: thread::current().id(),
            acquired_at: Instant::now(),
        });
        tracing::trace!("Bus claimed (claim {})", claim_id);

        TxGuard {
            arbiter: self,
            claim_id,
        }
    }

    /// Release whatever claim is outstanding
    pub fn release_transmit(&self) {
        let mut slot = self.slot.lock();
        if let Some(pending) = slot.take() {
            tracing::trace!("Bus released (claim {})", pending.claim_id);
            self.released.notify_one();
        }
    }

    /// Release only if `claim_id` still holds the bus
    fn release_claim(&self, claim_id: u64) {
        let mut slot = self.slot.lock();
        if slot.as_ref().map(|p| p.claim_id) == Some(claim_id) {
            *slot = None;
            tracing::trace!("Bus released (claim {})", claim_id);
            self.released.notify_one();
        }
    }

    /// Whether `guard` was issued by this arbiter and still holds the bus
    pub fn holds(&self, guard: &TxGuard<'_>) -> bool {
        std::ptr::eq(guard.arbiter, self)
            && self.slot.lock().as_ref().map(|p| p.claim_id) == Some(guard.claim_id)
    }

    pub fn is_claimed(&self) -> bool {
        self.slot.lock().is_some()
    }

    /// Snapshot of the outstanding claim
    pub fn pending(&self) -> Option<PendingTransmission> {
        self.slot.lock().clone()
    }
}

impl Default for BusArbiter {
    fn default() -> Self {
        Self::new()
    }
}

/// Scoped transmit claim; dropping it releases the bus
///
/// A guard whose claim was already force-released by `release_transmit`
/// leaves any newer claim alone.
#[must_use = "the bus is released as soon as the guard is dropped"]
pub struct TxGuard<'a> {
    arbiter: &'a BusArbiter,
    claim_id: u64,
}

impl TxGuard<'_> {
    pub fn claim_id(&self) -> u64 {
        self.claim_id
    }

    /// Release now instead of at scope exit
    pub fn release(self) {
        drop(self);
    }
}

impl Drop for TxGuard<'_> {
    fn drop(&mut self) {
        self.arbiter.release_claim(self.claim_id);
    }
}

impl std::fmt::Debug for TxGuard<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TxGuard")
            .field("claim_id", &self.claim_id)
            .finish()
    }
}
