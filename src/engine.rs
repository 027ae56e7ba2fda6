//! Engine Module
//!
//! The master-side façade that coordinates all components.
//!
//! ## Responsibilities
//! - Build-and-send requests under a bus claim
//! - Feed received bytes through the accumulator and dispatch responses
//! - Age partial frames and the outstanding request on every tick
//! - Count every recoverable fault

use std::time::{Duration, Instant};

use parking_lot::{Mutex, RwLock};

use crate::bus::{BusArbiter, PendingTransmission, TxGuard};
use crate::config::Config;
use crate::diagnostics::{Diagnostics, DiagnosticsSnapshot};
use crate::error::{FrameError, MasterError, Result};
use crate::listener::{self, ListenerFilter, ListenerId, ListenerRegistry};
use crate::protocol::{build_simple_frame, Frame, ResponseRecord};
use crate::receiver::{AcceptOutcome, Accumulator, ReceiverState};
use crate::transport::Transport;

/// The request currently waiting for its reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutstandingRequest {
    pub peer_address: u8,
    pub function: u8,
    pub sent_at: Instant,
}

impl OutstandingRequest {
    /// Whether the reply deadline has passed at `now`
    pub fn is_expired(&self, now: Instant, reply_timeout: Duration) -> bool {
        now.saturating_duration_since(self.sent_at) > reply_timeout
    }
}

/// State mutated by accept, tick and send
struct EngineState {
    receiver: Accumulator,
    outstanding: Option<OutstandingRequest>,
}

/// The master engine
///
/// ## Concurrency Model
///
/// - **State** (accumulator + outstanding request): one `Mutex`; every
///   mutating section of accept/tick/send runs under it
/// - **Bus**: the arbiter's own slot; `send_request` holds a claim for the
///   duration of the transport write
/// - **Listeners**: `RwLock`; dispatch runs on a snapshot of matching
///   callbacks after the state lock is dropped, so callbacks may call back
///   into the engine (e.g. to send the next request)
///
/// Callbacks run on the thread that delivered the final byte. A slow
/// callback delays processing of the bytes after it.
pub struct Engine {
    config: Config,
    state: Mutex<EngineState>,
    bus: BusArbiter,
    listeners: RwLock<ListenerRegistry>,
    transport: Mutex<Box<dyn Transport>>,
    diagnostics: Diagnostics,
}

impl Engine {
    /// Create an engine writing to `transport`
    pub fn new<T>(config: Config, transport: T) -> Result<Self>
    where
        T: Transport + 'static,
    {
        config.validate()?;

        Ok(Self {
            state: Mutex::new(EngineState {
                receiver: Accumulator::from_config(&config),
                outstanding: None,
            }),
            bus: BusArbiter::new(),
            listeners: RwLock::new(ListenerRegistry::new(config.max_listeners)),
            transport: Mutex::new(Box::new(transport)),
            diagnostics: Diagnostics::new(),
            config,
        })
    }

    // =========================================================================
    // Sending
    // =========================================================================

    /// Send one frame: claim the bus, write, release
    ///
    /// Returns `Busy` without writing if the bus is claimed. On a transport
    /// failure the claim is still released and the outstanding slot cleared.
    pub fn send_request(&self, frame: &Frame) -> Result<()> {
        let Some(guard) = self.bus.claim_transmit() else {
            self.diagnostics.busy_rejection();
            tracing::warn!("Bus busy, request to peer {:#04x} rejected", frame.peer_address());
            return Err(MasterError::Busy);
        };

        let result = self.transmit(frame);
        guard.release();
        result
    }

    /// Send one frame under a claim the caller already holds
    ///
    /// The guard stays with the caller, also on failure. Returns `Busy` if
    /// the guard does not hold this engine's bus (e.g. it was force-released).
    pub fn send_with(&self, guard: &TxGuard<'_>, frame: &Frame) -> Result<()> {
        if !self.bus.holds(guard) {
            self.diagnostics.busy_rejection();
            tracing::warn!(
                "Claim {} no longer holds the bus, request to peer {:#04x} rejected",
                guard.claim_id(),
                frame.peer_address()
            );
            return Err(MasterError::Busy);
        }

        self.transmit(frame)
    }

    /// Record the outstanding request and write. Caller holds the bus.
    fn transmit(&self, frame: &Frame) -> Result<()> {
        // Record before writing so a fast reply cannot miss the slot
        {
            let mut state = self.state.lock();
            if let Some(previous) = state.outstanding.take() {
                tracing::debug!(
                    "Replacing unanswered request to peer {:#04x}",
                    previous.peer_address
                );
            }
            state.outstanding = Some(OutstandingRequest {
                peer_address: frame.peer_address(),
                function: frame.function(),
                sent_at: Instant::now(),
            });
        }

        let written = self.transport.lock().write_frame(frame.as_bytes());

        if let Err(e) = written {
            // Still under the claim: no other sender has recorded a request
            self.state.lock().outstanding = None;
            self.diagnostics.write_failure();
            tracing::warn!("Write of {} failed: {}", frame, e);
            return Err(MasterError::TransportWrite(e.to_string()));
        }

        self.diagnostics.frame_sent();
        tracing::debug!("TX {}", frame);
        Ok(())
    }

    /// Build and send the fixed register request
    pub fn send_simple(&self, peer_address: u8, function: u8, register: u16, value: u16) -> Result<()> {
        self.send_request(&build_simple_frame(peer_address, function, register, value))
    }

    /// Claim the bus directly, e.g. to hold it across several exchanges
    /// sent with [`Engine::send_with`]
    pub fn claim_transmit(&self) -> Option<TxGuard<'_>> {
        self.bus.claim_transmit()
    }

    /// Drop any outstanding bus claim
    pub fn release_transmit(&self) {
        self.bus.release_transmit();
    }

    // =========================================================================
    // Receiving
    // =========================================================================

    /// Feed one received byte
    pub fn accept_byte(&self, byte: u8) {
        self.accept_byte_at(byte, Instant::now());
    }

    /// Feed one byte received at `now`
    pub fn accept_byte_at(&self, byte: u8, now: Instant) {
        let record = {
            let mut state = self.state.lock();
            // Stale partial frame from before a silent gap
            if state.receiver.tick_at(now) {
                self.diagnostics.parser_timeout();
            }
            let outcome = state.receiver.accept_byte_at(byte, now);
            self.resolve(&mut state, outcome)
        };

        if let Some(record) = record {
            self.dispatch(&record);
        }
    }

    /// Feed a run of received bytes in order
    pub fn accept(&self, bytes: &[u8]) {
        let now = Instant::now();
        for &byte in bytes {
            self.accept_byte_at(byte, now);
        }
    }

    /// Count the outcome and settle the outstanding request
    fn resolve(&self, state: &mut EngineState, outcome: AcceptOutcome) -> Option<ResponseRecord> {
        match outcome {
            AcceptOutcome::Pending => None,
            AcceptOutcome::Complete(record) => {
                self.diagnostics.frame_received();
                let answered = state
                    .outstanding
                    .as_ref()
                    .is_some_and(|req| req.peer_address == record.peer_address);
                if answered {
                    state.outstanding = None;
                }
                Some(record)
            }
            AcceptOutcome::Dropped(FrameError::ChecksumMismatch { .. }) => {
                self.diagnostics.checksum_failure();
                None
            }
            AcceptOutcome::Dropped(FrameError::FrameTooLarge { .. }) => {
                self.diagnostics.oversized_frame();
                None
            }
            AcceptOutcome::Dropped(_) => None,
        }
    }

    fn dispatch(&self, record: &ResponseRecord) {
        tracing::debug!(
            "RX peer={:#04x} function={:#04x} error={} len={}",
            record.peer_address,
            record.function,
            record.is_error,
            record.data_length()
        );

        let targets = self.listeners.read().matching(record);
        if targets.is_empty() {
            tracing::debug!("Unhandled response, function {:#04x}", record.function);
            return;
        }

        let report = listener::dispatch(&targets, record);
        if report.panicked > 0 {
            self.diagnostics.listener_panics(report.panicked);
        }
    }

    /// Drop any partially received frame
    pub fn reset_parser(&self) {
        self.state.lock().receiver.reset();
    }

    pub fn receiver_state(&self) -> ReceiverState {
        self.state.lock().receiver.state()
    }

    // =========================================================================
    // Time
    // =========================================================================

    /// Periodic timebase hook
    pub fn tick(&self) {
        self.tick_at(Instant::now());
    }

    /// Expire a stale partial frame and an unanswered request as of `now`
    pub fn tick_at(&self, now: Instant) {
        let mut state = self.state.lock();

        if state.receiver.tick_at(now) {
            self.diagnostics.parser_timeout();
        }

        let expired = state
            .outstanding
            .as_ref()
            .is_some_and(|req| req.is_expired(now, self.config.reply_timeout()));
        if expired {
            if let Some(req) = state.outstanding.take() {
                self.diagnostics.reply_timeout();
                tracing::warn!(
                    "No reply from peer {:#04x} to function {:#04x} within {:?}",
                    req.peer_address,
                    req.function,
                    self.config.reply_timeout()
                );
            }
        }
    }

    // =========================================================================
    // Listeners
    // =========================================================================

    /// Register a response callback
    pub fn add_listener<F>(&self, filter: ListenerFilter, callback: F) -> Result<ListenerId>
    where
        F: Fn(&ResponseRecord) + Send + Sync + 'static,
    {
        self.listeners.write().register(filter, callback)
    }

    pub fn remove_listener(&self, id: ListenerId) -> bool {
        self.listeners.write().remove(id)
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.read().len()
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    pub fn outstanding_request(&self) -> Option<OutstandingRequest> {
        self.state.lock().outstanding.clone()
    }

    /// The current bus claim, if any
    pub fn pending_transmission(&self) -> Option<PendingTransmission> {
        self.bus.pending()
    }

    pub fn diagnostics(&self) -> DiagnosticsSnapshot {
        self.diagnostics.snapshot()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}
