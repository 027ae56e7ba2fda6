//! Listener registry
//!
//! Ordered, bounded set of filtered callbacks.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use crate::error::{MasterError, Result};
use crate::protocol::ResponseRecord;

/// A response callback
pub type Listener = Arc<dyn Fn(&ResponseRecord) + Send + Sync>;

/// Handle returned by `register`, used for removal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Which responses a listener wants
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerFilter {
    /// Every response
    All,

    /// Responses for one function code (normal or exception)
    Function(u8),

    /// Responses from one peer
    Peer(u8),

    /// Responses from one peer for one function code
    PeerFunction { peer: u8, function: u8 },

    /// Exception responses only
    Errors,
}

impl ListenerFilter {
    pub fn matches(&self, record: &ResponseRecord) -> bool {
        match *self {
            ListenerFilter::All => true,
            ListenerFilter::Function(function) => record.function == function,
            ListenerFilter::Peer(peer) => record.peer_address == peer,
            ListenerFilter::PeerFunction { peer, function } => {
                record.peer_address == peer && record.function == function
            }
            ListenerFilter::Errors => record.is_error,
        }
    }
}

struct Registration {
    id: ListenerId,
    filter: ListenerFilter,
    callback: Listener,
}

/// Outcome of one dispatch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Callbacks that ran to completion
    pub invoked: usize,

    /// Callbacks that panicked
    pub panicked: usize,
}

/// Registered listeners, kept in registration order
pub struct ListenerRegistry {
    registrations: Vec<Registration>,
    next_id: u64,
    capacity: usize,
}

impl ListenerRegistry {
    pub fn new(capacity: usize) -> Self {
        Self {
            registrations: Vec::new(),
            next_id: 1,
            capacity,
        }
    }

    /// Add a listener behind `filter`
    pub fn register<F>(&mut self, filter: ListenerFilter, callback: F) -> Result<ListenerId>
    where
        F: Fn(&ResponseRecord) + Send + Sync + 'static,
    {
        if self.registrations.len() >= self.capacity {
            return Err(MasterError::Config(format!(
                "listener limit of {} reached",
                self.capacity
            )));
        }

        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.registrations.push(Registration {
            id,
            filter,
            callback: Arc::new(callback),
        });

        tracing::debug!("Registered listener {:?} with filter {:?}", id, filter);
        Ok(id)
    }

    /// Remove a listener. Returns false if it was not registered.
    pub fn remove(&mut self, id: ListenerId) -> bool {
        let before = self.registrations.len();
        self.registrations.retain(|r| r.id != id);
        let removed = self.registrations.len() != before;

        if !removed {
            tracing::debug!("Listener {:?} to remove not found", id);
        }
        removed
    }

    /// Callbacks whose filter accepts `record`, in registration order
    pub fn matching(&self, record: &ResponseRecord) -> Vec<Listener> {
        self.registrations
            .iter()
            .filter(|r| r.filter.matches(record))
            .map(|r| Arc::clone(&r.callback))
            .collect()
    }

    /// Invoke every matching listener
    pub fn dispatch(&self, record: &ResponseRecord) -> DispatchReport {
        dispatch(&self.matching(record), record)
    }

    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }
}

/// Run `listeners` against `record`, containing panics
pub fn dispatch(listeners: &[Listener], record: &ResponseRecord) -> DispatchReport {
    let mut report = DispatchReport::default();

    for listener in listeners {
        match panic::catch_unwind(AssertUnwindSafe(|| (**listener)(record))) {
            Ok(()) => report.invoked += 1,
            Err(_) => {
                report.panicked += 1;
                tracing::error!(
                    "Listener panicked handling response from peer {:#04x}, function {:#04x}",
                    record.peer_address,
                    record.function
                );
            }
        }
    }

    report
}
