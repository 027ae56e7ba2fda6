//! Listener Module
//!
//! Fan-out of decoded responses to application callbacks.
//!
//! ## Dispatch Rules
//! - Callbacks run synchronously, in registration order
//! - Only registrations whose filter matches the record are invoked
//! - A panicking callback is contained; the rest still run
//! - Records are borrowed, never retained

mod registry;

pub use registry::{dispatch, DispatchReport, Listener, ListenerFilter, ListenerId, ListenerRegistry};
