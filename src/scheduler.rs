//! Tick Scheduler
//!
//! Drives `Engine::tick` from a dedicated thread at the configured interval,
//! independent of byte arrival, so a stalled line is still noticed.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam::channel::{bounded, select, tick, Sender};

use crate::engine::Engine;
use crate::error::Result;

/// Handle to the running tick thread. Dropping it stops the thread.
pub struct TickScheduler {
    shutdown: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
    interval: Duration,
}

impl TickScheduler {
    /// Start ticking `engine` every `config().tick_interval()`
    pub fn spawn(engine: Arc<Engine>) -> Result<Self> {
        let interval = engine.config().tick_interval();
        Self::spawn_with_interval(engine, interval)
    }

    /// Start ticking `engine` every `interval`
    pub fn spawn_with_interval(engine: Arc<Engine>, interval: Duration) -> Result<Self> {
        let (shutdown_tx, shutdown_rx) = bounded::<()>(1);

        let handle = thread::Builder::new()
            .name("rtumaster-tick".to_string())
            .spawn(move || {
                let ticker = tick(interval);
                loop {
                    select! {
                        recv(ticker) -> msg => match msg {
                            Ok(_) => engine.tick(),
                            Err(_) => break,
                        },
                        recv(shutdown_rx) -> _ => break,
                    }
                }
                tracing::debug!("Tick scheduler exited");
            })?;

        tracing::debug!("Tick scheduler started ({:?} interval)", interval);
        Ok(Self {
            shutdown: Some(shutdown_tx),
            handle: Some(handle),
            interval,
        })
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Stop ticking and wait for the thread to exit
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        // Dropping the sender disconnects the channel and wakes the select
        self.shutdown.take();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::error!("Tick scheduler thread panicked");
            }
        }
    }
}

impl Drop for TickScheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}
