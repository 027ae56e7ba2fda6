//! Configuration for rtumaster
//!
//! Centralized configuration with sensible defaults. Timeouts are stored in
//! milliseconds so config files stay readable; accessors hand out `Duration`s.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{MasterError, Result};
use crate::protocol::{MAX_ADU_SIZE, SIMPLE_FRAME_LEN};

/// Main configuration for an engine instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Receiver Configuration
    // -------------------------------------------------------------------------
    /// Max silence between two bytes of one frame before the partial frame
    /// is dropped (milliseconds)
    pub inter_byte_timeout_ms: u64,

    /// Largest frame the receiver will buffer (bytes)
    pub max_frame_size: usize,

    // -------------------------------------------------------------------------
    // Request Configuration
    // -------------------------------------------------------------------------
    /// How long an outstanding request waits for its reply (milliseconds)
    pub reply_timeout_ms: u64,

    // -------------------------------------------------------------------------
    // Scheduler Configuration
    // -------------------------------------------------------------------------
    /// Period of the tick driver (milliseconds)
    pub tick_interval_ms: u64,

    // -------------------------------------------------------------------------
    // Listener Configuration
    // -------------------------------------------------------------------------
    /// Max number of registered listeners
    pub max_listeners: usize,

    // -------------------------------------------------------------------------
    // Serial Configuration (used by the binary only)
    // -------------------------------------------------------------------------
    /// Serial device, e.g. "/dev/ttyUSB0" or "COM3"
    pub port: Option<String>,

    /// Line speed
    pub baud_rate: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            inter_byte_timeout_ms: 10,
            max_frame_size: MAX_ADU_SIZE,
            reply_timeout_ms: 100,
            tick_interval_ms: 1,
            max_listeners: 16,
            port: None,
            baud_rate: 19200,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Load a JSON config file. Missing fields fall back to defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&text).map_err(|e| {
            MasterError::Config(format!("{}: {}", path.display(), e))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the engine cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.inter_byte_timeout_ms == 0 {
            return Err(MasterError::Config(
                "inter_byte_timeout_ms must be greater than zero".to_string(),
            ));
        }
        if self.reply_timeout_ms == 0 {
            return Err(MasterError::Config(
                "reply_timeout_ms must be greater than zero".to_string(),
            ));
        }
        if self.tick_interval_ms == 0 {
            return Err(MasterError::Config(
                "tick_interval_ms must be greater than zero".to_string(),
            ));
        }
        // Smaller limits could never hold a write echo
        if self.max_frame_size < SIMPLE_FRAME_LEN {
            return Err(MasterError::Config(format!(
                "max_frame_size must be at least {} bytes, got {}",
                SIMPLE_FRAME_LEN, self.max_frame_size
            )));
        }
        if self.max_listeners == 0 {
            return Err(MasterError::Config(
                "max_listeners must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn inter_byte_timeout(&self) -> Duration {
        Duration::from_millis(self.inter_byte_timeout_ms)
    }

    pub fn reply_timeout(&self) -> Duration {
        Duration::from_millis(self.reply_timeout_ms)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the inter-byte timeout (in milliseconds)
    pub fn inter_byte_timeout_ms(mut self, ms: u64) -> Self {
        self.config.inter_byte_timeout_ms = ms;
        self
    }

    /// Set the maximum buffered frame size (in bytes)
    pub fn max_frame_size(mut self, size: usize) -> Self {
        self.config.max_frame_size = size;
        self
    }

    /// Set the reply timeout (in milliseconds)
    pub fn reply_timeout_ms(mut self, ms: u64) -> Self {
        self.config.reply_timeout_ms = ms;
        self
    }

    /// Set the tick period (in milliseconds)
    pub fn tick_interval_ms(mut self, ms: u64) -> Self {
        self.config.tick_interval_ms = ms;
        self
    }

    /// Set the listener registry capacity
    pub fn max_listeners(mut self, count: usize) -> Self {
        self.config.max_listeners = count;
        self
    }

    /// Set the serial device name
    pub fn port(mut self, port: impl Into<String>) -> Self {
        self.config.port = Some(port.into());
        self
    }

    /// Set the serial line speed
    pub fn baud_rate(mut self, baud: u32) -> Self {
        self.config.baud_rate = baud;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
