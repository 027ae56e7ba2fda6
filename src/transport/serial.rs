//! Serial port handling
//!
//! Opens the RTU line and runs the reader thread that feeds received bytes
//! into an engine in arrival order.

use std::io::{ErrorKind, Read};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};

use crate::config::Config;
use crate::engine::Engine;
use crate::error::{MasterError, Result};
use crate::protocol::hex_dump;

/// How long one blocking read may wait before the reader re-checks shutdown
const READ_POLL_TIMEOUT: Duration = Duration::from_millis(50);

/// Names of the serial devices present on this machine
pub fn list_ports() -> Result<Vec<String>> {
    let mut names: Vec<String> = serialport::available_ports()?
        .into_iter()
        .map(|info| info.port_name)
        .collect();
    names.sort();
    Ok(names)
}

/// Open the port named in `config` as 8N1 without flow control
pub fn open_port(config: &Config) -> Result<Box<dyn SerialPort>> {
    let name = config
        .port
        .as_deref()
        .ok_or_else(|| MasterError::Config("no serial port configured".to_string()))?;

    let port = serialport::new(name, config.baud_rate)
        .data_bits(DataBits::Eight)
        .parity(Parity::None)
        .stop_bits(StopBits::One)
        .flow_control(FlowControl::None)
        .timeout(READ_POLL_TIMEOUT)
        .open()?;

    tracing::info!("Opened {} at {} baud", name, config.baud_rate);
    Ok(port)
}

/// Background thread pumping port bytes into `Engine::accept`
pub struct SerialReader {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl SerialReader {
    pub fn spawn(mut port: Box<dyn SerialPort>, engine: Arc<Engine>) -> Result<Self> {
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = Arc::clone(&stop);

        let handle = thread::Builder::new()
            .name("rtumaster-rx".to_string())
            .spawn(move || {
                let mut buf = [0u8; 64];
                while !stop_flag.load(Ordering::Relaxed) {
                    match port.read(&mut buf) {
                        Ok(0) => {}
                        Ok(n) => {
                            tracing::trace!("RX {}", hex_dump(&buf[..n]));
                            engine.accept(&buf[..n]);
                        }
                        Err(ref e) if e.kind() == ErrorKind::TimedOut => {}
                        Err(ref e) if e.kind() == ErrorKind::Interrupted => {}
                        Err(e) => {
                            tracing::error!("Serial read failed, reader stopping: {}", e);
                            break;
                        }
                    }
                }
                tracing::debug!("Serial reader exited");
            })?;

        Ok(Self {
            stop,
            handle: Some(handle),
        })
    }

    /// Signal the reader and wait for it to exit
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::error!("Serial reader thread panicked");
            }
        }
    }
}

impl Drop for SerialReader {
    fn drop(&mut self) {
        self.shutdown();
    }
}
