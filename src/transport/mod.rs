//! Transport Module
//!
//! The byte-stream boundary around the engine.
//!
//! ## Responsibilities
//! - `Transport`: how the engine writes frames (anything `io::Write`)
//! - `serial`: opening a port and pumping received bytes into an engine

pub mod serial;

use std::io::{self, Write};

/// Ordered byte sink for outgoing frames
pub trait Transport: Send {
    /// Write the whole frame or fail
    fn write_frame(&mut self, bytes: &[u8]) -> io::Result<()>;
}

impl<W: Write + Send> Transport for W {
    fn write_frame(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.write_all(bytes)?;
        self.flush()
    }
}
