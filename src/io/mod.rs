// src/io/mod.rs
//
// Byte sources and line framing.
//
// A byte source is polled one byte at a time and may answer with a byte, a
// timeout (nothing available yet) or a hard error. The line assembler in
// `framer` turns that into complete logical lines. Platform details such as
// handles vs descriptors stay inside the source implementations.

pub mod error;
pub mod framer;
pub mod replay;
pub mod serial;
pub mod sim;

pub use error::IoError;
pub use framer::{FramingConfig, Line, LineAssembler, LineEnd};
pub use replay::ReplaySource;
pub use sim::ScriptedSource;

// ============================================================================
// Byte Source
// ============================================================================

/// Result of a single poll on a byte source.
#[derive(Debug)]
pub enum Poll {
    /// One byte was read.
    Byte(u8),
    /// Nothing arrived within the source's per-poll wait.
    Timeout,
    /// Hard read failure, distinct from a timeout.
    Error(std::io::Error),
}

/// A byte-at-a-time, possibly silent channel.
///
/// The connection flag belongs to the implementation. The line assembler only
/// reads it (once per `read_line`) and refuses work when it is false.
pub trait ByteSource {
    /// Poll for the next byte. Must not block longer than the source's own
    /// per-poll timeout.
    fn poll_byte(&mut self) -> Poll;

    /// Whether the channel is currently usable.
    fn is_connected(&self) -> bool;

    /// Human readable name used in log lines, e.g. `serial(/dev/ttyUSB0)`.
    fn describe(&self) -> String {
        "source".to_string()
    }
}

impl<S: ByteSource + ?Sized> ByteSource for Box<S> {
    fn poll_byte(&mut self) -> Poll {
        (**self).poll_byte()
    }

    fn is_connected(&self) -> bool {
        (**self).is_connected()
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}
