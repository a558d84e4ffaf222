// src/io/error.rs
//
// Error type shared by the byte sources and the line assembler.

use thiserror::Error;

/// Errors raised while opening or reading a byte source.
///
/// Idle polls and hard read failures inside `read_line` are not errors at
/// this level: the assembler recovers them into "no line". Only a source that
/// reports itself disconnected surfaces as `NotConnected`.
#[derive(Debug, Error)]
pub enum IoError {
    /// The source is not connected; no reads were attempted.
    #[error("Not connected")]
    NotConnected,

    /// Failed to open or attach to a device.
    #[error("{device}: connection failed: {message}")]
    Connection { device: String, message: String },

    /// Invalid port or framing configuration.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Underlying I/O error outside the polling path (e.g. opening a capture).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl IoError {
    pub fn connection(device: impl Into<String>, message: impl Into<String>) -> Self {
        IoError::Connection {
            device: device.into(),
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        IoError::Configuration(message.into())
    }
}

impl From<IoError> for String {
    fn from(e: IoError) -> Self {
        e.to_string()
    }
}
