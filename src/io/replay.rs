// src/io/replay.rs
//
// Replays a recorded byte capture (file or stdin) as a byte source.

use std::fs::File;
use std::io::{BufReader, ErrorKind, Read};
use std::path::Path;

use super::{ByteSource, IoError, Poll};

/// Byte source backed by any reader.
///
/// End of input marks the source disconnected; the poll that hits it
/// reports `Timeout`, so a partial last line is still closed by the
/// assembler's timeout rule. A hard read error also disconnects.
pub struct ReplaySource<R> {
    reader: R,
    name: String,
    connected: bool,
    bytes_read: u64,
}

impl<R: Read> ReplaySource<R> {
    pub fn new(reader: R, name: impl Into<String>) -> Self {
        ReplaySource {
            reader,
            name: name.into(),
            connected: true,
            bytes_read: 0,
        }
    }

    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }
}

impl ReplaySource<Box<dyn Read>> {
    /// Open a capture file, or stdin when `path` is `-`.
    pub fn open(path: &Path) -> Result<Self, IoError> {
        if path.as_os_str() == "-" {
            let reader: Box<dyn Read> = Box::new(BufReader::new(std::io::stdin()));
            return Ok(ReplaySource::new(reader, "replay(stdin)"));
        }

        let file = File::open(path)
            .map_err(|e| IoError::connection(format!("replay({})", path.display()), e.to_string()))?;
        let reader: Box<dyn Read> = Box::new(BufReader::new(file));
        Ok(ReplaySource::new(reader, format!("replay({})", path.display())))
    }
}

impl<R: Read> ByteSource for ReplaySource<R> {
    fn poll_byte(&mut self) -> Poll {
        if !self.connected {
            return Poll::Timeout;
        }

        let mut byte = [0u8; 1];
        match self.reader.read(&mut byte) {
            Ok(0) => {
                self.connected = false;
                Poll::Timeout
            }
            Ok(_) => {
                self.bytes_read += 1;
                Poll::Byte(byte[0])
            }
            Err(ref e)
                if matches!(
                    e.kind(),
                    ErrorKind::Interrupted | ErrorKind::WouldBlock | ErrorKind::TimedOut
                ) =>
            {
                Poll::Timeout
            }
            // A file read that fails this way will fail again
            Err(e) => {
                tlog!("[replay] {} unreadable, stopping: {}", self.name, e);
                self.connected = false;
                Poll::Error(e)
            }
        }
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn describe(&self) -> String {
        self.name.clone()
    }
}
