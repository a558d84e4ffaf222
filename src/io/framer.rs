// src/io/framer.rs
//
// Line framing over a polled byte source.
//
// Lines are `\n` terminated, `\r` is dropped, and a run of consecutive
// timeouts ends a straggling partial line. Each `read_line` call owns its own
// buffer, so a line is either returned whole or not consumed at all.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::time::Duration;

use super::{ByteSource, IoError, Poll};

// =============================================================================
// Configuration
// =============================================================================

/// Line framing parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FramingConfig {
    /// Buffer size including the reserved terminator slot; lines carry at
    /// most `max_line_len - 1` bytes
    #[serde(default = "default_max_line_len")]
    pub max_line_len: usize,
    /// Consecutive timeouts before giving up on the current line
    #[serde(default = "default_max_timeouts")]
    pub max_timeouts: u32,
    /// Pause between unsuccessful polls
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,
}

fn default_max_line_len() -> usize {
    64
}
fn default_max_timeouts() -> u32 {
    50
}
fn default_backoff_ms() -> u64 {
    1
}

impl Default for FramingConfig {
    fn default() -> Self {
        FramingConfig {
            max_line_len: default_max_line_len(),
            max_timeouts: default_max_timeouts(),
            backoff_ms: default_backoff_ms(),
        }
    }
}

impl FramingConfig {
    pub fn validate(&self) -> Result<(), IoError> {
        // One slot is reserved, so a line of 1 could never hold a byte
        if self.max_line_len < 2 {
            return Err(IoError::configuration("max_line_len must be at least 2"));
        }
        if self.max_timeouts < 1 {
            return Err(IoError::configuration("max_timeouts must be at least 1"));
        }
        Ok(())
    }

    pub fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }
}

// =============================================================================
// Line
// =============================================================================

/// How a line was closed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LineEnd {
    /// A `\n` followed buffered content
    Newline,
    /// The timeout threshold was hit with content buffered
    Timeout,
    /// The buffer filled up before any terminator arrived
    Truncated,
}

/// One complete logical line, without terminators
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    bytes: Vec<u8>,
    end: LineEnd,
}

impl Line {
    pub fn new(bytes: Vec<u8>, end: LineEnd) -> Self {
        Line { bytes, end }
    }

    /// Build a newline-terminated line from text. Mostly useful in tests and
    /// when lines come from somewhere other than a byte source.
    pub fn from_text(text: &str) -> Self {
        Line::new(text.as_bytes().to_vec(), LineEnd::Newline)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// The line as UTF-8, if it is valid.
    pub fn as_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.bytes).ok()
    }

    /// Lossy text view for logging.
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.bytes)
    }

    pub fn end(&self) -> LineEnd {
        self.end
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

// =============================================================================
// Line Assembler
// =============================================================================

/// Turns a byte source into discrete lines.
///
/// The assembler itself is stateless between calls; all buffering and the
/// consecutive-timeout counter live inside one `read_line` invocation.
#[derive(Debug, Clone, Default)]
pub struct LineAssembler {
    config: FramingConfig,
}

impl LineAssembler {
    pub fn new(config: FramingConfig) -> Result<Self, IoError> {
        config.validate()?;
        Ok(LineAssembler { config })
    }

    pub fn config(&self) -> &FramingConfig {
        &self.config
    }

    /// Read one line using the configured `max_line_len`.
    pub fn read_line<S: ByteSource + ?Sized>(&self, source: &mut S) -> Result<Option<Line>, IoError> {
        self.read_line_with(source, self.config.max_line_len)
    }

    /// Read one line of at most `max_len - 1` bytes.
    ///
    /// Returns `Ok(None)` when nothing complete arrived (idle channel, or a
    /// hard read error that discarded the partial line). Fails only when the
    /// source is disconnected or `max_len` is zero, and in both cases before
    /// any byte is read.
    pub fn read_line_with<S: ByteSource + ?Sized>(
        &self,
        source: &mut S,
        max_len: usize,
    ) -> Result<Option<Line>, IoError> {
        if max_len < 1 {
            return Err(IoError::configuration("max_len must be at least 1"));
        }
        if !source.is_connected() {
            return Err(IoError::NotConnected);
        }

        let capacity = max_len - 1;
        let backoff = self.config.backoff();
        let mut buffer: Vec<u8> = Vec::with_capacity(capacity);
        let mut timeouts: u32 = 0;

        loop {
            // Full buffer: stop before polling so the next byte stays on the wire
            if buffer.len() >= capacity {
                if buffer.is_empty() {
                    return Ok(None);
                }
                dlog!("[framer] Line truncated at {} bytes", buffer.len());
                return Ok(Some(Line::new(buffer, LineEnd::Truncated)));
            }

            match source.poll_byte() {
                Poll::Byte(byte) => {
                    timeouts = 0;
                    match byte {
                        b'\r' => continue,
                        b'\n' => {
                            if !buffer.is_empty() {
                                return Ok(Some(Line::new(buffer, LineEnd::Newline)));
                            }
                            // Bare terminator, keep reading
                        }
                        _ => buffer.push(byte),
                    }
                }
                Poll::Timeout => {
                    timeouts += 1;
                    if timeouts >= self.config.max_timeouts {
                        if buffer.is_empty() {
                            return Ok(None);
                        }
                        dlog!(
                            "[framer] No terminator after {} timeouts, closing {}-byte line",
                            timeouts,
                            buffer.len()
                        );
                        return Ok(Some(Line::new(buffer, LineEnd::Timeout)));
                    }
                    if !backoff.is_zero() {
                        std::thread::sleep(backoff);
                    }
                }
                Poll::Error(e) => {
                    tlog!(
                        "[framer] Read error on {}: {} (discarding {} buffered bytes)",
                        source.describe(),
                        e,
                        buffer.len()
                    );
                    return Ok(None);
                }
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::sim::{ScriptedSource, Step};

    fn assembler() -> LineAssembler {
        LineAssembler::new(FramingConfig {
            max_line_len: 64,
            max_timeouts: 50,
            backoff_ms: 0,
        })
        .unwrap()
    }

    #[test]
    fn test_crlf_alone_yields_no_line() {
        let mut source = ScriptedSource::from_bytes(b"\r\n");
        let line = assembler().read_line(&mut source).unwrap();
        assert!(line.is_none());
    }

    #[test]
    fn test_two_lines_in_order() {
        let mut source = ScriptedSource::from_bytes(b"A\r\nB\n");
        let asm = assembler();

        let first = asm.read_line(&mut source).unwrap().unwrap();
        assert_eq!(first.as_bytes(), b"A");
        assert_eq!(first.end(), LineEnd::Newline);

        let second = asm.read_line(&mut source).unwrap().unwrap();
        assert_eq!(second.as_bytes(), b"B");
    }

    #[test]
    fn test_bare_newlines_skipped() {
        let mut source = ScriptedSource::from_bytes(b"\n\n\nL,a\n");
        let line = assembler().read_line(&mut source).unwrap().unwrap();
        assert_eq!(line.as_str(), Some("L,a"));
    }

    #[test]
    fn test_timeout_closes_partial_line_once() {
        let mut steps = Step::bytes(b"L,q");
        steps.extend(std::iter::repeat(Step::Timeout).take(60));
        let mut source = ScriptedSource::new(steps);
        let asm = assembler();

        let line = asm.read_line(&mut source).unwrap().unwrap();
        assert_eq!(line.as_bytes(), b"L,q");
        assert_eq!(line.end(), LineEnd::Timeout);

        // Remaining timeouts only produce an idle result, not the line again
        assert!(asm.read_line(&mut source).unwrap().is_none());
    }

    #[test]
    fn test_timeouts_below_threshold_keep_line_open() {
        let mut steps = Step::bytes(b"L,");
        steps.extend(std::iter::repeat(Step::Timeout).take(49));
        steps.extend(Step::bytes(b"x\n"));
        let mut source = ScriptedSource::new(steps);

        let line = assembler().read_line(&mut source).unwrap().unwrap();
        assert_eq!(line.as_bytes(), b"L,x");
        assert_eq!(line.end(), LineEnd::Newline);
    }

    #[test]
    fn test_carriage_return_resets_timeout_counter() {
        let mut steps = Step::bytes(b"L,");
        steps.extend(std::iter::repeat(Step::Timeout).take(40));
        steps.push(Step::Byte(b'\r'));
        steps.extend(std::iter::repeat(Step::Timeout).take(40));
        steps.extend(Step::bytes(b"z\n"));
        let mut source = ScriptedSource::new(steps);

        let line = assembler().read_line(&mut source).unwrap().unwrap();
        assert_eq!(line.as_bytes(), b"L,z");
        assert_eq!(line.end(), LineEnd::Newline);
    }

    #[test]
    fn test_idle_source_returns_none() {
        let steps = std::iter::repeat(Step::Timeout).take(50).collect();
        let mut source = ScriptedSource::new(steps);
        assert!(assembler().read_line(&mut source).unwrap().is_none());
    }

    #[test]
    fn test_truncates_at_max_len_minus_one() {
        let mut source = ScriptedSource::from_bytes(b"abcdefgh\n");
        let asm = assembler();

        let line = asm.read_line_with(&mut source, 4).unwrap().unwrap();
        assert_eq!(line.as_bytes(), b"abc");
        assert_eq!(line.end(), LineEnd::Truncated);

        // Nothing past the limit was consumed
        let rest = asm.read_line_with(&mut source, 64).unwrap().unwrap();
        assert_eq!(rest.as_bytes(), b"defgh");
    }

    #[test]
    fn test_max_len_one_reads_nothing() {
        let mut source = ScriptedSource::from_bytes(b"a\n");
        assert!(assembler().read_line_with(&mut source, 1).unwrap().is_none());
        assert_eq!(source.remaining(), 2);
    }

    #[test]
    fn test_max_len_zero_rejected() {
        let mut source = ScriptedSource::from_bytes(b"a\n");
        let err = assembler().read_line_with(&mut source, 0).unwrap_err();
        assert!(matches!(err, IoError::Configuration(_)));
    }

    #[test]
    fn test_channel_error_discards_partial() {
        let mut steps = Step::bytes(b"L,a");
        steps.push(Step::Error);
        steps.extend(Step::bytes(b"L,b\n"));
        let mut source = ScriptedSource::new(steps);
        let asm = assembler();

        assert!(asm.read_line(&mut source).unwrap().is_none());
        let line = asm.read_line(&mut source).unwrap().unwrap();
        assert_eq!(line.as_bytes(), b"L,b");
    }

    #[test]
    fn test_not_connected_reads_nothing() {
        let mut source = ScriptedSource::from_bytes(b"L,a\n");
        source.set_connected(false);

        let err = assembler().read_line(&mut source).unwrap_err();
        assert!(matches!(err, IoError::NotConnected));
        assert_eq!(source.remaining(), 4);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = FramingConfig {
            max_timeouts: 0,
            ..FramingConfig::default()
        };
        assert!(LineAssembler::new(config).is_err());
    }

    #[test]
    fn test_config_line_len_one_rejected() {
        let config = FramingConfig {
            max_line_len: 1,
            ..FramingConfig::default()
        };
        let err = LineAssembler::new(config).unwrap_err();
        assert!(matches!(err, IoError::Configuration(_)));

        let config = FramingConfig {
            max_line_len: 2,
            ..FramingConfig::default()
        };
        assert!(LineAssembler::new(config).is_ok());
    }
}
