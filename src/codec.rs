// src/codec.rs
//
// Tagged line frames and the decode step.
//
// Frame formats:
//   Load: L,<c>      one payload character, or the word `Space` for ' '
//   Map:  M,<n>      signed step count, rotates the mapper
//
// A line is parsed completely before anything is touched, so a malformed
// line never reaches the mapper or the load sequence.

use serde::Serialize;
use thiserror::Error;

use crate::io::Line;
use crate::load::LoadSequence;
use crate::rotor::SubstitutionTable;

pub const LOAD_TAG: &str = "L";
pub const MAP_TAG: &str = "M";
/// Spelled-out payload for a space, which is easy to lose on the wire
pub const SPACE_ALIAS: &str = "Space";

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    /// The line does not match the frame grammar. Nothing was mutated.
    #[error("malformed frame {line:?}: {reason}")]
    MalformedFrame { line: String, reason: String },

    /// A map frame arrived but the mapper cannot rotate.
    #[error("mapper cannot rotate (frame {line:?})")]
    RotationUnsupported { line: String },
}

impl DecodeError {
    fn malformed(line: &str, reason: impl Into<String>) -> Self {
        DecodeError::MalformedFrame {
            line: line.to_string(),
            reason: reason.into(),
        }
    }
}

// ============================================================================
// Frame
// ============================================================================

/// A parsed line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frame {
    Load(char),
    Map(i32),
}

impl Frame {
    /// Parse one line of text (without terminators).
    ///
    /// Examples:
    ///   `L,a`     -> Load('a')
    ///   `L,Space` -> Load(' ')
    ///   `M,-3`    -> Map(-3)
    pub fn parse(line: &str) -> Result<Frame, DecodeError> {
        let (tag, payload) = line
            .split_once(',')
            .ok_or_else(|| DecodeError::malformed(line, "missing ',' after tag"))?;

        match tag {
            LOAD_TAG => {
                if payload == SPACE_ALIAS {
                    return Ok(Frame::Load(' '));
                }
                let mut chars = payload.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Ok(Frame::Load(c)),
                    (None, _) => Err(DecodeError::malformed(line, "empty payload")),
                    (Some(_), Some(_)) => Err(DecodeError::malformed(
                        line,
                        format!("expected one payload character, got {}", payload.chars().count()),
                    )),
                }
            }
            MAP_TAG => payload
                .parse::<i32>()
                .map(Frame::Map)
                .map_err(|_| DecodeError::malformed(line, format!("invalid step count: {:?}", payload))),
            other => Err(DecodeError::malformed(line, format!("unknown tag {:?}", other))),
        }
    }
}

// ============================================================================
// Decode Events
// ============================================================================

/// What one successfully processed frame did
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DecodeEvent {
    Load { raw: String, payload: char, decoded: char },
    Map { raw: String, steps: i32 },
}

// ============================================================================
// Frame Decoder
// ============================================================================

/// Applies frames to a mapper and a load sequence.
#[derive(Debug, Clone)]
pub struct FrameDecoder {
    log_frames: bool,
}

impl Default for FrameDecoder {
    fn default() -> Self {
        FrameDecoder { log_frames: true }
    }
}

impl FrameDecoder {
    pub fn new() -> Self {
        FrameDecoder::default()
    }

    /// Turn the per-frame log line on or off.
    pub fn with_frame_log(mut self, on: bool) -> Self {
        self.log_frames = on;
        self
    }

    /// Decode one line.
    ///
    /// A load frame calls `mapper.map` once and appends exactly one character
    /// to `sink`. A map frame rotates the mapper and appends nothing. Any
    /// error leaves both untouched.
    pub fn process<M, L>(&self, line: &Line, mapper: &mut M, sink: &mut L) -> Result<DecodeEvent, DecodeError>
    where
        M: SubstitutionTable + ?Sized,
        L: LoadSequence + ?Sized,
    {
        let text = line
            .as_str()
            .ok_or_else(|| DecodeError::malformed(&line.text(), "not valid UTF-8"))?;

        match Frame::parse(text)? {
            Frame::Load(payload) => {
                let decoded = mapper.map(payload);
                sink.append(decoded);
                if self.log_frames {
                    tlog!(
                        "[decoder] Frame received: [{}] -> fragment '{}' decoded as '{}'",
                        text,
                        payload,
                        decoded
                    );
                }
                Ok(DecodeEvent::Load {
                    raw: text.to_string(),
                    payload,
                    decoded,
                })
            }
            Frame::Map(steps) => {
                if !mapper.rotate(steps) {
                    return Err(DecodeError::RotationUnsupported { line: text.to_string() });
                }
                if self.log_frames {
                    tlog!("[decoder] Frame received: [{}] -> rotor turned {} steps", text, steps);
                }
                Ok(DecodeEvent::Map {
                    raw: text.to_string(),
                    steps,
                })
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
