// src/session.rs
//
// Single-threaded poll loop: read a line, decode it, repeat.
// Ends on cancellation, when the source disconnects, or at the frame limit.

use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::codec::{DecodeError, DecodeEvent, FrameDecoder};
use crate::io::{ByteSource, IoError, LineAssembler, LineEnd};
use crate::load::LoadSequence;
use crate::rotor::SubstitutionTable;

/// Optional bounds on a session
#[derive(Debug, Clone, Default)]
pub struct SessionLimits {
    /// Stop after this many load frames have been appended
    pub max_frames: Option<usize>,
}

/// Why a session ended
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// Cancel flag was raised
    #[default]
    Stopped,
    /// Frame limit reached
    Complete,
    /// Source reported itself disconnected
    Disconnected,
}

/// Counters for one session
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SessionReport {
    pub lines: usize,
    /// Load frames appended to the sink
    pub loaded: usize,
    pub rotations: usize,
    pub malformed: usize,
    /// Map frames the mapper could not apply
    pub rejected: usize,
    /// Lines closed by the timeout rule rather than a newline
    pub timed_out_lines: usize,
    pub truncated_lines: usize,
    pub reason: StopReason,
}

/// Run the poll loop until cancelled, disconnected, or the frame limit.
///
/// `on_event` sees every successfully decoded frame, in order.
#[allow(clippy::too_many_arguments)]
pub fn run_session<S, M, L, F>(
    source: &mut S,
    assembler: &LineAssembler,
    decoder: &FrameDecoder,
    mapper: &mut M,
    sink: &mut L,
    cancel: &AtomicBool,
    limits: &SessionLimits,
    mut on_event: F,
) -> Result<SessionReport, IoError>
where
    S: ByteSource + ?Sized,
    M: SubstitutionTable + ?Sized,
    L: LoadSequence + ?Sized,
    F: FnMut(&DecodeEvent),
{
    let mut report = SessionReport::default();
    let device = source.describe();

    tlog!("[session] Reading from {} (limit: {:?})", device, limits.max_frames);

    loop {
        if cancel.load(Ordering::Relaxed) {
            report.reason = StopReason::Stopped;
            break;
        }

        if let Some(max) = limits.max_frames {
            if report.loaded >= max {
                tlog!("[session] Reached limit of {} frames, stopping", max);
                report.reason = StopReason::Complete;
                break;
            }
        }

        let line = match assembler.read_line(source) {
            Ok(Some(line)) => line,
            Ok(None) => {
                // Idle, or a line lost to a read error
                let backoff = assembler.config().backoff();
                if !backoff.is_zero() {
                    std::thread::sleep(backoff);
                }
                continue;
            }
            Err(IoError::NotConnected) => {
                report.reason = StopReason::Disconnected;
                break;
            }
            Err(e) => return Err(e),
        };

        report.lines += 1;
        match line.end() {
            LineEnd::Timeout => report.timed_out_lines += 1,
            LineEnd::Truncated => report.truncated_lines += 1,
            LineEnd::Newline => {}
        }

        match decoder.process(&line, mapper, sink) {
            Ok(event) => {
                match event {
                    DecodeEvent::Load { .. } => report.loaded += 1,
                    DecodeEvent::Map { .. } => report.rotations += 1,
                }
                on_event(&event);
            }
            Err(e @ DecodeError::MalformedFrame { .. }) => {
                report.malformed += 1;
                tlog!("[session] Skipping frame: {} (hex: {})", e, hex::encode(line.as_bytes()));
            }
            Err(e @ DecodeError::RotationUnsupported { .. }) => {
                report.rejected += 1;
                tlog!("[session] Skipping frame: {}", e);
            }
        }
    }

    tlog!(
        "[session] {} ended ({:?}): {} lines, {} loaded, {} rotations, {} malformed",
        device,
        report.reason,
        report.lines,
        report.loaded,
        report.rotations,
        report.malformed
    );

    Ok(report)
}
