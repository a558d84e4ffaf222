// src/io/sim.rs
//
// Scripted byte source for tests and offline simulation.
// Plays back a fixed list of poll outcomes, then goes quiet.

use std::collections::VecDeque;

use super::{ByteSource, Poll};

/// One scripted poll outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Byte(u8),
    Timeout,
    /// Hard read error (reported as `ErrorKind::Other`)
    Error,
}

impl Step {
    /// One `Byte` step per input byte.
    pub fn bytes(data: &[u8]) -> Vec<Step> {
        data.iter().map(|&b| Step::Byte(b)).collect()
    }
}

/// Byte source that replays a script of poll outcomes.
///
/// Once the script is exhausted every poll returns `Timeout`. By default the
/// source also marks itself disconnected at that point, so a session loop
/// ends after the last partial line has been flushed by the timeout rule.
#[derive(Debug, Clone)]
pub struct ScriptedSource {
    steps: VecDeque<Step>,
    connected: bool,
    disconnect_when_done: bool,
    polls: usize,
}

impl ScriptedSource {
    pub fn new(steps: Vec<Step>) -> Self {
        ScriptedSource {
            steps: steps.into(),
            connected: true,
            disconnect_when_done: true,
            polls: 0,
        }
    }

    pub fn from_bytes(data: &[u8]) -> Self {
        ScriptedSource::new(Step::bytes(data))
    }

    /// Keep reporting connected after the script runs out.
    pub fn stay_connected(mut self) -> Self {
        self.disconnect_when_done = false;
        self
    }

    pub fn set_connected(&mut self, connected: bool) {
        self.connected = connected;
    }

    pub fn push(&mut self, step: Step) {
        self.steps.push_back(step);
    }

    /// Steps not yet played.
    pub fn remaining(&self) -> usize {
        self.steps.len()
    }

    /// Total number of polls answered, including post-script timeouts.
    pub fn polls(&self) -> usize {
        self.polls
    }
}

impl ByteSource for ScriptedSource {
    fn poll_byte(&mut self) -> Poll {
        self.polls += 1;
        match self.steps.pop_front() {
            Some(Step::Byte(b)) => Poll::Byte(b),
            Some(Step::Timeout) => Poll::Timeout,
            Some(Step::Error) => Poll::Error(std::io::Error::other("scripted read error")),
            None => {
                if self.disconnect_when_done {
                    self.connected = false;
                }
                Poll::Timeout
            }
        }
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn describe(&self) -> String {
        "scripted".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plays_script_in_order() {
        let mut source = ScriptedSource::new(vec![Step::Byte(b'x'), Step::Timeout, Step::Error]);
        assert!(matches!(source.poll_byte(), Poll::Byte(b'x')));
        assert!(matches!(source.poll_byte(), Poll::Timeout));
        assert!(matches!(source.poll_byte(), Poll::Error(_)));
        assert_eq!(source.polls(), 3);
    }

    #[test]
    fn test_disconnects_after_script() {
        let mut source = ScriptedSource::from_bytes(b"a");
        source.poll_byte();
        assert!(source.is_connected());
        assert!(matches!(source.poll_byte(), Poll::Timeout));
        assert!(!source.is_connected());
    }

    #[test]
    fn test_stay_connected() {
        let mut source = ScriptedSource::from_bytes(b"").stay_connected();
        assert!(matches!(source.poll_byte(), Poll::Timeout));
        assert!(source.is_connected());
    }
}
