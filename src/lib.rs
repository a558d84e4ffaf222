//! Serial line reassembly and rotor decoding.
//!
//! Bytes arrive one poll at a time from a [`io::ByteSource`]. The
//! [`io::LineAssembler`] turns them into lines, the [`codec::FrameDecoder`]
//! parses `L,<c>` / `M,<n>` frames, maps load payloads through a
//! [`rotor::SubstitutionTable`] and appends the result to a
//! [`load::LoadSequence`]. [`session::run_session`] drives the loop.

#[macro_use]
pub mod logging;

pub mod cli;
pub mod codec;
pub mod io;
pub mod load;
pub mod rotor;
pub mod session;
pub mod settings;

use clap::Parser;
use std::process::ExitCode;

pub use codec::{DecodeError, DecodeEvent, Frame, FrameDecoder};
pub use io::{ByteSource, IoError, Line, LineAssembler, LineEnd, Poll};
pub use load::{LoadList, LoadSequence, SharedLoadList};
pub use rotor::{Rotor, RotorMode, SubstitutionTable, TableMapper};

/// Binary entry point.
pub fn run() -> ExitCode {
    let cli = cli::Cli::parse();
    match cli::execute(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tlog!("[rotorwire] {}", e);
            ExitCode::FAILURE
        }
    }
}
