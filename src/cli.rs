// src/cli.rs
//
// Command line front end: pick a byte source, run a decode session, print
// the recovered message.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;

use crate::codec::{DecodeEvent, FrameDecoder};
use crate::io::serial::{self, SerialSource};
use crate::io::{ByteSource, LineAssembler, ReplaySource};
use crate::load::LoadList;
use crate::logging;
use crate::rotor::RotorMode;
use crate::session::{self, SessionLimits, SessionReport};
use crate::settings::{self, AppSettings};

#[derive(Parser, Debug)]
#[command(name = "rotorwire", version, about = "Reassemble L-frames from a serial stream and decode them through a rotor")]
pub struct Cli {
    /// Settings file (default: <config dir>/rotorwire/settings.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log per-line framing diagnostics
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Also write logs to a timestamped file in this directory
    #[arg(long, global = true)]
    pub log_dir: Option<PathBuf>,

    /// Print decode events and the final report as JSON lines
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Decode frames from a serial port
    Listen {
        /// Port name or path (overrides settings)
        port: Option<String>,
        #[arg(long)]
        baud: Option<u32>,
        /// Wait after opening before draining start-up bytes
        #[arg(long)]
        settle_ms: Option<u64>,
        #[command(flatten)]
        decode: DecodeArgs,
    },
    /// Decode frames from a recorded byte capture (`-` for stdin)
    Replay {
        input: PathBuf,
        #[command(flatten)]
        decode: DecodeArgs,
    },
    /// List available serial ports
    ListPorts,
}

#[derive(Args, Debug, Default)]
pub struct DecodeArgs {
    /// Stop after this many load frames
    #[arg(long)]
    pub max_frames: Option<usize>,
    /// Line buffer size (content is at most one less)
    #[arg(long)]
    pub max_line_len: Option<usize>,
    /// Consecutive timeouts that close a pending line
    #[arg(long)]
    pub max_timeouts: Option<u32>,
    /// Pause between empty polls in milliseconds
    #[arg(long)]
    pub backoff_ms: Option<u64>,
    /// Starting rotor position
    #[arg(long, allow_hyphen_values = true)]
    pub rotor_position: Option<i64>,
    /// Advance the rotor after every decoded character
    #[arg(long)]
    pub stepping: bool,
}

impl DecodeArgs {
    /// Fold command line overrides into loaded settings.
    pub fn apply(&self, settings: &mut AppSettings) {
        if let Some(v) = self.max_line_len {
            settings.framing.max_line_len = v;
        }
        if let Some(v) = self.max_timeouts {
            settings.framing.max_timeouts = v;
        }
        if let Some(v) = self.backoff_ms {
            settings.framing.backoff_ms = v;
        }
        if let Some(v) = self.rotor_position {
            settings.rotor.position = v;
        }
        if self.stepping {
            settings.rotor.mode = RotorMode::Stepping;
        }
    }
}

pub fn execute(cli: Cli) -> Result<(), String> {
    let mut settings = settings::load_settings(cli.config.as_deref()).map_err(|e| e.to_string())?;

    logging::set_verbose(cli.verbose || settings.logging.verbose);
    if let Some(dir) = cli.log_dir.as_ref().or(settings.logging.reports_dir.as_ref()) {
        logging::init_file_logging(dir)?;
    }

    let result = match cli.command {
        Command::ListPorts => list_ports(cli.json),
        Command::Listen {
            port,
            baud,
            settle_ms,
            decode,
        } => {
            if let Some(p) = port {
                settings.serial.port = p;
            }
            if let Some(b) = baud {
                settings.serial.baud_rate = b;
            }
            if let Some(ms) = settle_ms {
                settings.serial.settle_ms = ms;
            }
            decode.apply(&mut settings);
            let mut source = SerialSource::open(&settings.serial)?;
            decode_stream(&mut source, &settings, &decode, cli.json)
        }
        Command::Replay { input, decode } => {
            decode.apply(&mut settings);
            let mut source = ReplaySource::open(&input)?;
            decode_stream(&mut source, &settings, &decode, cli.json)
        }
    };

    logging::stop_file_logging();
    result
}

fn list_ports(json: bool) -> Result<(), String> {
    let ports = serial::list_ports()?;
    if json {
        let out = serde_json::to_string(&ports).map_err(|e| e.to_string())?;
        println!("{}", out);
        return Ok(());
    }
    if ports.is_empty() {
        println!("No serial ports found");
    }
    for p in ports {
        match (p.vid, p.pid) {
            (Some(vid), Some(pid)) => println!(
                "{}\t{}\t{:04x}:{:04x}\t{}",
                p.port_name,
                p.port_type,
                vid,
                pid,
                p.product.unwrap_or_default()
            ),
            _ => println!("{}\t{}", p.port_name, p.port_type),
        }
    }
    Ok(())
}

fn decode_stream<S: ByteSource + ?Sized>(
    source: &mut S,
    settings: &AppSettings,
    decode: &DecodeArgs,
    json: bool,
) -> Result<(), String> {
    settings.validate().map_err(|e| e.to_string())?;

    let assembler = LineAssembler::new(settings.framing.clone())?;
    let decoder = FrameDecoder::new().with_frame_log(!json);
    let mut mapper = settings.rotor.build().map_err(|e| e.to_string())?;
    let mut sink = LoadList::new();
    let cancel = AtomicBool::new(false);
    let limits = SessionLimits {
        max_frames: decode.max_frames,
    };

    let report = session::run_session(
        source,
        &assembler,
        &decoder,
        &mut mapper,
        &mut sink,
        &cancel,
        &limits,
        |event: &DecodeEvent| {
            if json {
                if let Ok(line) = serde_json::to_string(event) {
                    println!("{}", line);
                }
            }
        },
    )?;

    print_summary(&report, &sink, json)
}

fn print_summary(report: &SessionReport, sink: &LoadList, json: bool) -> Result<(), String> {
    if json {
        let out = serde_json::json!({
            "report": report,
            "message": sink.message(),
        });
        let out = serde_json::to_string(&out).map_err(|e| e.to_string())?;
        println!("{}", out);
    } else {
        println!("{}", sink.message());
    }
    Ok(())
}
