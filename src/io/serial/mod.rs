// src/io/serial/mod.rs
//
// Serial port byte source.
// Cross-platform via the serialport crate; handle vs descriptor details stay
// inside that crate and never reach the framing code.

pub mod reader;
pub(crate) mod utils;

pub use reader::{list_ports, resolve_port_path, SerialConfig, SerialPortInfo, SerialSource};
pub use utils::Parity;
