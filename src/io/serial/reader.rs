// src/io/serial/reader.rs
//
// Serial port byte source.
// Opens the port with the configured line settings, lets the far end settle,
// throws away start-up chatter, then serves single-byte polls.

use serde::{Deserialize, Serialize};
use std::io::{ErrorKind, Read};
use std::time::Duration;

use super::utils::{self, Parity};
use crate::io::{ByteSource, IoError, Poll};

// ============================================================================
// Types and Configuration
// ============================================================================

/// Serial port configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SerialConfig {
    /// Port name or path, e.g. "/dev/ttyACM0", "ttyUSB0", "COM3"
    #[serde(default)]
    pub port: String,
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
    #[serde(default = "default_data_bits")]
    pub data_bits: u8,
    #[serde(default = "default_stop_bits")]
    pub stop_bits: u8,
    #[serde(default)]
    pub parity: Parity,
    /// Per-poll read timeout; one timed-out poll is one framing timeout
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,
    /// Wait after opening before draining (boards that reset on open)
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,
}

fn default_baud_rate() -> u32 {
    9600
}
fn default_data_bits() -> u8 {
    8
}
fn default_stop_bits() -> u8 {
    1
}
fn default_read_timeout_ms() -> u64 {
    1
}
fn default_settle_ms() -> u64 {
    2000
}

impl Default for SerialConfig {
    fn default() -> Self {
        SerialConfig {
            port: String::new(),
            baud_rate: default_baud_rate(),
            data_bits: default_data_bits(),
            stop_bits: default_stop_bits(),
            parity: Parity::default(),
            read_timeout_ms: default_read_timeout_ms(),
            settle_ms: default_settle_ms(),
        }
    }
}

/// Information about an available serial port
#[derive(Clone, Debug, Serialize)]
pub struct SerialPortInfo {
    pub port_name: String,
    pub port_type: String,
    pub manufacturer: Option<String>,
    pub product: Option<String>,
    pub serial_number: Option<String>,
    pub vid: Option<u16>,
    pub pid: Option<u16>,
}

/// Resolve a bare device name to a full path. On Unix "ttyUSB0" becomes
/// "/dev/ttyUSB0"; elsewhere the name is used as given.
pub fn resolve_port_path(port: &str) -> String {
    #[cfg(unix)]
    {
        if !port.starts_with('/') {
            return format!("/dev/{}", port);
        }
    }
    port.to_string()
}

// ============================================================================
// Serial Source
// ============================================================================

/// Serial port exposed as a polled byte source
pub struct SerialSource {
    port: Box<dyn serialport::SerialPort>,
    path: String,
    connected: bool,
}

impl SerialSource {
    /// Open and prepare the port.
    pub fn open(config: &SerialConfig) -> Result<Self, IoError> {
        if config.port.trim().is_empty() {
            return Err(IoError::configuration("serial port name is empty"));
        }
        let path = resolve_port_path(config.port.trim());
        let device = format!("serial({})", path);

        let mut port = serialport::new(&path, config.baud_rate)
            .data_bits(utils::to_data_bits(config.data_bits))
            .stop_bits(utils::to_stop_bits(config.stop_bits))
            .parity(config.parity.into())
            .timeout(Duration::from_millis(config.read_timeout_ms))
            .open()
            .map_err(|e| IoError::connection(&device, e.to_string()))?;

        if config.settle_ms > 0 {
            std::thread::sleep(Duration::from_millis(config.settle_ms));
        }

        // Discard whatever the device sent while starting up
        let _ = port.clear(serialport::ClearBuffer::All);
        let drained = drain(port.as_mut());
        let _ = port.clear(serialport::ClearBuffer::All);

        tlog!(
            "[serial] Connected to {} at {} (drained {} start-up bytes)",
            path,
            utils::line_summary(config.baud_rate, config.data_bits, config.parity, config.stop_bits),
            drained
        );

        Ok(SerialSource {
            port,
            path,
            connected: true,
        })
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

/// Cap on start-up bytes discarded, in case the far end never goes quiet
const MAX_DRAIN_BYTES: usize = 64 * 1024;

/// Read until the port has nothing left to give. Returns the byte count.
fn drain(port: &mut dyn serialport::SerialPort) -> usize {
    let mut scratch = [0u8; 256];
    let mut total = 0;
    while total < MAX_DRAIN_BYTES {
        match port.read(&mut scratch) {
            Ok(n) if n > 0 => total += n,
            _ => break,
        }
    }
    total
}

impl ByteSource for SerialSource {
    fn poll_byte(&mut self) -> Poll {
        let mut byte = [0u8; 1];
        match self.port.read(&mut byte) {
            Ok(n) if n > 0 => Poll::Byte(byte[0]),
            Ok(_) => Poll::Timeout,
            Err(ref e)
                if matches!(
                    e.kind(),
                    ErrorKind::TimedOut | ErrorKind::WouldBlock | ErrorKind::Interrupted
                ) =>
            {
                Poll::Timeout
            }
            Err(e) => {
                // Device gone (unplugged, closed by the OS)
                if matches!(
                    e.kind(),
                    ErrorKind::BrokenPipe | ErrorKind::NotConnected | ErrorKind::UnexpectedEof
                ) {
                    tlog!("[serial] {} disconnected: {}", self.path, e);
                    self.connected = false;
                }
                Poll::Error(e)
            }
        }
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn describe(&self) -> String {
        format!("serial({})", self.path)
    }
}

// ============================================================================
// Port Enumeration
// ============================================================================

/// List available serial ports
///
/// On macOS, filters out /dev/tty.* devices and only shows /dev/cu.* devices.
/// The tty devices block on open waiting for carrier detect.
pub fn list_ports() -> Result<Vec<SerialPortInfo>, IoError> {
    let ports = serialport::available_ports()
        .map_err(|e| IoError::connection("serial", format!("failed to enumerate ports: {}", e)))?;

    Ok(ports
        .into_iter()
        .filter(|_p| {
            #[cfg(target_os = "macos")]
            {
                !_p.port_name.starts_with("/dev/tty.")
            }
            #[cfg(not(target_os = "macos"))]
            {
                true
            }
        })
        .map(|p| {
            let (port_type, manufacturer, product, serial_number, vid, pid) = match p.port_type {
                serialport::SerialPortType::UsbPort(info) => (
                    "USB".to_string(),
                    info.manufacturer,
                    info.product,
                    info.serial_number,
                    Some(info.vid),
                    Some(info.pid),
                ),
                serialport::SerialPortType::BluetoothPort => {
                    ("Bluetooth".to_string(), None, None, None, None, None)
                }
                serialport::SerialPortType::PciPort => ("PCI".to_string(), None, None, None, None, None),
                serialport::SerialPortType::Unknown => {
                    ("Unknown".to_string(), None, None, None, None, None)
                }
            };
            SerialPortInfo {
                port_name: p.port_name,
                port_type,
                manufacturer,
                product,
                serial_number,
                vid,
                pid,
            }
        })
        .collect())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_9600_8n1() {
        let config = SerialConfig::default();
        assert_eq!(config.baud_rate, 9600);
        assert_eq!(config.data_bits, 8);
        assert_eq!(config.stop_bits, 1);
        assert_eq!(config.parity, Parity::None);
        assert_eq!(config.settle_ms, 2000);
    }

    #[test]
    fn test_empty_port_rejected() {
        let result = SerialSource::open(&SerialConfig::default());
        assert!(matches!(result, Err(IoError::Configuration(_))));
    }

    #[cfg(unix)]
    #[test]
    fn test_resolve_port_path() {
        assert_eq!(resolve_port_path("ttyUSB0"), "/dev/ttyUSB0");
        assert_eq!(resolve_port_path("/dev/ttyACM1"), "/dev/ttyACM1");
    }

    #[test]
    fn test_open_missing_port_fails() {
        let config = SerialConfig {
            port: "/dev/rotorwire-no-such-port".to_string(),
            settle_ms: 0,
            ..SerialConfig::default()
        };
        assert!(matches!(
            SerialSource::open(&config),
            Err(IoError::Connection { .. })
        ));
    }
}
