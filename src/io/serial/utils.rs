// src/io/serial/utils.rs
//
// Line-setting types for the serial source and their serialport conversions.

use serde::{Deserialize, Serialize};
use serialport::{DataBits, Parity as SpParity, StopBits};

// ============================================================================
// Types
// ============================================================================

/// Parity setting for serial port configuration
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Parity {
    #[default]
    None,
    Odd,
    Even,
}

impl Parity {
    /// Parse "none" / "odd" / "even" (case-insensitive). Unknown values fall
    /// back to `None`, matching what most adapters default to.
    pub fn from_name(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "odd" | "o" => Parity::Odd,
            "even" | "e" => Parity::Even,
            _ => Parity::None,
        }
    }

    /// Single-letter form used in `8N1` style summaries
    pub fn letter(self) -> char {
        match self {
            Parity::None => 'N',
            Parity::Odd => 'O',
            Parity::Even => 'E',
        }
    }
}

impl From<Parity> for SpParity {
    fn from(p: Parity) -> Self {
        match p {
            Parity::None => SpParity::None,
            Parity::Odd => SpParity::Odd,
            Parity::Even => SpParity::Even,
        }
    }
}

// ============================================================================
// Conversion Functions
// ============================================================================

/// Data bits count to serialport's DataBits; anything unsupported is eight
pub fn to_data_bits(bits: u8) -> DataBits {
    match bits {
        5 => DataBits::Five,
        6 => DataBits::Six,
        7 => DataBits::Seven,
        _ => DataBits::Eight,
    }
}

/// Stop bits count to serialport's StopBits; anything but two is one
pub fn to_stop_bits(bits: u8) -> StopBits {
    match bits {
        2 => StopBits::Two,
        _ => StopBits::One,
    }
}

/// Short line-settings summary, e.g. `9600 8N1`
pub fn line_summary(baud_rate: u32, data_bits: u8, parity: Parity, stop_bits: u8) -> String {
    format!("{} {}{}{}", baud_rate, data_bits, parity.letter(), stop_bits)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parity_from_name() {
        assert_eq!(Parity::from_name("ODD"), Parity::Odd);
        assert_eq!(Parity::from_name("even"), Parity::Even);
        assert_eq!(Parity::from_name("mark"), Parity::None);
    }

    #[test]
    fn test_parity_into_serialport() {
        assert!(matches!(SpParity::from(Parity::Odd), SpParity::Odd));
        assert!(matches!(SpParity::from(Parity::None), SpParity::None));
    }

    #[test]
    fn test_bits_conversions() {
        assert!(matches!(to_data_bits(7), DataBits::Seven));
        assert!(matches!(to_data_bits(9), DataBits::Eight)); // default
        assert!(matches!(to_stop_bits(2), StopBits::Two));
        assert!(matches!(to_stop_bits(0), StopBits::One)); // default
    }

    #[test]
    fn test_line_summary() {
        assert_eq!(line_summary(9600, 8, Parity::None, 1), "9600 8N1");
    }
}
