// src/rotor.rs
//
// Substitution mappers consumed by the frame decoder.
//
// Every mapper here is total over `char`: characters it has no entry for pass
// through unchanged. Dropping or rejecting them would make the decoded
// message shorter than the number of load frames received.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ============================================================================
// Trait
// ============================================================================

/// Character substitution used to decode load frames.
pub trait SubstitutionTable {
    /// Map one payload character.
    ///
    /// Fixed tables must not change state here. Stepping rotors advance
    /// exactly once per call and say so in their docs.
    fn map(&mut self, c: char) -> char;

    /// Shift the table by `steps` positions (negative turns backwards).
    /// Returns `false` when the table has no notion of rotation.
    fn rotate(&mut self, steps: i32) -> bool {
        let _ = steps;
        false
    }
}

impl<T: SubstitutionTable + ?Sized> SubstitutionTable for Box<T> {
    fn map(&mut self, c: char) -> char {
        (**self).map(c)
    }

    fn rotate(&mut self, steps: i32) -> bool {
        (**self).rotate(steps)
    }
}

// ============================================================================
// Rotor
// ============================================================================

/// Whether a rotor moves on its own
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RotorMode {
    /// Position changes only through `rotate`
    #[default]
    Fixed,
    /// Advances one position after every `map` call
    Stepping,
}

/// Errors building a rotor from configuration
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RotorError {
    #[error("rotor alphabet is empty")]
    EmptyAlphabet,
    #[error("rotor alphabet repeats '{0}'")]
    DuplicateSymbol(char),
}

/// A ring of symbols with a movable position.
///
/// `map(c)` finds `c` on the ring and returns the symbol `position` places
/// further along. With the default `A..=Z` ring, lowercase letters go through
/// the uppercase ring and come back lowercase. Anything not on the ring is
/// returned as is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rotor {
    ring: Vec<char>,
    position: usize,
    mode: RotorMode,
}

pub const LATIN_UPPER: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ";

impl Rotor {
    pub fn new(alphabet: &str, position: i64, mode: RotorMode) -> Result<Self, RotorError> {
        let ring: Vec<char> = alphabet.chars().collect();
        if ring.is_empty() {
            return Err(RotorError::EmptyAlphabet);
        }
        for (i, c) in ring.iter().enumerate() {
            if ring[..i].contains(c) {
                return Err(RotorError::DuplicateSymbol(*c));
            }
        }
        let position = position.rem_euclid(ring.len() as i64) as usize;
        Ok(Rotor { ring, position, mode })
    }

    /// A-Z ring, fixed at position 0 (identity until rotated).
    pub fn latin() -> Self {
        Rotor {
            ring: LATIN_UPPER.chars().collect(),
            position: 0,
            mode: RotorMode::Fixed,
        }
    }

    /// Classic ROT13: A-Z ring fixed at position 13.
    pub fn rot13() -> Self {
        Rotor {
            position: 13,
            ..Rotor::latin()
        }
    }

    pub fn with_mode(mut self, mode: RotorMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn mode(&self) -> RotorMode {
        self.mode
    }

    /// Symbol for `c` at the current position, without side effects.
    pub fn peek(&self, c: char) -> char {
        if let Some(idx) = self.index_of(c) {
            return self.ring[(idx + self.position) % self.ring.len()];
        }
        // Fold case through the ring when only the other case is present
        if c.is_ascii_lowercase() {
            let upper = c.to_ascii_uppercase();
            if let Some(idx) = self.index_of(upper) {
                return self.ring[(idx + self.position) % self.ring.len()].to_ascii_lowercase();
            }
        }
        c
    }

    fn index_of(&self, c: char) -> Option<usize> {
        self.ring.iter().position(|&s| s == c)
    }
}

impl Default for Rotor {
    fn default() -> Self {
        Rotor::latin()
    }
}

impl SubstitutionTable for Rotor {
    /// In `Stepping` mode the rotor advances one position after mapping,
    /// whether or not `c` was on the ring.
    fn map(&mut self, c: char) -> char {
        let out = self.peek(c);
        if self.mode == RotorMode::Stepping {
            self.position = (self.position + 1) % self.ring.len();
        }
        out
    }

    fn rotate(&mut self, steps: i32) -> bool {
        let len = self.ring.len() as i64;
        self.position = (self.position as i64 + steps as i64).rem_euclid(len) as usize;
        true
    }
}

// ============================================================================
// Table Mapper
// ============================================================================

/// Explicit one-to-one lookup table. Unlisted characters pass through.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableMapper {
    table: HashMap<char, char>,
}

impl TableMapper {
    pub fn new(table: HashMap<char, char>) -> Self {
        TableMapper { table }
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

impl FromIterator<(char, char)> for TableMapper {
    fn from_iter<I: IntoIterator<Item = (char, char)>>(iter: I) -> Self {
        TableMapper::new(iter.into_iter().collect())
    }
}

impl SubstitutionTable for TableMapper {
    fn map(&mut self, c: char) -> char {
        self.table.get(&c).copied().unwrap_or(c)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rot13_maps_a_to_n() {
        let mut rotor = Rotor::rot13();
        assert_eq!(rotor.map('a'), 'n');
        assert_eq!(rotor.map('A'), 'N');
        assert_eq!(rotor.map('N'), 'A');
        assert_eq!(rotor.position(), 13);
    }

    #[test]
    fn test_unmapped_passthrough() {
        let mut rotor = Rotor::rot13();
        assert_eq!(rotor.map(' '), ' ');
        assert_eq!(rotor.map('7'), '7');
        assert_eq!(rotor.map('!'), '!');
    }

    #[test]
    fn test_rotate_wraps_both_ways() {
        let mut rotor = Rotor::latin();
        assert!(rotor.rotate(2));
        assert_eq!(rotor.map('Z'), 'B');
        assert!(rotor.rotate(-3));
        assert_eq!(rotor.position(), 25);
        assert_eq!(rotor.map('A'), 'Z');
        assert!(rotor.rotate(26 * 4));
        assert_eq!(rotor.position(), 25);
    }

    #[test]
    fn test_stepping_advances_once_per_map() {
        let mut rotor = Rotor::latin().with_mode(RotorMode::Stepping);
        assert_eq!(rotor.map('A'), 'A');
        assert_eq!(rotor.map('A'), 'B');
        assert_eq!(rotor.map(' '), ' ');
        assert_eq!(rotor.position(), 3);
    }

    #[test]
    fn test_custom_alphabet() {
        let mut rotor = Rotor::new("abc", -1, RotorMode::Fixed).unwrap();
        assert_eq!(rotor.position(), 2);
        assert_eq!(rotor.map('a'), 'c');
        assert_eq!(rotor.map('A'), 'A');
    }

    #[test]
    fn test_invalid_alphabets() {
        assert_eq!(Rotor::new("", 0, RotorMode::Fixed), Err(RotorError::EmptyAlphabet));
        assert_eq!(
            Rotor::new("ABCA", 0, RotorMode::Fixed),
            Err(RotorError::DuplicateSymbol('A'))
        );
    }

    #[test]
    fn test_table_mapper() {
        let mut table: TableMapper = [('a', 'z'), ('b', 'y')].into_iter().collect();
        assert_eq!(table.map('a'), 'z');
        assert_eq!(table.map('c'), 'c');
        assert!(!table.rotate(1));
        assert_eq!(table.len(), 2);
    }
}
