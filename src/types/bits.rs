//! BitWord type for bit-packed simulator words.

use serde::{Deserialize, Serialize};

/// A bit-packed word as read from the simulator (lights, failure flags).
///
/// The word itself is never written into a decoded record; individual bits
/// are extracted into boolean destination fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BitWord(pub u64);

impl BitWord {
    /// Create a new BitWord from a raw integer.
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    /// Interpret a signed raw value as a word (two's complement reinterpret).
    pub fn from_raw(value: i64) -> Self {
        Self(value as u64)
    }

    /// Check if a specific bit is set.
    pub fn is_set(&self, bit: u32) -> bool {
        bit < 64 && (self.0 & (1u64 << bit)) != 0
    }

    /// Get the raw value.
    pub fn value(&self) -> u64 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bit_extraction() {
        let word = BitWord::new(0b1010);
        assert!(word.is_set(1));
        assert!(!word.is_set(0));
        assert!(word.is_set(3));
        assert!(!word.is_set(2));
    }

    #[test]
    fn negative_raw_reinterprets() {
        // -1 is all bits set in two's complement
        let word = BitWord::from_raw(-1);
        assert!(word.is_set(0));
        assert!(word.is_set(63));
    }

    #[test]
    fn out_of_range_bit_is_clear() {
        let word = BitWord::new(u64::MAX);
        assert!(!word.is_set(64));
        assert!(!word.is_set(200));
    }
}
