use std::fmt;

use crate::error::RngError;

/// Bits as drawn from a source, most significant first.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BitString(String);

impl BitString {
    pub fn with_capacity(n: usize) -> Self {
        Self(String::with_capacity(n))
    }

    pub fn push(&mut self, bit: bool) {
        self.0.push(if bit { '1' } else { '0' });
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Unsigned big-endian value of the bits.
    pub fn to_u64(&self) -> Result<u64, RngError> {
        if self.0.len() > 64 {
            return Err(RngError::Overflow(self.0.clone()));
        }
        Ok(self
            .0
            .bytes()
            .fold(0u64, |acc, b| (acc << 1) | u64::from(b == b'1')))
    }
}

impl FromIterator<bool> for BitString {
    fn from_iter<I: IntoIterator<Item = bool>>(iter: I) -> Self {
        let mut bits = BitString::default();
        for bit in iter {
            bits.push(bit);
        }
        bits
    }
}

impl fmt::Display for BitString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_msb_first() {
        let bits: BitString = [true, false, true].into_iter().collect();
        assert_eq!(bits.as_str(), "101");
        assert_eq!(bits.to_u64().unwrap(), 5);
        assert_eq!(BitString::default().to_u64().unwrap(), 0);
    }

    #[test]
    fn rejects_more_than_64_bits() {
        let bits: BitString = std::iter::repeat_n(true, 65).collect();
        assert!(matches!(bits.to_u64(), Err(RngError::Overflow(_))));
    }
}
