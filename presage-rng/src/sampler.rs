//! Rejection sampling on top of raw bit strings.
//!
//! Both samplers draw just enough bits to cover the upper bound and redraw
//! until the value lands in range, so no value is favoured by a modulo.

use log::debug;

use crate::error::RngError;
use crate::source::RandomSource;

/// Number of binary digits of `n`, never less than one.
pub fn bit_length(n: u64) -> usize {
    (u64::BITS - n.leading_zeros()).max(1) as usize
}

/// Whole seconds uniformly drawn from `[min, max]`.
pub fn sample_interval<S: RandomSource + ?Sized>(
    source: &mut S,
    min: u64,
    max: u64,
) -> Result<u64, RngError> {
    if min > max {
        return Err(RngError::InvalidRange { min, max });
    }
    let width = bit_length(max);
    let mut draws = 0usize;
    loop {
        draws += 1;
        let value = source.get_bits(width)?.to_u64()?;
        if (min..=max).contains(&value) {
            debug!("interval {value}s from [{min}, {max}] after {draws} draw(s)");
            return Ok(value);
        }
    }
}

/// Index uniformly drawn from `[0, pool_size)`.
pub fn select_index<S: RandomSource + ?Sized>(
    source: &mut S,
    pool_size: usize,
) -> Result<usize, RngError> {
    if pool_size == 0 {
        return Err(RngError::EmptyPool);
    }
    let width = bit_length(pool_size as u64);
    loop {
        let value = source.get_bits(width)?.to_u64()?;
        if value < pool_size as u64 {
            return Ok(value as usize);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{PseudoRng, ScriptedSource};

    #[test]
    fn bit_length_matches_binary_width() {
        assert_eq!(bit_length(0), 1);
        assert_eq!(bit_length(1), 1);
        assert_eq!(bit_length(5), 3);
        assert_eq!(bit_length(8), 4);
        assert_eq!(bit_length(45), 6);
    }

    #[test]
    fn interval_stays_in_bounds() {
        let mut rng = PseudoRng::seeded(7);
        for (min, max) in [(0, 0), (0, 5), (2, 5), (3, 3), (10, 99)] {
            for _ in 0..10_000 {
                let v = sample_interval(&mut rng, min, max).unwrap();
                assert!((min..=max).contains(&v), "{v} outside [{min}, {max}]");
            }
        }
    }

    #[test]
    fn interval_rejects_out_of_range_draws() {
        // max = 5 needs three bits: 111 (7) and 000 (0, below min) are redrawn
        let mut source = ScriptedSource::new("111000011");
        assert_eq!(sample_interval(&mut source, 2, 5).unwrap(), 3);
    }

    #[test]
    fn inverted_range_is_an_error() {
        let mut rng = PseudoRng::seeded(1);
        assert!(matches!(
            sample_interval(&mut rng, 4, 2),
            Err(RngError::InvalidRange { min: 4, max: 2 })
        ));
    }

    #[test]
    fn index_stays_in_pool() {
        let mut rng = PseudoRng::seeded(11);
        for size in [1usize, 2, 5, 8, 33] {
            for _ in 0..10_000 {
                assert!(select_index(&mut rng, size).unwrap() < size);
            }
        }
        assert!(matches!(select_index(&mut rng, 0), Err(RngError::EmptyPool)));
    }

    #[test]
    fn index_redraws_past_pool_end() {
        // pool of 5 reads three bits; 101 and 110 are redrawn
        let mut source = ScriptedSource::new("101110100");
        assert_eq!(select_index(&mut source, 5).unwrap(), 4);
    }
}
