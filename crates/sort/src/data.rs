//! Reproducible key generation.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Default upper bound of generated keys, the positive `i32` range.
pub const DEFAULT_MAX_VALUE: u32 = i32::MAX as u32;

/// `n` keys uniform in `0..=max_value`, identical for identical seeds.
pub fn random_keys(n: usize, seed: u64, max_value: u32) -> Vec<u32> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..n).map(|_| rng.gen_range(0..=max_value)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seeded_generation_is_reproducible() {
        let a = random_keys(1000, 42, DEFAULT_MAX_VALUE);
        assert_eq!(a, random_keys(1000, 42, DEFAULT_MAX_VALUE));
        assert_ne!(a, random_keys(1000, 43, DEFAULT_MAX_VALUE));
        assert!(a.iter().all(|&k| k <= DEFAULT_MAX_VALUE));
    }

    #[test]
    fn test_max_value_bounds_keys() {
        let keys = random_keys(500, 7, 3);
        assert!(keys.iter().all(|&k| k <= 3));
        assert!(random_keys(10, 1, u32::MAX).len() == 10);
    }
}
