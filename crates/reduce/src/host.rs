//! Host sums and input generation.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;

/// Wrapping sum in index order.
pub fn sum_sequential(values: &[u32]) -> u32 {
    values.iter().fold(0u32, |acc, &v| acc.wrapping_add(v))
}

/// Wrapping sum split across the rayon pool.
pub fn sum_parallel(values: &[u32]) -> u32 {
    values
        .par_iter()
        .fold(|| 0u32, |acc, &v| acc.wrapping_add(v))
        .reduce(|| 0u32, u32::wrapping_add)
}

/// `n` values small enough that their exact sum fits in `u32`.
pub fn random_values(n: usize, seed: u64) -> Vec<u32> {
    let max = u32::MAX / u32::try_from(n).unwrap_or(u32::MAX).max(1);
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..n).map(|_| rng.gen_range(0..=max)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sums_agree() {
        let values = random_values(100_000, 42);
        assert_eq!(sum_sequential(&values), sum_parallel(&values));
        let exact: u64 = values.iter().map(|&v| v as u64).sum();
        assert_eq!(sum_sequential(&values) as u64, exact);
    }

    #[test]
    fn test_sums_wrap() {
        let values = [u32::MAX, 2, u32::MAX];
        assert_eq!(sum_sequential(&values), 0);
        assert_eq!(sum_parallel(&values), 0);
        assert_eq!(sum_sequential(&[]), 0);
    }
}
