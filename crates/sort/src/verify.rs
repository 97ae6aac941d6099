//! Result checks shared by the tests and the benchmark.

use rayon::prelude::*;

use crate::error::{Result, SortError};

/// Element-wise comparison; reports the first differing index.
pub fn check_matches(actual: &[u32], expected: &[u32]) -> Result<()> {
    if actual.len() != expected.len() {
        return Err(SortError::LengthMismatch {
            expected: expected.len(),
            actual: actual.len(),
        });
    }
    match actual.iter().zip(expected).position(|(a, e)| a != e) {
        Some(index) => Err(SortError::Mismatch {
            index,
            expected: expected[index],
            actual: actual[index],
        }),
        None => Ok(()),
    }
}

/// Index of the first element smaller than its predecessor.
pub fn first_unsorted(keys: &[u32]) -> Option<usize> {
    keys.windows(2).position(|pair| pair[0] > pair[1]).map(|i| i + 1)
}

pub fn is_sorted(keys: &[u32]) -> bool {
    first_unsorted(keys).is_none()
}

/// Whether `a` and `b` hold the same multiset of keys.
pub fn is_permutation(a: &[u32], b: &[u32]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut a = a.to_vec();
    let mut b = b.to_vec();
    a.par_sort_unstable();
    b.par_sort_unstable();
    a == b
}
