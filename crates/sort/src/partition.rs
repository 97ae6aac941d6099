//! How a key array is split into work-groups and how the histogram
//! table is laid out.

use compute::WorkSize;

use crate::config::SortConfig;

/// Work split for `n` keys: one key per thread, `work_group_size` threads
/// per group, the last group possibly partial.
///
/// The histogram table is bucket-major: all groups' counters for bucket 0,
/// then bucket 1, and so on. An exclusive scan over that order therefore
/// yields, for every `(bucket, group)` cell, the first output slot of that
/// group's keys with that digit.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct WorkPartition {
    pub n: u32,
    pub work_group_size: u32,
    pub work_group_count: u32,
    pub bucket_count: u32,
}

impl WorkPartition {
    pub fn new(n: u32, config: &SortConfig) -> Self {
        Self {
            n,
            work_group_size: config.work_group_size,
            work_group_count: n.div_ceil(config.work_group_size),
            bucket_count: config.bucket_count(),
        }
    }

    /// Thread count of the key-parallel stages, a whole number of groups.
    pub fn global_work_size(&self) -> u32 {
        self.work_group_count * self.work_group_size
    }

    /// Number of cells in the histogram table.
    pub fn hists_size(&self) -> u32 {
        self.bucket_count * self.work_group_count
    }

    /// Launch size for `count_step` and `scatter`.
    pub fn keys_work(&self) -> WorkSize {
        WorkSize::for_elements(self.work_group_size, self.n)
    }

    /// Index of the `(bucket, group)` counter in the histogram table.
    pub fn cell(&self, bucket: u32, group: u32) -> usize {
        (bucket * self.work_group_count + group) as usize
    }

    /// Number of keys owned by `group`.
    pub fn group_len(&self, group: u32) -> u32 {
        let start = group * self.work_group_size;
        self.n.saturating_sub(start).min(self.work_group_size)
    }

    /// Digit of `key` for the pass starting at bit `shift`.
    pub fn digit(&self, key: u32, shift: u32) -> u32 {
        (key >> shift) & (self.bucket_count - 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_last_group() {
        let partition = WorkPartition::new(1000, &SortConfig::default());
        assert_eq!(partition.work_group_count, 8);
        assert_eq!(partition.global_work_size(), 1024);
        assert_eq!(partition.hists_size(), 128);
        assert_eq!(partition.group_len(0), 128);
        assert_eq!(partition.group_len(7), 1000 - 7 * 128);
        assert_eq!(partition.group_len(8), 0);
    }

    #[test]
    fn test_exact_multiple_has_no_partial_group() {
        let partition = WorkPartition::new(256, &SortConfig::default());
        assert_eq!(partition.work_group_count, 2);
        assert_eq!(partition.group_len(1), 128);
        assert_eq!(partition.keys_work().global, 256);
    }

    #[test]
    fn test_table_is_bucket_major() {
        let partition = WorkPartition::new(300, &SortConfig::default());
        assert_eq!(partition.work_group_count, 3);
        assert_eq!(partition.cell(0, 2), 2);
        assert_eq!(partition.cell(1, 0), 3);
        assert_eq!(partition.cell(15, 2), 47);
        assert_eq!(partition.cell(15, 2) + 1, partition.hists_size() as usize);
    }

    #[test]
    fn test_digit_extraction() {
        let partition = WorkPartition::new(1, &SortConfig::default());
        assert_eq!(partition.digit(0xABCD_1234, 0), 0x4);
        assert_eq!(partition.digit(0xABCD_1234, 12), 0x1);
        assert_eq!(partition.digit(0xABCD_1234, 28), 0xA);

        // With 3-bit digits the top pass only sees the two remaining bits.
        let config = SortConfig {
            work_group_size: 128,
            digit_bits: 3,
        };
        assert_eq!(WorkPartition::new(1, &config).digit(u32::MAX, 30), 3);
    }

    #[test]
    fn test_empty_input() {
        let partition = WorkPartition::new(0, &SortConfig::default());
        assert_eq!(partition.work_group_count, 0);
        assert_eq!(partition.hists_size(), 0);
    }
}
