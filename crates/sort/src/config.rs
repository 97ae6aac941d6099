//! Sort configuration and the quantities derived from it.

use crate::error::SortError;

/// Width of a sort key in bits.
pub const KEY_BITS: u32 = u32::BITS;

/// Largest work-group the kernels are specialized for.
pub const MAX_WORK_GROUP_SIZE: u32 = 256;

/// Largest digit width; 8 bits already needs 256 group-local counters.
pub const MAX_DIGIT_BITS: u32 = 8;

/// Tunables for the radix sort. Both values are baked into the WGSL
/// sources at kernel build time.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SortConfig {
    /// Threads per work-group; one key per thread.
    pub work_group_size: u32,
    /// Bits consumed per pass.
    pub digit_bits: u32,
}

impl Default for SortConfig {
    fn default() -> Self {
        Self {
            work_group_size: 128,
            digit_bits: 4,
        }
    }
}

impl SortConfig {
    pub fn validate(&self) -> Result<(), SortError> {
        if self.digit_bits == 0 || self.digit_bits > MAX_DIGIT_BITS {
            return Err(SortError::InvalidConfig(format!(
                "digit_bits must be in 1..={}, got {}",
                MAX_DIGIT_BITS, self.digit_bits
            )));
        }
        if !self.work_group_size.is_power_of_two() || self.work_group_size > MAX_WORK_GROUP_SIZE {
            return Err(SortError::InvalidConfig(format!(
                "work_group_size must be a power of two up to {}, got {}",
                MAX_WORK_GROUP_SIZE, self.work_group_size
            )));
        }
        // count_step clears and writes one counter per thread
        if self.work_group_size < self.bucket_count() {
            return Err(SortError::InvalidConfig(format!(
                "work_group_size {} is smaller than the {} buckets of a {}-bit digit",
                self.work_group_size,
                self.bucket_count(),
                self.digit_bits
            )));
        }
        Ok(())
    }

    pub fn bucket_count(&self) -> u32 {
        1 << self.digit_bits
    }

    pub fn digit_mask(&self) -> u32 {
        self.bucket_count() - 1
    }

    /// Number of digit passes needed to cover a whole key.
    pub fn pass_count(&self) -> u32 {
        KEY_BITS.div_ceil(self.digit_bits)
    }

    /// Bit offset of every pass, least significant digit first.
    pub fn shifts(&self) -> impl Iterator<Item = u32> {
        let digit_bits = self.digit_bits;
        (0..self.pass_count()).map(move |pass| pass * digit_bits)
    }
}
