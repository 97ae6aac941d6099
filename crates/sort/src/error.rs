use compute::GpuError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SortError {
    #[error(transparent)]
    Gpu(#[from] GpuError),

    #[error("invalid sort configuration: {0}")]
    InvalidConfig(String),

    #[error("{count} keys exceed the supported maximum of {max}")]
    TooManyKeys { count: usize, max: usize },

    /// An offset table sent a key past the end of the output.
    #[error("key {key} of group {group} maps to slot {slot}, outside the {len} output slots")]
    OffsetOutOfRange {
        group: usize,
        key: u32,
        slot: u64,
        len: usize,
    },

    /// Element-wise verification failure.
    #[error("GPU results should be equal to CPU results! But {actual} != {expected} at index {index}")]
    Mismatch {
        index: usize,
        expected: u32,
        actual: u32,
    },

    #[error("result has {actual} elements, expected {expected}")]
    LengthMismatch { expected: usize, actual: usize },
}

pub type Result<T, E = SortError> = std::result::Result<T, E>;
