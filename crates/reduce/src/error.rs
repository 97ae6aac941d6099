use compute::GpuError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReduceError {
    #[error(transparent)]
    Gpu(#[from] GpuError),

    #[error("invalid sum configuration: {0}")]
    InvalidConfig(String),

    #[error("{count} values exceed the supported maximum of {max}")]
    TooManyValues { count: usize, max: usize },

    #[error("{kernel} result should be consistent! {actual} != {expected}")]
    Mismatch {
        kernel: String,
        expected: u32,
        actual: u32,
    },
}

pub type Result<T, E = ReduceError> = std::result::Result<T, E>;
