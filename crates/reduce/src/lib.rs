//! Summation of `u32` arrays on the host and on the GPU.
//!
//! Five kernels compute the same wrapping total with different ways of
//! splitting the work; `sum_bench` times them against sequential and
//! rayon sums.

pub mod error;
pub mod host;
pub mod sum;

pub use error::{ReduceError, Result};
pub use host::{random_values, sum_parallel, sum_sequential};
pub use sum::{GpuSum, SumConfig, SumKernel, MAX_VALUES};
