//! wgpu compute plumbing shared by the sort and reduction crates.
//!
//! - [`GpuContext`]: adapter selection, device and the single in-order queue
//! - [`DeviceBuffer`]: typed storage buffer with upload and blocking readback
//! - [`Kernel`]: WGSL entry point compiled against a typed argument signature
//! - [`Timer`]: lap timer for benchmarks

pub mod buffer;
pub mod context;
pub mod error;
pub mod kernel;
pub mod timer;

pub use buffer::DeviceBuffer;
pub use context::{describe_adapter, list_adapters, DeviceSelector, GpuContext};
pub use error::{GpuError, Result};
pub use kernel::{ArgKind, Kernel, KernelArg, KernelSource, WorkSize};
pub use timer::Timer;
