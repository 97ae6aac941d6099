//! GPU radix sort of `u32` keys.
//!
//! Each pass sorts by one digit, least significant first:
//!
//! 1. `count_step` builds a per-work-group digit histogram,
//! 2. `cleanup` zeroes the scan destination,
//! 3. the prefix scan turns the bucket-major histogram table into output
//!    offsets,
//! 4. `scatter` moves every key to its offset plus its rank within the group.
//!
//! With the default [`SortConfig`] that is 8 passes of 4 bits. Every stage
//! also has a host emulation (`*_host`) used as the reference in tests.

pub mod cleanup;
pub mod config;
pub mod data;
pub mod error;
pub mod histogram;
pub mod partition;
pub mod ping_pong;
pub mod scan;
pub mod scatter;
pub mod shaders;
pub mod sorter;
pub mod verify;

pub use config::SortConfig;
pub use error::{Result, SortError};
pub use partition::WorkPartition;
pub use ping_pong::{PingPong, Slot};
pub use sorter::{sort_host, sort_host_traced, PassTrace, RadixSorter, MAX_KEYS};
