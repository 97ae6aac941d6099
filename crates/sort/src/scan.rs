//! Two-level exclusive prefix scan over the histogram table.
//!
//! The scan keeps a pyramid of partial sums in a ping-pong pair of level
//! buffers. At round `r` the front level holds sums of aligned blocks of
//! `2^r` input elements. `prefix_step` adds, to every index whose bit `r` is
//! set, the block immediately preceding its own aligned `2^r` block; over all
//! rounds that adds up exactly the elements before the index. `reduce_step`
//! then pairs blocks up for round `r + 1`. The result buffer must be zeroed
//! before the first round.

use compute::{ArgKind, DeviceBuffer, GpuContext, Kernel, KernelArg, KernelSource, Result, WorkSize};
use rayon::prelude::*;

use crate::ping_pong::PingPong;
use crate::shaders::{PREFIX_ENTRY, REDUCE_ENTRY};

/// Number of prefix rounds for `len` elements: `ceil(log2(len))`.
pub fn rounds(len: u32) -> u32 {
    if len <= 1 {
        0
    } else {
        u32::BITS - (len - 1).leading_zeros()
    }
}

/// Device buffers of one scan: the level pyramid and the result.
///
/// The front level doubles as the histogram table: `count_step` writes
/// into it and the scan consumes it in place.
pub struct ScanWorkspace {
    pub levels: PingPong<DeviceBuffer<u32>>,
    pub result: DeviceBuffer<u32>,
}

impl ScanWorkspace {
    pub fn new(ctx: &GpuContext, len: usize) -> Result<Self> {
        Ok(Self {
            levels: PingPong::new(
                DeviceBuffer::new(ctx, "Scan Level A", len)?,
                DeviceBuffer::new(ctx, "Scan Level B", len)?,
            ),
            result: DeviceBuffer::new(ctx, "Scan Result", len)?,
        })
    }

    pub fn resize(&mut self, len: usize) -> Result<()> {
        let (front, back) = self.levels.split_mut();
        front.resize(len)?;
        back.resize(len)?;
        self.result.resize(len)
    }

    /// Input of the next scan.
    pub fn histogram(&self) -> &DeviceBuffer<u32> {
        self.levels.front()
    }

    pub fn histogram_mut(&mut self) -> &mut DeviceBuffer<u32> {
        self.levels.front_mut()
    }

    /// Output of the last scan.
    pub fn offsets(&self) -> &DeviceBuffer<u32> {
        &self.result
    }
}

/// Compiled `prefix_step` and `reduce_step` kernels.
pub struct PrefixScan {
    prefix_step: Kernel,
    reduce_step: Kernel,
}

impl PrefixScan {
    pub fn new(ctx: &GpuContext, source: &KernelSource, work_group_size: u32) -> Result<Self> {
        let signature = [
            ArgKind::Buffer { read_only: true },
            ArgKind::Buffer { read_only: false },
            ArgKind::Scalar,
            ArgKind::Scalar,
        ];
        let mut prefix_step = Kernel::new(source, PREFIX_ENTRY, work_group_size, &signature);
        prefix_step.compile(ctx)?;
        let mut reduce_step = Kernel::new(source, REDUCE_ENTRY, work_group_size, &signature);
        reduce_step.compile(ctx)?;
        Ok(Self {
            prefix_step,
            reduce_step,
        })
    }

    /// Exclusive scan of the first `len` cells of `workspace.histogram()`
    /// into `workspace.result`, which must already be zeroed.
    ///
    /// Leaves the level buffers holding partial sums; the histogram is not
    /// preserved.
    pub fn run(&self, workspace: &mut ScanWorkspace, len: u32) -> Result<()> {
        let rounds = rounds(len);
        let local = self.prefix_step.workgroup_size();
        log::trace!("Prefix scan: {} elements, {} rounds", len, rounds);

        for round in 0..rounds {
            let (level, next) = workspace.levels.split();
            self.prefix_step.exec(
                WorkSize::for_elements(local, len),
                &[
                    KernelArg::buffer(level),
                    KernelArg::buffer(&workspace.result),
                    len.into(),
                    round.into(),
                ],
            )?;

            // The last round has nothing left to pair up.
            if round + 1 == rounds {
                break;
            }
            let next_len = len >> (round + 1);
            self.reduce_step.exec(
                WorkSize::for_elements(local, next_len),
                &[
                    KernelArg::buffer(level),
                    KernelArg::buffer(next),
                    next_len.into(),
                    0u32.into(),
                ],
            )?;
            workspace.levels.swap();
        }
        Ok(())
    }
}

/// Host emulation of one `prefix_step` launch.
pub fn prefix_step_host(level: &[u32], result: &mut [u32], len: usize, round: u32) {
    result[..len]
        .par_iter_mut()
        .enumerate()
        .for_each(|(i, sum)| {
            let block = i >> round;
            if block & 1 == 1 {
                *sum = sum.wrapping_add(level[block - 1]);
            }
        });
}

/// Host emulation of one `reduce_step` launch producing `count` entries.
pub fn reduce_step_host(level: &[u32], next: &mut [u32], count: usize) {
    next[..count]
        .par_iter_mut()
        .enumerate()
        .for_each(|(k, sum)| *sum = level[2 * k].wrapping_add(level[2 * k + 1]));
}

/// Exclusive scan through the same round structure as [`PrefixScan::run`].
pub fn exclusive_scan_host(input: &[u32]) -> Vec<u32> {
    let mut result = vec![0u32; input.len()];
    accumulate_rounds_host(input, &mut result);
    result
}

/// Run every prefix round of `input` into `result`, which must hold zeros.
pub fn accumulate_rounds_host(input: &[u32], result: &mut [u32]) {
    let len = input.len();
    let mut levels = PingPong::new(input.to_vec(), vec![0u32; len]);

    let rounds = rounds(len as u32);
    for round in 0..rounds {
        prefix_step_host(levels.front(), result, len, round);
        if round + 1 == rounds {
            break;
        }
        let next_len = len >> (round + 1);
        let (level, next) = levels.split_mut();
        reduce_step_host(level, next, next_len);
        levels.swap();
    }
}

/// Sequential exclusive scan, the ground truth for the tests.
pub fn exclusive_scan_reference(input: &[u32]) -> Vec<u32> {
    let mut sum = 0u32;
    input
        .iter()
        .map(|&value| {
            let before = sum;
            sum = sum.wrapping_add(value);
            before
        })
        .collect()
}
