//! Stable placement of every key at its scanned offset.

use compute::{ArgKind, DeviceBuffer, GpuContext, Kernel, KernelArg, KernelSource, Result};
use rayon::prelude::*;

use crate::error::SortError;
use crate::partition::WorkPartition;
use crate::shaders::SCATTER_ENTRY;

pub struct Scatter {
    kernel: Kernel,
}

impl Scatter {
    pub fn new(ctx: &GpuContext, source: &KernelSource, work_group_size: u32) -> Result<Self> {
        let mut kernel = Kernel::new(
            source,
            SCATTER_ENTRY,
            work_group_size,
            &[
                ArgKind::Buffer { read_only: true },
                ArgKind::Buffer { read_only: false },
                ArgKind::Buffer { read_only: true },
                ArgKind::Scalar,
                ArgKind::Scalar,
                ArgKind::Scalar,
            ],
        );
        kernel.compile(ctx)?;
        Ok(Self { kernel })
    }

    /// Write every key of `input[0..n)` to `output` at
    /// `offsets[cell(digit, group)] + rank`. `input` and `output` must not
    /// be the same buffer.
    pub fn permute(
        &self,
        input: &DeviceBuffer<u32>,
        output: &DeviceBuffer<u32>,
        offsets: &DeviceBuffer<u32>,
        partition: &WorkPartition,
        shift: u32,
    ) -> Result<()> {
        self.kernel.exec(
            partition.keys_work(),
            &[
                KernelArg::buffer(input),
                KernelArg::buffer(output),
                KernelArg::buffer(offsets),
                partition.n.into(),
                shift.into(),
                partition.work_group_count.into(),
            ],
        )
    }
}

/// Host emulation of `scatter`. Ranks are assigned in input order within
/// each group, matching the kernel.
///
/// Fails with [`SortError::OffsetOutOfRange`] if `offsets` sends any key
/// past the end of the output, as a table that does not belong to `keys`
/// would.
pub fn permute_host(
    keys: &[u32],
    offsets: &[u32],
    partition: &WorkPartition,
    shift: u32,
) -> Result<Vec<u32>, SortError> {
    let keys = &keys[..partition.n as usize];
    let buckets = partition.bucket_count as usize;

    let placements: Vec<Vec<(u64, u32)>> = keys
        .par_chunks(partition.work_group_size as usize)
        .enumerate()
        .map(|(group, chunk)| {
            let mut seen = vec![0u32; buckets];
            chunk
                .iter()
                .map(|&key| {
                    let digit = partition.digit(key, shift);
                    let base = offsets[partition.cell(digit, group as u32)];
                    let rank = seen[digit as usize];
                    seen[digit as usize] += 1;
                    (base as u64 + rank as u64, key)
                })
                .collect()
        })
        .collect();

    let mut output = vec![0u32; keys.len()];
    let len = output.len();
    for (group, placed) in placements.into_iter().enumerate() {
        for (slot, key) in placed {
            if slot >= len as u64 {
                return Err(SortError::OffsetOutOfRange {
                    group,
                    key,
                    slot,
                    len,
                });
            }
            output[slot as usize] = key;
        }
    }
    Ok(output)
}
