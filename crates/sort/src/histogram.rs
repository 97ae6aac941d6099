//! Per-work-group digit histograms.

use compute::{ArgKind, DeviceBuffer, GpuContext, Kernel, KernelArg, KernelSource, Result};
use rayon::prelude::*;

use crate::partition::WorkPartition;
use crate::shaders::COUNT_ENTRY;

/// Runs `count_step`: for one digit position, fills the bucket-major
/// histogram table with how many keys of each group carry each digit.
pub struct HistogramBuilder {
    kernel: Kernel,
}

impl HistogramBuilder {
    pub fn new(ctx: &GpuContext, source: &KernelSource, work_group_size: u32) -> Result<Self> {
        let mut kernel = Kernel::new(
            source,
            COUNT_ENTRY,
            work_group_size,
            &[
                ArgKind::Buffer { read_only: true },
                ArgKind::Buffer { read_only: false },
                ArgKind::Scalar,
                ArgKind::Scalar,
                ArgKind::Scalar,
            ],
        );
        kernel.compile(ctx)?;
        Ok(Self { kernel })
    }

    /// Overwrite the first `partition.hists_size()` cells of `histogram`.
    /// Keys past `partition.n` are never read.
    pub fn build(
        &self,
        keys: &DeviceBuffer<u32>,
        histogram: &DeviceBuffer<u32>,
        partition: &WorkPartition,
        shift: u32,
    ) -> Result<()> {
        self.kernel.exec(
            partition.keys_work(),
            &[
                KernelArg::buffer(keys),
                KernelArg::buffer(histogram),
                partition.n.into(),
                shift.into(),
                partition.work_group_count.into(),
            ],
        )
    }
}

/// Host emulation of `count_step` over the first `partition.n` keys.
pub fn count_host(keys: &[u32], partition: &WorkPartition, shift: u32) -> Vec<u32> {
    let keys = &keys[..partition.n as usize];
    let buckets = partition.bucket_count as usize;

    let per_group: Vec<Vec<u32>> = keys
        .par_chunks(partition.work_group_size as usize)
        .map(|group| {
            let mut counts = vec![0u32; buckets];
            for &key in group {
                counts[partition.digit(key, shift) as usize] += 1;
            }
            counts
        })
        .collect();

    let mut table = vec![0u32; partition.hists_size() as usize];
    for (group, counts) in per_group.iter().enumerate() {
        for (bucket, &count) in counts.iter().enumerate() {
            table[partition.cell(bucket as u32, group as u32)] = count;
        }
    }
    table
}
