//! Pass orchestration: 8 x (count, cleanup, scan, scatter) with the key
//! buffers swapping roles after every pass.

use compute::{DeviceBuffer, GpuContext};

use crate::cleanup::{zero_host, Cleanup};
use crate::config::SortConfig;
use crate::error::{Result, SortError};
use crate::histogram::{count_host, HistogramBuilder};
use crate::partition::WorkPartition;
use crate::ping_pong::PingPong;
use crate::scan::{accumulate_rounds_host, PrefixScan, ScanWorkspace};
use crate::scatter::{permute_host, Scatter};
use crate::shaders::RadixSources;

/// Largest key count a sorter accepts. Keeps every thread index of a
/// folded launch inside `u32`.
pub const MAX_KEYS: usize = i32::MAX as usize;

/// Tables captured after one pass of [`RadixSorter::run_traced`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PassTrace {
    pub shift: u32,
    /// Bucket-major counts produced by `count_step`.
    pub histogram: Vec<u32>,
    /// Exclusive scan of `histogram`.
    pub offsets: Vec<u32>,
}

/// GPU least-significant-digit radix sort.
///
/// Owns the compiled kernels and the device buffers, which are reused and
/// only ever grow across calls to [`upload`](RadixSorter::upload).
pub struct RadixSorter {
    config: SortConfig,
    partition: WorkPartition,
    histogram: HistogramBuilder,
    cleanup: Cleanup,
    scan: PrefixScan,
    scatter: Scatter,
    keys: PingPong<DeviceBuffer<u32>>,
    workspace: ScanWorkspace,
}

impl RadixSorter {
    pub fn new(ctx: &GpuContext, config: SortConfig) -> Result<Self> {
        config.validate()?;
        let sources = RadixSources::new(&config);
        let local = config.work_group_size;

        log::info!(
            "Building radix sort kernels: work-group {}, {} bits per digit, {} passes",
            local,
            config.digit_bits,
            config.pass_count()
        );

        Ok(Self {
            config,
            partition: WorkPartition::new(0, &config),
            histogram: HistogramBuilder::new(ctx, &sources.count, local)?,
            cleanup: Cleanup::new(ctx, &sources.cleanup, local)?,
            scan: PrefixScan::new(ctx, &sources.prefix, local)?,
            scatter: Scatter::new(ctx, &sources.scatter, local)?,
            keys: PingPong::new(
                DeviceBuffer::new(ctx, "Keys A", 0)?,
                DeviceBuffer::new(ctx, "Keys B", 0)?,
            ),
            workspace: ScanWorkspace::new(ctx, 0)?,
        })
    }

    pub fn config(&self) -> &SortConfig {
        &self.config
    }

    pub fn partition(&self) -> &WorkPartition {
        &self.partition
    }

    pub fn pass_count(&self) -> u32 {
        self.config.pass_count()
    }

    /// Number of keys currently on the device.
    pub fn len(&self) -> usize {
        self.partition.n as usize
    }

    pub fn is_empty(&self) -> bool {
        self.partition.n == 0
    }

    /// Copy `keys` to the device, sizing every buffer for them.
    pub fn upload(&mut self, keys: &[u32]) -> Result<()> {
        if keys.len() > MAX_KEYS {
            return Err(SortError::TooManyKeys {
                count: keys.len(),
                max: MAX_KEYS,
            });
        }
        let partition = WorkPartition::new(keys.len() as u32, &self.config);

        self.keys.reset();
        let (front, back) = self.keys.split_mut();
        front.resize(keys.len())?;
        back.resize(keys.len())?;
        front.write(keys)?;
        self.workspace.resize(partition.hists_size() as usize)?;

        log::debug!(
            "Uploaded {} keys ({} work-groups, {} histogram cells)",
            partition.n,
            partition.work_group_count,
            partition.hists_size()
        );
        self.partition = partition;
        Ok(())
    }

    /// Sort the uploaded keys in place on the device.
    pub fn run(&mut self) -> Result<()> {
        self.run_passes(None)
    }

    /// Like [`run`](RadixSorter::run), reading back each pass's histogram
    /// and offset tables.
    pub fn run_traced(&mut self) -> Result<Vec<PassTrace>> {
        let mut traces = Vec::with_capacity(self.config.pass_count() as usize);
        self.run_passes(Some(&mut traces))?;
        Ok(traces)
    }

    fn run_passes(&mut self, mut trace: Option<&mut Vec<PassTrace>>) -> Result<()> {
        let partition = self.partition;
        if partition.n == 0 {
            return Ok(());
        }
        let hists_size = partition.hists_size();

        for shift in self.config.shifts() {
            log::trace!("Radix pass at bit {}", shift);
            let (input, output) = self.keys.split();

            self.histogram
                .build(input, self.workspace.histogram(), &partition, shift)?;
            let histogram = match trace {
                Some(_) => self.workspace.histogram().read_vec()?,
                None => Vec::new(),
            };

            self.cleanup.zero(&self.workspace.result, hists_size)?;
            self.scan.run(&mut self.workspace, hists_size)?;
            self.scatter
                .permute(input, output, self.workspace.offsets(), &partition, shift)?;

            if let Some(traces) = trace.as_mut() {
                traces.push(PassTrace {
                    shift,
                    histogram,
                    offsets: self.workspace.offsets().read_vec()?,
                });
            }
            self.keys.swap();
        }
        Ok(())
    }

    /// The sorted keys after [`run`](RadixSorter::run).
    pub fn download(&self) -> Result<Vec<u32>> {
        Ok(self.keys.front().read_vec()?)
    }

    /// Device buffer holding the current key order.
    pub fn keys(&self) -> &DeviceBuffer<u32> {
        self.keys.front()
    }

    /// Upload, sort and download in one call. Empty input still replaces
    /// the previous upload; no kernel is launched for it.
    pub fn sort(&mut self, keys: &[u32]) -> Result<Vec<u32>> {
        self.upload(keys)?;
        self.run()?;
        self.download()
    }
}

/// Host emulation of the full pass sequence, stage by stage.
pub fn sort_host(keys: &[u32], config: &SortConfig) -> Result<Vec<u32>> {
    sort_host_traced(keys, config).map(|(sorted, _)| sorted)
}

/// [`sort_host`] plus the per-pass tables.
pub fn sort_host_traced(keys: &[u32], config: &SortConfig) -> Result<(Vec<u32>, Vec<PassTrace>)> {
    config.validate()?;
    if keys.len() > MAX_KEYS {
        return Err(SortError::TooManyKeys {
            count: keys.len(),
            max: MAX_KEYS,
        });
    }
    let partition = WorkPartition::new(keys.len() as u32, config);
    let mut traces = Vec::with_capacity(config.pass_count() as usize);
    if keys.is_empty() {
        return Ok((Vec::new(), traces));
    }

    let mut buffers = PingPong::new(keys.to_vec(), Vec::new());
    let mut offsets = vec![0u32; partition.hists_size() as usize];
    for shift in config.shifts() {
        let histogram = count_host(buffers.front(), &partition, shift);
        zero_host(&mut offsets, histogram.len());
        accumulate_rounds_host(&histogram, &mut offsets);
        let permuted = permute_host(buffers.front(), &offsets, &partition, shift)?;
        *buffers.back_mut() = permuted;
        traces.push(PassTrace {
            shift,
            histogram,
            offsets: offsets.clone(),
        });
        buffers.swap();
    }
    Ok((buffers.into_front(), traces))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_sort_small_cases() {
        let config = SortConfig::default();
        assert_eq!(sort_host(&[], &config).unwrap(), Vec::<u32>::new());
        assert_eq!(sort_host(&[7], &config).unwrap(), vec![7]);
        assert_eq!(sort_host(&[3, 1, 2], &config).unwrap(), vec![1, 2, 3]);
        assert_eq!(
            sort_host(&[u32::MAX, 0, 0x8000_0000, 1], &config).unwrap(),
            vec![0, 1, 0x8000_0000, u32::MAX]
        );
    }

    #[test]
    fn test_host_sort_matches_std_across_group_boundaries() {
        let config = SortConfig::default();
        for n in [127usize, 128, 129, 1000, 5000] {
            let keys: Vec<u32> = (0..n as u32).map(|i| i.wrapping_mul(2_654_435_761)).collect();
            let mut expected = keys.clone();
            expected.sort_unstable();
            assert_eq!(sort_host(&keys, &config).unwrap(), expected, "n = {n}");
        }
    }

    #[test]
    fn test_traces_conserve_counts() {
        let config = SortConfig::default();
        let keys: Vec<u32> = (0..777u32).map(|i| i.wrapping_mul(40_503) ^ 0xDEAD_BEEF).collect();
        let (_, traces) = sort_host_traced(&keys, &config).unwrap();
        assert_eq!(traces.len(), 8);
        for trace in &traces {
            assert_eq!(trace.histogram.iter().sum::<u32>(), 777);
            assert_eq!(trace.offsets[0], 0);
            let last = trace.offsets.len() - 1;
            assert_eq!(trace.offsets[last] + trace.histogram[last], 777);
        }
    }

    #[test]
    fn test_host_sort_rejects_bad_config() {
        let config = SortConfig {
            work_group_size: 8,
            digit_bits: 4,
        };
        assert!(matches!(
            sort_host(&[1, 2], &config),
            Err(SortError::InvalidConfig(_))
        ));
    }
}
