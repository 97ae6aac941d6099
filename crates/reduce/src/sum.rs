//! Device summation: one compiled kernel per work-splitting strategy.

use std::fmt;

use compute::{ArgKind, DeviceBuffer, GpuContext, Kernel, KernelArg, KernelSource, WorkSize};

use crate::error::{ReduceError, Result};

const SUM_WGSL: &str = include_str!("shaders/sum.wgsl");

/// Largest input a [`GpuSum`] accepts. Keeps every per-thread start index
/// of a folded launch inside `u32`.
pub const MAX_VALUES: usize = i32::MAX as usize;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SumConfig {
    pub work_group_size: u32,
    /// Values summed by one thread in the loop kernels.
    pub values_per_thread: u32,
}

impl Default for SumConfig {
    fn default() -> Self {
        Self {
            work_group_size: 256,
            values_per_thread: 64,
        }
    }
}

impl SumConfig {
    pub fn validate(&self) -> Result<()> {
        // sum_local_tree halves the group every step
        if !self.work_group_size.is_power_of_two() || self.work_group_size > 256 {
            return Err(ReduceError::InvalidConfig(format!(
                "work_group_size must be a power of two up to 256, got {}",
                self.work_group_size
            )));
        }
        if self.values_per_thread == 0 {
            return Err(ReduceError::InvalidConfig(
                "values_per_thread must be positive".to_owned(),
            ));
        }
        Ok(())
    }

    pub fn source(&self) -> KernelSource {
        KernelSource::new("sum.wgsl", SUM_WGSL)
            .define("WORKGROUP_SIZE", self.work_group_size)
            .define("VALUES_PER_THREAD", self.values_per_thread)
    }
}

/// Work-splitting strategy, one per entry point of `sum.wgsl`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum SumKernel {
    Global,
    Loop,
    LoopCoalesced,
    Local,
    LocalTree,
}

impl SumKernel {
    pub const ALL: [SumKernel; 5] = [
        SumKernel::Global,
        SumKernel::Loop,
        SumKernel::LoopCoalesced,
        SumKernel::Local,
        SumKernel::LocalTree,
    ];

    pub fn entry_point(self) -> &'static str {
        match self {
            SumKernel::Global => "sum_global",
            SumKernel::Loop => "sum_loop",
            SumKernel::LoopCoalesced => "sum_loop_coalesced",
            SumKernel::Local => "sum_local",
            SumKernel::LocalTree => "sum_local_tree",
        }
    }

    /// Launch size covering `n` values.
    pub fn work_size(self, config: &SumConfig, n: u32) -> WorkSize {
        match self {
            SumKernel::Loop | SumKernel::LoopCoalesced => {
                WorkSize::for_elements(config.work_group_size, n.div_ceil(config.values_per_thread))
            }
            SumKernel::Global | SumKernel::Local | SumKernel::LocalTree => {
                WorkSize::for_elements(config.work_group_size, n)
            }
        }
    }
}

impl fmt::Display for SumKernel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.entry_point())
    }
}

/// Uploaded values plus every summation kernel.
pub struct GpuSum {
    config: SumConfig,
    kernels: Vec<(SumKernel, Kernel)>,
    values: DeviceBuffer<u32>,
    total: DeviceBuffer<u32>,
    n: u32,
}

impl GpuSum {
    pub fn new(ctx: &GpuContext, config: SumConfig) -> Result<Self> {
        config.validate()?;
        let source = config.source();
        let signature = [
            ArgKind::Buffer { read_only: false },
            ArgKind::Buffer { read_only: true },
            ArgKind::Scalar,
        ];

        let mut kernels = Vec::with_capacity(SumKernel::ALL.len());
        for which in SumKernel::ALL {
            let mut kernel = Kernel::new(&source, which.entry_point(), config.work_group_size, &signature);
            kernel.compile(ctx)?;
            kernels.push((which, kernel));
        }

        Ok(Self {
            config,
            kernels,
            values: DeviceBuffer::new(ctx, "Sum Values", 0)?,
            total: DeviceBuffer::new(ctx, "Sum Total", 1)?,
            n: 0,
        })
    }

    pub fn upload(&mut self, values: &[u32]) -> Result<()> {
        if values.len() > MAX_VALUES {
            return Err(ReduceError::TooManyValues {
                count: values.len(),
                max: MAX_VALUES,
            });
        }
        self.values.resize(values.len())?;
        self.values.write(values)?;
        self.n = values.len() as u32;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.n as usize
    }

    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    /// Reset the total, launch `which` and read the total back.
    pub fn sum(&mut self, which: SumKernel) -> Result<u32> {
        self.total.write(&[0])?;
        if self.n == 0 {
            return Ok(0);
        }
        let kernel = self
            .kernels
            .iter()
            .find(|(k, _)| *k == which)
            .map(|(_, kernel)| kernel)
            .ok_or_else(|| ReduceError::InvalidConfig(format!("kernel {} not built", which)))?;

        kernel.exec(
            which.work_size(&self.config, self.n),
            &[
                KernelArg::buffer(&self.total),
                KernelArg::buffer(&self.values),
                self.n.into(),
            ],
        )?;

        let mut total = [0u32];
        self.total.read(&mut total)?;
        Ok(total[0])
    }
}
