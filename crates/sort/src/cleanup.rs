//! Zeroing pass run on the scan destination before every scan.

use compute::{ArgKind, DeviceBuffer, GpuContext, Kernel, KernelArg, KernelSource, Result, WorkSize};

use crate::shaders::CLEANUP_ENTRY;

pub struct Cleanup {
    kernel: Kernel,
}

impl Cleanup {
    pub fn new(ctx: &GpuContext, source: &KernelSource, work_group_size: u32) -> Result<Self> {
        let mut kernel = Kernel::new(
            source,
            CLEANUP_ENTRY,
            work_group_size,
            &[ArgKind::Buffer { read_only: false }, ArgKind::Scalar],
        );
        kernel.compile(ctx)?;
        Ok(Self { kernel })
    }

    /// Set `buffer[0..len)` to zero. Elements past `len` are untouched.
    pub fn zero(&self, buffer: &DeviceBuffer<u32>, len: u32) -> Result<()> {
        if len == 0 {
            return Ok(());
        }
        self.kernel.exec(
            WorkSize::for_elements(self.kernel.workgroup_size(), len),
            &[KernelArg::buffer(buffer), len.into()],
        )
    }
}

/// Host emulation of [`Cleanup::zero`].
pub fn zero_host(buffer: &mut [u32], len: usize) {
    buffer[..len].fill(0);
}
