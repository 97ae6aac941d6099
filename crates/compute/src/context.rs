//! Device selection and the shared compute context.
//!
//! A [`GpuContext`] bundles the device, its single in-order queue and the
//! adapter description. Every buffer and kernel is created against an
//! explicit context; nothing in this crate keeps a global device handle.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::Arc;

use crate::error::{GpuError, Result};

/// Which adapter to open.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum DeviceSelector {
    /// Prefer a discrete GPU, then integrated, then anything else, with
    /// CPU/software adapters last.
    #[default]
    Auto,
    /// Adapter at this position in [`list_adapters`].
    Index(usize),
}

/// Central compute context holding device and queue.
#[derive(Clone)]
pub struct GpuContext {
    pub device: Arc<wgpu::Device>,
    pub queue: Arc<wgpu::Queue>,
    info: wgpu::AdapterInfo,
    limits: wgpu::Limits,
    lost: Arc<AtomicBool>,
}

impl GpuContext {
    pub async fn new(selector: DeviceSelector) -> Result<Self> {
        let instance = create_instance();
        let mut adapters = instance.enumerate_adapters(wgpu::Backends::all());

        let adapter = match selector {
            DeviceSelector::Auto => {
                // min_by_key keeps the first of equal ranks, so backend order breaks ties
                let best = adapters
                    .iter()
                    .enumerate()
                    .min_by_key(|(_, a)| adapter_rank(a.get_info().device_type))
                    .map(|(i, _)| i)
                    .ok_or(GpuError::NoAdapter)?;
                adapters.swap_remove(best)
            }
            DeviceSelector::Index(index) => {
                let available = adapters.len();
                if index >= available {
                    return Err(GpuError::AdapterIndex { index, available });
                }
                adapters.swap_remove(index)
            }
        };

        let info = adapter.get_info();
        log::info!("Using adapter: {}", describe_adapter(&info));

        let limits = adapter.limits();
        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Compute Device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: limits.clone(),
                    memory_hints: wgpu::MemoryHints::Performance,
                },
                None,
            )
            .await?;

        let lost = Arc::new(AtomicBool::new(false));

        let lost_flag = lost.clone();
        device.on_uncaptured_error(Box::new(move |error: wgpu::Error| {
            log::error!("GPU uncaptured error: {}", error);
            if matches!(error, wgpu::Error::OutOfMemory { .. }) {
                lost_flag.store(true, Ordering::SeqCst);
            }
        }));

        let lost_flag = lost.clone();
        device.set_device_lost_callback(move |reason: wgpu::DeviceLostReason, message: String| {
            if !is_fatal_loss(reason) {
                log::debug!("GPU device released ({:?}): {}", reason, message);
                return;
            }
            log::error!("GPU device lost ({:?}): {}", reason, message);
            lost_flag.store(true, Ordering::SeqCst);
        });

        Ok(Self {
            device: Arc::new(device),
            queue: Arc::new(queue),
            info,
            limits,
            lost,
        })
    }

    /// Blocking wrapper around [`GpuContext::new`].
    pub fn new_blocking(selector: DeviceSelector) -> Result<Self> {
        pollster::block_on(Self::new(selector))
    }

    pub fn info(&self) -> &wgpu::AdapterInfo {
        &self.info
    }

    pub fn limits(&self) -> &wgpu::Limits {
        &self.limits
    }

    pub fn is_lost(&self) -> bool {
        self.lost.load(Ordering::SeqCst)
    }

    /// Block until every submitted command has finished.
    pub fn synchronize(&self) -> Result<()> {
        self.device.poll(wgpu::Maintain::Wait);
        if self.is_lost() {
            return Err(GpuError::DeviceLost);
        }
        Ok(())
    }

    /// Wait for a buffer map operation to complete.
    pub(crate) fn await_buffer_map(
        &self,
        rx: mpsc::Receiver<std::result::Result<(), wgpu::BufferAsyncError>>,
    ) -> Result<()> {
        if self.is_lost() {
            return Err(GpuError::DeviceLost);
        }
        match rx.recv() {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => {
                log::error!("Buffer map failed: {:?}", e);
                Err(GpuError::BufferMapFailed(e))
            }
            Err(_) => {
                log::error!("Buffer map channel disconnected - possible device lost");
                self.lost.store(true, Ordering::SeqCst);
                Err(GpuError::ChannelDisconnected)
            }
        }
    }
}

/// Describe every adapter visible to wgpu, in [`DeviceSelector::Index`] order.
pub fn list_adapters() -> Vec<wgpu::AdapterInfo> {
    create_instance()
        .enumerate_adapters(wgpu::Backends::all())
        .iter()
        .map(|a| a.get_info())
        .collect()
}

/// One-line human readable adapter description.
pub fn describe_adapter(info: &wgpu::AdapterInfo) -> String {
    let mut line = format!("{} ({:?}, {:?})", info.name, info.device_type, info.backend);
    if !info.driver.is_empty() {
        line.push_str(&format!(" driver {} {}", info.driver, info.driver_info));
    }
    line
}

fn create_instance() -> wgpu::Instance {
    wgpu::Instance::new(wgpu::InstanceDescriptor {
        backends: wgpu::Backends::all(),
        ..Default::default()
    })
}

/// Dropping the last device handle also fires the lost callback; that is
/// an orderly shutdown, not a failure.
fn is_fatal_loss(reason: wgpu::DeviceLostReason) -> bool {
    !matches!(reason, wgpu::DeviceLostReason::Dropped)
}

fn adapter_rank(device_type: wgpu::DeviceType) -> u8 {
    match device_type {
        wgpu::DeviceType::DiscreteGpu => 0,
        wgpu::DeviceType::IntegratedGpu => 1,
        wgpu::DeviceType::VirtualGpu => 2,
        wgpu::DeviceType::Other => 3,
        wgpu::DeviceType::Cpu => 4,
    }
}
