use thiserror::Error;

/// Errors raised by the compute layer.
#[derive(Debug, Error)]
pub enum GpuError {
    #[error("no compatible GPU adapter found")]
    NoAdapter,

    #[error("adapter index {index} out of range ({available} adapters available)")]
    AdapterIndex { index: usize, available: usize },

    #[error("failed to create device: {0}")]
    RequestDevice(#[from] wgpu::RequestDeviceError),

    /// Shader module or pipeline creation failed. `log` holds every
    /// compiler message and validation error collected during the build.
    #[error("kernel `{kernel}` failed to build:\n{log}")]
    Build { kernel: String, log: String },

    #[error("kernel `{kernel}` launch rejected: {reason}")]
    Launch { kernel: String, reason: String },

    #[error("buffer `{label}` needs {requested} bytes, device allows at most {limit}")]
    BufferTooLarge {
        label: String,
        requested: u64,
        limit: u64,
    },

    #[error("buffer map failed: {0:?}")]
    BufferMapFailed(wgpu::BufferAsyncError),

    #[error("buffer map channel disconnected")]
    ChannelDisconnected,

    #[error("GPU device lost")]
    DeviceLost,
}

pub type Result<T, E = GpuError> = std::result::Result<T, E>;
