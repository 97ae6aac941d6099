//! Typed storage buffers with host write and blocking readback.

use std::marker::PhantomData;
use std::sync::mpsc;

use bytemuck::Pod;

use crate::context::GpuContext;
use crate::error::{GpuError, Result};

/// A device-resident array of `T`.
///
/// `len` is the logical element count; the allocation may be larger after a
/// shrinking [`resize`](DeviceBuffer::resize) and is never smaller than one
/// element, so the buffer can always be bound.
pub struct DeviceBuffer<T: Pod> {
    ctx: GpuContext,
    label: String,
    buffer: wgpu::Buffer,
    len: usize,
    capacity: usize,
    _marker: PhantomData<T>,
}

impl<T: Pod> DeviceBuffer<T> {
    pub fn new(ctx: &GpuContext, label: &str, len: usize) -> Result<Self> {
        let capacity = len.max(1);
        let buffer = allocate::<T>(ctx, label, capacity)?;
        Ok(Self {
            ctx: ctx.clone(),
            label: label.to_owned(),
            buffer,
            len,
            capacity,
            _marker: PhantomData,
        })
    }

    /// Allocate and upload `data` in one step.
    pub fn from_slice(ctx: &GpuContext, label: &str, data: &[T]) -> Result<Self> {
        let mut buffer = Self::new(ctx, label, data.len())?;
        buffer.write(data)?;
        Ok(buffer)
    }

    /// Change the logical length. Grows the allocation when needed; the
    /// previous contents are not preserved across a reallocation.
    pub fn resize(&mut self, len: usize) -> Result<()> {
        if len > self.capacity {
            self.buffer = allocate::<T>(&self.ctx, &self.label, len)?;
            self.capacity = len;
        }
        self.len = len;
        Ok(())
    }

    /// Upload `data` to the start of the buffer. Ordered before any
    /// kernel launch submitted afterwards.
    pub fn write(&mut self, data: &[T]) -> Result<()> {
        if data.len() > self.len {
            self.resize(data.len())?;
        }
        if data.is_empty() {
            return Ok(());
        }
        let bytes: &[u8] = bytemuck::cast_slice(data);
        if bytes.len() % wgpu::COPY_BUFFER_ALIGNMENT as usize == 0 {
            self.ctx.queue.write_buffer(&self.buffer, 0, bytes);
        } else {
            let mut padded = bytes.to_vec();
            padded.resize(aligned_size(bytes.len() as u64) as usize, 0);
            self.ctx.queue.write_buffer(&self.buffer, 0, &padded);
        }
        Ok(())
    }

    /// Read the first `out.len()` elements back to the host, blocking until
    /// every previously submitted command has completed.
    pub fn read(&self, out: &mut [T]) -> Result<()> {
        let count = out.len().min(self.len);
        if count == 0 {
            return Ok(());
        }
        let byte_size = (count * std::mem::size_of::<T>()) as u64;
        let copy_size = aligned_size(byte_size);

        let staging = self.ctx.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Readback Staging"),
            size: copy_size,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let mut encoder = self
            .ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Readback Copy Encoder"),
            });
        encoder.copy_buffer_to_buffer(&self.buffer, 0, &staging, 0, copy_size);
        self.ctx.queue.submit(Some(encoder.finish()));

        let slice = staging.slice(..);
        let (tx, rx) = mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        self.ctx.device.poll(wgpu::Maintain::Wait);
        self.ctx.await_buffer_map(rx)?;

        {
            let data = slice.get_mapped_range();
            let mapped: &[u8] = &data[..byte_size as usize];
            out[..count].copy_from_slice(bytemuck::cast_slice(mapped));
        }
        staging.unmap();
        Ok(())
    }

    /// Read the whole logical range into a new vector.
    pub fn read_vec(&self) -> Result<Vec<T>> {
        let mut out = vec![T::zeroed(); self.len];
        self.read(&mut out)?;
        Ok(out)
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn raw(&self) -> &wgpu::Buffer {
        &self.buffer
    }
}

fn allocate<T: Pod>(ctx: &GpuContext, label: &str, capacity: usize) -> Result<wgpu::Buffer> {
    let requested = aligned_size((capacity * std::mem::size_of::<T>()) as u64);
    let limit = ctx
        .limits()
        .max_buffer_size
        .min(ctx.limits().max_storage_buffer_binding_size as u64);
    if requested > limit {
        return Err(GpuError::BufferTooLarge {
            label: label.to_owned(),
            requested,
            limit,
        });
    }

    log::trace!("Allocating buffer `{}` ({} bytes)", label, requested);
    Ok(ctx.device.create_buffer(&wgpu::BufferDescriptor {
        label: Some(label),
        size: requested,
        usage: wgpu::BufferUsages::STORAGE
            | wgpu::BufferUsages::COPY_DST
            | wgpu::BufferUsages::COPY_SRC,
        mapped_at_creation: false,
    }))
}

/// Round a byte count up to the copy alignment.
pub(crate) fn aligned_size(bytes: u64) -> u64 {
    let align = wgpu::COPY_BUFFER_ALIGNMENT;
    bytes.div_ceil(align) * align
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aligned_size() {
        assert_eq!(aligned_size(0), 0);
        assert_eq!(aligned_size(1), 4);
        assert_eq!(aligned_size(4), 4);
        assert_eq!(aligned_size(13), 16);
    }
}
