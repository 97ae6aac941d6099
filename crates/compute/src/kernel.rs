//! Kernel sources, compilation and launch.
//!
//! A [`Kernel`] is one WGSL compute entry point plus a declared argument
//! signature. Arguments are bound positionally:
//!
//! - buffer arguments take bindings `0..b` of group 0, in argument order;
//! - scalar arguments are packed, in argument order, into one uniform struct
//!   at binding `b`, padded to 16 bytes.
//!
//! Shaders declare their bindings to match. Work sizes follow the
//! OpenCL-style `{local, global}` contract; groups beyond the device's
//! per-dimension dispatch limit are folded into a second grid dimension, so
//! kernels derive their linear group index as
//! `workgroup_id.x + workgroup_id.y * num_workgroups.x` and must treat
//! surplus groups as inert.

use std::borrow::Cow;
use std::fmt;

use bytemuck::Pod;
use wgpu::util::DeviceExt;

use crate::buffer::DeviceBuffer;
use crate::context::GpuContext;
use crate::error::{GpuError, Result};

/// Local (work-group) and global (total thread) launch size.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct WorkSize {
    pub local: u32,
    pub global: u32,
}

impl WorkSize {
    pub fn new(local: u32, global: u32) -> Self {
        Self { local, global }
    }

    /// Enough threads for `n` elements, rounded up to whole work-groups.
    /// Always at least one group.
    pub fn for_elements(local: u32, n: u32) -> Self {
        let groups = n.div_ceil(local).max(1);
        Self {
            local,
            global: groups * local,
        }
    }

    pub fn groups(&self) -> u32 {
        self.global / self.local
    }

    fn check(&self, workgroup_size: u32) -> std::result::Result<(), String> {
        if self.local != workgroup_size {
            return Err(format!(
                "local size {} does not match the kernel's work-group size {}",
                self.local, workgroup_size
            ));
        }
        if self.global == 0 || self.global % self.local != 0 {
            return Err(format!(
                "global size {} is not a positive multiple of local size {}",
                self.global, self.local
            ));
        }
        Ok(())
    }
}

/// Declared kind of one kernel parameter.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ArgKind {
    /// Storage buffer binding.
    Buffer { read_only: bool },
    /// 32-bit scalar packed into the params uniform.
    Scalar,
}

/// One bound kernel argument.
#[derive(Copy, Clone, Debug)]
pub enum KernelArg<'a> {
    Buffer(&'a wgpu::Buffer),
    Scalar(u32),
}

impl<'a> KernelArg<'a> {
    pub fn buffer<T: Pod>(buffer: &'a DeviceBuffer<T>) -> Self {
        KernelArg::Buffer(buffer.raw())
    }

    pub fn scalar(value: u32) -> Self {
        KernelArg::Scalar(value)
    }

    fn matches(&self, kind: ArgKind) -> bool {
        matches!(
            (self, kind),
            (KernelArg::Buffer(_), ArgKind::Buffer { .. }) | (KernelArg::Scalar(_), ArgKind::Scalar)
        )
    }
}

impl From<u32> for KernelArg<'_> {
    fn from(value: u32) -> Self {
        KernelArg::Scalar(value)
    }
}

impl fmt::Display for KernelArg<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KernelArg::Buffer(_) => write!(f, "buffer"),
            KernelArg::Scalar(v) => write!(f, "scalar {}", v),
        }
    }
}

/// Named WGSL program text plus injected `u32` constants.
///
/// Defines are emitted as `const NAME: u32 = VALUEu;` lines ahead of the
/// body, so one shader file can be specialized per configuration.
#[derive(Clone, Debug)]
pub struct KernelSource {
    name: String,
    body: Cow<'static, str>,
    defines: Vec<(String, u32)>,
}

impl KernelSource {
    pub fn new(name: impl Into<String>, body: impl Into<Cow<'static, str>>) -> Self {
        Self {
            name: name.into(),
            body: body.into(),
            defines: Vec::new(),
        }
    }

    pub fn define(mut self, name: &str, value: u32) -> Self {
        match self.defines.iter_mut().find(|(n, _)| n == name) {
            Some(entry) => entry.1 = value,
            None => self.defines.push((name.to_owned(), value)),
        }
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Full WGSL text handed to the compiler.
    pub fn text(&self) -> String {
        let mut text = String::with_capacity(self.body.len() + 48 * self.defines.len());
        for (name, value) in &self.defines {
            text.push_str(&format!("const {}: u32 = {}u;\n", name, value));
        }
        text.push_str(&self.body);
        text
    }
}

struct Compiled {
    ctx: GpuContext,
    layout: wgpu::BindGroupLayout,
    pipeline: wgpu::ComputePipeline,
}

/// A compute entry point with a typed argument signature.
pub struct Kernel {
    source: KernelSource,
    entry_point: String,
    workgroup_size: u32,
    signature: Vec<ArgKind>,
    compiled: Option<Compiled>,
}

impl Kernel {
    pub fn new(
        source: &KernelSource,
        entry_point: &str,
        workgroup_size: u32,
        signature: &[ArgKind],
    ) -> Self {
        Self {
            source: source.clone(),
            entry_point: entry_point.to_owned(),
            workgroup_size,
            signature: signature.to_vec(),
            compiled: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.entry_point
    }

    pub fn workgroup_size(&self) -> u32 {
        self.workgroup_size
    }

    pub fn is_compiled(&self) -> bool {
        self.compiled.is_some()
    }

    /// Build the shader module and pipeline. On failure the full build log
    /// is logged and returned in [`GpuError::Build`].
    pub fn compile(&mut self, ctx: &GpuContext) -> Result<()> {
        log::debug!(
            "Compiling kernel `{}` from `{}`",
            self.entry_point,
            self.source.name()
        );
        let device = &ctx.device;

        device.push_error_scope(wgpu::ErrorFilter::Validation);

        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(self.source.name()),
            source: wgpu::ShaderSource::Wgsl(self.source.text().into()),
        });
        let info = pollster::block_on(module.get_compilation_info());

        let layout_entries: Vec<wgpu::BindGroupLayoutEntry> = binding_kinds(&self.signature)
            .into_iter()
            .enumerate()
            .map(|(binding, ty)| wgpu::BindGroupLayoutEntry {
                binding: binding as u32,
                visibility: wgpu::ShaderStages::COMPUTE,
                ty: wgpu::BindingType::Buffer {
                    ty,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            })
            .collect();

        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some(&format!("{} Layout", self.entry_point)),
            entries: &layout_entries,
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(&format!("{} Pipeline Layout", self.entry_point)),
            bind_group_layouts: &[&layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some(&format!("{} Pipeline", self.entry_point)),
            layout: Some(&pipeline_layout),
            module: &module,
            entry_point: Some(self.entry_point.as_str()),
            compilation_options: Default::default(),
            cache: None,
        });

        let scope_error = pollster::block_on(device.pop_error_scope());

        let mut log_lines = Vec::new();
        let mut has_errors = false;
        for message in &info.messages {
            let severity = match message.message_type {
                wgpu::CompilationMessageType::Error => {
                    has_errors = true;
                    "error"
                }
                wgpu::CompilationMessageType::Warning => "warning",
                wgpu::CompilationMessageType::Info => "info",
            };
            let line = match &message.location {
                Some(loc) => format!(
                    "{}:{}:{}: {}: {}",
                    self.source.name(),
                    loc.line_number,
                    loc.line_position,
                    severity,
                    message.message
                ),
                None => format!("{}: {}: {}", self.source.name(), severity, message.message),
            };
            log_lines.push(line);
        }
        if let Some(error) = scope_error {
            has_errors = true;
            log_lines.push(error.to_string());
        }

        if has_errors {
            let log = log_lines.join("\n");
            log::error!("Build log for kernel `{}`:\n{}", self.entry_point, log);
            return Err(GpuError::Build {
                kernel: self.entry_point.clone(),
                log,
            });
        }
        for line in &log_lines {
            log::warn!("{}", line);
        }

        self.compiled = Some(Compiled {
            ctx: ctx.clone(),
            layout,
            pipeline,
        });
        Ok(())
    }

    /// Launch one dispatch on the context's queue.
    pub fn exec(&self, work: WorkSize, args: &[KernelArg<'_>]) -> Result<()> {
        let compiled = self
            .compiled
            .as_ref()
            .ok_or_else(|| self.launch_error("kernel has not been compiled".to_owned()))?;
        let ctx = &compiled.ctx;
        if ctx.is_lost() {
            return Err(GpuError::DeviceLost);
        }

        check_args(&self.signature, args).map_err(|reason| self.launch_error(reason))?;
        work.check(self.workgroup_size)
            .map_err(|reason| self.launch_error(reason))?;
        let (groups_x, groups_y) = dispatch_grid(
            work.groups(),
            ctx.limits().max_compute_workgroups_per_dimension,
        )
        .ok_or_else(|| self.launch_error(format!("{} work-groups exceed the device grid", work.groups())))?;

        log::trace!(
            "Launching `{}`: local {}, global {} ({}x{} groups)",
            self.entry_point,
            work.local,
            work.global,
            groups_x,
            groups_y
        );

        let device = &ctx.device;
        device.push_error_scope(wgpu::ErrorFilter::Validation);

        let scalars = pack_scalars(args);
        let params_buffer = (!scalars.is_empty()).then(|| {
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Kernel Params"),
                contents: bytemuck::cast_slice(&scalars),
                usage: wgpu::BufferUsages::UNIFORM,
            })
        });

        let mut entries: Vec<wgpu::BindGroupEntry> = args
            .iter()
            .filter_map(|arg| match arg {
                KernelArg::Buffer(buffer) => Some(*buffer),
                KernelArg::Scalar(_) => None,
            })
            .enumerate()
            .map(|(binding, buffer)| wgpu::BindGroupEntry {
                binding: binding as u32,
                resource: buffer.as_entire_binding(),
            })
            .collect();
        if let Some(params) = &params_buffer {
            entries.push(wgpu::BindGroupEntry {
                binding: entries.len() as u32,
                resource: params.as_entire_binding(),
            });
        }

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(&format!("{} Bind Group", self.entry_point)),
            layout: &compiled.layout,
            entries: &entries,
        });

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some(&format!("{} Encoder", self.entry_point)),
        });
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some(&format!("{} Pass", self.entry_point)),
                timestamp_writes: None,
            });
            pass.set_pipeline(&compiled.pipeline);
            pass.set_bind_group(0, &bind_group, &[]);
            pass.dispatch_workgroups(groups_x, groups_y, 1);
        }
        ctx.queue.submit(Some(encoder.finish()));

        if let Some(error) = pollster::block_on(device.pop_error_scope()) {
            return Err(self.launch_error(error.to_string()));
        }
        Ok(())
    }

    fn launch_error(&self, reason: String) -> GpuError {
        GpuError::Launch {
            kernel: self.entry_point.clone(),
            reason,
        }
    }
}

/// Binding types in binding order: storage buffers, then the params uniform
/// if the signature has any scalar.
fn binding_kinds(signature: &[ArgKind]) -> Vec<wgpu::BufferBindingType> {
    let mut kinds: Vec<wgpu::BufferBindingType> = signature
        .iter()
        .filter_map(|kind| match kind {
            ArgKind::Buffer { read_only } => Some(wgpu::BufferBindingType::Storage {
                read_only: *read_only,
            }),
            ArgKind::Scalar => None,
        })
        .collect();
    if signature.contains(&ArgKind::Scalar) {
        kinds.push(wgpu::BufferBindingType::Uniform);
    }
    kinds
}

fn check_args(signature: &[ArgKind], args: &[KernelArg<'_>]) -> std::result::Result<(), String> {
    if signature.len() != args.len() {
        return Err(format!(
            "expected {} arguments, got {}",
            signature.len(),
            args.len()
        ));
    }
    for (index, (kind, arg)) in signature.iter().zip(args).enumerate() {
        if !arg.matches(*kind) {
            return Err(format!("argument {}: expected {:?}, got {}", index, kind, arg));
        }
    }
    Ok(())
}

/// Scalars in argument order, zero padded to a whole number of 16-byte rows.
fn pack_scalars(args: &[KernelArg<'_>]) -> Vec<u32> {
    let mut scalars: Vec<u32> = args
        .iter()
        .filter_map(|arg| match arg {
            KernelArg::Scalar(v) => Some(*v),
            KernelArg::Buffer(_) => None,
        })
        .collect();
    if !scalars.is_empty() {
        scalars.resize(scalars.len().div_ceil(4) * 4, 0);
    }
    scalars
}

/// Fold `groups` work-groups into an `x * y` grid within `max_per_dim`.
fn dispatch_grid(groups: u32, max_per_dim: u32) -> Option<(u32, u32)> {
    if groups <= max_per_dim {
        return Some((groups, 1));
    }
    let rows = groups.div_ceil(max_per_dim);
    (rows <= max_per_dim).then_some((max_per_dim, rows))
}
