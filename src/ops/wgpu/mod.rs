//! GPU-accelerated kernels using WGPU.
//!
//! This module implements compute kernels on the GPU using WGPU + WGSL.
//! It handles GPU context initialization, shader precompilation (via
//! `lazy_static`), and compute dispatch for the operations that benefit
//! most from offloading:
//!
//! - `gemm`: row-major matrix multiply with transposition and leading dimensions
//! - `binary`: element-wise and broadcast arithmetic
//! - `unary`: element-wise maps and transcendental functions
//!
//! Shaders operate on `f32`. Other scalar kinds, and any call that fails on
//! the device, run on the portable CPU kernels instead; a failure is logged
//! with `tracing::warn!` and never surfaces to the caller.
//!
//! [`DeviceArray`] builds on the same context to keep data resident on the
//! device between operations.

mod array;

pub use array::DeviceArray;

use briny::prelude::{Validate, ValidationError};
use wgpu::util::DeviceExt;

use crate::backend::{FloatKernels, Kernels};
use crate::config::{BroadcastMode, GemmConfig};
use crate::error::{KernelError, Result};
use crate::ops::cpu::broadcast::{broadcast_shape, broadcast_strides};
use crate::ops::{cpu, BinaryOp, FloatOp, UnaryOp};
use crate::scalar::{Float, Scalar, ScalarKind};
use crate::view::{expect_len, Shape, Strided, StridedMut, MAX_RANK};

const GEMM: &str = include_str!("shaders/gemm.wgsl");
const BINARY: &str = include_str!("shaders/binary.wgsl");
const UNARY: &str = include_str!("shaders/unary.wgsl");

/// Offset added to [`FloatOp`] codes in the unary shader.
const FLOAT_OP_BASE: u32 = 16;
/// Invocations per workgroup in the element-wise shaders.
const LINEAR_WORKGROUP: usize = 64;
/// Maximum workgroups per dispatch dimension.
const MAX_GROUPS: usize = 65535;

/// Failures raised by the GPU backend.
#[derive(Debug, thiserror::Error)]
pub enum GpuError {
    #[error("adapter error: {0}")]
    Adapter(#[from] wgpu::RequestAdapterError),
    #[error("device error: {0}")]
    Device(#[from] wgpu::RequestDeviceError),
    #[error("shader {0} failed validation")]
    Shader(&'static str),
    #[error("device rejected {op}: {message}")]
    Validation { op: &'static str, message: String },
    #[error("buffer readback failed: {0}")]
    Readback(String),
    #[error("extent {0} does not fit a shader index")]
    TooLarge(usize),
    #[error("no GPU adapter available")]
    Unavailable,
}

impl From<GpuError> for KernelError {
    fn from(e: GpuError) -> Self {
        KernelError::Gpu(e.to_string())
    }
}

type GpuResult<T> = core::result::Result<T, GpuError>;

/// Holds the WGPU device and queue used for executing compute pipelines.
///
/// Initialized once globally and reused for all operations via `lazy_static`.
pub struct GpuContext {
    /// The actual GPU device.
    pub device: wgpu::Device,
    /// A queue for information related to the device.
    pub queue: wgpu::Queue,
}

impl GpuContext {
    /// Selects the default adapter and creates a device + queue.
    ///
    /// Uses `pollster::block_on` to wait on the async WGPU calls, and
    /// requests default limits and no optional features for broad
    /// compatibility.
    pub fn new() -> GpuResult<Self> {
        let instance = wgpu::Instance::default();
        let adapter =
            pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions::default()))?;
        tracing::info!("wgpu adapter: {}", adapter.get_info().name);
        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("tensor_hal"),
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            memory_hints: wgpu::MemoryHints::Performance,
            trace: wgpu::Trace::default(),
        }))?;

        Ok(Self { device, queue })
    }
}

/// Secure wrapper for WGSL source code embedded in the crate.
pub struct WgslSource<'a>(pub &'a str);

impl<'a> Validate for WgslSource<'a> {
    fn validate(&self) -> core::result::Result<(), ValidationError> {
        let src = self.0;

        if src.len() > 65536 {
            return Err(ValidationError);
        }

        if !src.contains("fn main") {
            return Err(ValidationError);
        }

        if src.contains("import") || src.contains("#include") {
            return Err(ValidationError);
        }

        let forbidden = ["asm", "unsafe", "ptr", "std::"];
        if forbidden.iter().any(|bad| src.contains(bad)) {
            return Err(ValidationError);
        }

        Ok(())
    }
}

/// Validates a WGSL source and compiles it on `device`.
pub fn load_shader(
    device: &wgpu::Device,
    label: &'static str,
    source: &str,
) -> GpuResult<wgpu::ShaderModule> {
    WgslSource(source).validate().map_err(|_| GpuError::Shader(label))?;

    Ok(device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(label),
        source: wgpu::ShaderSource::Wgsl(source.into()),
    }))
}

/// A compiled pipeline with its bind group layout.
///
/// Binding 0 is a uniform parameter block, followed by `inputs` read-only
/// storage buffers and one read-write output buffer.
struct Kernel {
    label: &'static str,
    layout: wgpu::BindGroupLayout,
    pipeline: wgpu::ComputePipeline,
}

fn layout_entry(binding: u32, ty: wgpu::BufferBindingType) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Buffer { ty, has_dynamic_offset: false, min_binding_size: None },
        count: None,
    }
}

impl Kernel {
    fn new(ctx: &GpuContext, label: &'static str, source: &str, inputs: u32) -> GpuResult<Self> {
        let device = &ctx.device;
        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let built = Self::build(device, label, source, inputs);
        let scope = pollster::block_on(device.pop_error_scope());
        let kernel = built?;
        if let Some(e) = scope {
            return Err(GpuError::Validation { op: label, message: e.to_string() });
        }
        Ok(kernel)
    }

    fn build(device: &wgpu::Device, label: &'static str, source: &str, inputs: u32) -> GpuResult<Self> {
        let module = load_shader(device, label, source)?;
        let mut entries = vec![layout_entry(0, wgpu::BufferBindingType::Uniform)];
        entries.extend(
            (1..=inputs).map(|b| layout_entry(b, wgpu::BufferBindingType::Storage { read_only: true })),
        );
        entries.push(layout_entry(inputs + 1, wgpu::BufferBindingType::Storage { read_only: false }));

        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some(label),
            entries: &entries,
        });
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(label),
            bind_group_layouts: &[&layout],
            push_constant_ranges: &[],
        });
        let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some(label),
            layout: Some(&pipeline_layout),
            module: &module,
            entry_point: Some("main"),
            cache: None,
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        });
        Ok(Self { label, layout, pipeline })
    }
}

/// The shared device plus every precompiled kernel.
pub(crate) struct Gpu {
    ctx: GpuContext,
    gemm: Kernel,
    binary: Kernel,
    unary: Kernel,
}

lazy_static::lazy_static! {
    static ref GPU: Option<Gpu> = match Gpu::init() {
        Ok(gpu) => {
            tracing::info!("wgpu backend initialised");
            Some(gpu)
        }
        Err(e) => {
            tracing::warn!("wgpu backend unavailable: {e}");
            None
        }
    };
}

/// The shared GPU, initialising it on first use.
pub(crate) fn gpu() -> Option<&'static Gpu> {
    GPU.as_ref()
}

/// Whether a GPU adapter was found and every pipeline compiled.
pub fn is_available() -> bool {
    gpu().is_some()
}

fn dim(v: usize) -> GpuResult<u32> {
    u32::try_from(v).map_err(|_| GpuError::TooLarge(v))
}

/// Workgroup grid covering `count` invocations of a linear shader.
fn linear_groups(count: usize) -> GpuResult<(u32, u32)> {
    let groups = count.div_ceil(LINEAR_WORKGROUP);
    let x = groups.clamp(1, MAX_GROUPS);
    Ok((dim(x)?, dim(groups.div_ceil(x))?))
}

impl Gpu {
    fn init() -> GpuResult<Self> {
        let ctx = GpuContext::new()?;
        let gemm = Kernel::new(&ctx, "gemm", GEMM, 2)?;
        let binary = Kernel::new(&ctx, "binary", BINARY, 2)?;
        let unary = Kernel::new(&ctx, "unary", UNARY, 1)?;
        Ok(Self { ctx, gemm, binary, unary })
    }

    /// Runs `f` inside a validation error scope.
    fn scoped<R>(&self, op: &'static str, f: impl FnOnce() -> R) -> GpuResult<R> {
        self.ctx.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let out = f();
        match pollster::block_on(self.ctx.device.pop_error_scope()) {
            Some(e) => Err(GpuError::Validation { op, message: e.to_string() }),
            None => Ok(out),
        }
    }

    /// A storage buffer initialised from `bytes`.
    pub(crate) fn upload(&self, label: &str, bytes: &[u8]) -> wgpu::Buffer {
        self.ctx.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: bytes,
            usage: wgpu::BufferUsages::STORAGE
                | wgpu::BufferUsages::COPY_SRC
                | wgpu::BufferUsages::COPY_DST,
        })
    }

    /// A zero-initialised storage buffer of `size` bytes.
    pub(crate) fn zeroed(&self, label: &str, size: u64) -> wgpu::Buffer {
        self.ctx.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size: size.max(wgpu::COPY_BUFFER_ALIGNMENT),
            usage: wgpu::BufferUsages::STORAGE
                | wgpu::BufferUsages::COPY_SRC
                | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        })
    }

    pub(crate) fn write(&self, buffer: &wgpu::Buffer, bytes: &[u8]) {
        self.ctx.queue.write_buffer(buffer, 0, bytes);
    }

    pub(crate) fn copy(&self, src: &wgpu::Buffer, dst: &wgpu::Buffer, size: u64) {
        let mut encoder = self
            .ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some("copy") });
        encoder.copy_buffer_to_buffer(src, 0, dst, 0, size);
        self.ctx.queue.submit(Some(encoder.finish()));
    }

    /// Copies the first `size` bytes of `buffer` back to the host.
    pub(crate) fn read(&self, buffer: &wgpu::Buffer, size: u64) -> GpuResult<Vec<u8>> {
        if size == 0 {
            return Ok(Vec::new());
        }
        let device = &self.ctx.device;
        let staging = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("staging"),
            size: size.max(wgpu::COPY_BUFFER_ALIGNMENT),
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let mut encoder =
            device.create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some("readback") });
        encoder.copy_buffer_to_buffer(buffer, 0, &staging, 0, size);
        self.ctx.queue.submit(Some(encoder.finish()));

        let slice = staging.slice(..size);
        let (tx, rx) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        device
            .poll(wgpu::PollType::Wait)
            .map_err(|e| GpuError::Readback(e.to_string()))?;
        rx.recv()
            .map_err(|e| GpuError::Readback(e.to_string()))?
            .map_err(|e| GpuError::Readback(e.to_string()))?;

        let bytes = slice.get_mapped_range().to_vec();
        staging.unmap();
        Ok(bytes)
    }

    fn dispatch(&self, kernel: &Kernel, params: &[u32], buffers: &[&wgpu::Buffer], groups: (u32, u32)) {
        let device = &self.ctx.device;
        let uniform = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(kernel.label),
            contents: bytemuck::cast_slice(params),
            usage: wgpu::BufferUsages::UNIFORM,
        });
        let mut entries = vec![wgpu::BindGroupEntry { binding: 0, resource: uniform.as_entire_binding() }];
        entries.extend(buffers.iter().enumerate().map(|(i, b)| wgpu::BindGroupEntry {
            binding: i as u32 + 1,
            resource: b.as_entire_binding(),
        }));
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(kernel.label),
            layout: &kernel.layout,
            entries: &entries,
        });

        let mut encoder =
            device.create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some(kernel.label) });
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some(kernel.label),
                timestamp_writes: None,
            });
            pass.set_pipeline(&kernel.pipeline);
            pass.set_bind_group(0, &bind_group, &[]);
            pass.dispatch_workgroups(groups.0, groups.1, 1);
        }
        self.ctx.queue.submit(Some(encoder.finish()));
    }

    /// `c = alpha * op(a) * op(b) + beta * c` on device buffers.
    ///
    /// The caller has validated `cfg` against the buffer sizes.
    pub(crate) fn gemm_buffers(
        &self,
        cfg: &GemmConfig<f32>,
        a: &wgpu::Buffer,
        b: &wgpu::Buffer,
        c: &wgpu::Buffer,
    ) -> GpuResult<()> {
        let flags = u32::from(cfg.trans_a.is_trans()) | (u32::from(cfg.trans_b.is_trans()) << 1);
        let params = [
            dim(cfg.m)?,
            dim(cfg.n)?,
            dim(cfg.k)?,
            flags,
            dim(cfg.lda)?,
            dim(cfg.ldb)?,
            dim(cfg.ldc)?,
            0,
            cfg.alpha.to_bits(),
            cfg.beta.to_bits(),
            0,
            0,
        ];
        let groups = (dim(cfg.n.div_ceil(16))?, dim(cfg.m.div_ceil(16))?);
        self.scoped("gemm", || self.dispatch(&self.gemm, &params, &[a, b, c], groups))
    }

    /// `out = lhs op rhs` with both operands broadcast to `out_shape`.
    pub(crate) fn binary_buffers(
        &self,
        op: BinaryOp,
        lhs_shape: &Shape,
        rhs_shape: &Shape,
        out_shape: &Shape,
        lhs: &wgpu::Buffer,
        rhs: &wgpu::Buffer,
        out: &wgpu::Buffer,
    ) -> GpuResult<()> {
        let ls = broadcast_strides(lhs_shape, out_shape);
        let rs = broadcast_strides(rhs_shape, out_shape);
        let pad = MAX_RANK - out_shape.rank();
        let mut params = [0u32; 16];
        params[..MAX_RANK].fill(1);
        for axis in 0..out_shape.rank() {
            params[pad + axis] = dim(out_shape[axis])?;
            params[4 + pad + axis] = dim(ls[axis])?;
            params[8 + pad + axis] = dim(rs[axis])?;
        }
        params[12] = dim(out_shape.count())?;
        params[13] = op as u32;
        let groups = linear_groups(out_shape.count())?;
        self.scoped("binary", || self.dispatch(&self.binary, &params, &[lhs, rhs, out], groups))
    }

    /// `out[i] = f(src[i])` where `code` selects the function.
    pub(crate) fn unary_buffers(
        &self,
        code: u32,
        count: usize,
        src: &wgpu::Buffer,
        out: &wgpu::Buffer,
    ) -> GpuResult<()> {
        let params = [dim(count)?, code, 0, 0];
        let groups = linear_groups(count)?;
        self.scoped("unary", || self.dispatch(&self.unary, &params, &[src, out], groups))
    }

    fn gemm(&self, cfg: &GemmConfig<f32>, a: &[f32], b: &[f32], c: &mut [f32]) -> GpuResult<()> {
        let (a_buf, b_buf, c_buf) = self.scoped("gemm upload", || {
            (
                self.upload("gemm a", bytemuck::cast_slice(a)),
                self.upload("gemm b", bytemuck::cast_slice(b)),
                self.upload("gemm c", bytemuck::cast_slice(c)),
            )
        })?;
        self.gemm_buffers(cfg, &a_buf, &b_buf, &c_buf)?;
        let bytes = self.read(&c_buf, size_of_val(c) as u64)?;
        bytemuck::cast_slice_mut::<f32, u8>(c).copy_from_slice(&bytes);
        Ok(())
    }

    fn binary(
        &self,
        op: BinaryOp,
        shapes: (&Shape, &Shape, &Shape),
        lhs: &[f32],
        rhs: &[f32],
        out: &mut [f32],
    ) -> GpuResult<()> {
        let (lhs_buf, rhs_buf, out_buf) = self.scoped("binary upload", || {
            (
                self.upload("lhs", bytemuck::cast_slice(lhs)),
                self.upload("rhs", bytemuck::cast_slice(rhs)),
                self.zeroed("out", size_of_val(out) as u64),
            )
        })?;
        self.binary_buffers(op, shapes.0, shapes.1, shapes.2, &lhs_buf, &rhs_buf, &out_buf)?;
        let bytes = self.read(&out_buf, size_of_val(out) as u64)?;
        bytemuck::cast_slice_mut::<f32, u8>(out).copy_from_slice(&bytes);
        Ok(())
    }

    fn unary(&self, code: u32, src: &[f32], out: &mut [f32]) -> GpuResult<()> {
        let (src_buf, out_buf) = self.scoped("unary upload", || {
            (
                self.upload("src", bytemuck::cast_slice(src)),
                self.zeroed("out", size_of_val(out) as u64),
            )
        })?;
        self.unary_buffers(code, src.len(), &src_buf, &out_buf)?;
        let bytes = self.read(&out_buf, size_of_val(out) as u64)?;
        bytemuck::cast_slice_mut::<f32, u8>(out).copy_from_slice(&bytes);
        Ok(())
    }
}

/// Shader code of a unary operation.
pub(crate) fn unary_code(op: UnaryOp) -> u32 {
    op as u32
}

/// Shader code of a transcendental function.
pub(crate) fn float_code(op: FloatOp) -> u32 {
    FLOAT_OP_BASE + op as u32
}

/// The same multiply with `alpha`/`beta` narrowed to the shader's `f32`.
pub(crate) fn f32_config<T: Scalar>(cfg: &GemmConfig<T>) -> GemmConfig<f32> {
    GemmConfig {
        order: cfg.order,
        trans_a: cfg.trans_a,
        trans_b: cfg.trans_b,
        m: cfg.m,
        n: cfg.n,
        k: cfg.k,
        alpha: cfg.alpha.to_f64() as f32,
        beta: cfg.beta.to_f64() as f32,
        lda: cfg.lda,
        ldb: cfg.ldb,
        ldc: cfg.ldc,
    }
}

fn as_f32<T: Scalar>(data: &[T]) -> Option<&[f32]> {
    if T::KIND != ScalarKind::F32 {
        return None;
    }
    bytemuck::try_cast_slice(data).ok()
}

fn as_f32_mut<T: Scalar>(data: &mut [T]) -> Option<&mut [f32]> {
    if T::KIND != ScalarKind::F32 {
        return None;
    }
    bytemuck::try_cast_slice_mut(data).ok()
}

/// Runs `run` on the shared GPU. Returns `false` when the caller should use
/// the CPU kernel instead.
fn offload(op: &'static str, run: impl FnOnce(&Gpu) -> GpuResult<()>) -> bool {
    let Some(gpu) = gpu() else {
        tracing::debug!("{op}: no gpu, using cpu");
        return false;
    };
    match run(gpu) {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!("{op} on wgpu failed, falling back to cpu: {e}");
            false
        }
    }
}

/// The WebGPU backend. Overrides the `f32` GEMM, element-wise, broadcast and
/// transcendental paths; every other call uses the portable kernels.
#[derive(Debug, Clone, Copy, Default)]
pub struct Wgpu;

impl<T: Scalar> Kernels<T> for Wgpu {
    fn unary(op: UnaryOp, src: Strided<'_, T>, mut dst: StridedMut<'_, T>) -> Result<()> {
        if let (Some(s), Some(d)) = (
            src.as_contiguous().and_then(as_f32),
            dst.as_contiguous_mut().and_then(as_f32_mut),
        ) && s.len() == d.len()
            && !s.is_empty()
            && offload("unary", |gpu| gpu.unary(unary_code(op), s, d))
        {
            return Ok(());
        }
        cpu::vector::unary(op, src, dst)
    }

    fn binary(op: BinaryOp, lhs: Strided<'_, T>, rhs: Strided<'_, T>, mut dst: StridedMut<'_, T>) -> Result<()> {
        if let (Some(l), Some(r), Some(d)) = (
            lhs.as_contiguous().and_then(as_f32),
            rhs.as_contiguous().and_then(as_f32),
            dst.as_contiguous_mut().and_then(as_f32_mut),
        ) && l.len() == r.len()
            && l.len() == d.len()
            && !l.is_empty()
        {
            let shape = Shape::new(&[l.len()])?;
            if offload("binary", |gpu| gpu.binary(op, (&shape, &shape, &shape), l, r, d)) {
                return Ok(());
            }
        }
        cpu::vector::binary(op, lhs, rhs, dst)
    }

    fn gemm(cfg: &GemmConfig<T>, a: &[T], b: &[T], c: &mut [T]) -> Result<()> {
        cpu::gemm::validate(cfg, a, b, c)?;
        let trivial = cfg.m == 0 || cfg.n == 0 || cfg.k == 0 || cfg.alpha == T::ZERO;
        if !trivial && let (Some(a32), Some(b32), Some(c32)) = (as_f32(a), as_f32(b), as_f32_mut(c)) {
            let cfg32 = f32_config(cfg);
            if offload("gemm", |gpu| gpu.gemm(&cfg32, a32, b32, c32)) {
                return Ok(());
            }
        }
        cpu::gemm::gemm(cfg, a, b, c)
    }

    fn broadcast_binary(
        op: BinaryOp,
        lhs: &[T],
        lhs_shape: &Shape,
        rhs: &[T],
        rhs_shape: &Shape,
        dst: &mut [T],
        mode: BroadcastMode,
    ) -> Result<Shape> {
        expect_len("broadcast lhs", lhs_shape, lhs.len())?;
        expect_len("broadcast rhs", rhs_shape, rhs.len())?;
        let out = broadcast_shape(lhs_shape, rhs_shape, mode)?;
        expect_len("broadcast dst", &out, dst.len())?;
        if out.count() > 0
            && let (Some(l), Some(r), Some(d)) = (as_f32(lhs), as_f32(rhs), as_f32_mut(dst))
            && offload("broadcast_binary", |gpu| gpu.binary(op, (lhs_shape, rhs_shape, &out), l, r, d))
        {
            return Ok(out);
        }
        cpu::broadcast::broadcast_binary(op, lhs, lhs_shape, rhs, rhs_shape, dst, mode)
    }
}

impl<T: Float> FloatKernels<T> for Wgpu {
    fn float_unary(op: FloatOp, src: Strided<'_, T>, mut dst: StridedMut<'_, T>) -> Result<()> {
        if let (Some(s), Some(d)) = (
            src.as_contiguous().and_then(as_f32),
            dst.as_contiguous_mut().and_then(as_f32_mut),
        ) && s.len() == d.len()
            && !s.is_empty()
            && offload("float_unary", |gpu| gpu.unary(float_code(op), s, d))
        {
            return Ok(());
        }
        cpu::vector::float_unary(op, src, dst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_shaders_pass_validation() {
        for src in [GEMM, BINARY, UNARY] {
            assert!(WgslSource(src).validate().is_ok());
        }
        assert!(WgslSource("fn main() { let p = ptr; }").validate().is_err());
        assert!(WgslSource("fn helper() {}").validate().is_err());
    }

    #[test]
    fn linear_groups_split_large_counts() {
        assert_eq!(linear_groups(1).unwrap(), (1, 1));
        assert_eq!(linear_groups(64 * 3 + 1).unwrap(), (4, 1));
        let (x, y) = linear_groups(64 * MAX_GROUPS * 2).unwrap();
        assert_eq!((x as usize, y), (MAX_GROUPS, 2));
    }

    #[test]
    fn wgpu_matches_cpu_or_falls_back() {
        let a = [1.0f32, 2.0, 3.0, 4.0];
        let b = [5.0f32, 6.0, 7.0, 8.0];
        let mut c = [0.0f32; 4];
        <Wgpu as Kernels<f32>>::gemm(&GemmConfig::new(2, 2, 2), &a, &b, &mut c).unwrap();
        assert_eq!(c, [19.0, 22.0, 43.0, 50.0]);

        let mut d = [0i32; 4];
        <Wgpu as Kernels<i32>>::gemm(&GemmConfig::new(2, 2, 2), &[1, 2, 3, 4], &[5, 6, 7, 8], &mut d)
            .unwrap();
        assert_eq!(d, [19, 22, 43, 50]);
    }
}
