//! Device-resident arrays with deferred evaluation.
//!
//! A [`DeviceArray`] owns a `wgpu::Buffer` (released when the last handle
//! drops) or a pending expression over other arrays. Element-wise
//! arithmetic, unary maps and matrix products only record a node; the graph
//! runs when the array is realised by [`DeviceArray::eval`],
//! [`DeviceArray::to_host`], [`DeviceArray::item`] or any operation that
//! needs host data.
//!
//! `f32` nodes execute as compute shaders. Other kinds, and shader dispatches
//! the device rejects, execute on the portable CPU kernels. Shape
//! operations (reductions, permutation, gather/scatter, im2col, ...) always
//! realise their input and run the portable kernels.

use std::marker::PhantomData;
use std::sync::Arc;

use rand::Rng;
use rand_distr::{Distribution, Normal};

use super::{f32_config, float_code, gpu, unary_code, Gpu, GpuError};
use crate::config::{BroadcastMode, GemmConfig, Img2ColSetup, Transpose};
use crate::error::{KernelError, Result};
use crate::ops::cpu::{self, broadcast::broadcast_shape};
use crate::ops::{BinaryOp, FloatOp, ReduceOp, UnaryOp};
use crate::scalar::{Float, Scalar, ScalarKind};
use crate::view::{expect_len, Shape, Strided, StridedMut};

/// A device buffer holding `len` elements of `T`.
struct Storage<T> {
    buffer: wgpu::Buffer,
    len: usize,
    _kind: PhantomData<T>,
}

impl<T: Scalar> Storage<T> {
    fn bytes(&self) -> u64 {
        (self.len * T::KIND.size()) as u64
    }

    fn zeroed(gpu: &Gpu, len: usize) -> Self {
        let buffer = gpu.zeroed("device array", (len * T::KIND.size()) as u64);
        Self { buffer, len, _kind: PhantomData }
    }

    fn from_host(gpu: &Gpu, data: &[T]) -> Self {
        if data.is_empty() {
            return Self::zeroed(gpu, 0);
        }
        let buffer = gpu.upload("device array", bytemuck::cast_slice(data));
        Self { buffer, len: data.len(), _kind: PhantomData }
    }

    fn to_host(&self, gpu: &Gpu) -> Result<Vec<T>> {
        let bytes = gpu.read(&self.buffer, self.bytes())?;
        let mut out = vec![T::ZERO; self.len];
        bytemuck::cast_slice_mut::<T, u8>(&mut out).copy_from_slice(&bytes);
        Ok(out)
    }

    fn duplicate(&self, gpu: &Gpu) -> Self {
        let out = Self::zeroed(gpu, self.len);
        if self.len > 0 {
            gpu.copy(&self.buffer, &out.buffer, self.bytes());
        }
        out
    }
}

impl<T> Drop for Storage<T> {
    fn drop(&mut self) {
        self.buffer.destroy();
    }
}

/// A node of the deferred expression graph.
#[derive(Clone)]
enum Expr<T: Scalar> {
    Leaf(Arc<Storage<T>>),
    Map {
        code: u32,
        f: fn(T) -> T,
        src: Box<Expr<T>>,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Expr<T>>,
        lhs_shape: Shape,
        rhs: Box<Expr<T>>,
        rhs_shape: Shape,
        shape: Shape,
    },
    Scalar {
        op: BinaryOp,
        src: Box<Expr<T>>,
        shape: Shape,
        scalar: T,
        reversed: bool,
    },
    Matmul {
        cfg: GemmConfig<T>,
        a: Box<Expr<T>>,
        b: Box<Expr<T>>,
        c: Option<Box<Expr<T>>>,
    },
}

/// Logs a rejected shader dispatch before the host path takes over.
fn device_fallback(op: &str, e: &GpuError) {
    tracing::warn!("{op} on wgpu failed, evaluating on the host: {e}");
}

impl<T: Scalar> Expr<T> {
    fn realize(&self, gpu: &Gpu) -> Result<Arc<Storage<T>>> {
        let on_device = T::KIND == ScalarKind::F32;
        let storage = match self {
            Expr::Leaf(storage) => return Ok(Arc::clone(storage)),
            Expr::Map { code, f, src } => {
                let src = src.realize(gpu)?;
                if on_device && src.len > 0 {
                    let out = Storage::zeroed(gpu, src.len);
                    match gpu.unary_buffers(*code, src.len, &src.buffer, &out.buffer) {
                        Ok(()) => return Ok(Arc::new(out)),
                        Err(e) => device_fallback("map", &e),
                    }
                }
                let mut host = src.to_host(gpu)?;
                host.iter_mut().for_each(|v| *v = f(*v));
                Storage::from_host(gpu, &host)
            }
            Expr::Binary { op, lhs, lhs_shape, rhs, rhs_shape, shape } => {
                let (l, r) = (lhs.realize(gpu)?, rhs.realize(gpu)?);
                if on_device && shape.count() > 0 {
                    let out = Storage::zeroed(gpu, shape.count());
                    match gpu.binary_buffers(*op, lhs_shape, rhs_shape, shape, &l.buffer, &r.buffer, &out.buffer) {
                        Ok(()) => return Ok(Arc::new(out)),
                        Err(e) => device_fallback("binary", &e),
                    }
                }
                let mut host = vec![T::ZERO; shape.count()];
                cpu::broadcast::broadcast_binary(
                    *op,
                    &l.to_host(gpu)?,
                    lhs_shape,
                    &r.to_host(gpu)?,
                    rhs_shape,
                    &mut host,
                    BroadcastMode::Broadcast,
                )?;
                Storage::from_host(gpu, &host)
            }
            Expr::Scalar { op, src, shape, scalar, reversed } => {
                let src = src.realize(gpu)?;
                if on_device && src.len > 0 {
                    let s = Storage::from_host(gpu, &[*scalar]);
                    let scalar_shape = Shape::default();
                    let out = Storage::zeroed(gpu, src.len);
                    let run = if *reversed {
                        gpu.binary_buffers(*op, &scalar_shape, shape, shape, &s.buffer, &src.buffer, &out.buffer)
                    } else {
                        gpu.binary_buffers(*op, shape, &scalar_shape, shape, &src.buffer, &s.buffer, &out.buffer)
                    };
                    match run {
                        Ok(()) => return Ok(Arc::new(out)),
                        Err(e) => device_fallback("scalar", &e),
                    }
                }
                let input = src.to_host(gpu)?;
                let mut host = vec![T::ZERO; src.len];
                let dst = StridedMut::contiguous(&mut host);
                if *reversed {
                    cpu::vector::binary_scalar_reversed(*op, *scalar, Strided::contiguous(&input), dst)?;
                } else {
                    cpu::vector::binary_scalar(*op, Strided::contiguous(&input), *scalar, dst)?;
                }
                Storage::from_host(gpu, &host)
            }
            Expr::Matmul { cfg, a, b, c } => {
                let (a, b) = (a.realize(gpu)?, b.realize(gpu)?);
                let out = match c {
                    Some(c) => c.realize(gpu)?.duplicate(gpu),
                    None => Storage::zeroed(gpu, cfg.m * cfg.ldc),
                };
                let trivial = cfg.m == 0 || cfg.n == 0 || cfg.k == 0 || cfg.alpha == T::ZERO;
                if on_device && !trivial {
                    match gpu.gemm_buffers(&f32_config(cfg), &a.buffer, &b.buffer, &out.buffer) {
                        Ok(()) => return Ok(Arc::new(out)),
                        Err(e) => device_fallback("matmul", &e),
                    }
                }
                let mut host = out.to_host(gpu)?;
                cpu::gemm::gemm(cfg, &a.to_host(gpu)?, &b.to_host(gpu)?, &mut host)?;
                Storage::from_host(gpu, &host)
            }
        };
        Ok(Arc::new(storage))
    }
}

fn unary_fn<T: Scalar>(op: UnaryOp) -> fn(T) -> T {
    match op {
        UnaryOp::Negate => |x| UnaryOp::Negate.apply(x),
        UnaryOp::Square => |x| UnaryOp::Square.apply(x),
        UnaryOp::Heaviside => |x| UnaryOp::Heaviside.apply(x),
        UnaryOp::Relu => |x| UnaryOp::Relu.apply(x),
    }
}

fn float_fn<T: Float>(op: FloatOp) -> fn(T) -> T {
    match op {
        FloatOp::Sqrt => |x| FloatOp::Sqrt.apply(x),
        FloatOp::Exp => |x| FloatOp::Exp.apply(x),
        FloatOp::Log => |x| FloatOp::Log.apply(x),
        FloatOp::Sin => |x| FloatOp::Sin.apply(x),
        FloatOp::Cos => |x| FloatOp::Cos.apply(x),
        FloatOp::Tan => |x| FloatOp::Tan.apply(x),
        FloatOp::Tanh => |x| FloatOp::Tanh.apply(x),
    }
}

fn device() -> Result<&'static Gpu> {
    gpu().ok_or_else(|| GpuError::Unavailable.into())
}

/// An owned array on the GPU.
///
/// Clones share realised storage; the buffer is released when the last
/// handle drops. Mutating operations replace the handle's storage and never
/// write through to clones.
#[derive(Clone)]
pub struct DeviceArray<T: Scalar> {
    shape: Shape,
    expr: Expr<T>,
}

impl<T: Scalar> core::fmt::Debug for DeviceArray<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let state = if matches!(self.expr, Expr::Leaf(_)) { "realised" } else { "deferred" };
        f.debug_struct("DeviceArray")
            .field("kind", &T::KIND)
            .field("shape", &self.shape.dims())
            .field("state", &state)
            .finish()
    }
}

impl<T: Scalar> DeviceArray<T> {
    fn leaf(shape: Shape, storage: Storage<T>) -> Self {
        Self { shape, expr: Expr::Leaf(Arc::new(storage)) }
    }

    fn from_parts(shape: Shape, data: &[T]) -> Result<Self> {
        expect_len("device array", &shape, data.len())?;
        Ok(Self::leaf(shape, Storage::from_host(device()?, data)))
    }

    fn deferred(&self, shape: Shape, expr: Expr<T>) -> Self {
        Self { shape, expr }
    }

    /// Runs the pending graph without caching the result.
    fn realized(&self) -> Result<Arc<Storage<T>>> {
        self.expr.realize(device()?)
    }

    /// Host copy of the current value.
    fn host(&self) -> Result<Vec<T>> {
        self.realized()?.to_host(device()?)
    }

    /// A zero-filled array of shape `dims`.
    pub fn allocate(dims: &[usize]) -> Result<Self> {
        let shape = Shape::new(dims)?;
        Ok(Self::leaf(shape, Storage::zeroed(device()?, shape.count())))
    }

    /// Uploads `data`, which must hold exactly the elements of `dims`.
    pub fn from_host(data: &[T], dims: &[usize]) -> Result<Self> {
        Self::from_parts(Shape::new(dims)?, data)
    }

    /// Realises the graph and keeps the result as this array's storage.
    pub fn eval(&mut self) -> Result<()> {
        if !matches!(self.expr, Expr::Leaf(_)) {
            tracing::debug!("realising {:?}", self);
            self.expr = Expr::Leaf(self.realized()?);
        }
        Ok(())
    }

    pub fn to_host(&mut self) -> Result<Vec<T>> {
        self.eval()?;
        self.host()
    }

    /// The single element of a one-element array.
    pub fn item(&mut self) -> Result<T> {
        if self.len() != 1 {
            return Err(KernelError::LengthMismatch { op: "item", expected: 1, actual: self.len() });
        }
        Ok(self.to_host()?[0])
    }

    /// Raw little-endian bytes of the realised array.
    pub fn read_bytes(&mut self) -> Result<Vec<u8>> {
        Ok(bytemuck::cast_slice(&self.to_host()?).to_vec())
    }

    /// Replaces the contents with raw bytes; the byte count must match.
    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        let expected = self.len() * T::KIND.size();
        if bytes.len() != expected {
            return Err(KernelError::LengthMismatch { op: "write_bytes", expected, actual: bytes.len() });
        }
        let gpu = device()?;
        let storage = Storage::zeroed(gpu, self.len());
        if !bytes.is_empty() {
            gpu.write(&storage.buffer, bytes);
        }
        self.expr = Expr::Leaf(Arc::new(storage));
        Ok(())
    }

    /// Device-to-device copy of `other` into this array. Element counts must
    /// match; the shape of `self` is kept.
    pub fn assign(&mut self, other: &DeviceArray<T>) -> Result<()> {
        if other.len() != self.len() {
            return Err(KernelError::LengthMismatch { op: "assign", expected: self.len(), actual: other.len() });
        }
        let copy = other.realized()?.duplicate(device()?);
        self.expr = Expr::Leaf(Arc::new(copy));
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.shape.count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    /// Sets every element to `value`.
    pub fn fill(&mut self, value: T) -> Result<()> {
        let host = vec![value; self.len()];
        *self = Self::from_parts(self.shape, &host)?;
        Ok(())
    }

    /// Values drawn uniformly from `[min, max)`.
    pub fn random_uniform(dims: &[usize], min: T, max: T) -> Result<Self> {
        let (lo, hi) = (min.to_f64(), max.to_f64());
        if !(lo < hi) {
            return Err(KernelError::Configuration(format!("empty uniform range [{lo}, {hi})")));
        }
        let shape = Shape::new(dims)?;
        let mut rng = rand::rng();
        let host: Vec<T> = (0..shape.count()).map(|_| T::from_f64(rng.random_range(lo..hi))).collect();
        Self::from_parts(shape, &host)
    }

    /// Normally distributed values.
    pub fn random_normal(dims: &[usize], mean: T, stdev: T) -> Result<Self> {
        let normal = Normal::new(mean.to_f64(), stdev.to_f64())
            .map_err(|e| KernelError::Configuration(format!("normal({mean:?}, {stdev:?}): {e}")))?;
        let shape = Shape::new(dims)?;
        let mut rng = rand::rng();
        let host: Vec<T> = (0..shape.count()).map(|_| T::from_f64(normal.sample(&mut rng))).collect();
        Self::from_parts(shape, &host)
    }

    /// Ones with probability `p`, zeros otherwise.
    pub fn random_bernoulli(dims: &[usize], p: f64) -> Result<Self> {
        if !(0.0..=1.0).contains(&p) {
            return Err(KernelError::Configuration(format!("probability {p} outside [0, 1]")));
        }
        let shape = Shape::new(dims)?;
        let mut rng = rand::rng();
        let host: Vec<T> = (0..shape.count())
            .map(|_| if rng.random_bool(p) { T::ONE } else { T::ZERO })
            .collect();
        Self::from_parts(shape, &host)
    }

    /// `self op rhs`, with shapes combined per `mode`.
    pub fn binary(&self, op: BinaryOp, rhs: &DeviceArray<T>, mode: BroadcastMode) -> Result<Self> {
        let shape = broadcast_shape(&self.shape, &rhs.shape, mode)?;
        Ok(self.deferred(
            shape,
            Expr::Binary {
                op,
                lhs: Box::new(self.expr.clone()),
                lhs_shape: self.shape,
                rhs: Box::new(rhs.expr.clone()),
                rhs_shape: rhs.shape,
                shape,
            },
        ))
    }

    pub fn add(&self, rhs: &DeviceArray<T>, mode: BroadcastMode) -> Result<Self> {
        self.binary(BinaryOp::Add, rhs, mode)
    }

    pub fn sub(&self, rhs: &DeviceArray<T>, mode: BroadcastMode) -> Result<Self> {
        self.binary(BinaryOp::Sub, rhs, mode)
    }

    pub fn mul(&self, rhs: &DeviceArray<T>, mode: BroadcastMode) -> Result<Self> {
        self.binary(BinaryOp::Mul, rhs, mode)
    }

    pub fn div(&self, rhs: &DeviceArray<T>, mode: BroadcastMode) -> Result<Self> {
        self.binary(BinaryOp::Div, rhs, mode)
    }

    /// `self[i] op scalar`
    pub fn binary_scalar(&self, op: BinaryOp, scalar: T) -> Self {
        self.scalar_node(op, scalar, false)
    }

    /// `scalar op self[i]`
    pub fn binary_scalar_reversed(&self, op: BinaryOp, scalar: T) -> Self {
        self.scalar_node(op, scalar, true)
    }

    fn scalar_node(&self, op: BinaryOp, scalar: T, reversed: bool) -> Self {
        self.deferred(
            self.shape,
            Expr::Scalar { op, src: Box::new(self.expr.clone()), shape: self.shape, scalar, reversed },
        )
    }

    pub fn unary(&self, op: UnaryOp) -> Self {
        self.deferred(
            self.shape,
            Expr::Map { code: unary_code(op), f: unary_fn(op), src: Box::new(self.expr.clone()) },
        )
    }

    pub fn relu(&self) -> Self {
        self.unary(UnaryOp::Relu)
    }

    pub fn heaviside(&self) -> Self {
        self.unary(UnaryOp::Heaviside)
    }

    /// `alpha * op(self) * op(rhs) + beta * c` for rank-2 operands.
    ///
    /// Without `c` the product starts from zeros and `beta` has no effect.
    pub fn matmul(
        &self,
        rhs: &DeviceArray<T>,
        trans_a: impl Into<Transpose>,
        trans_b: impl Into<Transpose>,
        alpha: T,
        beta: T,
        c: Option<&DeviceArray<T>>,
    ) -> Result<Self> {
        let mismatch = |lhs: &Shape, rhs: &Shape| KernelError::ShapeMismatch {
            op: "matmul",
            lhs: lhs.dims().to_vec(),
            rhs: rhs.dims().to_vec(),
        };
        if self.shape.rank() != 2 || rhs.shape.rank() != 2 {
            return Err(mismatch(&self.shape, &rhs.shape));
        }
        let (trans_a, trans_b) = (trans_a.into(), trans_b.into());
        let (m, k) = if trans_a.is_trans() { (self.shape[1], self.shape[0]) } else { (self.shape[0], self.shape[1]) };
        let (k2, n) = if trans_b.is_trans() { (rhs.shape[1], rhs.shape[0]) } else { (rhs.shape[0], rhs.shape[1]) };
        if k != k2 {
            return Err(mismatch(&self.shape, &rhs.shape));
        }
        let shape = Shape::new(&[m, n])?;
        if let Some(c) = c
            && c.shape != shape
        {
            return Err(mismatch(&shape, &c.shape));
        }

        let cfg = GemmConfig::new(m, n, k).trans_a(trans_a).trans_b(trans_b).alpha(alpha).beta(beta);
        Ok(self.deferred(
            shape,
            Expr::Matmul {
                cfg,
                a: Box::new(self.expr.clone()),
                b: Box::new(rhs.expr.clone()),
                c: c.map(|c| Box::new(c.expr.clone())),
            },
        ))
    }

    /// Reduces along `axis`.
    pub fn reduce(&self, op: ReduceOp, axis: usize) -> Result<Self> {
        let out = self.shape.remove_axis(axis)?;
        let mut host = vec![T::ZERO; out.count()];
        cpu::shape::reduce(op, &self.host()?, &self.shape, axis, &mut host, None)?;
        Self::from_parts(out, &host)
    }

    /// Max/min along `axis`, plus the selected positions.
    pub fn reduce_with_context(&self, op: ReduceOp, axis: usize) -> Result<(Self, DeviceArray<i32>)> {
        let out = self.shape.remove_axis(axis)?;
        let mut host = vec![T::ZERO; out.count()];
        let mut context = vec![0i32; out.count()];
        cpu::shape::reduce(op, &self.host()?, &self.shape, axis, &mut host, Some(&mut context[..]))?;
        Ok((Self::from_parts(out, &host)?, DeviceArray::from_parts(out, &context)?))
    }

    /// Largest element and its flat index; `None` when empty.
    pub fn argmax(&self) -> Result<Option<(T, usize)>> {
        Ok(cpu::vector::max_index(Strided::contiguous(&self.host()?)))
    }

    /// Smallest element and its flat index; `None` when empty.
    pub fn argmin(&self) -> Result<Option<(T, usize)>> {
        Ok(cpu::vector::min_index(Strided::contiguous(&self.host()?)))
    }

    /// Moves axis `i` to position `arrangement[i]`, optionally adding `add`
    /// (shaped like the result).
    pub fn permute(&self, arrangement: &[usize], add: Option<&DeviceArray<T>>) -> Result<Self> {
        let out = cpu::shape::permuted_shape(&self.shape, arrangement)?;
        let add = add.map(DeviceArray::host).transpose()?;
        let mut host = vec![T::ZERO; out.count()];
        cpu::shape::permute_axes(&self.host()?, &self.shape, arrangement, &mut host, add.as_deref())?;
        Self::from_parts(out, &host)
    }

    /// Reverses the first axis, optionally adding `add` (same shape).
    pub fn reverse(&self, add: Option<&DeviceArray<T>>) -> Result<Self> {
        let add = add.map(DeviceArray::host).transpose()?;
        let mut host = vec![T::ZERO; self.len()];
        cpu::shape::reverse(&self.host()?, &self.shape, &mut host, add.as_deref())?;
        Self::from_parts(self.shape, &host)
    }

    /// Concatenates `parts` along `axis`.
    pub fn concat(parts: &[&DeviceArray<T>], axis: usize) -> Result<Self> {
        let hosts = parts.iter().map(|p| p.host()).collect::<Result<Vec<_>>>()?;
        let views: Vec<(&[T], Shape)> = hosts.iter().zip(parts).map(|(h, p)| (h.as_slice(), p.shape)).collect();
        let total: usize = hosts.iter().map(Vec::len).sum();
        let mut host = vec![T::ZERO; total];
        let out = cpu::shape::stack(&views, axis, &mut host)?;
        Self::from_parts(out, &host)
    }

    /// Reads along `axis` at the positions in `context`.
    pub fn gather(&self, context: &DeviceArray<i32>, axis: usize, ignore_index: Option<i32>) -> Result<Self> {
        let out = self.shape.remove_axis(axis)?;
        let mut host = vec![T::ZERO; out.count()];
        cpu::gather::gather(&self.host()?, &self.shape, &context.host()?, &mut host, axis, ignore_index)?;
        Self::from_parts(out, &host)
    }

    /// Writes `self` into a zeroed array that has `axis` re-inserted with
    /// `extent`, at the positions in `context`.
    pub fn scatter(
        &self,
        context: &DeviceArray<i32>,
        axis: usize,
        extent: usize,
        ignore_index: Option<i32>,
    ) -> Result<Self> {
        if axis > self.shape.rank() {
            return Err(KernelError::AxisOutOfRange { axis, rank: self.shape.rank() + 1 });
        }
        let mut dims = self.shape.dims().to_vec();
        dims.insert(axis, extent);
        let out = Shape::new(&dims)?;
        let mut host = vec![T::ZERO; out.count()];
        cpu::gather::scatter(&self.host()?, &context.host()?, &mut host, &out, axis, ignore_index)?;
        Self::from_parts(out, &host)
    }

    /// `lower, lower + step, ...` up to but excluding `upper`.
    pub fn arange(lower: T, upper: T, step: T) -> Result<Self> {
        let len = cpu::shape::arange_len(lower, upper, step)?;
        let mut host = vec![T::ZERO; len];
        cpu::vector::ramp(lower, step, StridedMut::contiguous(&mut host));
        Self::from_parts(Shape::new(&[len])?, &host)
    }

    /// Column matrix `[patch_len, columns]` of an image shaped per `setup`.
    pub fn img2col(&self, setup: &Img2ColSetup) -> Result<Self> {
        setup.check()?;
        let out = Shape::new(&[setup.patch_len(), setup.columns()])?;
        let mut host = vec![T::ZERO; out.count()];
        cpu::img2col::img2col(setup, &self.host()?, &mut host)?;
        Self::from_parts(out, &host)
    }

    /// Image `[batch, channels, height, width]` accumulated from a column matrix.
    pub fn col2img(&self, setup: &Img2ColSetup) -> Result<Self> {
        setup.check()?;
        let out = Shape::new(&[setup.batch_size, setup.channels, setup.height, setup.width])?;
        let mut host = vec![T::ZERO; out.count()];
        cpu::img2col::col2img(setup, &self.host()?, &mut host)?;
        Self::from_parts(out, &host)
    }

    /// The sub-array selected by `index`; `None` spans an axis.
    pub fn subscript(&self, index: &[Option<usize>]) -> Result<Self> {
        let out = cpu::shape::subscript_shape(&self.shape, index)?;
        let mut host = vec![T::ZERO; out.count()];
        cpu::shape::subscript_read(&self.host()?, &self.shape, index, &mut host)?;
        Self::from_parts(out, &host)
    }

    /// Overwrites the sub-array selected by `index` with `values`.
    pub fn subscript_write(&mut self, index: &[Option<usize>], values: &DeviceArray<T>) -> Result<()> {
        let mut host = self.host()?;
        cpu::shape::subscript_write(&mut host, &self.shape, index, &values.host()?)?;
        *self = Self::from_parts(self.shape, &host)?;
        Ok(())
    }
}

impl<T: Float> DeviceArray<T> {
    pub fn float_unary(&self, op: FloatOp) -> Self {
        self.deferred(
            self.shape,
            Expr::Map { code: float_code(op), f: float_fn(op), src: Box::new(self.expr.clone()) },
        )
    }
}
