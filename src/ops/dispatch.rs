//! Operation Dispatch Layer
//!
//! This module selects the backend at runtime for each kernel, based on the
//! global [`Backend`].
//!
//! Each function tries the selected backend first:
//! 1. `Wgpu` (if compiled in and selected)
//! 2. Falls back to `Cpu`
//!
//! A GPU backend that cannot serve a call (wrong scalar kind, strided
//! operands, device error) runs the portable kernel itself, so the result is
//! the same whichever backend is active.
//!
//! The backend is read once per call, outside every loop.
//!
//! # Example
//! ```rust
//! use tensor_hal::config::GemmConfig;
//! use tensor_hal::ops::dispatch;
//!
//! let a = [1.0f32, 2.0, 3.0, 4.0];
//! let b = [1.0f32, 0.0, 0.0, 1.0];
//! let mut c = [0.0f32; 4];
//! dispatch::gemm(&GemmConfig::new(2, 2, 2), &a, &b, &mut c).unwrap();
//! assert_eq!(c, a);
//! ```

use crate::backend::{get_backend, Backend, Cpu, FloatKernels, Kernels};
use crate::config::{BroadcastMode, GemmConfig, Img2ColSetup};
use crate::error::Result;
use crate::ops::{BinaryOp, FloatOp, ReduceOp, UnaryOp};
use crate::scalar::{Float, Scalar};
use crate::view::{Shape, Strided, StridedMut};

pub use crate::ops::cpu::broadcast::broadcast_shape;
pub use crate::ops::cpu::shape::{
    arange_len, band, permute_axes, permuted_shape, reduce_axes, reverse, stack, subscript_read,
    subscript_shape, subscript_write, unstack,
};

/// Routes `$op` through the active backend's `$kernels` impl.
macro_rules! route {
    ($kernels:ident, $op:ident($($arg:expr),* $(,)?)) => {{
        match get_backend() {
            Backend::Wgpu => {
                #[cfg(feature = "wgpu")]
                {
                    tracing::debug!("{}: wgpu", stringify!($op));
                    return <super::wgpu::Wgpu as $kernels<_>>::$op($($arg),*);
                }
            }
            Backend::Cpu => {}
        }
        <Cpu as $kernels<_>>::$op($($arg),*)
    }};
}

pub fn fill<T: Scalar>(value: T, dst: StridedMut<'_, T>) {
    route!(Kernels, fill(value, dst))
}

pub fn ramp<T: Scalar>(start: T, increment: T, dst: StridedMut<'_, T>) {
    route!(Kernels, ramp(start, increment, dst))
}

pub fn unary<T: Scalar>(op: UnaryOp, src: Strided<'_, T>, dst: StridedMut<'_, T>) -> Result<()> {
    route!(Kernels, unary(op, src, dst))
}

pub fn float_unary<T: Float>(op: FloatOp, src: Strided<'_, T>, dst: StridedMut<'_, T>) -> Result<()> {
    route!(FloatKernels, float_unary(op, src, dst))
}

pub fn copysign<T: Float>(magnitude: Strided<'_, T>, sign: Strided<'_, T>, dst: StridedMut<'_, T>) -> Result<()> {
    route!(FloatKernels, copysign(magnitude, sign, dst))
}

pub fn binary<T: Scalar>(op: BinaryOp, lhs: Strided<'_, T>, rhs: Strided<'_, T>, dst: StridedMut<'_, T>) -> Result<()> {
    route!(Kernels, binary(op, lhs, rhs, dst))
}

pub fn binary_scalar<T: Scalar>(op: BinaryOp, lhs: Strided<'_, T>, scalar: T, dst: StridedMut<'_, T>) -> Result<()> {
    route!(Kernels, binary_scalar(op, lhs, scalar, dst))
}

pub fn binary_scalar_reversed<T: Scalar>(
    op: BinaryOp,
    scalar: T,
    rhs: Strided<'_, T>,
    dst: StridedMut<'_, T>,
) -> Result<()> {
    route!(Kernels, binary_scalar_reversed(op, scalar, rhs, dst))
}

pub fn threshold<T: Scalar>(src: Strided<'_, T>, thresh: T, dst: StridedMut<'_, T>) -> Result<()> {
    route!(Kernels, threshold(src, thresh, dst))
}

pub fn sum<T: Scalar>(src: Strided<'_, T>) -> T {
    route!(Kernels, sum(src))
}

pub fn dot<T: Scalar>(lhs: Strided<'_, T>, rhs: Strided<'_, T>) -> Result<T> {
    route!(Kernels, dot(lhs, rhs))
}

pub fn max_index<T: Scalar>(src: Strided<'_, T>) -> Option<(T, usize)> {
    route!(Kernels, max_index(src))
}

pub fn min_index<T: Scalar>(src: Strided<'_, T>) -> Option<(T, usize)> {
    route!(Kernels, min_index(src))
}

pub fn copy_strided<T: Scalar>(src: Strided<'_, T>, dst: StridedMut<'_, T>) -> Result<()> {
    route!(Kernels, copy_strided(src, dst))
}

pub fn transpose<T: Scalar>(src: &[T], dst: &mut [T], cols: usize, rows: usize) -> Result<()> {
    route!(Kernels, transpose(src, dst, cols, rows))
}

/// Dispatches `C = alpha * op(A) * op(B) + beta * C`.
pub fn gemm<T: Scalar>(cfg: &GemmConfig<T>, a: &[T], b: &[T], c: &mut [T]) -> Result<()> {
    tracing::debug!("gemm {}x{}x{} ({:?})", cfg.m, cfg.n, cfg.k, T::KIND);
    route!(Kernels, gemm(cfg, a, b, c))
}

pub fn gather<T: Scalar>(
    src: &[T],
    src_shape: &Shape,
    context: &[i32],
    dst: &mut [T],
    axis: usize,
    ignore_index: Option<i32>,
) -> Result<()> {
    route!(Kernels, gather(src, src_shape, context, dst, axis, ignore_index))
}

pub fn scatter<T: Scalar>(
    src: &[T],
    context: &[i32],
    dst: &mut [T],
    dst_shape: &Shape,
    axis: usize,
    ignore_index: Option<i32>,
) -> Result<()> {
    route!(Kernels, scatter(src, context, dst, dst_shape, axis, ignore_index))
}

pub fn img2col<T: Scalar>(setup: &Img2ColSetup, src: &[T], dst: &mut [T]) -> Result<()> {
    route!(Kernels, img2col(setup, src, dst))
}

pub fn col2img<T: Scalar>(setup: &Img2ColSetup, src: &[T], dst: &mut [T]) -> Result<()> {
    route!(Kernels, col2img(setup, src, dst))
}

/// Dispatches a shaped element-wise operation; returns the result shape.
pub fn broadcast_binary<T: Scalar>(
    op: BinaryOp,
    lhs: &[T],
    lhs_shape: &Shape,
    rhs: &[T],
    rhs_shape: &Shape,
    dst: &mut [T],
    mode: BroadcastMode,
) -> Result<Shape> {
    route!(Kernels, broadcast_binary(op, lhs, lhs_shape, rhs, rhs_shape, dst, mode))
}

pub fn reduce<T: Scalar>(
    op: ReduceOp,
    src: &[T],
    shape: &Shape,
    axis: usize,
    dst: &mut [T],
    context: Option<&mut [i32]>,
) -> Result<Shape> {
    route!(Kernels, reduce(op, src, shape, axis, dst, context))
}
