//! Backend selection module.
//!
//! This module defines the available computation backends and the
//! [`Kernels`] trait every backend implements.
//!
//! # Supported Backends
//!
//! - `Cpu`: portable rayon kernels (default).
//! - `Wgpu`: compute shaders through `wgpu` (feature `wgpu`).
//!
//! The active backend is stored globally using an `AtomicU8`, enabling fast
//! switching between CPU and GPU routing at runtime. The routing itself lives
//! in [`crate::ops::dispatch`].
//!
//! # Static dispatch
//!
//! Backends are zero-sized types. [`Kernels`] carries the portable
//! implementation as default methods, so a backend only overrides what it
//! accelerates and everything else falls through to the CPU kernels.

use core::convert::TryFrom;
use core::str::FromStr;
use core::sync::atomic::{AtomicU8, Ordering};

use crate::config::{BroadcastMode, GemmConfig, Img2ColSetup};
use crate::error::{KernelError, Result};
use crate::ops::{cpu, BinaryOp, FloatOp, ReduceOp, UnaryOp};
use crate::scalar::{Float, Scalar};
use crate::view::{Shape, Strided, StridedMut};

/// Enumeration of supported computation backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum Backend {
    /// Portable CPU backend (default).
    #[default]
    Cpu = 0,
    /// GPU-accelerated backend using `wgpu`.
    Wgpu,
}

impl TryFrom<u8> for Backend {
    type Error = ();

    fn try_from(value: u8) -> core::result::Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Cpu),
            1 => Ok(Self::Wgpu),
            _ => Err(()),
        }
    }
}

impl FromStr for Backend {
    type Err = KernelError;

    /// Parses `cpu` or `wgpu`, ignoring case and surrounding whitespace.
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cpu" => Ok(Self::Cpu),
            "wgpu" | "gpu" => Ok(Self::Wgpu),
            other => Err(KernelError::Configuration(format!("unknown backend {other:?}"))),
        }
    }
}

impl Backend {
    /// Whether this backend is compiled in and has a usable device.
    ///
    /// Checking `Wgpu` initialises the shared GPU context on first use.
    pub fn is_available(self) -> bool {
        match self {
            Backend::Cpu => true,
            Backend::Wgpu => {
                #[cfg(feature = "wgpu")]
                {
                    crate::ops::wgpu::is_available()
                }
                #[cfg(not(feature = "wgpu"))]
                {
                    false
                }
            }
        }
    }
}

/// Internal global state for the active backend.
///
/// Stores use `Release` and loads use `Acquire`, so a backend selected before
/// spawning work is visible to that work.
#[cfg(target_has_atomic = "8")]
static GLOBAL_DEFAULT_BACKEND: AtomicU8 = AtomicU8::new(Backend::Cpu as u8);

/// A mutable non-atomic unsynchronized backend state.
///
/// Targets without byte atomics are assumed single threaded.
#[cfg(not(target_has_atomic = "8"))]
static mut UNSAFE_GLOBAL_BACKEND: u8 = Backend::Cpu as u8;

/// Routes subsequent kernels to `b` and returns the backend it replaces.
///
/// This does not check availability; see
/// [`crate::config::RuntimeConfig::apply`] for the
/// checked path. An unavailable backend still produces correct results
/// because every GPU path falls back to the CPU kernels.
///
/// # Example
///
/// ```
/// use tensor_hal::backend::{get_backend, set_backend, Backend};
/// let previous = set_backend(Backend::Cpu);
/// assert_eq!(get_backend(), Backend::Cpu);
/// set_backend(previous);
/// ```
pub fn set_backend(b: Backend) -> Backend {
    #[cfg(target_has_atomic = "8")]
    let previous = GLOBAL_DEFAULT_BACKEND.swap(b as u8, Ordering::AcqRel);
    #[cfg(not(target_has_atomic = "8"))]
    let previous = unsafe { core::mem::replace(&mut *core::ptr::addr_of_mut!(UNSAFE_GLOBAL_BACKEND), b as u8) };

    let previous = Backend::try_from(previous).unwrap_or_default();
    if previous != b {
        tracing::debug!(?previous, current = ?b, "kernel backend switched");
    }
    previous
}

/// The backend kernels are currently routed to; [`Backend::Cpu`] until one
/// is set.
pub fn get_backend() -> Backend {
    #[cfg(target_has_atomic = "8")]
    let raw = GLOBAL_DEFAULT_BACKEND.load(Ordering::Acquire);
    #[cfg(not(target_has_atomic = "8"))]
    let raw = unsafe { *core::ptr::addr_of!(UNSAFE_GLOBAL_BACKEND) };

    Backend::try_from(raw).unwrap_or_default()
}

/// The operation set every backend provides for scalar kind `T`.
///
/// Default bodies are the portable kernels in [`crate::ops::cpu`].
pub trait Kernels<T: Scalar> {
    fn fill(value: T, dst: StridedMut<'_, T>) {
        cpu::vector::fill(value, dst)
    }

    fn ramp(start: T, increment: T, dst: StridedMut<'_, T>) {
        cpu::vector::ramp(start, increment, dst)
    }

    fn unary(op: UnaryOp, src: Strided<'_, T>, dst: StridedMut<'_, T>) -> Result<()> {
        cpu::vector::unary(op, src, dst)
    }

    fn binary(op: BinaryOp, lhs: Strided<'_, T>, rhs: Strided<'_, T>, dst: StridedMut<'_, T>) -> Result<()> {
        cpu::vector::binary(op, lhs, rhs, dst)
    }

    fn binary_scalar(op: BinaryOp, lhs: Strided<'_, T>, scalar: T, dst: StridedMut<'_, T>) -> Result<()> {
        cpu::vector::binary_scalar(op, lhs, scalar, dst)
    }

    fn binary_scalar_reversed(
        op: BinaryOp,
        scalar: T,
        rhs: Strided<'_, T>,
        dst: StridedMut<'_, T>,
    ) -> Result<()> {
        cpu::vector::binary_scalar_reversed(op, scalar, rhs, dst)
    }

    fn threshold(src: Strided<'_, T>, thresh: T, dst: StridedMut<'_, T>) -> Result<()> {
        cpu::vector::threshold(src, thresh, dst)
    }

    fn sum(src: Strided<'_, T>) -> T {
        cpu::vector::sum(src)
    }

    fn dot(lhs: Strided<'_, T>, rhs: Strided<'_, T>) -> Result<T> {
        cpu::vector::dot(lhs, rhs)
    }

    fn max_index(src: Strided<'_, T>) -> Option<(T, usize)> {
        cpu::vector::max_index(src)
    }

    fn min_index(src: Strided<'_, T>) -> Option<(T, usize)> {
        cpu::vector::min_index(src)
    }

    fn copy_strided(src: Strided<'_, T>, dst: StridedMut<'_, T>) -> Result<()> {
        cpu::vector::copy_strided(src, dst)
    }

    fn transpose(src: &[T], dst: &mut [T], cols: usize, rows: usize) -> Result<()> {
        cpu::vector::transpose(src, dst, cols, rows)
    }

    fn gemm(cfg: &GemmConfig<T>, a: &[T], b: &[T], c: &mut [T]) -> Result<()> {
        cpu::gemm::gemm(cfg, a, b, c)
    }

    fn gather(
        src: &[T],
        src_shape: &Shape,
        context: &[i32],
        dst: &mut [T],
        axis: usize,
        ignore_index: Option<i32>,
    ) -> Result<()> {
        cpu::gather::gather(src, src_shape, context, dst, axis, ignore_index)
    }

    fn scatter(
        src: &[T],
        context: &[i32],
        dst: &mut [T],
        dst_shape: &Shape,
        axis: usize,
        ignore_index: Option<i32>,
    ) -> Result<()> {
        cpu::gather::scatter(src, context, dst, dst_shape, axis, ignore_index)
    }

    fn img2col(setup: &Img2ColSetup, src: &[T], dst: &mut [T]) -> Result<()> {
        cpu::img2col::img2col(setup, src, dst)
    }

    fn col2img(setup: &Img2ColSetup, src: &[T], dst: &mut [T]) -> Result<()> {
        cpu::img2col::col2img(setup, src, dst)
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
        cpu::broadcast::broadcast_binary(op, lhs, lhs_shape, rhs, rhs_shape, dst, mode)
    }

    fn reduce(
        op: ReduceOp,
        src: &[T],
        shape: &Shape,
        axis: usize,
        dst: &mut [T],
        context: Option<&mut [i32]>,
    ) -> Result<Shape> {
        cpu::shape::reduce(op, src, shape, axis, dst, context)
    }
}

/// Float-only operations, layered on [`Kernels`].
pub trait FloatKernels<T: Float>: Kernels<T> {
    fn float_unary(op: FloatOp, src: Strided<'_, T>, dst: StridedMut<'_, T>) -> Result<()> {
        cpu::vector::float_unary(op, src, dst)
    }

    fn copysign(magnitude: Strided<'_, T>, sign: Strided<'_, T>, dst: StridedMut<'_, T>) -> Result<()> {
        cpu::vector::copysign(magnitude, sign, dst)
    }
}

/// The portable backend: every method is the default body.
#[derive(Debug, Clone, Copy, Default)]
pub struct Cpu;

impl<T: Scalar> Kernels<T> for Cpu {}
impl<T: Float> FloatKernels<T> for Cpu {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_round_trips_through_u8_and_str() {
        for b in [Backend::Cpu, Backend::Wgpu] {
            assert_eq!(Backend::try_from(b as u8), Ok(b));
        }
        assert!(Backend::try_from(7).is_err());
        assert_eq!(" Wgpu ".parse::<Backend>(), Ok(Backend::Wgpu));
        assert!(matches!("cuda".parse::<Backend>(), Err(KernelError::Configuration(_))));
    }

    #[test]
    fn set_backend_reports_previous() {
        let before = set_backend(Backend::Cpu);
        assert_eq!(set_backend(Backend::Cpu), Backend::Cpu);
        assert_eq!(get_backend(), Backend::Cpu);
        set_backend(before);
    }

    #[test]
    fn cpu_is_always_available() {
        assert!(Backend::Cpu.is_available());
        #[cfg(not(feature = "wgpu"))]
        assert!(!Backend::Wgpu.is_available());
    }

    #[test]
    fn cpu_uses_portable_kernels() {
        let mut out = [0.0f32; 3];
        <Cpu as Kernels<f32>>::ramp(1.0, 0.5, StridedMut::contiguous(&mut out));
        assert_eq!(out, [1.0, 1.5, 2.0]);
        let src = [4.0f64, 9.0];
        let mut root = [0.0f64; 2];
        <Cpu as FloatKernels<f64>>::float_unary(
            FloatOp::Sqrt,
            Strided::contiguous(&src),
            StridedMut::contiguous(&mut root),
        )
        .unwrap();
        assert_eq!(root, [2.0, 3.0]);
    }
}
