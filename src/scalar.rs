//! Element types the kernels are generic over.
//!
//! Three scalar kinds are supported, named by a single-letter suffix in the
//! C ABI: `s` (`f32`), `d` (`f64`) and `i` (`i32`). Integer kinds only get
//! arithmetic; transcendental functions require [`Float`].
//!
//! Integer arithmetic in the kernels wraps on overflow, in debug and release
//! builds alike. Integer division by zero is rejected by the kernels with
//! [`KernelError::DivisionByZero`](crate::error::KernelError::DivisionByZero).

use core::fmt::Debug;
use core::ops::{Add, Div, Mul, Neg, Sub};

/// Tag for the three scalar kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ScalarKind {
    F32 = 0,
    F64,
    I32,
}

impl ScalarKind {
    /// Single-letter suffix used in exported symbol names.
    pub const fn suffix(self) -> char {
        match self {
            ScalarKind::F32 => 's',
            ScalarKind::F64 => 'd',
            ScalarKind::I32 => 'i',
        }
    }

    pub const fn is_integer(self) -> bool {
        matches!(self, ScalarKind::I32)
    }

    /// Size of one element in bytes.
    pub const fn size(self) -> usize {
        match self {
            ScalarKind::F32 | ScalarKind::I32 => 4,
            ScalarKind::F64 => 8,
        }
    }
}

/// A numeric element that every kernel accepts.
///
/// `max_of`/`min_of` follow `x >= y ? x : y` semantics, so a NaN on the left
/// yields the right operand.
pub trait Scalar:
    Copy
    + Send
    + Sync
    + Default
    + Debug
    + PartialOrd
    + bytemuck::Pod
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + Div<Output = Self>
    + Neg<Output = Self>
    + 'static
{
    const KIND: ScalarKind;
    const ZERO: Self;
    const ONE: Self;

    /// Converts an element index into the scalar domain (used by `ramp`).
    fn from_usize(v: usize) -> Self;

    fn from_f64(v: f64) -> Self;

    fn to_f64(self) -> f64;

    /// `self + rhs`, wrapping for integers.
    fn wrapping_add(self, rhs: Self) -> Self;

    /// `self - rhs`, wrapping for integers.
    fn wrapping_sub(self, rhs: Self) -> Self;

    /// `self * rhs`, wrapping for integers.
    fn wrapping_mul(self, rhs: Self) -> Self;

    fn wrapping_neg(self) -> Self;

    /// `self / rhs`, or `None` for an integer zero divisor.
    /// `i32::MIN / -1` wraps to `i32::MIN`.
    fn checked_div(self, rhs: Self) -> Option<Self>;

    #[inline]
    fn max_of(a: Self, b: Self) -> Self {
        if a >= b { a } else { b }
    }

    #[inline]
    fn min_of(a: Self, b: Self) -> Self {
        if a <= b { a } else { b }
    }
}

impl Scalar for f32 {
    const KIND: ScalarKind = ScalarKind::F32;
    const ZERO: Self = 0.0;
    const ONE: Self = 1.0;

    #[inline]
    fn from_usize(v: usize) -> Self {
        v as f32
    }

    #[inline]
    fn from_f64(v: f64) -> Self {
        v as f32
    }

    #[inline]
    fn to_f64(self) -> f64 {
        self as f64
    }

    #[inline]
    fn wrapping_add(self, rhs: Self) -> Self {
        self + rhs
    }

    #[inline]
    fn wrapping_sub(self, rhs: Self) -> Self {
        self - rhs
    }

    #[inline]
    fn wrapping_mul(self, rhs: Self) -> Self {
        self * rhs
    }

    #[inline]
    fn wrapping_neg(self) -> Self {
        -self
    }

    #[inline]
    fn checked_div(self, rhs: Self) -> Option<Self> {
        Some(self / rhs)
    }
}

impl Scalar for f64 {
    const KIND: ScalarKind = ScalarKind::F64;
    const ZERO: Self = 0.0;
    const ONE: Self = 1.0;

    #[inline]
    fn from_usize(v: usize) -> Self {
        v as f64
    }

    #[inline]
    fn from_f64(v: f64) -> Self {
        v
    }

    #[inline]
    fn to_f64(self) -> f64 {
        self
    }

    #[inline]
    fn wrapping_add(self, rhs: Self) -> Self {
        self + rhs
    }

    #[inline]
    fn wrapping_sub(self, rhs: Self) -> Self {
        self - rhs
    }

    #[inline]
    fn wrapping_mul(self, rhs: Self) -> Self {
        self * rhs
    }

    #[inline]
    fn wrapping_neg(self) -> Self {
        -self
    }

    #[inline]
    fn checked_div(self, rhs: Self) -> Option<Self> {
        Some(self / rhs)
    }
}

impl Scalar for i32 {
    const KIND: ScalarKind = ScalarKind::I32;
    const ZERO: Self = 0;
    const ONE: Self = 1;

    #[inline]
    fn from_usize(v: usize) -> Self {
        v as i32
    }

    #[inline]
    fn from_f64(v: f64) -> Self {
        v as i32
    }

    #[inline]
    fn to_f64(self) -> f64 {
        self as f64
    }

    #[inline]
    fn wrapping_add(self, rhs: Self) -> Self {
        i32::wrapping_add(self, rhs)
    }

    #[inline]
    fn wrapping_sub(self, rhs: Self) -> Self {
        i32::wrapping_sub(self, rhs)
    }

    #[inline]
    fn wrapping_mul(self, rhs: Self) -> Self {
        i32::wrapping_mul(self, rhs)
    }

    #[inline]
    fn wrapping_neg(self) -> Self {
        i32::wrapping_neg(self)
    }

    #[inline]
    fn checked_div(self, rhs: Self) -> Option<Self> {
        if rhs == 0 { None } else { Some(i32::wrapping_div(self, rhs)) }
    }
}

/// Floating point scalars, backed by `libm` so results do not depend on the
/// platform's C math library.
pub trait Float: Scalar {
    fn sqrt(self) -> Self;
    fn exp(self) -> Self;
    fn ln(self) -> Self;
    fn sin(self) -> Self;
    fn cos(self) -> Self;
    fn tan(self) -> Self;
    fn tanh(self) -> Self;
    /// Magnitude of `self` with the sign of `sign`.
    fn copysign(self, sign: Self) -> Self;
}

impl Float for f32 {
    #[inline]
    fn sqrt(self) -> Self {
        libm::sqrtf(self)
    }

    #[inline]
    fn exp(self) -> Self {
        libm::expf(self)
    }

    #[inline]
    fn ln(self) -> Self {
        libm::logf(self)
    }

    #[inline]
    fn sin(self) -> Self {
        libm::sinf(self)
    }

    #[inline]
    fn cos(self) -> Self {
        libm::cosf(self)
    }

    #[inline]
    fn tan(self) -> Self {
        libm::tanf(self)
    }

    #[inline]
    fn tanh(self) -> Self {
        libm::tanhf(self)
    }

    #[inline]
    fn copysign(self, sign: Self) -> Self {
        libm::copysignf(self, sign)
    }
}

impl Float for f64 {
    #[inline]
    fn sqrt(self) -> Self {
        libm::sqrt(self)
    }

    #[inline]
    fn exp(self) -> Self {
        libm::exp(self)
    }

    #[inline]
    fn ln(self) -> Self {
        libm::log(self)
    }

    #[inline]
    fn sin(self) -> Self {
        libm::sin(self)
    }

    #[inline]
    fn cos(self) -> Self {
        libm::cos(self)
    }

    #[inline]
    fn tan(self) -> Self {
        libm::tan(self)
    }

    #[inline]
    fn tanh(self) -> Self {
        libm::tanh(self)
    }

    #[inline]
    fn copysign(self, sign: Self) -> Self {
        libm::copysign(self, sign)
    }
}
