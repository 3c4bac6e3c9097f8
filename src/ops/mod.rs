//! # Numeric Kernels
//!
//! Operation set shared by every backend, and the backends themselves.
//!
//! ## Submodules
//!
//! - [`cpu`]: portable fallback kernels (rayon where the loop is independent)
//! - [`wgpu`] *(opt-in)*: compute-shader kernels and the device array binding
//! - [`dispatch`]: routes each call to the active [`Backend`](crate::backend::Backend)
//!
//! ## Adding an operation
//!
//! 1. Implement the portable kernel in `cpu`
//! 2. Add a default method to [`Kernels`](crate::backend::Kernels) calling it
//! 3. Override it in the `wgpu` backend if a shader exists
//! 4. Route it in `dispatch`
//!
//! ## Feature Flags
//!
//! - `wgpu`: enables the WebGPU backend and [`wgpu::DeviceArray`]

pub mod cpu;
pub mod dispatch;
#[cfg(feature = "wgpu")]
pub mod wgpu;

use crate::scalar::{Float, Scalar};

/// Element-wise unary operations defined for every scalar kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum UnaryOp {
    Negate = 0,
    Square,
    /// `x > 0 ? 1 : 0`
    Heaviside,
    /// `x > 0 ? x : 0`
    Relu,
}

impl UnaryOp {
    #[inline]
    pub fn apply<T: Scalar>(self, x: T) -> T {
        match self {
            UnaryOp::Negate => x.wrapping_neg(),
            UnaryOp::Square => x.wrapping_mul(x),
            UnaryOp::Heaviside => {
                if x > T::ZERO { T::ONE } else { T::ZERO }
            }
            UnaryOp::Relu => {
                if x > T::ZERO { x } else { T::ZERO }
            }
        }
    }
}

/// Transcendental functions, only defined for floating point kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum FloatOp {
    Sqrt = 0,
    Exp,
    Log,
    Sin,
    Cos,
    Tan,
    Tanh,
}

impl FloatOp {
    #[inline]
    pub fn apply<T: Float>(self, x: T) -> T {
        match self {
            FloatOp::Sqrt => x.sqrt(),
            FloatOp::Exp => x.exp(),
            FloatOp::Log => x.ln(),
            FloatOp::Sin => x.sin(),
            FloatOp::Cos => x.cos(),
            FloatOp::Tan => x.tan(),
            FloatOp::Tanh => x.tanh(),
        }
    }
}

/// Element-wise binary operations. `Sub` and `Div` compute `lhs op rhs`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum BinaryOp {
    Add = 0,
    Sub,
    Mul,
    Div,
    Max,
    Min,
}

impl BinaryOp {
    /// `lhs op rhs`, or `None` when an integer division has a zero divisor.
    #[inline]
    pub fn apply<T: Scalar>(self, lhs: T, rhs: T) -> Option<T> {
        Some(match self {
            BinaryOp::Add => lhs.wrapping_add(rhs),
            BinaryOp::Sub => lhs.wrapping_sub(rhs),
            BinaryOp::Mul => lhs.wrapping_mul(rhs),
            BinaryOp::Div => return lhs.checked_div(rhs),
            BinaryOp::Max => T::max_of(lhs, rhs),
            BinaryOp::Min => T::min_of(lhs, rhs),
        })
    }
}

/// Reductions along an axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReduceOp {
    Sum,
    Mean,
    Max,
    Min,
}

impl ReduceOp {
    /// Whether the reduction can report the index it selected.
    pub fn has_context(self) -> bool {
        matches!(self, ReduceOp::Max | ReduceOp::Min)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unary_ops_on_integers() {
        assert_eq!(UnaryOp::Negate.apply(4i32), -4);
        assert_eq!(UnaryOp::Square.apply(-3i32), 9);
        assert_eq!(UnaryOp::Heaviside.apply(0i32), 0);
        assert_eq!(UnaryOp::Heaviside.apply(2i32), 1);
        assert_eq!(UnaryOp::Relu.apply(-2.5f32), 0.0);
    }

    #[test]
    fn binary_ops_follow_operand_order() {
        assert_eq!(BinaryOp::Sub.apply(5.0f64, 2.0), Some(3.0));
        assert_eq!(BinaryOp::Div.apply(9i32, 2), Some(4));
        assert_eq!(BinaryOp::Div.apply(9i32, 0), None);
        assert_eq!(BinaryOp::Add.apply(i32::MAX, 1), Some(i32::MIN));
        assert_eq!(BinaryOp::Max.apply(1.0f32, 3.0), Some(3.0));
        assert_eq!(BinaryOp::Min.apply(1.0f32, 3.0), Some(1.0));
    }

    #[test]
    fn float_ops() {
        assert_eq!(FloatOp::Sqrt.apply(9.0f64), 3.0);
        assert!((FloatOp::Tanh.apply(0.5f32) - 0.462_117_16).abs() < 1e-6);
        assert!(FloatOp::Log.apply(-1.0f64).is_nan());
    }
}
