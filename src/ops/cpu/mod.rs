//! Parallel CPU kernels
//!
//! # CPU Backend
//!
//! This module holds the reference implementation of every kernel. It is the
//! default target of [`crate::ops::dispatch`] and the fallback whenever the
//! selected backend cannot serve a call.
//!
//! ## Features
//!
//! - Parallel execution using [`rayon`](https://docs.rs/rayon)
//! - Generic over [`Scalar`](crate::scalar::Scalar) (`f32`, `f64`, `i32`)
//! - Operands validated before any output is written
//!
//! ## Implemented Ops
//!
//! - [`vector`]: strided fill, ramp, unary/binary maps, reductions, copy, transpose
//! - [`gemm`]: `C = alpha * op(A) * op(B) + beta * C`
//! - [`gather`]: axis gather and its scatter adjoint
//! - [`img2col`]: patch extraction and col2img accumulation
//! - [`broadcast`]: shaped element-wise operations
//! - [`shape`]: axis reductions, permutation, stacking, subscripting, band
//!
//! ## Determinism
//!
//! Every output element is produced by exactly one task, and accumulations
//! run in a fixed order, so results do not depend on the thread count.

pub mod broadcast;
pub mod gather;
pub mod gemm;
pub mod img2col;
pub mod shape;
pub mod vector;
