//! tensor_hal: strided tensor kernels behind a switchable backend.
//!
//! Designed as the arithmetic layer underneath a tensor library: every
//! operation reads and writes caller-owned buffers, and the same call runs on
//! the portable CPU kernels or, when compiled in and selected, on a WebGPU
//! device.
//!
//! # Features
//!
//! - Strided vector primitives (fill, ramp, unary/binary maps, sum, dot,
//!   max/min index, strided copy, transpose).
//! - Row-major GEMM with transposition, leading dimensions, `alpha` and `beta`.
//! - Axis gather/scatter with an optional ignored index.
//! - im2col/col2img for batched multi-channel images.
//! - Broadcasting, axis reductions, permutation and related shape kernels.
//! - A device-resident array with deferred evaluation (`wgpu` feature).
//! - A C ABI over all of the above.
//!
//! # Modules
//!
//! - [`ops`]: kernels, backends and the dispatch layer.
//! - [`backend`]: backend selection and the [`Kernels`](backend::Kernels) trait.
//! - [`config`]: kernel options and process-wide runtime settings.
//! - [`view`]: strided views and shape descriptors.
//! - [`tensors`]: an owned tensor type over the dispatch layer.
//! - [`ffi`]: `extern "C"` entry points.
//!
//! # Example
//!
//! ```rust
//! use tensor_hal::ops::{dispatch, BinaryOp};
//! use tensor_hal::view::{Strided, StridedMut};
//!
//! let x = [1.0f32, 2.0, 3.0, 4.0];
//! let mut y = [0.0f32; 2];
//! // every other element of x, times 10
//! dispatch::binary_scalar(
//!     BinaryOp::Mul,
//!     Strided::new(&x, 2, 2).unwrap(),
//!     10.0,
//!     StridedMut::contiguous(&mut y),
//! )
//! .unwrap();
//! assert_eq!(y, [10.0, 30.0]);
//! ```
//!
pub mod approx;
pub mod backend;
pub mod config;
pub mod error;
pub mod ffi;
pub mod ops;
pub mod scalar;
pub mod tensors;
pub mod view;

pub use backend::{get_backend, set_backend, Backend};
pub use error::{KernelError, Result};
pub use scalar::{Float, Scalar, ScalarKind};
pub use tensors::Tensor;
