//! Owned tensors over the dispatch layer.
//!
//! # Tensor Utilities
//!
//! [`Tensor`] pairs a row-major [`Shape`] with its data and forwards every
//! operation to [`ops::dispatch`](crate::ops::dispatch), so it runs on
//! whichever backend is active. It is a convenience for callers and tests;
//! the kernels themselves only ever see borrowed slices.
//!
//! ## Design Highlights
//! - Tensors are strongly typed: `Tensor<T>` for any [`Scalar`]
//! - Shapes are [`Shape`] values of rank at most four, checked on construction
//! - Operations return a fresh tensor and never mutate their inputs
//! - The `tensor!` macro builds tensors from nested array literals
//!
//! ## Example
//!
//! ```rust
//! use tensor_hal::tensors::Tensor;
//! let t = Tensor::new(&[2, 3], vec![1.0f32, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
//! assert_eq!(t.dims(), &[2, 3]);
//! assert_eq!(t.transpose().unwrap().data(), &[1.0, 4.0, 2.0, 5.0, 3.0, 6.0]);
//! ```

use crate::config::{BroadcastMode, GemmConfig, Img2ColSetup};
use crate::error::{KernelError, Result};
use crate::ops::{dispatch, BinaryOp, FloatOp, ReduceOp, UnaryOp};
use crate::scalar::{Float, Scalar};
use crate::view::{expect_len, Shape, Strided, StridedMut};

/// An N-dimensional (N ≤ 4) tensor with a shape and flat row-major data.
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor<T> {
    shape: Shape,
    data: Vec<T>,
}

impl<T: Scalar> Tensor<T> {
    /// Creates a tensor, checking that `data` fills `dims` exactly.
    pub fn new(dims: &[usize], data: Vec<T>) -> Result<Self> {
        let shape = Shape::new(dims)?;
        expect_len("tensor", &shape, data.len())?;
        Ok(Self { shape, data })
    }

    /// Creates a tensor from a literal; used by [`tensor!`](crate::tensor).
    ///
    /// # Panics
    /// Panics if the literal nests deeper than four levels.
    #[doc(hidden)]
    pub fn from_literal(dims: &[usize], data: Vec<T>) -> Self {
        match Self::new(dims, data) {
            Ok(t) => t,
            Err(e) => panic!("invalid tensor literal: {e}"),
        }
    }

    pub fn filled(dims: &[usize], value: T) -> Result<Self> {
        let shape = Shape::new(dims)?;
        Ok(Self { shape, data: vec![value; shape.count()] })
    }

    pub fn zeros(dims: &[usize]) -> Result<Self> {
        Self::filled(dims, T::ZERO)
    }

    /// `[lower, lower + step, ...)` stopping before `upper`.
    pub fn arange(lower: T, upper: T, step: T) -> Result<Self> {
        let len = dispatch::arange_len(lower, upper, step)?;
        let mut t = Self::zeros(&[len])?;
        dispatch::ramp(lower, step, StridedMut::contiguous(&mut t.data));
        Ok(t)
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn dims(&self) -> &[usize] {
        self.shape.dims()
    }

    pub fn rank(&self) -> usize {
        self.shape.rank()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn data(&self) -> &[T] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [T] {
        &mut self.data
    }

    pub fn into_data(self) -> Vec<T> {
        self.data
    }

    /// Reinterprets the data under new extents with the same element count.
    pub fn reshape(mut self, dims: &[usize]) -> Result<Self> {
        let shape = Shape::new(dims)?;
        expect_len("reshape", &shape, self.data.len())?;
        self.shape = shape;
        Ok(self)
    }

    fn like(&self, shape: Shape) -> Self {
        Self { shape, data: vec![T::ZERO; shape.count()] }
    }

    fn matrix_dims(&self, op: &'static str) -> Result<(usize, usize)> {
        match *self.dims() {
            [rows, cols] => Ok((rows, cols)),
            _ => Err(KernelError::ShapeMismatch { op, lhs: self.dims().to_vec(), rhs: vec![0, 0] }),
        }
    }

    pub fn unary(&self, op: UnaryOp) -> Result<Self> {
        let mut out = self.like(self.shape);
        dispatch::unary(op, Strided::contiguous(&self.data), StridedMut::contiguous(&mut out.data))?;
        Ok(out)
    }

    /// Element-wise `self op rhs` under `mode`.
    pub fn binary(&self, op: BinaryOp, rhs: &Self, mode: BroadcastMode) -> Result<Self> {
        let shape = dispatch::broadcast_shape(&self.shape, &rhs.shape, mode)?;
        let mut out = self.like(shape);
        dispatch::broadcast_binary(op, &self.data, &self.shape, &rhs.data, &rhs.shape, &mut out.data, mode)?;
        Ok(out)
    }

    pub fn add(&self, rhs: &Self) -> Result<Self> {
        self.binary(BinaryOp::Add, rhs, BroadcastMode::Broadcast)
    }

    pub fn sub(&self, rhs: &Self) -> Result<Self> {
        self.binary(BinaryOp::Sub, rhs, BroadcastMode::Broadcast)
    }

    pub fn mul(&self, rhs: &Self) -> Result<Self> {
        self.binary(BinaryOp::Mul, rhs, BroadcastMode::Broadcast)
    }

    pub fn div(&self, rhs: &Self) -> Result<Self> {
        self.binary(BinaryOp::Div, rhs, BroadcastMode::Broadcast)
    }

    /// `self op scalar`, or `scalar op self` when `reversed`.
    pub fn binary_scalar(&self, op: BinaryOp, scalar: T, reversed: bool) -> Result<Self> {
        let mut out = self.like(self.shape);
        let src = Strided::contiguous(&self.data[..]);
        let dst = StridedMut::contiguous(&mut out.data[..]);
        if reversed {
            dispatch::binary_scalar_reversed(op, scalar, src, dst)?;
        } else {
            dispatch::binary_scalar(op, src, scalar, dst)?;
        }
        Ok(out)
    }

    /// Clamps every element from below at `thresh`.
    pub fn threshold(&self, thresh: T) -> Result<Self> {
        let mut out = self.like(self.shape);
        dispatch::threshold(Strided::contiguous(&self.data), thresh, StridedMut::contiguous(&mut out.data))?;
        Ok(out)
    }

    pub fn sum(&self) -> T {
        dispatch::sum(Strided::contiguous(&self.data))
    }

    /// Inner product of two tensors with equal element counts.
    pub fn dot(&self, rhs: &Self) -> Result<T> {
        dispatch::dot(Strided::contiguous(&self.data), Strided::contiguous(&rhs.data))
    }

    /// Largest element and its flat index; `None` when empty.
    pub fn max_index(&self) -> Option<(T, usize)> {
        dispatch::max_index(Strided::contiguous(&self.data))
    }

    pub fn min_index(&self) -> Option<(T, usize)> {
        dispatch::min_index(Strided::contiguous(&self.data))
    }

    /// Matrix product of two rank-2 tensors.
    pub fn matmul(&self, rhs: &Self) -> Result<Self> {
        let (m, k) = self.matrix_dims("matmul")?;
        let (k2, n) = rhs.matrix_dims("matmul")?;
        if k != k2 {
            return Err(KernelError::ShapeMismatch {
                op: "matmul",
                lhs: self.dims().to_vec(),
                rhs: rhs.dims().to_vec(),
            });
        }
        let mut out = self.like(Shape::new(&[m, n])?);
        dispatch::gemm(&GemmConfig::new(m, n, k), &self.data, &rhs.data, &mut out.data)?;
        Ok(out)
    }

    /// Swaps the axes of a rank-2 tensor.
    pub fn transpose(&self) -> Result<Self> {
        let (rows, cols) = self.matrix_dims("transpose")?;
        let mut out = self.like(Shape::new(&[cols, rows])?);
        dispatch::transpose(&self.data, &mut out.data, cols, rows)?;
        Ok(out)
    }

    /// Moves axis `i` to position `arrangement[i]`.
    pub fn permute(&self, arrangement: &[usize]) -> Result<Self> {
        let mut out = self.like(dispatch::permuted_shape(&self.shape, arrangement)?);
        dispatch::permute_axes(&self.data, &self.shape, arrangement, &mut out.data, None)?;
        Ok(out)
    }

    /// Reverses the order along axis 0.
    pub fn reverse(&self) -> Result<Self> {
        let mut out = self.like(self.shape);
        dispatch::reverse(&self.data, &self.shape, &mut out.data, None)?;
        Ok(out)
    }

    /// Reduces along `axis`, dropping it from the shape.
    pub fn reduce(&self, op: ReduceOp, axis: usize) -> Result<Self> {
        let mut out = self.like(self.shape.remove_axis(axis)?);
        dispatch::reduce(op, &self.data, &self.shape, axis, &mut out.data, None)?;
        Ok(out)
    }

    /// Reduces along every axis in `axes`.
    pub fn reduce_axes(&self, op: ReduceOp, axes: &[usize]) -> Result<Self> {
        let mut shape = self.shape;
        let mut sorted = axes.to_vec();
        sorted.sort_unstable_by(|a, b| b.cmp(a));
        sorted.dedup();
        for &axis in &sorted {
            shape = shape.remove_axis(axis)?;
        }
        let mut out = self.like(shape);
        dispatch::reduce_axes(op, &self.data, &self.shape, axes, &mut out.data)?;
        Ok(out)
    }

    fn arg_reduce(&self, op: ReduceOp, axis: usize) -> Result<Tensor<i32>> {
        let reduced = self.shape.remove_axis(axis)?;
        let mut values = vec![T::ZERO; reduced.count()];
        let mut context = vec![0i32; reduced.count()];
        dispatch::reduce(op, &self.data, &self.shape, axis, &mut values, Some(&mut context[..]))?;
        Ok(Tensor { shape: reduced, data: context })
    }

    /// Positions of the maxima along `axis`; ties keep the first.
    pub fn argmax(&self, axis: usize) -> Result<Tensor<i32>> {
        self.arg_reduce(ReduceOp::Max, axis)
    }

    pub fn argmin(&self, axis: usize) -> Result<Tensor<i32>> {
        self.arg_reduce(ReduceOp::Min, axis)
    }

    /// Picks one element along `axis` per position of `context`.
    pub fn gather(&self, axis: usize, context: &Tensor<i32>, ignore_index: Option<i32>) -> Result<Self> {
        let mut out = self.like(self.shape.remove_axis(axis)?);
        dispatch::gather(&self.data, &self.shape, &context.data, &mut out.data, axis, ignore_index)?;
        Ok(out)
    }

    /// Inverse of [`Tensor::gather`]: inserts `axis` with `extent` positions.
    pub fn scatter(&self, axis: usize, extent: usize, context: &Tensor<i32>, ignore_index: Option<i32>) -> Result<Self> {
        let mut dims = self.dims().to_vec();
        if axis > dims.len() {
            return Err(KernelError::AxisOutOfRange { axis, rank: dims.len() + 1 });
        }
        dims.insert(axis, extent);
        let mut out = self.like(Shape::new(&dims)?);
        dispatch::scatter(&self.data, &context.data, &mut out.data, &out.shape, axis, ignore_index)?;
        Ok(out)
    }

    /// Concatenates `parts` along `axis`.
    pub fn stack(parts: &[&Self], axis: usize) -> Result<Self> {
        let views: Vec<(&[T], Shape)> = parts.iter().map(|t| (&t.data[..], t.shape)).collect();
        let Some(first) = parts.first() else {
            return Err(KernelError::Configuration("stack needs at least one part".into()));
        };
        first.shape.check_axis(axis)?;
        let total = parts.iter().map(|t| t.dims().get(axis).copied().unwrap_or(0)).sum();
        let mut out = first.like(first.shape.with_axis(axis, total)?);
        out.shape = dispatch::stack(&views, axis, &mut out.data)?;
        Ok(out)
    }

    /// Selects `index[a]` along each leading axis `a`; `None` keeps the axis.
    pub fn subscript(&self, index: &[Option<usize>]) -> Result<Self> {
        let mut out = self.like(dispatch::subscript_shape(&self.shape, index)?);
        dispatch::subscript_read(&self.data, &self.shape, index, &mut out.data)?;
        Ok(out)
    }

    /// Writes `values` into the region [`Tensor::subscript`] would read.
    pub fn subscript_write(&mut self, index: &[Option<usize>], values: &Self) -> Result<()> {
        dispatch::subscript_write(&mut self.data, &self.shape, index, &values.data)
    }

    /// Zeroes a rank-2 tensor outside the diagonal band.
    pub fn band(&self, below: Option<usize>, above: Option<usize>) -> Result<Self> {
        let (rows, cols) = self.matrix_dims("band")?;
        let mut out = self.like(self.shape);
        dispatch::band(&self.data, &mut out.data, rows, cols, below, above)?;
        Ok(out)
    }

    /// Unfolds a `[batch, channels, height, width]` image into a
    /// `[patch_len, columns]` matrix.
    pub fn img2col(&self, setup: &Img2ColSetup) -> Result<Self> {
        setup.check()?;
        let mut out = self.like(Shape::new(&[setup.patch_len(), setup.columns()])?);
        dispatch::img2col(setup, &self.data, &mut out.data)?;
        Ok(out)
    }

    /// Folds a column matrix back into an image, summing overlaps.
    pub fn col2img(&self, setup: &Img2ColSetup) -> Result<Self> {
        setup.check()?;
        let dims = [setup.batch_size, setup.channels, setup.height, setup.width];
        let mut out = self.like(Shape::new(&dims)?);
        dispatch::col2img(setup, &self.data, &mut out.data)?;
        Ok(out)
    }
}

impl<T: Float> Tensor<T> {
    pub fn float_unary(&self, op: FloatOp) -> Result<Self> {
        let mut out = self.like(self.shape);
        dispatch::float_unary(op, Strided::contiguous(&self.data), StridedMut::contiguous(&mut out.data))?;
        Ok(out)
    }
}

/// Defines a tensor from nested literal arrays.
///
/// Supports up to four levels of nesting as long as sublists are uniform in
/// shape.
///
/// # Panics
/// Panics on ragged literals and on nesting deeper than four levels.
///
/// # Example
/// ```
/// use tensor_hal::tensor;
/// let t = tensor!([[1.0f32, -2.0], [3.0, 4.0]]);
/// assert_eq!(t.dims(), &[2, 2]);
/// ```
#[macro_export]
macro_rules! tensor {
    (@parts [ $( $lit:literal ),+ $(,)? ]) => {{
        let data = ::std::vec![ $( $lit ),+ ];
        (::std::vec![data.len()], data)
    }};

    (@parts [ $( [ $( $inner:tt )* ] ),+ $(,)? ]) => {{
        let children = ::std::vec![ $( $crate::tensor!(@parts [ $( $inner )* ]) ),+ ];
        let first_shape = children[0].0.clone();
        assert!(children.iter().all(|c| c.0 == first_shape),
            "ragged tensor literal (rows have mismatched shapes)");
        let mut shape = ::std::vec![children.len()];
        shape.extend_from_slice(&first_shape);
        let mut data = ::std::vec::Vec::with_capacity(children.len() * children[0].1.len());
        for c in children { data.extend(c.1); }
        (shape, data)
    }};

    ($lit:literal) => {
        $crate::tensors::Tensor::from_literal(&[], ::std::vec![$lit])
    };

    ([ $( $body:tt )* ]) => {{
        let (shape, data) = $crate::tensor!(@parts [ $( $body )* ]);
        $crate::tensors::Tensor::from_literal(&shape, data)
    }};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn construction_checks_length() {
        assert!(Tensor::new(&[2, 2], vec![1.0f32; 3]).is_err());
        assert!(Tensor::new(&[1, 1, 1, 1, 1], vec![1.0f32]).is_err());
        let t = tensor!([[1, 2, 3], [4, 5, 6]]);
        assert_eq!(t.dims(), &[2, 3]);
        assert_eq!(tensor!(7.5f64).rank(), 0);
    }

    #[test]
    fn reshape_keeps_data() {
        let t = Tensor::<i32>::arange(0, 6, 1).unwrap().reshape(&[3, 2]).unwrap();
        assert_eq!(t.dims(), &[3, 2]);
        assert_eq!(t.data(), &[0, 1, 2, 3, 4, 5]);
        assert!(t.reshape(&[4]).is_err());
    }

    #[test]
    fn argmax_reports_first_tie() {
        let t = tensor!([[1.0f32, 3.0, 3.0], [2.0, 0.0, 1.0]]);
        assert_eq!(t.argmax(1).unwrap().data(), &[1, 0]);
        assert_eq!(t.argmin(0).unwrap().data(), &[0, 1, 1]);
    }

    #[test]
    fn scatter_inverts_gather() {
        let t = tensor!([[1, 2, 3], [4, 5, 6]]);
        let ctx = Tensor::new(&[2], vec![2, 0]).unwrap();
        let g = t.gather(1, &ctx, None).unwrap();
        assert_eq!(g.data(), &[3, 4]);
        let s = g.scatter(1, 3, &ctx, None).unwrap();
        assert_eq!(s.data(), &[0, 0, 3, 4, 0, 0]);
    }
}
