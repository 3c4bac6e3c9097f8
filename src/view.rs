//! Borrowed views over caller-owned buffers.
//!
//! Kernels never own long-lived storage. They operate on [`Strided`] and
//! [`StridedMut`] views (a slice, a positive element stride and a logical
//! length) and on row-major [`Shape`] descriptors of rank at most four.
//!
//! Bounds are checked once when a view is built; iteration afterwards is a
//! plain `step_by` walk with no per-element checks beyond the slice's own.

use crate::error::{KernelError, Result};

/// Highest rank a [`Shape`] may describe.
pub const MAX_RANK: usize = 4;

/// Number of slice elements a strided walk touches.
#[inline]
pub(crate) fn extent(len: usize, stride: usize) -> usize {
    if len == 0 { 0 } else { (len - 1) * stride + 1 }
}

fn check(len: usize, stride: usize, available: usize) -> Result<()> {
    if stride == 0 {
        return Err(KernelError::InvalidStride { what: "vector stride", stride, minimum: 1 });
    }
    if extent(len, stride) > available {
        return Err(KernelError::ViewOutOfBounds { len, stride, available });
    }
    Ok(())
}

/// Read-only strided view: element `i` lives at `data[i * stride]`.
#[derive(Debug, Clone, Copy)]
pub struct Strided<'a, T> {
    data: &'a [T],
    stride: usize,
    len: usize,
}

impl<'a, T: Copy> Strided<'a, T> {
    /// Builds a view, rejecting zero strides and ranges past the slice end.
    pub fn new(data: &'a [T], stride: usize, len: usize) -> Result<Self> {
        check(len, stride, data.len())?;
        Ok(Self { data, stride, len })
    }

    /// A unit-stride view covering the whole slice.
    pub fn contiguous(data: &'a [T]) -> Self {
        Self { data, stride: 1, len: data.len() }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Returns the element at logical index `i`.
    #[inline]
    pub fn get(&self, i: usize) -> T {
        self.data[i * self.stride]
    }

    pub fn iter(&self) -> impl Iterator<Item = T> + '_ {
        self.data.iter().step_by(self.stride).take(self.len).copied()
    }

    /// The backing elements when the view is dense.
    pub fn as_contiguous(&self) -> Option<&'a [T]> {
        let data = self.data;
        (self.stride == 1).then(|| &data[..self.len])
    }
}

/// Mutable strided view: element `i` lives at `data[i * stride]`.
#[derive(Debug)]
pub struct StridedMut<'a, T> {
    data: &'a mut [T],
    stride: usize,
    len: usize,
}

impl<'a, T: Copy> StridedMut<'a, T> {
    /// Builds a view, rejecting zero strides and ranges past the slice end.
    pub fn new(data: &'a mut [T], stride: usize, len: usize) -> Result<Self> {
        check(len, stride, data.len())?;
        Ok(Self { data, stride, len })
    }

    /// A unit-stride view covering the whole slice.
    pub fn contiguous(data: &'a mut [T]) -> Self {
        let len = data.len();
        Self { data, stride: 1, len }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut T> + '_ {
        self.data.iter_mut().step_by(self.stride).take(self.len)
    }

    /// Reborrows the view as read-only.
    pub fn as_strided(&self) -> Strided<'_, T> {
        Strided { data: &self.data[..], stride: self.stride, len: self.len }
    }

    /// The backing elements when the view is dense.
    pub fn as_contiguous_mut(&mut self) -> Option<&mut [T]> {
        if self.stride == 1 {
            Some(&mut self.data[..self.len])
        } else {
            None
        }
    }
}

/// Row-major shape descriptor of rank `0..=4`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Shape {
    dims: [usize; MAX_RANK],
    rank: usize,
}

impl Shape {
    pub fn new(dims: &[usize]) -> Result<Self> {
        if dims.len() > MAX_RANK {
            return Err(KernelError::RankTooLarge { rank: dims.len() });
        }
        let mut out = [0; MAX_RANK];
        out[..dims.len()].copy_from_slice(dims);
        Ok(Self { dims: out, rank: dims.len() })
    }

    pub fn rank(&self) -> usize {
        self.rank
    }

    pub fn dims(&self) -> &[usize] {
        &self.dims[..self.rank]
    }

    /// Number of elements the shape spans.
    pub fn count(&self) -> usize {
        self.dims().iter().product()
    }

    /// Row-major strides; the last axis is contiguous.
    pub fn strides(&self) -> [usize; MAX_RANK] {
        let mut strides = [0; MAX_RANK];
        let mut acc = 1;
        for axis in (0..self.rank).rev() {
            strides[axis] = acc;
            acc *= self.dims[axis];
        }
        strides
    }

    pub fn check_axis(&self, axis: usize) -> Result<()> {
        if axis >= self.rank {
            return Err(KernelError::AxisOutOfRange { axis, rank: self.rank });
        }
        Ok(())
    }

    /// The shape with `axis` dropped, as used by gather/scatter and reductions.
    pub fn remove_axis(&self, axis: usize) -> Result<Shape> {
        self.check_axis(axis)?;
        let mut dims = [0; MAX_RANK];
        let mut j = 0;
        for (a, &d) in self.dims().iter().enumerate() {
            if a != axis {
                dims[j] = d;
                j += 1;
            }
        }
        Ok(Shape { dims, rank: self.rank - 1 })
    }

    /// The shape with `axis` set to `extent`.
    pub fn with_axis(&self, axis: usize, extent: usize) -> Result<Shape> {
        self.check_axis(axis)?;
        let mut out = *self;
        out.dims[axis] = extent;
        Ok(out)
    }

    /// Decomposes a flat row-major index into per-axis coordinates.
    #[inline]
    pub fn coords(&self, mut flat: usize) -> [usize; MAX_RANK] {
        let mut coords = [0; MAX_RANK];
        for axis in (0..self.rank).rev() {
            let d = self.dims[axis];
            if d != 0 {
                coords[axis] = flat % d;
                flat /= d;
            }
        }
        coords
    }
}

impl core::ops::Index<usize> for Shape {
    type Output = usize;

    fn index(&self, axis: usize) -> &usize {
        &self.dims()[axis]
    }
}

/// Checks that a dense buffer holds exactly the elements of `shape`.
pub(crate) fn expect_len(op: &'static str, shape: &Shape, actual: usize) -> Result<()> {
    let expected = shape.count();
    if expected != actual {
        return Err(KernelError::LengthMismatch { op, expected, actual });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strided_view_rejects_overrun_and_zero_stride() {
        let data = [0.0f32; 7];
        assert!(Strided::new(&data, 3, 3).is_ok());
        assert_eq!(
            Strided::new(&data, 3, 4).unwrap_err(),
            KernelError::ViewOutOfBounds { len: 4, stride: 3, available: 7 }
        );
        assert!(matches!(
            Strided::new(&data, 0, 1),
            Err(KernelError::InvalidStride { .. })
        ));
        assert!(Strided::new(&data[..0], 5, 0).is_ok());
    }

    #[test]
    fn strided_iteration_skips_elements() {
        let data = [1, 2, 3, 4, 5, 6, 7];
        let view = Strided::new(&data, 3, 3).unwrap();
        assert_eq!(view.iter().collect::<Vec<_>>(), vec![1, 4, 7]);
        assert_eq!(view.get(1), 4);
        assert!(view.as_contiguous().is_none());
    }

    #[test]
    fn shape_strides_and_coords() {
        let shape = Shape::new(&[2, 3, 4]).unwrap();
        assert_eq!(&shape.strides()[..3], &[12, 4, 1]);
        assert_eq!(shape.count(), 24);
        assert_eq!(&shape.coords(23)[..3], &[1, 2, 3]);
        assert_eq!(shape.remove_axis(1).unwrap().dims(), &[2, 4]);
        assert_eq!(shape.with_axis(0, 5).unwrap().dims(), &[5, 3, 4]);
    }

    #[test]
    fn shape_limits() {
        assert_eq!(
            Shape::new(&[1, 1, 1, 1, 1]).unwrap_err(),
            KernelError::RankTooLarge { rank: 5 }
        );
        let shape = Shape::new(&[2, 2]).unwrap();
        assert_eq!(shape.check_axis(2).unwrap_err(), KernelError::AxisOutOfRange { axis: 2, rank: 2 });
        assert_eq!(Shape::new(&[]).unwrap().count(), 1);
    }
}
