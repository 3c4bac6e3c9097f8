//! Axis-parameterised gather and scatter over row-major arrays of rank ≤ 4.
//!
//! Both directions share one addressing rule: the reduced array (the one
//! without `axis`) has a flat position `i`, its coordinates are `i`
//! decomposed by the reduced shape, and the expanded array's index is those
//! coordinates re-inserted around `axis`, with the `axis` coordinate taken
//! from `context[i]`.
//!
//! Context indices are validated up front, before any output is written.

use rayon::prelude::*;

use crate::error::{KernelError, Result};
use crate::ops::cpu::vector;
use crate::scalar::Scalar;
use crate::view::{expect_len, Shape, StridedMut, MAX_RANK};

/// Maps reduced-array positions to expanded-array indices.
#[derive(Debug, Clone, Copy)]
struct AxisAddress {
    reduced: Shape,
    expanded_strides: [usize; MAX_RANK],
    axis: usize,
}

impl AxisAddress {
    fn new(expanded: &Shape, axis: usize) -> Result<Self> {
        let reduced = expanded.remove_axis(axis)?;
        Ok(Self { reduced, expanded_strides: expanded.strides(), axis })
    }

    /// Expanded index of reduced position `i` with axis coordinate `c`.
    #[inline]
    fn index(&self, i: usize, c: usize) -> usize {
        let coords = self.reduced.coords(i);
        let mut idx = c * self.expanded_strides[self.axis];
        for (a, &coord) in coords[..self.reduced.rank()].iter().enumerate() {
            let expanded_axis = if a >= self.axis { a + 1 } else { a };
            idx += coord * self.expanded_strides[expanded_axis];
        }
        idx
    }
}

/// Checks every non-ignored context value against the axis extent.
fn validate_context(context: &[i32], extent: usize, ignore_index: Option<i32>) -> Result<()> {
    for (position, &index) in context.iter().enumerate() {
        if Some(index) == ignore_index {
            continue;
        }
        if index < 0 || index as usize >= extent {
            return Err(KernelError::IndexOutOfRange { position, index, extent });
        }
    }
    Ok(())
}

/// Reads `src` (shape `src_shape`) along `axis` at the positions named by
/// `context`, producing an array shaped like `src_shape` without `axis`.
///
/// Positions whose context equals `ignore_index` are set to zero.
pub fn gather<T: Scalar>(
    src: &[T],
    src_shape: &Shape,
    context: &[i32],
    dst: &mut [T],
    axis: usize,
    ignore_index: Option<i32>,
) -> Result<()> {
    expect_len("gather", src_shape, src.len())?;
    let addr = AxisAddress::new(src_shape, axis)?;
    expect_len("gather", &addr.reduced, dst.len())?;
    expect_len("gather", &addr.reduced, context.len())?;
    validate_context(context, src_shape[axis], ignore_index)?;

    dst.par_iter_mut()
        .zip(context.par_iter())
        .enumerate()
        .for_each(|(i, (d, &c))| {
            *d = if Some(c) == ignore_index {
                T::ZERO
            } else {
                src[addr.index(i, c as usize)]
            };
        });
    Ok(())
}

/// Adjoint of [`gather`]: zero-fills `dst` (shape `dst_shape`) and writes
/// each source element to the `axis` position named by `context`.
///
/// Distinct source positions carry distinct non-axis coordinates, so no two
/// sources can land on the same destination element; the writes run in
/// ascending source order regardless.
pub fn scatter<T: Scalar>(
    src: &[T],
    context: &[i32],
    dst: &mut [T],
    dst_shape: &Shape,
    axis: usize,
    ignore_index: Option<i32>,
) -> Result<()> {
    expect_len("scatter", dst_shape, dst.len())?;
    let addr = AxisAddress::new(dst_shape, axis)?;
    expect_len("scatter", &addr.reduced, src.len())?;
    expect_len("scatter", &addr.reduced, context.len())?;
    validate_context(context, dst_shape[axis], ignore_index)?;

    vector::fill(T::ZERO, StridedMut::contiguous(dst));
    for (i, (&value, &c)) in src.iter().zip(context).enumerate() {
        if Some(c) != ignore_index {
            dst[addr.index(i, c as usize)] = value;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shape(dims: &[usize]) -> Shape {
        Shape::new(dims).unwrap()
    }

    #[test]
    fn gather_along_last_axis() {
        // 2x3, pick one column per row
        let src = [1.0f32, 2.0, 3.0, 4.0, 5.0, 6.0];
        let mut dst = [0.0f32; 2];
        gather(&src, &shape(&[2, 3]), &[2, 0], &mut dst, 1, None).unwrap();
        assert_eq!(dst, [3.0, 4.0]);
    }

    #[test]
    fn gather_along_first_axis() {
        // 3x2, pick one row per column
        let src = [1, 2, 3, 4, 5, 6];
        let mut dst = [0; 2];
        gather(&src, &shape(&[3, 2]), &[1, 2], &mut dst, 0, None).unwrap();
        assert_eq!(dst, [3, 6]);
    }

    #[test]
    fn gather_middle_axis_rank_three() {
        // shape 2x3x2: element (b, c, x) = 100b + 10c + x
        let src: Vec<i32> = (0..2)
            .flat_map(|b| (0..3).flat_map(move |c| (0..2).map(move |x| 100 * b + 10 * c + x)))
            .collect();
        let mut dst = [0; 4];
        gather(&src, &shape(&[2, 3, 2]), &[2, 1, 0, 2], &mut dst, 1, None).unwrap();
        assert_eq!(dst, [20, 11, 100, 121]);
    }

    #[test]
    fn ignored_positions_are_zero() {
        let src = [1.0f64, 2.0, 3.0, 4.0];
        let mut dst = [9.0f64; 2];
        gather(&src, &shape(&[2, 2]), &[-100, 1], &mut dst, 1, Some(-100)).unwrap();
        assert_eq!(dst, [0.0, 4.0]);
    }

    #[test]
    fn out_of_range_context_is_rejected_before_writing() {
        let src = [1.0f32; 4];
        let mut dst = [5.0f32; 2];
        assert_eq!(
            gather(&src, &shape(&[2, 2]), &[0, 2], &mut dst, 1, None),
            Err(KernelError::IndexOutOfRange { position: 1, index: 2, extent: 2 })
        );
        assert_eq!(dst, [5.0, 5.0]);
    }

    #[test]
    fn scatter_zero_fills_and_writes() {
        let mut dst = [7.0f32; 6];
        scatter(&[1.0, 2.0], &[2, 0], &mut dst, &shape(&[2, 3]), 1, None).unwrap();
        assert_eq!(dst, [0.0, 0.0, 1.0, 2.0, 0.0, 0.0]);
    }

    #[test]
    fn scatter_skips_ignored_positions() {
        let mut dst = [5; 4];
        scatter(&[8, 9], &[1, -1], &mut dst, &shape(&[2, 2]), 0, Some(-1)).unwrap();
        assert_eq!(dst, [0, 0, 8, 0]);
    }

    #[test]
    fn scatter_targets_are_distinct_for_equal_context() {
        let addr = AxisAddress::new(&shape(&[3, 2, 2]), 1).unwrap();
        let targets: Vec<usize> = (0..addr.reduced.count()).map(|i| addr.index(i, 1)).collect();
        let mut unique = targets.clone();
        unique.sort_unstable();
        unique.dedup();
        assert_eq!(unique.len(), targets.len());
        assert_eq!(targets, [2, 3, 6, 7, 10, 11]);
    }
}
