//! Strided vector primitives.
//!
//! Every function takes [`Strided`] sources and a [`StridedMut`] destination
//! whose logical lengths must agree. Loops are sequential and run in index
//! order, so reductions are reproducible bit for bit.

use crate::error::{KernelError, Result};
use crate::ops::{BinaryOp, FloatOp, UnaryOp};
use crate::scalar::{Float, Scalar};
use crate::view::{Strided, StridedMut};

#[inline]
fn same_len(op: &'static str, expected: usize, actual: usize) -> Result<()> {
    if expected != actual {
        return Err(KernelError::LengthMismatch { op, expected, actual });
    }
    Ok(())
}

/// Fails on the first zero divisor of an integer division, before the
/// caller writes anything.
pub(crate) fn check_divisors<T: Scalar>(op: BinaryOp, divisors: impl IntoIterator<Item = T>) -> Result<()> {
    if op != BinaryOp::Div || !T::KIND.is_integer() {
        return Ok(());
    }
    match divisors.into_iter().position(|d| d == T::ZERO) {
        Some(position) => Err(KernelError::DivisionByZero { position }),
        None => Ok(()),
    }
}

#[inline]
fn divided<T: Scalar>(value: Option<T>, position: usize) -> Result<T> {
    value.ok_or(KernelError::DivisionByZero { position })
}

/// `dst[i] = value`
pub fn fill<T: Scalar>(value: T, mut dst: StridedMut<'_, T>) {
    if let Some(dense) = dst.as_contiguous_mut() {
        dense.fill(value);
        return;
    }
    for d in dst.iter_mut() {
        *d = value;
    }
}

/// `dst[i] = start + i * increment`
///
/// Each element is computed from its index rather than by repeated
/// addition, so float rounding does not drift along the vector.
pub fn ramp<T: Scalar>(start: T, increment: T, mut dst: StridedMut<'_, T>) {
    for (i, d) in dst.iter_mut().enumerate() {
        *d = start.wrapping_add(T::from_usize(i).wrapping_mul(increment));
    }
}

pub fn unary<T: Scalar>(op: UnaryOp, src: Strided<'_, T>, mut dst: StridedMut<'_, T>) -> Result<()> {
    same_len("unary", src.len(), dst.len())?;
    for (d, s) in dst.iter_mut().zip(src.iter()) {
        *d = op.apply(s);
    }
    Ok(())
}

/// Transcendental functions; integer kinds are excluded by the `Float` bound.
pub fn float_unary<T: Float>(
    op: FloatOp,
    src: Strided<'_, T>,
    mut dst: StridedMut<'_, T>,
) -> Result<()> {
    same_len("float_unary", src.len(), dst.len())?;
    for (d, s) in dst.iter_mut().zip(src.iter()) {
        *d = op.apply(s);
    }
    Ok(())
}

/// `dst[i] = |magnitude[i]|` carrying the sign of `sign[i]`.
pub fn copysign<T: Float>(
    magnitude: Strided<'_, T>,
    sign: Strided<'_, T>,
    mut dst: StridedMut<'_, T>,
) -> Result<()> {
    same_len("copysign", magnitude.len(), sign.len())?;
    same_len("copysign", magnitude.len(), dst.len())?;
    for ((d, m), s) in dst.iter_mut().zip(magnitude.iter()).zip(sign.iter()) {
        *d = m.copysign(s);
    }
    Ok(())
}

/// `dst[i] = lhs[i] op rhs[i]`
pub fn binary<T: Scalar>(
    op: BinaryOp,
    lhs: Strided<'_, T>,
    rhs: Strided<'_, T>,
    mut dst: StridedMut<'_, T>,
) -> Result<()> {
    same_len("binary", lhs.len(), rhs.len())?;
    same_len("binary", lhs.len(), dst.len())?;
    check_divisors(op, rhs.iter())?;
    for (i, ((d, a), b)) in dst.iter_mut().zip(lhs.iter()).zip(rhs.iter()).enumerate() {
        *d = divided(op.apply(a, b), i)?;
    }
    Ok(())
}

/// `dst[i] = lhs[i] op scalar`
pub fn binary_scalar<T: Scalar>(
    op: BinaryOp,
    lhs: Strided<'_, T>,
    scalar: T,
    mut dst: StridedMut<'_, T>,
) -> Result<()> {
    same_len("binary_scalar", lhs.len(), dst.len())?;
    check_divisors(op, [scalar])?;
    for (i, (d, a)) in dst.iter_mut().zip(lhs.iter()).enumerate() {
        *d = divided(op.apply(a, scalar), i)?;
    }
    Ok(())
}

/// `dst[i] = scalar op rhs[i]`, e.g. subtract-reversed `s - v[i]`.
pub fn binary_scalar_reversed<T: Scalar>(
    op: BinaryOp,
    scalar: T,
    rhs: Strided<'_, T>,
    mut dst: StridedMut<'_, T>,
) -> Result<()> {
    same_len("binary_scalar_reversed", rhs.len(), dst.len())?;
    check_divisors(op, rhs.iter())?;
    for (i, (d, b)) in dst.iter_mut().zip(rhs.iter()).enumerate() {
        *d = divided(op.apply(scalar, b), i)?;
    }
    Ok(())
}

/// `dst[i] = max(thresh, src[i])`: clamps from below.
pub fn threshold<T: Scalar>(src: Strided<'_, T>, thresh: T, mut dst: StridedMut<'_, T>) -> Result<()> {
    same_len("threshold", src.len(), dst.len())?;
    for (d, s) in dst.iter_mut().zip(src.iter()) {
        *d = T::max_of(thresh, s);
    }
    Ok(())
}

pub fn sum<T: Scalar>(src: Strided<'_, T>) -> T {
    src.iter().fold(T::ZERO, |acc, x| acc.wrapping_add(x))
}

pub fn dot<T: Scalar>(lhs: Strided<'_, T>, rhs: Strided<'_, T>) -> Result<T> {
    same_len("dot", lhs.len(), rhs.len())?;
    Ok(lhs.iter().zip(rhs.iter()).fold(T::ZERO, |acc, (a, b)| acc.wrapping_add(a.wrapping_mul(b))))
}

/// Largest element and its logical index; ties resolve to the first one.
///
/// Returns `None` for an empty view.
pub fn max_index<T: Scalar>(src: Strided<'_, T>) -> Option<(T, usize)> {
    select_index(src, |candidate, best| candidate > best)
}

/// Smallest element and its logical index; ties resolve to the first one.
pub fn min_index<T: Scalar>(src: Strided<'_, T>) -> Option<(T, usize)> {
    select_index(src, |candidate, best| candidate < best)
}

fn select_index<T: Scalar>(src: Strided<'_, T>, better: impl Fn(T, T) -> bool) -> Option<(T, usize)> {
    let mut values = src.iter().enumerate();
    let (_, first) = values.next()?;
    let mut best = (first, 0);
    for (i, x) in values {
        if better(x, best.0) {
            best = (x, i);
        }
    }
    Some(best)
}

pub fn copy_strided<T: Scalar>(src: Strided<'_, T>, mut dst: StridedMut<'_, T>) -> Result<()> {
    same_len("copy_strided", src.len(), dst.len())?;
    if let (Some(s), Some(d)) = (src.as_contiguous(), dst.as_contiguous_mut()) {
        d.copy_from_slice(s);
        return Ok(());
    }
    for (d, s) in dst.iter_mut().zip(src.iter()) {
        *d = s;
    }
    Ok(())
}

/// Out-of-place transpose of a row-major `rows × cols` matrix into
/// `cols × rows`: `dst[y + x * rows] = src[y * cols + x]`.
pub fn transpose<T: Scalar>(src: &[T], dst: &mut [T], cols: usize, rows: usize) -> Result<()> {
    let count = rows * cols;
    if src.len() < count {
        return Err(KernelError::LengthMismatch { op: "transpose", expected: count, actual: src.len() });
    }
    if dst.len() < count {
        return Err(KernelError::LengthMismatch { op: "transpose", expected: count, actual: dst.len() });
    }
    if count == 0 {
        return Ok(());
    }
    for (y, row) in src[..count].chunks_exact(cols).enumerate() {
        for (x, &v) in row.iter().enumerate() {
            dst[y + x * rows] = v;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dense<T: Copy>(v: &[T]) -> Strided<'_, T> {
        Strided::contiguous(v)
    }

    #[test]
    fn fill_respects_stride() {
        let mut data = [0i32; 5];
        fill(7, StridedMut::new(&mut data, 2, 3).unwrap());
        assert_eq!(data, [7, 0, 7, 0, 7]);
    }

    #[test]
    fn ramp_uses_index_times_increment() {
        let mut data = [0.0f32; 5];
        ramp(0.0, 2.0, StridedMut::contiguous(&mut data));
        assert_eq!(data, [0.0, 2.0, 4.0, 6.0, 8.0]);

        let mut ints = [0i32; 4];
        ramp(10, -3, StridedMut::contiguous(&mut ints));
        assert_eq!(ints, [10, 7, 4, 1]);
    }

    #[test]
    fn threshold_clamps_from_below() {
        let src = [-2.0f64, 0.5, 3.0];
        let mut dst = [0.0; 3];
        threshold(dense(&src), 1.0, StridedMut::contiguous(&mut dst)).unwrap();
        assert_eq!(dst, [1.0, 1.0, 3.0]);
    }

    #[test]
    fn reversed_scalar_forms() {
        let v = [1.0f32, 2.0, 4.0];
        let mut out = [0.0; 3];
        binary_scalar_reversed(BinaryOp::Sub, 10.0, dense(&v), StridedMut::contiguous(&mut out)).unwrap();
        assert_eq!(out, [9.0, 8.0, 6.0]);
        binary_scalar_reversed(BinaryOp::Div, 8.0, dense(&v), StridedMut::contiguous(&mut out)).unwrap();
        assert_eq!(out, [8.0, 4.0, 2.0]);
    }

    #[test]
    fn integer_zero_divisor_fails_before_writing() {
        let mut out = [-1i32; 3];
        assert_eq!(
            binary(BinaryOp::Div, dense(&[6, 4, 2]), dense(&[3, 2, 0]), StridedMut::contiguous(&mut out)),
            Err(KernelError::DivisionByZero { position: 2 })
        );
        assert_eq!(out, [-1, -1, -1]);
        assert_eq!(
            binary_scalar(BinaryOp::Div, dense(&[6, 4, 2]), 0, StridedMut::contiguous(&mut out)),
            Err(KernelError::DivisionByZero { position: 0 })
        );
        binary_scalar_reversed(BinaryOp::Div, i32::MIN, dense(&[-1, 2, 4]), StridedMut::contiguous(&mut out))
            .unwrap();
        assert_eq!(out, [i32::MIN, i32::MIN / 2, i32::MIN / 4]);

        let mut floats = [0.0f32; 2];
        binary(BinaryOp::Div, dense(&[1.0, -1.0]), dense(&[0.0, 0.0]), StridedMut::contiguous(&mut floats))
            .unwrap();
        assert_eq!(floats, [f32::INFINITY, f32::NEG_INFINITY]);
    }

    #[test]
    fn integer_sums_wrap() {
        assert_eq!(sum(dense(&[i32::MAX, 1])), i32::MIN);
        assert_eq!(dot(dense(&[i32::MAX]), dense(&[2])).unwrap(), -2);
    }

    #[test]
    fn reductions_tie_break_on_first() {
        let v = [3, 5, 5, 2];
        assert_eq!(max_index(dense(&v)), Some((5, 1)));
        let v = [4.0f32, 1.0, 1.0, 9.0];
        assert_eq!(min_index(dense(&v)), Some((1.0, 1)));
        assert_eq!(max_index::<f64>(dense(&[])), None);
    }

    #[test]
    fn strided_max_reads_strided_elements() {
        let data = [1, 100, 2, 100, 3];
        let view = Strided::new(&data, 2, 3).unwrap();
        assert_eq!(max_index(view), Some((3, 2)));
    }

    #[test]
    fn dot_and_sum() {
        let a = [1.0f64, 2.0, 3.0];
        let b = [4.0, 5.0, 6.0];
        assert_eq!(dot(dense(&a), dense(&b)).unwrap(), 32.0);
        assert_eq!(sum(dense(&a)), 6.0);
        assert!(dot(dense(&a), dense(&b[..2])).is_err());
    }

    #[test]
    fn length_mismatch_is_reported() {
        let src = [1.0f32; 3];
        let mut dst = [0.0f32; 2];
        assert_eq!(
            unary(UnaryOp::Negate, dense(&src), StridedMut::contiguous(&mut dst)),
            Err(KernelError::LengthMismatch { op: "unary", expected: 3, actual: 2 })
        );
    }

    #[test]
    fn copy_between_strides() {
        let src = [1, 2, 3, 4, 5, 6];
        let mut dst = [0; 3];
        copy_strided(Strided::new(&src, 2, 3).unwrap(), StridedMut::contiguous(&mut dst)).unwrap();
        assert_eq!(dst, [1, 3, 5]);
    }

    #[test]
    fn transpose_rectangular() {
        // 2 rows x 3 cols
        let src = [1, 2, 3, 4, 5, 6];
        let mut dst = [0; 6];
        transpose(&src, &mut dst, 3, 2).unwrap();
        assert_eq!(dst, [1, 4, 2, 5, 3, 6]);
    }
}
