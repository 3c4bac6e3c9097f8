//! Element-wise binary operations over shaped operands.
//!
//! Broadcasting is an explicit argument: under [`BroadcastMode::Strict`] the
//! two shapes must be identical, under [`BroadcastMode::Broadcast`] they are
//! right-aligned, missing leading axes count as 1, and every axis must either
//! match or be 1 on one side.

use rayon::prelude::*;

use crate::config::BroadcastMode;
use crate::error::{KernelError, Result};
use crate::ops::cpu::vector::check_divisors;
use crate::ops::BinaryOp;
use crate::scalar::Scalar;
use crate::view::{expect_len, Shape, MAX_RANK};

/// Result shape of combining `lhs` and `rhs` under `mode`.
pub fn broadcast_shape(lhs: &Shape, rhs: &Shape, mode: BroadcastMode) -> Result<Shape> {
    let mismatch = || KernelError::ShapeMismatch {
        op: "broadcast",
        lhs: lhs.dims().to_vec(),
        rhs: rhs.dims().to_vec(),
    };
    if mode == BroadcastMode::Strict {
        return if lhs == rhs { Ok(*lhs) } else { Err(mismatch()) };
    }

    let rank = lhs.rank().max(rhs.rank());
    let mut dims = [1; MAX_RANK];
    for (axis, out) in dims[..rank].iter_mut().enumerate() {
        let l = padded_dim(lhs, rank, axis);
        let r = padded_dim(rhs, rank, axis);
        *out = match (l, r) {
            (l, r) if l == r => l,
            (1, r) => r,
            (l, 1) => l,
            _ => return Err(mismatch()),
        };
    }
    Shape::new(&dims[..rank])
}

/// Extent of `axis` after left-padding `shape` to `rank` with ones.
fn padded_dim(shape: &Shape, rank: usize, axis: usize) -> usize {
    let offset = rank - shape.rank();
    if axis < offset { 1 } else { shape[axis - offset] }
}

/// Strides of `shape` viewed at `out`'s rank, with 0 on stretched axes.
pub(crate) fn broadcast_strides(shape: &Shape, out: &Shape) -> [usize; MAX_RANK] {
    let own = shape.strides();
    let offset = out.rank() - shape.rank();
    let mut strides = [0; MAX_RANK];
    for axis in offset..out.rank() {
        let a = axis - offset;
        if shape[a] != 1 || out[axis] == 1 {
            strides[axis] = own[a];
        }
    }
    strides
}

#[inline]
fn offset(coords: &[usize; MAX_RANK], strides: &[usize; MAX_RANK]) -> usize {
    coords.iter().zip(strides).map(|(c, s)| c * s).sum()
}

/// `dst = lhs op rhs` with shapes combined per `mode`.
///
/// `dst` must hold exactly the elements of the combined shape.
pub fn broadcast_binary<T: Scalar>(
    op: BinaryOp,
    lhs: &[T],
    lhs_shape: &Shape,
    rhs: &[T],
    rhs_shape: &Shape,
    dst: &mut [T],
    mode: BroadcastMode,
) -> Result<Shape> {
    expect_len("broadcast lhs", lhs_shape, lhs.len())?;
    expect_len("broadcast rhs", rhs_shape, rhs.len())?;
    let out = broadcast_shape(lhs_shape, rhs_shape, mode)?;
    expect_len("broadcast dst", &out, dst.len())?;
    // positions refer to `rhs`
    check_divisors(op, rhs.iter().copied())?;

    if lhs_shape == rhs_shape {
        dst.par_iter_mut()
            .zip(lhs.par_iter().zip(rhs.par_iter()))
            .enumerate()
            .try_for_each(|(i, (d, (&a, &b)))| -> Result<()> {
                *d = op.apply(a, b).ok_or(KernelError::DivisionByZero { position: i })?;
                Ok(())
            })?;
        return Ok(out);
    }

    let ls = broadcast_strides(lhs_shape, &out);
    let rs = broadcast_strides(rhs_shape, &out);
    dst.par_iter_mut().enumerate().try_for_each(|(i, d)| -> Result<()> {
        let coords = out.coords(i);
        let at = offset(&coords, &rs);
        *d = op.apply(lhs[offset(&coords, &ls)], rhs[at]).ok_or(KernelError::DivisionByZero { position: at })?;
        Ok(())
    })?;
    Ok(out)
}
