//! Shape manipulation kernels: axis reductions, permutation, reversal,
//! stacking, subscripting and band extraction.
//!
//! All functions take dense row-major buffers together with their [`Shape`]
//! and return the shape of what they wrote.

use rayon::prelude::*;

use crate::error::{KernelError, Result};
use crate::ops::cpu::vector;
use crate::ops::ReduceOp;
use crate::scalar::Scalar;
use crate::view::{expect_len, Shape, StridedMut, MAX_RANK};

/// `(outer, extent, inner)` split of `shape` around `axis`.
fn split(shape: &Shape, axis: usize) -> (usize, usize, usize) {
    let dims = shape.dims();
    let outer = dims[..axis].iter().product();
    let inner = dims[axis + 1..].iter().product();
    (outer, dims[axis], inner)
}

/// Reduces `src` along `axis` into `dst`, whose shape is `shape` without
/// `axis`.
///
/// For [`ReduceOp::Max`] and [`ReduceOp::Min`], `context` receives the
/// position along `axis` that was selected; ties keep the first position.
pub fn reduce<T: Scalar>(
    op: ReduceOp,
    src: &[T],
    shape: &Shape,
    axis: usize,
    dst: &mut [T],
    context: Option<&mut [i32]>,
) -> Result<Shape> {
    expect_len("reduce", shape, src.len())?;
    let out = shape.remove_axis(axis)?;
    expect_len("reduce", &out, dst.len())?;
    if let Some(ctx) = context.as_deref() {
        if !op.has_context() {
            return Err(KernelError::Configuration(format!(
                "{op:?} reduction does not produce an index context"
            )));
        }
        expect_len("reduce context", &out, ctx.len())?;
    }

    let (_, extent, inner) = split(shape, axis);
    if extent == 0 && op != ReduceOp::Sum {
        return Err(KernelError::Configuration(format!(
            "{op:?} over an empty axis is undefined"
        )));
    }

    // one (value, index) per output element; rows of `inner` outputs share `o`
    let select = |o: usize, i: usize| -> (T, usize) {
        let base = o * extent * inner + i;
        let at = |e: usize| src[base + e * inner];
        match op {
            ReduceOp::Sum | ReduceOp::Mean => {
                let total = (0..extent).fold(T::ZERO, |acc, e| acc.wrapping_add(at(e)));
                let value = if op == ReduceOp::Mean { total / T::from_usize(extent) } else { total };
                (value, 0)
            }
            ReduceOp::Max | ReduceOp::Min => {
                let mut best = (at(0), 0);
                for e in 1..extent {
                    let v = at(e);
                    let better = if op == ReduceOp::Max { v > best.0 } else { v < best.0 };
                    if better {
                        best = (v, e);
                    }
                }
                best
            }
        }
    };

    let row = inner.max(1);
    match context {
        Some(ctx) => dst
            .par_chunks_mut(row)
            .zip(ctx.par_chunks_mut(row))
            .enumerate()
            .for_each(|(o, (values, indices))| {
                for (i, (v, c)) in values.iter_mut().zip(indices.iter_mut()).enumerate() {
                    let (value, index) = select(o, i);
                    *v = value;
                    *c = index as i32;
                }
            }),
        None => dst.par_chunks_mut(row).enumerate().for_each(|(o, values)| {
            for (i, v) in values.iter_mut().enumerate() {
                *v = select(o, i).0;
            }
        }),
    }
    Ok(out)
}

/// Reduces along several axes, highest axis first.
pub fn reduce_axes<T: Scalar>(
    op: ReduceOp,
    src: &[T],
    shape: &Shape,
    axes: &[usize],
    dst: &mut [T],
) -> Result<Shape> {
    let mut axes = axes.to_vec();
    axes.sort_unstable_by(|a, b| b.cmp(a));
    axes.dedup();

    let mut current = src.to_vec();
    let mut current_shape = *shape;
    for &axis in &axes {
        let next_shape = current_shape.remove_axis(axis)?;
        let mut next = vec![T::ZERO; next_shape.count()];
        reduce(op, &current, &current_shape, axis, &mut next, None)?;
        current = next;
        current_shape = next_shape;
    }

    expect_len("reduce_axes", &current_shape, dst.len())?;
    dst.copy_from_slice(&current);
    Ok(current_shape)
}

fn check_arrangement(shape: &Shape, arrangement: &[usize]) -> Result<()> {
    let mut seen = [false; MAX_RANK];
    let valid = arrangement.len() == shape.rank()
        && arrangement
            .iter()
            .all(|&a| a < shape.rank() && !std::mem::replace(&mut seen[a], true));
    if !valid {
        return Err(KernelError::Configuration(format!(
            "{arrangement:?} is not a permutation of {} axes",
            shape.rank()
        )));
    }
    Ok(())
}

/// Shape produced by [`permute_axes`]: `out[arrangement[i]] = shape[i]`.
pub fn permuted_shape(shape: &Shape, arrangement: &[usize]) -> Result<Shape> {
    check_arrangement(shape, arrangement)?;
    let mut dims = [0; MAX_RANK];
    for (i, &a) in arrangement.iter().enumerate() {
        dims[a] = shape[i];
    }
    Shape::new(&dims[..shape.rank()])
}

/// Moves axis `i` of `src` to position `arrangement[i]` of `dst`.
///
/// With `add`, `dst = permute(src) + add` where `add` is shaped like `dst`.
pub fn permute_axes<T: Scalar>(
    src: &[T],
    shape: &Shape,
    arrangement: &[usize],
    dst: &mut [T],
    add: Option<&[T]>,
) -> Result<Shape> {
    expect_len("permute", shape, src.len())?;
    let out = permuted_shape(shape, arrangement)?;
    expect_len("permute", &out, dst.len())?;
    if let Some(add) = add {
        expect_len("permute add", &out, add.len())?;
    }

    if add.is_none() && arrangement == [1, 0] {
        return vector::transpose(src, dst, shape[1], shape[0]).map(|()| out);
    }

    let dst_strides = out.strides();
    for (i, &v) in src.iter().enumerate() {
        let coords = shape.coords(i);
        let target: usize = arrangement
            .iter()
            .enumerate()
            .map(|(axis, &a)| coords[axis] * dst_strides[a])
            .sum();
        dst[target] = match add {
            Some(add) => v.wrapping_add(add[target]),
            None => v,
        };
    }
    Ok(out)
}

/// Reverses `src` along its first axis. With `add`, the reversed values are
/// summed with `add` (shaped like `src`).
pub fn reverse<T: Scalar>(src: &[T], shape: &Shape, dst: &mut [T], add: Option<&[T]>) -> Result<()> {
    expect_len("reverse", shape, src.len())?;
    expect_len("reverse", shape, dst.len())?;
    if let Some(add) = add {
        expect_len("reverse add", shape, add.len())?;
    }
    if shape.rank() == 0 || shape.count() == 0 {
        dst.copy_from_slice(src);
        return Ok(());
    }

    let n = shape[0];
    let stride = shape.count() / n;
    for (i, chunk) in src.chunks_exact(stride).enumerate() {
        let at = (n - 1 - i) * stride;
        let out = &mut dst[at..at + stride];
        match add {
            Some(add) => {
                for ((d, &s), &a) in out.iter_mut().zip(chunk).zip(&add[at..at + stride]) {
                    *d = s.wrapping_add(a);
                }
            }
            None => out.copy_from_slice(chunk),
        }
    }
    Ok(())
}

/// Concatenates `parts` along `axis`. All parts share every other extent.
pub fn stack<T: Scalar>(parts: &[(&[T], Shape)], axis: usize, dst: &mut [T]) -> Result<Shape> {
    let Some((_, first)) = parts.first() else {
        return Err(KernelError::Configuration("stack needs at least one part".into()));
    };
    first.check_axis(axis)?;
    let mut total = 0;
    for (data, shape) in parts {
        expect_len("stack part", shape, data.len())?;
        if shape.rank() != first.rank()
            || shape.dims().iter().zip(first.dims()).enumerate().any(|(a, (x, y))| a != axis && x != y)
        {
            return Err(KernelError::ShapeMismatch {
                op: "stack",
                lhs: first.dims().to_vec(),
                rhs: shape.dims().to_vec(),
            });
        }
        total += shape[axis];
    }
    let out = first.with_axis(axis, total)?;
    expect_len("stack", &out, dst.len())?;

    let (outer, _, inner) = split(first, axis);
    let mut pos = 0;
    for o in 0..outer {
        for (data, shape) in parts {
            let chunk = shape[axis] * inner;
            dst[pos..pos + chunk].copy_from_slice(&data[o * chunk..(o + 1) * chunk]);
            pos += chunk;
        }
    }
    Ok(out)
}

/// Splits `src` along `axis` into `parts`; each part's extent along `axis`
/// is inferred from its length.
pub fn unstack<T: Scalar>(src: &[T], shape: &Shape, axis: usize, parts: &mut [&mut [T]]) -> Result<()> {
    expect_len("unstack", shape, src.len())?;
    let (outer, extent, inner) = split(shape, axis);
    let slab = (outer * inner).max(1);
    let mut extents = Vec::with_capacity(parts.len());
    for part in parts.iter() {
        if part.len() % slab != 0 {
            return Err(KernelError::LengthMismatch {
                op: "unstack part",
                expected: part.len().next_multiple_of(slab),
                actual: part.len(),
            });
        }
        extents.push(part.len() / slab);
    }
    let covered: usize = extents.iter().sum();
    if covered != extent {
        return Err(KernelError::LengthMismatch { op: "unstack", expected: extent, actual: covered });
    }

    let mut pos = 0;
    for o in 0..outer {
        for (part, &e) in parts.iter_mut().zip(&extents) {
            let chunk = e * inner;
            part[o * chunk..(o + 1) * chunk].copy_from_slice(&src[pos..pos + chunk]);
            pos += chunk;
        }
    }
    Ok(())
}

/// Shape selected by a subscript. `Some(i)` fixes a leading axis (and drops
/// it), `None` spans it; axes past the index list are spanned.
pub fn subscript_shape(shape: &Shape, index: &[Option<usize>]) -> Result<Shape> {
    if index.len() > shape.rank() {
        return Err(KernelError::RankTooLarge { rank: index.len() });
    }
    let mut dims = Vec::with_capacity(shape.rank());
    for (axis, &sel) in index.iter().enumerate() {
        match sel {
            Some(i) if i >= shape[axis] => {
                return Err(KernelError::IndexOutOfRange {
                    position: axis,
                    index: i as i32,
                    extent: shape[axis],
                });
            }
            Some(_) => {}
            None => dims.push(shape[axis]),
        }
    }
    dims.extend_from_slice(&shape.dims()[index.len()..]);
    Shape::new(&dims)
}

/// Source offset of each element of the subscript result, in order.
fn subscript_offsets(shape: &Shape, index: &[Option<usize>]) -> Result<(Shape, Vec<usize>)> {
    let out = subscript_shape(shape, index)?;
    let strides = shape.strides();
    let mut offsets = Vec::with_capacity(out.count());
    for flat in 0..out.count() {
        let coords = out.coords(flat);
        let mut out_axis = 0;
        let mut offset = 0;
        for axis in 0..shape.rank() {
            let c = match index.get(axis).copied().flatten() {
                Some(fixed) => fixed,
                None => {
                    out_axis += 1;
                    coords[out_axis - 1]
                }
            };
            offset += c * strides[axis];
        }
        offsets.push(offset);
    }
    Ok((out, offsets))
}

/// Copies the sub-array selected by `index` from `src` into `dst`.
pub fn subscript_read<T: Scalar>(
    src: &[T],
    shape: &Shape,
    index: &[Option<usize>],
    dst: &mut [T],
) -> Result<Shape> {
    expect_len("subscript", shape, src.len())?;
    let (out, offsets) = subscript_offsets(shape, index)?;
    expect_len("subscript", &out, dst.len())?;
    for (d, &o) in dst.iter_mut().zip(&offsets) {
        *d = src[o];
    }
    Ok(out)
}

/// Writes `values` into the sub-array of `dst` selected by `index`.
pub fn subscript_write<T: Scalar>(
    dst: &mut [T],
    shape: &Shape,
    index: &[Option<usize>],
    values: &[T],
) -> Result<()> {
    expect_len("subscript_write", shape, dst.len())?;
    let (out, offsets) = subscript_offsets(shape, index)?;
    expect_len("subscript_write", &out, values.len())?;
    for (&v, &o) in values.iter().zip(&offsets) {
        dst[o] = v;
    }
    Ok(())
}

/// Keeps the diagonal band of a `rows × cols` matrix and zeroes the rest.
///
/// Row `i` keeps columns `[i - below, i + above]`; `None` leaves that side
/// unbounded.
pub fn band<T: Scalar>(
    src: &[T],
    dst: &mut [T],
    rows: usize,
    cols: usize,
    below: Option<usize>,
    above: Option<usize>,
) -> Result<()> {
    let shape = Shape::new(&[rows, cols])?;
    expect_len("band", &shape, src.len())?;
    expect_len("band", &shape, dst.len())?;
    vector::fill(T::ZERO, StridedMut::contiguous(dst));
    if cols == 0 {
        return Ok(());
    }

    let unbounded = rows.max(cols);
    let below = below.unwrap_or(unbounded);
    let above = above.unwrap_or(unbounded);
    for (i, (out, row)) in dst.chunks_exact_mut(cols).zip(src.chunks_exact(cols)).enumerate() {
        let start = i.saturating_sub(below).min(cols);
        let end = (i + above + 1).min(cols).max(start);
        out[start..end].copy_from_slice(&row[start..end]);
    }
    Ok(())
}

/// Number of elements `lower, lower + step, ...` strictly below `upper`.
pub fn arange_len<T: Scalar>(lower: T, upper: T, step: T) -> Result<usize> {
    let step = step.to_f64();
    if step == 0.0 || !step.is_finite() {
        return Err(KernelError::Configuration("arange step must be finite and non-zero".into()));
    }
    let span = (upper.to_f64() - lower.to_f64()) / step;
    Ok(if span > 0.0 { span.ceil() as usize } else { 0 })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shape(dims: &[usize]) -> Shape {
        Shape::new(dims).unwrap()
    }

    #[test]
    fn reduce_sum_and_mean_along_axes() {
        let src = [1.0f32, 2.0, 3.0, 4.0, 5.0, 6.0];
        let mut rows = [0.0f32; 2];
        reduce(ReduceOp::Sum, &src, &shape(&[2, 3]), 1, &mut rows, None).unwrap();
        assert_eq!(rows, [6.0, 15.0]);
        let mut cols = [0.0f32; 3];
        reduce(ReduceOp::Mean, &src, &shape(&[2, 3]), 0, &mut cols, None).unwrap();
        assert_eq!(cols, [2.5, 3.5, 4.5]);
    }

    #[test]
    fn reduce_max_records_first_index() {
        let src = [1, 7, 7, 9, 2, 9];
        let mut out = [0; 2];
        let mut ctx = [0i32; 2];
        reduce(ReduceOp::Max, &src, &shape(&[2, 3]), 1, &mut out, Some(&mut ctx[..])).unwrap();
        assert_eq!(out, [7, 9]);
        assert_eq!(ctx, [1, 0]);
    }

    #[test]
    fn sum_rejects_context() {
        let mut out = [0.0f64; 1];
        let mut ctx = [0i32; 1];
        assert!(matches!(
            reduce(ReduceOp::Sum, &[1.0, 2.0], &shape(&[2]), 0, &mut out, Some(&mut ctx[..])),
            Err(KernelError::Configuration(_))
        ));
    }

    #[test]
    fn reduce_over_several_axes() {
        let src: Vec<i32> = (0..24).collect();
        let mut out = [0; 3];
        let s = reduce_axes(ReduceOp::Sum, &src, &shape(&[2, 3, 4]), &[0, 2], &mut out).unwrap();
        assert_eq!(s.dims(), &[3]);
        // middle index j: sum over b, x of 12b + 4j + x
        assert_eq!(out, [60, 92, 124]);
    }

    #[test]
    fn permute_moves_axes_and_fuses_add() {
        let src: Vec<i32> = (0..6).collect(); // 1x2x3
        let mut dst = [0; 6];
        let out = permute_axes(&src, &shape(&[1, 2, 3]), &[2, 0, 1], &mut dst, None).unwrap();
        assert_eq!(out.dims(), &[2, 3, 1]);
        assert_eq!(dst, [0, 1, 2, 3, 4, 5]);

        let out = permute_axes(&src, &shape(&[2, 3]), &[1, 0], &mut dst, Some(&[10; 6])).unwrap();
        assert_eq!(out.dims(), &[3, 2]);
        assert_eq!(dst, [10, 13, 11, 14, 12, 15]);

        assert!(permute_axes(&src, &shape(&[2, 3]), &[0, 0], &mut dst, None).is_err());
    }

    #[test]
    fn reverse_first_axis() {
        let src = [1, 2, 3, 4, 5, 6];
        let mut dst = [0; 6];
        reverse(&src, &shape(&[3, 2]), &mut dst, None).unwrap();
        assert_eq!(dst, [5, 6, 3, 4, 1, 2]);
        reverse(&src, &shape(&[3, 2]), &mut dst, Some(&[1; 6])).unwrap();
        assert_eq!(dst, [6, 7, 4, 5, 2, 3]);
    }

    #[test]
    fn stack_then_unstack() {
        let a = [1, 2, 3, 4]; // 2x2
        let b = [5, 6]; // 2x1
        let mut dst = [0; 6];
        let out = stack(&[(&a[..], shape(&[2, 2])), (&b[..], shape(&[2, 1]))], 1, &mut dst).unwrap();
        assert_eq!(out.dims(), &[2, 3]);
        assert_eq!(dst, [1, 2, 5, 3, 4, 6]);

        let mut a2 = [0; 4];
        let mut b2 = [0; 2];
        unstack(&dst, &out, 1, &mut [&mut a2[..], &mut b2[..]]).unwrap();
        assert_eq!((a2, b2), (a, b));
    }

    #[test]
    fn subscript_with_span() {
        let src: Vec<i32> = (0..24).collect(); // 2x3x4
        let s = shape(&[2, 3, 4]);
        let mut row = [0; 4];
        let out = subscript_read(&src, &s, &[Some(1), Some(2)], &mut row).unwrap();
        assert_eq!(out.dims(), &[4]);
        assert_eq!(row, [20, 21, 22, 23]);

        let mut column = [0; 2];
        subscript_read(&src, &s, &[None, Some(0), Some(3)], &mut column).unwrap();
        assert_eq!(column, [3, 15]);

        let mut dst = src.clone();
        subscript_write(&mut dst, &s, &[Some(0), None, Some(0)], &[-1, -2, -3]).unwrap();
        assert_eq!((dst[0], dst[4], dst[8]), (-1, -2, -3));
        assert!(subscript_read(&src, &s, &[Some(2)], &mut [0; 12]).is_err());
    }

    #[test]
    fn band_keeps_diagonals() {
        let src = [1.0f32; 9];
        let mut dst = [9.0f32; 9];
        band(&src, &mut dst, 3, 3, Some(0), Some(1)).unwrap();
        assert_eq!(dst, [1.0, 1.0, 0.0, 0.0, 1.0, 1.0, 0.0, 0.0, 1.0]);
        band(&src, &mut dst, 3, 3, None, Some(0)).unwrap();
        assert_eq!(dst, [1.0, 0.0, 0.0, 1.0, 1.0, 0.0, 1.0, 1.0, 1.0]);
    }

    #[test]
    fn arange_counts() {
        assert_eq!(arange_len(0.0f32, 5.0, 2.0).unwrap(), 3);
        assert_eq!(arange_len(0, 4, 1).unwrap(), 4);
        assert_eq!(arange_len(3.0f64, 1.0, 1.0).unwrap(), 0);
        assert!(arange_len(0, 4, 0).is_err());
    }
}
