//! Patch extraction (im2col) and its adjoint accumulation (col2img).
//!
//! The column matrix is laid out `[k][batch][out_y][out_x]` where `k`
//! enumerates kernel offsets `(kz, ky, kx)` with `kx` fastest. That makes it
//! directly usable as the right-hand GEMM operand of a convolution.

use rayon::prelude::*;

use crate::config::Img2ColSetup;
use crate::error::{KernelError, Result};
use crate::ops::cpu::vector;
use crate::scalar::Scalar;
use crate::view::StridedMut;

/// Offsets derived from a validated setup, shared by both directions.
#[derive(Debug, Clone, Copy)]
struct Geometry {
    setup: Img2ColSetup,
    out_h: usize,
    out_w: usize,
    /// Elements per batch entry in the column matrix.
    batch_stride: usize,
    /// Elements per kernel offset in the column matrix.
    full_stride: usize,
    /// Elements per batch entry in the image.
    featuremap_stride: usize,
}

impl Geometry {
    fn new(setup: &Img2ColSetup, image_len: usize, columns_len: usize) -> Result<Self> {
        setup.check()?;
        if image_len != setup.image_len() {
            return Err(KernelError::LengthMismatch {
                op: "img2col image",
                expected: setup.image_len(),
                actual: image_len,
            });
        }
        if columns_len != setup.columns_len() {
            return Err(KernelError::LengthMismatch {
                op: "img2col columns",
                expected: setup.columns_len(),
                actual: columns_len,
            });
        }
        let out_h = setup.output_height();
        let out_w = setup.output_width();
        let batch_stride = out_h * out_w;
        Ok(Self {
            setup: *setup,
            out_h,
            out_w,
            batch_stride,
            full_stride: batch_stride * setup.batch_size,
            featuremap_stride: setup.channels * setup.height * setup.width,
        })
    }

    /// Splits a kernel offset into `(kx, ky, kz)`.
    #[inline]
    fn kernel_offset(&self, k: usize) -> (usize, usize, usize) {
        let kw = self.setup.kernel_width;
        let kh = self.setup.kernel_height;
        (k % kw, (k / kw) % kh, k / (kw * kh))
    }

    /// Input coordinate for output position `o` and kernel offset `ko`, or
    /// `None` when it falls in the padding.
    #[inline]
    fn input_coord(&self, o: usize, ko: usize, extent: usize) -> Option<usize> {
        (o * self.setup.stride + ko)
            .checked_sub(self.setup.padding)
            .filter(|&i| i < extent)
    }
}

/// Extracts every kernel-sized patch of `src` into the column matrix `dst`.
///
/// Positions that fall into the padding are written as zero.
pub fn img2col<T: Scalar>(setup: &Img2ColSetup, src: &[T], dst: &mut [T]) -> Result<()> {
    let g = Geometry::new(setup, src.len(), dst.len())?;
    let Img2ColSetup { height, width, .. } = g.setup;
    tracing::debug!(
        "img2col: {} patches x {} columns",
        g.setup.patch_len(),
        g.full_stride
    );

    dst.par_chunks_mut(g.full_stride)
        .enumerate()
        .for_each(|(k, plane)| {
            let (kx, ky, kz) = g.kernel_offset(k);
            for (b, batch) in plane.chunks_mut(g.batch_stride).enumerate() {
                let image = &src[b * g.featuremap_stride + kz * height * width..][..height * width];
                for (y, row) in batch.chunks_mut(g.out_w).enumerate() {
                    let Some(in_y) = g.input_coord(y, ky, height) else {
                        vector::fill(T::ZERO, StridedMut::contiguous(row));
                        continue;
                    };
                    for (x, out) in row.iter_mut().enumerate() {
                        *out = match g.input_coord(x, kx, width) {
                            Some(in_x) => image[in_y * width + in_x],
                            None => T::ZERO,
                        };
                    }
                }
            }
        });
    Ok(())
}

/// Adjoint of [`img2col`]: zero-fills `dst` and adds every in-bounds column
/// element back onto the image pixel it was read from.
///
/// Overlapping patches accumulate. Each batch entry owns a disjoint slice of
/// the image, so batches run in parallel while each pixel still receives its
/// contributions in ascending `k`, then `y`, then `x` order.
pub fn col2img<T: Scalar>(setup: &Img2ColSetup, src: &[T], dst: &mut [T]) -> Result<()> {
    let g = Geometry::new(setup, dst.len(), src.len())?;
    let Img2ColSetup { height, width, .. } = g.setup;

    vector::fill(T::ZERO, StridedMut::contiguous(dst));

    dst.par_chunks_mut(g.featuremap_stride)
        .enumerate()
        .for_each(|(b, featuremap)| {
            for k in 0..g.setup.patch_len() {
                let (kx, ky, kz) = g.kernel_offset(k);
                let channel = &mut featuremap[kz * height * width..][..height * width];
                let columns = &src[k * g.full_stride + b * g.batch_stride..][..g.batch_stride];
                for y in 0..g.out_h {
                    let Some(in_y) = g.input_coord(y, ky, height) else {
                        continue;
                    };
                    for x in 0..g.out_w {
                        if let Some(in_x) = g.input_coord(x, kx, width) {
                            let pixel = &mut channel[in_y * width + in_x];
                            *pixel = pixel.wrapping_add(columns[y * g.out_w + x]);
                        }
                    }
                }
            }
        });
    Ok(())
}
