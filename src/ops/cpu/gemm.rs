//! Row-major general matrix multiply: `C = alpha * op(A) * op(B) + beta * C`.
//!
//! Rows of `C` are independent and are computed in parallel with rayon.
//! Within a row, columns run left to right and each inner product is
//! accumulated left to right, so every element sees the same sequence of
//! floating point operations as a sequential triple loop.

use rayon::prelude::*;

use crate::config::{GemmConfig, Order};
use crate::error::{KernelError, Result};
use crate::scalar::Scalar;

/// Minimum slice length for a `rows × cols` matrix with leading dimension `ld`.
fn span(rows: usize, cols: usize, ld: usize) -> usize {
    if rows == 0 || cols == 0 { 0 } else { (rows - 1) * ld + cols }
}

fn check_operand(what: &'static str, data_len: usize, rows: usize, cols: usize, ld: usize) -> Result<()> {
    if ld < cols.max(1) {
        return Err(KernelError::InvalidStride { what, stride: ld, minimum: cols.max(1) });
    }
    let needed = span(rows, cols, ld);
    if data_len < needed {
        return Err(KernelError::LengthMismatch { op: "gemm", expected: needed, actual: data_len });
    }
    Ok(())
}

/// Validates order, leading dimensions and slice lengths.
pub(crate) fn validate<T: Scalar>(cfg: &GemmConfig<T>, a: &[T], b: &[T], c: &[T]) -> Result<()> {
    if cfg.order != Order::RowMajor {
        return Err(KernelError::Configuration(
            "gemm only implements row-major operands".to_string(),
        ));
    }
    let (a_rows, a_cols) = cfg.a_dims();
    let (b_rows, b_cols) = cfg.b_dims();
    check_operand("lda", a.len(), a_rows, a_cols, cfg.lda)?;
    check_operand("ldb", b.len(), b_rows, b_cols, cfg.ldb)?;
    check_operand("ldc", c.len(), cfg.m, cfg.n, cfg.ldc)
}

/// Applies `beta` to one row of `C` exactly once.
#[inline]
fn scale_row<T: Scalar>(row: &mut [T], beta: T) {
    if beta == T::ZERO {
        row.fill(T::ZERO);
    } else if beta != T::ONE {
        for v in row.iter_mut() {
            *v = beta.wrapping_mul(*v);
        }
    }
}

pub fn gemm<T: Scalar>(cfg: &GemmConfig<T>, a: &[T], b: &[T], c: &mut [T]) -> Result<()> {
    validate(cfg, a, b, c)?;

    let GemmConfig { m, n, k, alpha, beta, lda, ldb, ldc, .. } = *cfg;
    if m == 0 || n == 0 {
        return Ok(());
    }
    if (alpha == T::ZERO || k == 0) && beta == T::ONE {
        return Ok(());
    }

    let rows = c.par_chunks_mut(ldc).take(m);

    if alpha == T::ZERO {
        rows.for_each(|row| scale_row(&mut row[..n], beta));
        return Ok(());
    }

    let trans_a = cfg.trans_a.is_trans();
    let trans_b = cfg.trans_b.is_trans();

    rows.enumerate().for_each(|(r, row)| {
        let row = &mut row[..n];
        scale_row(row, beta);
        for (col, out) in row.iter_mut().enumerate() {
            let mut acc = T::ZERO;
            for l in 0..k {
                let av = if trans_a { a[l * lda + r] } else { a[r * lda + l] };
                let bv = if trans_b { b[col * ldb + l] } else { b[l * ldb + col] };
                acc = acc.wrapping_add(av.wrapping_mul(bv));
            }
            *out = out.wrapping_add(alpha.wrapping_mul(acc));
        }
    });

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Transpose;

    #[test]
    fn small_product() {
        // [1 2; 3 4] x [5 6; 7 8]
        let a = [1.0f32, 2.0, 3.0, 4.0];
        let b = [5.0f32, 6.0, 7.0, 8.0];
        let mut c = [0.0f32; 4];
        gemm(&GemmConfig::new(2, 2, 2), &a, &b, &mut c).unwrap();
        assert_eq!(c, [19.0, 22.0, 43.0, 50.0]);
    }

    #[test]
    fn beta_is_applied_once() {
        let a = [1.0f64, 0.0, 0.0, 1.0];
        let b = [1.0f64, 2.0, 3.0, 4.0];
        let mut c = [10.0f64; 4];
        let cfg = GemmConfig::new(2, 2, 2).alpha(1.0).beta(2.0);
        gemm(&cfg, &a, &b, &mut c).unwrap();
        assert_eq!(c, [21.0, 22.0, 23.0, 24.0]);
    }

    #[test]
    fn transposed_operands_reindex() {
        // A stored 2x3 read as its 3x2 transpose, B stored 2x2 read transposed.
        let a = [1, 2, 3, 4, 5, 6];
        let b = [1, 2, 3, 4];
        let mut c = [0; 6];
        let cfg = GemmConfig::new(3, 2, 2).trans_a(Transpose::Trans).trans_b(Transpose::Trans);
        gemm(&cfg, &a, &b, &mut c).unwrap();
        // op(A) = [1 4; 2 5; 3 6], op(B) = [1 3; 2 4]
        assert_eq!(c, [9, 19, 12, 26, 15, 33]);
    }

    #[test]
    fn wide_leading_dimension_leaves_padding_untouched() {
        let a = [1.0f32, 2.0];
        let b = [3.0f32, 4.0];
        // C is 2x1 embedded in a 2x3 buffer.
        let mut c = [0.0f32, -1.0, -1.0, 0.0, -1.0, -1.0];
        let cfg = GemmConfig::new(2, 1, 1).leading_dims(1, 1, 3);
        gemm(&cfg, &a, &b, &mut c).unwrap();
        assert_eq!(c, [3.0, -1.0, -1.0, 6.0, -1.0, -1.0]);
    }

    #[test]
    fn column_major_is_a_configuration_error() {
        let mut c = [0.0f32; 1];
        let cfg = GemmConfig::new(1, 1, 1).order(Order::ColMajor);
        assert!(matches!(
            gemm(&cfg, &[1.0], &[1.0], &mut c),
            Err(KernelError::Configuration(_))
        ));
    }

    #[test]
    fn short_leading_dimension_is_rejected() {
        let mut c = [0.0f32; 4];
        let cfg = GemmConfig::new(2, 2, 2).leading_dims(1, 2, 2);
        assert_eq!(
            gemm(&cfg, &[0.0; 4], &[0.0; 4], &mut c),
            Err(KernelError::InvalidStride { what: "lda", stride: 1, minimum: 2 })
        );
    }

    #[test]
    fn alpha_zero_never_reads_operands() {
        let mut c = [1.0f32, 2.0];
        let cfg = GemmConfig::new(1, 2, 3).alpha(0.0).beta(3.0);
        gemm(&cfg, &[f32::NAN; 3], &[f32::NAN; 6], &mut c).unwrap();
        assert_eq!(c, [3.0, 6.0]);
    }
}
