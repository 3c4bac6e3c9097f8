use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tensor_hal::config::{GemmConfig, Order, Transpose};
use tensor_hal::ops::dispatch;
use tensor_hal::{KernelError, Scalar};

/// Triple-loop reference over explicit leading dimensions.
fn reference<T: Scalar>(cfg: &GemmConfig<T>, a: &[T], b: &[T], c: &mut [T]) {
    for r in 0..cfg.m {
        for col in 0..cfg.n {
            let mut acc = T::ZERO;
            for l in 0..cfg.k {
                let av = if cfg.trans_a.is_trans() { a[l * cfg.lda + r] } else { a[r * cfg.lda + l] };
                let bv = if cfg.trans_b.is_trans() { b[col * cfg.ldb + l] } else { b[l * cfg.ldb + col] };
                acc = acc + av * bv;
            }
            let out = &mut c[r * cfg.ldc + col];
            *out = cfg.alpha * acc + cfg.beta * *out;
        }
    }
}

/// Every element within `tolerance` relative error of the reference.
fn assert_relative<T: Scalar>(actual: &[T], expected: &[T], tolerance: f64) {
    assert_eq!(actual.len(), expected.len());
    for (i, (&x, &y)) in actual.iter().zip(expected).enumerate() {
        let (x, y) = (x.to_f64(), y.to_f64());
        let scale = x.abs().max(y.abs());
        assert!((x - y).abs() <= tolerance * scale, "element {i}: {x} vs {y}");
    }
}

fn random_case<T: Scalar>(rng: &mut StdRng, tolerance: f64) {
    let m = rng.random_range(1..9);
    let n = rng.random_range(1..9);
    let k = rng.random_range(1..9);
    let mut random = |len: usize| -> Vec<T> { (0..len).map(|_| T::from_f64(rng.random_range(-1.0..1.0))).collect() };
    let (a, b, c0) = (random(m * k), random(k * n), random(m * n));
    let cfg = GemmConfig::new(m, n, k)
        .trans_a(rng.random_bool(0.5))
        .trans_b(rng.random_bool(0.5))
        .alpha(T::from_f64(rng.random_range(-2.0..2.0)))
        .beta(T::from_f64(rng.random_range(-2.0..2.0)));

    let mut expected = c0.clone();
    reference(&cfg, &a, &b, &mut expected);
    let mut c = c0;
    dispatch::gemm(&cfg, &a, &b, &mut c).unwrap();
    assert_relative(&c, &expected, tolerance);
}

#[test]
fn test_random_products_match_reference() {
    let mut rng = StdRng::seed_from_u64(42);
    for _ in 0..24 {
        random_case::<f32>(&mut rng, 1e-4);
        random_case::<f64>(&mut rng, 1e-10);
    }
}

#[test]
fn test_leading_dims_leave_padding_untouched() {
    // 2x2 blocks inside 2x3 storage
    let a = [1.0f32, 2.0, -9.0, 3.0, 4.0, -9.0];
    let b = [5.0f32, 6.0, -9.0, 7.0, 8.0, -9.0];
    let mut c = [0.0f32, 0.0, 42.0, 0.0, 0.0, 42.0];
    let cfg = GemmConfig::new(2, 2, 2).leading_dims(3, 3, 3);
    dispatch::gemm(&cfg, &a, &b, &mut c).unwrap();
    assert_eq!(c, [19.0, 22.0, 42.0, 43.0, 50.0, 42.0]);
}

#[test]
fn test_beta_zero_ignores_existing_nan() {
    let a = [1.0f32, 2.0];
    let b = [3.0f32, 4.0];
    let mut c = [f32::NAN];
    dispatch::gemm(&GemmConfig::new(1, 1, 2), &a, &b, &mut c).unwrap();
    assert_eq!(c, [11.0]);
}

#[test]
fn test_integer_gemm() {
    let a = [1, 2, 3, 4, 5, 6];
    let b = [1, 0, 0, 1, 1, 1];
    let mut c = [1, 1, 1, 1];
    let cfg = GemmConfig::new(2, 2, 3).alpha(2).beta(1);
    dispatch::gemm(&cfg, &a, &b, &mut c).unwrap();
    // a * b = [[4, 5], [10, 11]]
    assert_eq!(c, [9, 11, 21, 23]);
}

#[test]
fn test_zero_k_scales_c_by_beta() {
    let mut c = [1.0f64, 2.0, 3.0, 4.0];
    let cfg = GemmConfig::new(2, 2, 0).beta(3.0).leading_dims(1, 2, 2);
    dispatch::gemm(&cfg, &[], &[], &mut c).unwrap();
    assert_eq!(c, [3.0, 6.0, 9.0, 12.0]);
}

#[test]
fn test_invalid_configurations() {
    let a = [0.0f32; 4];
    let b = [0.0f32; 4];
    let mut c = [0.0f32; 4];
    let col_major = GemmConfig::new(2, 2, 2).order(Order::ColMajor);
    assert!(matches!(dispatch::gemm(&col_major, &a, &b, &mut c), Err(KernelError::Configuration(_))));

    let narrow = GemmConfig::new(2, 2, 2).leading_dims(1, 2, 2);
    assert!(matches!(
        dispatch::gemm(&narrow, &a, &b, &mut c),
        Err(KernelError::InvalidStride { what: "lda", .. })
    ));

    let short = GemmConfig::new(2, 2, 2).trans_b(Transpose::Trans);
    assert!(matches!(
        dispatch::gemm(&short, &a, &b[..3], &mut c),
        Err(KernelError::LengthMismatch { .. })
    ));
}

#[test]
fn test_zero_alpha_never_reads_operands() {
    let a = [f32::NAN; 4];
    let b = [f32::NAN; 4];
    let mut c = [1.0f32, 2.0, 3.0, 4.0];
    let keep = GemmConfig::new(2, 2, 2).alpha(0.0).beta(1.0);
    dispatch::gemm(&keep, &a, &b, &mut c).unwrap();
    assert_eq!(c, [1.0, 2.0, 3.0, 4.0]);

    let clear = GemmConfig::new(2, 2, 2).alpha(0.0).beta(0.0);
    dispatch::gemm(&clear, &a, &b, &mut c).unwrap();
    assert_eq!(c, [0.0; 4]);
}
