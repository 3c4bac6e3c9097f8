use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tensor_hal::approx::approx_eq;
use tensor_hal::ops::{dispatch, BinaryOp, FloatOp, UnaryOp};
use tensor_hal::view::{Strided, StridedMut};
use tensor_hal::KernelError;

fn dense<T: Copy>(v: &[T]) -> Strided<'_, T> {
    Strided::contiguous(v)
}

#[test]
fn test_fill_and_ramp_respect_stride() {
    let mut buf = [0i32; 7];
    dispatch::fill(9, StridedMut::new(&mut buf, 3, 3).unwrap());
    assert_eq!(buf, [9, 0, 0, 9, 0, 0, 9]);

    let mut buf = [0i32; 5];
    dispatch::ramp(0, 2, StridedMut::contiguous(&mut buf));
    assert_eq!(buf, [0, 2, 4, 6, 8]);

    let mut buf = [-1.0f64; 6];
    dispatch::ramp(1.0, 0.5, StridedMut::new(&mut buf, 2, 3).unwrap());
    assert_eq!(buf, [1.0, -1.0, 1.5, -1.0, 2.0, -1.0]);
}

#[test]
fn test_binary_ops_with_mixed_strides() {
    let lhs = [1.0f32, 10.0, 2.0, 20.0, 3.0, 30.0];
    let rhs = [4.0f32, 5.0, 6.0];
    let mut out = [0.0f32; 3];
    dispatch::binary(
        BinaryOp::Sub,
        Strided::new(&lhs, 2, 3).unwrap(),
        dense(&rhs),
        StridedMut::contiguous(&mut out),
    )
    .unwrap();
    assert_eq!(out, [-3.0, -4.0, -3.0]);

    let mut out = [0; 3];
    dispatch::binary(BinaryOp::Max, dense(&[1, 7, 3]), dense(&[5, 2, 3]), StridedMut::contiguous(&mut out)).unwrap();
    assert_eq!(out, [5, 7, 3]);
    dispatch::binary(BinaryOp::Min, dense(&[1, 7, 3]), dense(&[5, 2, 3]), StridedMut::contiguous(&mut out)).unwrap();
    assert_eq!(out, [1, 2, 3]);
}

#[test]
fn test_scalar_forms_are_not_commutative() {
    let v = [1.0f64, 2.0, 4.0];
    let mut out = [0.0f64; 3];
    dispatch::binary_scalar(BinaryOp::Div, dense(&v), 2.0, StridedMut::contiguous(&mut out)).unwrap();
    assert_eq!(out, [0.5, 1.0, 2.0]);
    dispatch::binary_scalar_reversed(BinaryOp::Div, 2.0, dense(&v), StridedMut::contiguous(&mut out)).unwrap();
    assert_eq!(out, [2.0, 1.0, 0.5]);
    dispatch::binary_scalar_reversed(BinaryOp::Sub, 10.0, dense(&v), StridedMut::contiguous(&mut out)).unwrap();
    assert_eq!(out, [9.0, 8.0, 6.0]);
}

#[test]
fn test_unary_and_threshold() {
    let v = [-2i32, 0, 3];
    let mut out = [0i32; 3];
    dispatch::unary(UnaryOp::Relu, dense(&v), StridedMut::contiguous(&mut out)).unwrap();
    assert_eq!(out, [0, 0, 3]);
    dispatch::unary(UnaryOp::Heaviside, dense(&v), StridedMut::contiguous(&mut out)).unwrap();
    assert_eq!(out, [0, 0, 1]);
    dispatch::unary(UnaryOp::Square, dense(&v), StridedMut::contiguous(&mut out)).unwrap();
    assert_eq!(out, [4, 0, 9]);
    dispatch::threshold(dense(&v), 1, StridedMut::contiguous(&mut out)).unwrap();
    assert_eq!(out, [1, 1, 3]);
}

#[test]
fn test_float_functions_match_std() {
    let mut rng = StdRng::seed_from_u64(7);
    let v: Vec<f64> = (0..64).map(|_| rng.random_range(0.1..4.0)).collect();
    let mut out = vec![0.0f64; v.len()];
    let cases: [(FloatOp, fn(f64) -> f64); 6] = [
        (FloatOp::Sqrt, f64::sqrt),
        (FloatOp::Exp, f64::exp),
        (FloatOp::Log, f64::ln),
        (FloatOp::Sin, f64::sin),
        (FloatOp::Cos, f64::cos),
        (FloatOp::Tanh, f64::tanh),
    ];
    for (op, f) in cases {
        dispatch::float_unary(op, dense(&v), StridedMut::contiguous(&mut out)).unwrap();
        let expected: Vec<f64> = v.iter().map(|&x| f(x)).collect();
        assert!(approx_eq(&out, &expected), "{op:?}");
    }

    let mut signed = [0.0f32; 3];
    dispatch::copysign(dense(&[1.0f32, -2.0, 3.0]), dense(&[-1.0, 1.0, -0.0]), StridedMut::contiguous(&mut signed))
        .unwrap();
    assert_eq!(signed, [-1.0, 2.0, -3.0]);
}

#[test]
fn test_reductions_over_strided_views() {
    let data = [3.0f32, 100.0, 1.0, 100.0, 4.0, 100.0, 1.0];
    let view = Strided::new(&data, 2, 4).unwrap();
    assert_eq!(dispatch::sum(view), 9.0);
    assert_eq!(dispatch::max_index(view), Some((4.0, 2)));
    assert_eq!(dispatch::min_index(view), Some((1.0, 1)));
    assert_eq!(dispatch::max_index(Strided::<f32>::contiguous(&[])), None);
    assert_eq!(dispatch::dot(dense(&[1, 2, 3]), dense(&[4, 5, 6])).unwrap(), 32);
    assert!(matches!(
        dispatch::dot(dense(&[1, 2]), dense(&[1])),
        Err(KernelError::LengthMismatch { .. })
    ));
}

#[test]
fn test_copy_and_transpose() {
    let src = [1, 2, 3];
    let mut dst = [0; 5];
    dispatch::copy_strided(dense(&src), StridedMut::new(&mut dst, 2, 3).unwrap()).unwrap();
    assert_eq!(dst, [1, 0, 2, 0, 3]);

    // 2 rows, 3 cols
    let m = [1, 2, 3, 4, 5, 6];
    let mut t = [0; 6];
    dispatch::transpose(&m, &mut t, 3, 2).unwrap();
    assert_eq!(t, [1, 4, 2, 5, 3, 6]);
    let mut back = [0; 6];
    dispatch::transpose(&t, &mut back, 2, 3).unwrap();
    assert_eq!(back, m);
}

#[test]
fn test_length_mismatch_is_reported() {
    let mut out = [0.0f32; 2];
    let err = dispatch::unary(UnaryOp::Negate, dense(&[1.0f32; 3]), StridedMut::contiguous(&mut out)).unwrap_err();
    assert_eq!(err, KernelError::LengthMismatch { op: "unary", expected: 3, actual: 2 });
}

#[test]
fn test_first_extremum_wins_ties() {
    assert_eq!(dispatch::max_index(dense(&[3, 5, 5, 2])), Some((5, 1)));
    assert_eq!(dispatch::min_index(dense(&[3, 2, 5, 2])), Some((2, 1)));
}

#[test]
fn test_integer_division_by_zero_returns_error() {
    let mut out = [0; 2];
    let result = std::panic::catch_unwind(move || {
        dispatch::binary(BinaryOp::Div, dense(&[1, 2]), dense(&[1, 0]), StridedMut::contiguous(&mut out))
    });
    assert_eq!(result.ok(), Some(Err(KernelError::DivisionByZero { position: 1 })));

    let mut out = [0; 3];
    dispatch::binary_scalar(BinaryOp::Add, dense(&[i32::MAX, 0, i32::MIN]), 1, StridedMut::contiguous(&mut out))
        .unwrap();
    assert_eq!(out, [i32::MIN, 1, i32::MIN + 1]);
    dispatch::unary(UnaryOp::Square, dense(&[i32::MAX, 3, -4]), StridedMut::contiguous(&mut out)).unwrap();
    assert_eq!(out, [1, 9, 16]);
}
