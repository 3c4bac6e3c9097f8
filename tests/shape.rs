use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tensor_hal::config::BroadcastMode;
use tensor_hal::ops::{dispatch, BinaryOp, ReduceOp};
use tensor_hal::view::Shape;
use tensor_hal::KernelError;

fn shape(dims: &[usize]) -> Shape {
    Shape::new(dims).unwrap()
}

#[test]
fn test_broadcast_row_and_column() {
    let matrix = [1, 2, 3, 4, 5, 6];
    let row = [10, 20, 30];
    let column = [100, 200];

    let mut out = [0; 6];
    let s = dispatch::broadcast_binary(
        BinaryOp::Add,
        &matrix,
        &shape(&[2, 3]),
        &row,
        &shape(&[3]),
        &mut out,
        BroadcastMode::Broadcast,
    )
    .unwrap();
    assert_eq!(s.dims(), &[2, 3]);
    assert_eq!(out, [11, 22, 33, 14, 25, 36]);

    let s = dispatch::broadcast_binary(
        BinaryOp::Sub,
        &column,
        &shape(&[2, 1]),
        &matrix,
        &shape(&[2, 3]),
        &mut out,
        BroadcastMode::Broadcast,
    )
    .unwrap();
    assert_eq!(s.dims(), &[2, 3]);
    assert_eq!(out, [99, 98, 97, 196, 195, 194]);
}

#[test]
fn test_broadcast_modes() {
    let a = shape(&[4, 1, 3]);
    let b = shape(&[2, 1]);
    assert_eq!(
        dispatch::broadcast_shape(&a, &b, BroadcastMode::Broadcast).unwrap().dims(),
        &[4, 2, 3]
    );
    assert!(matches!(
        dispatch::broadcast_shape(&a, &b, BroadcastMode::Strict),
        Err(KernelError::ShapeMismatch { .. })
    ));
    assert!(dispatch::broadcast_shape(&shape(&[3]), &shape(&[4]), BroadcastMode::Broadcast).is_err());
}

#[test]
fn test_reduce_axes_matches_sequential_reduce() {
    let mut rng = StdRng::seed_from_u64(5);
    let s = shape(&[2, 3, 4]);
    let src: Vec<i32> = (0..s.count()).map(|_| rng.random_range(-50..50)).collect();

    let mut all = [0i32; 3];
    let out = dispatch::reduce_axes(ReduceOp::Sum, &src, &s, &[0, 2], &mut all).unwrap();
    assert_eq!(out.dims(), &[3]);

    let mut step = vec![0i32; 6];
    dispatch::reduce(ReduceOp::Sum, &src, &s, 2, &mut step, None).unwrap();
    let mut expected = [0i32; 3];
    dispatch::reduce(ReduceOp::Sum, &step, &shape(&[2, 3]), 0, &mut expected, None).unwrap();
    assert_eq!(all, expected);
    assert_eq!(all.iter().sum::<i32>(), src.iter().sum::<i32>());
}

#[test]
fn test_reduce_context_rules() {
    let src = [3.0f32, 1.0, 2.0, 0.5];
    let mut out = [0.0f32; 2];
    let mut ctx = [0i32; 2];
    dispatch::reduce(ReduceOp::Min, &src, &shape(&[2, 2]), 0, &mut out, Some(&mut ctx[..])).unwrap();
    assert_eq!(out, [2.0, 0.5]);
    assert_eq!(ctx, [1, 1]);
    assert!(matches!(
        dispatch::reduce(ReduceOp::Mean, &src, &shape(&[2, 2]), 0, &mut out, Some(&mut ctx[..])),
        Err(KernelError::Configuration(_))
    ));
}

#[test]
fn test_permute_round_trip() {
    let s = shape(&[2, 3, 4]);
    let src: Vec<i32> = (0..24).collect();
    let arrangement = [2, 0, 1];
    let mut moved = vec![0; 24];
    let out = dispatch::permute_axes(&src, &s, &arrangement, &mut moved, None).unwrap();
    assert_eq!(out.dims(), &[3, 4, 2]);
    // element (a, b, c) lands at (b, c, a)
    assert_eq!(moved[(1 * 4 + 2) * 2 + 1], 12 + 4 + 2);

    let inverse = [1, 2, 0];
    let mut back = vec![0; 24];
    let restored = dispatch::permute_axes(&moved, &out, &inverse, &mut back, None).unwrap();
    assert_eq!(restored, s);
    assert_eq!(back, src);

    assert!(dispatch::permute_axes(&src, &s, &[0, 0, 1], &mut back, None).is_err());
}

#[test]
fn test_permute_and_reverse_with_fused_add() {
    let src = [1, 2, 3, 4, 5, 6];
    let ones = [1; 6];
    let mut out = [0; 6];
    dispatch::permute_axes(&src, &shape(&[2, 3]), &[1, 0], &mut out, Some(&ones[..])).unwrap();
    assert_eq!(out, [2, 5, 3, 6, 4, 7]);

    dispatch::reverse(&src, &shape(&[3, 2]), &mut out, None).unwrap();
    assert_eq!(out, [5, 6, 3, 4, 1, 2]);
    dispatch::reverse(&src, &shape(&[3, 2]), &mut out, Some(&ones[..])).unwrap();
    assert_eq!(out, [6, 7, 4, 5, 2, 3]);
}

#[test]
fn test_stack_and_unstack() {
    let a = [1, 2, 3, 4];
    let b = [5, 6];
    let mut joined = [0; 6];
    let out = dispatch::stack(&[(&a[..], shape(&[2, 2])), (&b[..], shape(&[2, 1]))], 1, &mut joined).unwrap();
    assert_eq!(out.dims(), &[2, 3]);
    assert_eq!(joined, [1, 2, 5, 3, 4, 6]);

    let mut left = [0; 4];
    let mut right = [0; 2];
    dispatch::unstack(&joined, &out, 1, &mut [&mut left[..], &mut right[..]]).unwrap();
    assert_eq!(left, a);
    assert_eq!(right, b);
}

#[test]
fn test_subscript_read_and_write() {
    let s = shape(&[2, 3, 2]);
    let mut data: Vec<i32> = (0..12).collect();
    let index = [None, Some(1)];
    assert_eq!(dispatch::subscript_shape(&s, &index).unwrap().dims(), &[2, 2]);

    let mut part = [0; 4];
    dispatch::subscript_read(&data, &s, &index, &mut part).unwrap();
    assert_eq!(part, [2, 3, 8, 9]);

    dispatch::subscript_write(&mut data, &s, &index, &[-1, -2, -3, -4]).unwrap();
    assert_eq!(&data[2..4], &[-1, -2]);
    assert_eq!(&data[8..10], &[-3, -4]);

    assert!(matches!(
        dispatch::subscript_shape(&s, &[Some(2)]),
        Err(KernelError::IndexOutOfRange { .. })
    ));
}

#[test]
fn test_band_and_arange() {
    let src = [1.0f32; 9];
    let mut out = [0.0f32; 9];
    dispatch::band(&src, &mut out, 3, 3, Some(0), None).unwrap();
    assert_eq!(out, [1.0, 1.0, 1.0, 0.0, 1.0, 1.0, 0.0, 0.0, 1.0]);
    dispatch::band(&src, &mut out, 3, 3, Some(1), Some(0)).unwrap();
    assert_eq!(out, [1.0, 0.0, 0.0, 1.0, 1.0, 0.0, 0.0, 1.0, 1.0]);

    assert_eq!(dispatch::arange_len(0.0, 1.0, 0.3).unwrap(), 4);
    assert_eq!(dispatch::arange_len(5, 0, -2).unwrap(), 3);
    assert_eq!(dispatch::arange_len(0, 5, -1).unwrap(), 0);
    assert!(dispatch::arange_len(0.0, 1.0, 0.0).is_err());
}
