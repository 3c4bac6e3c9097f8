//! Utilities to approximate equality of floating point kernel results.
//!
//! Parallel and GPU kernels may sum in a different order than a serial
//! reference, so results are compared by relative distance
//! `|a - b| / max(1, |a|, |b|)` and graded into an [`ApproxEquality`].

/// The max relative error accepted on `f32`s.
pub const F32_MAX_ERROR: f32 = 1e-3;

/// The expected relative error on `f32` reductions.
pub const F32_AVG_ERROR: f32 = 1e-4;

/// The best expected relative error on `f32`s.
pub const F32_MIN_ERROR: f32 = 1e-6;

/// The max relative error accepted on `f64`s.
pub const F64_MAX_ERROR: f64 = 1e-6;

/// The expected relative error on `f64` reductions.
pub const F64_AVG_ERROR: f64 = 1e-10;

/// The best expected relative error on `f64`s.
pub const F64_MIN_ERROR: f64 = 1e-13;

/// Grades the relative distance between two values.
pub trait RelativeEq<Rhs: ?Sized = Self> {
    fn approx_eq(&self, rhs: &Rhs) -> ApproxEquality;
}

macro_rules! impl_relative_eq {
    ($t:ty, $min:expr, $avg:expr, $max:expr) => {
        impl RelativeEq for $t {
            fn approx_eq(&self, rhs: &Self) -> ApproxEquality {
                if self == rhs {
                    return ApproxEquality::Precise;
                }
                if self.is_nan() || rhs.is_nan() {
                    return ApproxEquality::Scarce;
                }
                let scale = self.abs().max(rhs.abs()).max(1.0);
                let dif = (self - rhs).abs() / scale;

                if dif < $min {
                    ApproxEquality::Precise
                } else if dif < $avg {
                    ApproxEquality::Partial
                } else if dif < $max {
                    ApproxEquality::Relative
                } else {
                    ApproxEquality::Scarce
                }
            }
        }
    };
}

impl_relative_eq!(f32, F32_MIN_ERROR, F32_AVG_ERROR, F32_MAX_ERROR);
impl_relative_eq!(f64, F64_MIN_ERROR, F64_AVG_ERROR, F64_MAX_ERROR);

impl RelativeEq for i32 {
    fn approx_eq(&self, rhs: &Self) -> ApproxEquality {
        if self == rhs { ApproxEquality::Precise } else { ApproxEquality::Scarce }
    }
}

impl<T: RelativeEq<U>, U> RelativeEq<[U]> for [T] {
    /// The worst grade over all element pairs; slices of different length
    /// are [`ApproxEquality::Scarce`].
    fn approx_eq(&self, rhs: &[U]) -> ApproxEquality {
        if self.len() != rhs.len() {
            return ApproxEquality::Scarce;
        }
        let mut eq = ApproxEquality::Precise;
        for (t_val, u_val) in self.iter().zip(rhs) {
            eq = eq.max(t_val.approx_eq(u_val));
            if eq == ApproxEquality::Scarce {
                break;
            }
        }
        eq
    }
}

impl<const N: usize, T: RelativeEq<U>, U> RelativeEq<[U; N]> for [T; N] {
    fn approx_eq(&self, rhs: &[U; N]) -> ApproxEquality {
        self.as_slice().approx_eq(rhs.as_slice())
    }
}

impl<T: RelativeEq<U>, U> RelativeEq<Vec<U>> for Vec<T> {
    fn approx_eq(&self, rhs: &Vec<U>) -> ApproxEquality {
        self.as_slice().approx_eq(rhs.as_slice())
    }
}

/// The approximated equality enumerated, best first.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ApproxEquality {
    /// Within the best expected error.
    Precise = 0,

    /// Within the error expected from reordered accumulation.
    Partial = 1,

    /// Within the largest accepted error.
    Relative = 2,

    /// Not equal.
    Scarce = 3,
}

/// True when `a` and `b` agree up to reordered accumulation.
pub fn approx_eq<A: RelativeEq<B> + ?Sized, B: ?Sized>(a: &A, b: &B) -> bool {
    a.approx_eq(b) <= ApproxEquality::Partial
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grades_scale_with_magnitude() {
        assert_eq!(1.0f32.approx_eq(&1.0), ApproxEquality::Precise);
        assert_eq!(1000.0f32.approx_eq(&1000.01), ApproxEquality::Partial);
        assert_eq!(1.0f32.approx_eq(&1.0005), ApproxEquality::Relative);
        assert_eq!(1.0f32.approx_eq(&1.1), ApproxEquality::Scarce);
        assert_eq!(f64::NAN.approx_eq(&f64::NAN), ApproxEquality::Scarce);
    }

    #[test]
    fn slices_take_the_worst_grade() {
        assert!(approx_eq(&[1.0f64, 2.0][..], &[1.0, 2.0 + 1e-12][..]));
        assert!(!approx_eq(&vec![1.0f32, 2.0], &vec![1.0, 2.5]));
        assert!(!approx_eq(&[1.0f32][..], &[1.0, 1.0][..]));
        assert!(approx_eq(&[3i32, 4], &[3, 4]));
    }
}
