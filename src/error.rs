//! Error types returned by every kernel in the crate.

/// Convenience alias used throughout the crate.
pub type Result<T> = core::result::Result<T, KernelError>;

/// Errors raised when a caller violates a kernel precondition.
///
/// Nothing here is retried or recovered internally; every variant describes
/// a reachable misuse that the caller can act on.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KernelError {
    /// The requested configuration is not implemented (e.g. column-major GEMM).
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A strided view would read or write outside its backing slice.
    #[error("strided view of {len} elements with stride {stride} needs more than {available} elements")]
    ViewOutOfBounds {
        len: usize,
        stride: usize,
        available: usize,
    },

    /// A stride or leading dimension is smaller than the layout requires.
    #[error("invalid {what}: {stride} (minimum {minimum})")]
    InvalidStride {
        what: &'static str,
        stride: usize,
        minimum: usize,
    },

    /// Operands of an operation disagree in length.
    #[error("length mismatch in {op}: expected {expected}, got {actual}")]
    LengthMismatch {
        op: &'static str,
        expected: usize,
        actual: usize,
    },

    /// Shapes of two operands are incompatible.
    #[error("incompatible shapes for {op}: {lhs:?} vs {rhs:?}")]
    ShapeMismatch {
        op: &'static str,
        lhs: Vec<usize>,
        rhs: Vec<usize>,
    },

    /// A shape descriptor exceeds the supported rank.
    #[error("rank {rank} exceeds the supported maximum of 4")]
    RankTooLarge { rank: usize },

    /// An axis does not exist in the shape it indexes.
    #[error("axis {axis} out of range for rank {rank}")]
    AxisOutOfRange { axis: usize, rank: usize },

    /// A gather/scatter context index falls outside the axis extent.
    #[error("context index {index} at position {position} is outside [0, {extent})")]
    IndexOutOfRange {
        position: usize,
        index: i32,
        extent: usize,
    },

    /// An integer division met a zero divisor.
    #[error("integer division by zero at position {position}")]
    DivisionByZero { position: usize },

    /// An im2col setup failed validation.
    #[error("invalid im2col setup: {0}")]
    InvalidSetup(&'static str),

    /// The GPU backend failed; the message carries the device error.
    #[cfg(feature = "wgpu")]
    #[error("gpu failure: {0}")]
    Gpu(String),
}

impl KernelError {
    /// Stable status code for the C ABI. Success is `0`, errors are negative.
    pub fn code(&self) -> i32 {
        match self {
            KernelError::Configuration(_) => -1,
            KernelError::ViewOutOfBounds { .. } => -2,
            KernelError::InvalidStride { .. } => -3,
            KernelError::LengthMismatch { .. } => -4,
            KernelError::ShapeMismatch { .. } => -5,
            KernelError::RankTooLarge { .. } => -6,
            KernelError::AxisOutOfRange { .. } => -7,
            KernelError::IndexOutOfRange { .. } => -8,
            KernelError::InvalidSetup(_) => -9,
            #[cfg(feature = "wgpu")]
            KernelError::Gpu(_) => -10,
            KernelError::DivisionByZero { .. } => -11,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_negative_and_distinct() {
        let errors = [
            KernelError::Configuration("x".into()),
            KernelError::ViewOutOfBounds { len: 1, stride: 1, available: 0 },
            KernelError::InvalidStride { what: "lda", stride: 1, minimum: 2 },
            KernelError::LengthMismatch { op: "add", expected: 1, actual: 2 },
            KernelError::ShapeMismatch { op: "add", lhs: vec![1], rhs: vec![2] },
            KernelError::RankTooLarge { rank: 5 },
            KernelError::AxisOutOfRange { axis: 3, rank: 2 },
            KernelError::IndexOutOfRange { position: 0, index: 9, extent: 2 },
            KernelError::InvalidSetup("stride"),
            KernelError::DivisionByZero { position: 1 },
        ];
        let mut codes: Vec<i32> = errors.iter().map(KernelError::code).collect();
        assert!(codes.iter().all(|&c| c < 0));
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), errors.len());
    }

    #[test]
    fn messages_mention_operands() {
        let err = KernelError::LengthMismatch { op: "dot", expected: 3, actual: 4 };
        assert_eq!(err.to_string(), "length mismatch in dot: expected 3, got 4");
    }
}
