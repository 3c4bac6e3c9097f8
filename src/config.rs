//! Kernel configuration records and runtime settings.
//!
//! Per-call options (matrix order, transposition, broadcasting) are plain
//! enums passed explicitly to each operation;
//! nothing here is ambient state. The only process-wide settings are the
//! backend and the rayon thread pool, which [`RuntimeConfig::apply`] installs.

use briny::prelude::{Validate, ValidationError};

use crate::backend::{set_backend, Backend};
use crate::error::{KernelError, Result};
use crate::scalar::Scalar;

/// Storage order of GEMM operands. Only row-major is implemented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum Order {
    #[default]
    RowMajor = 0,
    ColMajor,
}

/// Logical transposition of a GEMM operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum Transpose {
    #[default]
    NoTrans = 0,
    Trans,
}

impl Transpose {
    pub fn is_trans(self) -> bool {
        self == Transpose::Trans
    }
}

impl From<bool> for Transpose {
    fn from(trans: bool) -> Self {
        if trans { Transpose::Trans } else { Transpose::NoTrans }
    }
}

/// How element-wise operations treat operands of different shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BroadcastMode {
    /// Shapes must match exactly.
    #[default]
    Strict,
    /// Shapes are right-aligned; extents of 1 stretch to the other operand.
    Broadcast,
}

/// Arguments of `C = alpha * op(A) * op(B) + beta * C`.
///
/// Leading dimensions default to the tight row-major value for the chosen
/// transposition and can be widened for sub-matrix views.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GemmConfig<T> {
    pub order: Order,
    pub trans_a: Transpose,
    pub trans_b: Transpose,
    pub m: usize,
    pub n: usize,
    pub k: usize,
    pub alpha: T,
    pub beta: T,
    pub lda: usize,
    pub ldb: usize,
    pub ldc: usize,
}

impl<T: Scalar> GemmConfig<T> {
    /// `C (m×n) = A (m×k) · B (k×n)` with `alpha = 1`, `beta = 0`.
    pub fn new(m: usize, n: usize, k: usize) -> Self {
        Self {
            order: Order::RowMajor,
            trans_a: Transpose::NoTrans,
            trans_b: Transpose::NoTrans,
            m,
            n,
            k,
            alpha: T::ONE,
            beta: T::ZERO,
            lda: k,
            ldb: n,
            ldc: n,
        }
    }

    pub fn order(mut self, order: Order) -> Self {
        self.order = order;
        self
    }

    /// Reads `A` as a stored `k×m` matrix.
    pub fn trans_a(mut self, trans: impl Into<Transpose>) -> Self {
        self.trans_a = trans.into();
        self.lda = if self.trans_a.is_trans() { self.m } else { self.k };
        self
    }

    /// Reads `B` as a stored `n×k` matrix.
    pub fn trans_b(mut self, trans: impl Into<Transpose>) -> Self {
        self.trans_b = trans.into();
        self.ldb = if self.trans_b.is_trans() { self.k } else { self.n };
        self
    }

    pub fn alpha(mut self, alpha: T) -> Self {
        self.alpha = alpha;
        self
    }

    pub fn beta(mut self, beta: T) -> Self {
        self.beta = beta;
        self
    }

    pub fn leading_dims(mut self, lda: usize, ldb: usize, ldc: usize) -> Self {
        self.lda = lda;
        self.ldb = ldb;
        self.ldc = ldc;
        self
    }

    /// Stored `(rows, cols)` of `A`.
    pub fn a_dims(&self) -> (usize, usize) {
        if self.trans_a.is_trans() { (self.k, self.m) } else { (self.m, self.k) }
    }

    /// Stored `(rows, cols)` of `B`.
    pub fn b_dims(&self) -> (usize, usize) {
        if self.trans_b.is_trans() { (self.n, self.k) } else { (self.k, self.n) }
    }
}

/// Geometry of a batched multi-channel image for im2col/col2img.
///
/// The image is laid out `[batch][channel][height][width]`; the column
/// matrix is `[kernel offset][batch][out_y][out_x]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(C)]
pub struct Img2ColSetup {
    pub batch_size: usize,
    pub channels: usize,
    pub height: usize,
    pub width: usize,
    pub kernel_height: usize,
    pub kernel_width: usize,
    pub padding: usize,
    pub stride: usize,
}

impl Img2ColSetup {
    /// Returns the first violated constraint, if any.
    fn violation(&self) -> Option<&'static str> {
        if self.batch_size == 0 || self.channels == 0 || self.height == 0 || self.width == 0 {
            return Some("image extents must be positive");
        }
        if self.kernel_height == 0 || self.kernel_width == 0 {
            return Some("kernel extents must be positive");
        }
        if self.stride == 0 {
            return Some("stride must be positive");
        }
        let padded_h = self.height + 2 * self.padding;
        let padded_w = self.width + 2 * self.padding;
        if self.kernel_height > padded_h || self.kernel_width > padded_w {
            return Some("kernel larger than padded input");
        }
        if (padded_h - self.kernel_height) % self.stride != 0
            || (padded_w - self.kernel_width) % self.stride != 0
        {
            return Some("stride does not evenly divide the padded input");
        }
        None
    }

    /// Validates the setup, naming the violated constraint on failure.
    pub fn check(&self) -> Result<()> {
        self.validate().map_err(|_| {
            KernelError::InvalidSetup(self.violation().unwrap_or("invalid setup"))
        })
    }

    pub fn output_height(&self) -> usize {
        (self.height + 2 * self.padding - self.kernel_height) / self.stride + 1
    }

    pub fn output_width(&self) -> usize {
        (self.width + 2 * self.padding - self.kernel_width) / self.stride + 1
    }

    /// Rows of the column matrix: one per kernel offset.
    pub fn patch_len(&self) -> usize {
        self.kernel_height * self.kernel_width * self.channels
    }

    /// Columns of the column matrix: one per output pixel across the batch.
    pub fn columns(&self) -> usize {
        self.batch_size * self.output_height() * self.output_width()
    }

    pub fn image_len(&self) -> usize {
        self.batch_size * self.channels * self.height * self.width
    }

    pub fn columns_len(&self) -> usize {
        self.patch_len() * self.columns()
    }
}

impl Validate for Img2ColSetup {
    fn validate(&self) -> core::result::Result<(), ValidationError> {
        if self.violation().is_some() {
            return Err(ValidationError);
        }
        Ok(())
    }
}

/// Environment variable selecting the backend (`cpu` or `wgpu`).
pub const BACKEND_ENV: &str = "TENSOR_HAL_BACKEND";
/// Environment variable sizing the rayon pool.
pub const THREADS_ENV: &str = "TENSOR_HAL_THREADS";

/// Process-wide settings: which backend to route to and how many threads
/// the data-parallel kernels may use.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RuntimeConfig {
    pub backend: Backend,
    /// `None` lets rayon use every available core.
    pub threads: Option<usize>,
}

impl RuntimeConfig {
    /// Reads [`BACKEND_ENV`] and [`THREADS_ENV`]; unset variables keep defaults.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();
        if let Some(raw) = lookup(BACKEND_ENV) {
            config.backend = raw.parse()?;
        }
        if let Some(raw) = lookup(THREADS_ENV) {
            let threads: usize = raw.trim().parse().map_err(|_| {
                KernelError::Configuration(format!("{THREADS_ENV}={raw:?} is not a thread count"))
            })?;
            if threads == 0 {
                return Err(KernelError::Configuration(format!(
                    "{THREADS_ENV} must be at least 1"
                )));
            }
            config.threads = Some(threads);
        }
        Ok(config)
    }

    /// Thread count the pool will be built with.
    pub fn resolve_threads(&self) -> usize {
        self.threads.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        })
    }

    /// Installs the backend and builds the global rayon pool.
    ///
    /// A requested backend that is not compiled in or has no device falls
    /// back to [`Backend::Cpu`]. The pool can only be built once per
    /// process; later calls keep the existing pool and log at debug level.
    pub fn apply(&self) -> Backend {
        let backend = if self.backend.is_available() {
            self.backend
        } else {
            tracing::warn!("backend {:?} unavailable, using cpu", self.backend);
            Backend::Cpu
        };
        set_backend(backend);

        let threads = self.resolve_threads();
        match rayon::ThreadPoolBuilder::new().num_threads(threads).build_global() {
            Ok(()) => tracing::info!("kernel pool: {threads} threads"),
            Err(e) => tracing::debug!("kernel pool already initialised: {e}"),
        }
        tracing::info!("active backend: {backend:?}");
        backend
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup(h: usize, w: usize, k: usize, padding: usize, stride: usize) -> Img2ColSetup {
        Img2ColSetup {
            batch_size: 2,
            channels: 3,
            height: h,
            width: w,
            kernel_height: k,
            kernel_width: k,
            padding,
            stride,
        }
    }

    #[test]
    fn img2col_output_extents() {
        let s = setup(5, 5, 3, 1, 2);
        assert!(s.check().is_ok());
        assert!(s.validate().is_ok());
        assert_eq!(s.output_height(), 3);
        assert_eq!(s.output_width(), 3);
        assert_eq!(s.patch_len(), 27);
        assert_eq!(s.columns(), 18);
        assert_eq!(s.image_len(), 150);
    }

    #[test]
    fn img2col_rejects_inexact_stride_and_oversized_kernel() {
        assert_eq!(
            setup(4, 4, 3, 0, 2).check(),
            Err(KernelError::InvalidSetup("stride does not evenly divide the padded input"))
        );
        assert_eq!(
            setup(2, 2, 5, 1, 1).check(),
            Err(KernelError::InvalidSetup("kernel larger than padded input"))
        );
        assert!(setup(4, 4, 2, 0, 0).validate().is_err());
    }

    #[test]
    fn gemm_config_tracks_leading_dims() {
        let cfg = GemmConfig::<f32>::new(2, 3, 4);
        assert_eq!((cfg.lda, cfg.ldb, cfg.ldc), (4, 3, 3));
        let cfg = cfg.trans_a(true).trans_b(Transpose::Trans);
        assert_eq!((cfg.lda, cfg.ldb), (2, 4));
        assert_eq!(cfg.a_dims(), (4, 2));
        assert_eq!(cfg.b_dims(), (3, 4));
    }

    #[test]
    fn runtime_config_from_lookup() {
        let cfg = RuntimeConfig::from_lookup(|key| match key {
            BACKEND_ENV => Some("CPU".into()),
            THREADS_ENV => Some("3".into()),
            _ => None,
        })
        .unwrap();
        assert_eq!(cfg, RuntimeConfig { backend: Backend::Cpu, threads: Some(3) });
        assert_eq!(cfg.resolve_threads(), 3);

        let bad = RuntimeConfig::from_lookup(|key| (key == THREADS_ENV).then(|| "0".to_string()));
        assert!(matches!(bad, Err(KernelError::Configuration(_))));

        let bad = RuntimeConfig::from_lookup(|key| (key == BACKEND_ENV).then(|| "tpu".to_string()));
        assert!(matches!(bad, Err(KernelError::Configuration(_))));
    }
}
