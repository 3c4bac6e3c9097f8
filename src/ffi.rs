//! C ABI over the dispatch layer.
//!
//! Symbols are named `hal_<kind><op>[_<form>]` where `<kind>` is `s`
//! (`float`), `d` (`double`) or `i` (`int32_t`) and `<form>` is `vv`
//! (vector-vector), `vs` (vector-scalar) or `sv` (scalar-vector). Lengths
//! and strides count elements, not bytes.
//!
//! Every function returns `0` on success or a negative
//! [`KernelError::code`]. The message of the last failure on the calling
//! thread is available through [`hal_last_error_message`].
//!
//! Inputs may alias the output (`hal_sadd_vv(x, 1, y, 1, x, 1, n)` is an
//! in-place add). An input that overlaps the output is copied into scratch
//! before the output is borrowed, so in-place calls read the original
//! values.
//!
//! Integer arithmetic wraps on overflow. An integer division with a zero
//! divisor fails before anything is written.
//!
//! # Safety
//!
//! Every pointer must be valid for the elements its length and stride
//! describe, and must stay valid for the duration of the call. A pointer may
//! be null only when its operand is empty.

use core::ffi::c_char;
use core::ops::Range;
use std::cell::RefCell;

use crate::config::{GemmConfig, Img2ColSetup, Order, Transpose};
use crate::error::{KernelError, Result};
use crate::ops::{dispatch, BinaryOp, FloatOp, UnaryOp};
use crate::scalar::{Float, Scalar};
use crate::view::{Shape, Strided, StridedMut};

thread_local! {
    static LAST_ERROR: RefCell<Option<String>> = const { RefCell::new(None) };
}

/// Converts a kernel result into a status code, logging and recording
/// failures.
fn status(op: &str, result: Result<()>) -> i32 {
    match result {
        Ok(()) => 0,
        Err(e) => {
            tracing::error!("{op}: {e}");
            let code = e.code();
            LAST_ERROR.with(|slot| *slot.borrow_mut() = Some(e.to_string()));
            code
        }
    }
}

/// Length in bytes of the last error message on this thread, or `0`.
#[unsafe(no_mangle)]
pub extern "C" fn hal_last_error_length() -> usize {
    LAST_ERROR.with(|slot| slot.borrow().as_ref().map_or(0, String::len))
}

/// Copies the last error message into `buffer` (null terminated, truncated
/// to `capacity - 1` bytes) and returns the number of bytes copied.
///
/// # Safety
///
/// `buffer` must be valid for `capacity` bytes of writes.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn hal_last_error_message(buffer: *mut c_char, capacity: usize) -> usize {
    if buffer.is_null() || capacity == 0 {
        return 0;
    }
    LAST_ERROR.with(|slot| {
        let slot = slot.borrow();
        let bytes = slot.as_deref().unwrap_or("").as_bytes();
        let copied = bytes.len().min(capacity - 1);
        unsafe {
            core::ptr::copy_nonoverlapping(bytes.as_ptr().cast::<c_char>(), buffer, copied);
            *buffer.add(copied) = 0;
        }
        copied
    })
}

#[unsafe(no_mangle)]
pub extern "C" fn hal_clear_last_error() {
    LAST_ERROR.with(|slot| *slot.borrow_mut() = None);
}

fn null_pointer(what: &'static str) -> KernelError {
    KernelError::Configuration(format!("{what} is a null pointer"))
}

/// Slice elements a strided operand touches, with overflow checked.
fn span_len(what: &'static str, stride: usize, len: usize) -> Result<usize> {
    if len == 0 {
        return Ok(0);
    }
    (len - 1)
        .checked_mul(stride)
        .and_then(|v| v.checked_add(1))
        .ok_or_else(|| KernelError::Configuration(format!("{what} span overflows")))
}

/// Dense slice elements of a `rows × cols` matrix with leading dimension `ld`.
fn matrix_len(rows: usize, cols: usize, ld: usize) -> usize {
    if rows == 0 || cols == 0 { 0 } else { (rows - 1).saturating_mul(ld).saturating_add(cols) }
}

fn byte_range<T>(ptr: *const T, elems: usize) -> Range<usize> {
    let start = ptr as usize;
    start..start.saturating_add(elems.saturating_mul(size_of::<T>()))
}

fn overlaps(a: &Range<usize>, b: &Range<usize>) -> bool {
    a.start < b.end && b.start < a.end
}

/// Borrows a dense input, or copies it into `scratch` when it overlaps `out`.
///
/// # Safety
///
/// `ptr` must be valid for `elems` reads.
unsafe fn input<'a, T: Copy>(
    what: &'static str,
    ptr: *const T,
    elems: usize,
    out: &Range<usize>,
    scratch: &'a mut Vec<T>,
) -> Result<&'a [T]> {
    if elems == 0 {
        return Ok(&[]);
    }
    if ptr.is_null() {
        return Err(null_pointer(what));
    }
    let raw = unsafe { core::slice::from_raw_parts(ptr, elems) };
    if overlaps(&byte_range(ptr, elems), out) {
        scratch.extend_from_slice(raw);
        let copied: &'a [T] = scratch;
        return Ok(copied);
    }
    Ok(raw)
}

/// Strided counterpart of [`input`]; a copied operand becomes contiguous.
///
/// # Safety
///
/// `ptr` must be valid for the strided range.
unsafe fn strided_input<'a, T: Scalar>(
    what: &'static str,
    ptr: *const T,
    stride: usize,
    len: usize,
    out: &Range<usize>,
    scratch: &'a mut Vec<T>,
) -> Result<Strided<'a, T>> {
    let elems = span_len(what, stride, len)?;
    if elems == 0 {
        return Ok(Strided::contiguous(&[]));
    }
    if ptr.is_null() {
        return Err(null_pointer(what));
    }
    let view = Strided::new(unsafe { core::slice::from_raw_parts(ptr, elems) }, stride, len)?;
    if overlaps(&byte_range(ptr, elems), out) {
        scratch.extend(view.iter());
        return Ok(Strided::contiguous(scratch));
    }
    Ok(view)
}

/// # Safety
///
/// `ptr` must be valid for `elems` writes and not aliased by any live borrow.
unsafe fn output<'a, T>(what: &'static str, ptr: *mut T, elems: usize) -> Result<&'a mut [T]> {
    if elems == 0 {
        return Ok(&mut []);
    }
    if ptr.is_null() {
        return Err(null_pointer(what));
    }
    Ok(unsafe { core::slice::from_raw_parts_mut(ptr, elems) })
}

/// # Safety
///
/// As for [`output`], over the strided range.
unsafe fn strided_output<'a, T: Scalar>(
    what: &'static str,
    ptr: *mut T,
    stride: usize,
    len: usize,
) -> Result<StridedMut<'a, T>> {
    let elems = span_len(what, stride, len)?;
    let data = unsafe { output(what, ptr, elems)? };
    if len == 0 {
        return Ok(StridedMut::contiguous(data));
    }
    StridedMut::new(data, stride, len)
}

/// Writes a scalar result through a caller pointer.
///
/// # Safety
///
/// `ptr` must be null or valid for one write.
unsafe fn store<T>(what: &'static str, ptr: *mut T, value: T) -> Result<()> {
    if ptr.is_null() {
        return Err(null_pointer(what));
    }
    unsafe { ptr.write(value) };
    Ok(())
}

fn shape_from(what: &'static str, dims: *const usize, rank: usize) -> Result<Shape> {
    if rank == 0 {
        return Shape::new(&[]);
    }
    if dims.is_null() {
        return Err(null_pointer(what));
    }
    Shape::new(unsafe { core::slice::from_raw_parts(dims, rank) })
}

fn ignore(index: i32) -> Option<i32> {
    (index != i32::MIN).then_some(index)
}

unsafe fn fill<T: Scalar>(value: T, dst: *mut T, stride: usize, len: usize) -> Result<()> {
    dispatch::fill(value, unsafe { strided_output("dst", dst, stride, len)? });
    Ok(())
}

unsafe fn ramp<T: Scalar>(start: T, increment: T, dst: *mut T, stride: usize, len: usize) -> Result<()> {
    dispatch::ramp(start, increment, unsafe { strided_output("dst", dst, stride, len)? });
    Ok(())
}

unsafe fn unary<T: Scalar>(op: UnaryOp, src: *const T, src_stride: usize, dst: *mut T, dst_stride: usize, len: usize) -> Result<()> {
    let out = byte_range(dst, span_len("dst", dst_stride, len)?);
    let mut scratch = Vec::new();
    let src = unsafe { strided_input("src", src, src_stride, len, &out, &mut scratch)? };
    dispatch::unary(op, src, unsafe { strided_output("dst", dst, dst_stride, len)? })
}

unsafe fn float_unary<T: Float>(
    op: FloatOp,
    src: *const T,
    src_stride: usize,
    dst: *mut T,
    dst_stride: usize,
    len: usize,
) -> Result<()> {
    let out = byte_range(dst, span_len("dst", dst_stride, len)?);
    let mut scratch = Vec::new();
    let src = unsafe { strided_input("src", src, src_stride, len, &out, &mut scratch)? };
    dispatch::float_unary(op, src, unsafe { strided_output("dst", dst, dst_stride, len)? })
}

#[allow(clippy::too_many_arguments)]
unsafe fn copysign<T: Float>(
    magnitude: *const T,
    magnitude_stride: usize,
    sign: *const T,
    sign_stride: usize,
    dst: *mut T,
    dst_stride: usize,
    len: usize,
) -> Result<()> {
    let out = byte_range(dst, span_len("dst", dst_stride, len)?);
    let (mut s1, mut s2) = (Vec::new(), Vec::new());
    let magnitude = unsafe { strided_input("magnitude", magnitude, magnitude_stride, len, &out, &mut s1)? };
    let sign = unsafe { strided_input("sign", sign, sign_stride, len, &out, &mut s2)? };
    dispatch::copysign(magnitude, sign, unsafe { strided_output("dst", dst, dst_stride, len)? })
}

#[allow(clippy::too_many_arguments)]
unsafe fn binary_vv<T: Scalar>(
    op: BinaryOp,
    lhs: *const T,
    lhs_stride: usize,
    rhs: *const T,
    rhs_stride: usize,
    dst: *mut T,
    dst_stride: usize,
    len: usize,
) -> Result<()> {
    let out = byte_range(dst, span_len("dst", dst_stride, len)?);
    let (mut s1, mut s2) = (Vec::new(), Vec::new());
    let lhs = unsafe { strided_input("lhs", lhs, lhs_stride, len, &out, &mut s1)? };
    let rhs = unsafe { strided_input("rhs", rhs, rhs_stride, len, &out, &mut s2)? };
    dispatch::binary(op, lhs, rhs, unsafe { strided_output("dst", dst, dst_stride, len)? })
}

unsafe fn binary_vs<T: Scalar>(
    op: BinaryOp,
    lhs: *const T,
    lhs_stride: usize,
    scalar: T,
    dst: *mut T,
    dst_stride: usize,
    len: usize,
) -> Result<()> {
    let out = byte_range(dst, span_len("dst", dst_stride, len)?);
    let mut scratch = Vec::new();
    let lhs = unsafe { strided_input("lhs", lhs, lhs_stride, len, &out, &mut scratch)? };
    dispatch::binary_scalar(op, lhs, scalar, unsafe { strided_output("dst", dst, dst_stride, len)? })
}

unsafe fn binary_sv<T: Scalar>(
    op: BinaryOp,
    scalar: T,
    rhs: *const T,
    rhs_stride: usize,
    dst: *mut T,
    dst_stride: usize,
    len: usize,
) -> Result<()> {
    let out = byte_range(dst, span_len("dst", dst_stride, len)?);
    let mut scratch = Vec::new();
    let rhs = unsafe { strided_input("rhs", rhs, rhs_stride, len, &out, &mut scratch)? };
    dispatch::binary_scalar_reversed(op, scalar, rhs, unsafe { strided_output("dst", dst, dst_stride, len)? })
}

unsafe fn threshold<T: Scalar>(
    src: *const T,
    src_stride: usize,
    thresh: T,
    dst: *mut T,
    dst_stride: usize,
    len: usize,
) -> Result<()> {
    let out = byte_range(dst, span_len("dst", dst_stride, len)?);
    let mut scratch = Vec::new();
    let src = unsafe { strided_input("src", src, src_stride, len, &out, &mut scratch)? };
    dispatch::threshold(src, thresh, unsafe { strided_output("dst", dst, dst_stride, len)? })
}

unsafe fn sum<T: Scalar>(src: *const T, stride: usize, len: usize, out: *mut T) -> Result<()> {
    let mut scratch = Vec::new();
    let src = unsafe { strided_input("src", src, stride, len, &(0..0), &mut scratch)? };
    unsafe { store("out", out, dispatch::sum(src)) }
}

unsafe fn dot<T: Scalar>(
    lhs: *const T,
    lhs_stride: usize,
    rhs: *const T,
    rhs_stride: usize,
    len: usize,
    out: *mut T,
) -> Result<()> {
    let (mut s1, mut s2) = (Vec::new(), Vec::new());
    let lhs = unsafe { strided_input("lhs", lhs, lhs_stride, len, &(0..0), &mut s1)? };
    let rhs = unsafe { strided_input("rhs", rhs, rhs_stride, len, &(0..0), &mut s2)? };
    unsafe { store("out", out, dispatch::dot(lhs, rhs)?) }
}

/// Writes the selected value and index; an empty input stores index
/// `usize::MAX` and leaves `value` untouched.
unsafe fn select_index<T: Scalar>(
    max: bool,
    src: *const T,
    stride: usize,
    len: usize,
    value: *mut T,
    index: *mut usize,
) -> Result<()> {
    let mut scratch = Vec::new();
    let src = unsafe { strided_input("src", src, stride, len, &(0..0), &mut scratch)? };
    let found = if max { dispatch::max_index(src) } else { dispatch::min_index(src) };
    match found {
        Some((v, i)) => unsafe {
            store("value", value, v)?;
            store("index", index, i)
        },
        None => unsafe { store("index", index, usize::MAX) },
    }
}

unsafe fn copy_strided<T: Scalar>(src: *const T, src_stride: usize, dst: *mut T, dst_stride: usize, len: usize) -> Result<()> {
    let out = byte_range(dst, span_len("dst", dst_stride, len)?);
    let mut scratch = Vec::new();
    let src = unsafe { strided_input("src", src, src_stride, len, &out, &mut scratch)? };
    dispatch::copy_strided(src, unsafe { strided_output("dst", dst, dst_stride, len)? })
}

unsafe fn transpose<T: Scalar>(src: *const T, dst: *mut T, cols: usize, rows: usize) -> Result<()> {
    let count = cols
        .checked_mul(rows)
        .ok_or_else(|| KernelError::Configuration("transpose extent overflows".into()))?;
    let out = byte_range(dst, count);
    let mut scratch = Vec::new();
    let src = unsafe { input("src", src, count, &out, &mut scratch)? };
    dispatch::transpose(src, unsafe { output("dst", dst, count)? }, cols, rows)
}

/// Numeric GEMM arguments as passed across the ABI.
struct GemmArgs<T> {
    order: i32,
    trans_a: i32,
    trans_b: i32,
    m: usize,
    n: usize,
    k: usize,
    alpha: T,
    lda: usize,
    ldb: usize,
    beta: T,
    ldc: usize,
}

fn transpose_flag(what: &'static str, flag: i32) -> Result<Transpose> {
    match flag {
        0 => Ok(Transpose::NoTrans),
        1 => Ok(Transpose::Trans),
        other => Err(KernelError::Configuration(format!("{what} must be 0 or 1, got {other}"))),
    }
}

impl<T: Scalar> GemmArgs<T> {
    fn config(&self) -> Result<GemmConfig<T>> {
        let order = match self.order {
            0 => Order::RowMajor,
            1 => Order::ColMajor,
            other => return Err(KernelError::Configuration(format!("order must be 0 or 1, got {other}"))),
        };
        Ok(GemmConfig::new(self.m, self.n, self.k)
            .order(order)
            .trans_a(transpose_flag("trans_a", self.trans_a)?)
            .trans_b(transpose_flag("trans_b", self.trans_b)?)
            .alpha(self.alpha)
            .beta(self.beta)
            .leading_dims(self.lda, self.ldb, self.ldc))
    }
}

unsafe fn gemm<T: Scalar>(args: GemmArgs<T>, a: *const T, b: *const T, c: *mut T) -> Result<()> {
    let cfg = args.config()?;
    let (a_rows, a_cols) = cfg.a_dims();
    let (b_rows, b_cols) = cfg.b_dims();
    let c_len = matrix_len(cfg.m, cfg.n, cfg.ldc);
    let out = byte_range(c, c_len);
    let (mut s1, mut s2) = (Vec::new(), Vec::new());
    let a = unsafe { input("a", a, matrix_len(a_rows, a_cols, cfg.lda), &out, &mut s1)? };
    let b = unsafe { input("b", b, matrix_len(b_rows, b_cols, cfg.ldb), &out, &mut s2)? };
    dispatch::gemm(&cfg, a, b, unsafe { output("c", c, c_len)? })
}

unsafe fn gather<T: Scalar>(
    src: *const T,
    dims: *const usize,
    rank: usize,
    context: *const i32,
    dst: *mut T,
    axis: usize,
    ignore_index: i32,
) -> Result<()> {
    let shape = shape_from("dims", dims, rank)?;
    let reduced = shape.remove_axis(axis)?.count();
    let out = byte_range(dst, reduced);
    let (mut s1, mut s2) = (Vec::new(), Vec::new());
    let src = unsafe { input("src", src, shape.count(), &out, &mut s1)? };
    let context = unsafe { input("context", context, reduced, &out, &mut s2)? };
    dispatch::gather(src, &shape, context, unsafe { output("dst", dst, reduced)? }, axis, ignore(ignore_index))
}

unsafe fn scatter<T: Scalar>(
    src: *const T,
    context: *const i32,
    dst: *mut T,
    dims: *const usize,
    rank: usize,
    axis: usize,
    ignore_index: i32,
) -> Result<()> {
    let shape = shape_from("dims", dims, rank)?;
    let reduced = shape.remove_axis(axis)?.count();
    let out = byte_range(dst, shape.count());
    let (mut s1, mut s2) = (Vec::new(), Vec::new());
    let src = unsafe { input("src", src, reduced, &out, &mut s1)? };
    let context = unsafe { input("context", context, reduced, &out, &mut s2)? };
    dispatch::scatter(src, context, unsafe { output("dst", dst, shape.count())? }, &shape, axis, ignore(ignore_index))
}

/// im2col geometry as passed across the ABI.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HalImg2ColSetup {
    pub batch_size: i32,
    pub channels: i32,
    pub height: i32,
    pub width: i32,
    pub kernel_height: i32,
    pub kernel_width: i32,
    pub padding: i32,
    pub stride: i32,
}

impl TryFrom<HalImg2ColSetup> for Img2ColSetup {
    type Error = KernelError;

    fn try_from(raw: HalImg2ColSetup) -> Result<Self> {
        let field = |v: i32| usize::try_from(v).map_err(|_| KernelError::InvalidSetup("negative extent"));
        let setup = Img2ColSetup {
            batch_size: field(raw.batch_size)?,
            channels: field(raw.channels)?,
            height: field(raw.height)?,
            width: field(raw.width)?,
            kernel_height: field(raw.kernel_height)?,
            kernel_width: field(raw.kernel_width)?,
            padding: field(raw.padding)?,
            stride: field(raw.stride)?,
        };
        setup.check()?;
        Ok(setup)
    }
}

unsafe fn img2col<T: Scalar>(setup: *const HalImg2ColSetup, src: *const T, dst: *mut T, forward: bool) -> Result<()> {
    if setup.is_null() {
        return Err(null_pointer("setup"));
    }
    let setup = Img2ColSetup::try_from(unsafe { setup.read() })?;
    let (src_len, dst_len) = if forward {
        (setup.image_len(), setup.columns_len())
    } else {
        (setup.columns_len(), setup.image_len())
    };
    let out = byte_range(dst, dst_len);
    let mut scratch = Vec::new();
    let src = unsafe { input("src", src, src_len, &out, &mut scratch)? };
    let dst = unsafe { output("dst", dst, dst_len)? };
    if forward { dispatch::img2col(&setup, src, dst) } else { dispatch::col2img(&setup, src, dst) }
}

macro_rules! unary_abi {
    ($t:ty, $op:expr, $name:ident) => {
        /// # Safety
        ///
        /// See the [module documentation](self).
        #[unsafe(no_mangle)]
        pub unsafe extern "C" fn $name(src: *const $t, src_stride: usize, dst: *mut $t, dst_stride: usize, len: usize) -> i32 {
            status(stringify!($name), unsafe { unary($op, src, src_stride, dst, dst_stride, len) })
        }
    };
}

macro_rules! float_abi {
    ($t:ty, $op:expr, $name:ident) => {
        /// # Safety
        ///
        /// See the [module documentation](self).
        #[unsafe(no_mangle)]
        pub unsafe extern "C" fn $name(src: *const $t, src_stride: usize, dst: *mut $t, dst_stride: usize, len: usize) -> i32 {
            status(stringify!($name), unsafe { float_unary($op, src, src_stride, dst, dst_stride, len) })
        }
    };
}

macro_rules! binary_abi {
    ($t:ty, $op:expr, $vv:ident, $vs:ident, $sv:ident) => {
        /// # Safety
        ///
        /// See the [module documentation](self).
        #[unsafe(no_mangle)]
        pub unsafe extern "C" fn $vv(
            lhs: *const $t,
            lhs_stride: usize,
            rhs: *const $t,
            rhs_stride: usize,
            dst: *mut $t,
            dst_stride: usize,
            len: usize,
        ) -> i32 {
            status(stringify!($vv), unsafe { binary_vv($op, lhs, lhs_stride, rhs, rhs_stride, dst, dst_stride, len) })
        }

        /// # Safety
        ///
        /// See the [module documentation](self).
        #[unsafe(no_mangle)]
        pub unsafe extern "C" fn $vs(lhs: *const $t, lhs_stride: usize, scalar: $t, dst: *mut $t, dst_stride: usize, len: usize) -> i32 {
            status(stringify!($vs), unsafe { binary_vs($op, lhs, lhs_stride, scalar, dst, dst_stride, len) })
        }

        /// # Safety
        ///
        /// See the [module documentation](self).
        #[unsafe(no_mangle)]
        pub unsafe extern "C" fn $sv(scalar: $t, rhs: *const $t, rhs_stride: usize, dst: *mut $t, dst_stride: usize, len: usize) -> i32 {
            status(stringify!($sv), unsafe { binary_sv($op, scalar, rhs, rhs_stride, dst, dst_stride, len) })
        }
    };
}

/// Operations shared by every scalar kind.
macro_rules! kind_abi {
    ($t:ty {
        fill: $fill:ident,
        ramp: $ramp:ident,
        threshold: $threshold:ident,
        sum: $sum:ident,
        dot: $dot:ident,
        maxi: $maxi:ident,
        mini: $mini:ident,
        copy_strided: $copy:ident,
        transpose: $transpose:ident,
        gemm: $gemm:ident,
        gather: $gather:ident,
        scatter: $scatter:ident,
        img2col: $img2col:ident,
        col2img: $col2img:ident $(,)?
    }) => {
        /// # Safety
        ///
        /// See the [module documentation](self).
        #[unsafe(no_mangle)]
        pub unsafe extern "C" fn $fill(value: $t, dst: *mut $t, stride: usize, len: usize) -> i32 {
            status(stringify!($fill), unsafe { fill(value, dst, stride, len) })
        }

        /// # Safety
        ///
        /// See the [module documentation](self).
        #[unsafe(no_mangle)]
        pub unsafe extern "C" fn $ramp(start: $t, increment: $t, dst: *mut $t, stride: usize, len: usize) -> i32 {
            status(stringify!($ramp), unsafe { ramp(start, increment, dst, stride, len) })
        }

        /// # Safety
        ///
        /// See the [module documentation](self).
        #[unsafe(no_mangle)]
        pub unsafe extern "C" fn $threshold(
            src: *const $t,
            src_stride: usize,
            thresh: $t,
            dst: *mut $t,
            dst_stride: usize,
            len: usize,
        ) -> i32 {
            status(stringify!($threshold), unsafe { threshold(src, src_stride, thresh, dst, dst_stride, len) })
        }

        /// # Safety
        ///
        /// See the [module documentation](self).
        #[unsafe(no_mangle)]
        pub unsafe extern "C" fn $sum(src: *const $t, stride: usize, len: usize, out: *mut $t) -> i32 {
            status(stringify!($sum), unsafe { sum(src, stride, len, out) })
        }

        /// # Safety
        ///
        /// See the [module documentation](self).
        #[unsafe(no_mangle)]
        pub unsafe extern "C" fn $dot(
            lhs: *const $t,
            lhs_stride: usize,
            rhs: *const $t,
            rhs_stride: usize,
            len: usize,
            out: *mut $t,
        ) -> i32 {
            status(stringify!($dot), unsafe { dot(lhs, lhs_stride, rhs, rhs_stride, len, out) })
        }

        /// # Safety
        ///
        /// See the [module documentation](self).
        #[unsafe(no_mangle)]
        pub unsafe extern "C" fn $maxi(src: *const $t, stride: usize, len: usize, value: *mut $t, index: *mut usize) -> i32 {
            status(stringify!($maxi), unsafe { select_index(true, src, stride, len, value, index) })
        }

        /// # Safety
        ///
        /// See the [module documentation](self).
        #[unsafe(no_mangle)]
        pub unsafe extern "C" fn $mini(src: *const $t, stride: usize, len: usize, value: *mut $t, index: *mut usize) -> i32 {
            status(stringify!($mini), unsafe { select_index(false, src, stride, len, value, index) })
        }

        /// # Safety
        ///
        /// See the [module documentation](self).
        #[unsafe(no_mangle)]
        pub unsafe extern "C" fn $copy(src: *const $t, src_stride: usize, dst: *mut $t, dst_stride: usize, len: usize) -> i32 {
            status(stringify!($copy), unsafe { copy_strided(src, src_stride, dst, dst_stride, len) })
        }

        /// # Safety
        ///
        /// See the [module documentation](self).
        #[unsafe(no_mangle)]
        pub unsafe extern "C" fn $transpose(src: *const $t, dst: *mut $t, cols: usize, rows: usize) -> i32 {
            status(stringify!($transpose), unsafe { transpose(src, dst, cols, rows) })
        }

        /// BLAS-style GEMM. `order`: 0 row-major, 1 column-major (rejected);
        /// `trans_a`/`trans_b`: 0 or 1.
        ///
        /// # Safety
        ///
        /// See the [module documentation](self).
        #[unsafe(no_mangle)]
        #[allow(clippy::too_many_arguments)]
        pub unsafe extern "C" fn $gemm(
            order: i32,
            trans_a: i32,
            trans_b: i32,
            m: usize,
            n: usize,
            k: usize,
            alpha: $t,
            a: *const $t,
            lda: usize,
            b: *const $t,
            ldb: usize,
            beta: $t,
            c: *mut $t,
            ldc: usize,
        ) -> i32 {
            let args = GemmArgs { order, trans_a, trans_b, m, n, k, alpha, lda, ldb, beta, ldc };
            status(stringify!($gemm), unsafe { gemm(args, a, b, c) })
        }

        /// Gathers along `axis`; pass `i32::MIN` as `ignore_index` to disable it.
        ///
        /// # Safety
        ///
        /// See the [module documentation](self).
        #[unsafe(no_mangle)]
        pub unsafe extern "C" fn $gather(
            src: *const $t,
            dims: *const usize,
            rank: usize,
            context: *const i32,
            dst: *mut $t,
            axis: usize,
            ignore_index: i32,
        ) -> i32 {
            status(stringify!($gather), unsafe { gather(src, dims, rank, context, dst, axis, ignore_index) })
        }

        /// Scatters along `axis` into `dst` (shape `dims`); pass `i32::MIN`
        /// as `ignore_index` to disable it.
        ///
        /// # Safety
        ///
        /// See the [module documentation](self).
        #[unsafe(no_mangle)]
        pub unsafe extern "C" fn $scatter(
            src: *const $t,
            context: *const i32,
            dst: *mut $t,
            dims: *const usize,
            rank: usize,
            axis: usize,
            ignore_index: i32,
        ) -> i32 {
            status(stringify!($scatter), unsafe { scatter(src, context, dst, dims, rank, axis, ignore_index) })
        }

        /// # Safety
        ///
        /// See the [module documentation](self).
        #[unsafe(no_mangle)]
        pub unsafe extern "C" fn $img2col(setup: *const HalImg2ColSetup, src: *const $t, dst: *mut $t) -> i32 {
            status(stringify!($img2col), unsafe { img2col(setup, src, dst, true) })
        }

        /// # Safety
        ///
        /// See the [module documentation](self).
        #[unsafe(no_mangle)]
        pub unsafe extern "C" fn $col2img(setup: *const HalImg2ColSetup, src: *const $t, dst: *mut $t) -> i32 {
            status(stringify!($col2img), unsafe { img2col(setup, src, dst, false) })
        }
    };
}

kind_abi!(f32 {
    fill: hal_sfill,
    ramp: hal_sramp,
    threshold: hal_sthreshold,
    sum: hal_ssum,
    dot: hal_sdot,
    maxi: hal_smaxi,
    mini: hal_smini,
    copy_strided: hal_scopy_strided,
    transpose: hal_stranspose,
    gemm: hal_sgemm,
    gather: hal_sgather,
    scatter: hal_sscatter,
    img2col: hal_simg2col,
    col2img: hal_scol2img,
});

kind_abi!(f64 {
    fill: hal_dfill,
    ramp: hal_dramp,
    threshold: hal_dthreshold,
    sum: hal_dsum,
    dot: hal_ddot,
    maxi: hal_dmaxi,
    mini: hal_dmini,
    copy_strided: hal_dcopy_strided,
    transpose: hal_dtranspose,
    gemm: hal_dgemm,
    gather: hal_dgather,
    scatter: hal_dscatter,
    img2col: hal_dimg2col,
    col2img: hal_dcol2img,
});

kind_abi!(i32 {
    fill: hal_ifill,
    ramp: hal_iramp,
    threshold: hal_ithreshold,
    sum: hal_isum,
    dot: hal_idot,
    maxi: hal_imaxi,
    mini: hal_imini,
    copy_strided: hal_icopy_strided,
    transpose: hal_itranspose,
    gemm: hal_igemm,
    gather: hal_igather,
    scatter: hal_iscatter,
    img2col: hal_iimg2col,
    col2img: hal_icol2img,
});

binary_abi!(f32, BinaryOp::Add, hal_sadd_vv, hal_sadd_vs, hal_sadd_sv);
binary_abi!(f32, BinaryOp::Sub, hal_ssub_vv, hal_ssub_vs, hal_ssub_sv);
binary_abi!(f32, BinaryOp::Mul, hal_smul_vv, hal_smul_vs, hal_smul_sv);
binary_abi!(f32, BinaryOp::Div, hal_sdiv_vv, hal_sdiv_vs, hal_sdiv_sv);
binary_abi!(f32, BinaryOp::Max, hal_smax_vv, hal_smax_vs, hal_smax_sv);
binary_abi!(f32, BinaryOp::Min, hal_smin_vv, hal_smin_vs, hal_smin_sv);

binary_abi!(f64, BinaryOp::Add, hal_dadd_vv, hal_dadd_vs, hal_dadd_sv);
binary_abi!(f64, BinaryOp::Sub, hal_dsub_vv, hal_dsub_vs, hal_dsub_sv);
binary_abi!(f64, BinaryOp::Mul, hal_dmul_vv, hal_dmul_vs, hal_dmul_sv);
binary_abi!(f64, BinaryOp::Div, hal_ddiv_vv, hal_ddiv_vs, hal_ddiv_sv);
binary_abi!(f64, BinaryOp::Max, hal_dmax_vv, hal_dmax_vs, hal_dmax_sv);
binary_abi!(f64, BinaryOp::Min, hal_dmin_vv, hal_dmin_vs, hal_dmin_sv);

binary_abi!(i32, BinaryOp::Add, hal_iadd_vv, hal_iadd_vs, hal_iadd_sv);
binary_abi!(i32, BinaryOp::Sub, hal_isub_vv, hal_isub_vs, hal_isub_sv);
binary_abi!(i32, BinaryOp::Mul, hal_imul_vv, hal_imul_vs, hal_imul_sv);
// A zero divisor returns status -11 without writing.
binary_abi!(i32, BinaryOp::Div, hal_idiv_vv, hal_idiv_vs, hal_idiv_sv);
binary_abi!(i32, BinaryOp::Max, hal_imax_vv, hal_imax_vs, hal_imax_sv);
binary_abi!(i32, BinaryOp::Min, hal_imin_vv, hal_imin_vs, hal_imin_sv);

unary_abi!(f32, UnaryOp::Negate, hal_sneg);
unary_abi!(f32, UnaryOp::Square, hal_ssquare);
unary_abi!(f32, UnaryOp::Heaviside, hal_sheaviside);
unary_abi!(f32, UnaryOp::Relu, hal_srelu);
unary_abi!(f64, UnaryOp::Negate, hal_dneg);
unary_abi!(f64, UnaryOp::Square, hal_dsquare);
unary_abi!(f64, UnaryOp::Heaviside, hal_dheaviside);
unary_abi!(f64, UnaryOp::Relu, hal_drelu);
unary_abi!(i32, UnaryOp::Negate, hal_ineg);
unary_abi!(i32, UnaryOp::Square, hal_isquare);
unary_abi!(i32, UnaryOp::Heaviside, hal_iheaviside);
unary_abi!(i32, UnaryOp::Relu, hal_irelu);

float_abi!(f32, FloatOp::Sqrt, hal_ssqrt);
float_abi!(f32, FloatOp::Exp, hal_sexp);
float_abi!(f32, FloatOp::Log, hal_slog);
float_abi!(f32, FloatOp::Sin, hal_ssin);
float_abi!(f32, FloatOp::Cos, hal_scos);
float_abi!(f32, FloatOp::Tan, hal_stan);
float_abi!(f32, FloatOp::Tanh, hal_stanh);
float_abi!(f64, FloatOp::Sqrt, hal_dsqrt);
float_abi!(f64, FloatOp::Exp, hal_dexp);
float_abi!(f64, FloatOp::Log, hal_dlog);
float_abi!(f64, FloatOp::Sin, hal_dsin);
float_abi!(f64, FloatOp::Cos, hal_dcos);
float_abi!(f64, FloatOp::Tan, hal_dtan);
float_abi!(f64, FloatOp::Tanh, hal_dtanh);

/// # Safety
///
/// See the [module documentation](self).
#[unsafe(no_mangle)]
pub unsafe extern "C" fn hal_scopysign(
    magnitude: *const f32,
    magnitude_stride: usize,
    sign: *const f32,
    sign_stride: usize,
    dst: *mut f32,
    dst_stride: usize,
    len: usize,
) -> i32 {
    status("hal_scopysign", unsafe {
        copysign(magnitude, magnitude_stride, sign, sign_stride, dst, dst_stride, len)
    })
}

/// # Safety
///
/// See the [module documentation](self).
#[unsafe(no_mangle)]
pub unsafe extern "C" fn hal_dcopysign(
    magnitude: *const f64,
    magnitude_stride: usize,
    sign: *const f64,
    sign_stride: usize,
    dst: *mut f64,
    dst_stride: usize,
    len: usize,
) -> i32 {
    status("hal_dcopysign", unsafe {
        copysign(magnitude, magnitude_stride, sign, sign_stride, dst, dst_stride, len)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overlap_detection() {
        assert!(overlaps(&(0..8), &(4..12)));
        assert!(!overlaps(&(0..8), &(8..12)));
        assert!(!overlaps(&(0..0), &(0..8)));
    }

    #[test]
    fn setup_conversion_rejects_negative_fields() {
        let raw = HalImg2ColSetup {
            batch_size: 1,
            channels: 1,
            height: 3,
            width: 3,
            kernel_height: 2,
            kernel_width: 2,
            padding: -1,
            stride: 1,
        };
        assert_eq!(Img2ColSetup::try_from(raw), Err(KernelError::InvalidSetup("negative extent")));
        let ok = Img2ColSetup::try_from(HalImg2ColSetup { padding: 0, ..raw }).unwrap();
        assert_eq!(ok.columns_len(), 16);
    }
}
