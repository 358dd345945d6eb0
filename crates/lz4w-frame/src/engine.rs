//! The compress engine seam and its liblz4 implementation
//!
//! A frame session only needs four things from a compressor: write a frame
//! header, compress one chunk, finish the frame, and say how large the
//! output of one chunk can get. `Lz4Engine` provides them over liblz4's
//! frame API (`LZ4F_*`), which is what makes the output readable by any
//! standard LZ4 decoder.

use std::ffi::CStr;
use std::fmt;
use std::ptr;

use lz4::liblz4::{
    BlockMode, BlockSize, ContentChecksum, LZ4FCompressionContext, LZ4FErrorCode,
    LZ4FPreferences, LZ4F_compressBegin, LZ4F_compressBound, LZ4F_compressEnd,
    LZ4F_compressUpdate, LZ4F_createCompressionContext, LZ4F_freeCompressionContext,
    LZ4F_getErrorName, LZ4F_isError, LZ4F_VERSION,
};
use lz4w_core::{FrameError, FrameOptions, FrameResult};

/// An incremental, framed compressor.
///
/// Every method writes into a caller-provided buffer and returns the number
/// of bytes produced. `update` may legitimately produce nothing while the
/// engine buffers a partial block.
pub trait CompressEngine {
    /// Write the frame header into `dst`, which holds at least
    /// [`HEADER_CAPACITY`](crate::header::HEADER_CAPACITY) bytes.
    fn begin(&mut self, dst: &mut [u8]) -> FrameResult<usize>;

    /// Compress `src`; `dst` holds at least `bound(src.len())` bytes.
    fn update(&mut self, src: &[u8], dst: &mut [u8]) -> FrameResult<usize>;

    /// Flush buffered input and write the end mark (plus content checksum).
    fn end(&mut self, dst: &mut [u8]) -> FrameResult<usize>;

    /// Worst-case output size of an `update` of `src_len` bytes, including
    /// whatever the engine may still have buffered.
    fn bound(&self, src_len: usize) -> usize;
}

/// liblz4 frame compressor with 256KB linked blocks.
pub struct Lz4Engine {
    ctx: Context,
    prefs: LZ4FPreferences,
    options: FrameOptions,
}

impl Lz4Engine {
    pub fn new(options: &FrameOptions) -> FrameResult<Self> {
        // All-zero preferences are liblz4's defaults; only override what we need.
        let mut prefs: LZ4FPreferences = unsafe { std::mem::zeroed() };
        prefs.frame_info.block_size_id = BlockSize::Max256KB;
        prefs.frame_info.block_mode = BlockMode::Linked;
        prefs.frame_info.content_checksum_flag = if options.content_checksum {
            ContentChecksum::ChecksumEnabled
        } else {
            ContentChecksum::NoChecksum
        };
        prefs.compression_level = options.level as _;

        Ok(Self {
            ctx: Context::create()?,
            prefs,
            options: *options,
        })
    }
}

impl fmt::Debug for Lz4Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lz4Engine")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl CompressEngine for Lz4Engine {
    fn begin(&mut self, dst: &mut [u8]) -> FrameResult<usize> {
        let code = unsafe {
            LZ4F_compressBegin(self.ctx.0, dst.as_mut_ptr(), dst.len(), &self.prefs)
        };
        check("LZ4F_compressBegin", code)
    }

    fn update(&mut self, src: &[u8], dst: &mut [u8]) -> FrameResult<usize> {
        let code = unsafe {
            LZ4F_compressUpdate(
                self.ctx.0,
                dst.as_mut_ptr(),
                dst.len(),
                src.as_ptr(),
                src.len(),
                ptr::null(),
            )
        };
        check("LZ4F_compressUpdate", code)
    }

    fn end(&mut self, dst: &mut [u8]) -> FrameResult<usize> {
        let code =
            unsafe { LZ4F_compressEnd(self.ctx.0, dst.as_mut_ptr(), dst.len(), ptr::null()) };
        check("LZ4F_compressEnd", code)
    }

    fn bound(&self, src_len: usize) -> usize {
        unsafe { LZ4F_compressBound(src_len, &self.prefs) }
    }
}

/// Owns an LZ4F compression context; freed on drop.
struct Context(LZ4FCompressionContext);

impl Context {
    fn create() -> FrameResult<Self> {
        let mut raw = LZ4FCompressionContext(ptr::null_mut());
        let code = unsafe { LZ4F_createCompressionContext(&mut raw, LZ4F_VERSION) };
        // Wrap before checking so a half-created context is still released.
        let ctx = Context(raw);
        check("LZ4F_createCompressionContext", code)?;
        Ok(ctx)
    }
}

impl Drop for Context {
    fn drop(&mut self) {
        if !self.0 .0.is_null() {
            unsafe {
                LZ4F_freeCompressionContext(self.0);
            }
        }
    }
}

fn check(op: &'static str, code: LZ4FErrorCode) -> FrameResult<usize> {
    if unsafe { LZ4F_isError(code) } != 0 {
        let name = unsafe { CStr::from_ptr(LZ4F_getErrorName(code)) };
        return Err(FrameError::engine(op, name.to_string_lossy()));
    }
    Ok(code)
}
