//! lz4w-frame: streaming LZ4 frame writer with a retroactive content size
//!
//! # Overview
//! - `retry`: full-range channel writes that survive interrupts and a single zero-progress write
//! - `hash`: XXH32 specialised to the 10-byte header checksum span
//! - `header`: frame header layout and the in-place content-size patch
//! - `engine`: the compress engine seam, backed by liblz4's frame API
//! - `writer`: the frame session tying the above together

pub mod engine;
pub mod hash;
pub mod header;
pub mod retry;
pub mod writer;

// Convenience re-exports for the most common operations
pub use engine::{CompressEngine, Lz4Engine};
pub use hash::hash10;
pub use header::{declared_content_size, patch_header, HEADER_CAPACITY, MAGIC};
pub use retry::RetryingWriter;
pub use writer::{FrameWriter, SessionState, CHUNK_SIZE};

pub use lz4w_core::{ErrorRecord, FrameError, FrameOptions, FrameResult, PatchError};
