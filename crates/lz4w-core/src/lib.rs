pub mod config;
pub mod error;
pub mod types;

pub use error::{ErrorRecord, FrameError, FrameResult, Lz4wError, Lz4wResult, PatchError};
pub use types::{ContentSizeMode, FrameOptions, LogFormat};
