use std::io;
use thiserror::Error;

pub type FrameResult<T> = Result<T, FrameError>;

pub type Lz4wResult<T> = Result<T, Lz4wError>;

/// Failure of a frame session operation.
///
/// Every variant carries the name of the operation that failed so callers can
/// render it as an [`ErrorRecord`]. Any variant returned from a session
/// poisons it; only `close` is accepted afterwards.
#[derive(Debug, Error)]
pub enum FrameError {
    /// The output channel failed (interrupted writes are already retried).
    #[error("{op}: {source}")]
    Io {
        op: &'static str,
        #[source]
        source: io::Error,
    },

    /// The compress engine reported an error.
    #[error("{op}: {message}")]
    Engine { op: &'static str, message: String },

    /// The buffered header was not in the expected unpatched state.
    #[error("{op}: cannot fix lz4 frame header: {reason}")]
    HeaderFormat {
        op: &'static str,
        #[source]
        reason: PatchError,
    },

    /// A previous operation failed and the session was poisoned.
    #[error("{op}: previous write failed")]
    Poisoned { op: &'static str },
}

impl FrameError {
    pub fn io(op: &'static str, source: io::Error) -> Self {
        Self::Io { op, source }
    }

    pub fn engine(op: &'static str, message: impl Into<String>) -> Self {
        Self::Engine {
            op,
            message: message.into(),
        }
    }

    /// Name of the failing operation.
    pub fn op(&self) -> &'static str {
        match self {
            Self::Io { op, .. }
            | Self::Engine { op, .. }
            | Self::HeaderFormat { op, .. }
            | Self::Poisoned { op } => op,
        }
    }

    /// Human-readable message, without the operation prefix.
    pub fn message(&self) -> String {
        match self {
            Self::Io { source, .. } => source.to_string(),
            Self::Engine { message, .. } => message.clone(),
            Self::HeaderFormat { .. } => "cannot fix lz4 frame header".into(),
            Self::Poisoned { .. } => "previous write failed".into(),
        }
    }

    pub fn record(&self) -> ErrorRecord {
        ErrorRecord {
            op: self.op(),
            message: self.message(),
        }
    }
}

impl From<FrameError> for io::Error {
    fn from(err: FrameError) -> Self {
        match err {
            FrameError::Io { source, .. } => source,
            FrameError::HeaderFormat { .. } => io::Error::new(io::ErrorKind::InvalidData, err),
            other => io::Error::other(other),
        }
    }
}

/// The (operation, message) pair surfaced for every failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorRecord {
    pub op: &'static str,
    pub message: String,
}

impl ErrorRecord {
    /// Render as `func: op: message`, collapsing to `op: message` when the
    /// caller and the failing operation are the same.
    pub fn render(&self, func: &str) -> String {
        if func == self.op {
            format!("{}: {}", self.op, self.message)
        } else {
            format!("{}: {}: {}", func, self.op, self.message)
        }
    }
}

/// Header patch precondition violations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PatchError {
    #[error("bad magic number 0x{found:08x}")]
    BadMagic { found: u32 },

    #[error("content size flag already set")]
    ContentSizeAlreadySet,
}

/// Failure to load or validate the configuration.
#[derive(Debug, Error)]
pub enum Lz4wError {
    #[error("config error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}
