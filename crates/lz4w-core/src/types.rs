use serde::{Deserialize, Serialize};

/// Engine options fixed at session open.
///
/// Whether the frame carries a content size is not an option here: it is
/// decided by the constructor, because it needs a repositionable channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameOptions {
    /// Compression level (0 = fast default, 3..=12 selects the HC compressor)
    pub level: u32,
    /// Append an XXH32 checksum of the whole content after the end mark
    pub content_checksum: bool,
}

impl Default for FrameOptions {
    fn default() -> Self {
        Self {
            level: 1,
            content_checksum: false,
        }
    }
}

/// When to record the content size in the frame header
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentSizeMode {
    /// Record it when the output supports position queries
    #[default]
    Auto,
    /// Always record it; opening fails on a non-seekable output
    Always,
    /// Never record it
    Never,
}

impl ContentSizeMode {
    /// Resolve the mode against the probed seekability of the output.
    pub fn wants_size(self, seekable: bool) -> bool {
        match self {
            Self::Auto => seekable,
            Self::Always => true,
            Self::Never => false,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auto_follows_seekability() {
        assert!(ContentSizeMode::Auto.wants_size(true));
        assert!(!ContentSizeMode::Auto.wants_size(false));
        assert!(ContentSizeMode::Always.wants_size(false));
        assert!(!ContentSizeMode::Never.wants_size(true));
    }
}
