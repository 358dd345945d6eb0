use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{Lz4wError, Lz4wResult};
use crate::types::{ContentSizeMode, FrameOptions, LogFormat};

/// Default upper bound for a single stdin read: 512KB
pub const DEFAULT_MAX_READ: usize = 512 * 1024;

/// Top-level configuration (loaded from lz4writer.toml)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Lz4wConfig {
    pub frame: FrameConfig,
    pub input: InputConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameConfig {
    /// Compression level (default: 1)
    pub level: u32,
    /// Append a whole-content checksum (default: false)
    pub content_checksum: bool,
    /// Content size field: "auto", "always", or "never"
    pub content_size: ContentSizeMode,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    /// Largest read issued against stdin (default: 512KB)
    pub max_read: usize,
    /// Pick a random read size in 1..=max_read for every read
    pub randomize: bool,
    /// Seed for the read size generator (random when unset)
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Log level (default: warn)
    pub level: String,
    /// Log format: "json" or "text"
    pub format: LogFormat,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            level: 1,
            content_checksum: false,
            content_size: ContentSizeMode::Auto,
        }
    }
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            max_read: DEFAULT_MAX_READ,
            randomize: true,
            seed: None,
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "warn".into(),
            format: LogFormat::Text,
        }
    }
}

impl FrameConfig {
    pub fn options(&self) -> FrameOptions {
        FrameOptions {
            level: self.level,
            content_checksum: self.content_checksum,
        }
    }
}

impl Lz4wConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml(content: &str) -> Lz4wResult<Self> {
        let config: Self =
            toml::from_str(content).map_err(|e| Lz4wError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path`, falling back to defaults when the file is absent.
    pub fn load(path: &Path) -> Lz4wResult<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "config file not found, using defaults");
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| Lz4wError::Config(format!("parsing {}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Lz4wResult<()> {
        if self.input.max_read == 0 {
            return Err(Lz4wError::Config("input.max_read must be at least 1".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_full_config() {
        let toml_str = r#"
[frame]
level = 9
content_checksum = true
content_size = "never"

[input]
max_read = 4096
randomize = false
seed = 42

[log]
level = "debug"
format = "json"
"#;
        let config = Lz4wConfig::from_toml(toml_str).unwrap();

        assert_eq!(config.frame.level, 9);
        assert!(config.frame.content_checksum);
        assert_eq!(config.frame.content_size, ContentSizeMode::Never);
        assert_eq!(config.input.max_read, 4096);
        assert!(!config.input.randomize);
        assert_eq!(config.input.seed, Some(42));
        assert_eq!(config.log.level, "debug");
        assert_eq!(config.log.format, LogFormat::Json);
    }

    #[test]
    fn test_parse_defaults() {
        let config = Lz4wConfig::from_toml("").unwrap();

        assert_eq!(config.frame.level, 1);
        assert!(!config.frame.content_checksum);
        assert_eq!(config.frame.content_size, ContentSizeMode::Auto);
        assert_eq!(config.input.max_read, DEFAULT_MAX_READ);
        assert!(config.input.randomize);
        assert_eq!(config.input.seed, None);
        assert_eq!(config.log.level, "warn");
        assert_eq!(config.log.format, LogFormat::Text);
    }

    #[test]
    fn test_parse_partial_config() {
        let toml_str = r#"
[frame]
content_size = "always"
"#;
        let config = Lz4wConfig::from_toml(toml_str).unwrap();

        // Overridden
        assert_eq!(config.frame.content_size, ContentSizeMode::Always);
        // Defaults
        assert_eq!(config.frame.level, 1);
        assert_eq!(config.input.max_read, DEFAULT_MAX_READ);
    }

    #[test]
    fn test_rejects_zero_max_read() {
        let err = Lz4wConfig::from_toml("[input]\nmax_read = 0\n").unwrap_err();
        assert!(matches!(err, Lz4wError::Config(_)));
    }

    #[test]
    fn test_rejects_unknown_content_size_mode() {
        let err = Lz4wConfig::from_toml("[frame]\ncontent_size = \"sometimes\"\n").unwrap_err();
        assert!(matches!(err, Lz4wError::Config(_)));
    }

    #[test]
    fn test_serialize_roundtrip() {
        let config = Lz4wConfig::default();
        let toml_str = toml::to_string(&config).unwrap();
        let parsed = Lz4wConfig::from_toml(&toml_str).unwrap();

        assert_eq!(config.frame.level, parsed.frame.level);
        assert_eq!(config.frame.content_size, parsed.frame.content_size);
        assert_eq!(config.input.max_read, parsed.input.max_read);
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Lz4wConfig::load(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.frame.level, 1);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[frame]\nlevel = 4").unwrap();
        let config = Lz4wConfig::load(file.path()).unwrap();
        assert_eq!(config.frame.level, 4);
        assert_eq!(config.frame.options().level, 4);
    }

    #[test]
    fn test_load_unreadable_path_is_io_error() {
        // A directory exists but cannot be read as a file
        let dir = tempfile::tempdir().unwrap();
        let err = Lz4wConfig::load(dir.path()).unwrap_err();
        assert!(matches!(err, Lz4wError::Io(_)), "{err:?}");
    }
}
