//! Configuration types and defaults

use std::path::PathBuf;

/// Environment variable naming the studio directory URL
pub const DIRECTORY_URL_ENV: &str = "STREAMSIDE_DIRECTORY_URL";

/// Environment variable naming the media service WebSocket URL
pub const MEDIA_WS_URL_ENV: &str = "STREAMSIDE_MEDIA_WS_URL";

/// Global Streamside configuration
#[derive(Debug, Clone)]
pub struct GlobalConfig {
    /// Studio directory WebSocket URL
    pub directory_url: Option<String>,
    /// Media service WebSocket URL handed out with access tokens
    pub media_ws_url: Option<String>,
    /// Directory where buffered recordings land when no save target exists
    pub download_dir: PathBuf,
    /// Enable debug logging
    pub debug_logging: bool,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            directory_url: None,
            media_ws_url: None,
            download_dir: std::env::temp_dir(),
            debug_logging: false,
        }
    }
}

impl GlobalConfig {
    /// Build a configuration from the environment
    ///
    /// Missing variables leave the corresponding field unset; operations
    /// that need them fail with `MissingConfiguration` when used.
    pub fn from_env() -> Self {
        Self {
            directory_url: std::env::var(DIRECTORY_URL_ENV).ok(),
            media_ws_url: std::env::var(MEDIA_WS_URL_ENV).ok(),
            ..Self::default()
        }
    }

    /// Set the directory URL
    pub fn with_directory_url(mut self, url: impl Into<String>) -> Self {
        self.directory_url = Some(url.into());
        self
    }

    /// Set the download directory for buffered recordings
    pub fn with_download_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.download_dir = dir.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_no_urls() {
        let config = GlobalConfig::default();
        assert!(config.directory_url.is_none());
        assert!(config.media_ws_url.is_none());
        assert!(!config.debug_logging);
    }

    #[test]
    fn builder_style_setters_apply() {
        let config = GlobalConfig::default()
            .with_directory_url("ws://localhost:9000")
            .with_download_dir("/tmp/streamside");
        assert_eq!(config.directory_url.as_deref(), Some("ws://localhost:9000"));
        assert_eq!(config.download_dir, PathBuf::from("/tmp/streamside"));
    }
}
