//! Transfer manager configuration.

use std::time::Duration;

/// Hard ceiling on simultaneously running transfers.
pub const MAX_CONCURRENT_TRANSFERS: usize = 3;

#[derive(Debug, Clone)]
pub struct TransferConfig {
    /// Running jobs allowed at once, `1..=3` (default: 3)
    pub max_concurrent_transfers: usize,

    /// Audio directory, relative to the data directory
    pub downloads_directory: String,

    /// Thumbnail directory, relative to the data directory
    pub thumbnails_directory: String,

    /// Read buffer for streamed downloads (default: 64KB)
    pub buffer_size: usize,

    /// Longest edge of stored thumbnails in pixels (default: 544)
    pub thumbnail_max_dimension: u32,

    /// JPEG quality for stored thumbnails (default: 85)
    pub thumbnail_quality: u8,

    /// Whether to store a thumbnail next to completed audio (default: true)
    pub fetch_thumbnails: bool,

    /// Timeout applied to each transfer request (default: 300s)
    pub request_timeout: Duration,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            max_concurrent_transfers: MAX_CONCURRENT_TRANSFERS,
            downloads_directory: "downloads".to_string(),
            thumbnails_directory: "thumbnails".to_string(),
            buffer_size: 64 * 1024,
            thumbnail_max_dimension: 544,
            thumbnail_quality: 85,
            fetch_thumbnails: true,
            request_timeout: Duration::from_secs(300),
        }
    }
}

impl TransferConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_concurrent_transfers(mut self, count: usize) -> Self {
        self.max_concurrent_transfers = count;
        self
    }

    pub fn with_downloads_directory(mut self, dir: impl Into<String>) -> Self {
        self.downloads_directory = dir.into();
        self
    }

    pub fn with_thumbnails_directory(mut self, dir: impl Into<String>) -> Self {
        self.thumbnails_directory = dir.into();
        self
    }

    pub fn with_buffer_size(mut self, bytes: usize) -> Self {
        self.buffer_size = bytes;
        self
    }

    pub fn with_thumbnails(mut self, enabled: bool) -> Self {
        self.fetch_thumbnails = enabled;
        self
    }

    pub fn with_thumbnail_max_dimension(mut self, pixels: u32) -> Self {
        self.thumbnail_max_dimension = pixels;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_concurrent_transfers == 0 || self.max_concurrent_transfers > MAX_CONCURRENT_TRANSFERS {
            return Err(format!(
                "max_concurrent_transfers must be between 1 and {}",
                MAX_CONCURRENT_TRANSFERS
            ));
        }

        if self.downloads_directory.is_empty() {
            return Err("downloads_directory cannot be empty".to_string());
        }

        if self.thumbnails_directory.is_empty() {
            return Err("thumbnails_directory cannot be empty".to_string());
        }

        if self.buffer_size == 0 {
            return Err("buffer_size must be greater than 0".to_string());
        }

        if self.thumbnail_max_dimension == 0 {
            return Err("thumbnail_max_dimension must be greater than 0".to_string());
        }

        if self.thumbnail_quality == 0 || self.thumbnail_quality > 100 {
            return Err("thumbnail_quality must be between 1 and 100".to_string());
        }

        Ok(())
    }
}
