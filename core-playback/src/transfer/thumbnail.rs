//! Best-effort thumbnail storage for completed transfers.
//!
//! Artwork is fetched in one request (no resume), decoded, shrunk to fit a
//! bounded square and re-encoded as JPEG.

use crate::error::{PlaybackError, Result};
use bridge_traits::{FileSystemAccess, HttpClient, HttpRequest};
use bytes::Bytes;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::DynamicImage;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

const THUMBNAIL_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone)]
pub struct ThumbnailFetcher {
    http: Arc<dyn HttpClient>,
    fs: Arc<dyn FileSystemAccess>,
    max_dimension: u32,
    quality: u8,
}

impl ThumbnailFetcher {
    pub fn new(
        http: Arc<dyn HttpClient>,
        fs: Arc<dyn FileSystemAccess>,
        max_dimension: u32,
        quality: u8,
    ) -> Self {
        Self {
            http,
            fs,
            max_dimension,
            quality,
        }
    }

    /// Download `url` and store it as a JPEG at `destination`.
    pub async fn fetch(&self, url: &str, destination: &Path) -> Result<PathBuf> {
        let response = self
            .http
            .execute(HttpRequest::get(url).timeout(THUMBNAIL_TIMEOUT))
            .await?;
        if !response.is_success() {
            return Err(PlaybackError::TransferHttpError {
                status: response.status,
            });
        }

        let jpeg = self.encode(&response.body)?;
        debug!(bytes = jpeg.len(), path = %destination.display(), "Storing thumbnail");
        self.fs.write_file(destination, jpeg).await?;
        Ok(destination.to_path_buf())
    }

    /// Decode, bound to `max_dimension` and re-encode as JPEG.
    pub fn encode(&self, data: &[u8]) -> Result<Bytes> {
        let img = image::load_from_memory(data)
            .map_err(|e| PlaybackError::Storage(format!("Failed to decode thumbnail: {}", e)))?;

        let img = if img.width() > self.max_dimension || img.height() > self.max_dimension {
            img.resize(self.max_dimension, self.max_dimension, FilterType::Lanczos3)
        } else {
            img
        };
        let rgb = DynamicImage::ImageRgb8(img.to_rgb8());

        let mut buffer = Vec::new();
        JpegEncoder::new_with_quality(&mut buffer, self.quality)
            .encode_image(&rgb)
            .map_err(|e| PlaybackError::Storage(format!("Failed to encode thumbnail: {}", e)))?;
        Ok(Bytes::from(buffer))
    }
}
