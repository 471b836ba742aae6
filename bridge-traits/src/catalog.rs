//! Remote Catalog Abstraction
//!
//! The remote catalog is reached through an undocumented HTTP/JSON API whose
//! transport, request signing and client identity are owned by the host. The
//! core only consumes two calls: the candidate encodings for a track and the
//! "related items" document used to build an up-next queue.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::Result;

/// One encoding offered by the catalog for a track.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawFormat {
    /// Numeric format tag (itag)
    pub itag: u32,
    /// Signed source URL; absent when the catalog requires deciphering the host did not perform
    pub url: Option<String>,
    /// MIME type including the codec parameter, e.g. `audio/webm; codecs="opus"`
    pub mime_type: String,
    /// Declared bitrate in bits per second
    pub bitrate: u64,
    /// Declared byte length
    pub content_length: Option<u64>,
    /// Video width; absent for audio-only encodings
    pub width: Option<u32>,
}

impl RawFormat {
    pub fn is_audio_only(&self) -> bool {
        self.width.is_none()
    }
}

/// Address of a related-items lookup.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RelatedItemsQuery {
    /// Related items for a single seed track.
    Track(String),
    /// Related items of a container (playlist/radio) id mined from a previous lookup.
    Container(String),
}

impl fmt::Display for RelatedItemsQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RelatedItemsQuery::Track(id) => write!(f, "track:{}", id),
            RelatedItemsQuery::Container(id) => write!(f, "container:{}", id),
        }
    }
}

/// Catalog client trait
///
/// Implementations return the catalog document as loosely-typed JSON; the core
/// walks it tolerantly and never assumes a fixed schema.
#[async_trait]
pub trait CatalogClient: Send + Sync {
    /// Candidate encodings for `track_id`.
    async fn fetch_stream_formats(&self, track_id: &str) -> Result<Vec<RawFormat>>;

    /// The related-items document for a track or container.
    async fn fetch_related_items(&self, query: RelatedItemsQuery) -> Result<serde_json::Value>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audio_only_detection() {
        let audio = RawFormat {
            itag: 251,
            url: Some("https://cdn.example.com/251".to_string()),
            mime_type: "audio/webm; codecs=\"opus\"".to_string(),
            bitrate: 160_000,
            content_length: Some(3_500_000),
            width: None,
        };
        let video = RawFormat {
            width: Some(1280),
            itag: 22,
            ..audio.clone()
        };

        assert!(audio.is_audio_only());
        assert!(!video.is_audio_only());
    }

    #[test]
    fn test_query_display() {
        assert_eq!(
            RelatedItemsQuery::Track("abc".to_string()).to_string(),
            "track:abc"
        );
        assert_eq!(
            RelatedItemsQuery::Container("RDAMVMabc".to_string()).to_string(),
            "container:RDAMVMabc"
        );
    }
}
