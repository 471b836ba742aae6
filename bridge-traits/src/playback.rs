//! Playback bridge traits.
//!
//! The host player plays exactly one URL at a time and has no notion of a queue.
//! The core decides what plays next and hands the adapter a fresh
//! [`PlaybackRequest`] for every track change.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::Result;

/// Metadata surfaced to platform media sessions alongside a request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlaybackMetadata {
    pub track_id: String,
    pub title: String,
    pub artist: String,
    pub artwork_url: Option<String>,
}

/// One item for the host player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaybackRequest {
    /// Remote stream URL. Expires after a few hours, so never cache requests.
    pub url: String,
    pub mime_type: String,
    /// Byte length of the stream, `0` when unknown.
    pub content_length: u64,
    pub start_position: Duration,
    pub metadata: PlaybackMetadata,
}

impl PlaybackRequest {
    pub fn new(url: impl Into<String>, mime_type: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            mime_type: mime_type.into(),
            content_length: 0,
            start_position: Duration::ZERO,
            metadata: PlaybackMetadata::default(),
        }
    }

    pub fn with_content_length(mut self, content_length: u64) -> Self {
        self.content_length = content_length;
        self
    }

    pub fn with_metadata(mut self, metadata: PlaybackMetadata) -> Self {
        self.metadata = metadata;
        self
    }
}

/// Feedback reported by the host player.
///
/// Hosts deliver these through the session handle; the adapter trait itself is
/// command-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum PlayerEvent {
    Buffering(bool),
    Playing(bool),
    Position(Duration),
    Duration(Duration),
    /// Natural end of the loaded item.
    Ended,
    /// The player could not decode or fetch the loaded item.
    Failed(String),
}

/// Single-item player owned exclusively by the playback session.
#[async_trait]
pub trait PlaybackAdapter: Send + Sync {
    /// Replace the current item. Any previous item stops and is released first.
    async fn load(&self, request: PlaybackRequest) -> Result<()>;

    async fn play(&self) -> Result<()>;

    async fn pause(&self) -> Result<()>;

    /// Seek to an absolute position within the loaded item.
    async fn seek(&self, position: Duration) -> Result<()>;

    /// Stop output and keep the player allocated.
    async fn stop(&self) -> Result<()>;

    /// Free decoder and output resources.
    async fn release(&self) -> Result<()>;
}
