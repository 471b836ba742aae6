//! Domain values shared by the negotiator, resolver, session and transfers.

use bridge_traits::PlaybackMetadata;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Opaque catalog identifier of a track.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackId(String);

impl TrackId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TrackId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for TrackId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Immutable track value as parsed from catalog documents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    pub id: TrackId,
    pub title: String,
    pub author: String,
    pub thumbnail_url: Option<String>,
    /// Display duration as given by the catalog, e.g. `3:45`
    pub duration: Option<String>,
    pub channel_id: Option<String>,
    pub album_id: Option<String>,
}

impl Track {
    pub fn new(id: impl Into<TrackId>, title: impl Into<String>, author: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            author: author.into(),
            thumbnail_url: None,
            duration: None,
            channel_id: None,
            album_id: None,
        }
    }

    /// A track known only by id, used until richer metadata arrives.
    pub fn placeholder(id: impl Into<TrackId>, thumbnail_hint: Option<String>) -> Self {
        Self {
            thumbnail_url: thumbnail_hint,
            ..Self::new(id, String::new(), String::new())
        }
    }

    pub fn with_thumbnail(mut self, url: impl Into<String>) -> Self {
        self.thumbnail_url = Some(url.into());
        self
    }

    pub fn with_duration(mut self, duration: impl Into<String>) -> Self {
        self.duration = Some(duration.into());
        self
    }

    /// Parse the display duration (`s`, `m:ss` or `h:mm:ss`).
    pub fn duration_hint(&self) -> Option<Duration> {
        parse_clock_duration(self.duration.as_deref()?)
    }

    pub fn playback_metadata(&self) -> PlaybackMetadata {
        PlaybackMetadata {
            track_id: self.id.to_string(),
            title: self.title.clone(),
            artist: self.author.clone(),
            artwork_url: self.thumbnail_url.clone(),
        }
    }
}

pub(crate) fn parse_clock_duration(text: &str) -> Option<Duration> {
    let mut total = 0u64;
    let mut parts = 0;
    for part in text.trim().split(':') {
        let value: u64 = part.trim().parse().ok()?;
        total = total.checked_mul(60)?.checked_add(value)?;
        parts += 1;
    }
    if parts == 0 || parts > 3 {
        return None;
    }
    Some(Duration::from_secs(total))
}

/// Playable stream chosen for one playback attempt.
///
/// Source URLs expire, so descriptors are never cached beyond the session that
/// fetched them and never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamDescriptor {
    pub url: String,
    pub mime_type: String,
    /// Declared byte length, `0` when the catalog did not announce one
    pub content_length: u64,
    /// Format tag, only meaningful for priority comparison
    pub itag: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duration_parsing() {
        let track = Track::new("a", "Song", "Band").with_duration("3:45");
        assert_eq!(track.duration_hint(), Some(Duration::from_secs(225)));

        assert_eq!(parse_clock_duration("1:02:03"), Some(Duration::from_secs(3723)));
        assert_eq!(parse_clock_duration("42"), Some(Duration::from_secs(42)));
        assert_eq!(parse_clock_duration("live"), None);
        assert_eq!(parse_clock_duration("1:2:3:4"), None);
    }

    #[test]
    fn test_placeholder_keeps_thumbnail_hint() {
        let track = Track::placeholder("abc", Some("https://i.example.com/abc.jpg".into()));
        assert_eq!(track.id.as_str(), "abc");
        assert!(track.title.is_empty());
        assert_eq!(
            track.thumbnail_url.as_deref(),
            Some("https://i.example.com/abc.jpg")
        );
    }

    #[test]
    fn test_playback_metadata() {
        let track = Track::new("abc", "Song", "Band").with_thumbnail("https://i.example.com/x.jpg");
        let metadata = track.playback_metadata();
        assert_eq!(metadata.track_id, "abc");
        assert_eq!(metadata.artist, "Band");
        assert_eq!(metadata.artwork_url.as_deref(), Some("https://i.example.com/x.jpg"));
    }
}
