//! Transfer jobs and their persisted form.

use crate::models::{StreamDescriptor, Track, TrackId};
use bridge_traits::{TransferRecord, TransferStatus};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// What to download and how to label it once stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRequest {
    pub track_id: TrackId,
    pub source_url: String,
    pub mime_type: String,
    /// Declared byte length; `0` when unknown
    pub content_length: u64,
    pub title: String,
    pub author: String,
    pub duration: Option<String>,
    pub thumbnail_url: Option<String>,
}

impl TransferRequest {
    pub fn new(track_id: impl Into<TrackId>, source_url: impl Into<String>, mime_type: impl Into<String>) -> Self {
        Self {
            track_id: track_id.into(),
            source_url: source_url.into(),
            mime_type: mime_type.into(),
            content_length: 0,
            title: String::new(),
            author: String::new(),
            duration: None,
            thumbnail_url: None,
        }
    }

    /// Request for `track` using a freshly negotiated `stream`.
    pub fn for_track(track: &Track, stream: &StreamDescriptor) -> Self {
        Self {
            track_id: track.id.clone(),
            source_url: stream.url.clone(),
            mime_type: stream.mime_type.clone(),
            content_length: stream.content_length,
            title: track.title.clone(),
            author: track.author.clone(),
            duration: track.duration.clone(),
            thumbnail_url: track.thumbnail_url.clone(),
        }
    }

    pub fn with_content_length(mut self, bytes: u64) -> Self {
        self.content_length = bytes;
        self
    }

    pub fn with_labels(mut self, title: impl Into<String>, author: impl Into<String>) -> Self {
        self.title = title.into();
        self.author = author.into();
        self
    }

    pub fn with_thumbnail(mut self, url: impl Into<String>) -> Self {
        self.thumbnail_url = Some(url.into());
        self
    }
}

/// One tracked download.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransferJob {
    pub track_id: TrackId,
    pub title: String,
    pub author: String,
    pub duration: Option<String>,
    #[serde(skip)]
    pub source_url: String,
    pub destination: PathBuf,
    pub mime_type: String,
    pub content_length: u64,
    pub bytes_transferred: u64,
    pub status: TransferStatus,
    pub error: Option<String>,
    /// Set when the source URL expired; `resume` with a fresh URL
    pub needs_fresh_url: bool,
    pub thumbnail_url: Option<String>,
    pub thumbnail_path: Option<PathBuf>,
    pub created_at: DateTime<Utc>,
    pub downloaded_at: Option<DateTime<Utc>>,
}

impl TransferJob {
    pub(crate) fn queued(request: TransferRequest, downloads_dir: &Path, now: DateTime<Utc>) -> Self {
        let destination = destination_path(downloads_dir, &request.track_id, &request.mime_type);
        Self {
            track_id: request.track_id,
            title: request.title,
            author: request.author,
            duration: request.duration,
            source_url: request.source_url,
            destination,
            mime_type: request.mime_type,
            content_length: request.content_length,
            bytes_transferred: 0,
            status: TransferStatus::Queued,
            error: None,
            needs_fresh_url: false,
            thumbnail_url: request.thumbnail_url,
            thumbnail_path: None,
            created_at: now,
            downloaded_at: None,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.status == TransferStatus::Completed
    }

    pub(crate) fn mark_running(&mut self, offset: u64) {
        self.status = TransferStatus::Running;
        self.bytes_transferred = offset;
        self.error = None;
        self.needs_fresh_url = false;
    }

    pub(crate) fn mark_completed(&mut self, bytes: u64, at: DateTime<Utc>) {
        self.status = TransferStatus::Completed;
        self.bytes_transferred = bytes;
        self.content_length = bytes;
        self.error = None;
        self.downloaded_at = Some(at);
    }

    pub(crate) fn mark_failed(&mut self, message: String, needs_fresh_url: bool) {
        self.status = TransferStatus::Failed;
        self.error = Some(message);
        self.needs_fresh_url = needs_fresh_url;
    }

    /// Re-enter the queue with a replacement URL.
    pub(crate) fn requeue(&mut self, source_url: Option<String>) {
        if let Some(url) = source_url {
            self.source_url = url;
        }
        self.status = TransferStatus::Queued;
        self.error = None;
        self.needs_fresh_url = false;
    }

    pub fn to_record(&self) -> TransferRecord {
        TransferRecord {
            track_id: self.track_id.to_string(),
            title: self.title.clone(),
            author: self.author.clone(),
            duration: self.duration.clone(),
            source_url: self.source_url.clone(),
            file_path: self.destination.clone(),
            mime_type: self.mime_type.clone(),
            file_size: self.content_length,
            bytes_transferred: self.bytes_transferred,
            status: self.status,
            error: self.error.clone(),
            thumbnail_url: self.thumbnail_url.clone(),
            thumbnail_path: self.thumbnail_path.clone(),
            created_at: self.created_at,
            downloaded_at: self.downloaded_at,
        }
    }

    pub fn from_record(record: TransferRecord) -> Self {
        // Persisted failures predate this process; their URL is assumed stale.
        let needs_fresh_url = record.status == TransferStatus::Failed;
        Self {
            track_id: TrackId::new(record.track_id),
            title: record.title,
            author: record.author,
            duration: record.duration,
            source_url: record.source_url,
            destination: record.file_path,
            mime_type: record.mime_type,
            content_length: record.file_size,
            bytes_transferred: record.bytes_transferred,
            status: record.status,
            error: record.error,
            needs_fresh_url,
            thumbnail_url: record.thumbnail_url,
            thumbnail_path: record.thumbnail_path,
            created_at: record.created_at,
            downloaded_at: record.downloaded_at,
        }
    }
}

/// `<downloads>/<sanitized id>.<ext>`
pub fn destination_path(downloads_dir: &Path, track_id: &TrackId, mime_type: &str) -> PathBuf {
    downloads_dir.join(format!(
        "{}.{}",
        sanitize_file_stem(track_id.as_str()),
        extension_for_mime(mime_type)
    ))
}

pub(crate) fn sanitize_file_stem(id: &str) -> String {
    let stem: String = id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    if stem.is_empty() {
        "_".to_string()
    } else {
        stem
    }
}

/// File extension for a MIME type such as `audio/webm; codecs="opus"`.
pub fn extension_for_mime(mime_type: &str) -> &'static str {
    let essence = mime_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    match essence.as_str() {
        "audio/webm" | "video/webm" => "webm",
        "audio/mp4" | "video/mp4" => "m4a",
        "audio/mpeg" => "mp3",
        "audio/ogg" => "ogg",
        _ => "bin",
    }
}
