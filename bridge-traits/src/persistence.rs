//! Transfer record persistence.
//!
//! One record per transfer job. Records of completed jobs carry the offline
//! bookkeeping (title, author, duration, file path, size, MIME type, timestamp);
//! records of unfinished jobs let the transfer queue survive restarts.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::{BridgeError, Result};

/// Lifecycle of a transfer job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferStatus {
    Queued,
    Running,
    Completed,
    Failed,
}

impl TransferStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransferStatus::Queued => "queued",
            TransferStatus::Running => "running",
            TransferStatus::Completed => "completed",
            TransferStatus::Failed => "failed",
        }
    }

    /// Queued or Running.
    pub fn is_active(&self) -> bool {
        matches!(self, TransferStatus::Queued | TransferStatus::Running)
    }
}

impl fmt::Display for TransferStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransferStatus {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "queued" => Ok(TransferStatus::Queued),
            "running" => Ok(TransferStatus::Running),
            "completed" => Ok(TransferStatus::Completed),
            "failed" => Ok(TransferStatus::Failed),
            other => Err(BridgeError::Persistence(format!(
                "unknown transfer status: {}",
                other
            ))),
        }
    }
}

/// Persisted form of a transfer job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferRecord {
    pub track_id: String,
    pub title: String,
    pub author: String,
    pub duration: Option<String>,
    pub source_url: String,
    pub file_path: PathBuf,
    pub mime_type: String,
    /// Declared length, or the verified file size once completed.
    pub file_size: u64,
    pub bytes_transferred: u64,
    pub status: TransferStatus,
    pub error: Option<String>,
    pub thumbnail_url: Option<String>,
    pub thumbnail_path: Option<PathBuf>,
    pub created_at: DateTime<Utc>,
    pub downloaded_at: Option<DateTime<Utc>>,
}

/// Persistence collaborator for transfer jobs.
#[async_trait]
pub trait TransferRecordStore: Send + Sync {
    /// Insert or replace the record for `record.track_id`.
    async fn persist_transfer_record(&self, record: &TransferRecord) -> Result<()>;

    async fn query_transfer_record(&self, track_id: &str) -> Result<Option<TransferRecord>>;

    async fn list_transfer_records(&self) -> Result<Vec<TransferRecord>>;

    async fn delete_transfer_record(&self, track_id: &str) -> Result<()>;
}
