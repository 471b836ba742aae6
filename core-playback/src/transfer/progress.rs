//! Progress reporting for polling hosts.

use super::job::TransferJob;
use crate::models::TrackId;
use bridge_traits::TransferStatus;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransferProgress {
    pub track_id: TrackId,
    pub status: TransferStatus,
    pub bytes_transferred: u64,
    /// Declared length; `0` while unknown
    pub total_bytes: u64,
    /// `0.0..=100.0`
    pub percent: f64,
    pub needs_fresh_url: bool,
    pub error: Option<String>,
}

impl TransferProgress {
    pub fn is_finished(&self) -> bool {
        matches!(self.status, TransferStatus::Completed | TransferStatus::Failed)
    }
}

impl From<&TransferJob> for TransferProgress {
    fn from(job: &TransferJob) -> Self {
        let percent = if job.status == TransferStatus::Completed {
            100.0
        } else if job.content_length == 0 {
            0.0
        } else {
            (job.bytes_transferred as f64 / job.content_length as f64 * 100.0).min(100.0)
        };
        Self {
            track_id: job.track_id.clone(),
            status: job.status,
            bytes_transferred: job.bytes_transferred,
            total_bytes: job.content_length,
            percent,
            needs_fresh_url: job.needs_fresh_url,
            error: job.error.clone(),
        }
    }
}

/// Aggregate view over every known job.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TransferStats {
    pub queued: usize,
    pub running: usize,
    pub completed: usize,
    pub failed: usize,
    /// Bytes held on disk across completed and partial files
    pub total_bytes: u64,
}

impl TransferStats {
    pub fn total(&self) -> usize {
        self.queued + self.running + self.completed + self.failed
    }

    pub fn active(&self) -> usize {
        self.queued + self.running
    }

    pub(crate) fn record(&mut self, job: &TransferJob) {
        match job.status {
            TransferStatus::Queued => self.queued += 1,
            TransferStatus::Running => self.running += 1,
            TransferStatus::Completed => self.completed += 1,
            TransferStatus::Failed => self.failed += 1,
        }
        self.total_bytes += job.bytes_transferred;
    }
}
