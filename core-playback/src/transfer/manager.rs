//! # Transfer Manager
//!
//! Orchestrates offline downloads with:
//! - a semaphore capping running jobs (at most three)
//! - resumable transfers via `Range` requests against a fresh URL
//! - strict completion: byte count equals declared length, writer flushed
//!   and shut down, on-disk size verified
//! - a persisted record for every status change
//! - best-effort JPEG thumbnails
//!
//! Failures are recorded on the job and never retried silently. Partial files
//! stay on disk until the job is removed.

use super::config::TransferConfig;
use super::job::{TransferJob, TransferRequest};
use super::progress::{TransferProgress, TransferStats};
use super::thumbnail::ThumbnailFetcher;
use crate::error::{PlaybackError, Result};
use crate::models::TrackId;
use bridge_traits::{
    Clock, FileSystemAccess, HttpClient, HttpRequest, StreamingResponse, SystemClock,
    TransferRecordStore, TransferStatus,
};
use core_runtime::events::{CoreEvent, EventBus, TransferEvent};
use core_runtime::logging::redact_url;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

#[derive(Debug, Clone)]
struct Directories {
    downloads: PathBuf,
    thumbnails: PathBuf,
}

struct JobEntry {
    job: TransferJob,
    /// Bumped for every worker spawned; a worker only writes while it matches.
    attempt: u64,
    worker: Option<JoinHandle<()>>,
}

/// Concurrency-limited, resumable download queue.
#[derive(Clone)]
pub struct TransferManager {
    config: TransferConfig,
    http: Arc<dyn HttpClient>,
    fs: Arc<dyn FileSystemAccess>,
    store: Arc<dyn TransferRecordStore>,
    clock: Arc<dyn Clock>,
    event_bus: Option<EventBus>,
    thumbnails: ThumbnailFetcher,
    slots: Arc<Semaphore>,
    jobs: Arc<Mutex<HashMap<TrackId, JobEntry>>>,
    directories: Arc<RwLock<Option<Directories>>>,
}

impl TransferManager {
    pub fn new(
        config: TransferConfig,
        http: Arc<dyn HttpClient>,
        fs: Arc<dyn FileSystemAccess>,
        store: Arc<dyn TransferRecordStore>,
    ) -> Self {
        let slots = Arc::new(Semaphore::new(config.max_concurrent_transfers.max(1)));
        let thumbnails = ThumbnailFetcher::new(
            http.clone(),
            fs.clone(),
            config.thumbnail_max_dimension,
            config.thumbnail_quality,
        );

        Self {
            config,
            http,
            fs,
            store,
            clock: Arc::new(SystemClock),
            event_bus: None,
            thumbnails,
            slots,
            jobs: Arc::new(Mutex::new(HashMap::new())),
            directories: Arc::new(RwLock::new(None)),
        }
    }

    /// Set event bus for transfer events.
    pub fn with_event_bus(mut self, event_bus: EventBus) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Validate configuration and create the download directories.
    #[instrument(skip(self))]
    pub async fn initialize(&self) -> Result<()> {
        info!("Initializing transfer manager");

        self.config
            .validate()
            .map_err(|e| PlaybackError::Config(format!("Invalid transfer configuration: {}", e)))?;

        let data_dir = self.fs.get_data_directory().await.map_err(|e| {
            error!("Failed to get data directory: {}", e);
            PlaybackError::Storage(format!("Failed to get data directory: {}", e))
        })?;

        let directories = Directories {
            downloads: data_dir.join(&self.config.downloads_directory),
            thumbnails: data_dir.join(&self.config.thumbnails_directory),
        };
        for dir in [&directories.downloads, &directories.thumbnails] {
            self.fs.create_dir_all(dir).await.map_err(|e| {
                error!("Failed to create {}: {}", dir.display(), e);
                PlaybackError::Storage(format!("Failed to create {}: {}", dir.display(), e))
            })?;
        }

        info!(downloads = %directories.downloads.display(), "Transfer manager initialized");
        *self.directories.write() = Some(directories);
        Ok(())
    }

    async fn directories(&self) -> Result<Directories> {
        let known = self.directories.read().clone();
        if let Some(directories) = known {
            return Ok(directories);
        }
        self.initialize().await?;
        self.directories
            .read()
            .clone()
            .ok_or_else(|| PlaybackError::Config("transfer directories unavailable".to_string()))
    }

    /// Enqueue a download. Submitting a known track returns its job unchanged.
    #[instrument(skip(self, request), fields(track_id = %request.track_id))]
    pub async fn submit(&self, request: TransferRequest) -> Result<TransferJob> {
        if request.track_id.as_str().is_empty() {
            return Err(PlaybackError::InvalidArgument("track id is empty".to_string()));
        }
        if request.source_url.is_empty() {
            return Err(PlaybackError::InvalidArgument("source url is empty".to_string()));
        }

        if let Some(existing) = self.job(&request.track_id) {
            debug!(status = %existing.status, "Transfer already known");
            return Ok(existing);
        }

        let directories = self.directories().await?;
        let job = TransferJob::queued(request, &directories.downloads, self.clock.now());

        {
            let mut jobs = self.jobs.lock();
            if let Some(existing) = jobs.get(&job.track_id) {
                return Ok(existing.job.clone());
            }
            jobs.insert(
                job.track_id.clone(),
                JobEntry {
                    job: job.clone(),
                    attempt: 0,
                    worker: None,
                },
            );
        }

        info!(
            url = %redact_url(&job.source_url),
            destination = %job.destination.display(),
            "Transfer queued"
        );
        self.persist(&job).await;
        self.emit(TransferEvent::Queued {
            track_id: job.track_id.to_string(),
        });
        self.spawn_worker(&job.track_id);
        Ok(job)
    }

    /// Continue a failed transfer from its current offset using `fresh_url`.
    ///
    /// Jobs that are queued, running or complete are returned unchanged.
    #[instrument(skip(self, fresh_url), fields(track_id = %track_id))]
    pub async fn resume(&self, track_id: &TrackId, fresh_url: impl Into<String>) -> Result<TransferJob> {
        let fresh_url = fresh_url.into();
        if fresh_url.is_empty() {
            return Err(PlaybackError::InvalidArgument("source url is empty".to_string()));
        }

        let job = {
            let mut jobs = self.jobs.lock();
            let entry = jobs
                .get_mut(track_id)
                .ok_or_else(|| PlaybackError::TransferNotFound(track_id.to_string()))?;
            if entry.job.status != TransferStatus::Failed {
                debug!(status = %entry.job.status, "Resume ignored");
                return Ok(entry.job.clone());
            }
            entry.job.requeue(Some(fresh_url));
            entry.job.clone()
        };

        info!(offset = job.bytes_transferred, "Transfer resumed with fresh url");
        self.persist(&job).await;
        self.emit(TransferEvent::Queued {
            track_id: job.track_id.to_string(),
        });
        self.spawn_worker(track_id);
        Ok(job)
    }

    /// Abort the worker and delete the file, thumbnail and record.
    #[instrument(skip(self), fields(track_id = %track_id))]
    pub async fn remove(&self, track_id: &TrackId) -> Result<()> {
        let removed = self.jobs.lock().remove(track_id);

        let job = match removed {
            Some(entry) => {
                if let Some(worker) = entry.worker {
                    worker.abort();
                }
                entry.job
            }
            None => match self.store.query_transfer_record(track_id.as_str()).await? {
                Some(record) => TransferJob::from_record(record),
                None => return Err(PlaybackError::TransferNotFound(track_id.to_string())),
            },
        };

        if let Err(e) = self.fs.delete_if_exists(&job.destination).await {
            warn!(error = %e, "Failed to delete transfer file");
        }
        if let Some(thumbnail) = &job.thumbnail_path {
            if let Err(e) = self.fs.delete_if_exists(thumbnail).await {
                warn!(error = %e, "Failed to delete thumbnail");
            }
        }
        self.store.delete_transfer_record(track_id.as_str()).await?;

        info!("Transfer removed");
        self.emit(TransferEvent::Removed {
            track_id: track_id.to_string(),
        });
        Ok(())
    }

    pub fn progress(&self, track_id: &TrackId) -> Option<TransferProgress> {
        self.jobs
            .lock()
            .get(track_id)
            .map(|entry| TransferProgress::from(&entry.job))
    }

    pub fn job(&self, track_id: &TrackId) -> Option<TransferJob> {
        self.jobs.lock().get(track_id).map(|entry| entry.job.clone())
    }

    /// Every known job, oldest first.
    pub fn jobs(&self) -> Vec<TransferJob> {
        let mut jobs: Vec<TransferJob> = self
            .jobs
            .lock()
            .values()
            .map(|entry| entry.job.clone())
            .collect();
        jobs.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.track_id.cmp(&b.track_id))
        });
        jobs
    }

    pub fn stats(&self) -> TransferStats {
        let jobs = self.jobs.lock();
        let mut stats = TransferStats::default();
        for entry in jobs.values() {
            stats.record(&entry.job);
        }
        stats
    }

    /// Reload persisted jobs. Interrupted jobs are queued again, failed jobs
    /// wait for [`resume`](Self::resume), completed jobs are kept as is.
    #[instrument(skip(self))]
    pub async fn restore(&self) -> Result<usize> {
        let records = self.store.list_transfer_records().await?;
        let mut restored = 0;
        let mut requeued = Vec::new();

        {
            let mut jobs = self.jobs.lock();
            for record in records {
                let mut job = TransferJob::from_record(record);
                if jobs.contains_key(&job.track_id) {
                    continue;
                }
                if job.status.is_active() {
                    job.requeue(None);
                    requeued.push(job.track_id.clone());
                }
                jobs.insert(
                    job.track_id.clone(),
                    JobEntry {
                        job,
                        attempt: 0,
                        worker: None,
                    },
                );
                restored += 1;
            }
        }

        for track_id in &requeued {
            self.spawn_worker(track_id);
        }
        info!(restored, requeued = requeued.len(), "Transfer jobs restored");
        Ok(restored)
    }

    /// Abort every running worker. Job state and files are left in place.
    pub fn shutdown(&self) {
        let mut jobs = self.jobs.lock();
        for entry in jobs.values_mut() {
            if let Some(worker) = entry.worker.take() {
                worker.abort();
            }
        }
        self.slots.close();
    }

    // ------------------------------------------------------------------
    // Workers
    // ------------------------------------------------------------------

    fn spawn_worker(&self, track_id: &TrackId) {
        let mut jobs = self.jobs.lock();
        let Some(entry) = jobs.get_mut(track_id) else {
            return;
        };
        entry.attempt += 1;
        let attempt = entry.attempt;
        if let Some(previous) = entry.worker.take() {
            previous.abort();
        }

        let manager = self.clone();
        let track_id = track_id.clone();
        entry.worker = Some(tokio::spawn(async move {
            manager.run_job(track_id, attempt).await;
        }));
    }

    /// Apply `update` to the job if `attempt` still owns it.
    fn update_job<T>(
        &self,
        track_id: &TrackId,
        attempt: u64,
        update: impl FnOnce(&mut TransferJob) -> T,
    ) -> Option<T> {
        let mut jobs = self.jobs.lock();
        let entry = jobs.get_mut(track_id).filter(|entry| entry.attempt == attempt)?;
        Some(update(&mut entry.job))
    }

    async fn run_job(&self, track_id: TrackId, attempt: u64) {
        let Ok(_permit) = self.slots.clone().acquire_owned().await else {
            debug!(track_id = %track_id, "Transfer slots closed");
            return;
        };

        let Some(job) = self.update_job(&track_id, attempt, |job| job.clone()) else {
            return;
        };
        let offset = self.resume_offset(&job).await;

        let Some(job) = self.update_job(&track_id, attempt, |job| {
            job.mark_running(offset);
            job.clone()
        }) else {
            return;
        };
        info!(track_id = %track_id, offset, "Transfer started");
        self.persist(&job).await;
        self.emit(TransferEvent::Started {
            track_id: track_id.to_string(),
            offset,
        });

        match self.transfer(&job, attempt).await {
            Ok(bytes) => self.finish(&track_id, attempt, bytes).await,
            Err(e) => self.fail(&track_id, attempt, e).await,
        }
    }

    /// Offset to continue from, bounded by what is actually on disk.
    async fn resume_offset(&self, job: &TransferJob) -> u64 {
        if job.bytes_transferred == 0 {
            return 0;
        }
        match self.fs.file_size(&job.destination).await {
            Ok(Some(size)) => size.min(job.bytes_transferred),
            Ok(None) => 0,
            Err(e) => {
                warn!(error = %e, "Could not inspect partial file, starting over");
                0
            }
        }
    }

    /// Stream the body to disk. Returns the verified final size.
    async fn transfer(&self, job: &TransferJob, attempt: u64) -> Result<u64> {
        let offset = job.bytes_transferred;
        let request = HttpRequest::get(job.source_url.clone())
            .range_from(offset)
            .timeout(self.config.request_timeout);

        let mut response = self.http.download_stream(request).await?;
        let start = match response.status {
            401 | 403 | 410 => {
                return Err(PlaybackError::UrlExpired {
                    status: response.status,
                })
            }
            206 => offset,
            200 => 0,
            status => return Err(PlaybackError::TransferHttpError { status }),
        };
        if start != offset {
            debug!(track_id = %job.track_id, offset, "Server ignored range, restarting from zero");
        }

        let expected = declared_length(job.content_length, start, &response);
        self.update_job(&job.track_id, attempt, |job| {
            job.bytes_transferred = start;
            if expected > 0 {
                job.content_length = expected;
            }
        });

        let mut writer = self.fs.open_resumable_write(&job.destination, start).await?;
        let mut buffer = vec![0u8; self.config.buffer_size];
        let mut written = start;

        loop {
            let read = response.body.read(&mut buffer).await?;
            if read == 0 {
                break;
            }
            writer.write_all(&buffer[..read]).await?;
            written += read as u64;
            self.update_job(&job.track_id, attempt, |job| job.bytes_transferred = written);
        }

        writer.flush().await?;
        writer.shutdown().await?;
        drop(writer);

        // Unknown length: whatever the server sent is the whole file.
        let expected = if expected == 0 { written } else { expected };
        if written != expected || written == 0 {
            return Err(PlaybackError::TransferIncomplete {
                expected,
                received: written,
            });
        }

        let on_disk = self.fs.file_size(&job.destination).await?.unwrap_or(0);
        if on_disk != expected {
            return Err(PlaybackError::TransferIncomplete {
                expected,
                received: on_disk,
            });
        }
        Ok(on_disk)
    }

    async fn finish(&self, track_id: &TrackId, attempt: u64, bytes: u64) {
        let thumbnail_path = self.store_thumbnail(track_id, attempt).await;
        let now = self.clock.now();

        let Some(job) = self.update_job(track_id, attempt, |job| {
            job.mark_completed(bytes, now);
            if thumbnail_path.is_some() {
                job.thumbnail_path = thumbnail_path;
            }
            job.clone()
        }) else {
            return;
        };

        info!(track_id = %track_id, bytes, "Transfer completed");
        self.persist(&job).await;
        self.emit(TransferEvent::Completed {
            track_id: track_id.to_string(),
            file_path: job.destination.display().to_string(),
            bytes,
        });
    }

    async fn fail(&self, track_id: &TrackId, attempt: u64, err: PlaybackError) {
        let needs_fresh_url = err.needs_fresh_url();
        let message = err.to_string();

        let Some(job) = self.update_job(track_id, attempt, |job| {
            job.mark_failed(message.clone(), needs_fresh_url);
            job.clone()
        }) else {
            return;
        };

        if needs_fresh_url {
            warn!(track_id = %track_id, bytes = job.bytes_transferred, "Source url expired");
        } else {
            error!(track_id = %track_id, error = %message, "Transfer failed");
        }
        self.persist(&job).await;
        self.emit(TransferEvent::Failed {
            track_id: track_id.to_string(),
            message,
            needs_fresh_url,
            bytes_transferred: job.bytes_transferred,
        });
    }

    async fn store_thumbnail(&self, track_id: &TrackId, attempt: u64) -> Option<PathBuf> {
        if !self.config.fetch_thumbnails {
            return None;
        }
        let url = self.update_job(track_id, attempt, |job| job.thumbnail_url.clone())??;
        let directories = self.directories.read().clone()?;
        let destination = thumbnail_path(&directories.thumbnails, track_id);

        match self.thumbnails.fetch(&url, &destination).await {
            Ok(path) => Some(path),
            Err(e) => {
                warn!(track_id = %track_id, error = %e, "Thumbnail skipped");
                None
            }
        }
    }

    async fn persist(&self, job: &TransferJob) {
        if let Err(e) = self.store.persist_transfer_record(&job.to_record()).await {
            error!(track_id = %job.track_id, error = %e, "Failed to persist transfer record");
        }
    }

    fn emit(&self, event: TransferEvent) {
        if let Some(bus) = &self.event_bus {
            let _ = bus.emit(CoreEvent::Transfer(event));
        }
    }
}

fn thumbnail_path(dir: &Path, track_id: &TrackId) -> PathBuf {
    dir.join(format!("{}.jpg", super::job::sanitize_file_stem(track_id.as_str())))
}

/// Full length of the file being written, `0` when nobody knows.
fn declared_length(declared: u64, start: u64, response: &StreamingResponse) -> u64 {
    if declared > 0 {
        return declared;
    }
    if response.is_partial() {
        response
            .content_range_total()
            .or_else(|| response.content_length().map(|len| start + len))
            .unwrap_or(0)
    } else {
        response.content_length().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn response(status: u16, headers: &[(&str, &str)]) -> StreamingResponse {
        StreamingResponse {
            status,
            headers: headers
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<HashMap<_, _>>(),
            body: Box::new(tokio::io::empty()),
        }
    }

    #[test]
    fn test_declared_length_prefers_catalog_value() {
        let resp = response(200, &[("Content-Length", "10")]);
        assert_eq!(declared_length(500, 0, &resp), 500);
    }

    #[test]
    fn test_declared_length_from_headers() {
        let full = response(200, &[("Content-Length", "1000")]);
        assert_eq!(declared_length(0, 0, &full), 1000);

        let ranged = response(206, &[("Content-Range", "bytes 400-999/1000")]);
        assert_eq!(declared_length(0, 400, &ranged), 1000);

        let ranged = response(206, &[("Content-Length", "600")]);
        assert_eq!(declared_length(0, 400, &ranged), 1000);

        assert_eq!(declared_length(0, 0, &response(200, &[])), 0);
    }
}
