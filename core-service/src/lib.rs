//! Core service façade and bootstrap.
//!
//! [`CoreService::initialize`] is the single place where host-provided bridges
//! (catalog, player, HTTP, filesystem, transfer store, media controls) are wired
//! into the playback session, the transport bridge and the transfer manager.
//! Desktop apps typically enable the `desktop-shims` feature so that the HTTP,
//! filesystem and store bridges fall back to `bridge-desktop`.

pub mod error;

pub use error::{CoreError, Result};

pub use core_runtime::config::{CoreConfig, CoreConfigBuilder, FeatureFlags};
pub use core_runtime::events::{CoreEvent, EventBus, EventStream};

#[cfg(feature = "desktop-shims")]
pub use bridge_desktop::{ReqwestHttpClient, SqliteTransferRecordStore, TokioFileSystem};

use bridge_traits::{MediaButton, TransferStatus};
use core_playback::{
    PlaybackError, QueueResolver, SessionController, SessionHandle, StreamNegotiator, Track,
    TrackId, TransferConfig, TransferJob, TransferManager, TransferRequest, TransportBridge,
};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, instrument, warn};

struct Transport {
    buttons: mpsc::Sender<MediaButton>,
    task: JoinHandle<()>,
}

struct Inner {
    config: CoreConfig,
    event_bus: EventBus,
    negotiator: StreamNegotiator,
    playback: SessionHandle,
    transfers: TransferManager,
    transport: Mutex<Option<Transport>>,
}

/// Primary façade exposed to host applications.
///
/// Cheap to clone; all clones share the same session and transfer queue.
#[derive(Clone)]
pub struct CoreService {
    inner: Arc<Inner>,
}

impl CoreService {
    /// Build every service from `config`. Must be called inside a tokio runtime.
    #[instrument(skip(config), fields(data_dir = %config.data_dir.display()))]
    pub async fn initialize(config: CoreConfig) -> Result<Self> {
        config.validate()?;
        let features = config.features;

        let event_bus = EventBus::new(config.event_buffer_size);
        let negotiator = StreamNegotiator::new(config.catalog_client.clone());
        let resolver = QueueResolver::new(config.catalog_client.clone());

        let playback = SessionController::new(
            negotiator.clone(),
            resolver,
            config.playback_adapter.clone(),
        )
        .with_event_bus(event_bus.clone())
        .with_command_buffer(config.command_buffer_size)
        .with_queue_resolution(features.resolve_related_queue)
        .spawn();

        let transport = match (&config.media_controls, features.enable_media_controls) {
            (Some(surface), true) => {
                let bridge = TransportBridge::new(surface.clone(), playback.clone())
                    .with_event_bus(event_bus.clone());
                let buttons = bridge.button_sender();
                Some(Transport {
                    buttons,
                    task: bridge.start(),
                })
            }
            _ => None,
        };

        let transfer_config = TransferConfig::default()
            .with_max_concurrent_transfers(config.max_concurrent_transfers)
            .with_thumbnails(features.offline_thumbnails);
        let transfers = TransferManager::new(
            transfer_config,
            config.http_client.clone(),
            config.file_system.clone(),
            config.transfer_store.clone(),
        )
        .with_event_bus(event_bus.clone())
        .with_clock(config.clock.clone());

        let service = Self {
            inner: Arc::new(Inner {
                config,
                event_bus,
                negotiator,
                playback,
                transfers,
                transport: Mutex::new(transport),
            }),
        };

        // Tear down what is already running if the transfer side cannot start
        if let Err(err) = service.start_transfers(features.restore_transfers).await {
            service.shutdown().await;
            return Err(err);
        }

        info!(
            media_controls = service.has_media_controls(),
            resolve_related_queue = features.resolve_related_queue,
            "Core service initialized"
        );
        Ok(service)
    }

    async fn start_transfers(&self, restore: bool) -> Result<()> {
        let transfers = &self.inner.transfers;
        transfers.initialize().await?;
        if restore {
            let restored = transfers.restore().await?;
            info!(restored, "Restored transfer jobs");
        }
        Ok(())
    }

    pub fn config(&self) -> &CoreConfig {
        &self.inner.config
    }

    /// Handle to the playback session.
    pub fn playback(&self) -> &SessionHandle {
        &self.inner.playback
    }

    pub fn transfers(&self) -> &TransferManager {
        &self.inner.transfers
    }

    pub fn events(&self) -> &EventBus {
        &self.inner.event_bus
    }

    /// New subscriber on the event bus, wrapped for filtering.
    pub fn subscribe_events(&self) -> EventStream {
        EventStream::new(self.inner.event_bus.subscribe())
    }

    pub fn negotiator(&self) -> &StreamNegotiator {
        &self.inner.negotiator
    }

    pub fn has_media_controls(&self) -> bool {
        self.inner.transport.lock().is_some()
    }

    /// Sender for hardware button presses, when media controls are enabled.
    pub fn media_buttons(&self) -> Option<mpsc::Sender<MediaButton>> {
        self.inner
            .transport
            .lock()
            .as_ref()
            .map(|transport| transport.buttons.clone())
    }

    /// Negotiate a stream for `track` and queue it for offline storage.
    ///
    /// A failed transfer for the same track resumes with the new stream URL.
    #[instrument(skip(self, track), fields(track_id = %track.id))]
    pub async fn download(&self, track: &Track) -> Result<TransferJob> {
        let existing = self.inner.transfers.job(&track.id);
        if let Some(job) = existing.as_ref().filter(|job| job.status != TransferStatus::Failed) {
            return Ok(job.clone());
        }

        let stream = self.inner.negotiator.resolve(&track.id).await?;
        if existing.is_some() {
            return Ok(self.inner.transfers.resume(&track.id, stream.url).await?);
        }
        let request = TransferRequest::for_track(track, &stream);
        Ok(self.inner.transfers.submit(request).await?)
    }

    /// Resume a failed transfer with a freshly negotiated source URL.
    #[instrument(skip(self), fields(track_id = %track_id))]
    pub async fn retry_download(&self, track_id: &TrackId) -> Result<TransferJob> {
        if self.inner.transfers.job(track_id).is_none() {
            return Err(PlaybackError::TransferNotFound(track_id.to_string()).into());
        }

        let stream = self.inner.negotiator.resolve(track_id).await?;
        Ok(self.inner.transfers.resume(track_id, stream.url).await?)
    }

    /// Stop the transport bridge, abort transfer workers and release the player.
    pub async fn shutdown(&self) {
        if let Some(transport) = self.inner.transport.lock().take() {
            transport.task.abort();
        }

        self.inner.transfers.shutdown();

        match self.inner.playback.close().await {
            Ok(()) | Err(PlaybackError::SessionClosed) => {}
            Err(err) => warn!(error = %err, "Failed to close playback session"),
        }

        info!("Core service shut down");
    }
}
