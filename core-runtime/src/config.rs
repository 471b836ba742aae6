//! # Core Configuration Module
//!
//! Builder-based configuration holding every bridge the engine needs plus the
//! few tunables it exposes.
//!
//! ## Required Dependencies
//!
//! - `CatalogClient` - Remote catalog access (formats and related items)
//! - `PlaybackAdapter` - Native single-item player
//!
//! ## Optional Dependencies (with platform defaults)
//!
//! - `HttpClient` - Transfers and thumbnails (desktop default: reqwest)
//! - `FileSystemAccess` - Offline storage (desktop default: tokio fs)
//! - `TransferRecordStore` - Transfer bookkeeping (desktop default: SQLite in the data directory)
//! - `MediaControlSurface` - OS media controls (no default)
//! - `Clock` - Time source (default: system clock)
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::CoreConfig;
//! use std::sync::Arc;
//!
//! let config = CoreConfig::builder()
//!     .data_dir("/path/to/app-data")
//!     .catalog_client(Arc::new(MyCatalogClient))
//!     .playback_adapter(Arc::new(MyPlayer))
//!     .media_controls(Arc::new(MyMediaSession))
//!     .enable_media_controls(true)
//!     .build()?;
//! ```

use crate::error::{Error, Result};
use bridge_traits::{
    CatalogClient, Clock, FileSystemAccess, HttpClient, MediaControlSurface, PlaybackAdapter,
    SystemClock, TransferRecordStore,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Upper bound on simultaneously running transfer jobs.
pub const MAX_CONCURRENT_TRANSFERS: usize = 3;

const DEFAULT_COMMAND_BUFFER: usize = 64;
const DEFAULT_EVENT_BUFFER: usize = 256;

/// Core configuration.
///
/// Use [`CoreConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct CoreConfig {
    /// Root for offline audio, thumbnails and the transfer database
    pub data_dir: PathBuf,

    pub catalog_client: Arc<dyn CatalogClient>,
    pub playback_adapter: Arc<dyn PlaybackAdapter>,
    pub http_client: Arc<dyn HttpClient>,
    pub file_system: Arc<dyn FileSystemAccess>,
    pub transfer_store: Arc<dyn TransferRecordStore>,
    pub media_controls: Option<Arc<dyn MediaControlSurface>>,
    pub clock: Arc<dyn Clock>,

    /// Running transfer cap, `1..=MAX_CONCURRENT_TRANSFERS`
    pub max_concurrent_transfers: usize,

    /// Capacity of the playback session command channel
    pub command_buffer_size: usize,

    /// Capacity of the event bus broadcast channel
    pub event_buffer_size: usize,

    pub features: FeatureFlags,
}

impl std::fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreConfig")
            .field("data_dir", &self.data_dir)
            .field("catalog_client", &"CatalogClient { ... }")
            .field("playback_adapter", &"PlaybackAdapter { ... }")
            .field("http_client", &"HttpClient { ... }")
            .field("file_system", &"FileSystemAccess { ... }")
            .field("transfer_store", &"TransferRecordStore { ... }")
            .field(
                "media_controls",
                &self
                    .media_controls
                    .as_ref()
                    .map(|_| "MediaControlSurface { ... }"),
            )
            .field("max_concurrent_transfers", &self.max_concurrent_transfers)
            .field("command_buffer_size", &self.command_buffer_size)
            .field("event_buffer_size", &self.event_buffer_size)
            .field("features", &self.features)
            .finish()
    }
}

/// Feature flags control optional functionality.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureFlags {
    /// Resolve an up-next queue in the background for fresh playback
    pub resolve_related_queue: bool,

    /// Mirror the session to the OS media controls (requires MediaControlSurface)
    pub enable_media_controls: bool,

    /// Download and store a compressed thumbnail alongside offline audio
    pub offline_thumbnails: bool,

    /// Reload unfinished transfer jobs from the store at startup
    pub restore_transfers: bool,
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self {
            resolve_related_queue: true,
            enable_media_controls: false,
            offline_thumbnails: true,
            restore_transfers: true,
        }
    }
}

impl CoreConfig {
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    /// Validates the configuration and returns an error if invalid.
    pub fn validate(&self) -> Result<()> {
        if self.data_dir.as_os_str().is_empty() {
            return Err(Error::Config("Data directory cannot be empty".to_string()));
        }

        if self.max_concurrent_transfers == 0 {
            return Err(Error::Config(
                "At least one concurrent transfer is required".to_string(),
            ));
        }

        if self.max_concurrent_transfers > MAX_CONCURRENT_TRANSFERS {
            return Err(Error::Config(format!(
                "Concurrent transfers capped at {}, got {}",
                MAX_CONCURRENT_TRANSFERS, self.max_concurrent_transfers
            )));
        }

        if self.command_buffer_size == 0 || self.event_buffer_size == 0 {
            return Err(Error::Config(
                "Channel buffer sizes must be greater than 0".to_string(),
            ));
        }

        if self.features.enable_media_controls && self.media_controls.is_none() {
            return Err(Error::Config(
                "Media controls enabled but no MediaControlSurface provided. \
                 Disable the feature or inject a MediaControlSurface implementation."
                    .to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(feature = "desktop-shims")]
fn provide_default_http_client() -> Result<Arc<dyn HttpClient>> {
    let client: Arc<dyn HttpClient> = Arc::new(bridge_desktop::ReqwestHttpClient::new());
    Ok(client)
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_http_client() -> Result<Arc<dyn HttpClient>> {
    Err(Error::missing(
        "HttpClient",
        "HttpClient implementation is required for offline transfers. \
         Desktop: enable the 'desktop-shims' feature. \
         Mobile: inject the platform HTTP stack.",
    ))
}

#[cfg(feature = "desktop-shims")]
fn provide_default_file_system(data_dir: &Path) -> Result<Arc<dyn FileSystemAccess>> {
    let fs: Arc<dyn FileSystemAccess> = Arc::new(bridge_desktop::TokioFileSystem::with_directories(
        data_dir.join("cache"),
        data_dir.to_path_buf(),
    ));
    Ok(fs)
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_file_system(_data_dir: &Path) -> Result<Arc<dyn FileSystemAccess>> {
    Err(Error::missing(
        "FileSystemAccess",
        "FileSystemAccess implementation is required for offline storage. \
         Desktop: enable the 'desktop-shims' feature. \
         Mobile: inject sandboxed app storage.",
    ))
}

#[cfg(feature = "desktop-shims")]
fn provide_default_transfer_store(data_dir: &Path) -> Result<Arc<dyn TransferRecordStore>> {
    use bridge_desktop::SqliteTransferRecordStore;
    use std::thread;
    use tokio::runtime::{Handle, Runtime};

    let db_path = data_dir.join("transfers.db");

    let init_store = |path: PathBuf| -> Result<_> {
        let runtime = Runtime::new().map_err(|e| {
            Error::Internal(format!(
                "Failed to create Tokio runtime for default transfer store: {}",
                e
            ))
        })?;

        runtime
            .block_on(SqliteTransferRecordStore::new(path))
            .map_err(|e| {
                Error::Internal(format!(
                    "Failed to initialize default TransferRecordStore: {}",
                    e
                ))
            })
    };

    // sqlx cannot be driven by a nested block_on inside a running runtime
    let store = match Handle::try_current() {
        Ok(_) => thread::spawn(move || init_store(db_path))
            .join()
            .map_err(|_| {
                Error::Internal(
                    "Worker thread panicked while creating default TransferRecordStore"
                        .to_string(),
                )
            })??,
        Err(_) => init_store(db_path)?,
    };

    let store: Arc<dyn TransferRecordStore> = Arc::new(store);
    Ok(store)
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_transfer_store(_data_dir: &Path) -> Result<Arc<dyn TransferRecordStore>> {
    Err(Error::missing(
        "TransferRecordStore",
        "TransferRecordStore implementation is required for offline bookkeeping. \
         Desktop: enable the 'desktop-shims' feature for the SQLite store. \
         Mobile: inject the app database.",
    ))
}

/// Builder for constructing [`CoreConfig`] instances.
#[derive(Default)]
pub struct CoreConfigBuilder {
    data_dir: Option<PathBuf>,
    catalog_client: Option<Arc<dyn CatalogClient>>,
    playback_adapter: Option<Arc<dyn PlaybackAdapter>>,
    http_client: Option<Arc<dyn HttpClient>>,
    file_system: Option<Arc<dyn FileSystemAccess>>,
    transfer_store: Option<Arc<dyn TransferRecordStore>>,
    media_controls: Option<Arc<dyn MediaControlSurface>>,
    clock: Option<Arc<dyn Clock>>,
    max_concurrent_transfers: Option<usize>,
    command_buffer_size: Option<usize>,
    event_buffer_size: Option<usize>,
    features: FeatureFlags,
}

impl CoreConfigBuilder {
    pub fn data_dir<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.data_dir = Some(path.into());
        self
    }

    /// Sets the catalog client (required).
    pub fn catalog_client(mut self, client: Arc<dyn CatalogClient>) -> Self {
        self.catalog_client = Some(client);
        self
    }

    /// Sets the native player (required).
    pub fn playback_adapter(mut self, adapter: Arc<dyn PlaybackAdapter>) -> Self {
        self.playback_adapter = Some(adapter);
        self
    }

    /// Sets the HTTP client implementation.
    ///
    /// If not provided, the reqwest-based client is used when the
    /// `desktop-shims` feature is enabled.
    pub fn http_client(mut self, client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(client);
        self
    }

    pub fn file_system(mut self, fs: Arc<dyn FileSystemAccess>) -> Self {
        self.file_system = Some(fs);
        self
    }

    pub fn transfer_store(mut self, store: Arc<dyn TransferRecordStore>) -> Self {
        self.transfer_store = Some(store);
        self
    }

    pub fn media_controls(mut self, surface: Arc<dyn MediaControlSurface>) -> Self {
        self.media_controls = Some(surface);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Default: [`MAX_CONCURRENT_TRANSFERS`]
    pub fn max_concurrent_transfers(mut self, count: usize) -> Self {
        self.max_concurrent_transfers = Some(count);
        self
    }

    pub fn command_buffer_size(mut self, size: usize) -> Self {
        self.command_buffer_size = Some(size);
        self
    }

    pub fn event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = Some(size);
        self
    }

    pub fn resolve_related_queue(mut self, enabled: bool) -> Self {
        self.features.resolve_related_queue = enabled;
        self
    }

    pub fn enable_media_controls(mut self, enabled: bool) -> Self {
        self.features.enable_media_controls = enabled;
        self
    }

    pub fn offline_thumbnails(mut self, enabled: bool) -> Self {
        self.features.offline_thumbnails = enabled;
        self
    }

    pub fn restore_transfers(mut self, enabled: bool) -> Self {
        self.features.restore_transfers = enabled;
        self
    }

    pub fn features(mut self, features: FeatureFlags) -> Self {
        self.features = features;
        self
    }

    /// Builds the final `CoreConfig`, filling platform defaults and validating.
    pub fn build(self) -> Result<CoreConfig> {
        let data_dir = self.data_dir.ok_or_else(|| {
            Error::Config("Data directory is required. Use .data_dir() to set it.".to_string())
        })?;

        let catalog_client = self.catalog_client.ok_or_else(|| {
            Error::missing(
                "CatalogClient",
                "CatalogClient implementation is required to fetch stream formats and \
                 related items. Inject the host's catalog transport.",
            )
        })?;

        let playback_adapter = self.playback_adapter.ok_or_else(|| {
            Error::missing(
                "PlaybackAdapter",
                "PlaybackAdapter implementation is required to produce audio. \
                 Inject the platform media player.",
            )
        })?;

        let http_client = match self.http_client {
            Some(client) => client,
            None => provide_default_http_client()?,
        };

        let file_system = match self.file_system {
            Some(fs) => fs,
            None => provide_default_file_system(&data_dir)?,
        };

        let transfer_store = match self.transfer_store {
            Some(store) => store,
            None => provide_default_transfer_store(&data_dir)?,
        };

        let config = CoreConfig {
            data_dir,
            catalog_client,
            playback_adapter,
            http_client,
            file_system,
            transfer_store,
            media_controls: self.media_controls,
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
            max_concurrent_transfers: self
                .max_concurrent_transfers
                .unwrap_or(MAX_CONCURRENT_TRANSFERS),
            command_buffer_size: self.command_buffer_size.unwrap_or(DEFAULT_COMMAND_BUFFER),
            event_buffer_size: self.event_buffer_size.unwrap_or(DEFAULT_EVENT_BUFFER),
            features: self.features,
        };

        config.validate()?;

        Ok(config)
    }
}
