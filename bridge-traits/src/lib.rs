//! # Host Bridge Traits
//!
//! Contracts between the playback/transfer engine and the host platform.
//!
//! ## Overview
//!
//! Each trait is a capability the core needs but cannot provide itself. Desktop
//! implementations live in `bridge-desktop`; mobile hosts inject their own.
//!
//! ## Traits
//!
//! ### Remote catalog
//! - [`CatalogClient`](catalog::CatalogClient) - Candidate encodings and related-items documents
//!
//! ### Networking & I/O
//! - [`HttpClient`](http::HttpClient) - Buffered requests and streamed, range-aware downloads
//! - [`FileSystemAccess`](storage::FileSystemAccess) - Offline storage with resumable writes
//! - [`TransferRecordStore`](persistence::TransferRecordStore) - Transfer job bookkeeping
//!
//! ### Platform Integration
//! - [`PlaybackAdapter`](playback::PlaybackAdapter) - Single-item native player
//! - [`MediaControlSurface`](media_controls::MediaControlSurface) - Lock screen / headset controls
//!
//! ### Utilities
//! - [`Clock`](time::Clock) - Time source for deterministic testing
//! - [`LoggerSink`](time::LoggerSink) - Forward structured logs to host logging
//!
//! ## Error Handling
//!
//! All bridge traits use [`BridgeError`](error::BridgeError). Implementations
//! should convert platform errors and keep context such as paths and statuses.
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` so they can be shared as
//! `Arc<dyn Trait>` across tasks.

pub mod catalog;
pub mod error;
pub mod http;
pub mod media_controls;
pub mod persistence;
pub mod playback;
pub mod storage;
pub mod time;

pub use error::BridgeError;

pub use catalog::{CatalogClient, RawFormat, RelatedItemsQuery};
pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse, StreamingResponse};
pub use media_controls::{EnabledButtons, MediaButton, MediaControlSurface, NowPlaying, SurfaceStatus};
pub use persistence::{TransferRecord, TransferRecordStore, TransferStatus};
pub use playback::{PlaybackAdapter, PlaybackMetadata, PlaybackRequest, PlayerEvent};
pub use storage::{FileMetadata, FileSystemAccess};
pub use time::{Clock, FixedClock, LogEntry, LogLevel, LoggerSink, SystemClock};
