//! # Offline Transfer Module
//!
//! Downloads tracks for offline playback without blocking the session.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────┐
//! │     TransferManager                    │
//! │  - submit() / resume() / remove()      │
//! │  - progress() / jobs() / stats()       │
//! │  - restore()                           │
//! └────────┬───────────────────────────────┘
//!          │
//!          ├──> HttpClient (streamed, ranged downloads)
//!          ├──> FileSystemAccess (resumable writes)
//!          ├──> TransferRecordStore (one record per job)
//!          └──> ThumbnailFetcher (JPEG artwork)
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use core_playback::transfer::{TransferManager, TransferRequest};
//!
//! let job = manager.submit(TransferRequest::for_track(&track, &stream)).await?;
//!
//! // The source URL expired half way through; get a new one and continue.
//! let fresh = negotiator.resolve(&track.id).await?;
//! manager.resume(&track.id, fresh.url).await?;
//! ```

pub mod config;
pub mod job;
pub mod manager;
pub mod progress;
pub mod thumbnail;

pub use config::{TransferConfig, MAX_CONCURRENT_TRANSFERS};
pub use job::{destination_path, extension_for_mime, TransferJob, TransferRequest};
pub use manager::TransferManager;
pub use progress::{TransferProgress, TransferStats};
pub use thumbnail::ThumbnailFetcher;

pub use bridge_traits::TransferStatus;
