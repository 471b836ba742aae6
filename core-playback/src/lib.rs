//! # Playback Queue & Transfer Engine
//!
//! The heart of the client: everything between "the user tapped a track" and
//! "audio is playing and the next one is lined up", plus offline downloads.
//!
//! ## Overview
//!
//! - [`format`]: pick one playable encoding out of the catalog's candidates
//! - [`resolver`]: turn a seed track into an "up next" queue
//! - [`queue`]: circular queue navigation
//! - [`session`]: the playback state machine, run as a single actor task
//! - [`transport`]: OS media controls in and out of the session
//! - [`transfer`]: resumable, concurrency-limited offline downloads
//!
//! Collaborators (catalog, player, HTTP, file system, persistence, media
//! controls) are `bridge-traits` objects injected at construction.

pub mod document;
pub mod error;
pub mod format;
pub mod models;
pub mod queue;
pub mod resolver;
pub mod session;
pub mod transfer;
pub mod transport;

pub use error::{PlaybackError, Result};
pub use format::{select_stream, StreamNegotiator};
pub use models::{StreamDescriptor, Track, TrackId};
pub use queue::{Direction, PlaybackQueue};
pub use resolver::QueueResolver;
pub use session::{SessionController, SessionHandle, SessionSnapshot, TransportState};
pub use transfer::{TransferConfig, TransferJob, TransferManager, TransferProgress, TransferRequest};
pub use transport::TransportBridge;
