//! # Playback Error Types
//!
//! Errors raised by format negotiation, queue resolution, the playback session
//! and the transfer manager.

use bridge_traits::BridgeError;
use thiserror::Error;

/// Errors that can occur during playback and transfer operations.
#[derive(Error, Debug)]
pub enum PlaybackError {
    // ========================================================================
    // Stream / Queue Resolution Errors
    // ========================================================================
    /// No audio-only encoding was offered for the track.
    #[error("No playable audio format for track {0}")]
    NoPlayableFormat(String),

    /// The related-items document did not expose a container id for the seed.
    #[error("No queue container id found for seed track {0}")]
    QueueIdNotFound(String),

    /// Queue resolution produced no usable tracks.
    #[error("Resolved queue is empty")]
    EmptyQueue,

    /// Network or transport failure while fetching formats or queue documents.
    #[error("Stream fetch failed: {0}")]
    StreamFetchFailed(String),

    // ========================================================================
    // Transfer Errors
    // ========================================================================
    /// The server answered a download with a non-success status.
    #[error("Transfer failed with HTTP status {status}")]
    TransferHttpError { status: u16 },

    /// The body ended before the declared length, or overran it.
    #[error("Transfer incomplete: received {received} of {expected} bytes")]
    TransferIncomplete { expected: u64, received: u64 },

    /// The source URL stopped authorizing requests mid-transfer.
    #[error("Source URL expired (HTTP {status})")]
    UrlExpired { status: u16 },

    #[error("No transfer job for track {0}")]
    TransferNotFound(String),

    // ========================================================================
    // Session Errors
    // ========================================================================
    /// The host player rejected a command.
    #[error("Player error: {0}")]
    Player(String),

    /// The session command loop is no longer running.
    #[error("Playback session is closed")]
    SessionClosed,

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    // ========================================================================
    // Infrastructure Errors
    // ========================================================================
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Bridge error: {0}")]
    Bridge(#[from] BridgeError),
}

impl PlaybackError {
    /// Returns `true` if retrying the same operation may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            PlaybackError::StreamFetchFailed(_) | PlaybackError::TransferIncomplete { .. } => true,
            PlaybackError::TransferHttpError { status } => *status >= 500 || *status == 429,
            PlaybackError::Bridge(err) => err.is_network(),
            _ => false,
        }
    }

    /// Returns `true` when only a freshly issued source URL can fix the failure.
    pub fn needs_fresh_url(&self) -> bool {
        matches!(self, PlaybackError::UrlExpired { .. })
    }

    /// Map a transport failure from the catalog into the playback taxonomy.
    pub(crate) fn fetch_failed(err: BridgeError) -> Self {
        PlaybackError::StreamFetchFailed(err.to_string())
    }
}

/// Result type for playback operations.
pub type Result<T> = std::result::Result<T, PlaybackError>;
