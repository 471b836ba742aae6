//! # Event Bus System
//!
//! Decoupled notifications for hosts (notification shade, download badges,
//! analytics) using `tokio::sync::broadcast`.
//!
//! ## Overview
//!
//! - **Event Types**: one enum per domain, wrapped by [`CoreEvent`]
//! - **EventBus**: cloneable broadcast sender
//! - **EventStream**: receiver wrapper with optional filtering
//!
//! ```text
//! ┌──────────────────┐  emit   ┌───────────┐  subscribe  ┌────────────────┐
//! │ Playback session ├────────>│           ├────────────>│ Notification UI│
//! └──────────────────┘         │ EventBus  │             └────────────────┘
//! ┌──────────────────┐  emit   │           │  subscribe  ┌────────────────┐
//! │ Transfer manager ├────────>│           ├────────────>│ Download badge │
//! └──────────────────┘         └───────────┘             └────────────────┘
//! ```
//!
//! The bus is an observation channel only. Session state changes flow through
//! the session's own command queue; nothing in the core reacts to bus events.
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{CoreEvent, EventBus, TransferEvent};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let bus = EventBus::new(64);
//! let mut rx = bus.subscribe();
//!
//! bus.emit(CoreEvent::Transfer(TransferEvent::Queued {
//!     track_id: "dQw4w9WgXcQ".to_string(),
//! }))
//! .ok();
//!
//! let event = rx.recv().await.unwrap();
//! assert_eq!(event.description(), "Transfer queued");
//! # }
//! ```
//!
//! ## Error Handling
//!
//! - **`RecvError::Lagged(n)`**: the subscriber missed `n` events; keep receiving.
//! - **`RecvError::Closed`**: every sender was dropped; treat as shutdown.

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

pub use tokio::sync::broadcast::error::{RecvError, SendError};
pub use tokio::sync::broadcast::Receiver;

/// Default buffer size for the event bus channel.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

// ============================================================================
// Core Event Types
// ============================================================================

/// Top-level event published on the bus.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    Playback(PlaybackEvent),
    Transfer(TransferEvent),
    Transport(TransportEvent),
}

impl CoreEvent {
    /// Returns a human-readable description of the event.
    pub fn description(&self) -> &str {
        match self {
            CoreEvent::Playback(e) => e.description(),
            CoreEvent::Transfer(e) => e.description(),
            CoreEvent::Transport(e) => e.description(),
        }
    }

    /// Returns the severity level of the event.
    pub fn severity(&self) -> EventSeverity {
        match self {
            CoreEvent::Playback(PlaybackEvent::Error { .. }) => EventSeverity::Error,
            CoreEvent::Transfer(TransferEvent::Failed { .. }) => EventSeverity::Error,
            CoreEvent::Playback(PlaybackEvent::QueueResolutionFailed { .. }) => {
                EventSeverity::Warning
            }
            CoreEvent::Playback(PlaybackEvent::Started { .. }) => EventSeverity::Info,
            CoreEvent::Transfer(TransferEvent::Completed { .. }) => EventSeverity::Info,
            _ => EventSeverity::Debug,
        }
    }
}

/// Event severity levels for filtering and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    Debug,
    Info,
    Warning,
    Error,
}

// ============================================================================
// Playback Events
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum PlaybackEvent {
    /// A stream lookup started for a track.
    Loading { track_id: String },
    /// The player received a new item and started it.
    Started { track_id: String, title: String },
    Paused { track_id: String, position_ms: u64 },
    Resumed { track_id: String, position_ms: u64 },
    /// The loaded item reached its natural end.
    Completed { track_id: String },
    /// The session queue was replaced.
    QueueUpdated {
        length: usize,
        index: usize,
        /// True when the queue came from a related-items lookup
        resolved: bool,
    },
    /// Related-items lookup failed; the session keeps a single-item queue.
    QueueResolutionFailed { seed_id: String, message: String },
    Error {
        track_id: Option<String>,
        message: String,
        recoverable: bool,
    },
    /// The session was closed and reset to idle.
    Closed,
}

impl PlaybackEvent {
    fn description(&self) -> &str {
        match self {
            PlaybackEvent::Loading { .. } => "Track loading",
            PlaybackEvent::Started { .. } => "Playback started",
            PlaybackEvent::Paused { .. } => "Playback paused",
            PlaybackEvent::Resumed { .. } => "Playback resumed",
            PlaybackEvent::Completed { .. } => "Track completed",
            PlaybackEvent::QueueUpdated { .. } => "Queue updated",
            PlaybackEvent::QueueResolutionFailed { .. } => "Queue resolution failed",
            PlaybackEvent::Error { .. } => "Playback error",
            PlaybackEvent::Closed => "Playback closed",
        }
    }
}

// ============================================================================
// Transfer Events
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum TransferEvent {
    Queued { track_id: String },
    /// A worker picked the job up; `offset` is non-zero when continuing a partial file.
    Started { track_id: String, offset: u64 },
    Completed {
        track_id: String,
        file_path: String,
        bytes: u64,
    },
    Failed {
        track_id: String,
        message: String,
        /// The source URL expired; a fresh URL is needed to resume
        needs_fresh_url: bool,
        bytes_transferred: u64,
    },
    Removed { track_id: String },
}

impl TransferEvent {
    fn description(&self) -> &str {
        match self {
            TransferEvent::Queued { .. } => "Transfer queued",
            TransferEvent::Started { .. } => "Transfer started",
            TransferEvent::Completed { .. } => "Transfer completed",
            TransferEvent::Failed { .. } => "Transfer failed",
            TransferEvent::Removed { .. } => "Transfer removed",
        }
    }

    pub fn track_id(&self) -> &str {
        match self {
            TransferEvent::Queued { track_id }
            | TransferEvent::Started { track_id, .. }
            | TransferEvent::Completed { track_id, .. }
            | TransferEvent::Failed { track_id, .. }
            | TransferEvent::Removed { track_id } => track_id,
        }
    }
}

// ============================================================================
// Transport Events
// ============================================================================

/// Signals raised by the OS-facing transport bridge.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum TransportEvent {
    PlayNextRequested,
    PlayPreviousRequested,
}

/// Name used by hosts that subscribe to next/previous requests only.
pub type TransportSignal = TransportEvent;

impl TransportEvent {
    fn description(&self) -> &str {
        match self {
            TransportEvent::PlayNextRequested => "Play next requested",
            TransportEvent::PlayPreviousRequested => "Play previous requested",
        }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Central event bus for publishing and subscribing to events.
///
/// Cloning the bus clones the sender; every clone publishes to the same
/// subscribers.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    /// Creates a new event bus buffering up to `capacity` events per subscriber.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of subscribers reached, or an error when nobody is
    /// listening. Publishers ignore that error.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    /// Creates a new subscriber. Past events are not replayed.
    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ============================================================================
// Event Stream Wrapper
// ============================================================================

type EventFilter = Box<dyn Fn(&CoreEvent) -> bool + Send + Sync>;

/// A `broadcast::Receiver` with an optional predicate.
///
/// ```rust
/// use core_runtime::events::{CoreEvent, EventBus, EventStream};
///
/// let bus = EventBus::new(16);
/// let transfers_only = EventStream::new(bus.subscribe())
///     .filter(|event| matches!(event, CoreEvent::Transfer(_)));
/// ```
pub struct EventStream {
    receiver: Receiver<CoreEvent>,
    filter: Option<EventFilter>,
}

impl EventStream {
    pub fn new(receiver: Receiver<CoreEvent>) -> Self {
        Self {
            receiver,
            filter: None,
        }
    }

    /// Only events matching `predicate` are returned by `recv()`.
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&CoreEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    fn accepts(&self, event: &CoreEvent) -> bool {
        self.filter.as_ref().map_or(true, |filter| filter(event))
    }

    /// Receives the next event that passes the filter.
    pub async fn recv(&mut self) -> Result<CoreEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;
            if self.accepts(&event) {
                return Ok(event);
            }
        }
    }

    /// Returns `None` when no matching event is currently buffered.
    pub fn try_recv(&mut self) -> Option<Result<CoreEvent, RecvError>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    if self.accepts(&event) {
                        return Some(Ok(event));
                    }
                }
                Err(broadcast::error::TryRecvError::Empty) => return None,
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    return Some(Err(RecvError::Lagged(n)))
                }
                Err(broadcast::error::TryRecvError::Closed) => return Some(Err(RecvError::Closed)),
            }
        }
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("has_filter", &self.filter.is_some())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
