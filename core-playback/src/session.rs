//! # Playback Session
//!
//! The session is a single actor task that owns the current track, the queue
//! and the player. Everything that mutates it arrives as a [`SessionCommand`]
//! on one `mpsc` channel and is handled to completion before the next one:
//! user requests, hardware transport signals, player feedback, and the results
//! of background stream/queue lookups.
//!
//! ## Lookups
//!
//! Stream negotiation and queue resolution run as spawned tasks. They post
//! their outcome back through the command channel tagged with the load
//! `generation` (stream lookups) or session `epoch` (queue lookups). A result
//! whose tag no longer matches is stale and dropped, which covers rapid skips,
//! a new unrelated play action and `close()`.
//!
//! ## Observation
//!
//! Hosts read state through a `tokio::sync::watch` channel carrying a
//! [`SessionSnapshot`]; discrete notifications also go to the [`EventBus`].
//!
//! ```text
//!  SessionHandle ──┐
//!  TransportBridge ├──> mpsc<SessionCommand> ──> SessionController ──> watch<SessionSnapshot>
//!  lookup tasks  ──┘                                   │
//!                                                      └──> PlaybackAdapter
//! ```

use crate::error::{PlaybackError, Result};
use crate::format::StreamNegotiator;
use crate::models::{StreamDescriptor, Track, TrackId};
use crate::queue::{Direction, PlaybackQueue};
use crate::resolver::QueueResolver;
use bridge_traits::{PlaybackAdapter, PlaybackRequest, PlayerEvent};
use core_runtime::events::{CoreEvent, EventBus, PlaybackEvent, TransportEvent};
use core_runtime::logging::redact_url;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, error, info, instrument, warn};

/// Default capacity of the session command channel.
pub const DEFAULT_COMMAND_BUFFER: usize = 64;

/// Visible transport state of the session.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum TransportState {
    #[default]
    Idle,
    Loading,
    Ready,
    Error {
        message: String,
    },
}

impl TransportState {
    pub fn is_idle(&self) -> bool {
        matches!(self, TransportState::Idle)
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, TransportState::Ready)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, TransportState::Error { .. })
    }
}

/// Everything a host needs to render the player.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct SessionSnapshot {
    pub state: TransportState,
    pub current_track: Option<Track>,
    pub queue: Vec<Track>,
    pub queue_index: Option<usize>,
    pub playing: bool,
    pub buffering: bool,
    pub position: Duration,
    pub duration: Option<Duration>,
    pub can_skip: bool,
}

pub(crate) enum SessionCommand {
    PlayFresh {
        track: Track,
    },
    PlayFromList {
        tracks: Vec<Track>,
        start_index: usize,
        shuffle: bool,
        respond: oneshot::Sender<Result<()>>,
    },
    PlayQueueIndex {
        index: usize,
        respond: oneshot::Sender<Result<()>>,
    },
    Advance(Direction),
    Transport(TransportEvent),
    Seek(f64),
    Play,
    Pause,
    Toggle,
    Retry,
    Close,
    Player(PlayerEvent),
    StreamResolved {
        generation: u64,
        track_id: TrackId,
        result: Result<StreamDescriptor>,
    },
    QueueResolved {
        epoch: u64,
        seed: TrackId,
        result: Result<Vec<Track>>,
    },
}

/// Cloneable front door to a running session.
#[derive(Clone)]
pub struct SessionHandle {
    commands: mpsc::Sender<SessionCommand>,
    snapshots: watch::Receiver<SessionSnapshot>,
}

impl SessionHandle {
    async fn send(&self, command: SessionCommand) -> Result<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| PlaybackError::SessionClosed)
    }

    async fn request(
        &self,
        build: impl FnOnce(oneshot::Sender<Result<()>>) -> SessionCommand,
    ) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.send(build(tx)).await?;
        rx.await.map_err(|_| PlaybackError::SessionClosed)?
    }

    /// Play a track known only by id and resolve its related queue.
    pub async fn play_fresh(
        &self,
        track_id: impl Into<TrackId>,
        thumbnail_hint: Option<String>,
    ) -> Result<()> {
        self.play_track(Track::placeholder(track_id, thumbnail_hint))
            .await
    }

    /// Play a track whose metadata is already known and resolve its related queue.
    pub async fn play_track(&self, track: Track) -> Result<()> {
        self.send(SessionCommand::PlayFresh { track }).await
    }

    /// Replace the queue with `tracks` without any related-items lookup.
    pub async fn play_from_list(
        &self,
        tracks: Vec<Track>,
        start_index: usize,
        shuffle: bool,
    ) -> Result<()> {
        if tracks.is_empty() {
            return Err(PlaybackError::EmptyQueue);
        }
        self.request(|respond| SessionCommand::PlayFromList {
            tracks,
            start_index,
            shuffle,
            respond,
        })
        .await
    }

    /// Play the member of the current queue at `index`.
    pub async fn play_queue_index(&self, index: usize) -> Result<()> {
        self.request(|respond| SessionCommand::PlayQueueIndex { index, respond })
            .await
    }

    pub async fn advance(&self, direction: Direction) -> Result<()> {
        self.send(SessionCommand::Advance(direction)).await
    }

    pub async fn next(&self) -> Result<()> {
        self.advance(Direction::Next).await
    }

    pub async fn previous(&self) -> Result<()> {
        self.advance(Direction::Previous).await
    }

    /// Seek to `fraction` of the known duration, clamped to `[0, 1]`.
    pub async fn seek(&self, fraction: f64) -> Result<()> {
        self.send(SessionCommand::Seek(fraction)).await
    }

    pub async fn play(&self) -> Result<()> {
        self.send(SessionCommand::Play).await
    }

    pub async fn pause(&self) -> Result<()> {
        self.send(SessionCommand::Pause).await
    }

    pub async fn toggle(&self) -> Result<()> {
        self.send(SessionCommand::Toggle).await
    }

    /// Reload the current track after an error.
    pub async fn retry(&self) -> Result<()> {
        self.send(SessionCommand::Retry).await
    }

    /// Stop output, release the player and reset to idle.
    pub async fn close(&self) -> Result<()> {
        self.send(SessionCommand::Close).await
    }

    /// Deliver feedback from the host player.
    pub async fn report_player_event(&self, event: PlayerEvent) -> Result<()> {
        self.send(SessionCommand::Player(event)).await
    }

    /// Deliver a hardware next/previous signal.
    pub async fn send_transport_signal(&self, signal: TransportEvent) -> Result<()> {
        self.send(SessionCommand::Transport(signal)).await
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshots.clone()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshots.borrow().clone()
    }

    /// Wait until a snapshot satisfies `predicate`.
    pub async fn wait_for(
        &self,
        predicate: impl FnMut(&SessionSnapshot) -> bool,
    ) -> Result<SessionSnapshot> {
        let mut rx = self.snapshots.clone();
        let snapshot = rx
            .wait_for(predicate)
            .await
            .map_err(|_| PlaybackError::SessionClosed)?;
        Ok(snapshot.clone())
    }
}

/// Actor owning the session state. Build it, then [`spawn`](Self::spawn) it.
pub struct SessionController {
    negotiator: StreamNegotiator,
    resolver: QueueResolver,
    player: Arc<dyn PlaybackAdapter>,
    event_bus: Option<EventBus>,
    command_buffer: usize,
    resolve_related_queue: bool,

    commands: Option<mpsc::WeakSender<SessionCommand>>,
    snapshots: Option<watch::Sender<SessionSnapshot>>,

    state: TransportState,
    current: Option<Track>,
    /// Advance target still being fetched; `current` stays on screen until it loads.
    pending: Option<Track>,
    queue: Option<PlaybackQueue>,
    playing: bool,
    buffering: bool,
    position: Duration,
    duration: Option<Duration>,

    generation: u64,
    epoch: u64,
    load_in_flight: bool,
    ended_handled: bool,
}

impl SessionController {
    pub fn new(
        negotiator: StreamNegotiator,
        resolver: QueueResolver,
        player: Arc<dyn PlaybackAdapter>,
    ) -> Self {
        Self {
            negotiator,
            resolver,
            player,
            event_bus: None,
            command_buffer: DEFAULT_COMMAND_BUFFER,
            resolve_related_queue: true,
            commands: None,
            snapshots: None,
            state: TransportState::Idle,
            current: None,
            pending: None,
            queue: None,
            playing: false,
            buffering: false,
            position: Duration::ZERO,
            duration: None,
            generation: 0,
            epoch: 0,
            load_in_flight: false,
            ended_handled: false,
        }
    }

    pub fn with_event_bus(mut self, event_bus: EventBus) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    pub fn with_command_buffer(mut self, size: usize) -> Self {
        self.command_buffer = size.max(1);
        self
    }

    /// When disabled, `play_fresh` keeps a single-item queue.
    pub fn with_queue_resolution(mut self, enabled: bool) -> Self {
        self.resolve_related_queue = enabled;
        self
    }

    /// Start the actor on the current tokio runtime.
    ///
    /// The actor stops once every [`SessionHandle`] has been dropped, including
    /// the one held by a running [`TransportBridge`](crate::TransportBridge).
    pub fn spawn(mut self) -> SessionHandle {
        let (commands_tx, commands_rx) = mpsc::channel(self.command_buffer);
        let (snapshots_tx, snapshots_rx) = watch::channel(SessionSnapshot::default());

        self.commands = Some(commands_tx.downgrade());
        self.snapshots = Some(snapshots_tx);

        tokio::spawn(self.run(commands_rx));

        SessionHandle {
            commands: commands_tx,
            snapshots: snapshots_rx,
        }
    }

    async fn run(mut self, mut commands: mpsc::Receiver<SessionCommand>) {
        info!("Playback session started");
        while let Some(command) = commands.recv().await {
            self.handle(command).await;
            self.publish();
        }
        if self.current.is_some() {
            self.release_player().await;
        }
        info!("Playback session stopped");
    }

    async fn handle(&mut self, command: SessionCommand) {
        match command {
            SessionCommand::PlayFresh { track } => self.play_fresh(track),
            SessionCommand::PlayFromList {
                tracks,
                start_index,
                shuffle,
                respond,
            } => {
                let result = self.play_from_list(tracks, start_index, shuffle);
                let _ = respond.send(result);
            }
            SessionCommand::PlayQueueIndex { index, respond } => {
                let result = self.play_queue_index(index);
                let _ = respond.send(result);
            }
            SessionCommand::Advance(direction) => self.advance(direction).await,
            SessionCommand::Transport(signal) => {
                debug!(?signal, "Transport signal received");
                let direction = match signal {
                    TransportEvent::PlayNextRequested => Direction::Next,
                    TransportEvent::PlayPreviousRequested => Direction::Previous,
                };
                self.advance(direction).await;
            }
            SessionCommand::Seek(fraction) => self.seek(fraction).await,
            SessionCommand::Play => self.resume().await,
            SessionCommand::Pause => self.pause().await,
            SessionCommand::Toggle => {
                if self.playing {
                    self.pause().await
                } else {
                    self.resume().await
                }
            }
            SessionCommand::Retry => self.retry(),
            SessionCommand::Close => self.close().await,
            SessionCommand::Player(event) => self.on_player_event(event).await,
            SessionCommand::StreamResolved {
                generation,
                track_id,
                result,
            } => self.on_stream_resolved(generation, track_id, result).await,
            SessionCommand::QueueResolved {
                epoch,
                seed,
                result,
            } => self.on_queue_resolved(epoch, seed, result),
        }
    }

    // ------------------------------------------------------------------
    // User commands
    // ------------------------------------------------------------------

    fn play_fresh(&mut self, track: Track) {
        if let Some(index) = self
            .queue
            .as_ref()
            .and_then(|queue| queue.position_of(&track.id))
        {
            debug!(track_id = %track.id, index, "Track already queued, reusing queue");
            let _ = self.play_queue_index(index);
            return;
        }

        self.epoch += 1;
        self.queue = Some(PlaybackQueue::single(track.clone()));
        self.begin_load(track.clone(), true);

        if self.resolve_related_queue {
            self.spawn_queue_lookup(track.id);
        }
    }

    fn play_from_list(&mut self, tracks: Vec<Track>, start_index: usize, shuffle: bool) -> Result<()> {
        let queue = if shuffle {
            shuffled_queue(tracks, start_index)?
        } else {
            PlaybackQueue::new(tracks, start_index)?
        };

        self.epoch += 1;
        let track = queue.current().clone();
        self.emit(PlaybackEvent::QueueUpdated {
            length: queue.len(),
            index: queue.index(),
            resolved: false,
        });
        self.queue = Some(queue);
        self.begin_load(track, true);
        Ok(())
    }

    fn play_queue_index(&mut self, index: usize) -> Result<()> {
        let queue = self.queue.as_mut().ok_or(PlaybackError::EmptyQueue)?;
        queue.set_index(index)?;
        let track = queue.current().clone();
        self.begin_load(track, true);
        Ok(())
    }

    async fn advance(&mut self, direction: Direction) {
        let Some(queue) = self.queue.as_mut() else {
            debug!(?direction, "Advance ignored without a queue");
            return;
        };

        if !queue.can_skip() {
            debug!("Single-item queue, restarting current track");
            self.restart_current().await;
            return;
        }

        // Stepping from the committed index makes rapid skips compose in
        // arrival order; stale lookups are dropped by generation.
        let target = queue.index_after(direction);
        if let Err(e) = queue.set_index(target) {
            warn!(error = %e, "Advance target out of range");
            return;
        }
        let track = queue.current().clone();
        debug!(?direction, index = target, track_id = %track.id, "Advancing");
        self.begin_load(track, false);
    }

    async fn restart_current(&mut self) {
        if !self.state.is_ready() {
            if let Some(track) = self.current.clone() {
                self.begin_load(track, false);
            }
            return;
        }
        self.position = Duration::ZERO;
        self.ended_handled = false;
        if let Err(e) = self.player.seek(Duration::ZERO).await {
            warn!(error = %e, "Player rejected restart seek");
        }
        if !self.playing {
            self.resume().await;
        }
    }

    async fn seek(&mut self, fraction: f64) {
        let Some(duration) = self.known_duration() else {
            debug!("Seek ignored without a known duration");
            return;
        };
        let fraction = if fraction.is_finite() {
            fraction.clamp(0.0, 1.0)
        } else {
            0.0
        };
        let target = duration.mul_f64(fraction);
        match self.player.seek(target).await {
            Ok(()) => self.position = target,
            Err(e) => warn!(error = %e, "Player rejected seek"),
        }
    }

    async fn resume(&mut self) {
        if !self.state.is_ready() {
            return;
        }
        match self.player.play().await {
            Ok(()) => {
                self.playing = true;
                if let Some(track_id) = self.current_id() {
                    self.emit(PlaybackEvent::Resumed {
                        track_id,
                        position_ms: self.position.as_millis() as u64,
                    });
                }
            }
            Err(e) => warn!(error = %e, "Player rejected play"),
        }
    }

    async fn pause(&mut self) {
        if !self.state.is_ready() {
            return;
        }
        match self.player.pause().await {
            Ok(()) => {
                self.playing = false;
                if let Some(track_id) = self.current_id() {
                    self.emit(PlaybackEvent::Paused {
                        track_id,
                        position_ms: self.position.as_millis() as u64,
                    });
                }
            }
            Err(e) => warn!(error = %e, "Player rejected pause"),
        }
    }

    fn retry(&mut self) {
        if !self.state.is_error() {
            debug!("Retry ignored outside the error state");
            return;
        }
        if let Some(track) = self.current.clone() {
            info!(track_id = %track.id, "Retrying track");
            self.begin_load(track, true);
        }
    }

    async fn close(&mut self) {
        info!("Closing playback session");
        self.generation += 1;
        self.epoch += 1;
        self.load_in_flight = false;
        self.ended_handled = false;

        if let Err(e) = self.player.stop().await {
            warn!(error = %e, "Player stop failed");
        }
        self.release_player().await;

        self.state = TransportState::Idle;
        self.current = None;
        self.pending = None;
        self.queue = None;
        self.playing = false;
        self.buffering = false;
        self.position = Duration::ZERO;
        self.duration = None;
        self.emit(PlaybackEvent::Closed);
    }

    async fn release_player(&self) {
        if let Err(e) = self.player.release().await {
            warn!(error = %e, "Player release failed");
        }
    }

    // ------------------------------------------------------------------
    // Loading
    // ------------------------------------------------------------------

    /// Start a stream lookup for `track`, superseding any in-flight one.
    ///
    /// Without `show_loading`, a ready track keeps playing and stays current
    /// until the target's stream is in the player.
    fn begin_load(&mut self, track: Track, show_loading: bool) {
        self.generation += 1;
        self.load_in_flight = true;
        self.ended_handled = false;

        self.emit(PlaybackEvent::Loading {
            track_id: track.id.to_string(),
        });
        self.spawn_stream_lookup(track.id.clone());

        if !show_loading && self.state.is_ready() && self.current.is_some() {
            self.pending = Some(track);
            return;
        }

        if show_loading {
            self.state = TransportState::Loading;
            self.playing = false;
        }
        self.pending = None;
        self.swap_in(track);
    }

    fn swap_in(&mut self, track: Track) {
        self.buffering = false;
        self.position = Duration::ZERO;
        self.duration = track.duration_hint();
        self.current = Some(track);
    }

    fn spawn_stream_lookup(&self, track_id: TrackId) {
        let Some(commands) = self.commands.as_ref().and_then(|weak| weak.upgrade()) else {
            return;
        };
        let negotiator = self.negotiator.clone();
        let generation = self.generation;

        tokio::spawn(async move {
            let result = negotiator.resolve(&track_id).await;
            let _ = commands
                .send(SessionCommand::StreamResolved {
                    generation,
                    track_id,
                    result,
                })
                .await;
        });
    }

    fn spawn_queue_lookup(&self, seed: TrackId) {
        let Some(commands) = self.commands.as_ref().and_then(|weak| weak.upgrade()) else {
            return;
        };
        let resolver = self.resolver.clone();
        let epoch = self.epoch;

        tokio::spawn(async move {
            let result = resolver.resolve(&seed).await;
            let _ = commands
                .send(SessionCommand::QueueResolved {
                    epoch,
                    seed,
                    result,
                })
                .await;
        });
    }

    #[instrument(skip(self, track_id, result), fields(track_id = %track_id))]
    async fn on_stream_resolved(
        &mut self,
        generation: u64,
        track_id: TrackId,
        result: Result<StreamDescriptor>,
    ) {
        if generation != self.generation || self.loading_id().as_deref() != Some(track_id.as_str())
        {
            debug!(generation, current = self.generation, "Discarding stale stream lookup");
            return;
        }
        self.load_in_flight = false;
        if let Some(track) = self.pending.take() {
            self.swap_in(track);
        }

        let descriptor = match result {
            Ok(descriptor) => descriptor,
            Err(e) => {
                self.fail(e.to_string(), e.is_transient());
                return;
            }
        };

        let Some(track) = self.current.clone() else {
            return;
        };
        debug!(url = %redact_url(&descriptor.url), itag = descriptor.itag, "Loading stream");

        let request = PlaybackRequest::new(descriptor.url, descriptor.mime_type)
            .with_content_length(descriptor.content_length)
            .with_metadata(track.playback_metadata());

        if let Err(e) = self.player.load(request).await {
            self.fail(format!("Player failed to load stream: {}", e), true);
            return;
        }
        if let Err(e) = self.player.play().await {
            self.fail(format!("Player failed to start: {}", e), true);
            return;
        }

        self.state = TransportState::Ready;
        self.playing = true;
        info!(title = %track.title, "Playback started");
        self.emit(PlaybackEvent::Started {
            track_id: track.id.to_string(),
            title: track.title,
        });
    }

    fn on_queue_resolved(&mut self, epoch: u64, seed: TrackId, result: Result<Vec<Track>>) {
        if epoch != self.epoch || self.state.is_idle() {
            debug!(seed = %seed, "Discarding stale queue lookup");
            return;
        }
        let Some(current) = self.pending.clone().or_else(|| self.current.clone()) else {
            return;
        };

        match result {
            Ok(mut tracks) => {
                let index = match tracks.iter().position(|track| track.id == current.id) {
                    Some(index) => index,
                    None => {
                        tracks.insert(0, current.clone());
                        0
                    }
                };
                let queue = match PlaybackQueue::new(tracks, index) {
                    Ok(queue) => queue,
                    Err(e) => {
                        warn!(error = %e, "Resolved queue rejected");
                        return;
                    }
                };

                // The resolved entry carries richer metadata than a placeholder.
                let mut resolved = queue.current().clone();
                if resolved.thumbnail_url.is_none() {
                    resolved.thumbnail_url = current.thumbnail_url;
                }
                if self.pending.is_some() {
                    self.pending = Some(resolved);
                } else {
                    if self.duration.is_none() {
                        self.duration = resolved.duration_hint();
                    }
                    self.current = Some(resolved);
                }

                info!(seed = %seed, length = queue.len(), index, "Queue replaced");
                self.emit(PlaybackEvent::QueueUpdated {
                    length: queue.len(),
                    index,
                    resolved: true,
                });
                self.queue = Some(queue);
            }
            Err(e) => {
                warn!(seed = %seed, error = %e, "Queue resolution failed, keeping single track");
                self.queue = Some(PlaybackQueue::single(current));
                self.emit(PlaybackEvent::QueueResolutionFailed {
                    seed_id: seed.to_string(),
                    message: e.to_string(),
                });
            }
        }
    }

    async fn on_player_event(&mut self, event: PlayerEvent) {
        match event {
            PlayerEvent::Buffering(buffering) => self.buffering = buffering,
            PlayerEvent::Playing(playing) => self.playing = playing,
            // Feedback from the outgoing item while an advance is pending
            PlayerEvent::Position(_) | PlayerEvent::Duration(_) if self.pending.is_some() => {}
            PlayerEvent::Position(position) => self.position = position,
            PlayerEvent::Duration(duration) => {
                if !duration.is_zero() {
                    self.duration = Some(duration);
                }
            }
            PlayerEvent::Ended => {
                if self.load_in_flight || self.ended_handled || !self.state.is_ready() {
                    debug!("Ignoring end-of-stream for a superseded item");
                    return;
                }
                self.ended_handled = true;
                self.playing = false;
                if let Some(track_id) = self.current_id() {
                    self.emit(PlaybackEvent::Completed { track_id });
                }
                self.advance(Direction::Next).await;
            }
            PlayerEvent::Failed(message) => {
                if self.load_in_flight {
                    debug!(%message, "Ignoring player failure for a superseded item");
                    return;
                }
                self.fail(message, true);
            }
        }
    }

    // ------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------

    fn fail(&mut self, message: String, recoverable: bool) {
        error!(%message, "Playback failed");
        self.state = TransportState::Error {
            message: message.clone(),
        };
        self.playing = false;
        self.buffering = false;
        self.emit(PlaybackEvent::Error {
            track_id: self.current_id(),
            message,
            recoverable,
        });
    }

    fn known_duration(&self) -> Option<Duration> {
        self.duration
            .or_else(|| self.current.as_ref().and_then(Track::duration_hint))
            .filter(|duration| !duration.is_zero())
    }

    fn current_id(&self) -> Option<String> {
        self.current.as_ref().map(|track| track.id.to_string())
    }

    /// Id of the track whose stream is being negotiated, if any.
    fn loading_id(&self) -> Option<String> {
        self.pending
            .as_ref()
            .or(self.current.as_ref())
            .map(|track| track.id.to_string())
    }

    fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            state: self.state.clone(),
            current_track: self.current.clone(),
            queue: self
                .queue
                .as_ref()
                .map(|queue| queue.tracks().to_vec())
                .unwrap_or_default(),
            queue_index: self.queue.as_ref().map(PlaybackQueue::index),
            playing: self.playing,
            buffering: self.buffering,
            position: self.position,
            duration: self.duration,
            can_skip: self.queue.as_ref().is_some_and(PlaybackQueue::can_skip),
        }
    }

    fn publish(&self) {
        let Some(snapshots) = self.snapshots.as_ref() else {
            return;
        };
        let next = self.snapshot();
        snapshots.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
    }

    fn emit(&self, event: PlaybackEvent) {
        if let Some(bus) = &self.event_bus {
            let _ = bus.emit(CoreEvent::Playback(event));
        }
    }
}

fn shuffled_queue(tracks: Vec<Track>, start_index: usize) -> Result<PlaybackQueue> {
    let mut rng = rand::thread_rng();
    PlaybackQueue::shuffled(tracks, start_index, &mut rng)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_snapshot_is_idle() {
        let snapshot = SessionSnapshot::default();
        assert!(snapshot.state.is_idle());
        assert!(snapshot.current_track.is_none());
        assert!(snapshot.queue_index.is_none());
        assert!(!snapshot.can_skip);
    }

    #[test]
    fn test_transport_state_serializes_tagged() {
        let json = serde_json::to_value(TransportState::Error {
            message: "boom".into(),
        })
        .unwrap();
        assert_eq!(json["state"], "error");
        assert_eq!(json["message"], "boom");
    }
}
