//! # Transport Bridge
//!
//! Connects the OS media-control surface (lock screen, notification shade,
//! headset buttons) to the playback session in both directions:
//!
//! - button presses arrive on an `mpsc` channel handed to the OS adapter and
//!   become session commands; next/previous are raised as
//!   [`TransportEvent`] signals on the event bus as well
//! - session snapshots are mirrored back onto the surface

use crate::models::{Track, TrackId};
use crate::session::{SessionHandle, SessionSnapshot};
use bridge_traits::{EnabledButtons, MediaButton, MediaControlSurface, NowPlaying, SurfaceStatus};
use core_runtime::events::{CoreEvent, EventBus, TransportEvent};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

const BUTTON_BUFFER: usize = 16;
const TIMELINE_STEP: Duration = Duration::from_secs(1);

pub struct TransportBridge {
    surface: Arc<dyn MediaControlSurface>,
    session: SessionHandle,
    event_bus: Option<EventBus>,
    buttons_tx: mpsc::Sender<MediaButton>,
    buttons_rx: mpsc::Receiver<MediaButton>,
}

impl TransportBridge {
    pub fn new(surface: Arc<dyn MediaControlSurface>, session: SessionHandle) -> Self {
        let (buttons_tx, buttons_rx) = mpsc::channel(BUTTON_BUFFER);
        Self {
            surface,
            session,
            event_bus: None,
            buttons_tx,
            buttons_rx,
        }
    }

    pub fn with_event_bus(mut self, event_bus: EventBus) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    /// Sender for the OS adapter to deliver button presses on.
    ///
    /// Obtain every sender before calling [`start`](Self::start).
    pub fn button_sender(&self) -> mpsc::Sender<MediaButton> {
        self.buttons_tx.clone()
    }

    /// Spawn the bridge loop. It runs until aborted or the session shuts down.
    ///
    /// The loop owns a [`SessionHandle`], so the session actor outlives every
    /// other handle while it runs. Abort the returned task to let it stop.
    pub fn start(self) -> JoinHandle<()> {
        let Self {
            surface,
            session,
            event_bus,
            buttons_tx,
            mut buttons_rx,
        } = self;
        drop(buttons_tx);

        tokio::spawn(async move {
            if let Err(e) = surface.set_enabled_buttons(EnabledButtons::all()) {
                warn!(error = %e, "Failed to enable media buttons");
            }

            let relay = ButtonRelay { session: session.clone(), event_bus };
            let mut mirror = SurfaceMirror::new(surface);
            let mut snapshots = session.subscribe();
            mirror.apply(&snapshots.borrow_and_update().clone());

            let mut buttons_open = true;
            info!("Transport bridge started");
            loop {
                tokio::select! {
                    button = buttons_rx.recv(), if buttons_open => match button {
                        Some(button) => relay.dispatch(button).await,
                        None => {
                            debug!("Media button channel closed");
                            buttons_open = false;
                        }
                    },
                    changed = snapshots.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        let snapshot = snapshots.borrow_and_update().clone();
                        mirror.apply(&snapshot);
                    }
                }
            }
            mirror.clear();
            info!("Transport bridge stopped");
        })
    }
}

struct ButtonRelay {
    session: SessionHandle,
    event_bus: Option<EventBus>,
}

impl ButtonRelay {
    async fn dispatch(&self, button: MediaButton) {
        debug!(?button, "Media button pressed");
        let result = match button {
            MediaButton::Play => self.session.play().await,
            MediaButton::Pause => self.session.pause().await,
            MediaButton::Toggle => self.session.toggle().await,
            MediaButton::Stop => self.session.close().await,
            MediaButton::Next => self.signal(TransportEvent::PlayNextRequested).await,
            MediaButton::Previous => self.signal(TransportEvent::PlayPreviousRequested).await,
            MediaButton::SeekTo(position) => {
                let duration = self.session.snapshot().duration;
                match duration.filter(|d| !d.is_zero()) {
                    Some(duration) => {
                        let fraction = position.as_secs_f64() / duration.as_secs_f64();
                        self.session.seek(fraction).await
                    }
                    None => Ok(()),
                }
            }
        };
        if let Err(e) = result {
            warn!(?button, error = %e, "Media button could not be delivered");
        }
    }

    async fn signal(&self, signal: TransportEvent) -> crate::Result<()> {
        if let Some(bus) = &self.event_bus {
            let _ = bus.emit(CoreEvent::Transport(signal));
        }
        self.session.send_transport_signal(signal).await
    }
}

/// Last values pushed to the surface, so unchanged fields are not re-sent.
struct SurfaceMirror {
    surface: Arc<dyn MediaControlSurface>,
    now_playing: Option<(TrackId, NowPlaying)>,
    status: Option<SurfaceStatus>,
    timeline: Option<(Duration, Duration)>,
}

impl SurfaceMirror {
    fn new(surface: Arc<dyn MediaControlSurface>) -> Self {
        Self {
            surface,
            now_playing: None,
            status: None,
            timeline: None,
        }
    }

    fn apply(&mut self, snapshot: &SessionSnapshot) {
        let Some(track) = snapshot.current_track.as_ref() else {
            if self.now_playing.is_some() || self.status.is_some() {
                self.clear();
            }
            return;
        };

        let now_playing = now_playing(track, snapshot.duration);
        let changed = self
            .now_playing
            .as_ref()
            .map_or(true, |(id, sent)| id != &track.id || sent != &now_playing);
        if changed {
            if let Err(e) = self.surface.update_metadata(&now_playing) {
                warn!(error = %e, "Failed to update media metadata");
            }
            self.now_playing = Some((track.id.clone(), now_playing));
            self.timeline = None;
        }

        let status = if snapshot.playing {
            SurfaceStatus::Playing
        } else {
            SurfaceStatus::Paused
        };
        if self.status != Some(status) {
            if let Err(e) = self.surface.set_playback_status(status) {
                warn!(error = %e, "Failed to update playback status");
            }
            self.status = Some(status);
        }

        if let Some(duration) = snapshot.duration {
            let due = self.timeline.map_or(true, |(position, sent_duration)| {
                sent_duration != duration || distance(position, snapshot.position) >= TIMELINE_STEP
            });
            if due {
                if let Err(e) = self.surface.set_timeline(snapshot.position, duration) {
                    warn!(error = %e, "Failed to update timeline");
                }
                self.timeline = Some((snapshot.position, duration));
            }
        }
    }

    fn clear(&mut self) {
        if let Err(e) = self.surface.clear() {
            warn!(error = %e, "Failed to clear media controls");
        }
        self.now_playing = None;
        self.status = None;
        self.timeline = None;
    }
}

fn distance(a: Duration, b: Duration) -> Duration {
    if a > b {
        a - b
    } else {
        b - a
    }
}

fn now_playing(track: &Track, duration: Option<Duration>) -> NowPlaying {
    NowPlaying {
        title: track.title.clone(),
        artist: track.author.clone(),
        artwork_url: track.thumbnail_url.clone(),
        duration: duration.or_else(|| track.duration_hint()),
    }
}
