//! OS media-control surface (lock screen, notification, headset buttons).
//!
//! Button presses travel the other way as [`MediaButton`] values over a channel
//! handed to the host adapter; the surface trait is only used to mirror state.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::Result;

/// A press on a hardware or system media control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MediaButton {
    Play,
    Pause,
    Toggle,
    Stop,
    Next,
    Previous,
    SeekTo(Duration),
}

/// Now-playing metadata shown by the OS.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NowPlaying {
    pub title: String,
    pub artist: String,
    pub artwork_url: Option<String>,
    pub duration: Option<Duration>,
}

/// Which controls the OS should present as enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnabledButtons {
    pub play_pause: bool,
    pub next: bool,
    pub previous: bool,
    pub seek: bool,
}

impl EnabledButtons {
    pub fn all() -> Self {
        Self {
            play_pause: true,
            next: true,
            previous: true,
            seek: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceStatus {
    Playing,
    Paused,
    Stopped,
}

/// Media-control surface exposed by the host OS.
pub trait MediaControlSurface: Send + Sync {
    fn update_metadata(&self, now_playing: &NowPlaying) -> Result<()>;

    fn set_playback_status(&self, status: SurfaceStatus) -> Result<()>;

    fn set_timeline(&self, position: Duration, duration: Duration) -> Result<()>;

    fn set_enabled_buttons(&self, buttons: EnabledButtons) -> Result<()>;

    /// Remove the now-playing entry entirely.
    fn clear(&self) -> Result<()>;
}
