//! Circular playback queue.

use crate::error::{PlaybackError, Result};
use crate::models::{Track, TrackId};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Skip direction for [`PlaybackQueue::index_after`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Next,
    Previous,
}

/// Ordered, never-empty list of tracks with a current index.
///
/// The index is always in `[0, len)`; navigation wraps in both directions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaybackQueue {
    tracks: Vec<Track>,
    index: usize,
}

impl PlaybackQueue {
    /// Build a queue positioned at `start_index` (clamped into range).
    pub fn new(tracks: Vec<Track>, start_index: usize) -> Result<Self> {
        if tracks.is_empty() {
            return Err(PlaybackError::EmptyQueue);
        }
        let index = start_index.min(tracks.len() - 1);
        Ok(Self { tracks, index })
    }

    /// Move the start track to the front, shuffle the remainder.
    pub fn shuffled<R: Rng + ?Sized>(
        mut tracks: Vec<Track>,
        start_index: usize,
        rng: &mut R,
    ) -> Result<Self> {
        if tracks.is_empty() {
            return Err(PlaybackError::EmptyQueue);
        }
        let start = tracks.remove(start_index.min(tracks.len() - 1));
        tracks.shuffle(rng);
        tracks.insert(0, start);
        Ok(Self { tracks, index: 0 })
    }

    pub fn single(track: Track) -> Self {
        Self {
            tracks: vec![track],
            index: 0,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// Index reached by one step in `direction` from the current index.
    pub fn index_after(&self, direction: Direction) -> usize {
        self.step_from(self.index, direction)
    }

    /// Index reached by one step in `direction` from `from`.
    pub fn step_from(&self, from: usize, direction: Direction) -> usize {
        let len = self.tracks.len();
        let from = from % len;
        match direction {
            Direction::Next => (from + 1) % len,
            Direction::Previous => (from + len - 1) % len,
        }
    }

    pub fn set_index(&mut self, index: usize) -> Result<()> {
        if index >= self.tracks.len() {
            return Err(PlaybackError::InvalidArgument(format!(
                "queue index {} out of range (len {})",
                index,
                self.tracks.len()
            )));
        }
        self.index = index;
        Ok(())
    }

    pub fn current(&self) -> &Track {
        &self.tracks[self.index]
    }

    pub fn get(&self, index: usize) -> Option<&Track> {
        self.tracks.get(index)
    }

    pub fn position_of(&self, track_id: &TrackId) -> Option<usize> {
        self.tracks.iter().position(|track| &track.id == track_id)
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    /// Always `false`; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn can_skip(&self) -> bool {
        self.tracks.len() > 1
    }
}
