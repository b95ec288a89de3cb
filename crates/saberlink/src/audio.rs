//! # Audio
//!
//! The backing track is an external collaborator. Gameplay only needs to know
//! when it can play through, and to start, pause and rewind it.

use thiserror::Error;

/// Asset loading errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AssetError {
    /// The asset will never become playable.
    #[error("audio track not playable: {0}")]
    NotPlayable(String),
}

/// Readiness of an asset, polled once per frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AssetState {
    /// Still loading.
    Pending,
    /// Can play through.
    Ready,
    /// Gave up.
    Failed(AssetError),
}

/// A music track.
pub trait AudioTrack {
    /// Loading progress.
    fn poll_ready(&mut self) -> AssetState;

    /// Starts or resumes playback.
    fn play(&mut self);

    /// Pauses playback.
    fn pause(&mut self);

    /// Seeks back to the start.
    fn rewind(&mut self);

    /// Whether the track is playing.
    fn is_playing(&self) -> bool;
}

/// Track that produces no sound and becomes ready after a number of polls.
#[derive(Clone, Debug, Default)]
pub struct SilentTrack {
    polls_until_ready: u32,
    failure: Option<AssetError>,
    playing: bool,
    plays: u32,
}

impl SilentTrack {
    /// Ready on the first poll.
    #[must_use]
    pub fn ready() -> Self {
        Self::default()
    }

    /// Ready after `polls` pending polls.
    #[must_use]
    pub fn loading(polls: u32) -> Self {
        Self {
            polls_until_ready: polls,
            ..Self::default()
        }
    }

    /// Never becomes ready.
    #[must_use]
    pub fn failing(reason: impl Into<String>) -> Self {
        Self {
            failure: Some(AssetError::NotPlayable(reason.into())),
            ..Self::default()
        }
    }

    /// Times playback was started.
    #[must_use]
    pub const fn plays(&self) -> u32 {
        self.plays
    }
}

impl AudioTrack for SilentTrack {
    fn poll_ready(&mut self) -> AssetState {
        if let Some(err) = &self.failure {
            return AssetState::Failed(err.clone());
        }
        if self.polls_until_ready > 0 {
            self.polls_until_ready -= 1;
            return AssetState::Pending;
        }
        AssetState::Ready
    }

    fn play(&mut self) {
        if !self.playing {
            self.plays += 1;
        }
        self.playing = true;
    }

    fn pause(&mut self) {
        self.playing = false;
    }

    fn rewind(&mut self) {}

    fn is_playing(&self) -> bool {
        self.playing
    }
}
