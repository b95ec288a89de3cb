//! # Game Events
//!
//! Systems never call each other. Whatever one system learns that another
//! (or the frame loop) must react to travels through a bounded channel and
//! is drained once per frame, after every system has updated.
//!
//! ```text
//! ┌──────────────┐  NoteHit      ┌─────────────┐
//! │ note collider│──────────────>│             │
//! └──────────────┘               │   Event     │      ┌────────────┐
//! ┌──────────────┐  AssetsReady  │   Channel   │─────>│ frame loop │
//! │ BeatSaber    │──────────────>│             │      └────────────┘
//! └──────────────┘               └─────────────┘
//! ```

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use saberlink_core::EntityId;

/// Events drained by the frame loop.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GameEvent {
    // =========================================================================
    // Lifecycle
    // =========================================================================
    /// Every system finished initialization.
    Initialized,

    /// The track can play through; notes and floor exist.
    AssetsReady,

    /// The track will never load. Gameplay stays idle.
    AssetFailed(String),

    // =========================================================================
    // Gameplay
    // =========================================================================
    /// A saber intersected a flying note.
    NoteHit {
        /// Note entity.
        note: EntityId,
        /// Saber entity.
        saber: EntityId,
    },

    /// A beat wanted a note but the pool had none left.
    PoolExhausted {
        /// Whole beat being spawned.
        beat: u32,
    },

    /// Beatmap playback started.
    PlayStarted,

    /// Beatmap playback stopped and every note was recalled.
    PlayStopped,

    // =========================================================================
    // Presentation
    // =========================================================================
    /// XR presentation started (`true`) or ended (`false`).
    XrPresentChanged(bool),
}

/// Bounded event channel.
pub struct EventBus {
    sender: Sender<GameEvent>,
    receiver: Receiver<GameEvent>,
}

impl EventBus {
    /// Creates a bus.
    ///
    /// # Arguments
    ///
    /// * `capacity` - Events in flight before sends start failing
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = bounded(capacity);
        Self { sender, receiver }
    }

    /// Creates a sender handle.
    #[must_use]
    pub fn sender(&self) -> EventSender {
        EventSender {
            sender: self.sender.clone(),
        }
    }

    /// Creates a receiver handle.
    #[must_use]
    pub fn receiver(&self) -> EventReceiver {
        EventReceiver {
            receiver: self.receiver.clone(),
        }
    }
}

/// Handle for sending events.
#[derive(Clone, Debug)]
pub struct EventSender {
    sender: Sender<GameEvent>,
}

impl EventSender {
    /// Sends an event without blocking.
    ///
    /// Returns `false` if the channel is full or closed. The event is lost.
    #[inline]
    pub fn send(&self, event: GameEvent) -> bool {
        match self.sender.try_send(event) {
            Ok(()) => true,
            Err(TrySendError::Full(event)) => {
                tracing::warn!(?event, "event channel full, event dropped");
                false
            }
            Err(TrySendError::Disconnected(_)) => false,
        }
    }
}

/// Handle for receiving events.
#[derive(Clone, Debug)]
pub struct EventReceiver {
    receiver: Receiver<GameEvent>,
}

impl EventReceiver {
    /// Takes every pending event, oldest first.
    #[inline]
    pub fn drain(&self) -> Vec<GameEvent> {
        self.receiver.try_iter().collect()
    }

    /// Takes one event.
    #[inline]
    pub fn try_recv(&self) -> Option<GameEvent> {
        self.receiver.try_recv().ok()
    }

    /// Number of pending events.
    #[inline]
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.receiver.len()
    }
}
