//! Session state and the events the mesh reports to the frame loop.

use saberlink_shared::PeerId;
use std::fmt;

/// Local session state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// Not part of any session.
    #[default]
    Disconnected,
    /// Dials are pending but no connection has opened yet.
    Connecting,
    /// Part of a session, not everyone is ready.
    Connected,
    /// Local peer and every member are ready.
    AllReady,
    /// The game is running. Sticky until stopped or disconnected.
    Playing,
}

impl SessionState {
    /// States in which new connections are refused.
    #[must_use]
    pub const fn is_locked(self) -> bool {
        matches!(self, Self::AllReady | Self::Playing)
    }

    /// States with an active session.
    #[must_use]
    pub const fn is_active(self) -> bool {
        !matches!(self, Self::Disconnected)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::AllReady => "all-ready",
            Self::Playing => "playing",
        };
        f.write_str(name)
    }
}

/// Live connection to one member.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Connection {
    /// Remote identity.
    pub peer: PeerId,
    /// Last readiness the member announced.
    pub ready: bool,
    /// Mesh frame at which the connection opened.
    pub opened_frame: u64,
}

/// Something the frame loop may want to react to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MeshEvent {
    /// The transport assigned our identity.
    IdAssigned(PeerId),
    /// A member joined.
    PeerJoined(PeerId),
    /// A member left.
    PeerLeft(PeerId),
    /// A member announced a readiness change.
    ReadinessChanged {
        /// Member.
        peer: PeerId,
        /// New readiness.
        ready: bool,
    },
    /// The all-ready predicate flipped.
    AllReadyChanged(bool),
    /// The session state changed.
    StateChanged {
        /// Previous state.
        from: SessionState,
        /// New state.
        to: SessionState,
    },
    /// A dial failed or timed out. The peer never became a member.
    ConnectionFailed {
        /// Dialed peer.
        peer: PeerId,
        /// Human-readable cause.
        reason: String,
    },
    /// A connection was refused because the session is locked.
    ConnectionRefused(PeerId),
}
