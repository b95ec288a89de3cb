//! # Transport Layer
//!
//! The peer connection surface the mesh protocol is written against.
//!
//! ## Design
//!
//! - One transport instance per local peer, owned by the mesh
//! - Reliable, ordered delivery per connection
//! - Events are queued and drained once per frame, never pushed via callbacks
//!
//! Signalling and ICE negotiation stay inside the implementation; the mesh
//! only sees the resulting events.

mod loopback;

pub use loopback::{LoopbackNetwork, LoopbackTransport};

use crate::error::TransportError;
use saberlink_shared::PeerId;

/// ICE connection state as reported by the transport.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IceState {
    /// Gathering candidates.
    New,
    /// Checking candidate pairs.
    Checking,
    /// A usable pair was found.
    Connected,
    /// All checks finished.
    Completed,
    /// Connectivity lost, may recover.
    Disconnected,
    /// No usable pair.
    Failed,
    /// Shut down.
    Closed,
}

/// Event reported by a transport.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransportEvent {
    /// The local identity is known.
    IdAssigned(PeerId),
    /// A remote peer is dialing us.
    Incoming(PeerId),
    /// A connection is open in both directions.
    Open(PeerId),
    /// A connection was closed by either end.
    Close(PeerId),
    /// Payload received on a connection.
    Data(PeerId, Vec<u8>),
    /// ICE progress on a connection.
    IceStateChanged(PeerId, IceState),
    /// A connection failed.
    Error(PeerId, TransportError),
}

/// Transport statistics.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TransportStats {
    /// Messages sent.
    pub messages_sent: u64,
    /// Messages received.
    pub messages_received: u64,
    /// Bytes sent.
    pub bytes_sent: u64,
    /// Bytes received.
    pub bytes_received: u64,
    /// Send errors.
    pub send_errors: u64,
    /// Dials started.
    pub dials: u64,
}

/// A peer-to-peer transport.
pub trait PeerTransport {
    /// Local identity, once assigned.
    fn local_id(&self) -> Option<&PeerId>;

    /// Starts dialing a peer. Completion is reported as an event.
    ///
    /// # Errors
    ///
    /// The dial could not even be started.
    fn connect(&mut self, peer: &PeerId) -> Result<(), TransportError>;

    /// Sends a payload on an open connection.
    ///
    /// # Errors
    ///
    /// No open connection to `peer`.
    fn send(&mut self, peer: &PeerId, payload: &[u8]) -> Result<(), TransportError>;

    /// Closes the connection (or pending dial) to a peer. No-op if none.
    fn close(&mut self, peer: &PeerId);

    /// Next queued event, if any.
    fn poll_event(&mut self) -> Option<TransportEvent>;

    /// Statistics.
    fn stats(&self) -> TransportStats {
        TransportStats::default()
    }
}
