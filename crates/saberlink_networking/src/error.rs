//! # Networking Error Types
//!
//! Transport, codec and mesh errors. None of these ever escape the frame
//! loop: the mesh logs them and carries on.

use saberlink_shared::PeerId;
use thiserror::Error;

/// Errors raised by a [`PeerTransport`](crate::transport::PeerTransport).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// No peer with this id is reachable.
    #[error("peer unavailable: {0}")]
    PeerUnavailable(PeerId),

    /// There is no open connection to this peer.
    #[error("not connected to peer {0}")]
    NotConnected(PeerId),

    /// Another endpoint already uses this identity.
    #[error("peer id already taken: {0}")]
    IdTaken(PeerId),

    /// The transport has not been assigned an identity yet.
    #[error("transport has no identity yet")]
    NoIdentity,

    /// The underlying network is gone.
    #[error("transport closed")]
    Closed,
}

/// Errors raised while encoding or decoding wire messages.
#[derive(Error, Debug)]
pub enum CodecError {
    /// Payload is not a valid message.
    #[error("malformed message: {0}")]
    Malformed(#[from] serde_json::Error),

    /// Payload exceeds the maximum message size.
    #[error("message too large: {size} bytes (max {max})")]
    TooLarge {
        /// Payload size.
        size: usize,
        /// Allowed size.
        max: usize,
    },
}

/// Errors returned by [`MeshProtocol`](crate::mesh::MeshProtocol) operations.
#[derive(Error, Debug)]
pub enum MeshError {
    /// Transport refused the operation.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A message could not be encoded.
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// Dialing our own identity.
    #[error("cannot connect to self ({0})")]
    SelfConnect(PeerId),
}
