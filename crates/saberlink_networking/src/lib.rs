//! # SABERLINK Networking - Peer Mesh
//!
//! Serverless session layer: every player connects to every other player and
//! the mesh is formed by gossip from a single pairwise dial.
//!
//! ## Architecture
//!
//! - **Transport**: [`PeerTransport`], a queue of connection events plus
//!   `connect`/`send`/`close`. [`LoopbackTransport`] runs it in process.
//! - **Codec**: JSON messages tagged by `type`
//! - **Mesh**: [`MeshProtocol`], membership, readiness and the session
//!   state machine
//! - **Players**: [`PlayerCache`], the latest snapshot per member
//!
//! ```text
//!            ┌──────── poll(delta) once per frame ────────┐
//!            ▼                                            │
//!   PeerTransport ──events──► MeshProtocol ──MeshEvent──► frame loop
//!            ▲                    │
//!            └──── send/close ────┘
//! ```
//!
//! Nothing here spawns threads. The mesh runs entirely inside the frame
//! callback, so membership and player state never change mid-frame.
//!
//! ## Example
//!
//! ```rust,ignore
//! use saberlink_networking::{LoopbackNetwork, MeshConfig, MeshProtocol};
//!
//! let net = LoopbackNetwork::new();
//! let mut mesh = MeshProtocol::new(net.endpoint(), MeshConfig::default());
//! mesh.connect(&"friend".into())?;
//! for event in mesh.poll(1.0 / 60.0) {
//!     println!("{event:?}");
//! }
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]

pub mod codec;
pub mod error;
pub mod mesh;
pub mod transport;

pub use error::{CodecError, MeshError, TransportError};
pub use mesh::{
    Connection, MeshConfig, MeshEvent, MeshProtocol, MeshStats, PlayerCache, RemotePlayer,
    SessionState,
};
pub use transport::{
    IceState, LoopbackNetwork, LoopbackTransport, PeerTransport, TransportEvent, TransportStats,
};
