//! # SABERLINK Shared
//!
//! Common types used by every peer in the mesh.
//!
//! ## CRITICAL RULE
//!
//! This crate must NEVER depend on:
//! - a transport
//! - a renderer
//! - game logic
//!
//! Anything sent over the wire or compared between peers lives here.

#![deny(missing_docs)]
#![deny(unsafe_code)]

pub mod constants;
pub mod math;
pub mod protocol;

pub use math::{Aabb, Mat4, Quaternion, Transform, Vec3};
pub use protocol::{PeerId, PeerMessage, PlayerState, SabersMatrix};
