//! # Scene Graph
//!
//! Arena-backed stand-in for the renderer's object tree.
//!
//! Nodes are addressed by generational [`NodeId`]s so a handle to a despawned
//! node can never alias a newer one. Every game object owns exactly one node;
//! the renderer only ever reads this structure.

mod graph;
mod mesh;
mod node;

pub use graph::{SceneGraph, SceneStats};
pub use mesh::{Geometry, Material, Mesh, Shape};
pub use node::NodeId;
