//! # Entities
//!
//! Builders for the game's entities. Each builder returns a plain
//! [`Entity`](saberlink_core::Entity) with its components attached; systems
//! decide where it lives in the scene.
//!
//! - `saber`: saber blades with colliders
//! - `rig`: pointer, XR and remote-player rigs
//! - `note` / `notes`: pooled note cubes and the runway container
//! - `floor`: the runway plane
//! - `stats_panel`: diagnostic panel shown in XR

pub mod floor;
pub mod note;
pub mod notes;
pub mod rig;
pub mod saber;
pub mod stats_panel;

pub use floor::spawn_floor;
pub use note::{NoteEntity, NoteFlight, NoteMotion};
pub use notes::NoteField;
pub use rig::{build_pointer_rig, build_xr_rig, ControllerComponent, RigHandle, XrRigHandle};
pub use saber::{spawn_saber, SaberComponent, SaberSide};
pub use stats_panel::{spawn_stats_panel, StatsDisplay};
