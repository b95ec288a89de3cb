//! # Game Systems
//!
//! Each system owns its entities and is updated once per frame in a fixed
//! order: rigs first (sabers publish their bounds), then beat saber (notes
//! test against those bounds), then stats.

pub mod beat_saber;
pub mod rig;
pub mod stats;

pub use beat_saber::{Assets, BeatSaberSystem, RunwayTimings};
pub use rig::{proxy_offset, RigSystem};
pub use stats::StatsSystem;
