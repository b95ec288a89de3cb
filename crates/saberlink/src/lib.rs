//! # SABERLINK
//!
//! Cooperative rhythm game over a serverless peer mesh. Players cut notes
//! flying down a runway with two sabers while everyone else in the session
//! appears as a pair of proxy sabers beside them.
//!
//! ## Architecture
//!
//! ```text
//!  ┌──────────── Session::frame(delta) ────────────┐
//!  │                                               │
//!  │  MeshProtocol ── PlayerCache ──► Game         │
//!  │       ▲                          ├─ RigSystem │
//!  │       │                          ├─ BeatSaber │
//!  │       └── broadcast_player ◄─────┤  StatsSys. │
//!  │                                  └─ Renderer  │
//!  └───────────────────────────────────────────────┘
//! ```
//!
//! Renderer, XR runtime and audio sit behind traits ([`Renderer`],
//! [`XrDevice`], [`AudioTrack`]); the headless implementations here drive
//! tests and the `mesh_simulation` binary.
//!
//! ## Example
//!
//! ```rust,ignore
//! use saberlink::{Beatmap, Game, GameConfig, HeadlessRenderer, NoXr, Session, SilentTrack};
//! use saberlink_networking::{LoopbackNetwork, MeshConfig, MeshProtocol};
//!
//! let net = LoopbackNetwork::new();
//! let mesh = MeshProtocol::new(net.endpoint(), MeshConfig::default());
//! let game = Game::new(
//!     GameConfig::default(),
//!     Beatmap::from_json(include_str!("../assets/beatmap.json"))?,
//!     Box::new(HeadlessRenderer::new()),
//!     Box::new(NoXr),
//!     Box::new(SilentTrack::ready()),
//! )?;
//! let mut session = Session::new(mesh, game)?;
//! session.connect(&"friend".into())?;
//! session.toggle_ready();
//! loop {
//!     session.frame(1.0 / 60.0);
//! }
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]

pub mod audio;
pub mod beatmap;
pub mod config;
pub mod entities;
pub mod events;
pub mod game_loop;
pub mod render;
pub mod session;
pub mod systems;
pub mod xr;

pub use audio::{AssetError, AssetState, AudioTrack, SilentTrack};
pub use beatmap::{Beatmap, BeatmapError, CutDirection, NoteInfo, NoteSchedule, NoteType};
pub use config::{ConfigError, GameConfig, SaberlinkConfig};
pub use events::{EventBus, EventReceiver, EventSender, GameEvent};
pub use game_loop::{FrameStats, FrameStatsAccumulator, Game, GameError, XrRequest};
pub use render::{Camera, HeadlessRenderer, RenderInfo, Renderer};
pub use session::Session;
pub use systems::{BeatSaberSystem, RigSystem, StatsSystem};
pub use xr::{NoXr, SimulatedXr, XrDevice, XrError, XrMode};
