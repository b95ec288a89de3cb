//! # Game Loop
//!
//! ```text
//! Frame N:
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │ 1. BEGIN FRAME                                                      │
//! │    └─ Clamp delta, bump the frame counter                           │
//! │                                                                     │
//! │ 2. XR TRANSITION                                                    │
//! │    ├─ Fan out on_xr_present to every system                         │
//! │    └─ Point note colliders at the newly active sabers               │
//! │                                                                     │
//! │ 3. SYSTEMS                                                          │
//! │    ├─ Rig: controller poses, camera, remote proxies                 │
//! │    ├─ Beat saber: asset gate, note spawning, note flight            │
//! │    └─ Stats: renderer counters                                      │
//! │                                                                     │
//! │ 4. EVENTS                                                           │
//! │    └─ Note hits score, asset results end loading                    │
//! │                                                                     │
//! │ 5. RENDER                                                           │
//! │    └─ Hand scene and camera to the renderer                         │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The frame returns the local player's snapshot for the session to
//! broadcast.

use std::time::{Duration, Instant};

use crate::audio::AudioTrack;
use crate::beatmap::Beatmap;
use crate::config::{ConfigError, GameConfig};
use crate::events::{EventBus, EventReceiver, GameEvent};
use crate::render::Renderer;
use crate::systems::{Assets, BeatSaberSystem, RigSystem, StatsSystem};
use crate::xr::{preferred_mode, XrDevice, XrError, XrMode};
use saberlink_core::{CoreError, FrameContext, SceneGraph, System};
use saberlink_networking::PlayerCache;
use saberlink_shared::PlayerState;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Target frame time for 60 FPS.
pub const TARGET_FRAME_TIME: Duration = Duration::from_micros(16_666);

/// Game setup errors.
#[derive(Error, Debug)]
pub enum GameError {
    /// Configuration out of range.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Initial entities could not be placed in the scene.
    #[error("scene setup failed: {0}")]
    Scene(#[from] CoreError),
}

/// Outcome of [`Game::request_xr_session`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum XrRequest {
    /// A session was active and has been ended.
    Ended,
    /// A session was requested in this mode.
    Requested(XrMode),
    /// The device supports no immersive mode. Nothing happened.
    Unavailable,
}

/// Timing of one frame.
#[derive(Clone, Copy, Debug, Default)]
pub struct FrameStats {
    /// Frame number.
    pub frame: u64,
    /// System updates in microseconds.
    pub systems_us: u64,
    /// Render call in microseconds.
    pub render_us: u64,
    /// Whole frame in microseconds.
    pub total_us: u64,
    /// Events drained this frame.
    pub events_processed: u32,
}

/// Accumulator for frame statistics.
#[derive(Clone, Debug)]
pub struct FrameStatsAccumulator {
    /// Frames recorded.
    pub frames_recorded: u64,
    /// Sum of frame times.
    pub total_us_sum: u64,
    /// Sum of system update times.
    pub systems_us_sum: u64,
    /// Sum of render times.
    pub render_us_sum: u64,
    /// Shortest frame.
    pub min_frame_us: u64,
    /// Longest frame.
    pub max_frame_us: u64,
    /// Frames longer than [`TARGET_FRAME_TIME`].
    pub frames_over_budget: u64,
}

impl FrameStatsAccumulator {
    /// Creates an empty accumulator.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            frames_recorded: 0,
            total_us_sum: 0,
            systems_us_sum: 0,
            render_us_sum: 0,
            min_frame_us: u64::MAX,
            max_frame_us: 0,
            frames_over_budget: 0,
        }
    }

    /// Records one frame.
    pub fn record(&mut self, stats: FrameStats) {
        self.frames_recorded += 1;
        self.total_us_sum += stats.total_us;
        self.systems_us_sum += stats.systems_us;
        self.render_us_sum += stats.render_us;
        self.min_frame_us = self.min_frame_us.min(stats.total_us);
        self.max_frame_us = self.max_frame_us.max(stats.total_us);

        if stats.total_us > TARGET_FRAME_TIME.as_micros() as u64 {
            self.frames_over_budget += 1;
        }
    }

    /// Average frame time in milliseconds.
    #[must_use]
    pub fn avg_frame_ms(&self) -> f64 {
        if self.frames_recorded == 0 {
            return 0.0;
        }
        (self.total_us_sum as f64 / self.frames_recorded as f64) / 1000.0
    }

    /// Share of frames over budget.
    #[must_use]
    pub fn over_budget_ratio(&self) -> f64 {
        if self.frames_recorded == 0 {
            return 0.0;
        }
        self.frames_over_budget as f64 / self.frames_recorded as f64
    }

    /// Logs a summary.
    pub fn log_summary(&self) {
        info!(
            frames = self.frames_recorded,
            avg_ms = format_args!("{:.3}", self.avg_frame_ms()),
            min_us = if self.frames_recorded == 0 { 0 } else { self.min_frame_us },
            max_us = self.max_frame_us,
            over_budget = format_args!("{:.1}%", self.over_budget_ratio() * 100.0),
            "frame statistics"
        );
    }
}

impl Default for FrameStatsAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

struct Systems {
    rig: RigSystem,
    beat_saber: BeatSaberSystem,
    stats: Option<StatsSystem>,
}

impl Systems {
    fn for_each(&mut self, mut visit: impl FnMut(&mut dyn System)) {
        visit(&mut self.rig);
        visit(&mut self.beat_saber);
        if let Some(stats) = self.stats.as_mut() {
            visit(stats);
        }
    }
}

/// The game: scene, systems and the collaborators they draw through.
pub struct Game {
    config: GameConfig,
    scene: SceneGraph,
    renderer: Box<dyn Renderer>,
    xr: Box<dyn XrDevice>,
    /// Beatmap and track until `init()` hands them to the beat saber system.
    pending: Option<(Beatmap, Box<dyn AudioTrack>)>,
    systems: Option<Systems>,
    bus: EventBus,
    events: EventReceiver,
    running: bool,
    loading: bool,
    presenting: bool,
    frame: u64,
    stats: FrameStatsAccumulator,
    last_frame: FrameStats,
}

impl Game {
    /// Creates a game. Nothing is in the scene until [`Game::init`].
    ///
    /// # Errors
    ///
    /// Out-of-range configuration.
    pub fn new(
        config: GameConfig,
        beatmap: Beatmap,
        mut renderer: Box<dyn Renderer>,
        xr: Box<dyn XrDevice>,
        track: Box<dyn AudioTrack>,
    ) -> Result<Self, GameError> {
        config.validate()?;
        let bus = EventBus::new(config.event_capacity);
        let events = bus.receiver();
        let [width, height] = config.viewport;
        renderer.set_size(width, height);

        Ok(Self {
            config,
            scene: SceneGraph::new(),
            renderer,
            xr,
            pending: Some((beatmap, track)),
            systems: None,
            bus,
            events,
            running: false,
            loading: true,
            presenting: false,
            frame: 0,
            stats: FrameStatsAccumulator::new(),
            last_frame: FrameStats::default(),
        })
    }

    /// Builds every system and emits [`GameEvent::Initialized`]. A second
    /// call does nothing.
    ///
    /// # Errors
    ///
    /// Scene setup failures.
    pub fn init(&mut self) -> Result<(), GameError> {
        let Some((beatmap, track)) = self.pending.take() else {
            return Ok(());
        };
        let [width, height] = self.config.viewport;
        let aspect = if height == 0 { 1.0 } else { width as f32 / height as f32 };

        let rig = RigSystem::new(&mut self.scene, aspect)?;
        let mut beat_saber = BeatSaberSystem::new(&self.config, beatmap, track, self.bus.sender());
        beat_saber.set_sabers(rig.sabers());
        let stats = self
            .config
            .stats_enabled
            .then(|| StatsSystem::new(&mut self.scene, self.config.stats_log_interval));

        self.systems = Some(Systems {
            rig,
            beat_saber,
            stats,
        });
        self.bus.sender().send(GameEvent::Initialized);
        info!(stats = self.config.stats_enabled, "game initialized");
        Ok(())
    }

    /// Starts running frames.
    pub fn start(&mut self) {
        if !self.running {
            self.running = true;
            info!("game loop started");
        }
    }

    /// Stops running frames and stops playback.
    pub fn stop(&mut self) {
        if self.running {
            self.running = false;
            self.stop_playing();
            info!("game loop stopped");
        }
    }

    /// Whether frames run.
    #[must_use]
    pub const fn is_running(&self) -> bool {
        self.running
    }

    /// Starts beatmap playback.
    ///
    /// # Returns
    ///
    /// False before `init()`, while assets load, or when already playing.
    pub fn play(&mut self) -> bool {
        self.systems
            .as_mut()
            .is_some_and(|systems| systems.beat_saber.play())
    }

    /// Stops beatmap playback.
    pub fn stop_playing(&mut self) {
        if let Some(systems) = self.systems.as_mut() {
            systems.beat_saber.stop(&mut self.scene);
        }
    }

    /// Whether the beatmap is playing.
    #[must_use]
    pub fn is_playing(&self) -> bool {
        self.systems.as_ref().is_some_and(|s| s.beat_saber.is_playing())
    }

    /// Resizes the output and updates the camera aspect.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.renderer.set_size(width, height);
        if let Some(systems) = self.systems.as_mut() {
            systems.rig.camera_mut().set_viewport(width, height);
        }
    }

    /// Pointer movement in pixels, for looking around outside XR.
    pub fn pointer_motion(&mut self, dx: f32, dy: f32) {
        if let Some(systems) = self.systems.as_mut() {
            systems.rig.pointer_look(&mut self.scene, dx, dy);
        }
    }

    /// Ends an active XR session, or requests one in the preferred mode.
    ///
    /// # Errors
    ///
    /// The device declined the request.
    pub fn request_xr_session(&mut self) -> Result<XrRequest, XrError> {
        if self.xr.has_session() {
            self.xr.end_session();
            info!("xr session ended");
            return Ok(XrRequest::Ended);
        }
        let Some(mode) = preferred_mode(self.xr.as_ref()) else {
            debug!("no immersive mode supported");
            return Ok(XrRequest::Unavailable);
        };
        if let Err(err) = self.xr.request_session(mode) {
            warn!(%err, ?mode, "xr session request failed");
            return Err(err);
        }
        info!(?mode, "xr session requested");
        Ok(XrRequest::Requested(mode))
    }

    /// True until the track is ready or has failed.
    #[must_use]
    pub const fn is_loading(&self) -> bool {
        self.loading
    }

    /// Whether the XR rig is active.
    #[must_use]
    pub const fn is_presenting(&self) -> bool {
        self.presenting
    }

    /// Local score.
    #[must_use]
    pub fn score(&self) -> u32 {
        self.systems.as_ref().map_or(0, |s| s.beat_saber.score())
    }

    /// Frames run since creation.
    #[must_use]
    pub const fn frame_count(&self) -> u64 {
        self.frame
    }

    /// Accumulated frame timings.
    #[must_use]
    pub const fn frame_stats(&self) -> &FrameStatsAccumulator {
        &self.stats
    }

    /// Timing of the last frame.
    #[must_use]
    pub const fn last_frame(&self) -> FrameStats {
        self.last_frame
    }

    /// The scene.
    #[must_use]
    pub const fn scene(&self) -> &SceneGraph {
        &self.scene
    }

    /// Rig system, after `init()`.
    #[must_use]
    pub fn rig(&self) -> Option<&RigSystem> {
        self.systems.as_ref().map(|s| &s.rig)
    }

    /// Beat saber system, after `init()`.
    #[must_use]
    pub fn beat_saber(&self) -> Option<&BeatSaberSystem> {
        self.systems.as_ref().map(|s| &s.beat_saber)
    }

    /// Stats system, when enabled.
    #[must_use]
    pub fn stats_system(&self) -> Option<&StatsSystem> {
        self.systems.as_ref().and_then(|s| s.stats.as_ref())
    }

    /// Runs one frame.
    ///
    /// # Arguments
    ///
    /// * `delta` - Seconds since the previous frame, clamped to the
    ///   configured maximum
    /// * `players` - Remote player snapshots to mirror as proxy rigs
    ///
    /// # Returns
    ///
    /// The local player snapshot, or `None` while stopped or before
    /// `init()`.
    pub fn frame(&mut self, delta: f32, players: &PlayerCache) -> Option<PlayerState> {
        if !self.running {
            return None;
        }
        let systems = self.systems.as_mut()?;
        let started = Instant::now();
        let delta = delta.clamp(0.0, self.config.max_frame_delta);
        self.frame += 1;

        let presenting = self.xr.is_presenting();
        if presenting != self.presenting {
            self.presenting = presenting;
            systems.for_each(|system| system.on_xr_present(&mut self.scene, presenting));
            systems.beat_saber.set_sabers(systems.rig.sabers());
            self.bus.sender().send(GameEvent::XrPresentChanged(presenting));
        }
        if presenting {
            systems
                .rig
                .set_controller_poses([self.xr.controller_pose(0), self.xr.controller_pose(1)]);
        }

        let mut ctx = FrameContext {
            scene: &mut self.scene,
            delta,
            frame: self.frame,
        };
        systems.rig.update(&mut ctx);
        systems.rig.reconcile(ctx.scene, players);
        systems.beat_saber.update(&mut ctx);
        if let Some(stats) = systems.stats.as_mut() {
            stats.record(self.renderer.info());
            stats.update(&mut ctx);
        }
        let systems_done = Instant::now();

        let mut events_processed = 0;
        for event in self.events.drain() {
            events_processed += 1;
            match event {
                GameEvent::NoteHit { note, saber } => {
                    if systems.beat_saber.register_hit(&mut self.scene, note) {
                        debug!(%note, %saber, score = systems.beat_saber.score(), "note cut");
                    }
                }
                GameEvent::AssetsReady | GameEvent::AssetFailed(_) => self.loading = false,
                GameEvent::XrPresentChanged(presenting) => info!(presenting, "xr presentation changed"),
                GameEvent::Initialized
                | GameEvent::PoolExhausted { .. }
                | GameEvent::PlayStarted
                | GameEvent::PlayStopped => {}
            }
        }
        debug_assert!(
            systems.beat_saber.assets() == Assets::Loading || !self.loading,
            "loading flag out of sync with assets"
        );

        let state = systems.beat_saber.player_state(&self.scene);

        let render_started = Instant::now();
        self.renderer.render(&self.scene, systems.rig.camera());
        let finished = Instant::now();

        self.last_frame = FrameStats {
            frame: self.frame,
            systems_us: systems_done.duration_since(started).as_micros() as u64,
            render_us: finished.duration_since(render_started).as_micros() as u64,
            total_us: finished.duration_since(started).as_micros() as u64,
            events_processed,
        };
        self.stats.record(self.last_frame);
        Some(state)
    }

    /// Stops everything, ends any XR session and disposes every system.
    pub fn dispose(&mut self) {
        self.stop();
        if self.xr.has_session() {
            self.xr.end_session();
        }
        if let Some(mut systems) = self.systems.take() {
            systems.for_each(|system| system.dispose(&mut self.scene));
        }
        self.stats.log_summary();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::SilentTrack;
    use crate::beatmap::{CutDirection, NoteInfo, NoteType};
    use crate::render::HeadlessRenderer;
    use crate::xr::{NoXr, SimulatedXr};

    const DT: f32 = 1.0 / 60.0;

    fn beatmap(notes: Vec<NoteInfo>) -> Beatmap {
        Beatmap { bpm: 60.0, notes }
    }

    fn game(xr: Box<dyn XrDevice>, notes: Vec<NoteInfo>) -> Game {
        let config = GameConfig {
            stats_enabled: true,
            ..GameConfig::default()
        };
        let renderer = Box::new(HeadlessRenderer::new());
        let mut game = Game::new(config, beatmap(notes), renderer, xr, Box::new(SilentTrack::ready())).unwrap();
        game.init().unwrap();
        game
    }

    #[test]
    fn test_frames_only_run_while_started() {
        let mut game = game(Box::new(NoXr), vec![]);
        let players = PlayerCache::new();
        assert!(game.frame(DT, &players).is_none());

        game.start();
        let state = game.frame(DT, &players).unwrap();
        assert!(!game.is_loading());
        assert!(state.sabers_matrix.iter().all(Option::is_some));
        assert_eq!(game.frame_count(), 1);

        game.stop();
        assert!(game.frame(DT, &players).is_none());
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = GameConfig {
            pool_size: 0,
            ..GameConfig::default()
        };
        let result = Game::new(
            config,
            beatmap(vec![]),
            Box::new(HeadlessRenderer::new()),
            Box::new(NoXr),
            Box::new(SilentTrack::ready()),
        );
        assert!(matches!(result, Err(GameError::Config(_))));
    }

    #[test]
    fn test_note_reaching_saber_scores() {
        // Lane 1, top layer lines up with the left pointer-rig saber.
        let note = NoteInfo {
            time: 6.0,
            line_index: 1,
            line_layer: 2,
            note_type: NoteType::Red,
            cut_direction: CutDirection::Down,
        };
        let mut game = game(Box::new(NoXr), vec![note]);
        let players = PlayerCache::new();
        game.start();
        game.frame(DT, &players);
        assert!(game.play());

        for _ in 0..(60 * 8) {
            game.frame(DT, &players);
        }
        assert_eq!(game.score(), 1);
        assert_eq!(game.beat_saber().and_then(|b| b.notes()).map(|n| n.active_count()), Some(0));
    }

    #[test]
    fn test_xr_toggle_switches_rigs() {
        let mut game = game(Box::new(SimulatedXr::new(false, true)), vec![]);
        let players = PlayerCache::new();
        game.start();
        game.frame(DT, &players);
        let pointer_sabers = game.rig().map(RigSystem::sabers);

        assert_eq!(game.request_xr_session(), Ok(XrRequest::Requested(XrMode::ImmersiveVr)));
        game.frame(DT, &players);
        assert!(game.is_presenting());
        assert_ne!(game.rig().map(RigSystem::sabers), pointer_sabers);
        assert_eq!(game.stats_system().map(StatsSystem::panel_shown), Some(true));

        assert_eq!(game.request_xr_session(), Ok(XrRequest::Ended));
        game.frame(DT, &players);
        assert!(!game.is_presenting());
        assert_eq!(game.rig().map(RigSystem::sabers), pointer_sabers);
    }

    #[test]
    fn test_xr_unavailable_is_a_no_op() {
        let mut game = game(Box::new(NoXr), vec![]);
        assert_eq!(game.request_xr_session(), Ok(XrRequest::Unavailable));
    }

    #[test]
    fn test_dispose_releases_scene_resources() {
        let mut game = game(Box::new(NoXr), vec![]);
        game.start();
        game.frame(DT, &PlayerCache::new());
        assert!(game.scene().stats().geometries > 0);

        game.dispose();
        assert_eq!(game.scene().stats().geometries, 0);
        assert!(!game.is_running());
    }
}
