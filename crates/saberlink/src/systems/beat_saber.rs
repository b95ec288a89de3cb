//! # Beat Saber System
//!
//! Turns the beatmap into flying notes.
//!
//! ```text
//! Loading ──track ready──> Idle <──stop()── Playing
//!    │                       └────play()────>  │
//!    └──track failed──> Failed                 │
//!                                              v
//!           every whole beat b: spawn notes due at floor(b + lead_beats)
//! ```
//!
//! A note spawned at beat `b` needs `lead_beats` to cover the runway, so it
//! reaches the player on the beat it is scheduled for.

use crate::audio::{AssetState, AudioTrack};
use crate::beatmap::{Beatmap, NoteSchedule};
use crate::config::GameConfig;
use crate::entities::{spawn_floor, NoteField, NoteFlight};
use crate::events::{EventSender, GameEvent};
use saberlink_core::{CoreResult, EntityId, EntityRegistry, FrameContext, SceneGraph, System};
use saberlink_shared::constants::NOTE_LANES;
use saberlink_shared::PlayerState;
use tracing::{debug, info, warn};

/// Runway geometry and note kinematics derived from tempo and floor size.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RunwayTimings {
    /// Beats per second.
    pub bps: f32,
    /// Runway width and length.
    pub floor_size: [f32; 2],
    /// Grid cell size.
    pub cell: f32,
    /// Local z past which notes stop.
    pub max_fly_distance: f32,
    /// Note speed in m/s.
    pub velocity: f32,
    /// Beats a note needs from the runway head to the player.
    pub lead_beats: f32,
}

impl RunwayTimings {
    /// Derives timings from tempo and configuration.
    #[must_use]
    pub fn new(bpm: f32, config: &GameConfig) -> Self {
        let [width, length] = config.floor_size;
        let bps = bpm / 60.0;
        let max_fly_distance = length + config.fly_past_distance;
        let velocity = max_fly_distance / config.max_fly_time;
        Self {
            bps,
            floor_size: config.floor_size,
            cell: width / NOTE_LANES as f32,
            max_fly_distance,
            velocity,
            lead_beats: bps * length / velocity,
        }
    }

    /// Flight parameters for notes.
    #[must_use]
    pub const fn flight(&self) -> NoteFlight {
        NoteFlight {
            velocity: self.velocity,
            max_distance: self.max_fly_distance,
        }
    }
}

/// Asset gate state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Assets {
    /// Waiting for the track.
    Loading,
    /// Floor and notes exist.
    Ready,
    /// The track will never load.
    Failed,
}

/// Beatmap playback.
pub struct BeatSaberSystem {
    registry: EntityRegistry,
    notes: Option<NoteField>,
    beatmap: Beatmap,
    schedule: NoteSchedule,
    timings: RunwayTimings,
    pool_size: usize,
    track: Box<dyn AudioTrack>,
    events: EventSender,
    assets: Assets,
    playing: bool,
    elapsed: f32,
    prev_beat: i64,
    score: u32,
    sabers: Option<[EntityId; 2]>,
}

impl BeatSaberSystem {
    /// Creates an idle system waiting for `track`.
    #[must_use]
    pub fn new(
        config: &GameConfig,
        beatmap: Beatmap,
        track: Box<dyn AudioTrack>,
        events: EventSender,
    ) -> Self {
        let timings = RunwayTimings::new(beatmap.bpm, config);
        debug!(?timings, "runway timings");
        Self {
            registry: EntityRegistry::new(),
            notes: None,
            beatmap,
            schedule: NoteSchedule::default(),
            timings,
            pool_size: config.pool_size,
            track,
            events,
            assets: Assets::Loading,
            playing: false,
            elapsed: 0.0,
            prev_beat: -1,
            score: 0,
            sabers: None,
        }
    }

    /// Derived timings.
    #[must_use]
    pub const fn timings(&self) -> &RunwayTimings {
        &self.timings
    }

    /// Asset gate state.
    #[must_use]
    pub const fn assets(&self) -> Assets {
        self.assets
    }

    /// Whether the beatmap is playing.
    #[must_use]
    pub const fn is_playing(&self) -> bool {
        self.playing
    }

    /// Notes cut so far.
    #[must_use]
    pub const fn score(&self) -> u32 {
        self.score
    }

    /// Seconds since `play()`.
    #[must_use]
    pub const fn elapsed(&self) -> f32 {
        self.elapsed
    }

    /// Note field, once assets are ready.
    #[must_use]
    pub const fn notes(&self) -> Option<&NoteField> {
        self.notes.as_ref()
    }

    /// Starts playback from the first beat.
    ///
    /// # Returns
    ///
    /// False while assets are not ready or when already playing.
    pub fn play(&mut self) -> bool {
        if self.playing || self.assets != Assets::Ready {
            return false;
        }
        self.playing = true;
        self.elapsed = 0.0;
        self.prev_beat = -1;
        self.track.play();
        self.events.send(GameEvent::PlayStarted);
        info!(notes = self.schedule.len(), "beatmap playback started");
        true
    }

    /// Stops playback, rewinds the track and recalls every note.
    pub fn stop(&mut self, scene: &mut SceneGraph) {
        if !self.playing {
            return;
        }
        self.playing = false;
        self.track.pause();
        self.track.rewind();
        if let Some(notes) = self.notes.as_mut() {
            notes.stop_all(scene);
        }
        self.events.send(GameEvent::PlayStopped);
        info!(score = self.score, "beatmap playback stopped");
    }

    /// Sets the sabers notes can be cut by.
    pub fn set_sabers(&mut self, sabers: [EntityId; 2]) {
        self.sabers = Some(sabers);
        if let Some(notes) = self.notes.as_mut() {
            notes.set_collidables(&sabers);
        }
    }

    /// Scores a cut.
    ///
    /// # Returns
    ///
    /// False if the note had already stopped, so one note scores once.
    pub fn register_hit(&mut self, scene: &mut SceneGraph, note: EntityId) -> bool {
        let Some(notes) = self.notes.as_mut() else {
            return false;
        };
        if !notes.stop(scene, note) {
            return false;
        }
        self.score += 1;
        true
    }

    /// Local player snapshot: score and world matrices of the sabers.
    #[must_use]
    pub fn player_state(&self, scene: &SceneGraph) -> PlayerState {
        let sabers = self
            .sabers
            .map_or([None, None], |ids| ids.map(|id| scene.world_matrix(id.node())));
        PlayerState::new(self.score, sabers)
    }

    fn poll_assets(&mut self, scene: &mut SceneGraph) {
        if self.assets != Assets::Loading {
            return;
        }
        match self.track.poll_ready() {
            AssetState::Pending => {}
            AssetState::Ready => match self.load(scene) {
                Ok(()) => {
                    self.assets = Assets::Ready;
                    self.events.send(GameEvent::AssetsReady);
                    info!(
                        notes = self.schedule.len(),
                        last_beat = ?self.schedule.last_beat(),
                        pool = self.pool_size,
                        "beatmap ready"
                    );
                }
                Err(err) => self.fail(err.to_string()),
            },
            AssetState::Failed(err) => self.fail(err.to_string()),
        }
    }

    fn fail(&mut self, reason: String) {
        warn!(%reason, "beatmap assets unavailable");
        self.assets = Assets::Failed;
        self.events.send(GameEvent::AssetFailed(reason));
    }

    fn load(&mut self, scene: &mut SceneGraph) -> CoreResult<()> {
        self.schedule = self.beatmap.bake();

        let floor = spawn_floor(scene, self.timings.floor_size);
        self.registry.add_entity(scene, floor, None)?;

        let mut notes = NoteField::new(
            scene,
            self.pool_size,
            self.timings.cell,
            self.timings.flight(),
            self.timings.floor_size[1],
            &self.events,
        )?;
        let root = scene.root();
        scene.attach(root, notes.root_node())?;
        if let Some(sabers) = self.sabers {
            notes.set_collidables(&sabers);
        }
        self.notes = Some(notes);
        Ok(())
    }

    /// Spawns every whole beat passed since the last frame.
    fn spawn_due(&mut self, scene: &mut SceneGraph) {
        let Some(notes) = self.notes.as_mut() else {
            return;
        };
        let beat = self.elapsed * self.timings.bps;
        let current = beat.floor() as i64;
        // Beats crossed in one frame all start level with the newest one.
        let offset = beat - current as f32;
        while self.prev_beat < current {
            self.prev_beat += 1;
            let key = (self.prev_beat as f32 + self.timings.lead_beats).floor();
            if key < 0.0 {
                continue;
            }
            let key = key as u32;
            let missed = notes.spawn(scene, self.schedule.at(key), offset);
            if missed > 0 {
                debug!(beat = key, missed, dropped = notes.dropped(), "note pool exhausted");
                self.events.send(GameEvent::PoolExhausted { beat: key });
            }
        }
    }
}

impl System for BeatSaberSystem {
    fn name(&self) -> &'static str {
        "beat-saber"
    }

    fn update(&mut self, ctx: &mut FrameContext<'_>) {
        self.poll_assets(ctx.scene);
        if self.playing {
            self.elapsed += ctx.delta;
            self.spawn_due(ctx.scene);
        }
        self.registry.update(ctx.scene, ctx.delta);
        if let Some(notes) = self.notes.as_mut() {
            notes.update(ctx.scene, ctx.delta);
        }
    }

    fn dispose(&mut self, scene: &mut SceneGraph) {
        self.stop(scene);
        self.registry.dispose(scene);
        if let Some(mut notes) = self.notes.take() {
            notes.dispose(scene);
        }
    }
}
