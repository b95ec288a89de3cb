//! # Session
//!
//! One player's view of a cooperative session: the peer mesh and the game,
//! stepped together from a single frame callback.
//!
//! ```text
//! frame(delta)
//!   ├─ mesh.poll(delta)             membership, readiness, remote players
//!   ├─ game.start()/stop()          running while part of a session
//!   ├─ AllReady && game.play()      mesh.begin_playing()
//!   ├─ game.frame(delta, players)   local simulation and render
//!   └─ mesh.broadcast_player(state)
//! ```

use crate::game_loop::{Game, GameError, XrRequest};
use crate::xr::XrError;
use saberlink_networking::{MeshError, MeshEvent, MeshProtocol, PeerTransport, SessionState};
use saberlink_shared::PeerId;
use tracing::info;

/// Mesh and game for one player.
pub struct Session<T: PeerTransport> {
    mesh: MeshProtocol<T>,
    game: Game,
}

impl<T: PeerTransport> Session<T> {
    /// Initializes the game and pairs it with the mesh.
    ///
    /// # Errors
    ///
    /// Game initialization failures.
    pub fn new(mesh: MeshProtocol<T>, mut game: Game) -> Result<Self, GameError> {
        game.init()?;
        Ok(Self { mesh, game })
    }

    /// Our peer id, once the transport has assigned one.
    #[must_use]
    pub fn peer_id(&self) -> Option<&PeerId> {
        self.mesh.peer_id()
    }

    /// Dials a peer.
    ///
    /// # Errors
    ///
    /// See [`MeshProtocol::connect`].
    pub fn connect(&mut self, peer: &PeerId) -> Result<bool, MeshError> {
        self.mesh.connect(peer)
    }

    /// Flips the local ready flag.
    pub fn toggle_ready(&mut self) {
        self.mesh.toggle_ready();
    }

    /// Sets the local ready flag.
    pub fn set_ready(&mut self, ready: bool) {
        self.mesh.set_ready(ready);
    }

    /// Leaves the session and stops the game loop.
    pub fn disconnect(&mut self) {
        self.mesh.disconnect();
        self.game.stop();
    }

    /// Toggles the immersive session.
    ///
    /// # Errors
    ///
    /// See [`Game::request_xr_session`].
    pub fn request_xr_session(&mut self) -> Result<XrRequest, XrError> {
        self.game.request_xr_session()
    }

    /// Whether the game is still waiting on its assets.
    #[must_use]
    pub const fn is_loading(&self) -> bool {
        self.game.is_loading()
    }

    /// Mesh state.
    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.mesh.state()
    }

    /// Local score.
    #[must_use]
    pub fn score(&self) -> u32 {
        self.game.score()
    }

    /// The mesh.
    #[must_use]
    pub const fn mesh(&self) -> &MeshProtocol<T> {
        &self.mesh
    }

    /// The game.
    #[must_use]
    pub const fn game(&self) -> &Game {
        &self.game
    }

    /// The game, for input forwarding.
    pub fn game_mut(&mut self) -> &mut Game {
        &mut self.game
    }

    /// Steps mesh and game by one frame.
    ///
    /// # Returns
    ///
    /// What the mesh reported this frame.
    pub fn frame(&mut self, delta: f32) -> Vec<MeshEvent> {
        let events = self.mesh.poll(delta);
        let state = self.mesh.state();

        match state {
            SessionState::Connected | SessionState::AllReady | SessionState::Playing => {
                self.game.start();
            }
            SessionState::Disconnected | SessionState::Connecting => self.game.stop(),
        }

        // Assets may still be loading; play is retried every frame.
        if state == SessionState::AllReady && self.game.play() && self.mesh.begin_playing() {
            info!("session playing");
        }

        if let Some(player) = self.game.frame(delta, self.mesh.players()) {
            self.mesh.broadcast_player(&player);
        }
        events
    }

    /// Leaves the session and releases everything the game created.
    pub fn dispose(&mut self) {
        self.mesh.disconnect();
        self.game.dispose();
    }
}
