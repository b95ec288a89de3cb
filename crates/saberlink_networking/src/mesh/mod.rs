//! # Mesh Protocol
//!
//! Forms and maintains a full mesh of peers from a single pairwise
//! connection, and exchanges three messages among every member.
//!
//! ## Formation
//!
//! ```text
//!   P1 ──dial──► P2                 P3 ──dial──► P1
//!   P1 ◄─INITIAL_CONNECT []── P2    P3 ◄─INITIAL_CONNECT [P2]── P1
//!                                   P3 ──dial──► P2
//! ```
//!
//! Both ends of every newly opened connection send `INITIAL_CONNECT` with the
//! members they already know, then their current `READY`. Receivers dial every
//! listed id they are not already connected or dialing to, so any join order
//! converges to a full mesh.
//!
//! ## State machine
//!
//! `Disconnected → Connecting → Connected ⇄ AllReady → Playing`, and any
//! state returns to `Disconnected` on [`MeshProtocol::disconnect`]. Once
//! `AllReady` is reached, new connections are closed on arrival.
//!
//! Membership and readiness live in the same record, so they are inserted
//! and removed together.

mod config;
mod players;
mod state;

pub use config::MeshConfig;
pub use players::{PlayerCache, RemotePlayer};
pub use state::{Connection, MeshEvent, SessionState};

use crate::codec;
use crate::error::{MeshError, TransportError};
use crate::transport::{PeerTransport, TransportEvent, TransportStats};
use saberlink_shared::{PeerId, PeerMessage, PlayerState};
use std::collections::BTreeMap;

/// A dial that has not opened yet.
#[derive(Clone, Copy, Debug)]
struct PendingDial {
    elapsed: f32,
    inbound: bool,
}

/// Message counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MeshStats {
    /// Messages handed to the transport.
    pub messages_sent: u64,
    /// Messages decoded from members.
    pub messages_received: u64,
    /// Payloads that failed to decode.
    pub decode_failures: u64,
    /// Payloads from peers that are not members.
    pub foreign_messages: u64,
    /// Connections refused while locked.
    pub refused: u64,
    /// Dials abandoned after the timeout.
    pub timeouts: u64,
}

/// The peer mesh protocol, generic over its transport.
pub struct MeshProtocol<T: PeerTransport> {
    transport: T,
    config: MeshConfig,
    peer_id: Option<PeerId>,
    connections: BTreeMap<PeerId, Connection>,
    pending: BTreeMap<PeerId, PendingDial>,
    players: PlayerCache,
    local_ready: bool,
    /// User intent to be in a session (set by connect or an accepted peer).
    active: bool,
    /// A connection has opened since the session started.
    established: bool,
    state: SessionState,
    last_all_ready: bool,
    player_seq: u64,
    frame: u64,
    outbox: Vec<MeshEvent>,
    stats: MeshStats,
}

impl<T: PeerTransport> MeshProtocol<T> {
    /// Creates the protocol around an owned transport.
    #[must_use]
    pub fn new(transport: T, config: MeshConfig) -> Self {
        let peer_id = transport.local_id().cloned();
        Self {
            transport,
            config,
            peer_id,
            connections: BTreeMap::new(),
            pending: BTreeMap::new(),
            players: PlayerCache::new(),
            local_ready: false,
            active: false,
            established: false,
            state: SessionState::Disconnected,
            last_all_ready: false,
            player_seq: 0,
            frame: 0,
            outbox: Vec::new(),
            stats: MeshStats::default(),
        }
    }

    /// Local identity, once the transport has assigned it.
    #[inline]
    #[must_use]
    pub fn peer_id(&self) -> Option<&PeerId> {
        self.peer_id.as_ref()
    }

    /// Current session state.
    #[inline]
    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.state
    }

    /// Local ready toggle.
    #[inline]
    #[must_use]
    pub const fn local_ready(&self) -> bool {
        self.local_ready
    }

    /// Local peer is ready and so is every member. True when alone and
    /// ready.
    #[must_use]
    pub fn all_ready(&self) -> bool {
        self.local_ready && self.connections.values().all(|c| c.ready)
    }

    /// Members, in id order.
    pub fn connections(&self) -> impl Iterator<Item = &Connection> {
        self.connections.values()
    }

    /// Member ids, in id order.
    #[must_use]
    pub fn members(&self) -> Vec<PeerId> {
        self.connections.keys().cloned().collect()
    }

    /// Whether `peer` is a member.
    #[must_use]
    pub fn is_member(&self, peer: &PeerId) -> bool {
        self.connections.contains_key(peer)
    }

    /// Whether a dial to `peer` is outstanding.
    #[must_use]
    pub fn is_pending(&self, peer: &PeerId) -> bool {
        self.pending.contains_key(peer)
    }

    /// Readiness of every member.
    #[must_use]
    pub fn readiness(&self) -> BTreeMap<PeerId, bool> {
        self.connections
            .iter()
            .map(|(id, c)| (id.clone(), c.ready))
            .collect()
    }

    /// Cached remote player snapshots.
    #[inline]
    #[must_use]
    pub const fn players(&self) -> &PlayerCache {
        &self.players
    }

    /// Message counters.
    #[inline]
    #[must_use]
    pub const fn stats(&self) -> MeshStats {
        self.stats
    }

    /// Transport counters.
    #[must_use]
    pub fn transport_stats(&self) -> TransportStats {
        self.transport.stats()
    }

    /// The owned transport.
    #[must_use]
    pub const fn transport(&self) -> &T {
        &self.transport
    }

    /// Dials a peer unless it is us, already a member, or already being
    /// dialed.
    ///
    /// # Returns
    ///
    /// Whether a new dial was started.
    ///
    /// # Errors
    ///
    /// Dialing ourselves, or the transport refusing to start the dial.
    pub fn connect(&mut self, peer: &PeerId) -> Result<bool, MeshError> {
        if self.peer_id.as_ref() == Some(peer) {
            return Err(MeshError::SelfConnect(peer.clone()));
        }
        let started = self.dial(peer)?;
        if started {
            self.active = true;
            self.evaluate();
        }
        Ok(started)
    }

    fn dial(&mut self, peer: &PeerId) -> Result<bool, TransportError> {
        if self.peer_id.as_ref() == Some(peer)
            || self.connections.contains_key(peer)
            || self.pending.contains_key(peer)
        {
            return Ok(false);
        }
        self.transport.connect(peer)?;
        tracing::debug!(%peer, "dialing");
        self.pending.insert(
            peer.clone(),
            PendingDial {
                elapsed: 0.0,
                inbound: false,
            },
        );
        Ok(true)
    }

    /// Leaves the session: closes every connection and pending dial, clears
    /// membership, readiness and cached players, and resets the ready flag.
    pub fn disconnect(&mut self) {
        let peers: Vec<PeerId> = self
            .connections
            .keys()
            .chain(self.pending.keys())
            .cloned()
            .collect();
        for peer in &peers {
            self.transport.close(peer);
        }
        tracing::info!(peers = peers.len(), "disconnected from session");

        self.connections.clear();
        self.pending.clear();
        self.players.clear();
        self.local_ready = false;
        self.active = false;
        self.established = false;
        self.evaluate();
    }

    /// Sets the local ready flag and announces it.
    pub fn set_ready(&mut self, ready: bool) {
        if self.local_ready != ready {
            tracing::info!(ready, "local readiness changed");
        }
        self.local_ready = ready;
        self.broadcast(&PeerMessage::Ready { ready });
        self.evaluate();
    }

    /// Flips the local ready flag.
    pub fn toggle_ready(&mut self) {
        self.set_ready(!self.local_ready);
    }

    /// `AllReady → Playing`.
    ///
    /// # Returns
    ///
    /// Whether the transition happened.
    pub fn begin_playing(&mut self) -> bool {
        if self.state != SessionState::AllReady {
            return false;
        }
        self.transition(SessionState::Playing);
        true
    }

    /// Leaves `Playing` and re-evaluates.
    pub fn stop_playing(&mut self) {
        if self.state == SessionState::Playing {
            self.state = SessionState::Connected;
            self.outbox.push(MeshEvent::StateChanged {
                from: SessionState::Playing,
                to: SessionState::Connected,
            });
            self.evaluate();
        }
    }

    /// Sends a message to every member.
    ///
    /// # Returns
    ///
    /// Number of members it was handed to.
    pub fn broadcast(&mut self, message: &PeerMessage) -> usize {
        let payload = match codec::encode(message) {
            Ok(payload) => payload,
            Err(err) => {
                tracing::warn!(%err, kind = message.kind(), "failed to encode message");
                return 0;
            }
        };
        let peers: Vec<PeerId> = self.connections.keys().cloned().collect();
        let mut delivered = 0;
        for peer in &peers {
            if self.send_payload(peer, &payload) {
                delivered += 1;
            }
        }
        delivered
    }

    /// Broadcasts the local player snapshot with the next sequence number.
    pub fn broadcast_player(&mut self, state: &PlayerState) -> usize {
        self.player_seq += 1;
        let message = state.to_message(self.player_seq);
        self.broadcast(&message)
    }

    fn send(&mut self, peer: &PeerId, message: &PeerMessage) -> bool {
        match codec::encode(message) {
            Ok(payload) => self.send_payload(peer, &payload),
            Err(err) => {
                tracing::warn!(%err, kind = message.kind(), "failed to encode message");
                false
            }
        }
    }

    fn send_payload(&mut self, peer: &PeerId, payload: &[u8]) -> bool {
        match self.transport.send(peer, payload) {
            Ok(()) => {
                self.stats.messages_sent += 1;
                true
            }
            Err(err) => {
                tracing::debug!(%peer, %err, "send failed");
                false
            }
        }
    }

    /// Drains the transport, expires stale dials, and returns what happened.
    /// Call once per frame.
    pub fn poll(&mut self, delta_secs: f32) -> Vec<MeshEvent> {
        self.frame += 1;
        while let Some(event) = self.transport.poll_event() {
            self.handle(event);
        }
        self.expire_dials(delta_secs);
        self.check_invariants();
        std::mem::take(&mut self.outbox)
    }

    fn refusing(&self, peer: &PeerId) -> bool {
        self.config.refuse_after_all_ready
            && self.state.is_locked()
            && !self.connections.contains_key(peer)
    }

    fn refuse(&mut self, peer: PeerId) {
        tracing::info!(%peer, state = %self.state, "refusing connection");
        self.transport.close(&peer);
        self.pending.remove(&peer);
        self.stats.refused += 1;
        self.outbox.push(MeshEvent::ConnectionRefused(peer));
    }

    fn handle(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::IdAssigned(id) => {
                tracing::info!(peer = %id, "identity assigned");
                self.peer_id = Some(id.clone());
                self.outbox.push(MeshEvent::IdAssigned(id));
            }
            TransportEvent::Incoming(peer) => {
                if self.refusing(&peer) {
                    self.refuse(peer);
                } else if !self.connections.contains_key(&peer) {
                    self.pending.entry(peer).or_insert(PendingDial {
                        elapsed: 0.0,
                        inbound: true,
                    });
                    self.active = true;
                    self.evaluate();
                }
            }
            TransportEvent::Open(peer) => self.on_open(peer),
            TransportEvent::Close(peer) => self.on_close(&peer),
            TransportEvent::Data(peer, payload) => self.on_data(peer, &payload),
            TransportEvent::IceStateChanged(peer, ice) => {
                tracing::debug!(%peer, ?ice, "ice state changed");
            }
            TransportEvent::Error(peer, err) => {
                tracing::warn!(%peer, %err, "connection error");
                if self.pending.remove(&peer).is_some() {
                    self.outbox.push(MeshEvent::ConnectionFailed {
                        peer,
                        reason: err.to_string(),
                    });
                    self.evaluate();
                }
            }
        }
    }

    fn on_open(&mut self, peer: PeerId) {
        if self.peer_id.as_ref() == Some(&peer) {
            return;
        }
        if self.refusing(&peer) {
            self.refuse(peer);
            return;
        }
        self.pending.remove(&peer);

        if !self.connections.contains_key(&peer) {
            let known: Vec<PeerId> = self.connections.keys().cloned().collect();
            tracing::info!(%peer, known = known.len(), "peer connected");
            self.send(&peer, &PeerMessage::InitialConnect { peer_ids: known });
            self.outbox.push(MeshEvent::PeerJoined(peer.clone()));
        }
        self.connections.insert(
            peer.clone(),
            Connection {
                peer: peer.clone(),
                ready: false,
                opened_frame: self.frame,
            },
        );
        let ready = self.local_ready;
        self.send(&peer, &PeerMessage::Ready { ready });

        self.active = true;
        self.established = true;
        self.evaluate();
    }

    fn on_close(&mut self, peer: &PeerId) {
        if self.pending.remove(peer).is_some() {
            tracing::debug!(%peer, "dial closed before opening");
            self.outbox.push(MeshEvent::ConnectionFailed {
                peer: peer.clone(),
                reason: "closed by remote".to_owned(),
            });
            self.evaluate();
            return;
        }
        if self.connections.remove(peer).is_none() {
            return;
        }
        self.players.remove(peer);
        tracing::info!(%peer, "peer disconnected");
        self.outbox.push(MeshEvent::PeerLeft(peer.clone()));
        self.evaluate();
    }

    fn on_data(&mut self, peer: PeerId, payload: &[u8]) {
        if !self.connections.contains_key(&peer) {
            tracing::debug!(%peer, "dropping data from non-member");
            self.stats.foreign_messages += 1;
            return;
        }
        let message = match codec::decode(payload) {
            Ok(message) => message,
            Err(err) => {
                tracing::warn!(%peer, %err, "undecodable payload");
                self.stats.decode_failures += 1;
                return;
            }
        };
        self.stats.messages_received += 1;
        tracing::trace!(%peer, kind = message.kind(), "message received");

        match message {
            PeerMessage::InitialConnect { peer_ids } => {
                for id in &peer_ids {
                    match self.dial(id) {
                        Ok(true) => tracing::debug!(via = %peer, %id, "gossip dial"),
                        Ok(false) => {}
                        Err(err) => {
                            tracing::warn!(%id, %err, "gossip dial failed");
                            self.outbox.push(MeshEvent::ConnectionFailed {
                                peer: id.clone(),
                                reason: err.to_string(),
                            });
                        }
                    }
                }
                self.evaluate();
            }
            PeerMessage::Ready { ready } => {
                let Some(connection) = self.connections.get_mut(&peer) else {
                    return;
                };
                if connection.ready != ready {
                    connection.ready = ready;
                    tracing::debug!(%peer, ready, "member readiness changed");
                    self.outbox.push(MeshEvent::ReadinessChanged { peer, ready });
                }
                self.evaluate();
            }
            PeerMessage::Player {
                seq,
                score,
                sabers_matrix,
            } => {
                let state = PlayerState::new(score, sabers_matrix);
                if !self.players.apply(&peer, seq, state) {
                    tracing::trace!(%peer, seq, "stale player snapshot dropped");
                }
            }
        }
    }

    fn expire_dials(&mut self, delta_secs: f32) {
        let Some(timeout) = self.config.connect_timeout() else {
            return;
        };
        let mut expired = Vec::new();
        for (peer, dial) in &mut self.pending {
            dial.elapsed += delta_secs;
            if dial.elapsed >= timeout {
                expired.push((peer.clone(), dial.inbound));
            }
        }
        if expired.is_empty() {
            return;
        }
        for (peer, inbound) in expired {
            tracing::warn!(%peer, inbound, timeout, "connection attempt timed out");
            self.pending.remove(&peer);
            self.transport.close(&peer);
            self.stats.timeouts += 1;
            self.outbox.push(MeshEvent::ConnectionFailed {
                peer,
                reason: format!("no answer after {timeout}s"),
            });
        }
        self.evaluate();
    }

    fn evaluate(&mut self) {
        let all_ready = self.all_ready();
        if all_ready != self.last_all_ready {
            self.last_all_ready = all_ready;
            self.outbox.push(MeshEvent::AllReadyChanged(all_ready));
        }

        let next = if !self.active {
            SessionState::Disconnected
        } else if self.state == SessionState::Playing {
            SessionState::Playing
        } else if all_ready && (self.established || self.pending.is_empty()) {
            SessionState::AllReady
        } else if self.established || !self.connections.is_empty() || self.pending.is_empty() {
            SessionState::Connected
        } else {
            SessionState::Connecting
        };
        self.transition(next);
    }

    fn transition(&mut self, next: SessionState) {
        if next == self.state {
            return;
        }
        tracing::info!(from = %self.state, to = %next, "session state changed");
        self.outbox.push(MeshEvent::StateChanged {
            from: self.state,
            to: next,
        });
        self.state = next;
    }

    fn check_invariants(&self) {
        if let Some(own) = &self.peer_id {
            debug_assert!(!self.connections.contains_key(own), "self in membership");
            debug_assert!(!self.pending.contains_key(own), "self in pending dials");
        }
        debug_assert!(
            self.pending.keys().all(|p| !self.connections.contains_key(p)),
            "pending dial to a member"
        );
    }
}

impl<T: PeerTransport> Drop for MeshProtocol<T> {
    fn drop(&mut self) {
        for peer in self.connections.keys().chain(self.pending.keys()) {
            self.transport.close(peer);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::LoopbackNetwork;
    use crate::LoopbackTransport;

    fn peer(net: &LoopbackNetwork, id: &str) -> MeshProtocol<LoopbackTransport> {
        let mut mesh = MeshProtocol::new(net.endpoint_with_id(id).unwrap(), MeshConfig::default());
        mesh.poll(0.0);
        mesh
    }

    fn settle(peers: &mut [&mut MeshProtocol<LoopbackTransport>]) {
        for _ in 0..8 {
            for p in peers.iter_mut() {
                p.poll(0.016);
            }
        }
    }

    #[test]
    fn test_identity_assigned_on_first_poll() {
        let net = LoopbackNetwork::new();
        let mut mesh = MeshProtocol::new(net.endpoint_with_id("solo").unwrap(), MeshConfig::default());
        assert!(mesh.peer_id().is_none());

        let events = mesh.poll(0.0);
        assert_eq!(events, vec![MeshEvent::IdAssigned(PeerId::new("solo"))]);
        assert_eq!(mesh.peer_id(), Some(&PeerId::new("solo")));
        assert_eq!(mesh.state(), SessionState::Disconnected);
    }

    #[test]
    fn test_connect_is_idempotent() {
        let net = LoopbackNetwork::new();
        let mut a = peer(&net, "a");
        let _b = peer(&net, "b");

        assert!(a.connect(&PeerId::new("b")).unwrap());
        assert!(!a.connect(&PeerId::new("b")).unwrap());
        assert_eq!(a.state(), SessionState::Connecting);
        assert!(matches!(a.connect(&PeerId::new("a")), Err(MeshError::SelfConnect(_))));
    }

    #[test]
    fn test_pair_connects_and_exchanges_readiness() {
        let net = LoopbackNetwork::new();
        let mut a = peer(&net, "a");
        let mut b = peer(&net, "b");

        a.connect(&PeerId::new("b")).unwrap();
        settle(&mut [&mut a, &mut b]);

        assert_eq!(a.members(), vec![PeerId::new("b")]);
        assert_eq!(b.members(), vec![PeerId::new("a")]);
        assert_eq!(a.state(), SessionState::Connected);
        assert_eq!(b.state(), SessionState::Connected);

        a.set_ready(true);
        settle(&mut [&mut a, &mut b]);
        assert!(!a.all_ready());
        assert_eq!(b.readiness().get(&PeerId::new("a")), Some(&true));

        b.set_ready(true);
        settle(&mut [&mut a, &mut b]);
        assert!(a.all_ready());
        assert_eq!(a.state(), SessionState::AllReady);
        assert_eq!(b.state(), SessionState::AllReady);

        b.set_ready(false);
        settle(&mut [&mut a, &mut b]);
        assert!(!a.all_ready());
        assert_eq!(a.state(), SessionState::Connected);
    }

    #[test]
    fn test_solo_ready_is_all_ready() {
        let net = LoopbackNetwork::new();
        let mut a = peer(&net, "a");
        a.connect(&PeerId::new("nobody")).unwrap();
        let events = a.poll(0.016);
        assert!(events
            .iter()
            .any(|e| matches!(e, MeshEvent::ConnectionFailed { .. })));
        assert_eq!(a.state(), SessionState::Connected);

        a.set_ready(true);
        assert!(a.all_ready());
        assert_eq!(a.state(), SessionState::AllReady);
        assert!(a.begin_playing());
        assert_eq!(a.state(), SessionState::Playing);
    }

    #[test]
    fn test_player_snapshot_cached_verbatim() {
        use saberlink_shared::{Mat4, Vec3};

        let net = LoopbackNetwork::new();
        let mut a = peer(&net, "a");
        let mut b = peer(&net, "b");
        a.connect(&PeerId::new("b")).unwrap();
        settle(&mut [&mut a, &mut b]);

        let t1 = Mat4::from_translation(Vec3::new(-0.25, 1.1, -0.4));
        let t2 = Mat4::from_translation(Vec3::new(0.25, 1.2, -0.4));
        let sent = PlayerState::new(42, [Some(t1), Some(t2)]);
        assert_eq!(a.broadcast_player(&sent), 1);
        settle(&mut [&mut a, &mut b]);

        assert_eq!(b.players().get(&PeerId::new("a")), Some(&sent));
    }

    #[test]
    fn test_disconnect_clears_everything() {
        let net = LoopbackNetwork::new();
        let mut a = peer(&net, "a");
        let mut b = peer(&net, "b");
        a.connect(&PeerId::new("b")).unwrap();
        settle(&mut [&mut a, &mut b]);
        a.set_ready(true);
        b.broadcast_player(&PlayerState::default());
        settle(&mut [&mut a, &mut b]);
        assert_eq!(a.players().len(), 1);

        a.disconnect();
        assert_eq!(a.state(), SessionState::Disconnected);
        assert!(a.members().is_empty());
        assert!(a.readiness().is_empty());
        assert!(a.players().is_empty());
        assert!(!a.local_ready());

        settle(&mut [&mut a, &mut b]);
        assert!(b.members().is_empty());
    }

    #[test]
    fn test_undecodable_payload_is_contained() {
        let net = LoopbackNetwork::new();
        let mut a = peer(&net, "a");
        let mut b = peer(&net, "b");
        a.connect(&PeerId::new("b")).unwrap();
        settle(&mut [&mut a, &mut b]);

        a.transport.send(&PeerId::new("b"), b"not json").unwrap();
        settle(&mut [&mut a, &mut b]);

        assert_eq!(b.stats().decode_failures, 1);
        assert!(b.is_member(&PeerId::new("a")));
    }

    #[test]
    fn test_hung_dial_times_out() {
        let net = LoopbackNetwork::new();
        let mut a = peer(&net, "a");
        let _b = peer(&net, "b");
        net.hold_dials_to(&PeerId::new("b"));

        a.connect(&PeerId::new("b")).unwrap();
        a.poll(0.0);
        assert!(a.poll(10.0).is_empty());
        assert_eq!(a.state(), SessionState::Connecting);

        let events = a.poll(5.0);
        assert!(events.contains(&MeshEvent::ConnectionFailed {
            peer: PeerId::new("b"),
            reason: "no answer after 15s".to_owned(),
        }));
        assert!(!a.is_pending(&PeerId::new("b")));
        assert_eq!(a.stats().timeouts, 1);
    }
}
