//! Cache of remote player snapshots.

use saberlink_shared::{PeerId, PlayerState};
use std::collections::BTreeMap;

/// Latest known state of one remote player.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RemotePlayer {
    /// Last applied snapshot.
    pub state: PlayerState,
    /// Sequence number of that snapshot (0 when the sender sends none).
    pub last_seq: u64,
    /// Snapshots applied so far.
    pub updates: u64,
    /// Arrival rank of the first snapshot; earlier joiners rank lower.
    pub joined: u64,
}

/// Remote player snapshots keyed by member id.
///
/// Entries are created on the first `PLAYER` message and overwritten by
/// every later one, except that a numbered snapshot not newer than the last
/// applied one is dropped as stale.
///
/// Iteration follows arrival order, so a player keeps its position among
/// the others no matter how its id sorts.
#[derive(Clone, Debug, Default)]
pub struct PlayerCache {
    players: BTreeMap<PeerId, RemotePlayer>,
    next_join: u64,
    stale_dropped: u64,
}

impl PlayerCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies a snapshot.
    ///
    /// # Returns
    ///
    /// False if the snapshot was stale and ignored.
    pub fn apply(&mut self, peer: &PeerId, seq: u64, state: PlayerState) -> bool {
        if let Some(existing) = self.players.get_mut(peer) {
            if seq != 0 && seq <= existing.last_seq {
                self.stale_dropped += 1;
                return false;
            }
            existing.state = state;
            existing.last_seq = seq;
            existing.updates += 1;
            return true;
        }
        self.players.insert(
            peer.clone(),
            RemotePlayer {
                state,
                last_seq: seq,
                updates: 1,
                joined: self.next_join,
            },
        );
        self.next_join += 1;
        true
    }

    /// Snapshot of one player.
    #[must_use]
    pub fn get(&self, peer: &PeerId) -> Option<&PlayerState> {
        self.players.get(peer).map(|p| &p.state)
    }

    /// Full record of one player.
    #[must_use]
    pub fn player(&self, peer: &PeerId) -> Option<&RemotePlayer> {
        self.players.get(peer)
    }

    /// Whether the peer has sent any snapshot.
    #[must_use]
    pub fn contains(&self, peer: &PeerId) -> bool {
        self.players.contains_key(peer)
    }

    /// Drops a player's entry.
    pub fn remove(&mut self, peer: &PeerId) -> Option<RemotePlayer> {
        self.players.remove(peer)
    }

    /// Drops every entry.
    pub fn clear(&mut self) {
        self.players.clear();
    }

    /// Snapshots in arrival order.
    pub fn iter(&self) -> impl Iterator<Item = (&PeerId, &PlayerState)> {
        let mut joined: Vec<_> = self.players.iter().collect();
        joined.sort_by_key(|(_, p)| p.joined);
        joined.into_iter().map(|(id, p)| (id, &p.state))
    }

    /// Number of players.
    #[must_use]
    pub fn len(&self) -> usize {
        self.players.len()
    }

    /// True when empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    /// Stale snapshots dropped so far.
    #[must_use]
    pub const fn stale_dropped(&self) -> u64 {
        self.stale_dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(score: u32) -> PlayerState {
        PlayerState::new(score, [None, None])
    }

    #[test]
    fn test_stale_snapshot_is_dropped() {
        let mut cache = PlayerCache::new();
        let peer = PeerId::new("p");

        assert!(cache.apply(&peer, 2, state(2)));
        assert!(!cache.apply(&peer, 1, state(1)));
        assert!(!cache.apply(&peer, 2, state(5)));
        assert!(cache.apply(&peer, 3, state(3)));

        assert_eq!(cache.get(&peer).map(|s| s.score), Some(3));
        assert_eq!(cache.stale_dropped(), 2);
        assert_eq!(cache.player(&peer).map(|p| p.updates), Some(2));
    }

    #[test]
    fn test_unnumbered_snapshots_always_win() {
        let mut cache = PlayerCache::new();
        let peer = PeerId::new("p");
        assert!(cache.apply(&peer, 5, state(5)));
        assert!(cache.apply(&peer, 0, state(0)));
        assert_eq!(cache.get(&peer).map(|s| s.score), Some(0));
    }

    #[test]
    fn test_iteration_follows_arrival_not_id() {
        let mut cache = PlayerCache::new();
        let (late_id, early_id, middle) = (PeerId::new("zz"), PeerId::new("aa"), PeerId::new("mm"));
        cache.apply(&late_id, 1, state(1));
        cache.apply(&early_id, 1, state(2));
        cache.apply(&middle, 1, state(3));
        // Updates and departures must not reshuffle the survivors.
        cache.apply(&late_id, 2, state(4));
        cache.remove(&early_id);
        cache.apply(&early_id, 2, state(5));

        let order: Vec<&str> = cache.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(order, ["zz", "mm", "aa"]);
    }
}
