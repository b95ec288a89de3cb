//! Peer-to-peer wire protocol types.
//!
//! Every peer in the mesh speaks the same three messages. They are tagged by a
//! `type` field so receivers can discriminate without knowing the sender.

use crate::math::Mat4;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque peer identity assigned by the transport.
///
/// Unique per session and immutable once assigned.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PeerId(String);

impl PeerId {
    /// Wraps a transport-assigned identity
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Raw identity string
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PeerId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for PeerId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Saber world matrices, left then right. `None` until the pose is known.
pub type SabersMatrix = [Option<Mat4>; 2];

/// Message exchanged between mesh peers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PeerMessage {
    /// Sent on a newly opened connection: every member the sender already knows,
    /// excluding itself and the recipient.
    InitialConnect {
        /// Known members
        #[serde(rename = "peerIds")]
        peer_ids: Vec<PeerId>,
    },
    /// Sender's ready toggle
    Ready {
        /// Whether the sender is ready to play
        ready: bool,
    },
    /// Per-frame player snapshot
    Player {
        /// Sender-local monotonically increasing counter. Absent on the wire
        /// means zero, which never counts as stale.
        #[serde(default)]
        seq: u64,
        /// Current score
        score: u32,
        /// Saber world matrices
        #[serde(rename = "sabersMatrix", default)]
        sabers_matrix: SabersMatrix,
    },
}

impl PeerMessage {
    /// Short name for logging
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::InitialConnect { .. } => "INITIAL_CONNECT",
            Self::Ready { .. } => "READY",
            Self::Player { .. } => "PLAYER",
        }
    }
}

/// Snapshot of one player's visible state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerState {
    /// Score, never negative
    pub score: u32,
    /// Saber world matrices
    pub sabers_matrix: SabersMatrix,
}

impl PlayerState {
    /// Creates a snapshot
    #[must_use]
    pub const fn new(score: u32, sabers_matrix: SabersMatrix) -> Self {
        Self { score, sabers_matrix }
    }

    /// Builds the wire message for this snapshot
    #[must_use]
    pub fn to_message(&self, seq: u64) -> PeerMessage {
        PeerMessage::Player {
            seq,
            score: self.score,
            sabers_matrix: self.sabers_matrix,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Vec3;

    #[test]
    fn test_tag_and_field_names() {
        let msg = PeerMessage::InitialConnect {
            peer_ids: vec![PeerId::new("p2")],
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert_eq!(json, r#"{"type":"INITIAL_CONNECT","peerIds":["p2"]}"#);

        let json = serde_json::to_string(&PeerMessage::Ready { ready: true }).unwrap();
        assert_eq!(json, r#"{"type":"READY","ready":true}"#);
    }

    #[test]
    fn test_player_without_seq_or_sabers() {
        let msg: PeerMessage = serde_json::from_str(r#"{"type":"PLAYER","score":7}"#).unwrap();
        assert_eq!(
            msg,
            PeerMessage::Player {
                seq: 0,
                score: 7,
                sabers_matrix: [None, None],
            }
        );
    }

    #[test]
    fn test_player_absent_saber_is_null() {
        let left = Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0));
        let state = PlayerState::new(42, [Some(left), None]);
        let json = serde_json::to_value(state.to_message(3)).unwrap();

        assert_eq!(json["sabersMatrix"][1], serde_json::Value::Null);
        assert_eq!(json["sabersMatrix"][0].as_array().map(Vec::len), Some(16));
        assert_eq!(json["seq"], 3);
    }
}
