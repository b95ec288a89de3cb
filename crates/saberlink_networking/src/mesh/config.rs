//! Mesh configuration.

use saberlink_shared::constants::CONNECT_TIMEOUT_SECS;
use serde::{Deserialize, Serialize};

/// Mesh protocol settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeshConfig {
    /// Seconds a dial may stay unanswered before it is abandoned.
    /// Zero or negative disables the timeout.
    pub connect_timeout_secs: f32,
    /// Refuse new connections once everyone is ready or playing.
    pub refuse_after_all_ready: bool,
}

impl Default for MeshConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: CONNECT_TIMEOUT_SECS,
            refuse_after_all_ready: true,
        }
    }
}

impl MeshConfig {
    /// Timeout, if enabled.
    #[must_use]
    pub fn connect_timeout(&self) -> Option<f32> {
        (self.connect_timeout_secs > 0.0).then_some(self.connect_timeout_secs)
    }
}
