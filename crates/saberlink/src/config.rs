//! # Configuration
//!
//! TOML configuration for a game instance. Every field has a default, so an
//! empty file is a valid configuration.
//!
//! ```toml
//! [game]
//! pool_size = 20
//! floor_size = [2.0, 20.0]
//!
//! [mesh]
//! connect_timeout_secs = 15.0
//! ```

use saberlink_networking::MeshConfig;
use saberlink_shared::constants::{FLOOR_SIZE, FLY_PAST_DISTANCE, MAX_FLY_TIME, NOTE_POOL_SIZE};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration loading errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// File could not be read.
    #[error("cannot read config {path}: {source}")]
    Io {
        /// Path that failed.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// Not valid TOML, or fields of the wrong type.
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value is out of range.
    #[error("invalid value for {field}: {reason}")]
    Invalid {
        /// Offending field.
        field: &'static str,
        /// What is wrong with it.
        reason: &'static str,
    },
}

/// Gameplay and frame loop settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Note pool capacity.
    pub pool_size: usize,
    /// Runway width and length in meters.
    pub floor_size: [f32; 2],
    /// Seconds for a note to cover the full flight distance.
    pub max_fly_time: f32,
    /// Meters a note keeps flying past the end of the runway.
    pub fly_past_distance: f32,
    /// Run the diagnostics system.
    pub stats_enabled: bool,
    /// Frames between diagnostic log lines. Zero disables them.
    pub stats_log_interval: u64,
    /// Game event queue capacity.
    pub event_capacity: usize,
    /// Upper bound on a single frame's delta, in seconds.
    pub max_frame_delta: f32,
    /// Initial viewport size in pixels.
    pub viewport: [u32; 2],
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            pool_size: NOTE_POOL_SIZE,
            floor_size: FLOOR_SIZE,
            max_fly_time: MAX_FLY_TIME,
            fly_past_distance: FLY_PAST_DISTANCE,
            stats_enabled: cfg!(debug_assertions),
            stats_log_interval: 300,
            event_capacity: 1024,
            max_frame_delta: 0.1,
            viewport: [1280, 720],
        }
    }
}

impl GameConfig {
    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// The first out-of-range field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |field: &'static str, reason: &'static str| -> Result<(), ConfigError> {
            Err(ConfigError::Invalid { field, reason })
        };

        if self.pool_size == 0 {
            return invalid("game.pool_size", "must be at least 1");
        }
        if !self.floor_size.iter().all(|v| v.is_finite() && *v > 0.0) {
            return invalid("game.floor_size", "both dimensions must be positive");
        }
        if !(self.max_fly_time.is_finite() && self.max_fly_time > 0.0) {
            return invalid("game.max_fly_time", "must be positive");
        }
        if !(self.fly_past_distance.is_finite() && self.fly_past_distance >= 0.0) {
            return invalid("game.fly_past_distance", "must not be negative");
        }
        if self.event_capacity == 0 {
            return invalid("game.event_capacity", "must be at least 1");
        }
        if !(self.max_frame_delta.is_finite() && self.max_frame_delta > 0.0) {
            return invalid("game.max_frame_delta", "must be positive");
        }
        Ok(())
    }
}

/// Top-level configuration.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SaberlinkConfig {
    /// Gameplay settings.
    pub game: GameConfig,
    /// Peer mesh settings.
    pub mesh: MeshConfig,
}

impl SaberlinkConfig {
    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// Malformed TOML or out-of-range values.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source)?;
        config.game.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    ///
    /// # Errors
    ///
    /// Unreadable file, malformed TOML or out-of-range values.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&source)?;
        tracing::info!(path = %path.display(), "configuration loaded");
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_is_default() {
        let config = SaberlinkConfig::from_toml_str("").unwrap();
        assert_eq!(config, SaberlinkConfig::default());
        assert_eq!(config.game.pool_size, 20);
        assert_eq!(config.mesh.connect_timeout_secs, 15.0);
    }

    #[test]
    fn test_partial_sections_keep_other_defaults() {
        let config = SaberlinkConfig::from_toml_str(
            r#"
            [game]
            pool_size = 8
            floor_size = [3.0, 30.0]

            [mesh]
            refuse_after_all_ready = false
            "#,
        )
        .unwrap();

        assert_eq!(config.game.pool_size, 8);
        assert_eq!(config.game.floor_size, [3.0, 30.0]);
        assert_eq!(config.game.max_fly_time, MAX_FLY_TIME);
        assert!(!config.mesh.refuse_after_all_ready);
        assert_eq!(config.mesh.connect_timeout_secs, 15.0);
    }

    #[test]
    fn test_out_of_range_values_are_rejected() {
        let err = SaberlinkConfig::from_toml_str("[game]\npool_size = 0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "game.pool_size", .. }));

        let err = SaberlinkConfig::from_toml_str("[game]\nfloor_size = [2.0, -1.0]").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "game.floor_size", .. }));
    }

    #[test]
    fn test_wrong_type_is_a_parse_error() {
        let err = SaberlinkConfig::from_toml_str("[game]\npool_size = \"many\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_missing_file_reports_path() {
        let err = SaberlinkConfig::load("/nonexistent/saberlink.toml").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/saberlink.toml"));
    }
}
