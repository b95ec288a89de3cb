//! # Beatmaps
//!
//! Version 2 beatmap JSON (`_beatsPerMinute`, `_notes`) and the per-beat note
//! schedule baked from it.
//!
//! ```json
//! {
//!   "_beatsPerMinute": 120,
//!   "_notes": [
//!     { "_time": 8.0, "_lineIndex": 2, "_lineLayer": 2, "_type": 1, "_cutDirection": 1 }
//!   ]
//! }
//! ```

use saberlink_shared::constants::{COLOR_BLACK, COLOR_BLUE, COLOR_RED, NOTE_LANES, NOTE_LAYERS};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::f32::consts::{FRAC_PI_2, FRAC_PI_4, PI};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Beatmap loading errors.
#[derive(Error, Debug)]
pub enum BeatmapError {
    /// File could not be read.
    #[error("cannot read beatmap {path}: {source}")]
    Io {
        /// Path that failed.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// Not a v2 beatmap document.
    #[error("malformed beatmap: {0}")]
    Parse(#[from] serde_json::Error),

    /// Tempo is zero, negative or not finite.
    #[error("invalid tempo: {0} bpm")]
    InvalidTempo(f32),

    /// A note lies outside the 4x3 grid or before the start.
    #[error("note {index} is invalid: {reason}")]
    InvalidNote {
        /// Position in `_notes`.
        index: usize,
        /// What is wrong with it.
        reason: &'static str,
    },
}

/// Note kind, encoded as `_type`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
pub enum NoteType {
    /// Cut with the left saber.
    Red,
    /// Cut with the right saber.
    Blue,
    /// Must not be cut.
    Bomb,
    /// Any other code.
    Other(u8),
}

impl NoteType {
    /// Display color.
    #[must_use]
    pub const fn color(self) -> u32 {
        match self {
            Self::Red => COLOR_RED,
            Self::Blue => COLOR_BLUE,
            Self::Bomb | Self::Other(_) => COLOR_BLACK,
        }
    }
}

impl From<u8> for NoteType {
    fn from(code: u8) -> Self {
        match code {
            0 => Self::Red,
            1 => Self::Blue,
            3 => Self::Bomb,
            other => Self::Other(other),
        }
    }
}

impl From<NoteType> for u8 {
    fn from(kind: NoteType) -> Self {
        match kind {
            NoteType::Red => 0,
            NoteType::Blue => 1,
            NoteType::Bomb => 3,
            NoteType::Other(code) => code,
        }
    }
}

/// Direction a note must be cut in, encoded as `_cutDirection`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
pub enum CutDirection {
    /// 0
    Up,
    /// 1
    Down,
    /// 2
    Left,
    /// 3
    Right,
    /// 4
    UpLeft,
    /// 5
    UpRight,
    /// 6
    DownLeft,
    /// 7
    DownRight,
    /// 8, and unknown codes
    Any,
}

impl CutDirection {
    /// Roll of the note cube around the runway axis, in radians.
    #[must_use]
    pub fn roll(self) -> f32 {
        match self {
            Self::Up | Self::Any => 0.0,
            Self::Down => PI,
            Self::Left => FRAC_PI_2,
            Self::Right => -FRAC_PI_2,
            Self::UpLeft => -3.0 * FRAC_PI_4,
            Self::UpRight => 3.0 * FRAC_PI_4,
            Self::DownLeft => -FRAC_PI_4,
            Self::DownRight => FRAC_PI_4,
        }
    }
}

impl From<u8> for CutDirection {
    fn from(code: u8) -> Self {
        match code {
            0 => Self::Up,
            1 => Self::Down,
            2 => Self::Left,
            3 => Self::Right,
            4 => Self::UpLeft,
            5 => Self::UpRight,
            6 => Self::DownLeft,
            7 => Self::DownRight,
            _ => Self::Any,
        }
    }
}

impl From<CutDirection> for u8 {
    fn from(direction: CutDirection) -> Self {
        match direction {
            CutDirection::Up => 0,
            CutDirection::Down => 1,
            CutDirection::Left => 2,
            CutDirection::Right => 3,
            CutDirection::UpLeft => 4,
            CutDirection::UpRight => 5,
            CutDirection::DownLeft => 6,
            CutDirection::DownRight => 7,
            CutDirection::Any => 8,
        }
    }
}

/// One note of a beatmap.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct NoteInfo {
    /// Beat at which the note reaches the player.
    #[serde(rename = "_time")]
    pub time: f32,
    /// Lane, 0 (left) to 3 (right).
    #[serde(rename = "_lineIndex")]
    pub line_index: u8,
    /// Row, 0 (bottom) to 2 (top).
    #[serde(rename = "_lineLayer")]
    pub line_layer: u8,
    /// Note kind.
    #[serde(rename = "_type")]
    pub note_type: NoteType,
    /// Cut direction.
    #[serde(rename = "_cutDirection")]
    pub cut_direction: CutDirection,
}

/// A parsed beatmap.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Beatmap {
    /// Tempo.
    #[serde(rename = "_beatsPerMinute")]
    pub bpm: f32,
    /// Notes, in file order.
    #[serde(rename = "_notes", default)]
    pub notes: Vec<NoteInfo>,
}

impl Beatmap {
    /// Parses and validates a JSON document.
    ///
    /// # Errors
    ///
    /// Malformed JSON, a bad tempo or a note off the grid.
    pub fn from_json(source: &str) -> Result<Self, BeatmapError> {
        let beatmap: Self = serde_json::from_str(source)?;
        beatmap.validate()?;
        Ok(beatmap)
    }

    /// Reads, parses and validates a JSON file.
    ///
    /// # Errors
    ///
    /// Unreadable file, or anything [`Beatmap::from_json`] rejects.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, BeatmapError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| BeatmapError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let beatmap = Self::from_json(&source)?;
        tracing::info!(path = %path.display(), notes = beatmap.notes.len(), bpm = beatmap.bpm, "beatmap loaded");
        Ok(beatmap)
    }

    fn validate(&self) -> Result<(), BeatmapError> {
        if !(self.bpm.is_finite() && self.bpm > 0.0) {
            return Err(BeatmapError::InvalidTempo(self.bpm));
        }
        for (index, note) in self.notes.iter().enumerate() {
            let reason = if !(note.time.is_finite() && note.time >= 0.0) {
                "time must be a non-negative beat"
            } else if u32::from(note.line_index) >= NOTE_LANES {
                "lane out of range"
            } else if u32::from(note.line_layer) >= NOTE_LAYERS {
                "layer out of range"
            } else {
                continue;
            };
            return Err(BeatmapError::InvalidNote { index, reason });
        }
        Ok(())
    }

    /// Groups notes by whole beat.
    #[must_use]
    pub fn bake(&self) -> NoteSchedule {
        NoteSchedule::from_notes(&self.notes)
    }
}

/// Notes grouped by the whole beat they fall on.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NoteSchedule {
    beats: BTreeMap<u32, Vec<NoteInfo>>,
    len: usize,
}

impl NoteSchedule {
    /// Groups notes by `floor(time)`, keeping file order within a beat.
    #[must_use]
    pub fn from_notes(notes: &[NoteInfo]) -> Self {
        let mut beats: BTreeMap<u32, Vec<NoteInfo>> = BTreeMap::new();
        for note in notes {
            beats.entry(note.time.floor() as u32).or_default().push(*note);
        }
        Self {
            beats,
            len: notes.len(),
        }
    }

    /// Notes due on `beat`. Empty for beats without notes.
    #[must_use]
    pub fn at(&self, beat: u32) -> &[NoteInfo] {
        self.beats.get(&beat).map_or(&[], Vec::as_slice)
    }

    /// Total notes.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// True without notes.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Last beat with notes.
    #[must_use]
    pub fn last_beat(&self) -> Option<u32> {
        self.beats.keys().next_back().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAP: &str = r#"{
        "_version": "2.0.0",
        "_beatsPerMinute": 96,
        "_notes": [
            { "_time": 4.0, "_lineIndex": 1, "_lineLayer": 0, "_type": 0, "_cutDirection": 1 },
            { "_time": 4.5, "_lineIndex": 2, "_lineLayer": 0, "_type": 1, "_cutDirection": 7 },
            { "_time": 6.25, "_lineIndex": 0, "_lineLayer": 2, "_type": 3, "_cutDirection": 8 }
        ],
        "_obstacles": []
    }"#;

    #[test]
    fn test_parses_v2_fields() {
        let map = Beatmap::from_json(MAP).unwrap();
        assert_eq!(map.bpm, 96.0);
        assert_eq!(map.notes.len(), 3);
        assert_eq!(map.notes[1].note_type, NoteType::Blue);
        assert_eq!(map.notes[1].cut_direction, CutDirection::DownRight);
        assert_eq!(map.notes[2].note_type, NoteType::Bomb);
    }

    #[test]
    fn test_bake_groups_by_whole_beat() {
        let schedule = Beatmap::from_json(MAP).unwrap().bake();
        assert_eq!(schedule.len(), 3);
        assert_eq!(schedule.at(4).len(), 2);
        assert_eq!(schedule.at(4)[0].line_index, 1);
        assert_eq!(schedule.at(6).len(), 1);
        assert!(schedule.at(5).is_empty());
        assert_eq!(schedule.last_beat(), Some(6));
    }

    #[test]
    fn test_cut_direction_roll_table() {
        assert_eq!(CutDirection::Up.roll(), 0.0);
        assert_eq!(CutDirection::Down.roll(), PI);
        assert_eq!(CutDirection::Left.roll(), FRAC_PI_2);
        assert_eq!(CutDirection::UpLeft.roll(), -3.0 * FRAC_PI_4);
        assert_eq!(CutDirection::from(42), CutDirection::Any);
        assert_eq!(CutDirection::Any.roll(), 0.0);
    }

    #[test]
    fn test_note_colors() {
        assert_eq!(NoteType::Red.color(), COLOR_RED);
        assert_eq!(NoteType::Blue.color(), COLOR_BLUE);
        assert_eq!(NoteType::Bomb.color(), COLOR_BLACK);
        assert_eq!(NoteType::from(2), NoteType::Other(2));
    }

    #[test]
    fn test_rejects_bad_tempo_and_grid() {
        let err = Beatmap::from_json(r#"{ "_beatsPerMinute": 0, "_notes": [] }"#).unwrap_err();
        assert!(matches!(err, BeatmapError::InvalidTempo(_)));

        let err = Beatmap::from_json(
            r#"{ "_beatsPerMinute": 120, "_notes": [
                { "_time": 1.0, "_lineIndex": 4, "_lineLayer": 0, "_type": 0, "_cutDirection": 0 }
            ] }"#,
        )
        .unwrap_err();
        assert!(matches!(err, BeatmapError::InvalidNote { index: 0, .. }));
    }
}
