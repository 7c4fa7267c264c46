//! Composition document model — tracks, snippets, notes and lyrics.
//!
//! A [`Composition`] is an immutable value from the engine's point of view:
//! editors and the assistant replace it wholesale, and the audio side only
//! reads a snapshot at the moment it schedules sound. The JSON wire format
//! uses camelCase keys and upper-case instrument tags.

pub mod history;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use history::{CompositionHistory, HistoryEntry};

/// Descriptive scale labels offered to the assistant. Not enforced.
pub const SCALES: [&str; 8] = [
    "C Major",
    "A Minor",
    "G Mixolydian",
    "D Dorian",
    "F Lydian",
    "E Phrygian",
    "Chromatic",
    "Whole Tone",
];

/// Descriptive time-signature labels. Not enforced.
pub const TIME_SIGNATURES: [&str; 5] = ["4/4", "3/4", "5/4", "7/8", "11/8"];

/// Errors raised while loading or validating a composition document.
#[derive(Debug, Error)]
pub enum CompositionError {
    /// The document is not valid JSON or misses a required field.
    #[error("composition parse error: {0}")]
    Parse(#[from] serde_json::Error),
    /// A field is present but holds a value the studio cannot play.
    #[error("invalid composition at {path}: {reason}")]
    Invalid { path: String, reason: String },
}

/// Instrument category of a snippet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum InstrumentType {
    Synth,
    Bass,
    Drums,
    Pad,
    Pluck,
}

impl InstrumentType {
    /// All instrument categories in display order.
    pub const ALL: [InstrumentType; 5] = [
        InstrumentType::Synth,
        InstrumentType::Bass,
        InstrumentType::Drums,
        InstrumentType::Pad,
        InstrumentType::Pluck,
    ];

    /// Parse a case-insensitive instrument tag (e.g. "bass", "DRUMS").
    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|i| i.tag().eq_ignore_ascii_case(tag))
    }

    /// Upper-case wire tag.
    pub fn tag(self) -> &'static str {
        match self {
            InstrumentType::Synth => "SYNTH",
            InstrumentType::Bass => "BASS",
            InstrumentType::Drums => "DRUMS",
            InstrumentType::Pad => "PAD",
            InstrumentType::Pluck => "PLUCK",
        }
    }
}

/// One note inside a snippet. All timing and level values are fractions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    /// Pitch token such as "C4", "A#3" or "Eb2".
    pub pitch: String,
    /// Position within the snippet, in `[0, 1)`.
    pub start_time: f64,
    /// Length in beats.
    pub duration: f64,
    /// Peak level, in `[0, 1]`.
    pub velocity: f64,
}

impl Note {
    pub fn new(pitch: impl Into<String>, start_time: f64, duration: f64, velocity: f64) -> Self {
        Self {
            pitch: pitch.into(),
            start_time,
            duration,
            velocity,
        }
    }
}

/// A short note pattern played by one instrument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snippet {
    #[serde(default)]
    pub id: String,
    pub name: String,
    pub instrument: InstrumentType,
    pub notes: Vec<Note>,
    #[serde(default)]
    pub color: String,
    /// How the notes were generated. Informational only.
    pub math_pattern: String,
    /// Generator-reported density, 0 to 100. Informational only.
    #[serde(default)]
    pub complexity: f64,
    /// Asks the assistant not to regenerate this snippet. The engine ignores it.
    #[serde(default)]
    pub is_locked: bool,
}

/// A named lane of snippets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    #[serde(default)]
    pub id: String,
    pub name: String,
    pub snippets: Vec<Snippet>,
    #[serde(default = "default_volume")]
    pub volume: f64,
    #[serde(default)]
    pub muted: bool,
}

impl Track {
    /// The snippet the transport plays each cycle. Only the first one is used.
    pub fn active_snippet(&self) -> Option<&Snippet> {
        self.snippets.first()
    }
}

fn default_volume() -> f64 {
    1.0
}

fn default_time_signature() -> String {
    "4/4".to_string()
}

/// Root document of one piece.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Composition {
    pub title: String,
    pub bpm: u32,
    pub scale: String,
    #[serde(default = "default_time_signature")]
    pub time_signature: String,
    /// Studio-wide transposition in semitones.
    #[serde(default)]
    pub global_pitch_shift: i32,
    pub tracks: Vec<Track>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lyrics: Option<String>,
}

impl Composition {
    /// Parse and validate a composition from JSON.
    pub fn from_json(json: &str) -> Result<Self, CompositionError> {
        let composition: Composition = serde_json::from_str(json)?;
        composition.validate()?;
        Ok(composition)
    }

    /// Serialize to pretty-printed JSON.
    pub fn to_json_pretty(&self) -> Result<String, CompositionError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check the values the engine relies on.
    ///
    /// Scale and time signature are labels and are not checked.
    pub fn validate(&self) -> Result<(), CompositionError> {
        if self.bpm == 0 {
            return Err(invalid("bpm", "tempo must be greater than zero"));
        }

        for (t, track) in self.tracks.iter().enumerate() {
            for (s, snippet) in track.snippets.iter().enumerate() {
                if !(0.0..=100.0).contains(&snippet.complexity) {
                    return Err(invalid(
                        format!("tracks[{t}].snippets[{s}].complexity"),
                        "complexity must be within 0..=100",
                    ));
                }
                for (n, note) in snippet.notes.iter().enumerate() {
                    let path = format!("tracks[{t}].snippets[{s}].notes[{n}]");
                    if !(0.0..1.0).contains(&note.start_time) {
                        return Err(invalid(
                            format!("{path}.startTime"),
                            "start time must be within [0, 1)",
                        ));
                    }
                    if !(note.duration > 0.0) {
                        return Err(invalid(
                            format!("{path}.duration"),
                            "duration must be positive",
                        ));
                    }
                    if !(0.0..=1.0).contains(&note.velocity) {
                        return Err(invalid(
                            format!("{path}.velocity"),
                            "velocity must be within [0, 1]",
                        ));
                    }
                }
            }
        }

        Ok(())
    }

    /// Unmuted tracks that have something to play, in stored order.
    pub fn audible_tracks(&self) -> impl Iterator<Item = &Track> {
        self.tracks
            .iter()
            .filter(|t| !t.muted && !t.snippets.is_empty())
    }

    /// Return a copy with one snippet replaced, located by track and snippet id.
    ///
    /// Returns `None` when either id is unknown.
    pub fn with_snippet(&self, track_id: &str, snippet: Snippet) -> Option<Self> {
        let mut next = self.clone();
        let track = next.tracks.iter_mut().find(|t| t.id == track_id)?;
        let slot = track.snippets.iter_mut().find(|s| s.id == snippet.id)?;
        *slot = snippet;
        Some(next)
    }
}

fn invalid(path: impl Into<String>, reason: &str) -> CompositionError {
    CompositionError::Invalid {
        path: path.into(),
        reason: reason.to_string(),
    }
}
