//! Descriptor and result types

use crate::error::AnalysisError;
use crate::heuristics::highlights::Highlight;
use crate::heuristics::quality::{QualityBreakdown, QualityInputs};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Version of the heuristic engine that produced a descriptor
pub const ENGINE_VERSION: &str = "0.3.0";

const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Musical key
///
/// Serialized as its label, e.g. `"F# minor"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum Key {
    /// Major key (0 = C, 1 = C#, ..., 11 = B)
    Major(u32),
    /// Minor key (0 = C, 1 = C#, ..., 11 = B)
    Minor(u32),
}

/// Tonics in open-key order: position `n` is the key labelled `n + 1`
const OPEN_KEY_MAJOR: [u32; 12] = [0, 7, 2, 9, 4, 11, 6, 1, 8, 3, 10, 5];
const OPEN_KEY_MINOR: [u32; 12] = [9, 4, 11, 6, 1, 8, 3, 10, 5, 0, 7, 2];

impl Key {
    /// Tonic pitch class (0 = C, ..., 11 = B)
    pub fn tonic(&self) -> u32 {
        match self {
            Key::Major(i) | Key::Minor(i) => *i % 12,
        }
    }

    /// Circle-of-fifths code used by DJ software: `1A`..`12A` for major,
    /// `1B`..`12B` for minor. Relative keys share a number.
    ///
    /// # Example
    ///
    /// ```
    /// use soundprint::analysis::result::Key;
    ///
    /// assert_eq!(Key::Major(0).numerical(), "1A");
    /// assert_eq!(Key::Minor(9).numerical(), "1B");
    /// assert_eq!(Key::Minor(6).numerical(), "4B");
    /// ```
    pub fn numerical(&self) -> String {
        let (order, letter) = match self {
            Key::Major(_) => (&OPEN_KEY_MAJOR, 'A'),
            Key::Minor(_) => (&OPEN_KEY_MINOR, 'B'),
        };
        let tonic = self.tonic();
        let step = order.iter().position(|&t| t == tonic).unwrap_or(0);
        format!("{}{}", step + 1, letter)
    }
}

impl fmt::Display for Key {
    /// Descriptor label: `"<pitch class> <major|minor>"`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mode = match self {
            Key::Major(_) => "major",
            Key::Minor(_) => "minor",
        };
        write!(f, "{} {}", NOTE_NAMES[self.tonic() as usize], mode)
    }
}

impl FromStr for Key {
    type Err = AnalysisError;

    /// Parse a descriptor label such as `"A minor"`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || AnalysisError::InvalidInput(format!("invalid key label '{}'", s));
        let (note, mode) = s.trim().split_once(' ').ok_or_else(invalid)?;
        let tonic = NOTE_NAMES
            .iter()
            .position(|&n| n == note)
            .ok_or_else(invalid)? as u32;
        match mode.trim() {
            "major" => Ok(Key::Major(tonic)),
            "minor" => Ok(Key::Minor(tonic)),
            _ => Err(invalid()),
        }
    }
}

impl From<Key> for String {
    fn from(key: Key) -> Self {
        key.to_string()
    }
}

impl TryFrom<String> for Key {
    type Error = AnalysisError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Every descriptor of one analyzed track
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackDescriptor {
    /// Duration in seconds
    pub duration: f32,

    /// Resolved tempo in BPM
    pub bpm: f32,

    /// Perceived tempo: `bpm / 2` for half-time tracks, else `bpm`
    pub effective_bpm: f32,

    /// Half-time feel detected
    pub is_halftime: bool,

    /// Estimated key
    pub key: Key,

    /// Perceptual energy (0.0-1.0)
    pub energy: f32,

    /// Active RMS of the loudness-normalized waveform (energy diagnostic)
    pub energy_raw: f32,

    /// Spectral-energy term of the energy model (energy diagnostic)
    pub energy_spectral: f32,

    /// Spectral-brightness valence (0.0-1.0)
    pub valence: f32,

    /// Level of the active frames in dB (floored at -80 dB)
    pub loudness: f32,

    /// Integrated loudness in LUFS
    pub integrated_loudness: f32,

    /// Mean spectral centroid in Hz
    pub spectral_centroid: f32,

    /// Mean 85% spectral rolloff in Hz
    pub spectral_rolloff: f32,

    /// Mean zero-crossing rate
    pub zero_crossing_rate: f32,

    /// Fraction of samples more than 40 dB below the peak (0.0-1.0)
    pub silence_ratio: f32,

    /// Tempo confidence (0.0-1.0)
    pub tempo_confidence: f32,

    /// Overall quality (0.0-1.0), when requested
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality_score: Option<f64>,

    /// Quality sub-scores, when requested
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality_breakdown: Option<QualityBreakdown>,

    /// Highlight windows, when requested
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub highlights: Option<Vec<Highlight>>,

    /// Engine version that produced this descriptor
    pub engine_version: String,
}

impl TrackDescriptor {
    /// Values the quality rubric reads
    pub fn quality_inputs(&self) -> QualityInputs {
        QualityInputs {
            duration: self.duration,
            loudness_db: self.loudness,
            silence_ratio: self.silence_ratio,
            tempo_confidence: self.tempo_confidence,
        }
    }

    /// Flat `key: value` listing, one descriptor per line
    pub fn to_flat_lines(&self) -> Vec<String> {
        let mut lines = vec![
            format!("duration: {:.2}", self.duration),
            format!("bpm: {:.2}", self.bpm),
            format!("effective_bpm: {:.2}", self.effective_bpm),
            format!("is_halftime: {}", self.is_halftime),
            format!("key: {}", self.key),
            format!("key_numerical: {}", self.key.numerical()),
            format!("energy: {:.3}", self.energy),
            format!("energy_raw: {:.4}", self.energy_raw),
            format!("energy_spectral: {:.4}", self.energy_spectral),
            format!("valence: {:.3}", self.valence),
            format!("loudness: {:.2}", self.loudness),
            format!("integrated_loudness: {:.2}", self.integrated_loudness),
            format!("spectral_centroid: {:.1}", self.spectral_centroid),
            format!("spectral_rolloff: {:.1}", self.spectral_rolloff),
            format!("zero_crossing_rate: {:.4}", self.zero_crossing_rate),
            format!("silence_ratio: {:.3}", self.silence_ratio),
            format!("tempo_confidence: {:.3}", self.tempo_confidence),
        ];
        if let Some(score) = self.quality_score {
            lines.push(format!("quality_score: {:.2}", score));
        }
        if let Some(b) = &self.quality_breakdown {
            lines.push(format!(
                "quality_breakdown: duration={:.2} loudness={:.2} silence={:.2} tempo={:.2}",
                b.duration, b.loudness, b.silence, b.tempo
            ));
        }
        if let Some(highlights) = &self.highlights {
            for (i, h) in highlights.iter().enumerate() {
                lines.push(format!(
                    "highlight_{}: {:.2}-{:.2}s score={:.3} ({})",
                    i + 1,
                    h.start,
                    h.end,
                    h.score,
                    h.reason.as_str()
                ));
            }
        }
        lines.push(format!("engine_version: {}", self.engine_version));
        lines
    }
}

/// Outcome of analyzing one track: a descriptor or an error record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TrackResult {
    /// Successful analysis
    Descriptor(Box<TrackDescriptor>),
    /// Failed analysis, serialized as `{"error": "..."}`
    Error {
        /// Human-readable failure
        error: String,
    },
}

impl TrackResult {
    /// Error record from any failure
    pub fn from_error(error: impl fmt::Display) -> Self {
        TrackResult::Error {
            error: error.to_string(),
        }
    }

    /// True for a successful analysis
    pub fn is_ok(&self) -> bool {
        matches!(self, TrackResult::Descriptor(_))
    }

    /// The descriptor, if the analysis succeeded
    pub fn descriptor(&self) -> Option<&TrackDescriptor> {
        match self {
            TrackResult::Descriptor(d) => Some(d.as_ref()),
            TrackResult::Error { .. } => None,
        }
    }

    /// The error message, if the analysis failed
    pub fn error(&self) -> Option<&str> {
        match self {
            TrackResult::Descriptor(_) => None,
            TrackResult::Error { error } => Some(error),
        }
    }
}
