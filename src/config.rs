//! Configuration parameters for descriptor analysis

use crate::error::AnalysisError;
use crate::heuristics::energy::{EnergyModel, EnergyWeights};
use crate::heuristics::highlights::HighlightRanking;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Engine configuration parameters
///
/// Every field has a default, so a configuration file only needs to list the
/// values it overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    // STFT parameters
    /// Frame size for STFT and frame RMS (default: 2048)
    pub frame_size: usize,

    /// Hop size between frames (default: 512)
    pub hop_size: usize,

    // Raw tempo search
    /// Minimum BPM considered by the raw tempo estimator (default: 30.0)
    pub min_bpm: f32,

    /// Maximum BPM considered by the raw tempo estimator (default: 300.0)
    pub max_bpm: f32,

    /// Center of the log-normal tempo prior in BPM (default: 120.0)
    pub tempo_prior_bpm: f32,

    // Loudness
    /// Loudness target for energy measurement in LUFS (default: -14.0)
    pub target_loudness_lufs: f32,

    /// Optional peak headroom in dB; when set, loudness normalization never
    /// pushes the peak above `-max_headroom_db` dBFS (default: unlimited)
    pub max_headroom_db: Option<f32>,

    /// Silence threshold in dB relative to the track peak (default: -40.0)
    pub silence_threshold_db: f32,

    // Energy
    /// Energy curve variant (default: power law)
    pub energy_model: EnergyModel,

    /// Override for the active-RMS / spectral-energy weighting; `None` uses
    /// the weighting that belongs to `energy_model`
    pub energy_weights: Option<EnergyWeights>,

    // Highlights
    /// Cross-signal highlight ranking policy (default: raw score)
    pub highlight_ranking: HighlightRanking,

    /// Highlight window length in seconds (default: 10.0)
    ///
    /// Descriptors promise `end = start + 10`. Any other value produces
    /// windows outside that contract and is meant for local experiments.
    pub highlight_window_seconds: f32,

    /// Number of highlights to return (default: 3)
    pub num_highlights: usize,

    // Optional descriptor sections
    /// Attach quality score and breakdown (default: false)
    pub include_quality: bool,

    /// Attach highlight list (default: false)
    pub include_highlights: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            frame_size: 2048,
            hop_size: 512,
            min_bpm: 30.0,
            max_bpm: 300.0,
            tempo_prior_bpm: 120.0,
            target_loudness_lufs: -14.0,
            max_headroom_db: None,
            silence_threshold_db: -40.0,
            energy_model: EnergyModel::PowerLaw,
            energy_weights: None,
            highlight_ranking: HighlightRanking::RawScore,
            highlight_window_seconds: 10.0,
            num_highlights: 3,
            include_quality: false,
            include_highlights: false,
        }
    }
}

impl EngineConfig {
    /// Load a (possibly partial) configuration from a JSON file
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::ConfigurationError` if the file cannot be read,
    /// is not valid JSON, or holds out-of-range values.
    pub fn from_json_file(path: &Path) -> Result<Self, AnalysisError> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            AnalysisError::ConfigurationError(format!("cannot read {}: {}", path.display(), e))
        })?;
        let config: EngineConfig = serde_json::from_str(&text).map_err(|e| {
            AnalysisError::ConfigurationError(format!("invalid config {}: {}", path.display(), e))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Effective energy weighting (explicit override, else the model's own)
    pub fn effective_energy_weights(&self) -> EnergyWeights {
        self.energy_weights
            .unwrap_or_else(|| self.energy_model.default_weights())
    }

    /// Check that every parameter is usable
    pub fn validate(&self) -> Result<(), AnalysisError> {
        let fail = |msg: String| Err(AnalysisError::ConfigurationError(msg));

        if self.frame_size == 0 || self.hop_size == 0 {
            return fail("frame_size and hop_size must be > 0".to_string());
        }
        if self.hop_size > self.frame_size {
            return fail(format!(
                "hop_size ({}) must not exceed frame_size ({})",
                self.hop_size, self.frame_size
            ));
        }
        if !(self.min_bpm > 0.0 && self.max_bpm > self.min_bpm) {
            return fail(format!(
                "invalid BPM range: [{:.1}, {:.1}]",
                self.min_bpm, self.max_bpm
            ));
        }
        if !(self.tempo_prior_bpm > 0.0) {
            return fail("tempo_prior_bpm must be > 0".to_string());
        }
        if !self.target_loudness_lufs.is_finite() || self.target_loudness_lufs >= 0.0 {
            return fail(format!(
                "target_loudness_lufs must be a negative number, got {}",
                self.target_loudness_lufs
            ));
        }
        if let Some(headroom) = self.max_headroom_db {
            if !headroom.is_finite() || headroom < 0.0 {
                return fail(format!("max_headroom_db must be >= 0, got {}", headroom));
            }
        }
        if !self.silence_threshold_db.is_finite() || self.silence_threshold_db >= 0.0 {
            return fail(format!(
                "silence_threshold_db must be negative, got {}",
                self.silence_threshold_db
            ));
        }
        if let Some(w) = self.energy_weights {
            let valid = w.rms.is_finite()
                && w.spectral.is_finite()
                && w.rms >= 0.0
                && w.spectral >= 0.0;
            if !valid || w.rms + w.spectral <= 0.0 {
                return fail(format!(
                    "energy weights must be non-negative and not both zero, got {:?}",
                    w
                ));
            }
        }
        if !(self.highlight_window_seconds > 0.0) {
            return fail("highlight_window_seconds must be > 0".to_string());
        }
        Ok(())
    }
}
