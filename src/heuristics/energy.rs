//! Perceptual energy estimation
//!
//! Produces a 0-1 energy score that does not simply follow mastering
//! loudness. The waveform is first normalized to a loudness target, then:
//!
//! 1. **Active RMS**: frame RMS in dB relative to the loudest frame; frames
//!    at or below the 25th percentile are dropped and the rest averaged
//!    (all frames when nothing survives)
//! 2. **Spectral energy**: mean onset strength / 10
//! 3. **Combination**: `active_rms * w_rms + spectral_energy * w_spectral`
//! 4. **Curve**: the model's perceptual mapping to [0, 1]
//! 5. **Half-time**: × 0.6
//!
//! Two models are available. [`EnergyModel::PowerLaw`] is the current curve;
//! [`EnergyModel::LegacyLog`] reproduces the older logarithmic curve and
//! weighting so scores can be compared with earlier libraries.

use crate::error::AnalysisError;
use crate::features::statistics::{mean, percentile};
use crate::frontend::DspFrontEnd;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Percentile of frame levels treated as inactive
const QUIET_PERCENTILE: f32 = 25.0;

/// Divisor mapping mean onset strength to spectral energy
const SPECTRAL_SCALE: f32 = 10.0;

/// Energy multiplier for half-time tracks
const HALFTIME_FACTOR: f32 = 0.6;

/// Level floor for frames in dB below the loudest frame
const FLOOR_DB: f32 = -80.0;

/// Energy curve variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EnergyModel {
    /// `min(1, (combined / 0.2)^0.7)`, weights 0.4 RMS / 0.6 spectral
    #[default]
    PowerLaw,
    /// `min(1, log10(combined + 0.01) / log10(0.51) + 1)`, weights 0.6 / 0.4
    ///
    /// Saturates at 1.0 for combined values below ~0.99.
    LegacyLog,
}

impl EnergyModel {
    /// Weighting that belongs to this model
    pub fn default_weights(self) -> EnergyWeights {
        match self {
            EnergyModel::PowerLaw => EnergyWeights {
                rms: 0.4,
                spectral: 0.6,
            },
            EnergyModel::LegacyLog => EnergyWeights {
                rms: 0.6,
                spectral: 0.4,
            },
        }
    }

    /// Map a combined energy value to [0, 1]
    ///
    /// Non-positive (or NaN) input maps to exactly 0.
    ///
    /// # Example
    ///
    /// ```
    /// use soundprint::heuristics::energy::EnergyModel;
    ///
    /// assert_eq!(EnergyModel::PowerLaw.curve(0.0), 0.0);
    /// assert_eq!(EnergyModel::PowerLaw.curve(0.2), 1.0);
    /// assert_eq!(EnergyModel::LegacyLog.curve(0.5), 1.0);
    /// ```
    pub fn curve(self, combined: f32) -> f32 {
        if combined.is_nan() || combined <= 0.0 {
            return 0.0;
        }
        let value = match self {
            EnergyModel::PowerLaw => (combined / 0.2).powf(0.7),
            EnergyModel::LegacyLog => (combined + 0.01).log10() / 0.51f32.log10() + 1.0,
        };
        value.clamp(0.0, 1.0)
    }

    /// Configuration name
    pub fn as_str(self) -> &'static str {
        match self {
            EnergyModel::PowerLaw => "power-law",
            EnergyModel::LegacyLog => "legacy-log",
        }
    }
}

impl fmt::Display for EnergyModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EnergyModel {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "power-law" => Ok(EnergyModel::PowerLaw),
            "legacy-log" => Ok(EnergyModel::LegacyLog),
            other => Err(AnalysisError::ConfigurationError(format!(
                "unknown energy model '{}' (expected power-law or legacy-log)",
                other
            ))),
        }
    }
}

/// Relative weights of the active-RMS and spectral-energy terms
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnergyWeights {
    /// Weight of the active RMS term
    pub rms: f32,
    /// Weight of the spectral energy term
    pub spectral: f32,
}

/// Measured inputs of the energy curve
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EnergyInputs {
    /// Mean RMS of the non-quiet frames
    pub active_rms: f32,
    /// Mean onset strength / 10
    pub spectral_energy: f32,
}

/// Energy estimate with its diagnostic terms
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnergyEstimate {
    /// Perceptual energy in [0, 1]
    pub energy: f32,
    /// Inputs the score was computed from
    pub inputs: EnergyInputs,
}

/// Mean RMS of the frames louder than the quietest quarter
///
/// Levels are measured in dB relative to the loudest frame (floored at
/// -80 dB); frames strictly above the 25th percentile of those levels are
/// active. When no frame is active every frame is used.
///
/// # Example
///
/// ```
/// use soundprint::heuristics::energy::active_rms;
///
/// // The quiet intro frames do not drag the level down
/// let rms = [0.001, 0.001, 0.5, 0.5, 0.5, 0.5, 0.5, 0.5];
/// assert!((active_rms(&rms) - 0.5).abs() < 1e-6);
/// ```
pub fn active_rms(rms: &[f32]) -> f32 {
    if rms.is_empty() {
        return 0.0;
    }
    let peak = rms.iter().copied().fold(0.0f32, f32::max);
    if peak <= 0.0 {
        return 0.0;
    }

    let levels_db: Vec<f32> = rms
        .iter()
        .map(|&r| (20.0 * (r / peak).max(1e-10).log10()).max(FLOOR_DB))
        .collect();
    let threshold = percentile(&levels_db, QUIET_PERCENTILE);

    let active: Vec<f32> = rms
        .iter()
        .zip(&levels_db)
        .filter(|(_, db)| **db > threshold)
        .map(|(&r, _)| r)
        .collect();

    if active.is_empty() {
        mean(rms)
    } else {
        mean(&active)
    }
}

/// Energy inputs from the RMS and onset curves of a loudness-normalized waveform
pub fn energy_inputs(normalized_rms: &[f32], normalized_onset_envelope: &[f32]) -> EnergyInputs {
    EnergyInputs {
        active_rms: active_rms(normalized_rms),
        spectral_energy: mean(normalized_onset_envelope) / SPECTRAL_SCALE,
    }
}

/// Map energy inputs to a perceptual energy score
///
/// # Arguments
///
/// * `inputs` - Active RMS and spectral energy
/// * `model` - Energy curve
/// * `weights` - Term weights
/// * `is_halftime` - Whether the track has a half-time feel
///
/// # Example
///
/// ```
/// use soundprint::heuristics::energy::{perceptual_energy, EnergyInputs, EnergyModel};
///
/// let model = EnergyModel::PowerLaw;
/// let silent = EnergyInputs { active_rms: 0.0, spectral_energy: 0.0 };
/// assert_eq!(perceptual_energy(silent, model, model.default_weights(), false), 0.0);
/// ```
pub fn perceptual_energy(
    inputs: EnergyInputs,
    model: EnergyModel,
    weights: EnergyWeights,
    is_halftime: bool,
) -> f32 {
    let combined = inputs.active_rms * weights.rms + inputs.spectral_energy * weights.spectral;
    let mut energy = model.curve(combined);
    if is_halftime {
        energy *= HALFTIME_FACTOR;
    }

    log::debug!(
        "Energy ({}): active_rms={:.4}, spectral={:.4}, combined={:.4} -> {:.3}{}",
        model,
        inputs.active_rms,
        inputs.spectral_energy,
        combined,
        energy,
        if is_halftime { " (half-time)" } else { "" }
    );

    energy
}

/// Estimate perceptual energy straight from a waveform
///
/// Normalizes the waveform to `target_lufs` with the front-end, measures the
/// energy inputs on the normalized signal and applies the model.
///
/// # Errors
///
/// Propagates loudness normalization and measurement failures (for example a
/// silent waveform cannot be normalized)
pub fn estimate_energy(
    frontend: &dyn DspFrontEnd,
    waveform: &[f32],
    sample_rate: u32,
    target_lufs: f32,
    model: EnergyModel,
    weights: EnergyWeights,
    is_halftime: bool,
) -> Result<EnergyEstimate, AnalysisError> {
    let normalized = frontend.normalize_loudness(waveform, sample_rate, target_lufs)?;
    let rms = frontend.frame_rms(&normalized)?;
    let spectrogram = frontend.spectrogram(&normalized, sample_rate)?;
    let onset_envelope = frontend.onset_strength(&spectrogram)?;

    let inputs = energy_inputs(&rms, &onset_envelope);
    Ok(EnergyEstimate {
        energy: perceptual_energy(inputs, model, weights, is_halftime),
        inputs,
    })
}
