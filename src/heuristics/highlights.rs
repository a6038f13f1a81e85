//! Highlight detection
//!
//! Finds the most salient windows of a track with three independent
//! peak-picking passes:
//!
//! | Signal | Reason | Peak feature |
//! |--------|--------|--------------|
//! | frame RMS | `energy_peak` | `energy` |
//! | onset strength | `novelty_peak` | `onset_strength` |
//! | mean spectral contrast | `spectral_interest` | `spectral_contrast` |
//!
//! Each pass keeps local maxima at or above the 75th percentile of its own
//! signal, in signal order, up to `count` peaks. The passes are merged, sorted
//! by score and truncated to `count`.
//!
//! Scores from different signals live on different scales. With
//! [`HighlightRanking::RawScore`] they are compared as-is, which tends to
//! favour whichever signal has the largest numbers (usually spectral
//! contrast, in dB). [`HighlightRanking::PercentileRank`] replaces each score
//! by its percentile rank within its own signal first.

use crate::error::AnalysisError;
use crate::features::period::peak_picking::find_peaks;
use crate::features::statistics::{percentile, percentile_rank};
use crate::frontend::{DspFrontEnd, RawSignals};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Percentile of a signal a peak must reach
const PEAK_PERCENTILE: f32 = 75.0;

/// How scores from different signals are compared
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HighlightRanking {
    /// Compare unnormalized peak values
    #[default]
    RawScore,
    /// Compare each peak's percentile rank within its own signal
    PercentileRank,
}

impl HighlightRanking {
    /// Configuration name
    pub fn as_str(self) -> &'static str {
        match self {
            HighlightRanking::RawScore => "raw-score",
            HighlightRanking::PercentileRank => "percentile-rank",
        }
    }
}

impl fmt::Display for HighlightRanking {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HighlightRanking {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "raw-score" => Ok(HighlightRanking::RawScore),
            "percentile-rank" => Ok(HighlightRanking::PercentileRank),
            other => Err(AnalysisError::ConfigurationError(format!(
                "unknown highlight ranking '{}' (expected raw-score or percentile-rank)",
                other
            ))),
        }
    }
}

/// Why a window was selected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HighlightReason {
    /// Loud section
    EnergyPeak,
    /// Burst of new events
    NoveltyPeak,
    /// Spectrally rich section
    SpectralInterest,
}

impl HighlightReason {
    /// Serialized name
    pub fn as_str(self) -> &'static str {
        match self {
            HighlightReason::EnergyPeak => "energy_peak",
            HighlightReason::NoveltyPeak => "novelty_peak",
            HighlightReason::SpectralInterest => "spectral_interest",
        }
    }
}

/// Signal the peak was found in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeakFeature {
    /// Frame RMS
    Energy,
    /// Onset strength
    OnsetStrength,
    /// Mean spectral contrast
    SpectralContrast,
}

/// A salient window of the track
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Highlight {
    /// Window start in seconds
    pub start: f32,
    /// Window end in seconds
    pub end: f32,
    /// Peak score (unit depends on the ranking policy)
    pub score: f32,
    /// Why the window was selected
    pub reason: HighlightReason,
    /// Signal the peak came from
    pub peak_feature: PeakFeature,
}

/// Highlight detection parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HighlightOptions {
    /// Maximum number of highlights (default: 3)
    pub count: usize,
    /// Window length in seconds (default: 10.0)
    pub window_seconds: f32,
    /// Cross-signal ranking policy (default: raw score)
    pub ranking: HighlightRanking,
}

impl Default for HighlightOptions {
    fn default() -> Self {
        Self {
            count: 3,
            window_seconds: 10.0,
            ranking: HighlightRanking::RawScore,
        }
    }
}

/// Frame-level curves the detector reads
#[derive(Debug, Clone, Copy)]
pub struct HighlightCurves<'a> {
    /// Frame RMS
    pub rms: &'a [f32],
    /// Onset strength per frame
    pub onset_envelope: &'a [f32],
    /// Mean spectral contrast per frame
    pub contrast: &'a [f32],
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Hop size of all three curves
    pub hop_size: usize,
}

fn peak_pass(
    signal: &[f32],
    curves: &HighlightCurves<'_>,
    options: &HighlightOptions,
    reason: HighlightReason,
    peak_feature: PeakFeature,
) -> Vec<Highlight> {
    if signal.is_empty() || options.count == 0 {
        return Vec::new();
    }

    let threshold = percentile(signal, PEAK_PERCENTILE);
    let last_frame = curves.rms.len().saturating_sub(1);
    let seconds_per_frame = curves.hop_size as f32 / curves.sample_rate as f32;

    find_peaks(signal, threshold)
        .into_iter()
        .take(options.count)
        .map(|idx| {
            let start = idx.min(last_frame) as f32 * seconds_per_frame;
            let value = signal[idx];
            let score = match options.ranking {
                HighlightRanking::RawScore => value,
                HighlightRanking::PercentileRank => percentile_rank(signal, value),
            };
            Highlight {
                start,
                end: start + options.window_seconds,
                score,
                reason,
                peak_feature,
            }
        })
        .collect()
}

/// Rank highlight windows from precomputed curves
///
/// # Example
///
/// ```
/// use soundprint::heuristics::highlights::{
///     highlights_from_curves, HighlightCurves, HighlightOptions, PeakFeature,
/// };
///
/// let mut rms = vec![0.1f32; 100];
/// rms[40] = 0.9;
/// let flat = vec![0.0f32; 100];
/// let curves = HighlightCurves {
///     rms: &rms,
///     onset_envelope: &flat,
///     contrast: &flat,
///     sample_rate: 44100,
///     hop_size: 512,
/// };
/// let highlights = highlights_from_curves(&curves, &HighlightOptions::default());
/// assert_eq!(highlights.len(), 1);
/// assert_eq!(highlights[0].peak_feature, PeakFeature::Energy);
/// assert!((highlights[0].end - highlights[0].start - 10.0).abs() < 1e-4);
/// ```
pub fn highlights_from_curves(
    curves: &HighlightCurves<'_>,
    options: &HighlightOptions,
) -> Vec<Highlight> {
    if curves.sample_rate == 0 || options.count == 0 {
        return Vec::new();
    }

    let mut highlights = peak_pass(
        curves.rms,
        curves,
        options,
        HighlightReason::EnergyPeak,
        PeakFeature::Energy,
    );
    highlights.extend(peak_pass(
        curves.onset_envelope,
        curves,
        options,
        HighlightReason::NoveltyPeak,
        PeakFeature::OnsetStrength,
    ));
    highlights.extend(peak_pass(
        curves.contrast,
        curves,
        options,
        HighlightReason::SpectralInterest,
        PeakFeature::SpectralContrast,
    ));

    let candidates = highlights.len();
    highlights.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
    highlights.truncate(options.count);

    log::debug!(
        "Highlights: kept {} of {} candidates ({})",
        highlights.len(),
        candidates,
        options.ranking
    );

    highlights
}

/// Rank highlight windows from a track's raw signals
pub fn highlights_from_signals(signals: &RawSignals, options: &HighlightOptions) -> Vec<Highlight> {
    let contrast = signals.spectral.contrast_frame_means();
    let curves = HighlightCurves {
        rms: &signals.rms,
        onset_envelope: &signals.onset_envelope,
        contrast: &contrast,
        sample_rate: signals.sample_rate,
        hop_size: signals.hop_size,
    };
    highlights_from_curves(&curves, options)
}

/// Detect up to `count` highlight windows in a waveform
///
/// Uses 10-second windows and raw-score ranking.
///
/// # Errors
///
/// Returns `AnalysisError::InvalidInput` for an empty waveform or zero sample
/// rate, and propagates front-end measurement failures.
pub fn detect_highlights(
    frontend: &dyn DspFrontEnd,
    waveform: &[f32],
    sample_rate: u32,
    count: usize,
) -> Result<Vec<Highlight>, AnalysisError> {
    if waveform.is_empty() {
        return Err(AnalysisError::InvalidInput("Empty audio samples".to_string()));
    }
    if sample_rate == 0 {
        return Err(AnalysisError::InvalidInput("Invalid sample rate: 0".to_string()));
    }

    let rms = frontend.frame_rms(waveform)?;
    let spectrogram = frontend.spectrogram(waveform, sample_rate)?;
    let onset_envelope = frontend.onset_strength(&spectrogram)?;
    let contrast = frontend
        .spectral(&spectrogram, waveform)?
        .contrast_frame_means();

    let curves = HighlightCurves {
        rms: &rms,
        onset_envelope: &onset_envelope,
        contrast: &contrast,
        sample_rate,
        hop_size: frontend.hop_size(),
    };
    let options = HighlightOptions {
        count,
        ..HighlightOptions::default()
    };
    Ok(highlights_from_curves(&curves, &options))
}
