//! Valence and silence estimators
//!
//! Valence is approximated from spectral brightness: a mean centroid of
//! 1 kHz or less reads as 0.0, 4 kHz or more as 1.0, linear in between.

use crate::features::statistics::mean;
use crate::preprocessing::silence::silence_ratio;

/// Centroid (Hz) at which valence starts rising
const VALENCE_CENTROID_LOW: f32 = 1000.0;

/// Centroid span (Hz) from 0.0 to 1.0 valence
const VALENCE_CENTROID_SPAN: f32 = 3000.0;

/// Valence in [0, 1] from the spectral centroid curve
///
/// # Example
///
/// ```
/// use soundprint::heuristics::valence::estimate_valence;
///
/// assert_eq!(estimate_valence(&[2500.0, 2500.0]), 0.5);
/// assert_eq!(estimate_valence(&[400.0]), 0.0);
/// assert_eq!(estimate_valence(&[]), 0.0);
/// ```
pub fn estimate_valence(spectral_centroid: &[f32]) -> f32 {
    let centroid = mean(spectral_centroid);
    let valence = ((centroid - VALENCE_CENTROID_LOW) / VALENCE_CENTROID_SPAN).clamp(0.0, 1.0);
    if valence.is_nan() {
        0.0
    } else {
        valence
    }
}

/// Fraction of the waveform more than `threshold_db` below the track peak
///
/// See [`silence_ratio`] for the empty and all-zero cases.
pub fn estimate_silence(waveform: &[f32], threshold_db: f32) -> f32 {
    silence_ratio(waveform, threshold_db)
}
