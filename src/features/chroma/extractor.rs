//! Chroma vector extraction
//!
//! Folds STFT power into 12 pitch classes. Bin `k` with frequency `f` maps to
//! pitch class `(round(12 * log2(f / 440)) + 9) mod 12` (A = 9), so C = 0.
//! Only bins between 32 Hz and 5 kHz contribute.

use super::normalization::normalize_max;
use crate::error::AnalysisError;
use crate::features::stft::Spectrogram;

/// Lowest frequency folded into the chromagram
const MIN_FREQ_HZ: f32 = 32.0;

/// Highest frequency folded into the chromagram
const MAX_FREQ_HZ: f32 = 5000.0;

/// Pitch class of a frequency (C = 0, ..., B = 11)
pub fn pitch_class(freq_hz: f32) -> usize {
    let semitones_from_a4 = (12.0 * (freq_hz / 440.0).log2()).round() as i32;
    (semitones_from_a4 + 9).rem_euclid(12) as usize
}

/// Extract one 12-bin chroma vector per spectrogram frame
///
/// # Arguments
///
/// * `spec` - Magnitude spectrogram
///
/// # Returns
///
/// Chroma vectors, each normalized so its largest bin is 1.0 (silent frames
/// stay all-zero)
///
/// # Errors
///
/// Returns `AnalysisError::InvalidInput` if the spectrogram has no frames
pub fn extract_chroma(spec: &Spectrogram) -> Result<Vec<[f32; 12]>, AnalysisError> {
    if spec.frames.is_empty() {
        return Err(AnalysisError::InvalidInput(
            "Empty spectrogram".to_string(),
        ));
    }

    // Precompute the pitch class of every bin in range
    let bin_classes: Vec<Option<usize>> = (0..spec.n_bins())
        .map(|k| {
            let f = spec.bin_frequency(k);
            (MIN_FREQ_HZ..=MAX_FREQ_HZ).contains(&f).then(|| pitch_class(f))
        })
        .collect();

    let chroma: Vec<[f32; 12]> = spec
        .frames
        .iter()
        .map(|frame| {
            let mut bins = [0.0f32; 12];
            for (mag, class) in frame.iter().zip(bin_classes.iter()) {
                if let Some(pc) = class {
                    bins[*pc] += mag * mag;
                }
            }
            normalize_max(&mut bins);
            bins
        })
        .collect();

    log::debug!("Extracted {} chroma vectors", chroma.len());

    Ok(chroma)
}
