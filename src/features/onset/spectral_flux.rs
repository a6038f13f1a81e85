//! Spectral flux onset strength
//!
//! Computes an onset-strength envelope from a mel-scaled power spectrogram:
//!
//! 1. Fold the STFT power into 128 triangular mel bands
//! 2. Convert to dB relative to the loudest band value, floored 80 dB below it
//! 3. Half-wave rectified first difference along time, per band
//! 4. Mean across bands
//!
//! The envelope has one value per STFT frame; frame 0 is always 0.
//!
//! # Example
//!
//! ```no_run
//! use soundprint::features::stft::compute_stft;
//! use soundprint::features::onset::spectral_flux::onset_strength;
//!
//! let samples = vec![0.0f32; 44100 * 10];
//! let spec = compute_stft(&samples, 44100, 2048, 512)?;
//! let envelope = onset_strength(&spec)?;
//! assert_eq!(envelope.len(), spec.n_frames());
//! # Ok::<(), soundprint::AnalysisError>(())
//! ```

use crate::error::AnalysisError;
use crate::features::stft::Spectrogram;

/// Number of mel bands
pub const N_MELS: usize = 128;

/// Dynamic range kept below the loudest mel value
const TOP_DB: f32 = 80.0;

/// Power floor before taking logarithms
const AMIN: f32 = 1e-10;

fn hz_to_mel(hz: f32) -> f32 {
    2595.0 * (1.0 + hz / 700.0).log10()
}

fn mel_to_hz(mel: f32) -> f32 {
    700.0 * (10.0_f32.powf(mel / 2595.0) - 1.0)
}

/// One triangular mel filter stored sparsely
#[derive(Debug, Clone)]
struct MelBand {
    start_bin: usize,
    weights: Vec<f32>,
}

/// Area-normalized triangular filters from 0 Hz to Nyquist
fn mel_filterbank(spec: &Spectrogram, n_mels: usize) -> Vec<MelBand> {
    let nyquist = spec.sample_rate as f32 / 2.0;
    let mel_max = hz_to_mel(nyquist);
    let edges: Vec<f32> = (0..n_mels + 2)
        .map(|i| mel_to_hz(mel_max * i as f32 / (n_mels + 1) as f32))
        .collect();

    (0..n_mels)
        .map(|m| {
            let (lo, center, hi) = (edges[m], edges[m + 1], edges[m + 2]);
            let norm = 2.0 / (hi - lo).max(AMIN);
            let mut start_bin = None;
            let mut weights = Vec::new();

            for k in 0..spec.n_bins() {
                let f = spec.bin_frequency(k);
                let w = if f > lo && f <= center {
                    (f - lo) / (center - lo).max(AMIN)
                } else if f > center && f < hi {
                    (hi - f) / (hi - center).max(AMIN)
                } else {
                    0.0
                };
                if w > 0.0 {
                    if start_bin.is_none() {
                        start_bin = Some(k);
                    }
                    weights.push(w * norm);
                } else if start_bin.is_some() {
                    break;
                }
            }

            MelBand {
                start_bin: start_bin.unwrap_or(0),
                weights,
            }
        })
        .collect()
}

/// Mel power spectrogram in dB (frames × bands), top-dB limited
fn mel_db(spec: &Spectrogram) -> Vec<Vec<f32>> {
    let bank = mel_filterbank(spec, N_MELS);

    let mel_power: Vec<Vec<f32>> = spec
        .frames
        .iter()
        .map(|frame| {
            bank.iter()
                .map(|band| {
                    band.weights
                        .iter()
                        .enumerate()
                        .map(|(j, &w)| {
                            let mag = frame.get(band.start_bin + j).copied().unwrap_or(0.0);
                            w * mag * mag
                        })
                        .sum::<f32>()
                })
                .collect()
        })
        .collect();

    let reference = mel_power
        .iter()
        .flat_map(|f| f.iter().copied())
        .fold(AMIN, f32::max);
    let ref_db = 10.0 * reference.log10();

    mel_power
        .into_iter()
        .map(|frame| {
            frame
                .into_iter()
                .map(|p| (10.0 * p.max(AMIN).log10() - ref_db).max(-TOP_DB))
                .collect()
        })
        .collect()
}

/// Compute the onset-strength envelope of a magnitude spectrogram
///
/// # Arguments
///
/// * `spec` - Magnitude spectrogram from [`compute_stft`](crate::features::stft::compute_stft)
///
/// # Returns
///
/// Non-negative onset strength per frame (same length as `spec.frames`)
///
/// # Errors
///
/// Returns `AnalysisError::InvalidInput` if the spectrogram has no frames
pub fn onset_strength(spec: &Spectrogram) -> Result<Vec<f32>, AnalysisError> {
    if spec.frames.is_empty() {
        return Err(AnalysisError::InvalidInput(
            "Empty spectrogram".to_string(),
        ));
    }

    let db = mel_db(spec);
    let mut envelope = vec![0.0f32; db.len()];

    for t in 1..db.len() {
        let flux: f32 = db[t]
            .iter()
            .zip(db[t - 1].iter())
            .map(|(&cur, &prev)| (cur - prev).max(0.0))
            .sum();
        envelope[t] = flux / N_MELS as f32;
    }

    if envelope.iter().any(|v| !v.is_finite()) {
        return Err(AnalysisError::NumericalError(
            "Non-finite onset strength".to_string(),
        ));
    }

    log::debug!(
        "Onset strength: {} frames, mean {:.4}",
        envelope.len(),
        envelope.iter().sum::<f32>() / envelope.len() as f32
    );

    Ok(envelope)
}
