//! Spectral shape features
//!
//! Per-frame centroid, rolloff, bandwidth and octave-band spectral contrast
//! computed from a magnitude spectrogram, plus the zero-crossing rate of the
//! waveform on the same framing.

use crate::error::AnalysisError;
use crate::features::statistics::mean;
use crate::features::stft::{zero_crossing_rate, Spectrogram};

/// Numerical stability epsilon
const EPSILON: f32 = 1e-10;

/// Fraction of spectral energy below the rolloff frequency
const ROLLOFF_PERCENT: f32 = 0.85;

/// Lower edge of the first octave contrast band
const CONTRAST_FMIN: f32 = 200.0;

/// Number of octave bands above `CONTRAST_FMIN` (plus one sub-band below it)
const CONTRAST_OCTAVES: usize = 6;

/// Fraction of each band used for the peak and valley estimates
const CONTRAST_QUANTILE: f32 = 0.02;

/// Spectral feature curves, one value per frame
#[derive(Debug, Clone, Default)]
pub struct SpectralFeatures {
    /// Spectral centroid in Hz
    pub centroid: Vec<f32>,
    /// Frequency below which 85% of the magnitude lies, in Hz
    pub rolloff: Vec<f32>,
    /// Magnitude-weighted standard deviation around the centroid, in Hz
    pub bandwidth: Vec<f32>,
    /// Spectral contrast in dB, `contrast[band][frame]` (7 bands)
    pub contrast: Vec<Vec<f32>>,
    /// Zero-crossing rate
    pub zero_crossing_rate: Vec<f32>,
}

impl SpectralFeatures {
    /// Mean spectral contrast across bands, per frame
    pub fn contrast_frame_means(&self) -> Vec<f32> {
        let n_frames = self.contrast.first().map(|b| b.len()).unwrap_or(0);
        let n_bands = self.contrast.len().max(1) as f32;
        (0..n_frames)
            .map(|t| self.contrast.iter().map(|band| band[t]).sum::<f32>() / n_bands)
            .collect()
    }
}

/// Compute all spectral shape features
///
/// # Arguments
///
/// * `spec` - Magnitude spectrogram of `samples`
/// * `samples` - The waveform the spectrogram was computed from
///
/// # Errors
///
/// Returns `AnalysisError::InvalidInput` if the spectrogram has no frames
pub fn spectral_features(
    spec: &Spectrogram,
    samples: &[f32],
) -> Result<SpectralFeatures, AnalysisError> {
    if spec.frames.is_empty() {
        return Err(AnalysisError::InvalidInput(
            "Empty spectrogram".to_string(),
        ));
    }

    let freqs: Vec<f32> = (0..spec.n_bins()).map(|k| spec.bin_frequency(k)).collect();

    let mut centroid = Vec::with_capacity(spec.n_frames());
    let mut rolloff = Vec::with_capacity(spec.n_frames());
    let mut bandwidth = Vec::with_capacity(spec.n_frames());

    for frame in &spec.frames {
        let total: f32 = frame.iter().sum();
        if total < EPSILON {
            centroid.push(0.0);
            rolloff.push(0.0);
            bandwidth.push(0.0);
            continue;
        }

        let c = frame.iter().zip(&freqs).map(|(m, f)| m * f).sum::<f32>() / total;
        centroid.push(c);

        let var = frame
            .iter()
            .zip(&freqs)
            .map(|(m, f)| m * (f - c) * (f - c))
            .sum::<f32>()
            / total;
        bandwidth.push(var.max(0.0).sqrt());

        let target = ROLLOFF_PERCENT * total;
        let mut cumulative = 0.0f32;
        let mut roll = freqs[freqs.len() - 1];
        for (m, f) in frame.iter().zip(&freqs) {
            cumulative += m;
            if cumulative >= target {
                roll = *f;
                break;
            }
        }
        rolloff.push(roll);
    }

    let contrast = spectral_contrast(spec, &freqs);
    let zcr = zero_crossing_rate(samples, spec.frame_size, spec.hop_size)?;

    log::debug!(
        "Spectral features: {} frames, mean centroid {:.1} Hz",
        centroid.len(),
        mean(&centroid)
    );

    Ok(SpectralFeatures {
        centroid,
        rolloff,
        bandwidth,
        contrast,
        zero_crossing_rate: zcr,
    })
}

/// Octave-band spectral contrast (peak dB minus valley dB) per band and frame
fn spectral_contrast(spec: &Spectrogram, freqs: &[f32]) -> Vec<Vec<f32>> {
    let nyquist = spec.sample_rate as f32 / 2.0;

    // Band edges: [0, 200], [200, 400], ..., last band open to Nyquist
    let mut edges = vec![0.0f32];
    edges.extend((0..=CONTRAST_OCTAVES).map(|k| CONTRAST_FMIN * 2.0_f32.powi(k as i32)));

    (0..=CONTRAST_OCTAVES)
        .map(|b| {
            let lo = edges[b];
            let hi = if b == CONTRAST_OCTAVES { nyquist } else { edges[b + 1] };
            let bins: Vec<usize> = freqs
                .iter()
                .enumerate()
                .filter(|(_, f)| **f >= lo && **f <= hi)
                .map(|(k, _)| k)
                .collect();

            spec.frames
                .iter()
                .map(|frame| {
                    if bins.is_empty() {
                        return 0.0;
                    }
                    let mut band: Vec<f32> = bins.iter().map(|&k| frame[k]).collect();
                    band.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

                    let q = ((CONTRAST_QUANTILE * band.len() as f32).round() as usize)
                        .clamp(1, band.len());
                    let valley = band[..q].iter().sum::<f32>() / q as f32;
                    let peak = band[band.len() - q..].iter().sum::<f32>() / q as f32;

                    10.0 * peak.max(EPSILON).log10() - 10.0 * valley.max(EPSILON).log10()
                })
                .collect()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::stft::compute_stft;

    fn sine(freq: f32, sample_rate: u32, seconds: f32) -> Vec<f32> {
        (0..(sample_rate as f32 * seconds) as usize)
            .map(|i| {
                let t = i as f32 / sample_rate as f32;
                0.5 * (2.0 * std::f32::consts::PI * freq * t).sin()
            })
            .collect()
    }

    #[test]
    fn test_centroid_of_pure_tone() {
        let samples = sine(2000.0, 44100, 1.0);
        let spec = compute_stft(&samples, 44100, 2048, 512).unwrap();
        let features = spectral_features(&spec, &samples).unwrap();

        let c = mean(&features.centroid);
        assert!((c - 2000.0).abs() < 100.0, "Centroid should be ~2000 Hz, got {:.1}", c);
        assert!(mean(&features.rolloff) >= 1900.0);
        assert!(mean(&features.bandwidth) < 500.0);
    }

    #[test]
    fn test_brighter_signal_has_higher_centroid() {
        let low = sine(300.0, 44100, 1.0);
        let high = sine(5000.0, 44100, 1.0);
        let centroid = |samples: &[f32]| {
            let spec = compute_stft(samples, 44100, 2048, 512).unwrap();
            mean(&spectral_features(&spec, samples).unwrap().centroid)
        };
        let c_low = centroid(&low);
        let c_high = centroid(&high);
        assert!(c_high > c_low);
    }

    #[test]
    fn test_contrast_shape_and_silence() {
        let samples = vec![0.0f32; 8192];
        let spec = compute_stft(&samples, 44100, 2048, 512).unwrap();
        let features = spectral_features(&spec, &samples).unwrap();

        assert_eq!(features.contrast.len(), 7);
        assert!(features.contrast.iter().all(|b| b.len() == spec.n_frames()));
        assert!(features.centroid.iter().all(|&c| c == 0.0));
        assert!(features.contrast_frame_means().iter().all(|&c| c == 0.0));
        assert_eq!(features.zero_crossing_rate.len(), spec.n_frames());
    }

    #[test]
    fn test_tone_has_positive_contrast() {
        let samples = sine(1000.0, 44100, 1.0);
        let spec = compute_stft(&samples, 44100, 2048, 512).unwrap();
        let features = spectral_features(&spec, &samples).unwrap();
        // 1 kHz lives in the 800-1600 Hz band
        let band = &features.contrast[3];
        assert!(mean(band) > 20.0, "Tone band contrast should be large, got {:.1}", mean(band));
    }
}
