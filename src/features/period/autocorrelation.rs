//! Autocorrelation-based raw tempo estimation
//!
//! Finds the dominant periodicity of the onset-strength envelope:
//!
//! 1. Remove the envelope mean and compute the autocorrelation with FFT
//!    acceleration: `ACF = IFFT(|FFT(signal)|²)`
//! 2. Weight each lag inside the BPM search range by a log-normal tempo prior
//!    (one octave standard deviation around the prior BPM)
//! 3. Pick the best weighted lag and refine it with parabolic interpolation
//! 4. Lay a regular beat grid at that period, aligned to the phase with the
//!    most onset support
//!
//! This is the single, often octave-wrong estimate the tempo resolver
//! corrects downstream.
//!
//! # Reference
//!
//! Ellis, D. P. W., & Pikrakis, A. (2006). Real-time Beat Induction.
//! *Proceedings of the International Conference on Music Information Retrieval*.
//!
//! # Example
//!
//! ```no_run
//! use soundprint::features::period::autocorrelation::estimate_tempo;
//!
//! let onset_envelope = vec![0.0f32; 2000];
//! let estimate = estimate_tempo(&onset_envelope, 44100, 512, 30.0, 300.0, 120.0)?;
//! println!("Raw tempo: {:.1} BPM, {} beats", estimate.bpm, estimate.beat_frames.len());
//! # Ok::<(), soundprint::AnalysisError>(())
//! ```

use crate::error::AnalysisError;
use rustfft::num_complex::Complex;
use rustfft::FftPlanner;

const EPSILON: f32 = 1e-10;

/// Raw tempo estimate with its beat grid
#[derive(Debug, Clone, PartialEq)]
pub struct TempoEstimate {
    /// Estimated tempo in BPM (0.0 when the envelope has no periodicity)
    pub bpm: f32,

    /// Beat positions in frames, ascending
    pub beat_frames: Vec<usize>,
}

/// Estimate the raw tempo of an onset-strength envelope
///
/// # Arguments
///
/// * `onset_envelope` - Onset strength per frame
/// * `sample_rate` - Sample rate in Hz
/// * `hop_size` - Hop size used for the envelope (samples per frame)
/// * `min_bpm` - Lowest tempo considered
/// * `max_bpm` - Highest tempo considered
/// * `prior_bpm` - Center of the log-normal tempo prior
///
/// # Returns
///
/// `TempoEstimate`; a flat envelope yields `bpm = 0.0` with no beats
///
/// # Errors
///
/// Returns `AnalysisError::InvalidInput` if the envelope is empty or the
/// framing / BPM range is invalid
pub fn estimate_tempo(
    onset_envelope: &[f32],
    sample_rate: u32,
    hop_size: usize,
    min_bpm: f32,
    max_bpm: f32,
    prior_bpm: f32,
) -> Result<TempoEstimate, AnalysisError> {
    log::debug!(
        "Estimating tempo: {} frames, {} Hz, hop={}, range=[{:.1}, {:.1}] BPM",
        onset_envelope.len(),
        sample_rate,
        hop_size,
        min_bpm,
        max_bpm
    );

    if onset_envelope.is_empty() {
        return Err(AnalysisError::InvalidInput(
            "Empty onset envelope".to_string(),
        ));
    }
    if sample_rate == 0 || hop_size == 0 {
        return Err(AnalysisError::InvalidInput(format!(
            "Invalid framing: sample_rate={}, hop_size={}",
            sample_rate, hop_size
        )));
    }
    if min_bpm <= 0.0 || max_bpm <= min_bpm || prior_bpm <= 0.0 {
        return Err(AnalysisError::InvalidInput(format!(
            "Invalid BPM range: [{:.1}, {:.1}], prior {:.1}",
            min_bpm, max_bpm, prior_bpm
        )));
    }

    let no_tempo = TempoEstimate {
        bpm: 0.0,
        beat_frames: vec![],
    };

    let mean = onset_envelope.iter().sum::<f32>() / onset_envelope.len() as f32;
    let centered: Vec<f32> = onset_envelope.iter().map(|&v| v - mean).collect();
    let acf = compute_autocorrelation_fft(&centered);

    // BPM = (60 * sample_rate) / (lag * hop_size)
    let frame_rate = sample_rate as f32 / hop_size as f32;
    let lag_min = ((60.0 * frame_rate) / max_bpm).ceil().max(1.0) as usize;
    let lag_max =
        (((60.0 * frame_rate) / min_bpm).floor() as usize).min(acf.len().saturating_sub(1));

    if lag_min > lag_max {
        log::warn!(
            "Onset envelope too short for tempo search: {} frames, lag range [{}, {}]",
            onset_envelope.len(),
            lag_min,
            lag_max
        );
        return Ok(no_tempo);
    }

    let prior_weight = |lag: usize| {
        let bpm = 60.0 * frame_rate / lag as f32;
        let octaves = (bpm / prior_bpm).log2();
        (-0.5 * octaves * octaves).exp()
    };

    let best = (lag_min..=lag_max)
        .map(|lag| (lag, acf[lag] * prior_weight(lag)))
        .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));

    let (best_lag, best_score) = match best {
        Some(b) => b,
        None => return Ok(no_tempo),
    };
    if best_score < EPSILON {
        log::debug!("No periodicity in onset envelope");
        return Ok(no_tempo);
    }

    let period = refine_lag(&acf, best_lag);
    let bpm = 60.0 * frame_rate / period;
    let beat_frames = align_beat_grid(onset_envelope, period);

    log::debug!(
        "Raw tempo: {:.2} BPM (lag {} -> {:.2}), {} beats",
        bpm,
        best_lag,
        period,
        beat_frames.len()
    );

    Ok(TempoEstimate { bpm, beat_frames })
}

/// Parabolic interpolation of an ACF peak
fn refine_lag(acf: &[f32], lag: usize) -> f32 {
    if lag == 0 || lag + 1 >= acf.len() {
        return lag as f32;
    }
    let (a, b, c) = (acf[lag - 1], acf[lag], acf[lag + 1]);
    let denom = a - 2.0 * b + c;
    if denom.abs() < EPSILON || b < a || b < c {
        return lag as f32;
    }
    let delta = (0.5 * (a - c) / denom).clamp(-0.5, 0.5);
    lag as f32 + delta
}

/// Regular beat grid at `period` frames, phase chosen by onset support
fn align_beat_grid(onset_envelope: &[f32], period: f32) -> Vec<usize> {
    let n = onset_envelope.len();
    if period < 1.0 {
        return vec![];
    }

    let grid = |phase: f32| -> Vec<usize> {
        (0..)
            .map(|k| (phase + k as f32 * period).round() as usize)
            .take_while(|&f| f < n)
            .collect()
    };

    let best_phase = (0..period.ceil() as usize)
        .map(|p| {
            let support: f32 = grid(p as f32).iter().map(|&f| onset_envelope[f]).sum();
            (p, support)
        })
        .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(p, _)| p)
        .unwrap_or(0);

    grid(best_phase as f32)
}

/// Compute autocorrelation using FFT acceleration
///
/// Uses the identity: ACF = IFFT(|FFT(signal)|²), zero-padded to avoid
/// circular wrap-around. Negative correlations are clamped to 0.
pub fn compute_autocorrelation_fft(signal: &[f32]) -> Vec<f32> {
    let n = signal.len();
    if n == 0 {
        return vec![];
    }

    // FFT size: next power of 2 >= 2*n (for zero-padding)
    let fft_size = (2 * n).next_power_of_two();

    let mut buffer: Vec<Complex<f32>> = signal.iter().map(|&x| Complex::new(x, 0.0)).collect();
    buffer.resize(fft_size, Complex::new(0.0, 0.0));

    let mut planner = FftPlanner::new();
    let fft = planner.plan_fft_forward(fft_size);
    fft.process(&mut buffer);

    for x in &mut buffer {
        *x = *x * x.conj();
    }

    let ifft = planner.plan_fft_inverse(fft_size);
    ifft.process(&mut buffer);

    let scale = 1.0 / (fft_size as f32);
    buffer[..n].iter().map(|x| (x.re * scale).max(0.0)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Click envelope: a short decaying spike every `period` frames
    fn click_envelope(len: usize, period: f32) -> Vec<f32> {
        let mut env = vec![0.05f32; len];
        let mut t = 0.0f32;
        while (t as usize) < len {
            let i = t.round() as usize;
            if i < len {
                env[i] = 10.0;
            }
            if i + 1 < len {
                env[i + 1] = 3.0;
            }
            t += period;
        }
        env
    }

    #[test]
    fn test_autocorrelation_fft_matches_direct() {
        let signal = vec![1.0, 0.0, -1.0, 0.5, 0.25, 0.0, 1.0];
        let acf = compute_autocorrelation_fft(&signal);
        for lag in 0..signal.len() {
            let direct: f32 = (0..signal.len() - lag).map(|i| signal[i] * signal[i + lag]).sum();
            assert!(
                (acf[lag] - direct.max(0.0)).abs() < 1e-4,
                "lag {}: fft {:.5} vs direct {:.5}",
                lag,
                acf[lag],
                direct
            );
        }
    }

    #[test]
    fn test_estimate_120_bpm() {
        // 120 BPM at 44.1 kHz / 512 hop = 43.07 frames per beat
        let env = click_envelope(2600, 43.066);
        let est = estimate_tempo(&env, 44100, 512, 30.0, 300.0, 120.0).unwrap();
        assert!(
            (est.bpm - 120.0).abs() < 2.0,
            "Expected ~120 BPM, got {:.2}",
            est.bpm
        );
        assert!(est.beat_frames.len() >= 55);
        assert!(est.beat_frames.windows(2).all(|w| w[1] > w[0]));
    }

    #[test]
    fn test_estimate_90_bpm() {
        let frame_rate = 44100.0 / 512.0;
        let env = click_envelope(3000, 60.0 * frame_rate / 90.0);
        let est = estimate_tempo(&env, 44100, 512, 30.0, 300.0, 120.0).unwrap();
        assert!((est.bpm - 90.0).abs() < 2.0, "Expected ~90 BPM, got {:.2}", est.bpm);
    }

    #[test]
    fn test_flat_envelope_has_no_tempo() {
        let est = estimate_tempo(&[0.5; 1000], 44100, 512, 30.0, 300.0, 120.0).unwrap();
        assert_eq!(est.bpm, 0.0);
        assert!(est.beat_frames.is_empty());
    }

    #[test]
    fn test_invalid_parameters() {
        assert!(estimate_tempo(&[], 44100, 512, 30.0, 300.0, 120.0).is_err());
        assert!(estimate_tempo(&[1.0; 10], 0, 512, 30.0, 300.0, 120.0).is_err());
        assert!(estimate_tempo(&[1.0; 10], 44100, 512, 300.0, 30.0, 120.0).is_err());
    }

    #[test]
    fn test_beat_grid_phase() {
        let mut env = vec![0.0f32; 200];
        for f in (7..200).step_by(20) {
            env[f] = 1.0;
        }
        let beats = align_beat_grid(&env, 20.0);
        assert_eq!(beats.first(), Some(&7));
        assert_eq!(beats.len(), 10);
    }
}
