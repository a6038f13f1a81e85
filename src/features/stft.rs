//! Framing, short-time Fourier transform and frame-level time-domain features
//!
//! All frame-based measurements share one framing convention: frames start at
//! `i * hop_size`, are `frame_size` samples long, and a signal shorter than
//! one frame yields a single zero-padded frame. Frame `i` is reported at
//! `i * hop_size / sample_rate` seconds.

use crate::error::AnalysisError;
use rustfft::num_complex::Complex;
use rustfft::FftPlanner;

/// Magnitude spectrogram (frames × bins)
#[derive(Debug, Clone)]
pub struct Spectrogram {
    /// One magnitude spectrum per frame, `frame_size / 2 + 1` bins each
    pub frames: Vec<Vec<f32>>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// FFT frame size in samples
    pub frame_size: usize,
    /// Hop size in samples
    pub hop_size: usize,
}

impl Spectrogram {
    /// Number of frequency bins per frame
    pub fn n_bins(&self) -> usize {
        self.frame_size / 2 + 1
    }

    /// Number of frames
    pub fn n_frames(&self) -> usize {
        self.frames.len()
    }

    /// Center frequency of bin `k` in Hz
    pub fn bin_frequency(&self, k: usize) -> f32 {
        k as f32 * self.sample_rate as f32 / self.frame_size as f32
    }
}

/// Number of frames for a signal of `len` samples
pub fn num_frames(len: usize, frame_size: usize, hop_size: usize) -> usize {
    if len == 0 || frame_size == 0 || hop_size == 0 {
        0
    } else if len < frame_size {
        1
    } else {
        (len - frame_size) / hop_size + 1
    }
}

/// Copy of frame `i`, zero-padded at the end of the signal
fn frame_at(samples: &[f32], i: usize, frame_size: usize, hop_size: usize) -> Vec<f32> {
    let start = i * hop_size;
    let end = (start + frame_size).min(samples.len());
    let mut frame = vec![0.0f32; frame_size];
    if start < end {
        frame[..end - start].copy_from_slice(&samples[start..end]);
    }
    frame
}

fn validate_framing(frame_size: usize, hop_size: usize) -> Result<(), AnalysisError> {
    if frame_size == 0 {
        return Err(AnalysisError::InvalidInput(
            "Frame size must be > 0".to_string(),
        ));
    }
    if hop_size == 0 {
        return Err(AnalysisError::InvalidInput(
            "Hop size must be > 0".to_string(),
        ));
    }
    Ok(())
}

/// Compute a Hann-windowed magnitude spectrogram
///
/// # Errors
///
/// Returns `AnalysisError::InvalidInput` for empty samples, a zero sample rate,
/// or zero frame/hop sizes.
pub fn compute_stft(
    samples: &[f32],
    sample_rate: u32,
    frame_size: usize,
    hop_size: usize,
) -> Result<Spectrogram, AnalysisError> {
    validate_framing(frame_size, hop_size)?;
    if samples.is_empty() {
        return Err(AnalysisError::InvalidInput(
            "Empty audio samples".to_string(),
        ));
    }
    if sample_rate == 0 {
        return Err(AnalysisError::InvalidInput(
            "Invalid sample rate: 0".to_string(),
        ));
    }

    let n_frames = num_frames(samples.len(), frame_size, hop_size);
    let n_bins = frame_size / 2 + 1;

    // Periodic Hann window
    let window: Vec<f32> = (0..frame_size)
        .map(|i| {
            0.5 - 0.5 * (2.0 * std::f32::consts::PI * i as f32 / frame_size as f32).cos()
        })
        .collect();

    let mut planner = FftPlanner::new();
    let fft = planner.plan_fft_forward(frame_size);
    let mut buffer = vec![Complex::new(0.0f32, 0.0); frame_size];
    let mut frames = Vec::with_capacity(n_frames);

    for i in 0..n_frames {
        let frame = frame_at(samples, i, frame_size, hop_size);
        for (slot, (&x, &w)) in buffer.iter_mut().zip(frame.iter().zip(window.iter())) {
            *slot = Complex::new(x * w, 0.0);
        }
        fft.process(&mut buffer);
        frames.push(buffer[..n_bins].iter().map(|c| c.norm()).collect());
    }

    log::debug!(
        "STFT: {} frames x {} bins (frame={}, hop={})",
        n_frames,
        n_bins,
        frame_size,
        hop_size
    );

    Ok(Spectrogram {
        frames,
        sample_rate,
        frame_size,
        hop_size,
    })
}

/// Frame-level RMS energy: `sqrt(mean(x²))` per frame
pub fn frame_rms(
    samples: &[f32],
    frame_size: usize,
    hop_size: usize,
) -> Result<Vec<f32>, AnalysisError> {
    validate_framing(frame_size, hop_size)?;
    let n_frames = num_frames(samples.len(), frame_size, hop_size);

    Ok((0..n_frames)
        .map(|i| {
            let frame = frame_at(samples, i, frame_size, hop_size);
            let sum_sq: f32 = frame.iter().map(|&x| x * x).sum();
            (sum_sq / frame_size as f32).sqrt()
        })
        .collect())
}

/// Zero-crossing rate per frame (sign changes / frame length)
pub fn zero_crossing_rate(
    samples: &[f32],
    frame_size: usize,
    hop_size: usize,
) -> Result<Vec<f32>, AnalysisError> {
    validate_framing(frame_size, hop_size)?;
    let n_frames = num_frames(samples.len(), frame_size, hop_size);

    Ok((0..n_frames)
        .map(|i| {
            let frame = frame_at(samples, i, frame_size, hop_size);
            let crossings = frame
                .windows(2)
                .filter(|w| (w[0] >= 0.0) != (w[1] >= 0.0))
                .count();
            crossings as f32 / frame_size as f32
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f32, sample_rate: u32, seconds: f32, amplitude: f32) -> Vec<f32> {
        let n = (sample_rate as f32 * seconds) as usize;
        (0..n)
            .map(|i| {
                let t = i as f32 / sample_rate as f32;
                amplitude * (2.0 * std::f32::consts::PI * freq * t).sin()
            })
            .collect()
    }

    #[test]
    fn test_num_frames() {
        assert_eq!(num_frames(0, 2048, 512), 0);
        assert_eq!(num_frames(100, 2048, 512), 1);
        assert_eq!(num_frames(2048, 2048, 512), 1);
        assert_eq!(num_frames(2560, 2048, 512), 2);
        assert_eq!(num_frames(44100, 2048, 512), 83);
    }

    #[test]
    fn test_stft_peak_bin() {
        let sr = 44100;
        let samples = sine(1000.0, sr, 1.0, 0.5);
        let spec = compute_stft(&samples, sr, 2048, 512).unwrap();

        let frame = &spec.frames[10];
        let (peak_bin, _) = frame
            .iter()
            .enumerate()
            .fold((0, 0.0f32), |acc, (i, &m)| if m > acc.1 { (i, m) } else { acc });
        let peak_freq = spec.bin_frequency(peak_bin);
        assert!(
            (peak_freq - 1000.0).abs() < 30.0,
            "Peak should be near 1000 Hz, got {:.1}",
            peak_freq
        );
        assert_eq!(frame.len(), spec.n_bins());
    }

    #[test]
    fn test_stft_invalid_input() {
        assert!(compute_stft(&[], 44100, 2048, 512).is_err());
        assert!(compute_stft(&[0.1; 4096], 0, 2048, 512).is_err());
        assert!(compute_stft(&[0.1; 4096], 44100, 0, 512).is_err());
    }

    #[test]
    fn test_frame_rms_of_sine() {
        let samples = sine(440.0, 44100, 1.0, 0.5);
        let rms = frame_rms(&samples, 2048, 512).unwrap();
        let expected = 0.5 / 2.0_f32.sqrt();
        for &r in &rms {
            assert!(
                (r - expected).abs() < 0.01,
                "RMS of 0.5 sine should be ~{:.3}, got {:.3}",
                expected,
                r
            );
        }
    }

    #[test]
    fn test_zero_crossing_rate_tracks_frequency() {
        let low = zero_crossing_rate(&sine(200.0, 44100, 1.0, 0.5), 2048, 512).unwrap();
        let high = zero_crossing_rate(&sine(4000.0, 44100, 1.0, 0.5), 2048, 512).unwrap();
        let mean = |v: &[f32]| v.iter().sum::<f32>() / v.len() as f32;
        assert!(mean(&high) > 10.0 * mean(&low));
        // 4 kHz: 8000 crossings per second
        assert!((mean(&high) - 8000.0 / 44100.0).abs() < 0.01);
    }
}
