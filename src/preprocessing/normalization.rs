//! Integrated loudness measurement and loudness normalization
//!
//! Implements the ITU-R BS.1770-4 integrated loudness measurement for a mono
//! signal and a gain stage that brings a waveform to a loudness target.
//! Energy is measured on loudness-normalized audio so that two tracks with the
//! same perceived intensity but different mastering gain score alike.
//!
//! # Example
//!
//! ```no_run
//! use soundprint::preprocessing::normalization::{integrated_loudness, normalize_loudness};
//!
//! let samples = vec![0.25f32; 44100 * 5];
//! let lufs = integrated_loudness(&samples, 44100)?;
//! let (normalized, meta) = normalize_loudness(&samples, 44100, -14.0, None)?;
//! println!("{:.1} LUFS, applied {:.1} dB", lufs, meta.gain_db);
//! # Ok::<(), soundprint::AnalysisError>(())
//! ```

use crate::error::AnalysisError;

/// Numerical stability epsilon for divisions
const EPSILON: f64 = 1e-12;

/// Absolute gate (ITU-R BS.1770-4)
const ABSOLUTE_GATE_LUFS: f64 = -70.0;

/// Relative gate, below the absolute-gated loudness
const RELATIVE_GATE_LU: f64 = -10.0;

/// Gating block length
const BLOCK_DURATION_S: f64 = 0.4;

/// Block overlap (75%)
const BLOCK_OVERLAP: f64 = 0.75;

/// Loudness metadata returned from normalization
#[derive(Debug, Clone, PartialEq)]
pub struct LoudnessMetadata {
    /// Measured loudness in LUFS (before normalization)
    pub measured_lufs: f32,
    /// Peak level in dBFS (before normalization)
    pub peak_db: f32,
    /// Gain applied in dB
    pub gain_db: f32,
    /// True when the gain was reduced to respect the headroom limit
    pub limited: bool,
}

/// Second-order IIR section, Direct Form II transposed
#[derive(Debug, Clone)]
struct Biquad {
    b0: f64,
    b1: f64,
    b2: f64,
    a1: f64,
    a2: f64,
    z1: f64,
    z2: f64,
}

impl Biquad {
    fn from_coefficients(b: [f64; 3], a: [f64; 3]) -> Self {
        Self {
            b0: b[0] / a[0],
            b1: b[1] / a[0],
            b2: b[2] / a[0],
            a1: a[1] / a[0],
            a2: a[2] / a[0],
            z1: 0.0,
            z2: 0.0,
        }
    }

    /// Stage 1 of the K-weighting: +4 dB high shelf around 1.5 kHz
    fn high_shelf(sample_rate: f64) -> Self {
        let gain_db = 4.0;
        let q = std::f64::consts::FRAC_1_SQRT_2;
        let fc = 1500.0;

        let a = 10.0_f64.powf(gain_db / 40.0);
        let w0 = 2.0 * std::f64::consts::PI * fc / sample_rate;
        let alpha = w0.sin() / (2.0 * q);
        let cos_w0 = w0.cos();
        let sqrt_a = a.sqrt();

        let b = [
            a * ((a + 1.0) + (a - 1.0) * cos_w0 + 2.0 * sqrt_a * alpha),
            -2.0 * a * ((a - 1.0) + (a + 1.0) * cos_w0),
            a * ((a + 1.0) + (a - 1.0) * cos_w0 - 2.0 * sqrt_a * alpha),
        ];
        let den = [
            (a + 1.0) - (a - 1.0) * cos_w0 + 2.0 * sqrt_a * alpha,
            2.0 * ((a - 1.0) - (a + 1.0) * cos_w0),
            (a + 1.0) - (a - 1.0) * cos_w0 - 2.0 * sqrt_a * alpha,
        ];
        Self::from_coefficients(b, den)
    }

    /// Stage 2 of the K-weighting: RLB high-pass at 38 Hz
    fn rlb_high_pass(sample_rate: f64) -> Self {
        let q = 0.5;
        let fc = 38.0;

        let w0 = 2.0 * std::f64::consts::PI * fc / sample_rate;
        let alpha = w0.sin() / (2.0 * q);
        let cos_w0 = w0.cos();

        let b = [(1.0 + cos_w0) / 2.0, -(1.0 + cos_w0), (1.0 + cos_w0) / 2.0];
        let den = [1.0 + alpha, -2.0 * cos_w0, 1.0 - alpha];
        Self::from_coefficients(b, den)
    }

    fn process(&mut self, x: f64) -> f64 {
        let y = self.b0 * x + self.z1;
        self.z1 = self.b1 * x - self.a1 * y + self.z2;
        self.z2 = self.b2 * x - self.a2 * y;
        y
    }
}

fn block_loudness(mean_square: f64) -> f64 {
    -0.691 + 10.0 * mean_square.max(EPSILON).log10()
}

/// Measure integrated loudness (LUFS) of a mono signal
///
/// Algorithm:
/// 1. K-weighting (high shelf + RLB high-pass)
/// 2. Mean square over 400 ms blocks with 75% overlap
/// 3. Absolute gate at -70 LUFS
/// 4. Relative gate 10 LU below the absolute-gated loudness
/// 5. `LUFS = -0.691 + 10 * log10(mean of gated block energies)`
///
/// Signals shorter than one block are measured as a single block.
///
/// # Errors
///
/// - `InvalidInput` for empty samples or a zero sample rate
/// - `MeasurementError` when every block falls below the absolute gate
///   (silent or near-silent audio)
pub fn integrated_loudness(samples: &[f32], sample_rate: u32) -> Result<f32, AnalysisError> {
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

    let sr = sample_rate as f64;
    let mut shelf = Biquad::high_shelf(sr);
    let mut high_pass = Biquad::rlb_high_pass(sr);
    let weighted: Vec<f64> = samples
        .iter()
        .map(|&s| high_pass.process(shelf.process(s as f64)))
        .collect();

    let block_size = ((BLOCK_DURATION_S * sr).round() as usize).max(1);
    let step = (((1.0 - BLOCK_OVERLAP) * BLOCK_DURATION_S * sr).round() as usize).max(1);

    let mut block_energies = Vec::new();
    if weighted.len() <= block_size {
        let sum_sq: f64 = weighted.iter().map(|&x| x * x).sum();
        block_energies.push(sum_sq / weighted.len() as f64);
    } else {
        let mut start = 0;
        while start + block_size <= weighted.len() {
            let sum_sq: f64 = weighted[start..start + block_size]
                .iter()
                .map(|&x| x * x)
                .sum();
            block_energies.push(sum_sq / block_size as f64);
            start += step;
        }
    }

    let above_absolute: Vec<f64> = block_energies
        .iter()
        .copied()
        .filter(|&z| block_loudness(z) > ABSOLUTE_GATE_LUFS)
        .collect();

    if above_absolute.is_empty() {
        log::warn!("All loudness blocks below the absolute gate ({} LUFS)", ABSOLUTE_GATE_LUFS);
        return Err(AnalysisError::MeasurementError(
            "signal is silent (below the -70 LUFS loudness gate)".to_string(),
        ));
    }

    let ungated = above_absolute.iter().sum::<f64>() / above_absolute.len() as f64;
    let relative_gate = block_loudness(ungated) + RELATIVE_GATE_LU;

    let gated: Vec<f64> = above_absolute
        .into_iter()
        .filter(|&z| block_loudness(z) > relative_gate)
        .collect();

    // The loudest block always survives the relative gate, but keep the guard
    let mean_gated = if gated.is_empty() {
        ungated
    } else {
        gated.iter().sum::<f64>() / gated.len() as f64
    };

    let lufs = block_loudness(mean_gated);
    if !lufs.is_finite() {
        return Err(AnalysisError::NumericalError(format!(
            "non-finite integrated loudness: {}",
            lufs
        )));
    }

    log::debug!(
        "Integrated loudness: {:.2} LUFS over {} blocks ({} gated)",
        lufs,
        block_energies.len(),
        gated.len()
    );

    Ok(lufs as f32)
}

/// Bring a waveform to a loudness target
///
/// The gain is `target - measured` dB. With `max_headroom_db` set, the gain is
/// reduced so the output peak stays at or below `-max_headroom_db` dBFS;
/// without it the gain is applied as-is (peaks above full scale are kept, the
/// energy measurement downstream works on floats).
///
/// # Returns
///
/// The normalized copy of `samples` and the loudness metadata.
///
/// # Errors
///
/// Propagates the errors of [`integrated_loudness`].
pub fn normalize_loudness(
    samples: &[f32],
    sample_rate: u32,
    target_lufs: f32,
    max_headroom_db: Option<f32>,
) -> Result<(Vec<f32>, LoudnessMetadata), AnalysisError> {
    let measured_lufs = integrated_loudness(samples, sample_rate)?;

    let peak = samples.iter().map(|&x| x.abs()).fold(0.0f32, f32::max);
    let peak_db = if peak > 0.0 {
        20.0 * peak.log10()
    } else {
        f32::NEG_INFINITY
    };

    let mut gain_db = target_lufs - measured_lufs;
    let mut limited = false;

    if let Some(headroom) = max_headroom_db {
        let ceiling_db = -headroom;
        if peak_db + gain_db > ceiling_db {
            log::warn!(
                "Loudness normalization would exceed -{:.1} dBFS, limiting gain",
                headroom
            );
            gain_db = ceiling_db - peak_db;
            limited = true;
        }
    }

    let gain_linear = 10.0_f32.powf(gain_db / 20.0);
    let normalized: Vec<f32> = samples.iter().map(|&x| x * gain_linear).collect();

    log::debug!(
        "Loudness normalization: measured={:.2} LUFS, target={:.2} LUFS, gain={:.2} dB",
        measured_lufs,
        target_lufs,
        gain_db
    );

    Ok((
        normalized,
        LoudnessMetadata {
            measured_lufs,
            peak_db,
            gain_db,
            limited,
        },
    ))
}
