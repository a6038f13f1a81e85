//! Autocorrelation tempogram
//!
//! Local autocorrelation of the onset-strength envelope over a sliding window.
//! Each column is one window position; each row is one lag, converted to BPM
//! with `60 * sample_rate / (hop_size * lag)`. Lag 0 carries no tempo and is
//! left out, so row 0 is the fastest tempo and BPM decreases down the rows.
//!
//! # Example
//!
//! ```no_run
//! use soundprint::features::period::tempogram::compute_tempogram;
//!
//! let onset_envelope = vec![0.0f32; 2000];
//! let tempogram = compute_tempogram(&onset_envelope, 44100, 512)?;
//! let row = tempogram.closest_row(120.0);
//! # Ok::<(), soundprint::AnalysisError>(())
//! ```

use crate::error::AnalysisError;

/// Numerical stability epsilon
const EPSILON: f32 = 1e-10;

/// Autocorrelation window length in frames
pub const WINDOW_FRAMES: usize = 384;

/// Frames between successive tempogram columns
pub const STRIDE_FRAMES: usize = 16;

/// Time-by-tempo energy matrix
#[derive(Debug, Clone, PartialEq)]
pub struct Tempogram {
    /// BPM of each row
    pub bpm_axis: Vec<f32>,
    /// `rows[i][t]`: normalized autocorrelation at `bpm_axis[i]`, column `t`
    pub rows: Vec<Vec<f32>>,
}

impl Tempogram {
    /// Build a tempogram, checking that the axis matches the rows
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::InvalidInput` on a length mismatch
    pub fn new(bpm_axis: Vec<f32>, rows: Vec<Vec<f32>>) -> Result<Self, AnalysisError> {
        if bpm_axis.len() != rows.len() {
            return Err(AnalysisError::InvalidInput(format!(
                "Tempogram axis has {} entries but {} rows",
                bpm_axis.len(),
                rows.len()
            )));
        }
        Ok(Self { bpm_axis, rows })
    }

    /// Index of the row whose BPM is closest to `bpm`
    pub fn closest_row(&self, bpm: f32) -> Option<usize> {
        self.bpm_axis
            .iter()
            .enumerate()
            .filter(|(_, b)| b.is_finite())
            .min_by(|(_, a), (_, b)| {
                (*a - bpm)
                    .abs()
                    .partial_cmp(&(*b - bpm).abs())
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .map(|(i, _)| i)
    }

    /// Mean energy of a row across time
    ///
    /// `None` when the row is missing, empty, or its mean is not finite.
    pub fn row_mean(&self, index: usize) -> Option<f32> {
        let row = self.rows.get(index)?;
        if row.is_empty() {
            return None;
        }
        let mean = row.iter().sum::<f32>() / row.len() as f32;
        mean.is_finite().then_some(mean)
    }

    /// Number of time columns
    pub fn n_columns(&self) -> usize {
        self.rows.first().map(|r| r.len()).unwrap_or(0)
    }
}

/// Compute the autocorrelation tempogram of an onset-strength envelope
///
/// # Arguments
///
/// * `onset_envelope` - Onset strength per frame
/// * `sample_rate` - Sample rate in Hz
/// * `hop_size` - Hop size used for the envelope
///
/// # Returns
///
/// Tempogram with `WINDOW_FRAMES - 1` rows (lags 1..WINDOW_FRAMES) and one
/// column every `STRIDE_FRAMES` frames
///
/// # Errors
///
/// Returns `AnalysisError::InvalidInput` for an empty envelope or zero
/// sample rate / hop size
pub fn compute_tempogram(
    onset_envelope: &[f32],
    sample_rate: u32,
    hop_size: usize,
) -> Result<Tempogram, AnalysisError> {
    if onset_envelope.is_empty() {
        return Err(AnalysisError::InvalidInput(
            "Onset envelope is empty".to_string(),
        ));
    }
    if sample_rate == 0 || hop_size == 0 {
        return Err(AnalysisError::InvalidInput(format!(
            "Invalid framing: sample_rate={}, hop_size={}",
            sample_rate, hop_size
        )));
    }

    let n = onset_envelope.len();
    let half = WINDOW_FRAMES / 2;

    let window: Vec<f32> = (0..WINDOW_FRAMES)
        .map(|i| {
            0.5 - 0.5 * (2.0 * std::f32::consts::PI * i as f32 / WINDOW_FRAMES as f32).cos()
        })
        .collect();

    let bpm_axis: Vec<f32> = (1..WINDOW_FRAMES)
        .map(|lag| 60.0 * sample_rate as f32 / (hop_size as f32 * lag as f32))
        .collect();

    let centers: Vec<usize> = (0..n).step_by(STRIDE_FRAMES).collect();
    let mut rows = vec![Vec::with_capacity(centers.len()); WINDOW_FRAMES - 1];

    let mut segment = vec![0.0f32; WINDOW_FRAMES];
    for &center in &centers {
        // Centered, zero-padded, Hann-weighted segment
        for (i, slot) in segment.iter_mut().enumerate() {
            let idx = center as isize - half as isize + i as isize;
            *slot = if idx >= 0 && (idx as usize) < n {
                onset_envelope[idx as usize] * window[i]
            } else {
                0.0
            };
        }

        let energy: f32 = segment.iter().map(|&x| x * x).sum();
        for (lag, row) in (1..WINDOW_FRAMES).zip(rows.iter_mut()) {
            let acf: f32 = segment[..WINDOW_FRAMES - lag]
                .iter()
                .zip(&segment[lag..])
                .map(|(a, b)| a * b)
                .sum();
            row.push(if energy > EPSILON { acf / energy } else { 0.0 });
        }
    }

    log::debug!(
        "Tempogram: {} BPM rows x {} columns ({:.1}-{:.1} BPM)",
        bpm_axis.len(),
        centers.len(),
        bpm_axis.last().copied().unwrap_or(0.0),
        bpm_axis.first().copied().unwrap_or(0.0)
    );

    Tempogram::new(bpm_axis, rows)
}
