//! Adaptive-threshold onset event picking
//!
//! Turns an onset-strength envelope into discrete onset events. A frame `n`
//! is an event when, on the envelope normalized to [0, 1]:
//!
//! - it is the maximum of the window `[n - pre_max, n]`
//! - it exceeds the mean of `[n - pre_avg, n + post_avg)` by `delta`
//! - it lies more than `wait` frames after the previous event
//!
//! Window lengths are given in seconds and converted with the frame rate
//! (`sample_rate / hop_size`).

use crate::error::AnalysisError;

/// Numerical stability epsilon
const EPSILON: f32 = 1e-10;

/// Peak-picking parameters in seconds
#[derive(Debug, Clone, Copy)]
pub struct PeakPickParams {
    /// Look-back window for the local-maximum test
    pub pre_max: f32,
    /// Look-back window for the local mean
    pub pre_avg: f32,
    /// Look-ahead window for the local mean
    pub post_avg: f32,
    /// Minimum spacing between events
    pub wait: f32,
    /// Threshold above the local mean (normalized units)
    pub delta: f32,
}

impl Default for PeakPickParams {
    fn default() -> Self {
        Self {
            pre_max: 0.03,
            pre_avg: 0.10,
            post_avg: 0.10,
            wait: 0.03,
            delta: 0.07,
        }
    }
}

/// Detect onset events in an onset-strength envelope
///
/// # Arguments
///
/// * `envelope` - Onset strength per frame
/// * `sample_rate` - Sample rate in Hz
/// * `hop_size` - Hop size used to compute the envelope
/// * `params` - Peak-picking windows
///
/// # Returns
///
/// Frame indices of detected events, ascending
///
/// # Errors
///
/// Returns `AnalysisError::InvalidInput` for a zero sample rate or hop size
pub fn detect_onset_events(
    envelope: &[f32],
    sample_rate: u32,
    hop_size: usize,
    params: PeakPickParams,
) -> Result<Vec<usize>, AnalysisError> {
    if sample_rate == 0 || hop_size == 0 {
        return Err(AnalysisError::InvalidInput(format!(
            "Invalid framing: sample_rate={}, hop_size={}",
            sample_rate, hop_size
        )));
    }
    if envelope.is_empty() {
        return Ok(vec![]);
    }

    let frame_rate = sample_rate as f32 / hop_size as f32;
    let to_frames = |seconds: f32| (seconds * frame_rate) as usize;
    let pre_max = to_frames(params.pre_max);
    let pre_avg = to_frames(params.pre_avg);
    let post_avg = to_frames(params.post_avg) + 1;
    let wait = to_frames(params.wait);

    let min = envelope.iter().copied().fold(f32::INFINITY, f32::min);
    let max = envelope.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let range = max - min;
    if range < EPSILON {
        log::debug!("Flat onset envelope, no events");
        return Ok(vec![]);
    }
    let norm: Vec<f32> = envelope.iter().map(|&v| (v - min) / range).collect();

    let mut events: Vec<usize> = Vec::new();
    for n in 0..norm.len() {
        let value = norm[n];

        let max_start = n.saturating_sub(pre_max);
        let local_max = norm[max_start..=n]
            .iter()
            .copied()
            .fold(f32::NEG_INFINITY, f32::max);
        if value < local_max {
            continue;
        }

        let avg_start = n.saturating_sub(pre_avg);
        let avg_end = (n + post_avg).min(norm.len());
        let window = &norm[avg_start..avg_end];
        let local_mean = window.iter().sum::<f32>() / window.len() as f32;
        if value < local_mean + params.delta {
            continue;
        }

        match events.last() {
            Some(&last) if n <= last + wait => {}
            _ => events.push(n),
        }
    }

    log::debug!(
        "Onset events: {} in {} frames ({:.1} Hz frame rate)",
        events.len(),
        envelope.len(),
        frame_rate
    );

    Ok(events)
}
