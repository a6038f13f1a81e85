//! Peak detection utilities
//!
//! Local-maximum detection for 1D feature curves (RMS, onset strength,
//! spectral contrast). A peak is a sample strictly greater than its left
//! neighbour and strictly greater than the first differing sample to its
//! right; flat plateaus report their middle sample (rounded down). The first
//! and last samples are never peaks.

/// Find all local maxima, in signal order
///
/// # Example
///
/// ```
/// use soundprint::features::period::peak_picking::find_local_maxima;
///
/// let signal = vec![0.0, 1.0, 0.0, 2.0, 2.0, 2.0, 0.5, 3.0];
/// // index 1, plateau 3..=5 -> 4; the last sample is an endpoint
/// assert_eq!(find_local_maxima(&signal), vec![1, 4]);
/// ```
pub fn find_local_maxima(signal: &[f32]) -> Vec<usize> {
    let mut peaks = Vec::new();
    if signal.len() < 3 {
        return peaks;
    }

    let last = signal.len() - 1;
    let mut i = 1;
    while i < last {
        if signal[i - 1] < signal[i] {
            // Walk to the end of a possible plateau
            let mut ahead = i + 1;
            while ahead < last && signal[ahead] == signal[i] {
                ahead += 1;
            }
            if signal[ahead] < signal[i] {
                let left_edge = i;
                let right_edge = ahead - 1;
                peaks.push((left_edge + right_edge) / 2);
                i = ahead;
                continue;
            }
        }
        i += 1;
    }

    peaks
}

/// Find local maxima whose height is at least `min_height`, in signal order
///
/// # Arguments
///
/// * `signal` - Signal to find peaks in
/// * `min_height` - Minimum peak value (absolute)
///
/// # Returns
///
/// Indices of qualifying peaks, ascending
pub fn find_peaks(signal: &[f32], min_height: f32) -> Vec<usize> {
    let peaks: Vec<usize> = find_local_maxima(signal)
        .into_iter()
        .filter(|&i| signal[i] >= min_height)
        .collect();

    log::debug!(
        "Found {} peaks >= {:.4} in signal of length {}",
        peaks.len(),
        min_height,
        signal.len()
    );

    peaks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_peaks_basic() {
        let signal = vec![0.0, 0.5, 1.0, 0.7, 0.3, 0.9, 0.2];
        assert_eq!(find_local_maxima(&signal), vec![2, 5]);
        assert_eq!(find_peaks(&signal, 0.95), vec![2]);
    }

    #[test]
    fn test_endpoints_are_not_peaks() {
        let signal = vec![5.0, 1.0, 2.0, 1.0, 6.0];
        assert_eq!(find_local_maxima(&signal), vec![2]);
    }

    #[test]
    fn test_plateau_middle() {
        let signal = vec![0.0, 1.0, 1.0, 1.0, 1.0, 0.0];
        // plateau 1..=4, middle rounded down
        assert_eq!(find_local_maxima(&signal), vec![2]);

        // A plateau that rises again is not a peak
        let rising = vec![0.0, 1.0, 1.0, 2.0, 0.0];
        assert_eq!(find_local_maxima(&rising), vec![3]);

        // A plateau running into the last sample is not a peak
        let open = vec![0.0, 1.0, 1.0, 1.0];
        assert!(find_local_maxima(&open).is_empty());
    }

    #[test]
    fn test_short_and_flat_signals() {
        assert!(find_local_maxima(&[]).is_empty());
        assert!(find_local_maxima(&[1.0, 2.0]).is_empty());
        assert!(find_local_maxima(&[1.0; 10]).is_empty());
    }
}
