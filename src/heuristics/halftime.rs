//! Half-time feel detection
//!
//! A fast tempo with sparse, weak onsets is usually felt at half speed
//! (trap, half-time dubstep). The detector compares the onset event rate
//! with the beat rate the tempo implies.

use crate::features::statistics::mean;

/// Tempo below which no track is half-time
const MIN_HALFTIME_BPM: f32 = 140.0;

/// Upper end of the half-time tempo range
const MAX_HALFTIME_BPM: f32 = 180.0;

/// Onset-rate / beat-rate ratio below which onsets count as sparse
const SPARSE_ONSET_RATIO: f32 = 0.65;

/// Mean onset strength below which onsets count as weak
const WEAK_ONSET_STRENGTH: f32 = 1.5;

/// Outcome of half-time detection
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Halftime {
    /// Whether the track has a half-time feel
    pub is_halftime: bool,
    /// Perceived tempo: half of `bpm` when half-time, else `bpm`
    pub effective_bpm: f32,
}

/// Detect a half-time feel
///
/// # Arguments
///
/// * `bpm` - Tempo to test
/// * `onset_envelope` - Onset strength per frame
/// * `onset_event_count` - Number of detected onset events
/// * `duration` - Track duration in seconds
///
/// # Example
///
/// ```
/// use soundprint::heuristics::halftime::detect_halftime;
///
/// // 150 BPM expects 2.5 beats/s; 1 onset/s with weak onsets is half-time
/// let verdict = detect_halftime(150.0, &[0.4; 100], 60, 60.0);
/// assert!(verdict.is_halftime);
/// assert_eq!(verdict.effective_bpm, 75.0);
/// ```
pub fn detect_halftime(
    bpm: f32,
    onset_envelope: &[f32],
    onset_event_count: usize,
    duration: f32,
) -> Halftime {
    let not_halftime = Halftime {
        is_halftime: false,
        effective_bpm: bpm,
    };

    if bpm.is_nan() || bpm < MIN_HALFTIME_BPM {
        return not_halftime;
    }

    let expected_rate = bpm / 60.0;
    let actual_rate = if duration > 0.0 {
        onset_event_count as f32 / duration
    } else {
        0.0
    };
    let onset_ratio = actual_rate / expected_rate;
    let onset_strength = mean(onset_envelope);

    let is_halftime = bpm <= MAX_HALFTIME_BPM
        && onset_ratio < SPARSE_ONSET_RATIO
        && onset_strength < WEAK_ONSET_STRENGTH;

    log::debug!(
        "Half-time check at {:.1} BPM: onset ratio {:.3}, mean strength {:.3} -> {}",
        bpm,
        onset_ratio,
        onset_strength,
        is_halftime
    );

    if is_halftime {
        Halftime {
            is_halftime: true,
            effective_bpm: bpm / 2.0,
        }
    } else {
        not_halftime
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slow_tempos_never_halftime() {
        for bpm in [0.0f32, 60.0, 100.0, 139.9] {
            let v = detect_halftime(bpm, &[0.0; 10], 0, 30.0);
            assert_eq!(v, Halftime { is_halftime: false, effective_bpm: bpm });
        }
    }

    #[test]
    fn test_dense_or_strong_onsets_are_not_halftime() {
        // 160 BPM = 2.67 beats/s; 2.5 onsets/s is dense
        assert!(!detect_halftime(160.0, &[0.5; 10], 150, 60.0).is_halftime);
        // sparse but strong
        assert!(!detect_halftime(160.0, &[2.0; 10], 30, 60.0).is_halftime);
    }

    #[test]
    fn test_range_bounds() {
        assert!(detect_halftime(140.0, &[0.5; 10], 10, 60.0).is_halftime);
        assert!(detect_halftime(180.0, &[0.5; 10], 10, 60.0).is_halftime);
        assert!(!detect_halftime(181.0, &[0.5; 10], 10, 60.0).is_halftime);
    }

    #[test]
    fn test_zero_duration_counts_as_no_onsets() {
        let v = detect_halftime(160.0, &[0.5; 10], 100, 0.0);
        assert!(v.is_halftime);
        assert_eq!(v.effective_bpm, 80.0);
    }

    #[test]
    fn test_effective_never_exceeds_bpm() {
        for bpm in (100..=200).step_by(5) {
            let v = detect_halftime(bpm as f32, &[0.5; 10], 20, 60.0);
            assert!(v.effective_bpm <= bpm as f32);
        }
    }
}
