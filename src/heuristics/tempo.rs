//! Tempo resolution
//!
//! Corrects octave and ratio errors in the single raw tempo estimate.
//!
//! # Algorithm
//!
//! 1. **Filename prior**: a BPM written in the file name is trusted when the
//!    raw estimate agrees with it, directly or through a common multiple
//!    (×2, ×0.5, ×1.5, ×0.667), within 15% relative error.
//! 2. **Candidates**: the raw estimate plus genre-motivated alternatives
//!    (doubling slow tempos, drum-and-bass half time, dubstep ratios, halving
//!    very fast tempos).
//! 3. **Scoring**: each candidate is scored by the mean energy of the
//!    tempogram row nearest to it. The raw estimate wins ties; a candidate
//!    that cannot be scored is dropped on its own.
//!
//! # Limitations
//!
//! The native tempogram is built from windowed autocorrelation, which puts
//! nearly as much energy at half and double the true period as at the period
//! itself. Octave correction against it is close to a tie, so the raw
//! estimate usually stands (a 180 BPM click track estimated at 90 stays at
//! 90). A sharper tempogram from another front-end corrects more often.
//!
//! # Example
//!
//! ```
//! use soundprint::heuristics::tempo::resolve_tempo;
//!
//! // No tempogram, no usable hint: the raw estimate stands
//! assert_eq!(resolve_tempo(97.0, None, Some("intro.wav")), 97.0);
//!
//! // The file name says 128 BPM and the raw estimate is at half of it
//! assert_eq!(resolve_tempo(64.0, None, Some("Artist - Song 128bpm.mp3")), 128.0);
//! ```

use crate::error::AnalysisError;
use crate::features::period::Tempogram;
use crate::features::statistics::mean;
use regex::Regex;
use std::sync::OnceLock;

/// Relative tolerance for agreeing with the filename prior
const PRIOR_TOLERANCE: f32 = 0.15;

/// Multiples of the prior the raw estimate may have locked onto
const PRIOR_MULTIPLES: [f32; 4] = [2.0, 0.5, 1.5, 0.667];

/// Plausible BPM range for filename hints
const HINT_MIN_BPM: f32 = 60.0;
const HINT_MAX_BPM: f32 = 200.0;

/// Why a tempo candidate was considered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateRationale {
    /// The raw estimate itself
    Raw,
    /// Slow estimate (< 100 BPM) doubled
    DoubledSlow,
    /// Drum-and-bass half time (80-95 BPM) doubled
    DrumAndBassHalfTime,
    /// Dubstep range (145-155 BPM) divided by 1.2
    DubstepDivided,
    /// Dubstep range (145-155 BPM) scaled by 0.8
    DubstepScaled,
    /// Fast estimate (> 170 BPM) halved
    HalvedFast,
}

/// A tempo considered during resolution
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TempoCandidate {
    /// Candidate tempo in BPM
    pub bpm: f32,
    /// Why it was considered
    pub rationale: CandidateRationale,
}

fn relative_error(value: f32, target: f32) -> f32 {
    if target == 0.0 {
        f32::INFINITY
    } else {
        (value - target).abs() / target.abs()
    }
}

fn hint_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| {
        // Whole digit runs, optionally followed by a "bpm" marker
        Regex::new(r"(?i)(\d+)(\s*[-_]?\s*bpm)?").ok()
    })
    .as_ref()
}

/// Extract a BPM hint from a file name
///
/// Only standalone numbers of two or three digits in [60, 200] qualify; a
/// number followed by "bpm" wins over bare numbers, otherwise the first
/// qualifying number is used.
///
/// # Example
///
/// ```
/// use soundprint::heuristics::tempo::filename_bpm_hint;
///
/// assert_eq!(filename_bpm_hint("05 - Track (174 BPM).flac"), Some(174.0));
/// assert_eq!(filename_bpm_hint("mix_2023_120.wav"), Some(120.0));
/// assert_eq!(filename_bpm_hint("A1 - 90 - 128bpm.wav"), Some(128.0));
/// assert_eq!(filename_bpm_hint("track1234.mp3"), None);
/// ```
pub fn filename_bpm_hint(file_name: &str) -> Option<f32> {
    let mut bare: Option<f32> = None;

    for caps in hint_regex()?.captures_iter(file_name) {
        let digits = match caps.get(1) {
            Some(m) => m.as_str(),
            None => continue,
        };
        if !(2..=3).contains(&digits.len()) {
            continue;
        }
        let value: f32 = match digits.parse() {
            Ok(v) => v,
            Err(_) => continue,
        };
        if !(HINT_MIN_BPM..=HINT_MAX_BPM).contains(&value) {
            continue;
        }
        if caps.get(2).is_some() {
            return Some(value);
        }
        if bare.is_none() {
            bare = Some(value);
        }
    }

    bare
}

/// Candidate set for a raw estimate, duplicates collapsed
pub fn tempo_candidates(raw_bpm: f32) -> Vec<TempoCandidate> {
    let mut candidates = vec![TempoCandidate {
        bpm: raw_bpm,
        rationale: CandidateRationale::Raw,
    }];
    let mut push = |bpm: f32, rationale: CandidateRationale| {
        if !candidates.iter().any(|c| c.bpm == bpm) {
            candidates.push(TempoCandidate { bpm, rationale });
        }
    };

    if raw_bpm < 100.0 {
        push(raw_bpm * 2.0, CandidateRationale::DoubledSlow);
    }
    if (80.0..=95.0).contains(&raw_bpm) {
        push(raw_bpm * 2.0, CandidateRationale::DrumAndBassHalfTime);
    }
    if (145.0..=155.0).contains(&raw_bpm) {
        push(raw_bpm / 1.2, CandidateRationale::DubstepDivided);
        push(raw_bpm * 0.8, CandidateRationale::DubstepScaled);
    }
    if raw_bpm > 170.0 {
        push(raw_bpm / 2.0, CandidateRationale::HalvedFast);
    }

    candidates
}

/// Score a candidate: mean energy of the nearest tempogram row
///
/// # Errors
///
/// - `MeasurementUnavailable` without a tempogram
/// - `MeasurementError` when the nearest row is missing, empty or non-finite
pub fn score_candidate(bpm: f32, tempogram: Option<&Tempogram>) -> Result<f32, AnalysisError> {
    let tempogram = tempogram.ok_or_else(|| {
        AnalysisError::MeasurementUnavailable("no tempogram to score candidates".to_string())
    })?;
    let row = tempogram.closest_row(bpm).ok_or_else(|| {
        AnalysisError::MeasurementError(format!("no tempogram row near {:.1} BPM", bpm))
    })?;
    tempogram.row_mean(row).ok_or_else(|| {
        AnalysisError::MeasurementError(format!("tempogram row {} is empty or non-finite", row))
    })
}

/// Resolve the raw tempo estimate into a corrected tempo
///
/// # Arguments
///
/// * `raw_bpm` - Raw tempo estimate
/// * `tempogram` - Tempogram of the track's onset envelope, if available
/// * `filename_hint` - File name (not the directory path) of the track
///
/// # Returns
///
/// Corrected tempo in BPM. Never fails: without a usable prior or tempogram
/// the raw estimate is returned.
pub fn resolve_tempo(
    raw_bpm: f32,
    tempogram: Option<&Tempogram>,
    filename_hint: Option<&str>,
) -> f32 {
    if let Some(prior) = filename_hint.and_then(filename_bpm_hint) {
        if relative_error(raw_bpm, prior) <= PRIOR_TOLERANCE {
            log::debug!("Raw {:.1} BPM agrees with filename prior {:.0}", raw_bpm, prior);
            return prior;
        }
        if let Some(m) = PRIOR_MULTIPLES
            .iter()
            .find(|&&m| relative_error(raw_bpm, prior * m) <= PRIOR_TOLERANCE)
        {
            log::debug!(
                "Raw {:.1} BPM is {}x the filename prior {:.0}, using prior",
                raw_bpm,
                m,
                prior
            );
            return prior;
        }
        log::debug!(
            "Filename prior {:.0} BPM unrelated to raw {:.1} BPM, ignoring",
            prior,
            raw_bpm
        );
    }

    let candidates = tempo_candidates(raw_bpm);
    if candidates.len() == 1 {
        return raw_bpm;
    }

    // Raw is the incumbent; others must strictly beat it
    let mut best: Option<(TempoCandidate, f32)> = None;
    for candidate in &candidates {
        match score_candidate(candidate.bpm, tempogram) {
            Ok(score) => {
                log::debug!(
                    "Tempo candidate {:.2} BPM ({:?}): {:.5}",
                    candidate.bpm,
                    candidate.rationale,
                    score
                );
                let better = match best {
                    None => true,
                    Some((_, best_score)) => score > best_score,
                };
                if better {
                    best = Some((*candidate, score));
                }
            }
            Err(e) => {
                log::debug!("Tempo candidate {:.2} BPM excluded: {}", candidate.bpm, e);
            }
        }
    }

    match best {
        Some((candidate, _)) => {
            if candidate.rationale != CandidateRationale::Raw {
                log::debug!(
                    "Tempo corrected {:.2} -> {:.2} BPM ({:?})",
                    raw_bpm,
                    candidate.bpm,
                    candidate.rationale
                );
            }
            candidate.bpm
        }
        None => raw_bpm,
    }
}

/// Tempo confidence: `min(1, mean(onset_envelope) / 2)`
pub fn tempo_confidence(onset_envelope: &[f32]) -> f32 {
    (mean(onset_envelope) / 2.0).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Tempogram over 40..=240 BPM with a single energetic row at `peak_bpm`
    fn peaked_tempogram(peak_bpm: f32) -> Tempogram {
        let bpm_axis: Vec<f32> = (40..=240).rev().map(|b| b as f32).collect();
        let rows = bpm_axis
            .iter()
            .map(|&b| {
                let energy = if (b - peak_bpm).abs() < 1.0 { 1.0 } else { 0.1 };
                vec![energy; 20]
            })
            .collect();
        Tempogram::new(bpm_axis, rows).unwrap()
    }

    #[test]
    fn test_doubles_slow_estimate_when_tempogram_agrees() {
        for raw in [60.0f32, 70.0, 87.0, 95.0] {
            let tg = peaked_tempogram(raw * 2.0);
            let bpm = resolve_tempo(raw, Some(&tg), None);
            assert!(
                (bpm - raw * 2.0).abs() < 1e-3,
                "raw {:.1} should resolve to {:.1}, got {:.1}",
                raw,
                raw * 2.0,
                bpm
            );
        }
    }

    #[test]
    fn test_raw_wins_ties() {
        let bpm_axis: Vec<f32> = (40..=240).rev().map(|b| b as f32).collect();
        let rows = vec![vec![0.5; 10]; bpm_axis.len()];
        let flat = Tempogram::new(bpm_axis, rows).unwrap();
        assert_eq!(resolve_tempo(90.0, Some(&flat), None), 90.0);
        assert_eq!(resolve_tempo(180.0, Some(&flat), None), 180.0);
    }

    #[test]
    fn test_halves_fast_and_dubstep() {
        assert_eq!(resolve_tempo(180.0, Some(&peaked_tempogram(90.0)), None), 90.0);

        let bpm = resolve_tempo(150.0, Some(&peaked_tempogram(125.0)), None);
        assert!((bpm - 125.0).abs() < 1e-3, "got {:.2}", bpm);

        let bpm = resolve_tempo(150.0, Some(&peaked_tempogram(120.0)), None);
        assert!((bpm - 120.0).abs() < 1e-3, "got {:.2}", bpm);
    }

    #[test]
    fn test_filename_prior() {
        assert_eq!(resolve_tempo(64.0, None, Some("128bpm")), 128.0);
        assert_eq!(resolve_tempo(124.0, None, Some("track_128.wav")), 128.0);
        assert_eq!(resolve_tempo(85.0, None, Some("song 128 bpm.wav")), 128.0); // 0.667x
        assert_eq!(resolve_tempo(250.0, None, Some("x 128bpm.wav")), 128.0); // 2x
        assert_eq!(resolve_tempo(190.0, None, Some("x 128bpm.wav")), 128.0); // 1.5x
        // Just outside the 15% band around the prior and each multiple
        assert_eq!(resolve_tempo(108.0, None, Some("x 128bpm.wav")), 108.0);
        assert_eq!(resolve_tempo(296.0, None, Some("x 128bpm.wav")), 296.0);
        // Unrelated prior falls through to candidate scoring
        assert_eq!(resolve_tempo(110.0, None, Some("track 140bpm.wav")), 110.0);
        let tg = peaked_tempogram(100.0);
        assert_eq!(resolve_tempo(50.0, Some(&tg), Some("track 140bpm.wav")), 100.0);
    }

    #[test]
    fn test_filename_hint_parsing() {
        assert_eq!(filename_bpm_hint("128bpm"), Some(128.0));
        assert_eq!(filename_bpm_hint("Song_140_BPM.wav"), Some(140.0));
        assert_eq!(filename_bpm_hint("Song-140-bpm.wav"), Some(140.0));
        assert_eq!(filename_bpm_hint("take 45.wav"), None);
        assert_eq!(filename_bpm_hint("2024 remaster.mp3"), None);
        assert_eq!(filename_bpm_hint("no digits.mp3"), None);
        assert_eq!(filename_bpm_hint("999bpm 100.wav"), Some(100.0));
    }

    #[test]
    fn test_candidate_set() {
        let bpms = |raw: f32| -> Vec<f32> { tempo_candidates(raw).iter().map(|c| c.bpm).collect() };
        assert_eq!(bpms(120.0), vec![120.0]);
        assert_eq!(bpms(90.0), vec![90.0, 180.0]); // doubled once, duplicate collapsed
        let dubstep = bpms(150.0);
        assert_eq!(dubstep.len(), 3);
        assert!((dubstep[1] - 125.0).abs() < 1e-3 && (dubstep[2] - 120.0).abs() < 1e-3);
        assert_eq!(bpms(172.0), vec![172.0, 86.0]);
    }

    #[test]
    fn test_failed_candidates_are_excluded() {
        // No tempogram: every candidate fails, raw stands
        assert_eq!(resolve_tempo(70.0, None, None), 70.0);

        // Row nearest the raw estimate is empty: the doubled candidate wins
        let tg = Tempogram::new(vec![140.0, 70.0], vec![vec![0.2; 4], vec![]]).unwrap();
        assert_eq!(resolve_tempo(70.0, Some(&tg), None), 140.0);
    }

    #[test]
    fn test_native_tempogram_keeps_octave_candidates_close() {
        use crate::features::period::compute_tempogram;

        // 180 BPM pulse train at 22050 Hz, hop 512
        let frames_per_beat = 22050.0 / 512.0 * 60.0 / 180.0;
        let mut envelope = vec![0.0f32; 1300];
        let mut k = 0.0f32;
        while (k * frames_per_beat).round() < envelope.len() as f32 {
            envelope[(k * frames_per_beat).round() as usize] = 1.0;
            k += 1.0;
        }
        let tg = compute_tempogram(&envelope, 22050, 512).unwrap();

        // Autocorrelation rows at the period and at twice the period score
        // nearly alike, so either octave may be reported
        let half = score_candidate(90.0, Some(&tg)).unwrap();
        let full = score_candidate(180.0, Some(&tg)).unwrap();
        assert!(half > 0.0 && full > 0.0);
        let bpm = resolve_tempo(90.0, Some(&tg), None);
        assert!(bpm == 90.0 || bpm == 180.0, "got {:.2}", bpm);
    }

    #[test]
    fn test_tempo_confidence() {
        assert_eq!(tempo_confidence(&[]), 0.0);
        assert_eq!(tempo_confidence(&[1.0, 1.0]), 0.5);
        assert_eq!(tempo_confidence(&[5.0, 7.0]), 1.0);
    }
}
