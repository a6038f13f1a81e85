//! Quality rubric
//!
//! Four equally weighted sub-scores:
//!
//! | Component | Rule |
//! |-----------|------|
//! | duration  | < 10 s → 0.3, < 30 s → 0.6, < 60 s → 0.8, else 1.0 |
//! | loudness  | < -30 dB → 0.4, < -20 dB → 0.7, else 1.0 |
//! | silence   | `max(0, 1 - silence_ratio)` |
//! | tempo     | tempo confidence |
//!
//! The overall score is the mean of the four. Overall and sub-scores are
//! rounded to two decimals, ties to even (0.125 becomes 0.12); the overall is
//! computed from the unrounded sub-scores.

use serde::{Deserialize, Serialize};

const WEIGHT: f64 = 0.25;

/// Descriptor values the rubric reads
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QualityInputs {
    /// Duration in seconds
    pub duration: f32,
    /// Loudness in dB
    pub loudness_db: f32,
    /// Silence ratio in [0, 1]
    pub silence_ratio: f32,
    /// Tempo confidence in [0, 1]
    pub tempo_confidence: f32,
}

/// Sub-score per rubric component, each in [0, 1]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QualityBreakdown {
    /// Duration sub-score
    pub duration: f64,
    /// Loudness sub-score
    pub loudness: f64,
    /// Silence sub-score
    pub silence: f64,
    /// Tempo-confidence sub-score
    pub tempo: f64,
}

/// Overall quality with its breakdown
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QualityScore {
    /// Weighted mean of the sub-scores, in [0, 1]
    pub overall: f64,
    /// Rounded sub-scores
    pub breakdown: QualityBreakdown,
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round_ties_even() / 100.0
}

fn duration_score(duration: f32) -> f64 {
    if duration < 10.0 {
        0.3
    } else if duration < 30.0 {
        0.6
    } else if duration < 60.0 {
        0.8
    } else {
        1.0
    }
}

fn loudness_score(loudness_db: f32) -> f64 {
    if loudness_db < -30.0 {
        0.4
    } else if loudness_db < -20.0 {
        0.7
    } else {
        1.0
    }
}

/// Score a track against the quality rubric
///
/// # Example
///
/// ```
/// use soundprint::heuristics::quality::{score_quality, QualityInputs};
///
/// let score = score_quality(QualityInputs {
///     duration: 5.0,
///     loudness_db: -35.0,
///     silence_ratio: 0.9,
///     tempo_confidence: 0.2,
/// });
/// assert_eq!(score.overall, 0.25);
/// assert_eq!(score.breakdown.silence, 0.1);
/// ```
pub fn score_quality(inputs: QualityInputs) -> QualityScore {
    let duration = duration_score(inputs.duration);
    let loudness = loudness_score(inputs.loudness_db);
    let silence = (1.0 - inputs.silence_ratio as f64).clamp(0.0, 1.0);
    let tempo = (inputs.tempo_confidence as f64).clamp(0.0, 1.0);

    let overall = duration * WEIGHT + loudness * WEIGHT + silence * WEIGHT + tempo * WEIGHT;

    let score = QualityScore {
        overall: round2(overall),
        breakdown: QualityBreakdown {
            duration: round2(duration),
            loudness: round2(loudness),
            silence: round2(silence),
            tempo: round2(tempo),
        },
    };

    log::debug!("Quality: {:.2} {:?}", score.overall, score.breakdown);

    score
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs(
        duration: f32,
        loudness_db: f32,
        silence_ratio: f32,
        tempo_confidence: f32,
    ) -> QualityInputs {
        QualityInputs {
            duration,
            loudness_db,
            silence_ratio,
            tempo_confidence,
        }
    }

    #[test]
    fn test_perfect_track() {
        let score = score_quality(inputs(240.0, -8.0, 0.0, 1.0));
        assert_eq!(score.overall, 1.0);
        assert_eq!(
            score.breakdown,
            QualityBreakdown {
                duration: 1.0,
                loudness: 1.0,
                silence: 1.0,
                tempo: 1.0
            }
        );
    }

    #[test]
    fn test_poor_track() {
        let score = score_quality(inputs(5.0, -35.0, 0.9, 0.2));
        assert_eq!(score.breakdown.duration, 0.3);
        assert_eq!(score.breakdown.loudness, 0.4);
        assert_eq!(score.breakdown.silence, 0.1);
        assert_eq!(score.breakdown.tempo, 0.2);
        assert_eq!(score.overall, 0.25);
    }

    #[test]
    fn test_middling_track() {
        let score = score_quality(inputs(45.0, -25.0, 0.5, 0.6));
        assert_eq!(score.breakdown.duration, 0.8);
        assert_eq!(score.breakdown.loudness, 0.7);
        assert_eq!(score.overall, 0.65);
    }

    #[test]
    fn test_step_boundaries() {
        assert_eq!(duration_score(9.99), 0.3);
        assert_eq!(duration_score(10.0), 0.6);
        assert_eq!(duration_score(30.0), 0.8);
        assert_eq!(duration_score(60.0), 1.0);
        assert_eq!(loudness_score(-30.0), 0.7);
        assert_eq!(loudness_score(-20.0), 1.0);
        assert_eq!(loudness_score(-30.01), 0.4);
    }

    #[test]
    fn test_rounding_and_range() {
        let score = score_quality(inputs(20.0, -10.0, 0.123, 0.456));
        // 0.6 + 1.0 + 0.877 + 0.456 = 2.933 / 4 = 0.73325
        assert_eq!(score.overall, 0.73);
        assert_eq!(score.breakdown.silence, 0.88);
        assert_eq!(score.breakdown.tempo, 0.46);

        let score = score_quality(inputs(0.0, -120.0, 1.5, -0.5));
        assert!((0.0..=1.0).contains(&score.overall));
        assert_eq!(score.breakdown.silence, 0.0);
    }

    #[test]
    fn test_exact_halves_round_to_even() {
        let score = score_quality(inputs(45.0, -25.0, 0.875, 0.125));
        assert_eq!(score.breakdown.silence, 0.12);
        assert_eq!(score.breakdown.tempo, 0.12);
        // 0.8 + 0.7 + 0.125 + 0.125 = 1.75 / 4 = 0.4375
        assert_eq!(score.overall, 0.44);

        let score = score_quality(inputs(45.0, -25.0, 0.625, 0.375));
        assert_eq!(score.breakdown.silence, 0.38);
        assert_eq!(score.breakdown.tempo, 0.38);
        assert_eq!(score.overall, 0.56);
    }
}
