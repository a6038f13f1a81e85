//! Key estimation from the chromagram
//!
//! Coarse heuristic: the strongest pitch class of the time-averaged chroma
//! profile is the tonic, and the mode comes from comparing its major third
//! with its minor third. It does not model key changes, modal music or
//! relative-key ambiguity.

use crate::analysis::result::Key;
use crate::error::AnalysisError;

/// Mean chroma over time
pub fn chroma_profile(chromagram: &[[f32; 12]]) -> Option<[f32; 12]> {
    if chromagram.is_empty() {
        return None;
    }
    let mut profile = [0.0f32; 12];
    for frame in chromagram {
        for (acc, &v) in profile.iter_mut().zip(frame.iter()) {
            *acc += v;
        }
    }
    let n = chromagram.len() as f32;
    profile.iter_mut().for_each(|v| *v /= n);
    Some(profile)
}

/// Estimate the key of a chromagram
///
/// # Errors
///
/// Returns `AnalysisError::MeasurementError` for an empty chromagram
///
/// # Example
///
/// ```
/// use soundprint::heuristics::key::estimate_key;
///
/// // Strong A with a stronger C than C#: A minor
/// let mut frame = [0.1f32; 12];
/// frame[9] = 1.0;
/// frame[0] = 0.6;
/// frame[1] = 0.2;
/// let key = estimate_key(&[frame; 4])?;
/// assert_eq!(key.to_string(), "A minor");
/// # Ok::<(), soundprint::AnalysisError>(())
/// ```
pub fn estimate_key(chromagram: &[[f32; 12]]) -> Result<Key, AnalysisError> {
    let profile = chroma_profile(chromagram).ok_or_else(|| {
        AnalysisError::MeasurementError("Empty chromagram, cannot estimate key".to_string())
    })?;

    if profile.iter().any(|v| !v.is_finite()) {
        return Err(AnalysisError::NumericalError(
            "Non-finite chroma profile".to_string(),
        ));
    }

    // First maximum wins ties
    let tonic = profile
        .iter()
        .enumerate()
        .fold(0usize, |best, (i, &v)| if v > profile[best] { i } else { best });

    let major_third = profile[(tonic + 4) % 12];
    let minor_third = profile[(tonic + 3) % 12];
    let key = if major_third > minor_third {
        Key::Major(tonic as u32)
    } else {
        Key::Minor(tonic as u32)
    };

    log::debug!(
        "Key estimate: {} (tonic {:.3}, M3 {:.3}, m3 {:.3})",
        key,
        profile[tonic],
        major_third,
        minor_third
    );

    Ok(key)
}
