//! Silence measurement relative to the track peak

/// Fraction of samples whose level is below `threshold_db` relative to the
/// track peak
///
/// A sample is silent when `20 * log10(|x| / peak) < threshold_db`, evaluated
/// as `|x| < peak * 10^(threshold_db / 20)`. The denominator is the total
/// sample count.
///
/// - Empty waveform: 0.0
/// - All-zero waveform: 1.0 (every sample sits at the floor)
///
/// # Example
///
/// ```
/// use soundprint::preprocessing::silence::silence_ratio;
///
/// let mut samples = vec![0.0f32; 100];
/// samples[50..].iter_mut().for_each(|s| *s = 0.5);
/// assert_eq!(silence_ratio(&samples, -40.0), 0.5);
/// ```
pub fn silence_ratio(samples: &[f32], threshold_db: f32) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }

    let peak = samples.iter().map(|&x| x.abs()).fold(0.0f32, f32::max);
    if peak <= 0.0 {
        return 1.0;
    }

    let floor = peak * 10.0_f32.powf(threshold_db / 20.0);
    let silent = samples.iter().filter(|&&x| x.abs() < floor).count();
    let ratio = silent as f32 / samples.len() as f32;

    log::debug!(
        "Silence ratio: {}/{} samples below {:.1} dB ({:.4})",
        silent,
        samples.len(),
        threshold_db,
        ratio
    );

    ratio
}
