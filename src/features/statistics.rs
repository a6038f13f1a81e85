//! Summary statistics over feature curves

/// Arithmetic mean, 0.0 for an empty slice
pub fn mean(values: &[f32]) -> f32 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f32>() / values.len() as f32
    }
}

/// Percentile with linear interpolation between closest ranks
///
/// `q` is in [0, 100] and clamped. Returns 0.0 for an empty slice.
///
/// # Example
///
/// ```
/// use soundprint::features::statistics::percentile;
///
/// assert_eq!(percentile(&[1.0, 2.0, 3.0, 4.0], 50.0), 2.5);
/// assert_eq!(percentile(&[1.0, 2.0, 3.0, 4.0, 5.0], 75.0), 4.0);
/// ```
pub fn percentile(values: &[f32], q: f32) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let rank = (q.clamp(0.0, 100.0) / 100.0) * (sorted.len() - 1) as f32;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f32;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

/// Percentile rank of `value` within `population`, in [0, 1]
///
/// Ties count half, so the rank of the only element of a singleton is 0.5.
pub fn percentile_rank(population: &[f32], value: f32) -> f32 {
    if population.is_empty() {
        return 0.0;
    }
    let below = population.iter().filter(|&&v| v < value).count() as f32;
    let equal = population.iter().filter(|&&v| v == value).count() as f32;
    (below + 0.5 * equal) / population.len() as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean() {
        assert_eq!(mean(&[]), 0.0);
        assert_eq!(mean(&[1.0, 2.0, 3.0]), 2.0);
    }

    #[test]
    fn test_percentile_interpolates() {
        let v = [10.0, 0.0, 20.0, 30.0];
        assert_eq!(percentile(&v, 0.0), 0.0);
        assert_eq!(percentile(&v, 100.0), 30.0);
        assert!((percentile(&v, 25.0) - 7.5).abs() < 1e-6);
        assert_eq!(percentile(&[], 25.0), 0.0);
        assert_eq!(percentile(&[4.0], 75.0), 4.0);
    }

    #[test]
    fn test_percentile_rank() {
        let pop = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(percentile_rank(&pop, 4.0), 0.875);
        assert_eq!(percentile_rank(&pop, 0.5), 0.0);
        assert_eq!(percentile_rank(&pop, 10.0), 1.0);
        assert_eq!(percentile_rank(&[], 1.0), 0.0);
    }
}
