//! Chroma normalization

/// Numerical stability epsilon
const EPSILON: f32 = 1e-10;

/// Scale a chroma vector so its largest bin is 1.0
///
/// Vectors whose maximum is below epsilon are left untouched.
pub fn normalize_max(chroma: &mut [f32; 12]) {
    let max = chroma.iter().copied().fold(0.0f32, f32::max);
    if max > EPSILON {
        chroma.iter_mut().for_each(|v| *v /= max);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_max() {
        let mut chroma = [0.0f32; 12];
        chroma[0] = 4.0;
        chroma[7] = 2.0;
        normalize_max(&mut chroma);
        assert_eq!(chroma[0], 1.0);
        assert_eq!(chroma[7], 0.5);

        let mut silent = [0.0f32; 12];
        normalize_max(&mut silent);
        assert!(silent.iter().all(|&v| v == 0.0));
    }
}
