//! Weight initialization.

use rand::Rng;

/// Xavier/Glorot uniform initialization for a row-major
/// `(out_features, in_features)` weight matrix.
///
/// Samples from `U(-b, b)` with `b = sqrt(6 / (fan_in + fan_out))`, which
/// keeps the variance of the projected logits roughly independent of the
/// layer dimensions.
pub(crate) fn xavier_uniform<R: Rng + ?Sized>(
    in_features: usize,
    out_features: usize,
    rng: &mut R,
) -> Vec<f32> {
    debug_assert!(in_features > 0 && out_features > 0);

    let bound = (6.0 / (in_features + out_features) as f32).sqrt();
    let mut weights = vec![0.0_f32; in_features * out_features];
    for w in weights.iter_mut() {
        *w = rng.gen_range(-bound..bound);
    }
    weights
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn values_stay_within_the_xavier_bound() {
        let mut rng = StdRng::seed_from_u64(0);
        let w = xavier_uniform(16, 8, &mut rng);
        assert_eq!(w.len(), 16 * 8);

        let bound = (6.0_f32 / 24.0).sqrt();
        assert!(w.iter().all(|v| v.abs() < bound));
        // A seeded draw over 128 values should not collapse to a constant.
        assert!(w.iter().any(|&v| v != w[0]));
    }
}
