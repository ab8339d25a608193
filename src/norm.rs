//! L2 normalization primitives shared by the angular-margin headers.
//!
//! Both margin headers operate on the unit hypersphere: weight rows (one per
//! class) and feature rows are normalized to unit length, so the projection
//! `features · weightsᵀ` produces cosine similarities directly.

/// Clamp applied to a cosine before `acos`.
///
/// Accumulated floating-point drift can push a cosine slightly outside
/// `[-1, 1]`, where `acos` returns NaN, and a NaN logit silently corrupts
/// training. Cosines are therefore clamped to `[-1 + ACOS_EPS, 1 - ACOS_EPS]`
/// before the angle is taken.
pub const ACOS_EPS: f32 = 1e-7;

/// `acos` over the clamped domain. Never NaN.
#[inline]
pub(crate) fn clamped_acos(x: f32) -> f32 {
    x.clamp(-1.0 + ACOS_EPS, 1.0 - ACOS_EPS).acos()
}

/// Normalizes each `dim`-length row of `data` to unit L2 norm, in place.
///
/// Rows with zero norm are left untouched: normalizing a zero vector is
/// undefined, and leaving the row as-is yields zero cosines downstream
/// instead of NaN.
///
/// Panics if `dim == 0` or `data.len()` is not divisible by `dim`.
pub fn l2_normalize_rows(data: &mut [f32], dim: usize) {
    assert!(dim > 0, "dim must be > 0");
    assert_eq!(
        data.len() % dim,
        0,
        "data length {} is not divisible by dim {}",
        data.len(),
        dim
    );

    for row in data.chunks_exact_mut(dim) {
        let mut sum_sq = 0.0_f32;
        for &v in row.iter() {
            sum_sq = v.mul_add(v, sum_sq);
        }
        let norm = sum_sq.sqrt();
        if norm > 0.0 {
            let inv = 1.0 / norm;
            for v in row.iter_mut() {
                *v *= inv;
            }
        }
    }
}

/// Reusable buffers for the angular-margin forward passes.
///
/// Holds the normalized copy of the feature batch plus each row's raw L2
/// norm (MagFace derives its adaptive margin from the raw magnitudes).
/// Allocate once and reuse across steps; the buffers grow to the largest
/// batch seen and are not reallocated for same-sized or smaller batches.
#[derive(Debug, Clone, Default)]
pub struct Scratch {
    pub(crate) normed: Vec<f32>,
    pub(crate) norms: Vec<f32>,
}

impl Scratch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copies `features` into the normalized buffer row by row, recording
    /// each row's raw L2 norm. Zero rows are copied unscaled.
    pub(crate) fn prepare(&mut self, features: &[f32], dim: usize) {
        debug_assert!(dim > 0);
        debug_assert_eq!(features.len() % dim, 0);

        let len = features.len() / dim;
        self.normed.resize(features.len(), 0.0);
        self.norms.resize(len, 0.0);
        self.normed.copy_from_slice(features);

        for (row, norm_slot) in self.normed.chunks_exact_mut(dim).zip(self.norms.iter_mut()) {
            let mut sum_sq = 0.0_f32;
            for &v in row.iter() {
                sum_sq = v.mul_add(v, sum_sq);
            }
            let norm = sum_sq.sqrt();
            *norm_slot = norm;
            if norm > 0.0 {
                let inv = 1.0 / norm;
                for v in row.iter_mut() {
                    *v *= inv;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_are_unit_norm_after_normalization() {
        let mut data = vec![3.0_f32, 4.0, 0.0, 5.0, -12.0, 0.0];
        l2_normalize_rows(&mut data, 3);

        for row in data.chunks_exact(3) {
            let norm: f32 = row.iter().map(|v| v * v).sum::<f32>().sqrt();
            assert!((norm - 1.0).abs() < 1e-6, "row norm {norm} not unit");
        }
        assert!((data[0] - 0.6).abs() < 1e-6);
        assert!((data[1] - 0.8).abs() < 1e-6);
    }

    #[test]
    fn zero_rows_are_left_untouched() {
        let mut data = vec![0.0_f32, 0.0, 1.0, 1.0];
        l2_normalize_rows(&mut data, 2);

        assert_eq!(&data[..2], &[0.0, 0.0]);
        assert!((data[2] - std::f32::consts::FRAC_1_SQRT_2).abs() < 1e-6);
    }

    #[test]
    fn normalization_is_idempotent() {
        let mut once = vec![0.3_f32, -0.7, 0.2, 0.9];
        l2_normalize_rows(&mut once, 4);
        let mut twice = once.clone();
        l2_normalize_rows(&mut twice, 4);
        assert_eq!(once, twice);
    }

    #[test]
    fn clamped_acos_never_produces_nan_at_the_boundaries() {
        for x in [-2.0_f32, -1.0, -1.0 + 1e-9, 1.0 - 1e-9, 1.0, 1.5] {
            assert!(clamped_acos(x).is_finite(), "acos({x}) not finite");
        }
        assert!(clamped_acos(1.0) < 1e-2);
        assert!((clamped_acos(-1.0) - std::f32::consts::PI).abs() < 1e-2);
    }

    #[test]
    fn scratch_records_raw_norms_and_unit_rows() {
        let mut scratch = Scratch::new();
        scratch.prepare(&[3.0, 4.0, 0.0, 0.0], 2);

        assert!((scratch.norms[0] - 5.0).abs() < 1e-6);
        assert_eq!(scratch.norms[1], 0.0);
        assert!((scratch.normed[0] - 0.6).abs() < 1e-6);
        assert!((scratch.normed[1] - 0.8).abs() < 1e-6);
        assert_eq!(&scratch.normed[2..], &[0.0, 0.0]);
    }
}
