//! Plain linear classification header.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::init::xavier_uniform;
use crate::{matmul, Batch, Error, Result};

/// Bias-free linear projection: `logits = features · weightsᵀ`.
///
/// Labels are accepted and ignored so that all headers share one call
/// contract; the margin headers ([`ArcFaceHeader`](crate::ArcFaceHeader),
/// [`MagFaceHeader`](crate::MagFaceHeader)) use them to pick the penalized
/// column.
#[derive(Debug, Clone)]
pub struct LinearHeader {
    in_features: usize,
    out_features: usize,
    /// Row-major matrix with shape (out_features, in_features); one row per class.
    weights: Vec<f32>,
}

impl LinearHeader {
    /// Build with Xavier-initialized weights from a deterministic seed.
    pub fn new_with_seed(in_features: usize, out_features: usize, seed: u64) -> Result<Self> {
        let mut rng = StdRng::seed_from_u64(seed);
        Self::new_with_rng(in_features, out_features, &mut rng)
    }

    /// Build with Xavier-initialized weights from the provided RNG.
    pub fn new_with_rng<R: Rng + ?Sized>(
        in_features: usize,
        out_features: usize,
        rng: &mut R,
    ) -> Result<Self> {
        if in_features == 0 || out_features == 0 {
            return Err(Error::InvalidConfig(format!(
                "header dims must be > 0, got in_features={in_features} out_features={out_features}"
            )));
        }

        Ok(Self {
            in_features,
            out_features,
            weights: xavier_uniform(in_features, out_features, rng),
        })
    }

    /// Build from an existing weight matrix, validating shape and finiteness.
    pub fn from_parts(in_features: usize, out_features: usize, weights: Vec<f32>) -> Result<Self> {
        if in_features == 0 || out_features == 0 {
            return Err(Error::InvalidConfig(format!(
                "header dims must be > 0, got in_features={in_features} out_features={out_features}"
            )));
        }
        if weights.len() != in_features * out_features {
            return Err(Error::InvalidShape(format!(
                "weights length {} does not match out_features * in_features ({out_features} * {in_features})",
                weights.len()
            )));
        }
        if weights.iter().any(|v| !v.is_finite()) {
            return Err(Error::InvalidData(
                "weights must contain only finite values".to_owned(),
            ));
        }

        Ok(Self {
            in_features,
            out_features,
            weights,
        })
    }

    #[inline]
    pub fn in_features(&self) -> usize {
        self.in_features
    }

    #[inline]
    pub fn out_features(&self) -> usize {
        self.out_features
    }

    #[inline]
    pub fn weights(&self) -> &[f32] {
        &self.weights
    }

    /// Mutable access for the optimizer that owns weight updates between
    /// forward calls.
    #[inline]
    pub fn weights_mut(&mut self) -> &mut [f32] {
        &mut self.weights
    }

    /// Forward pass into a caller-provided buffer (hot path, allocation-free).
    ///
    /// Shape contract (checked with `assert!`):
    /// - `features.len() == labels.len() * in_features`
    /// - `out.len() == labels.len() * out_features`
    ///
    /// `labels` only contributes its length here; the projection does not
    /// depend on label values.
    pub fn forward_into(&self, features: &[f32], labels: &[usize], out: &mut [f32]) {
        let n = labels.len();
        assert!(n > 0, "batch must not be empty");
        assert_eq!(
            features.len(),
            n * self.in_features,
            "features len {} does not match batch * in_features ({n} * {})",
            features.len(),
            self.in_features
        );
        assert_eq!(
            out.len(),
            n * self.out_features,
            "out len {} does not match batch * out_features ({n} * {})",
            out.len(),
            self.out_features
        );

        matmul::gemm_nt(
            n,
            self.out_features,
            self.in_features,
            features,
            &self.weights,
            out,
        );
    }

    /// Shape-checked forward pass over a [`Batch`].
    ///
    /// Returns a flat `(batch.len(), out_features)` logits buffer.
    pub fn forward(&self, batch: &Batch) -> Result<Vec<f32>> {
        if batch.in_features() != self.in_features {
            return Err(Error::InvalidShape(format!(
                "batch in_features {} does not match header in_features {}",
                batch.in_features(),
                self.in_features
            )));
        }

        let mut out = vec![0.0_f32; batch.len() * self.out_features];
        self.forward_into(batch.features(), batch.labels(), &mut out);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Batch;

    #[test]
    fn projection_matches_hand_computed_values() {
        let header = LinearHeader::from_parts(2, 2, vec![1.0, 2.0, 3.0, 4.0]).unwrap();
        let batch = Batch::from_rows(&[vec![1.0, 1.0]], &[0]).unwrap();

        let logits = header.forward(&batch).unwrap();
        assert!((logits[0] - 3.0).abs() < 1e-6);
        assert!((logits[1] - 7.0).abs() < 1e-6);
    }

    #[test]
    fn output_is_invariant_to_label_values() {
        let header = LinearHeader::new_with_seed(3, 4, 0).unwrap();
        let rows = vec![vec![0.3_f32, -0.7, 0.2], vec![0.9, 0.1, -0.4]];

        let a = header
            .forward(&Batch::from_rows(&rows, &[0, 0]).unwrap())
            .unwrap();
        let b = header
            .forward(&Batch::from_rows(&rows, &[3, 1]).unwrap())
            .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn seeded_init_is_deterministic() {
        let a = LinearHeader::new_with_seed(8, 4, 123).unwrap();
        let b = LinearHeader::new_with_seed(8, 4, 123).unwrap();
        assert_eq!(a.weights(), b.weights());
    }

    #[test]
    fn from_parts_rejects_bad_weights() {
        assert!(LinearHeader::from_parts(2, 2, vec![0.0; 3]).is_err());
        assert!(LinearHeader::from_parts(2, 2, vec![0.0, f32::NAN, 0.0, 0.0]).is_err());
        assert!(LinearHeader::from_parts(0, 2, vec![]).is_err());
    }

    #[test]
    fn forward_rejects_mismatched_feature_dim() {
        let header = LinearHeader::new_with_seed(3, 2, 0).unwrap();
        let batch = Batch::from_rows(&[vec![0.0, 1.0]], &[0]).unwrap();
        assert!(header.forward(&batch).is_err());
    }

    #[test]
    #[should_panic]
    fn forward_into_panics_on_mis_sized_output() {
        let header = LinearHeader::new_with_seed(2, 3, 0).unwrap();
        let mut out = [0.0_f32; 2];
        header.forward_into(&[0.1, 0.2], &[0], &mut out);
    }
}
