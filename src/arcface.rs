//! ArcFace: additive angular margin header.
//!
//! ArcFace trains embeddings on the unit hypersphere: weight rows (one per
//! class) and feature rows are L2-normalized, so the projection produces
//! cosine similarities. The target class's angle then gets an additive
//! penalty `m` before mapping back through cosine, which forces the network
//! to pull samples closer to their class center than a margin-free decision
//! boundary would require. Non-target columns keep the plain cosine; the
//! whole matrix is re-scaled by `s` to restore a useful logit range for the
//! downstream softmax cross-entropy.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::init::xavier_uniform;
use crate::norm::{clamped_acos, l2_normalize_rows, Scratch};
use crate::{matmul, Batch, Error, Result};

/// Default logit scale `s`.
pub const DEFAULT_SCALE: f32 = 64.0;

/// Default additive angular margin `m`, in radians.
pub const DEFAULT_MARGIN: f32 = 0.5;

pub(crate) fn validate_hyperparams(s: f32, m: f32) -> Result<()> {
    if !(s.is_finite() && s > 0.0) {
        return Err(Error::InvalidConfig(format!(
            "scale s must be finite and > 0, got {s}"
        )));
    }
    if !(m.is_finite() && m >= 0.0) {
        return Err(Error::InvalidConfig(format!(
            "margin m must be finite and >= 0, got {m}"
        )));
    }
    Ok(())
}

/// Additive angular margin header.
///
/// `forward` renormalizes the stored weight matrix in place before use, so
/// the header always trains on unit weight rows regardless of what the
/// optimizer did to them since the previous step. An instance is therefore
/// not thread-safe for a forward pass running concurrently with an optimizer
/// update.
#[derive(Debug, Clone)]
pub struct ArcFaceHeader {
    in_features: usize,
    out_features: usize,
    s: f32,
    m: f32,
    /// Row-major matrix with shape (out_features, in_features); one row per class.
    weights: Vec<f32>,
}

impl ArcFaceHeader {
    /// Build with Xavier-initialized weights from a deterministic seed.
    pub fn new_with_seed(
        in_features: usize,
        out_features: usize,
        s: f32,
        m: f32,
        seed: u64,
    ) -> Result<Self> {
        let mut rng = StdRng::seed_from_u64(seed);
        Self::new_with_rng(in_features, out_features, s, m, &mut rng)
    }

    /// Build with Xavier-initialized weights from the provided RNG.
    pub fn new_with_rng<R: Rng + ?Sized>(
        in_features: usize,
        out_features: usize,
        s: f32,
        m: f32,
        rng: &mut R,
    ) -> Result<Self> {
        if in_features == 0 || out_features == 0 {
            return Err(Error::InvalidConfig(format!(
                "header dims must be > 0, got in_features={in_features} out_features={out_features}"
            )));
        }
        validate_hyperparams(s, m)?;

        Ok(Self {
            in_features,
            out_features,
            s,
            m,
            weights: xavier_uniform(in_features, out_features, rng),
        })
    }

    /// Build from an existing weight matrix, validating shape and finiteness.
    ///
    /// The rows do not need to be unit-length; `forward` renormalizes them.
    pub fn from_parts(
        in_features: usize,
        out_features: usize,
        s: f32,
        m: f32,
        weights: Vec<f32>,
    ) -> Result<Self> {
        if in_features == 0 || out_features == 0 {
            return Err(Error::InvalidConfig(format!(
                "header dims must be > 0, got in_features={in_features} out_features={out_features}"
            )));
        }
        validate_hyperparams(s, m)?;
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
            s,
            m,
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
    pub fn scale(&self) -> f32 {
        self.s
    }

    #[inline]
    pub fn margin(&self) -> f32 {
        self.m
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

    /// Renormalizes every class row of the weight matrix to unit L2 norm, in
    /// place. Idempotent; `forward` calls this at the top of every pass.
    pub fn renormalize_weights(&mut self) {
        l2_normalize_rows(&mut self.weights, self.in_features);
    }

    /// Forward pass into a caller-provided buffer (hot path; allocation-free
    /// once `scratch` has seen the batch size).
    ///
    /// Shape contract (checked with `assert!`):
    /// - `features.len() == labels.len() * in_features`
    /// - `out.len() == labels.len() * out_features`
    /// - every label < `out_features`
    pub fn forward_into(
        &mut self,
        features: &[f32],
        labels: &[usize],
        scratch: &mut Scratch,
        out: &mut [f32],
    ) {
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

        self.renormalize_weights();
        scratch.prepare(features, self.in_features);
        matmul::gemm_nt(
            n,
            self.out_features,
            self.in_features,
            &scratch.normed,
            &self.weights,
            out,
        );

        // Margin on the target column only; every other column keeps the
        // plain cosine. Equivalent to the one-hot blend with the mask folded
        // away.
        for (row, &label) in labels.iter().enumerate() {
            assert!(
                label < self.out_features,
                "label {label} out of range for {} classes",
                self.out_features
            );
            let idx = row * self.out_features + label;
            let theta = clamped_acos(out[idx]);
            out[idx] = (theta + self.m).cos();
        }

        for v in out.iter_mut() {
            *v *= self.s;
        }
    }

    /// Shape- and label-checked forward pass over a [`Batch`].
    ///
    /// Returns a flat `(batch.len(), out_features)` logits buffer ready for a
    /// softmax cross-entropy loss.
    pub fn forward(&mut self, batch: &Batch) -> Result<Vec<f32>> {
        if batch.in_features() != self.in_features {
            return Err(Error::InvalidShape(format!(
                "batch in_features {} does not match header in_features {}",
                batch.in_features(),
                self.in_features
            )));
        }
        for (i, &label) in batch.labels().iter().enumerate() {
            if label >= self.out_features {
                return Err(Error::InvalidLabel(format!(
                    "label {label} at row {i} out of range for {} classes",
                    self.out_features
                )));
            }
        }

        let mut scratch = Scratch::new();
        let mut out = vec![0.0_f32; batch.len() * self.out_features];
        self.forward_into(batch.features(), batch.labels(), &mut scratch, &mut out);
        Ok(out)
    }
}
