//! MagFace: magnitude-aware angular margin header.
//!
//! MagFace extends ArcFace by making the margin a function of each sample's
//! feature magnitude: large-norm (high-quality) samples get a larger margin
//! and are pulled closer to their class center, while ambiguous low-norm
//! samples are penalized less. A convex regularizer on the magnitudes
//! encourages them to grow toward the upper bound.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::init::xavier_uniform;
use crate::norm::{clamped_acos, l2_normalize_rows, Scratch};
use crate::{matmul, Batch, Error, Result};

/// MagFace hyperparameters.
///
/// The magnitude bounds `[l_a, u_a]` clamp each sample's feature norm; the
/// margin bounds `[l_m, u_m]` are the range of the adaptive margin; and
/// `lambda_g` weights the magnitude regularizer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MagFaceParams {
    /// Logit scale.
    pub s: f32,
    /// Lower magnitude bound (must be > 0; the regularizer divides by the
    /// clamped norm).
    pub l_a: f32,
    /// Upper magnitude bound.
    pub u_a: f32,
    /// Margin at the lower magnitude bound, in radians.
    pub l_m: f32,
    /// Margin at the upper magnitude bound, in radians.
    pub u_m: f32,
    /// Regularization weight.
    pub lambda_g: f32,
}

impl Default for MagFaceParams {
    fn default() -> Self {
        Self {
            s: 64.0,
            l_a: 10.0,
            u_a: 110.0,
            l_m: 0.45,
            u_m: 0.8,
            lambda_g: 20.0,
        }
    }
}

impl MagFaceParams {
    /// Validate the hyperparameters.
    pub fn validate(&self) -> Result<()> {
        if !(self.s.is_finite() && self.s > 0.0) {
            return Err(Error::InvalidConfig(format!(
                "scale s must be finite and > 0, got {}",
                self.s
            )));
        }
        if !(self.l_a.is_finite() && self.l_a > 0.0) {
            return Err(Error::InvalidConfig(format!(
                "lower magnitude bound l_a must be finite and > 0, got {}",
                self.l_a
            )));
        }
        if !(self.u_a.is_finite() && self.u_a > self.l_a) {
            return Err(Error::InvalidConfig(format!(
                "upper magnitude bound u_a must be finite and > l_a ({}), got {}",
                self.l_a, self.u_a
            )));
        }
        if !(self.l_m.is_finite() && self.l_m >= 0.0) {
            return Err(Error::InvalidConfig(format!(
                "lower margin l_m must be finite and >= 0, got {}",
                self.l_m
            )));
        }
        if !(self.u_m.is_finite() && self.u_m >= self.l_m) {
            return Err(Error::InvalidConfig(format!(
                "upper margin u_m must be finite and >= l_m ({}), got {}",
                self.l_m, self.u_m
            )));
        }
        if !(self.lambda_g.is_finite() && self.lambda_g >= 0.0) {
            return Err(Error::InvalidConfig(format!(
                "regularization weight lambda_g must be finite and >= 0, got {}",
                self.lambda_g
            )));
        }
        Ok(())
    }
}

/// Magnitude-aware angular margin header.
///
/// Like [`ArcFaceHeader`](crate::ArcFaceHeader), `forward` renormalizes the
/// stored weight matrix in place before use; an instance is not thread-safe
/// for a forward pass running concurrently with an optimizer update.
#[derive(Debug, Clone)]
pub struct MagFaceHeader {
    in_features: usize,
    out_features: usize,
    params: MagFaceParams,
    /// Row-major matrix with shape (out_features, in_features); one row per class.
    weights: Vec<f32>,
}

impl MagFaceHeader {
    /// Build with Xavier-initialized weights from a deterministic seed.
    pub fn new_with_seed(
        in_features: usize,
        out_features: usize,
        params: MagFaceParams,
        seed: u64,
    ) -> Result<Self> {
        let mut rng = StdRng::seed_from_u64(seed);
        Self::new_with_rng(in_features, out_features, params, &mut rng)
    }

    /// Build with Xavier-initialized weights from the provided RNG.
    pub fn new_with_rng<R: Rng + ?Sized>(
        in_features: usize,
        out_features: usize,
        params: MagFaceParams,
        rng: &mut R,
    ) -> Result<Self> {
        if in_features == 0 || out_features == 0 {
            return Err(Error::InvalidConfig(format!(
                "header dims must be > 0, got in_features={in_features} out_features={out_features}"
            )));
        }
        params.validate()?;

        Ok(Self {
            in_features,
            out_features,
            params,
            weights: xavier_uniform(in_features, out_features, rng),
        })
    }

    /// Build from an existing weight matrix, validating shape and finiteness.
    ///
    /// The rows do not need to be unit-length; `forward` renormalizes them.
    pub fn from_parts(
        in_features: usize,
        out_features: usize,
        params: MagFaceParams,
        weights: Vec<f32>,
    ) -> Result<Self> {
        if in_features == 0 || out_features == 0 {
            return Err(Error::InvalidConfig(format!(
                "header dims must be > 0, got in_features={in_features} out_features={out_features}"
            )));
        }
        params.validate()?;
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
            params,
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
    pub fn params(&self) -> MagFaceParams {
        self.params
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

    /// Maps a clamped feature magnitude `a` in `[l_a, u_a]` to its margin by
    /// linear interpolation between `l_m` and `u_m`. Monotone non-decreasing
    /// in `a`.
    #[inline]
    pub fn compute_m(&self, a: f32) -> f32 {
        let p = &self.params;
        (p.u_m - p.l_m) / (p.u_a - p.l_a) * (a - p.l_a) + p.l_m
    }

    /// Magnitude regularizer: mean of `a / u_a² + 1 / a` over the batch.
    ///
    /// `magnitudes` must already be clamped to `[l_a, u_a]` (as `forward`
    /// does with the per-row feature norms), which keeps the reciprocal term
    /// well-defined. The function is convex in `a` with its minimum at
    /// `a = u_a`, so minimizing it pushes magnitudes toward the upper bound.
    ///
    /// Panics if `magnitudes` is empty.
    pub fn compute_g(&self, magnitudes: &[f32]) -> f32 {
        assert!(!magnitudes.is_empty(), "magnitudes must not be empty");

        let inv_u_sq = 1.0 / (self.params.u_a * self.params.u_a);
        let mut sum = 0.0_f32;
        for &a in magnitudes {
            sum += a * inv_u_sq + 1.0 / a;
        }
        sum / magnitudes.len() as f32
    }

    /// Forward pass into a caller-provided buffer (hot path; allocation-free
    /// once `scratch` has seen the batch size).
    ///
    /// The batch regularizer `lambda_g * g` is added to every output entry,
    /// not returned separately; callers that want the term as a standalone
    /// loss component can recompute it with [`compute_g`](Self::compute_g).
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

        let p = self.params;
        let inv_u_sq = 1.0 / (p.u_a * p.u_a);
        let mut g_sum = 0.0_f32;

        for (row, &label) in labels.iter().enumerate() {
            assert!(
                label < self.out_features,
                "label {label} out of range for {} classes",
                self.out_features
            );

            let a = scratch.norms[row].clamp(p.l_a, p.u_a);
            let m = self.compute_m(a);
            g_sum += a * inv_u_sq + 1.0 / a;

            let idx = row * self.out_features + label;
            let theta = clamped_acos(out[idx]);
            out[idx] = (theta + m).cos();
        }

        let shift = p.lambda_g * (g_sum / n as f32);
        for v in out.iter_mut() {
            *v = v.mul_add(p.s, shift);
        }
    }

    /// Shape- and label-checked forward pass over a [`Batch`].
    ///
    /// Returns a flat `(batch.len(), out_features)` logits buffer. See
    /// [`forward_into`](Self::forward_into) for the regularizer semantics.
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
