//! Header selection at configuration time.
//!
//! A training configuration names exactly one header. `HeaderConfig` carries
//! the per-variant hyperparameters, validates them, and builds the matching
//! [`Header`], which dispatches the uniform
//! `forward(features, labels) -> logits` contract to one of the three
//! implementations. There is no layering between the variants: each is a
//! standalone struct behind the shared enum.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::arcface;
use crate::norm::Scratch;
use crate::{ArcFaceHeader, Batch, LinearHeader, MagFaceHeader, MagFaceParams, Result};

/// Which header to train with, plus its hyperparameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HeaderConfig {
    /// Plain linear projection, no normalization or margin.
    Linear,
    /// Additive angular margin (ArcFace).
    ArcFace { s: f32, m: f32 },
    /// Magnitude-aware angular margin (MagFace).
    MagFace(MagFaceParams),
}

impl HeaderConfig {
    /// ArcFace with the default scale and margin.
    pub fn arcface() -> Self {
        HeaderConfig::ArcFace {
            s: arcface::DEFAULT_SCALE,
            m: arcface::DEFAULT_MARGIN,
        }
    }

    /// MagFace with the default magnitude and margin bounds.
    pub fn magface() -> Self {
        HeaderConfig::MagFace(MagFaceParams::default())
    }

    /// Validate hyperparameters without building a header.
    pub fn validate(&self) -> Result<()> {
        match *self {
            HeaderConfig::Linear => Ok(()),
            HeaderConfig::ArcFace { s, m } => arcface::validate_hyperparams(s, m),
            HeaderConfig::MagFace(params) => params.validate(),
        }
    }

    /// Build a header with Xavier-initialized weights from a deterministic
    /// seed.
    pub fn build_with_seed(
        &self,
        in_features: usize,
        out_features: usize,
        seed: u64,
    ) -> Result<Header> {
        let mut rng = StdRng::seed_from_u64(seed);
        self.build_with_rng(in_features, out_features, &mut rng)
    }

    /// Build a header with Xavier-initialized weights from the provided RNG.
    pub fn build_with_rng<R: Rng + ?Sized>(
        &self,
        in_features: usize,
        out_features: usize,
        rng: &mut R,
    ) -> Result<Header> {
        match *self {
            HeaderConfig::Linear => Ok(Header::Linear(LinearHeader::new_with_rng(
                in_features,
                out_features,
                rng,
            )?)),
            HeaderConfig::ArcFace { s, m } => Ok(Header::ArcFace(ArcFaceHeader::new_with_rng(
                in_features,
                out_features,
                s,
                m,
                rng,
            )?)),
            HeaderConfig::MagFace(params) => Ok(Header::MagFace(MagFaceHeader::new_with_rng(
                in_features,
                out_features,
                params,
                rng,
            )?)),
        }
    }
}

/// A built classification header.
///
/// `forward` takes `&mut self` uniformly because the margin variants
/// renormalize their weights in place; the linear variant does not mutate.
#[derive(Debug, Clone)]
pub enum Header {
    Linear(LinearHeader),
    ArcFace(ArcFaceHeader),
    MagFace(MagFaceHeader),
}

impl Header {
    #[inline]
    pub fn in_features(&self) -> usize {
        match self {
            Header::Linear(h) => h.in_features(),
            Header::ArcFace(h) => h.in_features(),
            Header::MagFace(h) => h.in_features(),
        }
    }

    #[inline]
    pub fn out_features(&self) -> usize {
        match self {
            Header::Linear(h) => h.out_features(),
            Header::ArcFace(h) => h.out_features(),
            Header::MagFace(h) => h.out_features(),
        }
    }

    /// Shape- and label-checked forward pass over a [`Batch`].
    ///
    /// Returns a flat `(batch.len(), out_features)` logits buffer.
    pub fn forward(&mut self, batch: &Batch) -> Result<Vec<f32>> {
        match self {
            Header::Linear(h) => h.forward(batch),
            Header::ArcFace(h) => h.forward(batch),
            Header::MagFace(h) => h.forward(batch),
        }
    }

    /// Forward pass into a caller-provided buffer (hot path).
    ///
    /// `scratch` is unused by the linear variant but kept in the signature so
    /// callers can drive any header through one code path.
    pub fn forward_into(
        &mut self,
        features: &[f32],
        labels: &[usize],
        scratch: &mut Scratch,
        out: &mut [f32],
    ) {
        match self {
            Header::Linear(h) => h.forward_into(features, labels, out),
            Header::ArcFace(h) => h.forward_into(features, labels, scratch, out),
            Header::MagFace(h) => h.forward_into(features, labels, scratch, out),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_configs_validate() {
        assert!(HeaderConfig::Linear.validate().is_ok());
        assert!(HeaderConfig::arcface().validate().is_ok());
        assert!(HeaderConfig::magface().validate().is_ok());
    }

    #[test]
    fn invalid_hyperparameters_are_rejected_before_building() {
        let bad = HeaderConfig::ArcFace { s: -1.0, m: 0.5 };
        assert!(bad.validate().is_err());
        assert!(bad.build_with_seed(4, 3, 0).is_err());

        let bad = HeaderConfig::MagFace(MagFaceParams {
            l_a: 0.0,
            ..MagFaceParams::default()
        });
        assert!(bad.validate().is_err());
    }

    #[test]
    fn build_reports_dimensions() {
        let header = HeaderConfig::arcface().build_with_seed(16, 10, 0).unwrap();
        assert_eq!(header.in_features(), 16);
        assert_eq!(header.out_features(), 10);
    }

    #[test]
    fn enum_dispatch_matches_the_underlying_header() {
        let batch = Batch::from_rows(
            &[vec![0.3, -0.7, 0.2, 0.9], vec![0.1, 0.4, -0.5, 0.8]],
            &[2, 0],
        )
        .unwrap();

        let mut via_enum = HeaderConfig::ArcFace { s: 32.0, m: 0.3 }
            .build_with_seed(4, 3, 9)
            .unwrap();
        let mut direct = ArcFaceHeader::new_with_seed(4, 3, 32.0, 0.3, 9).unwrap();

        assert_eq!(
            via_enum.forward(&batch).unwrap(),
            direct.forward(&batch).unwrap()
        );
    }
}
