//! Contiguous feature/label batch helpers.
//!
//! Headers operate on slices to avoid per-step allocations. `Batch` provides
//! validated, row-major storage for a feature matrix paired with the integer
//! class label of each row.

use crate::{Error, Result};

/// A batch of embedding vectors (X) with their class labels (y).
///
/// Stored as a contiguous buffer with row-major layout:
/// - `features.len() == len * in_features`
/// - `labels.len() == len`, aligned positionally with the feature rows
///
/// Label *values* are validated against the class count by the header's
/// `forward`, since the batch does not know `out_features`.
#[derive(Debug, Clone)]
pub struct Batch {
    features: Vec<f32>,
    labels: Vec<usize>,
    len: usize,
    in_features: usize,
}

impl Batch {
    /// Build a batch from a flat feature buffer with shape `(len, in_features)`
    /// and one label per row.
    pub fn from_flat(features: Vec<f32>, labels: Vec<usize>, in_features: usize) -> Result<Self> {
        if in_features == 0 {
            return Err(Error::InvalidData("in_features must be > 0".to_owned()));
        }
        if features.len() % in_features != 0 {
            return Err(Error::InvalidData(format!(
                "features length {} is not divisible by in_features {}",
                features.len(),
                in_features
            )));
        }

        let len = features.len() / in_features;
        if len == 0 {
            return Err(Error::InvalidData("batch must not be empty".to_owned()));
        }
        if labels.len() != len {
            return Err(Error::InvalidData(format!(
                "features/labels length mismatch: {len} rows vs {} labels",
                labels.len()
            )));
        }

        Ok(Self {
            features,
            labels,
            len,
            in_features,
        })
    }

    /// Build a batch from per-sample rows.
    ///
    /// This is a convenience constructor (it copies into contiguous storage).
    pub fn from_rows(features: &[Vec<f32>], labels: &[usize]) -> Result<Self> {
        if features.is_empty() {
            return Err(Error::InvalidData("features must not be empty".to_owned()));
        }
        if features.len() != labels.len() {
            return Err(Error::InvalidData(format!(
                "features/labels length mismatch: {} vs {}",
                features.len(),
                labels.len()
            )));
        }

        let in_features = features[0].len();
        if in_features == 0 {
            return Err(Error::InvalidData("in_features must be > 0".to_owned()));
        }
        for (i, row) in features.iter().enumerate() {
            if row.len() != in_features {
                return Err(Error::InvalidData(format!(
                    "feature row {i} has len {}, expected {in_features}",
                    row.len()
                )));
            }
        }

        let len = features.len();
        let mut features_flat = Vec::with_capacity(len * in_features);
        for row in features {
            features_flat.extend_from_slice(row);
        }

        Ok(Self {
            features: features_flat,
            labels: labels.to_vec(),
            len,
            in_features,
        })
    }

    #[inline]
    /// Returns the number of samples.
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    /// Returns true if there are no samples.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    /// Returns the per-sample feature dimension.
    pub fn in_features(&self) -> usize {
        self.in_features
    }

    #[inline]
    /// Returns the flat `(len, in_features)` feature buffer.
    pub fn features(&self) -> &[f32] {
        &self.features
    }

    #[inline]
    /// Returns the per-row class labels.
    pub fn labels(&self) -> &[usize] {
        &self.labels
    }

    #[inline]
    /// Returns the `idx`-th feature row (shape: `(in_features,)`).
    ///
    /// Panics if `idx >= len`.
    pub fn feature(&self, idx: usize) -> &[f32] {
        let start = idx * self.in_features;
        &self.features[start..start + self.in_features]
    }

    #[inline]
    /// Returns the `idx`-th label.
    ///
    /// Panics if `idx >= len`.
    pub fn label(&self, idx: usize) -> usize {
        self.labels[idx]
    }
}

/// Returns the argmax column of each `num_classes`-length row of `logits`,
/// i.e. the predicted class per sample. Ties resolve to the lowest column
/// index.
///
/// Panics if `num_classes == 0` or `logits.len()` is not divisible by
/// `num_classes`.
pub fn argmax_rows(logits: &[f32], num_classes: usize) -> Vec<usize> {
    assert!(num_classes > 0, "num_classes must be > 0");
    assert_eq!(
        logits.len() % num_classes,
        0,
        "logits length {} is not divisible by num_classes {}",
        logits.len(),
        num_classes
    );

    logits
        .chunks_exact(num_classes)
        .map(|row| {
            let mut best = 0;
            for (j, &v) in row.iter().enumerate() {
                if v > row[best] {
                    best = j;
                }
            }
            best
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_flat_validates_shapes() {
        let ok = Batch::from_flat(vec![0.0, 1.0, 2.0, 3.0], vec![0, 1], 2);
        assert!(ok.is_ok());

        let err = Batch::from_flat(vec![0.0, 1.0, 2.0], vec![0], 2);
        assert!(err.is_err());

        let err = Batch::from_flat(vec![0.0, 1.0], vec![0, 1], 2);
        assert!(err.is_err());

        let err = Batch::from_flat(vec![], vec![], 2);
        assert!(err.is_err());
    }

    #[test]
    fn from_rows_rejects_ragged_rows_and_mismatched_labels() {
        let err = Batch::from_rows(&[vec![0.0, 1.0], vec![2.0]], &[0, 1]);
        assert!(err.is_err());

        let err = Batch::from_rows(&[vec![0.0, 1.0]], &[0, 1]);
        assert!(err.is_err());

        let batch = Batch::from_rows(&[vec![0.0, 1.0], vec![2.0, 3.0]], &[1, 0]).unwrap();
        assert_eq!(batch.len(), 2);
        assert_eq!(batch.in_features(), 2);
        assert_eq!(batch.feature(1), &[2.0, 3.0]);
        assert_eq!(batch.label(1), 0);
    }

    #[test]
    fn argmax_rows_picks_the_largest_column() {
        let logits = [0.1_f32, 0.9, -0.2, 3.0, 1.0, 2.0];
        assert_eq!(argmax_rows(&logits, 3), vec![1, 0]);
    }
}
