//! Classification headers for metric-learning training.
//!
//! `margin-heads` implements the final classification layer placed on top of
//! a feature-embedding network: a plain linear projection and two
//! angular-margin variants (ArcFace, MagFace) that reshape the logit
//! landscape to produce more discriminative embeddings. All three share one
//! call contract, `forward(features, labels) -> logits`, where the target
//! class's cosine similarity has an angular penalty applied before
//! re-scaling.
//!
//! The embedding backbone, data loading, training loop, optimizer, and the
//! loss consuming these logits are external collaborators; this crate is only
//! the logit transformation between them.
//!
//! # Design goals
//!
//! - Predictable performance: the hot path reuses buffers ([`Scratch`])
//!   instead of allocating.
//! - Clear contracts: shapes and labels are explicit and validated at the API
//!   boundary.
//! - Deterministic construction: seeded Xavier initialization via the
//!   builders.
//!
//! # Panics vs `Result`
//!
//! This crate intentionally exposes two layers of API:
//!
//! - Low-level hot path (panics on misuse): the per-header `forward_into`.
//!   Shape mismatches and out-of-range labels are treated as programmer error
//!   and will panic via `assert!`.
//! - High-level convenience (shape- and label-checked): [`Header::forward`]
//!   and the per-header `forward`, which validate inputs and return
//!   [`Result`].
//!
//! # Data layout and shapes
//!
//! - Scalars are `f32`.
//! - Header weights are row-major with shape `(out_features, in_features)`,
//!   one row per class.
//! - Batched features/logits are flat row-major buffers:
//!   - features: `(batch, in_features)` as `batch * in_features` scalars
//!   - logits: `(batch, out_features)` as `batch * out_features` scalars
//! - Labels are `usize` class indices aligned positionally with the feature
//!   rows.
//!
//! # Mutation inside `forward`
//!
//! The margin headers renormalize their stored weight rows to unit L2 norm at
//! the top of every forward pass, in place. This keeps the training dynamics
//! of the classic recipes (the optimizer updates denormalized weights between
//! steps; the header always projects against unit rows), but it means a
//! header instance is not thread-safe for a forward pass running concurrently
//! with an optimizer update.
//!
//! # Quick start
//!
//! ```rust
//! use margin_heads::{argmax_rows, Batch, HeaderConfig};
//!
//! # fn main() -> margin_heads::Result<()> {
//! let batch = Batch::from_rows(
//!     &[vec![0.8, 0.1, 0.0, 0.2], vec![-0.3, 0.9, 0.1, 0.0]],
//!     &[0, 1],
//! )?;
//!
//! let mut header = HeaderConfig::arcface().build_with_seed(4, 8, 0)?;
//! let logits = header.forward(&batch)?;
//!
//! assert_eq!(logits.len(), batch.len() * 8);
//! let _predicted = argmax_rows(&logits, 8);
//! # Ok(())
//! # }
//! ```

pub mod arcface;
pub mod batch;
pub mod error;
pub mod header;
pub(crate) mod init;
pub mod linear;
pub mod magface;
pub(crate) mod matmul;
pub mod norm;

pub use arcface::ArcFaceHeader;
pub use batch::{argmax_rows, Batch};
pub use error::{Error, Result};
pub use header::{Header, HeaderConfig};
pub use linear::LinearHeader;
pub use magface::{MagFaceHeader, MagFaceParams};
pub use norm::{l2_normalize_rows, Scratch, ACOS_EPS};
