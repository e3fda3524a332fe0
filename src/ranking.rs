//! Feature ranking by gradient magnitude
//!
//! Turns a raw per-sample gradient matrix into a canonical, ranked view of
//! the cohort: sample rows are scaled to unit Euclidean norm, each feature
//! is scored by its mean normalized gradient, and features are reordered by
//! descending score magnitude. The reordering is applied exactly once per
//! run; every downstream consumer takes a truncated view of the single
//! [`RankedDataset`] so all outputs share one ordering.

use crate::error::{ProfilerError, Result};
use ndarray::{s, Array1, Array2, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

/// Policy for sample gradient rows whose Euclidean norm is zero.
///
/// A zero row carries no direction to normalize, so the division is
/// undefined. `Reject` surfaces the row as an error; `SubstituteZero`
/// keeps the row as all zeros, excluding it from every feature's score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ZeroNormPolicy {
    Reject,
    SubstituteZero,
}

impl Default for ZeroNormPolicy {
    fn default() -> Self {
        ZeroNormPolicy::Reject
    }
}

/// Ranks features by the magnitude of their mean normalized gradient
#[derive(Debug, Clone, Default)]
pub struct FeatureRanker {
    zero_norm: ZeroNormPolicy,
}

impl FeatureRanker {
    pub fn new(zero_norm: ZeroNormPolicy) -> Self {
        Self { zero_norm }
    }

    /// Scale each sample row of `gradients` to unit L2 norm.
    ///
    /// Zero-norm rows follow the configured [`ZeroNormPolicy`].
    pub fn normalize(&self, gradients: &Array2<f64>) -> Result<Array2<f64>> {
        let mut normalized = gradients.clone();
        for (row_idx, mut row) in normalized.axis_iter_mut(Axis(0)).enumerate() {
            let norm = row.dot(&row).sqrt();
            if norm == 0.0 {
                match self.zero_norm {
                    ZeroNormPolicy::Reject => {
                        return Err(ProfilerError::DegenerateGradient { row: row_idx })
                    }
                    ZeroNormPolicy::SubstituteZero => continue,
                }
            }
            row.mapv_inplace(|v| v / norm);
        }
        Ok(normalized)
    }

    /// Mean normalized gradient per feature column. Sign is preserved;
    /// ranking uses magnitude only.
    pub fn score(normalized: &Array2<f64>) -> Array1<f64> {
        normalized
            .mean_axis(Axis(0))
            .unwrap_or_else(|| Array1::zeros(normalized.ncols()))
    }

    /// Stable argsort of features by descending score magnitude.
    ///
    /// Ties keep their original index order, so repeated calls over the
    /// same scores always produce the same permutation.
    pub fn rank(scores: &Array1<f64>) -> Vec<usize> {
        let mut ordering: Vec<usize> = (0..scores.len()).collect();
        ordering.sort_by(|&a, &b| {
            scores[b]
                .abs()
                .partial_cmp(&scores[a].abs())
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        ordering
    }

    /// Reindex labels, scores, and matrix columns by `ordering`.
    ///
    /// All outputs use the identical permutation; the orchestrator calls
    /// this once per run and distributes slices from the result.
    #[allow(clippy::too_many_arguments)]
    pub fn apply_ordering(
        ordering: &[usize],
        original_labels: &[String],
        display_labels: &[String],
        type_tags: &[String],
        scores: &Array1<f64>,
        raw: &Array2<f64>,
        gradients: &Array2<f64>,
    ) -> Result<RankedDataset> {
        let n_features = gradients.ncols();
        if ordering.len() != n_features
            || original_labels.len() != n_features
            || display_labels.len() != n_features
            || type_tags.len() != n_features
            || scores.len() != n_features
            || raw.ncols() != n_features
        {
            return Err(ProfilerError::DataError(format!(
                "ordering, labels, scores, and matrix columns must all have length {}",
                n_features
            )));
        }

        let mut seen = vec![false; n_features];
        for &idx in ordering {
            if idx >= n_features || seen[idx] {
                return Err(ProfilerError::DataError(
                    "ordering is not a permutation of feature indices".to_string(),
                ));
            }
            seen[idx] = true;
        }

        Ok(RankedDataset {
            original_labels: ordering.iter().map(|&i| original_labels[i].clone()).collect(),
            display_labels: ordering.iter().map(|&i| display_labels[i].clone()).collect(),
            type_tags: ordering.iter().map(|&i| type_tags[i].clone()).collect(),
            scores: ordering.iter().map(|&i| scores[i]).collect(),
            raw: raw.select(Axis(1), ordering),
            gradients: gradients.select(Axis(1), ordering),
            ordering: ordering.to_vec(),
        })
    }
}

/// Canonical reordered dataset produced once per run.
///
/// Columns of `raw` and `gradients`, the label lists, and `scores` are all
/// permuted by the same `ordering`; position `k` everywhere refers to the
/// feature of rank `k`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedDataset {
    /// Permutation of original feature-column indices, best first
    pub ordering: Vec<usize>,
    /// Raw input label strings in ranked order (stable, used for file names)
    pub original_labels: Vec<String>,
    /// Split and trimmed display names in ranked order
    pub display_labels: Vec<String>,
    /// Type tags in ranked order
    pub type_tags: Vec<String>,
    /// Mean normalized gradient per feature, ranked order, sign preserved
    pub scores: Array1<f64>,
    /// Raw feature matrix with columns in ranked order
    pub raw: Array2<f64>,
    /// Normalized gradient matrix with columns in ranked order
    pub gradients: Array2<f64>,
}

/// Borrowed view of the first `n` ranked features
#[derive(Debug, Clone, Copy)]
pub struct RankedSlice<'a> {
    pub labels: &'a [String],
    pub types: &'a [String],
    pub raw: ArrayView2<'a, f64>,
    pub gradients: ArrayView2<'a, f64>,
}

impl RankedDataset {
    pub fn feature_count(&self) -> usize {
        self.ordering.len()
    }

    pub fn sample_count(&self) -> usize {
        self.gradients.nrows()
    }

    /// View of the top `n` ranked features. `n` may not exceed the feature
    /// count; truncation never silently clips.
    pub fn top(&self, n: usize) -> Result<RankedSlice<'_>> {
        if n > self.feature_count() {
            return Err(ProfilerError::ConfigError(format!(
                "requested top {} features but only {} are available",
                n,
                self.feature_count()
            )));
        }
        Ok(RankedSlice {
            labels: &self.display_labels[..n],
            types: &self.type_tags[..n],
            raw: self.raw.slice(s![.., ..n]),
            gradients: self.gradients.slice(s![.., ..n]),
        })
    }
}
