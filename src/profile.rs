//! Pipeline orchestration
//!
//! [`FeatureProfiler::run`] sequences the full interpretability pipeline:
//! symbol preparation, cohort gradient computation, normalization, ranking,
//! the four visualizations, and the two table exports. Ranking happens
//! exactly once; every visualization and export consumes a truncated view
//! of the same canonical [`RankedDataset`], so all outputs of a run share
//! one feature ordering. With no output directory the run touches no
//! files and only returns in-memory artifacts.

use crate::cluster::{self, ClusterAnalysis};
use crate::error::{ProfilerError, Result};
use crate::export;
use crate::gradient::{cohort_gradients, RiskModel};
use crate::plot::{self, Figure};
use crate::ranking::{FeatureRanker, RankedDataset, ZeroNormPolicy};
use crate::symbols::{split_symbols, wrap_symbols, LABEL_WRAP_WIDTH};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use tracing::info;

const FILE_RANKED_BOX: &str = "RankedBox.pdf";
const FILE_SCATTER_GRADIENT: &str = "PairedScatter.Gradient.pdf";
const FILE_SCATTER_FEATURE: &str = "PairedScatter.Feature.pdf";
const FILE_HEATMAP: &str = "Heatmap.pdf";
const FILE_RNK: &str = "Gradients.rnk";
const FILE_GCT: &str = "Gradients.gct";

/// Configuration for one profiling run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileConfig {
    /// Top-ranked features in the box plot
    pub box_count: usize,
    /// Top-ranked features in each paired scatter plot
    pub scatter_count: usize,
    /// Top-ranked features given Kaplan-Meier plots
    pub km_count: usize,
    /// Top-ranked features in the cluster analysis
    pub cluster_count: usize,
    /// Significance threshold for cluster associations, in (0, 1)
    pub significance: f64,
    /// Number of sample clusters
    pub cluster_groups: usize,
    /// Seed for the clustering RNG
    pub random_state: u64,
    /// Policy for zero-norm gradient rows
    pub zero_norm: ZeroNormPolicy,
    /// Destination directory for figures and tables; nothing is written
    /// when absent
    pub output_dir: Option<PathBuf>,
}

impl Default for ProfileConfig {
    fn default() -> Self {
        Self {
            box_count: 10,
            scatter_count: 10,
            km_count: 10,
            cluster_count: 100,
            significance: 0.05,
            cluster_groups: 2,
            random_state: 42,
            zero_norm: ZeroNormPolicy::Reject,
            output_dir: None,
        }
    }
}

impl ProfileConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_box_count(mut self, count: usize) -> Self {
        self.box_count = count;
        self
    }

    pub fn with_scatter_count(mut self, count: usize) -> Self {
        self.scatter_count = count;
        self
    }

    pub fn with_km_count(mut self, count: usize) -> Self {
        self.km_count = count;
        self
    }

    pub fn with_cluster_count(mut self, count: usize) -> Self {
        self.cluster_count = count;
        self
    }

    pub fn with_counts(mut self, count: usize) -> Self {
        self.box_count = count;
        self.scatter_count = count;
        self.km_count = count;
        self.cluster_count = count;
        self
    }

    pub fn with_significance(mut self, tau: f64) -> Self {
        self.significance = tau;
        self
    }

    pub fn with_cluster_groups(mut self, groups: usize) -> Self {
        self.cluster_groups = groups;
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }

    pub fn with_zero_norm(mut self, policy: ZeroNormPolicy) -> Self {
        self.zero_norm = policy;
        self
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }

    fn validate(&self, n_features: usize) -> Result<()> {
        for (name, count) in [
            ("box_count", self.box_count),
            ("scatter_count", self.scatter_count),
            ("km_count", self.km_count),
            ("cluster_count", self.cluster_count),
        ] {
            if count > n_features {
                return Err(ProfilerError::ConfigError(format!(
                    "{} ({}) exceeds feature count ({})",
                    name, count, n_features
                )));
            }
        }
        if !(self.significance > 0.0 && self.significance < 1.0) {
            return Err(ProfilerError::ConfigError(format!(
                "significance threshold must lie in (0, 1), got {}",
                self.significance
            )));
        }
        if self.cluster_groups < 2 {
            return Err(ProfilerError::ConfigError(format!(
                "cluster_groups must be at least 2, got {}",
                self.cluster_groups
            )));
        }
        Ok(())
    }
}

/// Input cohort: feature matrices, labels, and survival follow-up
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CohortData {
    /// Normalized feature values used in training, samples × features
    pub normalized: Array2<f64>,
    /// Raw, unnormalized feature values, samples × features
    pub raw: Array2<f64>,
    /// One label string per feature column
    pub symbols: Vec<String>,
    /// Death or last follow-up time per sample
    pub survival_times: Array1<f64>,
    /// Vital status at last follow-up: 1 = censored (alive), 0 = event
    pub censoring: Array1<f64>,
}

impl CohortData {
    pub fn feature_count(&self) -> usize {
        self.normalized.ncols()
    }

    pub fn sample_count(&self) -> usize {
        self.normalized.nrows()
    }

    fn validate(&self) -> Result<()> {
        let (n_samples, n_features) = self.normalized.dim();
        if n_samples == 0 || n_features == 0 {
            return Err(ProfilerError::DataError(
                "cohort must contain at least one sample and one feature".to_string(),
            ));
        }
        if self.raw.dim() != self.normalized.dim() {
            return Err(ProfilerError::DataError(format!(
                "raw matrix shape {:?} does not match normalized matrix shape {:?}",
                self.raw.dim(),
                self.normalized.dim()
            )));
        }
        if self.symbols.len() != n_features {
            return Err(ProfilerError::DataError(format!(
                "{} labels supplied for {} feature columns",
                self.symbols.len(),
                n_features
            )));
        }
        if self.survival_times.len() != n_samples || self.censoring.len() != n_samples {
            return Err(ProfilerError::DataError(format!(
                "survival arrays (lengths {}, {}) must match sample count ({})",
                self.survival_times.len(),
                self.censoring.len(),
                n_samples
            )));
        }
        for (i, &flag) in self.censoring.iter().enumerate() {
            if flag != 0.0 && flag != 1.0 {
                return Err(ProfilerError::DataError(format!(
                    "censoring flag for sample {} must be 0 or 1, got {}",
                    i, flag
                )));
            }
        }
        Ok(())
    }
}

/// The five figures produced by one run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileFigures {
    pub ranked_box: Figure,
    pub scatter_gradients: Figure,
    pub scatter_features: Figure,
    pub heatmap: Figure,
    /// One figure per Kaplan-Meier feature, in ranked order
    pub kaplan_meier: Vec<Figure>,
}

/// All artifacts of one profiling run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileResult {
    /// The canonical ranked dataset every artifact was derived from
    pub ranked: RankedDataset,
    pub figures: ProfileFigures,
    pub cluster: ClusterAnalysis,
    /// Rendered `.rnk` table
    pub rnk_table: String,
    /// Rendered `.gct` table
    pub gct_table: String,
    /// Paths written during persistence; empty without an output directory
    pub written: Vec<PathBuf>,
}

/// Sequences the interpretability pipeline for one cohort
#[derive(Debug, Clone, Default)]
pub struct FeatureProfiler {
    config: ProfileConfig,
}

impl FeatureProfiler {
    pub fn new(config: ProfileConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ProfileConfig {
        &self.config
    }

    /// Run the full pipeline for `model` over `data`.
    ///
    /// The first error aborts the remainder of the run; nothing is retried
    /// and no partial results are returned.
    pub fn run<M: RiskModel + ?Sized>(&self, model: &M, data: &CohortData) -> Result<ProfileResult> {
        data.validate()?;
        self.config.validate(data.feature_count())?;

        info!("preparing feature symbols");
        let (display, types) = split_symbols(&data.symbols);

        info!("computing risk gradient profiles");
        let gradients = cohort_gradients(model, &data.normalized)?;

        info!("normalizing gradient profiles");
        let ranker = FeatureRanker::new(self.config.zero_norm);
        let normalized = ranker.normalize(&gradients)?;

        info!("ranking features by mean gradient magnitude");
        let scores = FeatureRanker::score(&normalized);
        let ordering = FeatureRanker::rank(&scores);
        let ranked = FeatureRanker::apply_ordering(
            &ordering,
            &data.symbols,
            &display,
            &types,
            &scores,
            &data.raw,
            &normalized,
        )?;

        info!("rendering ranked gradient boxplot");
        let box_slice = ranked.top(self.config.box_count)?;
        let box_labels = wrap_symbols(box_slice.labels, LABEL_WRAP_WIDTH);
        let ranked_box = plot::ranked_box(
            box_slice.gradients,
            &box_labels,
            box_slice.types,
            "Model Features",
            "Risk Gradient",
        )?;

        info!("rendering paired scatter plots");
        let scatter_slice = ranked.top(self.config.scatter_count)?;
        let scatter_labels = wrap_symbols(scatter_slice.labels, LABEL_WRAP_WIDTH);
        let scatter_gradients = plot::pair_scatter(
            scatter_slice.gradients,
            &scatter_labels,
            scatter_slice.types,
            "PairedScatter.Gradient",
        )?;
        let scatter_features = plot::pair_scatter(
            scatter_slice.raw,
            &scatter_labels,
            scatter_slice.types,
            "PairedScatter.Feature",
        )?;

        info!("clustering risk gradient profiles");
        let cluster_slice = ranked.top(self.config.cluster_count)?;
        let cluster_analysis = cluster::analyze(
            cluster_slice.gradients,
            cluster_slice.raw,
            self.config.cluster_groups,
            self.config.significance,
            self.config.random_state,
        )?;
        let cluster_labels = wrap_symbols(cluster_slice.labels, LABEL_WRAP_WIDTH);
        let heatmap = plot::heatmap(cluster_slice.gradients, &cluster_labels, &cluster_analysis)?;

        info!("rendering Kaplan-Meier plots");
        let km_slice = ranked.top(self.config.km_count)?;
        let km_labels = wrap_symbols(km_slice.labels, LABEL_WRAP_WIDTH);
        let kaplan_meier = plot::km_plots(
            km_slice.raw,
            &km_labels,
            data.survival_times.view(),
            data.censoring.view(),
        )?;

        info!("rendering export tables");
        let rnk_table = export::render_rnk(&ranked.display_labels, ranked.scores.view());
        let gct_table = export::render_gct(&ranked.display_labels, ranked.gradients.view());

        let figures = ProfileFigures {
            ranked_box,
            scatter_gradients,
            scatter_features,
            heatmap,
            kaplan_meier,
        };

        let written = match &self.config.output_dir {
            Some(dir) => {
                info!("saving figures and tables");
                self.persist(dir.clone(), &ranked, &figures)?
            }
            None => Vec::new(),
        };

        Ok(ProfileResult {
            ranked,
            figures,
            cluster: cluster_analysis,
            rnk_table,
            gct_table,
            written,
        })
    }

    /// Write every figure and table under their fixed names. Kaplan-Meier
    /// figures are named from the original label string at the same rank,
    /// trimmed of surrounding whitespace.
    fn persist(
        &self,
        dir: PathBuf,
        ranked: &RankedDataset,
        figures: &ProfileFigures,
    ) -> Result<Vec<PathBuf>> {
        fs::create_dir_all(&dir)?;
        let mut written = Vec::new();

        for (figure, name) in [
            (&figures.ranked_box, FILE_RANKED_BOX),
            (&figures.scatter_gradients, FILE_SCATTER_GRADIENT),
            (&figures.scatter_features, FILE_SCATTER_FEATURE),
            (&figures.heatmap, FILE_HEATMAP),
        ] {
            let path = dir.join(name);
            figure.save(&path)?;
            written.push(path);
        }

        for (rank, figure) in figures.kaplan_meier.iter().enumerate() {
            let original = ranked.original_labels[rank].trim();
            let path = dir.join(format!("KM.{}.pdf", original));
            figure.save(&path)?;
            written.push(path);
        }

        let rnk_path = dir.join(FILE_RNK);
        export::write_rnk(&rnk_path, &ranked.display_labels, ranked.scores.view())?;
        written.push(rnk_path);

        let gct_path = dir.join(FILE_GCT);
        export::write_gct(&gct_path, &ranked.display_labels, ranked.gradients.view())?;
        written.push(gct_path);

        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn cohort() -> CohortData {
        CohortData {
            normalized: array![[0.1, 0.2], [0.3, 0.4], [0.5, 0.6]],
            raw: array![[1.0, 2.0], [3.0, 4.0], [5.0, 6.0]],
            symbols: vec!["a_Mut".to_string(), "b_CNV".to_string()],
            survival_times: array![5.0, 3.0, 8.0],
            censoring: array![0.0, 1.0, 0.0],
        }
    }

    #[test]
    fn test_config_defaults() {
        let config = ProfileConfig::default();
        assert_eq!(config.box_count, 10);
        assert_eq!(config.cluster_count, 100);
        assert_eq!(config.significance, 0.05);
        assert!(config.output_dir.is_none());
    }

    #[test]
    fn test_config_builder() {
        let config = ProfileConfig::new()
            .with_counts(5)
            .with_significance(0.01)
            .with_output_dir("/tmp/out");
        assert_eq!(config.box_count, 5);
        assert_eq!(config.km_count, 5);
        assert_eq!(config.significance, 0.01);
        assert!(config.output_dir.is_some());
    }

    #[test]
    fn test_config_rejects_count_above_feature_total() {
        let config = ProfileConfig::new().with_counts(2).with_box_count(3);
        let err = config.validate(2).unwrap_err();
        assert!(matches!(err, ProfilerError::ConfigError(_)));
        assert!(err.to_string().contains("box_count"));
    }

    #[test]
    fn test_config_count_at_feature_total_is_valid() {
        let config = ProfileConfig::new().with_counts(2);
        assert!(config.validate(2).is_ok());
    }

    #[test]
    fn test_config_rejects_significance_bounds() {
        for tau in [0.0, 1.0, -0.1, 1.5] {
            let config = ProfileConfig::new().with_counts(1).with_significance(tau);
            assert!(config.validate(1).is_err(), "tau = {} accepted", tau);
        }
    }

    #[test]
    fn test_cohort_rejects_shape_mismatch() {
        let mut data = cohort();
        data.raw = array![[1.0], [2.0], [3.0]];
        let err = data.validate().unwrap_err();
        assert!(matches!(err, ProfilerError::DataError(_)));
    }

    #[test]
    fn test_cohort_rejects_label_count_mismatch() {
        let mut data = cohort();
        data.symbols.push("extra".to_string());
        assert!(data.validate().is_err());
    }

    #[test]
    fn test_cohort_rejects_bad_censoring_flag() {
        let mut data = cohort();
        data.censoring = array![0.0, 2.0, 0.0];
        let err = data.validate().unwrap_err();
        assert!(err.to_string().contains("censoring"));
    }

    #[test]
    fn test_cohort_rejects_empty() {
        let data = CohortData {
            normalized: Array2::zeros((0, 0)),
            raw: Array2::zeros((0, 0)),
            symbols: vec![],
            survival_times: Array1::zeros(0),
            censoring: Array1::zeros(0),
        };
        assert!(data.validate().is_err());
    }
}
