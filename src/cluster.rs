//! Risk cluster analysis
//!
//! Groups samples by their normalized gradient profiles with k-means
//! (k-means++ initialization, seeded RNG) and tests each feature's raw
//! values for association with the cluster assignment. Association uses a
//! Welch t statistic over the two largest clusters with a Student-t
//! two-sided p-value; features with `p < tau` are flagged significant.

use crate::error::{ProfilerError, Result};
use ndarray::{Array2, ArrayView1, ArrayView2, Axis};
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, StudentsT};

const MAX_ITER: usize = 300;
const SHIFT_TOL: f64 = 1e-4;

/// Association between one feature's raw values and the cluster assignment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureAssociation {
    /// Rank position of the feature within the clustered slice
    pub feature: usize,
    pub t_stat: f64,
    pub p_value: f64,
    pub significant: bool,
}

/// Result of clustering sample gradient profiles
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterAnalysis {
    /// Cluster index per sample
    pub assignments: Vec<usize>,
    /// Number of clusters requested
    pub group_count: usize,
    /// Per-feature association with the assignment, in ranked-slice order
    pub associations: Vec<FeatureAssociation>,
}

/// Cluster samples by gradient profile and score feature associations.
///
/// `gradients` drives the clustering; `raw` supplies the values tested for
/// association. Both are ranked slices with identical column ordering.
pub fn analyze(
    gradients: ArrayView2<'_, f64>,
    raw: ArrayView2<'_, f64>,
    groups: usize,
    tau: f64,
    seed: u64,
) -> Result<ClusterAnalysis> {
    let n_samples = gradients.nrows();
    if groups < 2 {
        return Err(ProfilerError::ConfigError(format!(
            "cluster analysis needs at least 2 groups, got {}",
            groups
        )));
    }
    if n_samples < groups {
        return Err(ProfilerError::ConfigError(format!(
            "n_samples ({}) < cluster groups ({})",
            n_samples, groups
        )));
    }
    if raw.nrows() != n_samples || raw.ncols() != gradients.ncols() {
        return Err(ProfilerError::DataError(format!(
            "raw slice shape {:?} does not match gradient slice shape {:?}",
            raw.dim(),
            gradients.dim()
        )));
    }

    let assignments = kmeans(gradients, groups, seed);
    let associations = feature_associations(raw, &assignments, groups, tau)?;

    Ok(ClusterAnalysis {
        assignments,
        group_count: groups,
        associations,
    })
}

fn kmeans(x: ArrayView2<'_, f64>, k: usize, seed: u64) -> Vec<usize> {
    let n_samples = x.nrows();
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut centroids = kmeans_pp_init(x, k, &mut rng);
    let mut assignments = vec![0usize; n_samples];

    for _iter in 0..MAX_ITER {
        let new_assignments: Vec<usize> = (0..n_samples)
            .into_par_iter()
            .map(|i| {
                let row = x.row(i);
                let mut best = 0;
                let mut best_dist = f64::MAX;
                for c in 0..k {
                    let d = euclidean_sq(&row, &centroids.row(c));
                    if d < best_dist {
                        best_dist = d;
                        best = c;
                    }
                }
                best
            })
            .collect();

        let changed = new_assignments
            .iter()
            .zip(assignments.iter())
            .filter(|(a, b)| a != b)
            .count();
        assignments = new_assignments;

        let mut new_centroids = Array2::zeros(centroids.dim());
        let mut counts = vec![0usize; k];
        for i in 0..n_samples {
            let c = assignments[i];
            counts[c] += 1;
            for j in 0..x.ncols() {
                new_centroids[[c, j]] += x[[i, j]];
            }
        }
        for c in 0..k {
            if counts[c] > 0 {
                for j in 0..x.ncols() {
                    new_centroids[[c, j]] /= counts[c] as f64;
                }
            } else {
                // Empty cluster, reseed from a random sample
                let idx = (rng.next_u64() as usize) % n_samples;
                new_centroids.row_mut(c).assign(&x.row(idx));
            }
        }

        let shift: f64 = centroids
            .iter()
            .zip(new_centroids.iter())
            .map(|(a, b)| (a - b).powi(2))
            .sum::<f64>()
            .sqrt();
        centroids = new_centroids;

        if changed == 0 || shift < SHIFT_TOL {
            break;
        }
    }

    assignments
}

/// K-means++ initialization: pick centroids spread apart
fn kmeans_pp_init(x: ArrayView2<'_, f64>, k: usize, rng: &mut ChaCha8Rng) -> Array2<f64> {
    let n_samples = x.nrows();
    let n_features = x.ncols();
    let mut centroids = Array2::zeros((k, n_features));

    let first = (rng.next_u64() as usize) % n_samples;
    centroids.row_mut(0).assign(&x.row(first));

    for c in 1..k {
        let dists: Vec<f64> = (0..n_samples)
            .map(|i| {
                let row = x.row(i);
                (0..c)
                    .map(|j| euclidean_sq(&row, &centroids.row(j)))
                    .fold(f64::MAX, f64::min)
            })
            .collect();

        let total: f64 = dists.iter().sum();
        if total <= 0.0 {
            let idx = (rng.next_u64() as usize) % n_samples;
            centroids.row_mut(c).assign(&x.row(idx));
            continue;
        }

        let r = (rng.next_u64() as f64 / u64::MAX as f64) * total;
        let mut cumulative = 0.0;
        let mut chosen = 0;
        for (i, &d) in dists.iter().enumerate() {
            cumulative += d;
            if cumulative >= r {
                chosen = i;
                break;
            }
        }
        centroids.row_mut(c).assign(&x.row(chosen));
    }

    centroids
}

fn euclidean_sq(a: &ArrayView1<'_, f64>, b: &ArrayView1<'_, f64>) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y).powi(2)).sum()
}

/// Welch t-test of each raw feature against the two largest clusters
fn feature_associations(
    raw: ArrayView2<'_, f64>,
    assignments: &[usize],
    groups: usize,
    tau: f64,
) -> Result<Vec<FeatureAssociation>> {
    let mut counts = vec![0usize; groups];
    for &a in assignments {
        counts[a] += 1;
    }
    let (first, second) = two_largest(&counts);

    let mut associations = Vec::with_capacity(raw.ncols());
    for (feature, column) in raw.axis_iter(Axis(1)).enumerate() {
        let group_a: Vec<f64> = column
            .iter()
            .zip(assignments.iter())
            .filter(|(_, &a)| a == first)
            .map(|(&v, _)| v)
            .collect();
        let group_b: Vec<f64> = column
            .iter()
            .zip(assignments.iter())
            .filter(|(_, &a)| a == second)
            .map(|(&v, _)| v)
            .collect();

        let (t_stat, p_value) = welch_t_test(&group_a, &group_b)?;
        associations.push(FeatureAssociation {
            feature,
            t_stat,
            p_value,
            significant: p_value < tau,
        });
    }

    Ok(associations)
}

fn two_largest(counts: &[usize]) -> (usize, usize) {
    let mut indexed: Vec<usize> = (0..counts.len()).collect();
    indexed.sort_by(|&a, &b| counts[b].cmp(&counts[a]));
    (indexed[0], indexed[1])
}

fn welch_t_test(a: &[f64], b: &[f64]) -> Result<(f64, f64)> {
    if a.len() < 2 || b.len() < 2 {
        return Ok((0.0, 1.0));
    }

    let (mean_a, var_a) = mean_var(a);
    let (mean_b, var_b) = mean_var(b);
    let se_a = var_a / a.len() as f64;
    let se_b = var_b / b.len() as f64;
    let denom = (se_a + se_b).sqrt();

    if denom == 0.0 {
        // Both groups are constant: identical means carry no signal,
        // differing means are perfectly separated
        return Ok(if mean_a == mean_b {
            (0.0, 1.0)
        } else {
            (f64::INFINITY, 0.0)
        });
    }

    let t_stat = (mean_a - mean_b) / denom;
    // Welch-Satterthwaite degrees of freedom
    let dof = (se_a + se_b).powi(2)
        / (se_a.powi(2) / (a.len() - 1) as f64 + se_b.powi(2) / (b.len() - 1) as f64);

    let dist = StudentsT::new(0.0, 1.0, dof)
        .map_err(|e| ProfilerError::DataError(format!("t distribution: {}", e)))?;
    let p_value = 2.0 * (1.0 - dist.cdf(t_stat.abs()));

    Ok((t_stat, p_value))
}

fn mean_var(values: &[f64]) -> (f64, f64) {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
    (mean, var)
}

/// Order sample indices so cluster members are contiguous, smallest
/// cluster index first. Used by the heatmap renderer to group rows.
pub fn grouped_sample_order(assignments: &[usize]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..assignments.len()).collect();
    order.sort_by_key(|&i| assignments[i]);
    order
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_two_separated_clusters() {
        let gradients = array![
            [1.0, 1.0],
            [1.1, 0.9],
            [0.9, 1.1],
            [-1.0, -1.0],
            [-1.1, -0.9],
            [-0.9, -1.1]
        ];
        let raw = array![
            [5.0, 0.1],
            [5.1, 0.2],
            [4.9, 0.1],
            [1.0, 0.2],
            [1.1, 0.1],
            [0.9, 0.2]
        ];
        let analysis = analyze(gradients.view(), raw.view(), 2, 0.05, 42).unwrap();

        assert_eq!(analysis.assignments.len(), 6);
        let first = analysis.assignments[0];
        assert_eq!(analysis.assignments[1], first);
        assert_eq!(analysis.assignments[2], first);
        assert_ne!(analysis.assignments[3], first);
        assert_eq!(analysis.assignments[3], analysis.assignments[4]);
        assert_eq!(analysis.assignments[3], analysis.assignments[5]);
    }

    #[test]
    fn test_separating_feature_is_significant() {
        let gradients = array![
            [1.0, 1.0],
            [1.1, 0.9],
            [0.9, 1.1],
            [-1.0, -1.0],
            [-1.1, -0.9],
            [-0.9, -1.1]
        ];
        // Feature 0 separates the clusters sharply, feature 1 does not
        let raw = array![
            [5.0, 0.15],
            [5.1, 0.12],
            [4.9, 0.18],
            [1.0, 0.14],
            [1.1, 0.16],
            [0.9, 0.13]
        ];
        let analysis = analyze(gradients.view(), raw.view(), 2, 0.05, 42).unwrap();
        assert!(analysis.associations[0].significant);
        assert!(!analysis.associations[1].significant);
    }

    #[test]
    fn test_deterministic_for_fixed_seed() {
        let gradients = array![
            [1.0, 0.0],
            [0.9, 0.1],
            [0.0, 1.0],
            [0.1, 0.9],
            [0.5, 0.5],
            [0.4, 0.6]
        ];
        let raw = gradients.clone();
        let first = analyze(gradients.view(), raw.view(), 2, 0.05, 7).unwrap();
        let second = analyze(gradients.view(), raw.view(), 2, 0.05, 7).unwrap();
        assert_eq!(first.assignments, second.assignments);
    }

    #[test]
    fn test_rejects_too_few_samples() {
        let gradients = array![[1.0, 0.0], [0.0, 1.0]];
        let raw = gradients.clone();
        let err = analyze(gradients.view(), raw.view(), 3, 0.05, 42).unwrap_err();
        assert!(matches!(err, ProfilerError::ConfigError(_)));
    }

    #[test]
    fn test_welch_identical_groups_not_significant() {
        let (t, p) = welch_t_test(&[1.0, 1.0, 1.0], &[1.0, 1.0, 1.0]).unwrap();
        assert_eq!(t, 0.0);
        assert_eq!(p, 1.0);
    }

    #[test]
    fn test_grouped_sample_order() {
        let order = grouped_sample_order(&[1, 0, 1, 0]);
        assert_eq!(order, vec![1, 3, 0, 2]);
    }
}
