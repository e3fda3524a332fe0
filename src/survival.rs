//! Kaplan-Meier survival estimation
//!
//! Product-limit estimator over (time, event) pairs, plus the median split
//! used to stratify a cohort by a single feature's raw values. Censoring
//! follows the cohort convention: flag 1 = censored (alive at last
//! follow-up), flag 0 = event observed.

use ndarray::ArrayView1;
use serde::{Deserialize, Serialize};

/// One estimated survival curve: survival probability after each event time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KaplanMeierCurve {
    /// Distinct event times, ascending
    pub times: Vec<f64>,
    /// Survival probability immediately after each event time
    pub survival: Vec<f64>,
    /// Subjects in the stratum
    pub n_subjects: usize,
}

impl KaplanMeierCurve {
    pub fn is_empty(&self) -> bool {
        self.n_subjects == 0
    }
}

/// Product-limit estimate for one stratum.
///
/// `events[i]` is true when subject `i`'s event was observed and false when
/// the subject was censored at `times[i]`.
pub fn kaplan_meier(times: &[f64], events: &[bool]) -> KaplanMeierCurve {
    let n_subjects = times.len();

    let mut order: Vec<usize> = (0..n_subjects).collect();
    order.sort_by(|&a, &b| {
        times[a]
            .partial_cmp(&times[b])
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut curve_times = Vec::new();
    let mut curve_survival = Vec::new();
    let mut survival = 1.0;
    let mut at_risk = n_subjects;

    let mut i = 0;
    while i < order.len() {
        let t = times[order[i]];
        let mut deaths = 0usize;
        let mut leaving = 0usize;
        // Consume every subject tied at time t
        while i < order.len() && times[order[i]] == t {
            if events[order[i]] {
                deaths += 1;
            }
            leaving += 1;
            i += 1;
        }
        if deaths > 0 && at_risk > 0 {
            survival *= 1.0 - deaths as f64 / at_risk as f64;
            curve_times.push(t);
            curve_survival.push(survival);
        }
        at_risk -= leaving;
    }

    KaplanMeierCurve {
        times: curve_times,
        survival: curve_survival,
        n_subjects,
    }
}

/// Median split of one feature's raw values into low/high strata.
///
/// Values at or below the median fall in `low`, the rest in `high`. A
/// constant feature leaves `high` empty.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MedianSplit {
    pub low: Vec<usize>,
    pub high: Vec<usize>,
    pub threshold: f64,
}

pub fn median_split(values: ArrayView1<'_, f64>) -> MedianSplit {
    let mut sorted: Vec<f64> = values.iter().copied().collect();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let n = sorted.len();
    let threshold = if n == 0 {
        f64::NAN
    } else if n % 2 == 1 {
        sorted[n / 2]
    } else {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    };

    let mut low = Vec::new();
    let mut high = Vec::new();
    for (i, &v) in values.iter().enumerate() {
        if v <= threshold {
            low.push(i);
        } else {
            high.push(i);
        }
    }

    MedianSplit {
        low,
        high,
        threshold,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn test_km_all_events() {
        let curve = kaplan_meier(&[1.0, 2.0, 3.0, 4.0], &[true, true, true, true]);
        assert_eq!(curve.times, vec![1.0, 2.0, 3.0, 4.0]);
        assert_abs_diff_eq!(curve.survival[0], 0.75);
        assert_abs_diff_eq!(curve.survival[1], 0.5);
        assert_abs_diff_eq!(curve.survival[2], 0.25);
        assert_abs_diff_eq!(curve.survival[3], 0.0);
    }

    #[test]
    fn test_km_with_censoring() {
        // Censored subject at t=2 leaves the risk set without an event
        let curve = kaplan_meier(&[1.0, 2.0, 3.0], &[true, false, true]);
        assert_eq!(curve.times, vec![1.0, 3.0]);
        assert_abs_diff_eq!(curve.survival[0], 2.0 / 3.0);
        // After censoring, one subject remains at risk at t=3
        assert_abs_diff_eq!(curve.survival[1], 0.0);
    }

    #[test]
    fn test_km_tied_event_times() {
        let curve = kaplan_meier(&[1.0, 1.0, 2.0, 2.0], &[true, true, true, false]);
        assert_eq!(curve.times, vec![1.0, 2.0]);
        assert_abs_diff_eq!(curve.survival[0], 0.5);
        assert_abs_diff_eq!(curve.survival[1], 0.25);
    }

    #[test]
    fn test_km_no_events() {
        let curve = kaplan_meier(&[1.0, 2.0], &[false, false]);
        assert!(curve.times.is_empty());
        assert_eq!(curve.n_subjects, 2);
    }

    #[test]
    fn test_median_split_even_count() {
        let split = median_split(array![1.0, 4.0, 2.0, 3.0].view());
        assert_abs_diff_eq!(split.threshold, 2.5);
        assert_eq!(split.low, vec![0, 2]);
        assert_eq!(split.high, vec![1, 3]);
    }

    #[test]
    fn test_median_split_constant_feature() {
        let split = median_split(array![5.0, 5.0, 5.0].view());
        assert_eq!(split.low.len(), 3);
        assert!(split.high.is_empty());
    }
}
