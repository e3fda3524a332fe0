//! Risk gradient computation
//!
//! A [`RiskModel`] predicts a scalar risk per sample and exposes the
//! per-sample, per-feature derivative of that risk. Models with analytic
//! gradients override [`RiskModel::risk_gradients`]; anything that can only
//! predict falls back to column-batched central finite differences.

use crate::error::{ProfilerError, Result};
use ndarray::{Array1, Array2};

/// Step size for the finite-difference fallback
const FD_STEP: f64 = 1e-5;

/// A trained model producing a scalar risk score per sample
pub trait RiskModel {
    /// Predict risk for each sample row of `x`
    fn predict_risk(&self, x: &Array2<f64>) -> Result<Array1<f64>>;

    /// Per-sample gradient of predicted risk with respect to each feature.
    ///
    /// The default implementation perturbs one feature column at a time and
    /// evaluates central differences, costing `2 * n_features` predictions.
    fn risk_gradients(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        let (n_samples, n_features) = x.dim();
        let mut gradients = Array2::zeros((n_samples, n_features));

        for j in 0..n_features {
            let mut plus = x.clone();
            plus.column_mut(j).mapv_inplace(|v| v + FD_STEP);
            let mut minus = x.clone();
            minus.column_mut(j).mapv_inplace(|v| v - FD_STEP);

            let risk_plus = self.predict_risk(&plus)?;
            let risk_minus = self.predict_risk(&minus)?;
            let column = (&risk_plus - &risk_minus) / (2.0 * FD_STEP);
            gradients.column_mut(j).assign(&column);
        }

        Ok(gradients)
    }
}

/// Linear risk model: `risk = x · weights + bias`
#[derive(Debug, Clone)]
pub struct LinearRiskModel {
    weights: Array1<f64>,
    bias: f64,
}

impl LinearRiskModel {
    pub fn new(weights: Array1<f64>, bias: f64) -> Self {
        Self { weights, bias }
    }

    pub fn weights(&self) -> &Array1<f64> {
        &self.weights
    }
}

impl RiskModel for LinearRiskModel {
    fn predict_risk(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if x.ncols() != self.weights.len() {
            return Err(ProfilerError::GradientError(format!(
                "model expects {} features, got {}",
                self.weights.len(),
                x.ncols()
            )));
        }
        Ok(x.dot(&self.weights) + self.bias)
    }

    fn risk_gradients(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        if x.ncols() != self.weights.len() {
            return Err(ProfilerError::GradientError(format!(
                "model expects {} features, got {}",
                self.weights.len(),
                x.ncols()
            )));
        }
        // Gradient of a linear model is the weight vector for every sample
        Ok(Array2::from_shape_fn(x.dim(), |(_, j)| self.weights[j]))
    }
}

/// Compute the cohort gradient matrix from a model and normalized features.
///
/// Enforces the provider contract: the gradient matrix must have the same
/// shape as the input matrix. Model failures propagate unchanged.
pub fn cohort_gradients<M: RiskModel + ?Sized>(
    model: &M,
    normalized: &Array2<f64>,
) -> Result<Array2<f64>> {
    let gradients = model.risk_gradients(normalized)?;
    if gradients.dim() != normalized.dim() {
        return Err(ProfilerError::GradientError(format!(
            "gradient matrix shape {:?} does not match feature matrix shape {:?}",
            gradients.dim(),
            normalized.dim()
        )));
    }
    Ok(gradients)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    struct QuadraticModel;

    impl RiskModel for QuadraticModel {
        fn predict_risk(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
            let risks: Vec<f64> = x
                .rows()
                .into_iter()
                .map(|row| row[0] * row[0] + 3.0 * row[1])
                .collect();
            Ok(Array1::from_vec(risks))
        }
    }

    #[test]
    fn test_linear_predict() {
        let model = LinearRiskModel::new(array![1.0, 2.0], 0.5);
        let x = array![[1.0, 1.0], [2.0, 0.0]];
        let risk = model.predict_risk(&x).unwrap();
        assert_abs_diff_eq!(risk[0], 3.5);
        assert_abs_diff_eq!(risk[1], 2.5);
    }

    #[test]
    fn test_linear_analytic_gradient() {
        let model = LinearRiskModel::new(array![0.5, -2.0, 1.0], 0.0);
        let x = array![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]];
        let grads = model.risk_gradients(&x).unwrap();
        for i in 0..2 {
            assert_abs_diff_eq!(grads[[i, 0]], 0.5);
            assert_abs_diff_eq!(grads[[i, 1]], -2.0);
            assert_abs_diff_eq!(grads[[i, 2]], 1.0);
        }
    }

    #[test]
    fn test_finite_difference_matches_analytic() {
        let x = array![[1.0, 2.0], [-0.5, 0.25]];
        let grads = QuadraticModel.risk_gradients(&x).unwrap();
        // d/dx0 = 2 * x0, d/dx1 = 3
        assert_abs_diff_eq!(grads[[0, 0]], 2.0, epsilon = 1e-6);
        assert_abs_diff_eq!(grads[[0, 1]], 3.0, epsilon = 1e-6);
        assert_abs_diff_eq!(grads[[1, 0]], -1.0, epsilon = 1e-6);
        assert_abs_diff_eq!(grads[[1, 1]], 3.0, epsilon = 1e-6);
    }

    #[test]
    fn test_cohort_gradients_shape_contract() {
        struct BadModel;
        impl RiskModel for BadModel {
            fn predict_risk(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
                Ok(Array1::zeros(x.nrows()))
            }
            fn risk_gradients(&self, _x: &Array2<f64>) -> Result<Array2<f64>> {
                Ok(Array2::zeros((1, 1)))
            }
        }

        let x = array![[1.0, 2.0], [3.0, 4.0]];
        let err = cohort_gradients(&BadModel, &x).unwrap_err();
        assert!(matches!(err, ProfilerError::GradientError(_)));
    }

    #[test]
    fn test_feature_count_mismatch() {
        let model = LinearRiskModel::new(array![1.0, 2.0], 0.0);
        let x = array![[1.0, 2.0, 3.0]];
        assert!(model.predict_risk(&x).is_err());
    }
}
