//! ML Model Definitions
//!
//! Regressors a bundle can carry, behind the `MLModel` trait.

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Trait for ML models
#[cfg_attr(test, mockall::automock)]
pub trait MLModel: Send + Sync {
    /// Predict one value per input row
    fn predict(&self, rows: &[Vec<f64>]) -> Result<Vec<f64>>;

    /// Human-readable algorithm label
    fn algorithm(&self) -> &'static str;

    /// Number of input columns the model was fitted on, if it knows
    fn n_features(&self) -> Option<usize>;
}

/// Simple Linear Regression Model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearRegressionModel {
    pub coefficients: Vec<f64>,
    #[serde(default)]
    pub intercept: f64,
}

impl LinearRegressionModel {
    pub fn new(coefficients: Vec<f64>, intercept: f64) -> Self {
        Self {
            coefficients,
            intercept,
        }
    }

    /// Create a simple model with uniform coefficients (for testing)
    pub fn dummy_model(n_features: usize) -> Self {
        Self::new(vec![1.0; n_features], 0.0)
    }

    fn predict_row(&self, row: &[f64]) -> Result<f64> {
        if row.len() != self.coefficients.len() {
            anyhow::bail!(
                "Feature count mismatch: expected {}, got {}",
                self.coefficients.len(),
                row.len()
            );
        }

        Ok(row
            .iter()
            .zip(self.coefficients.iter())
            .map(|(f, c)| f * c)
            .sum::<f64>()
            + self.intercept)
    }
}

impl MLModel for LinearRegressionModel {
    fn predict(&self, rows: &[Vec<f64>]) -> Result<Vec<f64>> {
        rows.iter().map(|row| self.predict_row(row)).collect()
    }

    fn algorithm(&self) -> &'static str {
        "Linear Regression"
    }

    fn n_features(&self) -> Option<usize> {
        Some(self.coefficients.len())
    }
}

/// Serialized predictor of a bundle, tagged by `type`
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Predictor {
    LinearRegression(LinearRegressionModel),
    #[cfg(feature = "ml")]
    RandomForest(super::forest::RandomForestModel),
}

impl Predictor {
    pub fn into_model(self) -> Box<dyn MLModel> {
        match self {
            Predictor::LinearRegression(model) => Box::new(model),
            #[cfg(feature = "ml")]
            Predictor::RandomForest(model) => Box::new(model),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_linear_regression_predict() {
        let model = LinearRegressionModel::new(vec![2.0, 3.0, 1.0], 5.0);

        let prediction = model.predict(&[vec![1.0, 2.0, 3.0]]).unwrap();
        // 2*1 + 3*2 + 1*3 + 5 = 16
        assert_eq!(prediction, vec![16.0]);
    }

    #[test]
    fn test_linear_regression_batch() {
        let model = LinearRegressionModel::dummy_model(2);
        let predictions = model.predict(&[vec![1.0, 2.0], vec![3.0, 4.0]]).unwrap();
        assert_eq!(predictions, vec![3.0, 7.0]);
    }

    #[test]
    fn test_linear_regression_rejects_wrong_width() {
        let model = LinearRegressionModel::dummy_model(3);
        let err = model.predict(&[vec![1.0, 2.0]]).unwrap_err();
        assert!(err.to_string().contains("expected 3, got 2"));
    }

    #[test]
    fn test_predictor_is_tagged() {
        let predictor: Predictor = serde_json::from_value(json!({
            "type": "linear_regression",
            "coefficients": [0.5, 0.25],
            "intercept": 1.0
        }))
        .unwrap();

        let model = predictor.into_model();
        assert_eq!(model.algorithm(), "Linear Regression");
        assert_eq!(model.n_features(), Some(2));
        assert_eq!(model.predict(&[vec![2.0, 4.0]]).unwrap(), vec![3.0]);
    }

    #[test]
    fn test_unknown_predictor_type_is_rejected() {
        let result: Result<Predictor, _> =
            serde_json::from_value(json!({ "type": "gradient_boosting" }));
        assert!(result.is_err());
    }
}
