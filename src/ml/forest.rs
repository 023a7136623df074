//! SmartCore RandomForest wrapper
//!
//! Bundles may carry a serialized smartcore forest instead of linear
//! coefficients. Forests are fitted offline; this module only serves them.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use smartcore::ensemble::random_forest_regressor::RandomForestRegressor;
use smartcore::linalg::basic::matrix::DenseMatrix;

use super::MLModel;

/// SmartCore RandomForest Model Wrapper
#[derive(Debug, Serialize, Deserialize)]
pub struct RandomForestModel {
    forest: RandomForestRegressor<f64, f64, DenseMatrix<f64>, Vec<f64>>,
    n_features: usize,
}

fn to_matrix(rows: &[Vec<f64>], n_features: usize) -> Result<DenseMatrix<f64>> {
    let mut flat = Vec::with_capacity(rows.len() * n_features);
    for row in rows {
        if row.len() != n_features {
            anyhow::bail!(
                "Feature count mismatch: expected {}, got {}",
                n_features,
                row.len()
            );
        }
        flat.extend_from_slice(row);
    }
    Ok(DenseMatrix::new(rows.len(), n_features, flat, false))
}

impl MLModel for RandomForestModel {
    fn predict(&self, rows: &[Vec<f64>]) -> Result<Vec<f64>> {
        let x = to_matrix(rows, self.n_features)?;
        let predictions = self
            .forest
            .predict(&x)
            .map_err(|e| anyhow::anyhow!("Prediction failed: {:?}", e))?;

        if predictions.len() != rows.len() {
            anyhow::bail!("Model returned {} predictions for {} rows", predictions.len(), rows.len());
        }
        Ok(predictions)
    }

    fn algorithm(&self) -> &'static str {
        "Random Forest"
    }

    fn n_features(&self) -> Option<usize> {
        Some(self.n_features)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smartcore::ensemble::random_forest_regressor::RandomForestRegressorParameters;

    /// 50 trees of depth <= 10
    fn default_parameters() -> RandomForestRegressorParameters {
        RandomForestRegressorParameters {
            max_depth: Some(10),
            min_samples_leaf: 2,
            min_samples_split: 5,
            n_trees: 50,
            m: None,
            keep_samples: false,
            seed: 42,
        }
    }

    fn train(x: &[Vec<f64>], y: &[f64]) -> RandomForestModel {
        let n_features = x[0].len();
        let x_matrix = to_matrix(x, n_features).unwrap();
        let forest = RandomForestRegressor::fit(&x_matrix, &y.to_vec(), default_parameters()).unwrap();
        RandomForestModel { forest, n_features }
    }

    fn training_data() -> (Vec<Vec<f64>>, Vec<f64>) {
        // y = 2x1 + 3x2
        let x: Vec<Vec<f64>> = vec![
            vec![1.0, 1.0],
            vec![2.0, 1.0],
            vec![1.0, 2.0],
            vec![2.0, 2.0],
            vec![3.0, 3.0],
            vec![4.0, 2.0],
            vec![2.0, 4.0],
            vec![3.0, 1.0],
            vec![1.0, 3.0],
            vec![4.0, 4.0],
        ];
        let y = x.iter().map(|r| 2.0 * r[0] + 3.0 * r[1]).collect();
        (x, y)
    }

    #[test]
    fn test_train_and_predict() {
        let (x, y) = training_data();
        let model = train(&x, &y);

        assert_eq!(model.n_features(), Some(2));
        let predictions = model.predict(&[vec![2.0, 2.0]]).unwrap();
        assert_eq!(predictions.len(), 1);
        assert!(predictions[0] > 5.0 && predictions[0] < 20.0);
    }

    #[test]
    fn test_serde_roundtrip_keeps_forest_usable() {
        let (x, y) = training_data();
        let model = train(&x, &y);

        let json = serde_json::to_string(&model).unwrap();
        let restored: RandomForestModel = serde_json::from_str(&json).unwrap();
        assert_eq!(
            restored.predict(&[vec![3.0, 3.0]]).unwrap(),
            model.predict(&[vec![3.0, 3.0]]).unwrap()
        );
    }

    #[test]
    fn test_wrong_width_rejected() {
        let (x, y) = training_data();
        let model = train(&x, &y);
        assert!(model.predict(&[vec![1.0]]).is_err());
    }
}
