use ndarray::ArrayView1;
use serde::{Deserialize, Serialize};

use crate::encoder::EncodedMatrix;

/// A trained binary logistic regression model: one weight per feature column
/// plus an intercept. The decision boundary is the model's own 0.5
/// positive-class probability, never a separately chosen cutoff.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticRegression {
    pub weights: Vec<f64>,
    pub intercept: f64,
}

impl LogisticRegression {
    /// Raw linear score for one encoded row.
    pub fn decision_function(&self, row: ArrayView1<'_, f64>) -> f64 {
        row.iter()
            .zip(&self.weights)
            .map(|(x, w)| x * w)
            .sum::<f64>()
            + self.intercept
    }

    /// Positive-class probability for one encoded row, in `[0, 1]`.
    pub fn predict_proba(&self, row: ArrayView1<'_, f64>) -> f64 {
        sigmoid(self.decision_function(row))
    }

    /// Predicted class (1 = approved) for one encoded row.
    pub fn predict(&self, row: ArrayView1<'_, f64>) -> u8 {
        u8::from(self.predict_proba(row) >= 0.5)
    }

    /// Predicted classes for every row of an encoded matrix.
    pub fn predict_batch(&self, matrix: &EncodedMatrix) -> Vec<u8> {
        matrix
            .data
            .rows()
            .into_iter()
            .map(|r| self.predict(r))
            .collect()
    }
}

pub(crate) fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn probability_is_bounded() {
        let model = LogisticRegression {
            weights: vec![10.0, -10.0],
            intercept: 3.0,
        };
        for row in [
            array![100.0, -100.0],
            array![-100.0, 100.0],
            array![0.0, 0.0],
        ] {
            let p = model.predict_proba(row.view());
            assert!((0.0..=1.0).contains(&p));
        }
    }

    #[test]
    fn label_matches_probability_boundary() {
        let model = LogisticRegression {
            weights: vec![1.0],
            intercept: 0.0,
        };
        let positive = array![2.0];
        let negative = array![-2.0];
        assert_eq!(model.predict(positive.view()), 1);
        assert!(model.predict_proba(positive.view()) >= 0.5);
        assert_eq!(model.predict(negative.view()), 0);
        assert!(model.predict_proba(negative.view()) < 0.5);
    }

    #[test]
    fn sigmoid_midpoint() {
        assert_eq!(sigmoid(0.0), 0.5);
        assert!(sigmoid(10.0) > 0.999);
        assert!(sigmoid(-10.0) < 0.001);
    }
}
