use log::{debug, info};
use ndarray::Array1;

use super::model::{sigmoid, LogisticRegression};
use crate::encoder::EncodedMatrix;

/// Training hyperparameters for the logistic regression solver.
///
/// The defaults match a single deterministic fit with an iteration cap
/// sufficient for convergence on typical tabular sizes; there is no
/// cross-validation and no hyperparameter search.
#[derive(Debug, Clone)]
pub struct TrainerConfig {
    /// Iteration cap for the gradient descent loop.
    pub max_iter: usize,
    /// Step size; safe for standardized features.
    pub learning_rate: f64,
    /// L2 penalty strength on the weights (the intercept is unregularized).
    pub l2: f64,
    /// Early-stop threshold on the gradient infinity norm.
    pub tolerance: f64,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            max_iter: 1000,
            learning_rate: 0.1,
            l2: 1.0,
            tolerance: 1e-6,
        }
    }
}

/// Fits a binary logistic regression on the encoded features and labels by
/// full-batch gradient descent on the L2-regularized mean log-loss.
///
/// Deterministic: weights start at zero and the data order is fixed, so the
/// same input always yields the same model.
pub fn train(matrix: &EncodedMatrix, labels: &[u8], config: &TrainerConfig) -> LogisticRegression {
    // Invariant: labels and matrix rows come from the same dataset split.
    debug_assert_eq!(
        matrix.n_rows(),
        labels.len(),
        "label count must match encoded row count"
    );
    let n = matrix.n_rows() as f64;
    let d = matrix.n_features();
    let x = &matrix.data;
    let y: Array1<f64> = labels.iter().map(|&l| f64::from(l)).collect();

    let mut weights = Array1::<f64>::zeros(d);
    let mut intercept = 0.0_f64;
    let mut iterations = 0;

    for iter in 0..config.max_iter {
        iterations = iter + 1;
        let scores = x.dot(&weights) + intercept;
        let probs = scores.mapv(sigmoid);
        let residual = &probs - &y;

        let mut grad_w = x.t().dot(&residual) / n;
        if n > 0.0 {
            grad_w = grad_w + &weights * (config.l2 / n);
        }
        let grad_b = residual.sum() / n;

        let grad_norm = grad_w
            .iter()
            .fold(grad_b.abs(), |acc, g| acc.max(g.abs()));
        if grad_norm < config.tolerance {
            break;
        }

        weights = weights - &grad_w * config.learning_rate;
        intercept -= grad_b * config.learning_rate;
    }

    debug!(
        "trained logistic regression: {} features, {} iterations",
        d, iterations
    );
    info!("classifier fit complete over {} rows", labels.len());

    LogisticRegression {
        weights: weights.to_vec(),
        intercept,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn matrix(data: ndarray::Array2<f64>) -> EncodedMatrix {
        let feature_names = (0..data.ncols()).map(|i| format!("f{i}")).collect();
        EncodedMatrix {
            feature_names,
            data,
        }
    }

    #[test]
    fn learns_separable_data() {
        let m = matrix(array![[-1.0], [-0.8], [-0.6], [0.6], [0.8], [1.0]]);
        let labels = [0, 0, 0, 1, 1, 1];
        let model = train(&m, &labels, &TrainerConfig::default());
        assert!(model.weights[0] > 0.0);
        for (row, &label) in m.data.rows().into_iter().zip(&labels) {
            assert_eq!(model.predict(row), label);
        }
    }

    #[test]
    fn training_is_deterministic() {
        let m = matrix(array![[-1.0, 0.5], [0.3, -0.2], [1.0, 0.9], [-0.4, -1.0]]);
        let labels = [0, 1, 1, 0];
        let a = train(&m, &labels, &TrainerConfig::default());
        let b = train(&m, &labels, &TrainerConfig::default());
        assert_eq!(a, b);
    }

    #[test]
    fn balanced_uninformative_data_stays_near_half() {
        let m = matrix(array![[0.0], [0.0], [0.0], [0.0]]);
        let labels = [0, 1, 0, 1];
        let model = train(&m, &labels, &TrainerConfig::default());
        let p = model.predict_proba(array![0.0].view());
        assert!((p - 0.5).abs() < 1e-6);
    }
}
