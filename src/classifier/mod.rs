//! Binary logistic regression: model representation and training.

mod model;
mod trainer;

pub use model::LogisticRegression;
pub use trainer::{train, TrainerConfig};
