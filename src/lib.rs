//! Loan approval prediction: a fit-once/apply-many tabular feature pipeline,
//! a logistic regression classifier, a persisted model bundle, and an HTTP
//! service exposing train, test and predict operations.
//!
//! # Basic Usage
//!
//! ```rust
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use underwriter::{Dataset, FeatureEncoder, TrainerConfig};
//!
//! let csv = "\
//! Gender,ApplicantIncome,Credit_History,Loan_Status
//! Male,5000,1,Y
//! Female,3000,0,N
//! Male,4000,1,Y
//! Female,2500,0,N
//! ";
//! let mut dataset = Dataset::from_csv(csv.as_bytes())?;
//! let labels = dataset.take_labels().expect("labelled training data");
//!
//! let (encoder, matrix) = FeatureEncoder::fit(&dataset);
//! let model = underwriter::classifier::train(&matrix, &labels, &TrainerConfig::default());
//!
//! let encoded = encoder.apply(&dataset);
//! let probability = model.predict_proba(encoded.data.row(0));
//! assert!((0.0..=1.0).contains(&probability));
//! # Ok(())
//! # }
//! ```
//!
//! # Service wiring
//!
//! The HTTP layer is assembled from a [`ModelStore`] implementation injected
//! into the services, so tests can run against isolated temporary stores:
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use underwriter::{build_router, FsModelStore, ModelStore};
//!
//! let store: Arc<dyn ModelStore> = Arc::new(FsModelStore::new("models/loan_model.json"));
//! let app = build_router(store);
//! ```

pub mod classifier;
pub mod dataset;
pub mod encoder;
pub mod metrics;
pub mod server;
pub mod service;
pub mod store;

pub use classifier::{LogisticRegression, TrainerConfig};
pub use dataset::Dataset;
pub use encoder::{EncodedMatrix, FeatureEncoder, FittedEncoder};
pub use metrics::{ClassMetrics, EvaluationReport};
pub use server::{build_router, AppState, PredictRequest};
pub use service::{
    EvaluationService, Prediction, PredictionService, ServiceError, TrainingOutcome,
    TrainingService,
};
pub use store::{FsModelStore, ModelBundle, ModelStore, StoreError};

pub fn init_logger() {
    env_logger::init();
}
