use std::sync::Arc;

use log::info;
use serde::Serialize;

use crate::classifier::{self, TrainerConfig};
use crate::dataset::Dataset;
use crate::encoder::FeatureEncoder;
use crate::metrics::{self, EvaluationReport};
use crate::store::{ModelBundle, ModelStore, StoreError};

/// Failures surfaced by the train/predict/evaluate services. The first three
/// variants are part of the HTTP contract and map to a 200 response with an
/// `{"error": ...}` body; the rest are genuine server errors.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Model not trained")]
    ModelNotTrained,
    #[error("Loan_Status column not found in test data")]
    MissingLabelColumn,
    #[error("{0}")]
    InvalidInput(String),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("CSV parse error: {0}")]
    Csv(#[from] csv::Error),
}

fn load_bundle(store: &dyn ModelStore) -> Result<ModelBundle, ServiceError> {
    match store.load() {
        Ok(bundle) => Ok(bundle),
        Err(StoreError::NotFound(_)) => Err(ServiceError::ModelNotTrained),
        Err(err) => Err(err.into()),
    }
}

/// Result of a training call.
#[derive(Debug, Clone, Serialize)]
pub struct TrainingOutcome {
    /// Number of post-expansion feature columns the model was fit on.
    pub features_used: usize,
}

/// Fits the encoder and classifier on an uploaded training set and persists
/// the resulting bundle.
pub struct TrainingService {
    store: Arc<dyn ModelStore>,
    config: TrainerConfig,
}

impl TrainingService {
    pub fn new(store: Arc<dyn ModelStore>) -> Self {
        Self {
            store,
            config: TrainerConfig::default(),
        }
    }

    pub fn with_config(store: Arc<dyn ModelStore>, config: TrainerConfig) -> Self {
        Self { store, config }
    }

    pub fn train(&self, mut dataset: Dataset) -> Result<TrainingOutcome, ServiceError> {
        // A zero-row upload would fit NaN statistics and overwrite a good
        // artifact with an unreadable one; reject it before touching the
        // store.
        if dataset.is_empty() {
            return Err(ServiceError::InvalidInput(
                "empty training set".to_string(),
            ));
        }
        let labels = dataset
            .take_labels()
            .ok_or(ServiceError::MissingLabelColumn)?;
        let (encoder, matrix) = FeatureEncoder::fit(&dataset);
        let model = classifier::train(&matrix, &labels, &self.config);
        let columns = encoder.feature_names.clone();
        let features_used = columns.len();
        self.store.save(&ModelBundle {
            model,
            encoder,
            columns,
        })?;
        info!(
            "trained model on {} rows with {} features",
            labels.len(),
            features_used
        );
        Ok(TrainingOutcome { features_used })
    }
}

/// A single prediction: decided label plus the positive-class probability
/// at full floating precision.
#[derive(Debug, Clone, Serialize)]
pub struct Prediction {
    pub loan_status: String,
    pub approval_probability: f64,
}

/// Loads the bundle, encodes one applicant record and classifies it.
pub struct PredictionService {
    store: Arc<dyn ModelStore>,
}

impl PredictionService {
    pub fn new(store: Arc<dyn ModelStore>) -> Self {
        Self { store }
    }

    pub fn predict(&self, record: &Dataset) -> Result<Prediction, ServiceError> {
        if record.is_empty() {
            return Err(ServiceError::InvalidInput("empty record".to_string()));
        }
        let bundle = load_bundle(self.store.as_ref())?;
        let matrix = bundle.encoder.apply(record);
        let row = matrix.data.row(0);
        let approval_probability = bundle.model.predict_proba(row);
        let approved = bundle.model.predict(row) == 1;
        Ok(Prediction {
            loan_status: if approved { "Approved" } else { "Rejected" }.to_string(),
            approval_probability,
        })
    }
}

/// Loads the bundle, encodes a labelled test set and scores the classifier
/// against it.
pub struct EvaluationService {
    store: Arc<dyn ModelStore>,
}

impl EvaluationService {
    pub fn new(store: Arc<dyn ModelStore>) -> Self {
        Self { store }
    }

    pub fn evaluate(&self, mut dataset: Dataset) -> Result<EvaluationReport, ServiceError> {
        let labels = dataset
            .take_labels()
            .ok_or(ServiceError::MissingLabelColumn)?;
        let bundle = load_bundle(self.store.as_ref())?;
        let matrix = bundle.encoder.apply(&dataset);
        let predicted = bundle.model.predict_batch(&matrix);
        Ok(metrics::classification_report(&labels, &predicted))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::FsModelStore;

    fn temp_store(dir: &tempfile::TempDir) -> Arc<dyn ModelStore> {
        Arc::new(FsModelStore::new(dir.path().join("bundle.json")))
    }

    fn training_csv() -> &'static str {
        "Gender,ApplicantIncome,Credit_History,Loan_Status\n\
         Male,5000,1,Y\n\
         Female,3000,1,Y\n\
         Male,4000,0,N\n\
         Female,2500,0,N\n\
         Male,6000,1,Y\n\
         Female,2000,0,N\n"
    }

    #[test]
    fn predict_before_train_is_model_not_trained() {
        let dir = tempfile::tempdir().unwrap();
        let service = PredictionService::new(temp_store(&dir));
        let record = Dataset::from_csv(
            "Gender,ApplicantIncome,Credit_History\nMale,5000,1\n".as_bytes(),
        )
        .unwrap();
        assert!(matches!(
            service.predict(&record),
            Err(ServiceError::ModelNotTrained)
        ));
    }

    #[test]
    fn train_rejects_empty_dataset() {
        let dir = tempfile::tempdir().unwrap();
        let store = temp_store(&dir);
        let header_only =
            Dataset::from_csv("Credit_History,Loan_Status\n".as_bytes()).unwrap();
        let result = TrainingService::new(Arc::clone(&store)).train(header_only);
        assert!(matches!(result, Err(ServiceError::InvalidInput(_))));
        assert!(!store.exists());
    }

    #[test]
    fn evaluate_without_label_column_fails() {
        let dir = tempfile::tempdir().unwrap();
        let store = temp_store(&dir);
        TrainingService::new(Arc::clone(&store))
            .train(Dataset::from_csv(training_csv().as_bytes()).unwrap())
            .unwrap();
        let service = EvaluationService::new(store);
        let unlabeled = Dataset::from_csv(
            "Gender,ApplicantIncome,Credit_History\nMale,5000,1\n".as_bytes(),
        )
        .unwrap();
        assert!(matches!(
            service.evaluate(unlabeled),
            Err(ServiceError::MissingLabelColumn)
        ));
    }

    #[test]
    fn train_then_predict_and_evaluate() {
        let dir = tempfile::tempdir().unwrap();
        let store = temp_store(&dir);
        let outcome = TrainingService::new(Arc::clone(&store))
            .train(Dataset::from_csv(training_csv().as_bytes()).unwrap())
            .unwrap();
        // ApplicantIncome, Credit_History, Gender_Male.
        assert_eq!(outcome.features_used, 3);

        let prediction = PredictionService::new(Arc::clone(&store))
            .predict(
                &Dataset::from_csv(
                    "Gender,ApplicantIncome,Credit_History\nMale,5000,1\n".as_bytes(),
                )
                .unwrap(),
            )
            .unwrap();
        assert!((0.0..=1.0).contains(&prediction.approval_probability));
        let expected = if prediction.approval_probability >= 0.5 {
            "Approved"
        } else {
            "Rejected"
        };
        assert_eq!(prediction.loan_status, expected);

        let report = EvaluationService::new(store)
            .evaluate(Dataset::from_csv(training_csv().as_bytes()).unwrap())
            .unwrap();
        // Credit_History separates the training set perfectly.
        assert_eq!(report.accuracy, 1.0);
    }
}
