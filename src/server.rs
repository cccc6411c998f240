//! HTTP surface: axum router and the train/test/predict handlers.
//!
//! Logical failures from the service taxonomy (missing model, missing label
//! column, rejected input) keep the inherited 200-with-error-body contract;
//! malformed uploads are 400 and anything unexpected is 500.

use std::sync::Arc;

use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use log::error;
use serde::Deserialize;
use serde_json::json;

use crate::dataset::Dataset;
use crate::service::{EvaluationService, PredictionService, ServiceError, TrainingService};
use crate::store::ModelStore;

/// Shared state threaded through axum handlers via [`State`].
pub struct AppState {
    pub training: TrainingService,
    pub prediction: PredictionService,
    pub evaluation: EvaluationService,
    pub store: Arc<dyn ModelStore>,
}

/// Builds the service router over one injected model store.
pub fn build_router(store: Arc<dyn ModelStore>) -> Router {
    let state = Arc::new(AppState {
        training: TrainingService::new(Arc::clone(&store)),
        prediction: PredictionService::new(Arc::clone(&store)),
        evaluation: EvaluationService::new(Arc::clone(&store)),
        store,
    });
    Router::new()
        .route("/health", get(health_handler))
        .route("/train", post(train_handler))
        .route("/test", post(test_handler))
        .route("/predict", post(predict_handler))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

/// `Dependents` arrives as a number from form clients or as text (possibly
/// the `"3+"` sentinel) from raw callers.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum DependentsField {
    Count(f64),
    Text(String),
}

/// Typed body for `POST /predict`: the eleven applicant feature fields.
/// Categorical fields are validated against their allowed value sets;
/// numeric fields may be null and fall back to the stored imputation
/// statistic.
#[derive(Debug, Clone, Deserialize)]
pub struct PredictRequest {
    #[serde(rename = "Gender")]
    pub gender: String,
    #[serde(rename = "Married")]
    pub married: String,
    #[serde(rename = "Dependents")]
    pub dependents: Option<DependentsField>,
    #[serde(rename = "Education")]
    pub education: String,
    #[serde(rename = "Self_Employed")]
    pub self_employed: String,
    #[serde(rename = "ApplicantIncome")]
    pub applicant_income: Option<f64>,
    #[serde(rename = "CoapplicantIncome")]
    pub coapplicant_income: Option<f64>,
    #[serde(rename = "LoanAmount")]
    pub loan_amount: Option<f64>,
    #[serde(rename = "Loan_Amount_Term")]
    pub loan_amount_term: Option<f64>,
    #[serde(rename = "Credit_History")]
    pub credit_history: Option<f64>,
    #[serde(rename = "Property_Area")]
    pub property_area: String,
}

impl PredictRequest {
    fn validate(&self) -> Result<(), String> {
        check_allowed("Gender", &self.gender, &["Male", "Female"])?;
        check_allowed("Married", &self.married, &["Yes", "No"])?;
        check_allowed("Education", &self.education, &["Graduate", "Not Graduate"])?;
        check_allowed("Self_Employed", &self.self_employed, &["Yes", "No"])?;
        check_allowed(
            "Property_Area",
            &self.property_area,
            &["Urban", "Semiurban", "Rural"],
        )?;
        if let Some(ch) = self.credit_history {
            if ch != 0.0 && ch != 1.0 {
                return Err("Credit_History must be 0 or 1".to_string());
            }
        }
        Ok(())
    }

    /// Lowers the typed request into a single-row dataset in the canonical
    /// column order of the training CSV schema.
    fn to_dataset(&self) -> Dataset {
        let dependents = self.dependents.as_ref().map(|d| match d {
            DependentsField::Count(n) => n.to_string(),
            DependentsField::Text(t) => t.clone(),
        });
        Dataset::from_row(vec![
            ("Gender".to_string(), Some(self.gender.clone())),
            ("Married".to_string(), Some(self.married.clone())),
            ("Dependents".to_string(), dependents),
            ("Education".to_string(), Some(self.education.clone())),
            ("Self_Employed".to_string(), Some(self.self_employed.clone())),
            ("ApplicantIncome".to_string(), number_cell(self.applicant_income)),
            (
                "CoapplicantIncome".to_string(),
                number_cell(self.coapplicant_income),
            ),
            ("LoanAmount".to_string(), number_cell(self.loan_amount)),
            (
                "Loan_Amount_Term".to_string(),
                number_cell(self.loan_amount_term),
            ),
            ("Credit_History".to_string(), number_cell(self.credit_history)),
            ("Property_Area".to_string(), Some(self.property_area.clone())),
        ])
    }
}

fn check_allowed(field: &str, value: &str, allowed: &[&str]) -> Result<(), String> {
    if allowed.contains(&value) {
        Ok(())
    } else {
        Err(format!(
            "{field} must be one of {}, got '{value}'",
            allowed.join(", ")
        ))
    }
}

fn number_cell(value: Option<f64>) -> Option<String> {
    value.map(|v| v.to_string())
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn health_handler(State(state): State<Arc<AppState>>) -> Response {
    Json(json!({
        "status": "ok",
        "model_trained": state.store.exists(),
    }))
    .into_response()
}

async fn train_handler(State(state): State<Arc<AppState>>, multipart: Multipart) -> Response {
    let dataset = match read_csv_upload(multipart).await {
        Ok(dataset) => dataset,
        Err(response) => return response,
    };
    match state.training.train(dataset) {
        Ok(outcome) => Json(json!({
            "message": "Model trained successfully",
            "features_used": outcome.features_used,
        }))
        .into_response(),
        Err(err) => error_response(err),
    }
}

async fn test_handler(State(state): State<Arc<AppState>>, multipart: Multipart) -> Response {
    let dataset = match read_csv_upload(multipart).await {
        Ok(dataset) => dataset,
        Err(response) => return response,
    };
    match state.evaluation.evaluate(dataset) {
        Ok(report) => Json(report).into_response(),
        Err(err) => error_response(err),
    }
}

async fn predict_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<PredictRequest>,
) -> Response {
    if let Err(message) = request.validate() {
        return error_response(ServiceError::InvalidInput(message));
    }
    match state.prediction.predict(&request.to_dataset()) {
        Ok(prediction) => Json(prediction).into_response(),
        Err(err) => error_response(err),
    }
}

/// Pulls the uploaded CSV out of the `file` multipart field.
async fn read_csv_upload(mut multipart: Multipart) -> Result<Dataset, Response> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| bad_request(&e.to_string()))?
    {
        if field.name() == Some("file") {
            let bytes = field
                .bytes()
                .await
                .map_err(|e| bad_request(&e.to_string()))?;
            return Dataset::from_csv(bytes.as_ref()).map_err(|e| bad_request(&e.to_string()));
        }
    }
    Err(bad_request("missing multipart field 'file'"))
}

fn bad_request(message: &str) -> Response {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response()
}

fn error_response(err: ServiceError) -> Response {
    match err {
        ServiceError::ModelNotTrained
        | ServiceError::MissingLabelColumn
        | ServiceError::InvalidInput(_) => {
            // Inherited contract: logical errors are 200 with an error body.
            Json(json!({ "error": err.to_string() })).into_response()
        }
        ServiceError::Csv(e) => bad_request(&e.to_string()),
        other => {
            error!("request failed: {other}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": other.to_string() })),
            )
                .into_response()
        }
    }
}
