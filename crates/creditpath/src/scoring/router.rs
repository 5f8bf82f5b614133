use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use tracing::{info, warn};

use super::decision::Recommendation;
use super::domain::ApplicantRecord;
use super::preprocess::ClampAdjustment;
use super::service::{CreditScorer, ScoringError, ScoringResult};

/// Router builder exposing the prediction endpoints.
pub fn scoring_router(scorer: Arc<CreditScorer>) -> Router {
    Router::new()
        .route("/api/v1/predict", post(predict_handler))
        .route("/api/predict", post(predict_handler))
        .with_state(scorer)
}

/// Transport view of a scoring result, stamped at response time.
#[derive(Debug, Clone, Serialize)]
pub struct PredictionResponse {
    pub timestamp: DateTime<Utc>,
    pub default_probability: f64,
    pub class_probability_map: BTreeMap<String, f64>,
    pub detected_default_label: String,
    pub recommendation: Recommendation,
    pub model_version: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub adjustments: Vec<ClampAdjustment>,
    pub status: &'static str,
}

impl PredictionResponse {
    pub fn from_result(result: ScoringResult, timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            default_probability: round_to(result.probability, 4),
            class_probability_map: result.class_probability_map,
            detected_default_label: result.detected_default_label,
            recommendation: result.recommendation,
            model_version: result.model_version,
            adjustments: result.adjustments,
            status: "success",
        }
    }
}

fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

/// Error envelope for bodies that never become an [`ApplicantRecord`]. Type and
/// missing-field errors answer 422; syntax and content-type errors keep axum's status.
fn rejection_response(rejection: JsonRejection) -> Response {
    let message = rejection.body_text();
    let field = missing_field(&message).map(str::to_owned);
    warn!(field = field.as_deref(), error = %message, "rejected request body");

    let mut payload = json!({
        "status": "error",
        "message": message,
    });
    if let Some(field) = field {
        payload["field"] = json!(field);
    }
    (rejection.status(), Json(payload)).into_response()
}

/// Field name from serde's "missing field `name`" message.
fn missing_field(message: &str) -> Option<&str> {
    let (_, rest) = message.split_once("missing field `")?;
    let (field, _) = rest.split_once('`')?;
    Some(field)
}

pub(crate) async fn predict_handler(
    State(scorer): State<Arc<CreditScorer>>,
    payload: Result<Json<ApplicantRecord>, JsonRejection>,
) -> Response {
    let record = match payload {
        Ok(Json(record)) => record,
        Err(rejection) => return rejection_response(rejection),
    };

    match scorer.score(&record) {
        Ok(result) => {
            info!(
                decision = %result.recommendation.decision,
                risk_category = %result.recommendation.risk_category,
                probability = result.probability,
                "prediction served"
            );
            let body = PredictionResponse::from_result(result, Utc::now());
            (StatusCode::OK, Json(body)).into_response()
        }
        Err(ScoringError::Validation(error)) => {
            warn!(field = error.field(), error = %error, "rejected applicant record");
            let payload = json!({
                "status": "error",
                "message": error.to_string(),
                "field": error.field(),
                "allowed": error.allowed(),
            });
            (StatusCode::UNPROCESSABLE_ENTITY, Json(payload)).into_response()
        }
        Err(ScoringError::Inference(error)) => {
            tracing::error!(error = %error, "inference failed");
            let payload = json!({
                "status": "error",
                "message": format!("prediction failed: {error}"),
            });
            (StatusCode::INTERNAL_SERVER_ERROR, Json(payload)).into_response()
        }
    }
}
