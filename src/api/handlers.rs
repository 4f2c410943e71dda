use crate::api::AppState;
use crate::error::{AppError, Result};
use crate::ml::{ClassificationStats, ModelInfo, Prediction};
use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use validator::Validate;

/// Static readiness message
pub const READY_MESSAGE: &str = "Ticket Classifier API is running ✅";

/// Readiness message for liveness probes
pub async fn root() -> Json<RootResponse> {
    Json(RootResponse {
        message: READY_MESSAGE,
    })
}

#[derive(Debug, Serialize)]
pub struct RootResponse {
    pub message: &'static str,
}

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Result<Json<HealthResponse>> {
    Ok(Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        model: state.classifier.model_info().clone(),
        requests: state.classifier.stats(),
    }))
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub model: ModelInfo,
    pub requests: ClassificationStats,
}

/// Classify a ticket and return label, confidence and the full distribution
pub async fn predict(
    State(state): State<AppState>,
    payload: std::result::Result<Json<PredictRequest>, JsonRejection>,
) -> Result<Json<PredictResponse>> {
    let request = validated(payload)?;
    let prediction = state.classifier.classify(request.text).await?;
    Ok(Json(PredictResponse::from(prediction)))
}

/// Classify a ticket and return only the label
pub async fn predict_label(
    State(state): State<AppState>,
    payload: std::result::Result<Json<PredictRequest>, JsonRejection>,
) -> Result<Json<LabelResponse>> {
    let request = validated(payload)?;
    let prediction = state.classifier.classify(request.text).await?;
    Ok(Json(LabelResponse {
        label: prediction.label,
    }))
}

/// Turn extractor rejections (missing field, wrong type, bad JSON) into 400s
fn validated(
    payload: std::result::Result<Json<PredictRequest>, JsonRejection>,
) -> Result<PredictRequest> {
    let Json(request) = payload.map_err(|rejection| AppError::Validation(rejection.body_text()))?;
    request.validate()?;
    Ok(request)
}

#[derive(Debug, Deserialize, Validate)]
pub struct PredictRequest {
    #[validate(length(min = 1))]
    pub text: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PredictResponse {
    pub predicted_category: String,
    /// Percentage, rounded to two decimals
    pub confidence: f64,
    pub confidences: BTreeMap<String, f64>,
}

impl From<Prediction> for PredictResponse {
    fn from(prediction: Prediction) -> Self {
        Self {
            confidence: prediction.confidence_percent(),
            predicted_category: prediction.label,
            confidences: prediction.probabilities,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LabelResponse {
    pub label: String,
}
