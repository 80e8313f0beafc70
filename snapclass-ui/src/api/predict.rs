//! JSON API: prediction, vocabulary, content lookup

use axum::{
    body::Bytes,
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use snapclass_common::ranking::rank_probabilities;
use snapclass_common::{ContentSet, RankedClass};
use tracing::info;

use crate::classify::classify_bytes;
use crate::error::ApiResult;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct PredictResponse {
    pub label: String,
    pub index: usize,
    /// In vocabulary order
    pub probabilities: Vec<f32>,
    /// Sorted by probability, descending
    pub ranking: Vec<RankedClass>,
    /// Content for the predicted label
    pub content: ContentSet,
}

#[derive(Debug, Serialize)]
pub struct LabelsResponse {
    pub labels: Vec<String>,
}

/// POST /api/predict
///
/// Body is the raw image file.
pub async fn predict(State(state): State<AppState>, body: Bytes) -> ApiResult<Json<PredictResponse>> {
    let classified = classify_bytes(&state, body).await?;
    let prediction = classified.prediction;
    info!("API prediction: {}", prediction.label);

    let ranking = rank_probabilities(
        &classified.vocab,
        &prediction.probabilities,
        &prediction.label,
    );
    let content = state.registry.resolve(&prediction.label);

    Ok(Json(PredictResponse {
        label: prediction.label,
        index: prediction.index,
        probabilities: prediction.probabilities,
        ranking,
        content,
    }))
}

/// GET /api/labels
pub async fn labels(State(state): State<AppState>) -> ApiResult<Json<LabelsResponse>> {
    let classifier = state.model.get().await?;
    Ok(Json(LabelsResponse {
        labels: classifier.vocab().to_vec(),
    }))
}

/// GET /api/content/:label
///
/// Unknown labels resolve to an empty set, not an error.
pub async fn content(State(state): State<AppState>, Path(label): Path<String>) -> Json<ContentSet> {
    Json(state.registry.resolve(&label))
}

pub fn predict_routes() -> Router<AppState> {
    Router::new()
        .route("/api/predict", post(predict))
        .route("/api/labels", get(labels))
        .route("/api/content/:label", get(content))
}
