use super::error::ApiError;
use super::AppState;
use crate::pipelines::sentiment_analysis_pipeline::{ClassificationResponse, SentimentAnalysisModel};
use crate::pipelines::utils::device_name;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Body of `POST /sentiment`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationRequest {
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub model: String,
    pub device: String,
}

/// POST /sentiment - classify one text
///
/// Inference runs on the blocking thread pool. When a request timeout is
/// configured and expires, the caller gets 504 while the blocking task runs
/// to completion in the background.
pub async fn classify<M>(
    State(state): State<AppState<M>>,
    payload: Result<Json<ClassificationRequest>, JsonRejection>,
) -> Result<Json<ClassificationResponse>, ApiError>
where
    M: SentimentAnalysisModel + Send + Sync + 'static,
{
    let Json(request) = payload?;
    let pipeline = Arc::clone(&state.pipeline);
    let task = tokio::task::spawn_blocking(move || pipeline.classify(&request.text));

    let joined = match state.request_timeout {
        Some(limit) => tokio::time::timeout(limit, task)
            .await
            .map_err(|_| ApiError::Timeout(limit))?,
        None => task.await,
    };

    let response = joined??;
    Ok(Json(response))
}

/// GET /health - liveness plus the loaded model and device
pub async fn health<M>(State(state): State<AppState<M>>) -> Json<HealthResponse>
where
    M: SentimentAnalysisModel + Send + Sync + 'static,
{
    Json(HealthResponse {
        status: "ok".to_string(),
        model: state.pipeline.model_id().to_string(),
        device: device_name(state.pipeline.device()).to_string(),
    })
}
