use crate::core::SentimentError;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// JSON body returned with every error status.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub detail: String,
}

/// Failure of a request at the HTTP boundary.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The body was not valid JSON, lacked a JSON content type, or did not
    /// match the request schema.
    #[error(transparent)]
    InvalidRequest(#[from] JsonRejection),

    #[error(transparent)]
    Classification(#[from] SentimentError),

    #[error("classification did not finish within {0:?}")]
    Timeout(Duration),

    /// The blocking inference task panicked or was cancelled.
    #[error("classification worker failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidRequest(rejection) => rejection.status(),
            ApiError::Classification(_) | ApiError::Worker(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let detail = match &self {
            ApiError::InvalidRequest(rejection) => rejection.body_text(),
            other => other.to_string(),
        };

        if status.is_server_error() {
            tracing::error!(%status, %detail, "request failed");
        } else {
            tracing::debug!(%status, %detail, "request rejected");
        }

        (status, Json(ErrorBody { detail })).into_response()
    }
}
