//! Error types for snapclass-ui
//!
//! Every failure from an external collaborator (image decoder, classifier,
//! model fetch) reaches the user with a readable message. Nothing is
//! substituted silently.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::classifier::ClassifierError;
use crate::decoder::DecodeError;
use crate::provider::ModelLoadError;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Upload exceeds the configured size limit (413)
    #[error("Upload too large: {0}")]
    PayloadTooLarge(String),

    /// Uploaded bytes are not a decodable image (422)
    #[error("Could not read the image: {0}")]
    Decode(#[from] DecodeError),

    /// Inference failed for a decoded image (500)
    #[error("Classification failed: {0}")]
    Classifier(#[from] ClassifierError),

    /// Model could not be fetched or loaded (503)
    #[error("Model unavailable: {0}")]
    ModelUnavailable(#[from] ModelLoadError),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),

    /// snapclass-common error
    #[error("Common error: {0}")]
    Common(#[from] snapclass_common::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Decode(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::ModelUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Classifier(_) | ApiError::Internal(_) | ApiError::Common(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::PayloadTooLarge(_) => "PAYLOAD_TOO_LARGE",
            ApiError::Decode(_) => "DECODE_ERROR",
            ApiError::Classifier(_) => "CLASSIFIER_ERROR",
            ApiError::ModelUnavailable(_) => "MODEL_UNAVAILABLE",
            ApiError::Internal(_) => "INTERNAL_ERROR",
            ApiError::Common(_) => "COMMON_ERROR",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(json!({
            "error": {
                "code": self.code(),
                "message": self.to_string(),
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
