// Error types for the API server

use crate::pipeline::ProcessingError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

/// API server error types
#[derive(Debug)]
pub enum ApiError {
    /// Malformed request, rejected before the upload is validated.
    BadRequest(String),
    /// Upload failed validation; the message is shown to the caller as is.
    Validation(String),
    /// Anything that went wrong after validation.
    Processing(ProcessingError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) | Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Processing(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn detail(&self) -> String {
        match self {
            Self::BadRequest(msg) | Self::Validation(msg) => msg.clone(),
            Self::Processing(err) => format!("Error processing image: {}", err),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({ "detail": self.detail() }));
        (self.status(), body).into_response()
    }
}

impl From<ProcessingError> for ApiError {
    fn from(error: ProcessingError) -> Self {
        Self::Processing(error)
    }
}
