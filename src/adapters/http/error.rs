//! API Errors - Record Failures as HTTP Responses
//!
//! Maps the record error taxonomy onto status codes:
//! validation → 400, duplicate date → 409, unknown id → 404,
//! storage → 500 (logged, details withheld from the client).

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use crate::domain::{DUPLICATE_DATE_MESSAGE, FieldErrors, RecordError};

/// Result type for record handlers.
pub type ApiResult<T> = Result<T, ApiError>;

/// Errors a record endpoint can answer with.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Failure from the record service.
    #[error(transparent)]
    Record(#[from] RecordError),

    /// Path id is not an integer; no record can match it.
    #[error("no skin record with id {0}")]
    MalformedId(String),

    /// Body exceeded `server.max_body_bytes`.
    #[error("Request body too large")]
    PayloadTooLarge,
}

impl ApiError {
    /// Get HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Record(RecordError::Validation(_)) => StatusCode::BAD_REQUEST,
            Self::Record(RecordError::DuplicateDate(_)) => StatusCode::CONFLICT,
            Self::Record(RecordError::NotFound(_)) | Self::MalformedId(_) => StatusCode::NOT_FOUND,
            Self::Record(RecordError::Storage(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
        }
    }
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: u16,
    #[serde(skip_serializing_if = "FieldErrors::is_empty")]
    pub fields: FieldErrors,
}

impl From<ApiError> for ErrorResponse {
    fn from(err: ApiError) -> Self {
        let code = err.status_code().as_u16();
        match err {
            ApiError::Record(RecordError::Validation(fields)) => Self {
                error: "Invalid payload".to_string(),
                code,
                fields,
            },
            ApiError::Record(RecordError::DuplicateDate(date)) => Self {
                error: format!("skin record with date {date} already exists"),
                code,
                fields: FieldErrors::single("date", DUPLICATE_DATE_MESSAGE),
            },
            ApiError::Record(RecordError::Storage(_)) => Self {
                error: "Internal server error".to_string(),
                code,
                fields: FieldErrors::new(),
            },
            other => Self {
                error: other.to_string(),
                code,
                fields: FieldErrors::new(),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let Self::Record(err) = &self {
            if !err.is_client_error() {
                error!(error = %format!("{err:#}"), "Record operation failed");
            }
        }
        let status = self.status_code();
        let body = Json(ErrorResponse::from(self));
        (status, body).into_response()
    }
}
