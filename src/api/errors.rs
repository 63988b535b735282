use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::services::assignments::AssignmentError;

#[derive(Debug, Serialize)]
struct ErrorResponse {
    status: u16,
    error: &'static str,
    detail: String,
}

#[derive(Debug)]
pub(crate) enum ApiError {
    Unauthorized(&'static str),
    Forbidden(&'static str),
    BadRequest { code: &'static str, detail: String },
    NotFound(String),
    Conflict { code: &'static str, detail: String },
    ServiceUnavailable(String),
    Internal(String),
}

impl ApiError {
    pub(crate) fn bad_request(code: &'static str, detail: impl Into<String>) -> Self {
        Self::BadRequest { code, detail: detail.into() }
    }

    /// Log the underlying error with context and return an `Internal` variant.
    pub(crate) fn internal(err: impl std::fmt::Display, context: &str) -> Self {
        tracing::error!(error = %err, "{context}");
        Self::Internal(context.to_string())
    }

    fn parts(self) -> (StatusCode, &'static str, String) {
        match self {
            ApiError::Unauthorized(message) => {
                (StatusCode::UNAUTHORIZED, "unauthorized", message.to_string())
            }
            ApiError::Forbidden(message) => {
                (StatusCode::FORBIDDEN, "forbidden", message.to_string())
            }
            ApiError::BadRequest { code, detail } => (StatusCode::BAD_REQUEST, code, detail),
            ApiError::NotFound(message) => (StatusCode::NOT_FOUND, "not_found", message),
            ApiError::Conflict { code, detail } => (StatusCode::CONFLICT, code, detail),
            ApiError::ServiceUnavailable(message) => {
                (StatusCode::SERVICE_UNAVAILABLE, "storage_unavailable", message)
            }
            ApiError::Internal(message) => (StatusCode::INTERNAL_SERVER_ERROR, "db_error", message),
        }
    }
}

impl From<AssignmentError> for ApiError {
    fn from(err: AssignmentError) -> Self {
        match err {
            AssignmentError::Validation(validation) => {
                Self::bad_request(validation.code(), validation.to_string())
            }
            AssignmentError::NotFound => Self::NotFound("Assignment not found".to_string()),
            AssignmentError::DeadlinePassed => {
                Self::bad_request("deadline_passed", "The assignment deadline has passed")
            }
            AssignmentError::AlreadySubmitted => Self::Conflict {
                code: "already_submitted",
                detail: "This assignment has already been submitted".to_string(),
            },
            AssignmentError::Unavailable => {
                tracing::error!("Assignment storage timed out");
                Self::ServiceUnavailable("Storage is temporarily unavailable".to_string())
            }
            AssignmentError::Storage(err) => Self::internal(err, "Assignment storage failed"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let unauthorized = matches!(self, ApiError::Unauthorized(_));
        let (status, error, detail) = self.parts();
        let mut response =
            (status, Json(ErrorResponse { status: status.as_u16(), error, detail })).into_response();

        if unauthorized {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        response
    }
}
