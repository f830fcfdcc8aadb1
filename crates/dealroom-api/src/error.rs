//! # API Error Types
//!
//! Structured error type implementing `axum::response::IntoResponse`.
//! Maps deal room, catalog and validation errors to HTTP status codes with a
//! JSON body of the form `{"error": {"code", "message", "details"?}}`.
//! Internal error details are never returned to clients.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use dealroom_catalog::CatalogError;
use dealroom_state::NegotiationError;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// Structured JSON error response body.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

/// Inner error detail.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g. "NOT_FOUND", "BAD_REQUEST").
    pub code: String,
    /// Human-readable message. Precondition failures are reported verbatim.
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Application-level error type that implements [`IntoResponse`] for Axum.
#[derive(Error, Debug)]
pub enum AppError {
    /// Resource not found (404).
    #[error("{0}")]
    NotFound(String),

    /// Request body failed business validation (422).
    #[error("{0}")]
    Validation(String),

    /// Precondition violated or body unparseable (400).
    #[error("{0}")]
    BadRequest(String),

    /// Missing or invalid credentials (401).
    #[error("{0}")]
    Unauthorized(String),

    /// Not a party to the deal, wrong role, or not entitled (403).
    #[error("{0}")]
    Forbidden(String),

    /// Stale version token or round number (409).
    #[error("{0}")]
    Conflict(String),

    /// Too many requests (429).
    #[error("{0}")]
    RateLimited(String),

    /// Internal server error (500). Logged, never returned.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            Self::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR"),
            Self::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            Self::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            Self::Forbidden(_) => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            Self::Conflict(_) => (StatusCode::CONFLICT, "CONFLICT"),
            Self::RateLimited(_) => (StatusCode::TOO_MANY_REQUESTS, "RATE_LIMITED"),
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let message = match &self {
            Self::Internal(_) => {
                tracing::error!(error = %self, "internal server error");
                "An internal error occurred".to_string()
            }
            other => {
                tracing::debug!(code, error = %other, "request rejected");
                other.to_string()
            }
        };

        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message,
                details: None,
            },
        };
        (status, Json(body)).into_response()
    }
}

impl From<NegotiationError> for AppError {
    fn from(err: NegotiationError) -> Self {
        match err {
            NegotiationError::NotFound { .. } => Self::NotFound(err.to_string()),
            NegotiationError::Forbidden(msg) => Self::Forbidden(msg),
            NegotiationError::BadRequest(msg) => Self::BadRequest(msg),
            NegotiationError::Conflict(msg) => Self::Conflict(msg),
        }
    }
}

impl From<CatalogError> for AppError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::TemplateNotFound { .. } => Self::NotFound(err.to_string()),
            CatalogError::InvalidTemplate { .. } => Self::Validation(err.to_string()),
            other => Self::Internal(other.to_string()),
        }
    }
}

impl From<dealroom_core::ValidationError> for AppError {
    fn from(err: dealroom_core::ValidationError) -> Self {
        Self::Validation(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn response_parts(err: AppError) -> (StatusCode, ErrorBody) {
        let response = err.into_response();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: ErrorBody = serde_json::from_slice(&bytes).unwrap();
        (status, body)
    }

    #[test]
    fn negotiation_errors_map_to_statuses() {
        let cases = [
            (
                NegotiationError::NotFound {
                    entity: "clause",
                    id: "x".into(),
                },
                StatusCode::NOT_FOUND,
            ),
            (NegotiationError::Forbidden("no".into()), StatusCode::FORBIDDEN),
            (NegotiationError::BadRequest("no".into()), StatusCode::BAD_REQUEST),
            (NegotiationError::Conflict("no".into()), StatusCode::CONFLICT),
        ];
        for (err, status) in cases {
            assert_eq!(AppError::from(err).status_and_code().0, status);
        }
    }

    #[test]
    fn unknown_template_is_not_found() {
        let err = AppError::from(CatalogError::TemplateNotFound {
            contract_type: "lease".into(),
        });
        assert_eq!(err.status_and_code(), (StatusCode::NOT_FOUND, "NOT_FOUND"));
    }

    #[tokio::test]
    async fn precondition_message_is_verbatim() {
        let err = AppError::from(NegotiationError::BadRequest(
            "you have already submitted your selections".into(),
        ));
        let (status, body) = response_parts(err).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.error.code, "BAD_REQUEST");
        assert_eq!(body.error.message, "you have already submitted your selections");
    }

    #[tokio::test]
    async fn internal_hides_details() {
        let (status, body) = response_parts(AppError::Internal("pool exhausted".into())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.error.message, "An internal error occurred");
        assert!(body.error.details.is_none());
    }

    #[test]
    fn body_omits_empty_details() {
        let body = ErrorBody {
            error: ErrorDetail {
                code: "CONFLICT".into(),
                message: "stale".into(),
                details: None,
            },
        };
        let json = serde_json::to_string(&body).unwrap();
        assert!(!json.contains("details"));
    }
}
