//! # Request Extraction & Validation
//!
//! The [`Validate`] trait for request DTOs and helpers that map JSON and
//! query rejections onto [`AppError`].

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::Query;
use axum::Json;
use serde::Deserialize;
use utoipa::IntoParams;

use crate::error::AppError;

/// Business rules checked after deserialization.
pub trait Validate {
    fn validate(&self) -> Result<(), String>;
}

/// Extract a JSON body, mapping deserialization errors to [`AppError::BadRequest`].
///
/// ```ignore
/// async fn handler(body: Result<Json<T>, JsonRejection>) -> Result<..., AppError> {
///     let req = extract_json(body)?;
/// }
/// ```
pub fn extract_json<T>(result: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    result
        .map(|Json(v)| v)
        .map_err(|err| AppError::BadRequest(err.body_text()))
}

/// Extract a JSON body and run its [`Validate`] rules (422 on failure).
pub fn extract_validated_json<T: Validate>(
    result: Result<Json<T>, JsonRejection>,
) -> Result<T, AppError> {
    let value = extract_json(result)?;
    value.validate().map_err(AppError::Validation)?;
    Ok(value)
}

/// Optional optimistic-concurrency token accepted by every mutating route.
#[derive(Debug, Clone, Copy, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct VersionQuery {
    /// Version the caller last read. A mismatch is rejected with 409.
    pub expected_version: Option<u64>,
}

/// Extract the version query, mapping rejections to [`AppError::BadRequest`].
pub fn extract_version(result: Result<Query<VersionQuery>, QueryRejection>) -> Result<Option<u64>, AppError> {
    result
        .map(|Query(q)| q.expected_version)
        .map_err(|err| AppError::BadRequest(err.body_text()))
}

/// Reject blank or oversized free-text fields.
pub(crate) fn check_text(field: &str, value: &str, max: usize) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("{field} must not be empty"));
    }
    if value.len() > max {
        return Err(format!("{field} must not exceed {max} characters"));
    }
    Ok(())
}
