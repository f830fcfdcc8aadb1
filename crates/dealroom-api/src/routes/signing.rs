//! # Signing API
//!
//! Once every clause is agreed either party may open signing; the deal
//! completes when both signatures are recorded.

use axum::extract::rejection::QueryRejection;
use axum::extract::{Path, Query, State};
use axum::routing::post;
use axum::{Json, Router};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::CallerIdentity;
use crate::error::AppError;
use crate::extractors::{extract_version, VersionQuery};
use crate::routes::deal_id;
use crate::routes::deals::DealResponse;
use crate::state::AppState;

#[derive(Debug, Serialize, ToSchema)]
pub struct SignatureResponse {
    /// True once both parties have signed.
    pub completed: bool,
    pub deal_status: String,
    pub version: u64,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/deals/{id}/signing", post(initiate_signing))
        .route("/v1/deals/{id}/signatures", post(sign))
}

/// POST /v1/deals/{id}/signing: Move an AGREED deal to SIGNING.
#[utoipa::path(
    post,
    path = "/v1/deals/{id}/signing",
    params(("id" = Uuid, Path, description = "Deal ID"), VersionQuery),
    responses(
        (status = 200, description = "Signing opened", body = DealResponse),
        (status = 400, description = "Not every clause is agreed", body = crate::error::ErrorBody),
    ),
    tag = "signing"
)]
pub(crate) async fn initiate_signing(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
    version: Result<Query<VersionQuery>, QueryRejection>,
) -> Result<Json<DealResponse>, AppError> {
    let expected = extract_version(version)?;
    let user = caller.require_user()?;
    let committed = state.mutate_deal(deal_id(id), expected, |room| room.initiate_signing(user))?;
    Ok(Json(DealResponse::from(&committed.room)))
}

/// POST /v1/deals/{id}/signatures: Record the caller's signature.
#[utoipa::path(
    post,
    path = "/v1/deals/{id}/signatures",
    params(("id" = Uuid, Path, description = "Deal ID"), VersionQuery),
    responses(
        (status = 200, description = "Signature recorded", body = SignatureResponse),
        (status = 400, description = "Not signing, or already signed", body = crate::error::ErrorBody),
    ),
    tag = "signing"
)]
pub(crate) async fn sign(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
    version: Result<Query<VersionQuery>, QueryRejection>,
) -> Result<Json<SignatureResponse>, AppError> {
    let expected = extract_version(version)?;
    let user = caller.require_user()?;
    let committed = state.mutate_deal(deal_id(id), expected, |room| room.record_signature(user))?;
    Ok(Json(SignatureResponse {
        completed: committed.value,
        deal_status: committed.room.deal().status.as_str().to_string(),
        version: committed.room.version(),
    }))
}
