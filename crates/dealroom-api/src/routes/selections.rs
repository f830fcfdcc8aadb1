//! # Selection API
//!
//! Each party records an option, priority (1-5) and flexibility (1-5) per
//! clause, then submits. Once submitted, a party's selections are frozen.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::routing::{post, put};
use axum::{Json, Router};
use dealroom_core::{ClauseId, Flexibility, OptionId, Priority};
use dealroom_state::SelectionInput;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::CallerIdentity;
use crate::error::AppError;
use crate::extractors::{extract_json, extract_validated_json, extract_version, Validate, VersionQuery};
use crate::routes::deal_id;
use crate::state::AppState;

const MAX_BULK_SELECTIONS: usize = 200;

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct SelectionRequest {
    pub clause_id: Uuid,
    pub option_id: String,
    /// 1 (low) to 5 (high).
    pub priority: i64,
    /// 1 (rigid) to 5 (flexible).
    pub flexibility: i64,
}

impl SelectionRequest {
    fn into_input(self) -> Result<SelectionInput, AppError> {
        Ok(SelectionInput {
            clause_id: ClauseId::from_uuid(self.clause_id),
            option_id: OptionId::new(self.option_id)?,
            priority: Priority::new(self.priority)?,
            flexibility: Flexibility::new(self.flexibility)?,
        })
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct BulkSelectionRequest {
    pub selections: Vec<SelectionRequest>,
}

impl Validate for BulkSelectionRequest {
    fn validate(&self) -> Result<(), String> {
        if self.selections.len() > MAX_BULK_SELECTIONS {
            return Err(format!(
                "selections must not exceed {MAX_BULK_SELECTIONS} entries"
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SelectionResponse {
    #[schema(value_type = Object)]
    pub selection: dealroom_state::Selection,
    pub version: u64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BulkSelectionResponse {
    pub saved: usize,
    pub version: u64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SubmitResponse {
    pub both_submitted: bool,
    /// Clauses agreed on submission because both parties picked the same option.
    pub agreed_on_submit: usize,
    pub deal_status: String,
    pub version: u64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MySelectionsResponse {
    pub role: String,
    pub party_status: String,
    #[schema(value_type = Vec<Object>)]
    pub selections: Vec<dealroom_state::Selection>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/v1/deals/{id}/selections",
            put(save_selection).get(my_selections),
        )
        .route("/v1/deals/{id}/selections/bulk", put(bulk_save))
        .route("/v1/deals/{id}/selections/submit", post(submit_all))
}

/// PUT /v1/deals/{id}/selections: Save or replace one selection.
#[utoipa::path(
    put,
    path = "/v1/deals/{id}/selections",
    params(("id" = Uuid, Path, description = "Deal ID"), VersionQuery),
    request_body = SelectionRequest,
    responses(
        (status = 200, description = "Selection saved", body = SelectionResponse),
        (status = 400, description = "Already submitted or option invalid for clause", body = crate::error::ErrorBody),
        (status = 422, description = "Priority or flexibility out of range", body = crate::error::ErrorBody),
    ),
    tag = "selections"
)]
pub(crate) async fn save_selection(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
    version: Result<Query<VersionQuery>, QueryRejection>,
    body: Result<Json<SelectionRequest>, JsonRejection>,
) -> Result<Json<SelectionResponse>, AppError> {
    let expected = extract_version(version)?;
    let input = extract_json(body)?.into_input()?;
    let user = caller.require_user()?;
    let committed = state.mutate_deal(deal_id(id), expected, |room| {
        room.submit_selection(user, input)
    })?;
    Ok(Json(SelectionResponse {
        selection: committed.value,
        version: committed.room.version(),
    }))
}

/// PUT /v1/deals/{id}/selections/bulk: Save several selections atomically.
#[utoipa::path(
    put,
    path = "/v1/deals/{id}/selections/bulk",
    params(("id" = Uuid, Path, description = "Deal ID"), VersionQuery),
    request_body = BulkSelectionRequest,
    responses(
        (status = 200, description = "All selections saved", body = BulkSelectionResponse),
        (status = 400, description = "One entry invalid; nothing saved", body = crate::error::ErrorBody),
    ),
    tag = "selections"
)]
pub(crate) async fn bulk_save(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
    version: Result<Query<VersionQuery>, QueryRejection>,
    body: Result<Json<BulkSelectionRequest>, JsonRejection>,
) -> Result<Json<BulkSelectionResponse>, AppError> {
    let expected = extract_version(version)?;
    let req = extract_validated_json(body)?;
    let inputs = req
        .selections
        .into_iter()
        .map(SelectionRequest::into_input)
        .collect::<Result<Vec<_>, _>>()?;
    let user = caller.require_user()?;
    let committed = state.mutate_deal(deal_id(id), expected, |room| {
        room.bulk_save_selections(user, &inputs)
    })?;
    Ok(Json(BulkSelectionResponse {
        saved: committed.value,
        version: committed.room.version(),
    }))
}

/// POST /v1/deals/{id}/selections/submit: Freeze the caller's selections.
#[utoipa::path(
    post,
    path = "/v1/deals/{id}/selections/submit",
    params(("id" = Uuid, Path, description = "Deal ID"), VersionQuery),
    responses(
        (status = 200, description = "Selections submitted", body = SubmitResponse),
        (status = 400, description = "A clause lacks a selection, or already submitted", body = crate::error::ErrorBody),
    ),
    tag = "selections"
)]
pub(crate) async fn submit_all(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
    version: Result<Query<VersionQuery>, QueryRejection>,
) -> Result<Json<SubmitResponse>, AppError> {
    let expected = extract_version(version)?;
    let user = caller.require_user()?;
    let committed = state.mutate_deal(deal_id(id), expected, |room| room.submit_all(user))?;
    Ok(Json(SubmitResponse {
        both_submitted: committed.value.both_submitted,
        agreed_on_submit: committed.value.agreed_on_submit,
        deal_status: committed.room.deal().status.as_str().to_string(),
        version: committed.room.version(),
    }))
}

/// GET /v1/deals/{id}/selections: The caller's own selections.
///
/// The counterpart's selections are never exposed.
#[utoipa::path(
    get,
    path = "/v1/deals/{id}/selections",
    params(("id" = Uuid, Path, description = "Deal ID")),
    responses(
        (status = 200, description = "Caller's selections", body = MySelectionsResponse),
        (status = 403, description = "Not a party to this deal", body = crate::error::ErrorBody),
    ),
    tag = "selections"
)]
pub(crate) async fn my_selections(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
) -> Result<Json<MySelectionsResponse>, AppError> {
    let user = caller.require_user()?;
    let room = state.read_deal(deal_id(id), &caller)?;
    let party = room.party_for_user(user)?;
    let selections = room
        .selections()
        .iter()
        .filter(|s| s.party_id == party.id)
        .cloned()
        .collect();
    Ok(Json(MySelectionsResponse {
        role: party.role.as_str().to_string(),
        party_status: party.status.as_str().to_string(),
        selections,
    }))
}
