//! # Deal Room API
//!
//! Creation (entitlement-gated), invitation, cancellation, and the read
//! models: deal view, progress summary, round history and audit trail.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use dealroom_state::{DealRoom, DealView, NewDeal, ProgressSummary, RoundHistoryEntry};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::audit::{AuditEntry, ChainIntegrity};
use crate::auth::{require_operator, CallerIdentity};
use crate::error::AppError;
use crate::extractors::{check_text, extract_validated_json, extract_version, Validate, VersionQuery};
use crate::routes::deal_id;
use crate::state::AppState;

// -- DTOs ---------------------------------------------------------------------

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateDealRequest {
    pub contract_type: String,
    pub title: String,
    /// Falls back to the template's default.
    pub governing_law: Option<String>,
    pub initiator_name: String,
    pub initiator_email: Option<String>,
}

impl Validate for CreateDealRequest {
    fn validate(&self) -> Result<(), String> {
        check_text("contract_type", &self.contract_type, 64)?;
        check_text("title", &self.title, 255)?;
        check_text("initiator_name", &self.initiator_name, 255)?;
        if let Some(law) = &self.governing_law {
            check_text("governing_law", law, 255)?;
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct InviteRequest {
    pub name: String,
    pub email: Option<String>,
}

impl Validate for InviteRequest {
    fn validate(&self) -> Result<(), String> {
        check_text("name", &self.name, 255)?;
        if let Some(email) = &self.email {
            if !email.contains('@') {
                return Err("email must contain '@'".into());
            }
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AcceptInvitationRequest {
    pub code: String,
}

impl Validate for AcceptInvitationRequest {
    fn validate(&self) -> Result<(), String> {
        check_text("code", &self.code, 128)
    }
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct CancelRequest {
    pub reason: Option<String>,
}

impl Validate for CancelRequest {
    fn validate(&self) -> Result<(), String> {
        match &self.reason {
            Some(reason) if reason.len() > 1000 => {
                Err("reason must not exceed 1000 characters".into())
            }
            _ => Ok(()),
        }
    }
}

/// Full deal view: deal, parties, clauses with their current suggestion.
#[derive(Debug, Serialize, ToSchema)]
pub struct DealResponse {
    #[schema(value_type = Object)]
    pub deal: dealroom_state::Deal,
    #[schema(value_type = Vec<Object>)]
    pub parties: Vec<dealroom_state::Party>,
    #[schema(value_type = Vec<Object>)]
    pub clauses: Vec<dealroom_state::ClauseView>,
    pub agreed_count: usize,
    pub total_clauses: usize,
    /// Pass back as `expected_version` on the next mutation.
    pub version: u64,
}

impl From<DealView> for DealResponse {
    fn from(view: DealView) -> Self {
        Self {
            deal: view.deal,
            parties: view.parties,
            clauses: view.clauses,
            agreed_count: view.agreed_count,
            total_clauses: view.total_clauses,
            version: view.version,
        }
    }
}

impl From<&DealRoom> for DealResponse {
    fn from(room: &DealRoom) -> Self {
        room.view().into()
    }
}

/// One row of the deal listing.
#[derive(Debug, Serialize, ToSchema)]
pub struct DealSummary {
    pub id: Uuid,
    pub title: String,
    pub contract_type: String,
    pub status: String,
    pub agreed_count: usize,
    pub total_clauses: usize,
    pub version: u64,
    pub created_at: String,
}

impl From<&DealRoom> for DealSummary {
    fn from(room: &DealRoom) -> Self {
        let deal = room.deal();
        Self {
            id: *deal.id.as_uuid(),
            title: deal.title.clone(),
            contract_type: deal.contract_type.clone(),
            status: deal.status.as_str().to_string(),
            agreed_count: room.agreed_count(),
            total_clauses: room.clauses().len(),
            version: room.version(),
            created_at: deal.created_at.to_iso8601(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct InvitationResponse {
    pub party_id: Uuid,
    /// Single-use code to hand to the respondent.
    pub invitation_code: String,
    pub deal_status: String,
    pub version: u64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PartyResponse {
    #[schema(value_type = Object)]
    pub party: dealroom_state::Party,
    pub version: u64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProgressResponse {
    #[schema(value_type = Object)]
    pub summary: ProgressSummary,
    pub percent_agreed: f64,
    pub deal_status: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RoundHistoryResponse {
    #[schema(value_type = Vec<Object>)]
    pub rounds: Vec<RoundHistoryEntry>,
}

// -- Router -------------------------------------------------------------------

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/deals", post(create_deal).get(list_deals))
        .route("/v1/deals/{id}", get(get_deal))
        .route("/v1/deals/{id}/invite", post(invite))
        .route("/v1/deals/{id}/accept-invitation", post(accept_invitation))
        .route("/v1/deals/{id}/cancel", post(cancel_deal))
        .route("/v1/deals/{id}/progress", get(progress))
        .route("/v1/deals/{id}/history", get(round_history))
        .route("/v1/deals/{id}/audit", get(audit_trail))
        .route("/v1/audit/verify", get(verify_audit_chain))
}

// -- Handlers -----------------------------------------------------------------

/// POST /v1/deals: Open a deal room from a catalog template.
#[utoipa::path(
    post,
    path = "/v1/deals",
    request_body = CreateDealRequest,
    responses(
        (status = 201, description = "Deal room created", body = DealResponse),
        (status = 403, description = "Not entitled", body = crate::error::ErrorBody),
        (status = 404, description = "Unknown contract type", body = crate::error::ErrorBody),
        (status = 422, description = "Validation error", body = crate::error::ErrorBody),
    ),
    tag = "deals"
)]
pub(crate) async fn create_deal(
    State(state): State<AppState>,
    caller: CallerIdentity,
    body: Result<Json<CreateDealRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<DealResponse>), AppError> {
    let req = extract_validated_json(body)?;
    let user = caller.require_user()?;
    let room = state.create_deal(
        user,
        req.contract_type.trim(),
        NewDeal {
            title: req.title,
            governing_law: req.governing_law,
            initiator_name: req.initiator_name,
            initiator_email: req.initiator_email,
        },
    )?;
    Ok((StatusCode::CREATED, Json(DealResponse::from(&room))))
}

/// GET /v1/deals: Deals the caller is a party to (every deal for operators).
#[utoipa::path(
    get,
    path = "/v1/deals",
    responses((status = 200, description = "Visible deals, newest first", body = Vec<DealSummary>)),
    tag = "deals"
)]
pub(crate) async fn list_deals(
    State(state): State<AppState>,
    caller: CallerIdentity,
) -> Json<Vec<DealSummary>> {
    let rooms = state.visible_deals(&caller);
    Json(rooms.iter().map(DealSummary::from).collect())
}

/// GET /v1/deals/{id}: Deal view with the current suggestion per clause.
#[utoipa::path(
    get,
    path = "/v1/deals/{id}",
    params(("id" = Uuid, Path, description = "Deal ID")),
    responses(
        (status = 200, description = "Deal found", body = DealResponse),
        (status = 403, description = "Not a party to this deal", body = crate::error::ErrorBody),
        (status = 404, description = "Deal not found", body = crate::error::ErrorBody),
    ),
    tag = "deals"
)]
pub(crate) async fn get_deal(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
) -> Result<Json<DealResponse>, AppError> {
    let room = state.read_deal(deal_id(id), &caller)?;
    Ok(Json(DealResponse::from(&room)))
}

/// POST /v1/deals/{id}/invite: Invite the respondent (initiator, DRAFT only).
#[utoipa::path(
    post,
    path = "/v1/deals/{id}/invite",
    params(("id" = Uuid, Path, description = "Deal ID"), VersionQuery),
    request_body = InviteRequest,
    responses(
        (status = 201, description = "Respondent invited", body = InvitationResponse),
        (status = 400, description = "Deal is not a draft", body = crate::error::ErrorBody),
        (status = 403, description = "Not the initiator", body = crate::error::ErrorBody),
        (status = 409, description = "Stale version", body = crate::error::ErrorBody),
    ),
    tag = "deals"
)]
pub(crate) async fn invite(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
    version: Result<Query<VersionQuery>, QueryRejection>,
    body: Result<Json<InviteRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<InvitationResponse>), AppError> {
    let expected = extract_version(version)?;
    let req = extract_validated_json(body)?;
    let user = caller.require_user()?;
    let committed = state.mutate_deal(deal_id(id), expected, |room| {
        room.invite(user, &req.name, req.email)
    })?;
    let party = committed.value;
    let invitation_code = party
        .invitation_code
        .ok_or_else(|| AppError::Internal("invited party has no invitation code".into()))?;
    Ok((
        StatusCode::CREATED,
        Json(InvitationResponse {
            party_id: *party.id.as_uuid(),
            invitation_code,
            deal_status: committed.room.deal().status.as_str().to_string(),
            version: committed.room.version(),
        }),
    ))
}

/// POST /v1/deals/{id}/accept-invitation: Link the caller to the respondent party.
#[utoipa::path(
    post,
    path = "/v1/deals/{id}/accept-invitation",
    params(("id" = Uuid, Path, description = "Deal ID"), VersionQuery),
    request_body = AcceptInvitationRequest,
    responses(
        (status = 200, description = "Invitation accepted", body = PartyResponse),
        (status = 400, description = "Wrong code or already accepted", body = crate::error::ErrorBody),
    ),
    tag = "deals"
)]
pub(crate) async fn accept_invitation(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
    version: Result<Query<VersionQuery>, QueryRejection>,
    body: Result<Json<AcceptInvitationRequest>, JsonRejection>,
) -> Result<Json<PartyResponse>, AppError> {
    let expected = extract_version(version)?;
    let req = extract_validated_json(body)?;
    let user = caller.require_user()?;
    let committed = state.mutate_deal(deal_id(id), expected, |room| {
        room.accept_invitation(user, req.code.trim())
    })?;
    Ok(Json(PartyResponse {
        party: committed.value,
        version: committed.room.version(),
    }))
}

/// POST /v1/deals/{id}/cancel: Cancel a deal in any non-terminal state.
#[utoipa::path(
    post,
    path = "/v1/deals/{id}/cancel",
    params(("id" = Uuid, Path, description = "Deal ID"), VersionQuery),
    request_body = CancelRequest,
    responses(
        (status = 200, description = "Deal cancelled", body = DealResponse),
        (status = 400, description = "Deal already terminal", body = crate::error::ErrorBody),
    ),
    tag = "deals"
)]
pub(crate) async fn cancel_deal(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
    version: Result<Query<VersionQuery>, QueryRejection>,
    body: Result<Json<CancelRequest>, JsonRejection>,
) -> Result<Json<DealResponse>, AppError> {
    let expected = extract_version(version)?;
    let req = extract_validated_json(body)?;
    let user = caller.require_user()?;
    let committed = state.mutate_deal(deal_id(id), expected, |room| room.cancel(user, req.reason))?;
    Ok(Json(DealResponse::from(&committed.room)))
}

/// GET /v1/deals/{id}/progress: Clause counts and latest-round satisfaction.
#[utoipa::path(
    get,
    path = "/v1/deals/{id}/progress",
    params(("id" = Uuid, Path, description = "Deal ID")),
    responses((status = 200, description = "Progress summary", body = ProgressResponse)),
    tag = "deals"
)]
pub(crate) async fn progress(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
) -> Result<Json<ProgressResponse>, AppError> {
    let room = state.read_deal(deal_id(id), &caller)?;
    let summary = room.progress();
    Ok(Json(ProgressResponse {
        percent_agreed: summary.percent_agreed(),
        deal_status: room.deal().status.as_str().to_string(),
        summary,
    }))
}

/// GET /v1/deals/{id}/history: Rounds in order with their suggestions.
#[utoipa::path(
    get,
    path = "/v1/deals/{id}/history",
    params(("id" = Uuid, Path, description = "Deal ID")),
    responses((status = 200, description = "Round history", body = RoundHistoryResponse)),
    tag = "deals"
)]
pub(crate) async fn round_history(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
) -> Result<Json<RoundHistoryResponse>, AppError> {
    let room = state.read_deal(deal_id(id), &caller)?;
    Ok(Json(RoundHistoryResponse {
        rounds: room.round_history(),
    }))
}

/// GET /v1/deals/{id}/audit: The deal's audit entries in chain order.
#[utoipa::path(
    get,
    path = "/v1/deals/{id}/audit",
    params(("id" = Uuid, Path, description = "Deal ID")),
    responses((status = 200, description = "Audit trail", body = Vec<AuditEntry>)),
    tag = "audit"
)]
pub(crate) async fn audit_trail(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<AuditEntry>>, AppError> {
    let room = state.read_deal(deal_id(id), &caller)?;
    Ok(Json(state.audit.for_deal(room.id())))
}

/// GET /v1/audit/verify: Recompute the whole hash chain. Operators only.
#[utoipa::path(
    get,
    path = "/v1/audit/verify",
    responses(
        (status = 200, description = "Chain integrity", body = ChainIntegrity),
        (status = 403, description = "Operator role required", body = crate::error::ErrorBody),
    ),
    tag = "audit"
)]
pub(crate) async fn verify_audit_chain(
    State(state): State<AppState>,
    caller: CallerIdentity,
) -> Result<Json<ChainIntegrity>, AppError> {
    require_operator(&caller)?;
    let integrity = state.audit.verify();
    if !integrity.chain_valid {
        tracing::error!(
            broken_links = integrity.broken_links,
            "audit chain verification failed"
        );
    }
    Ok(Json(integrity))
}
