//! # Negotiation API
//!
//! Compromise rounds, per-clause responses and the counter-proposal loop.
//!
//! `respond` and counter-proposal filing accept the `round_number` the
//! caller was looking at. A newer round on that clause turns the call into
//! a 409 instead of silently answering a suggestion the caller never saw.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use dealroom_core::{ClauseId, OptionId, Priority, ProposalId};
use dealroom_state::{CounterProposalInput, RoundOutcome};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::CallerIdentity;
use crate::error::AppError;
use crate::extractors::{extract_json, extract_validated_json, extract_version, Validate, VersionQuery};
use crate::routes::deal_id;
use crate::state::AppState;

#[derive(Debug, Deserialize, ToSchema)]
pub struct RespondRequest {
    pub accept: bool,
    /// Round the caller is answering.
    pub round_number: Option<u32>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CounterProposalRequest {
    pub option_id: String,
    pub rationale: Option<String>,
    /// Replaces the proposer's priority for this clause when present.
    pub priority: Option<i64>,
    pub round_number: Option<u32>,
}

impl Validate for CounterProposalRequest {
    fn validate(&self) -> Result<(), String> {
        match &self.rationale {
            Some(r) if r.len() > 2000 => Err("rationale must not exceed 2000 characters".into()),
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CounterProposalDecision {
    pub accept: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RoundResponse {
    pub round_number: u32,
    pub suggestion_count: usize,
    #[schema(value_type = Vec<Object>)]
    pub suggestions: Vec<dealroom_state::CompromiseSuggestion>,
    #[schema(value_type = Vec<String>)]
    pub agreed_clause_ids: Vec<ClauseId>,
    #[schema(value_type = Vec<String>)]
    pub counters_applied: Vec<ClauseId>,
    pub fairness_adjustments: usize,
    pub deal_status: String,
    pub version: u64,
}

impl RoundResponse {
    fn new(outcome: RoundOutcome, deal_status: &str, version: u64) -> Self {
        Self {
            round_number: outcome.round_number,
            suggestion_count: outcome.suggestion_count(),
            suggestions: outcome.suggestions,
            agreed_clause_ids: outcome.agreed_clause_ids,
            counters_applied: outcome.counters_applied,
            fairness_adjustments: outcome.fairness_adjustments,
            deal_status: deal_status.to_string(),
            version,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SuggestionResponse {
    #[schema(value_type = Object)]
    pub suggestion: dealroom_state::CompromiseSuggestion,
    pub clause_status: String,
    pub deal_status: String,
    pub version: u64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CounterProposalResponse {
    #[schema(value_type = Object)]
    pub proposal: dealroom_state::CounterProposal,
    pub version: u64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CounterProposalList {
    #[schema(value_type = Vec<Object>)]
    pub proposals: Vec<dealroom_state::CounterProposal>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CounterDecisionResponse {
    pub accepted: bool,
    pub all_agreed: bool,
    pub deal_status: String,
    pub version: u64,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/deals/{id}/rounds", post(generate_round))
        .route("/v1/deals/{id}/rounds/regenerate", post(regenerate_round))
        .route(
            "/v1/deals/{id}/clauses/{clause_id}/respond",
            post(respond_to_suggestion),
        )
        .route(
            "/v1/deals/{id}/clauses/{clause_id}/counter-proposals",
            post(counter_propose),
        )
        .route("/v1/deals/{id}/counter-proposals", get(list_counter_proposals))
        .route(
            "/v1/deals/{id}/counter-proposals/{proposal_id}/respond",
            post(respond_to_counter_proposal),
        )
}

/// POST /v1/deals/{id}/rounds: Generate a compromise round.
#[utoipa::path(
    post,
    path = "/v1/deals/{id}/rounds",
    params(("id" = Uuid, Path, description = "Deal ID"), VersionQuery),
    responses(
        (status = 201, description = "Round generated", body = RoundResponse),
        (status = 400, description = "A party has not submitted", body = crate::error::ErrorBody),
    ),
    tag = "negotiation"
)]
pub(crate) async fn generate_round(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
    version: Result<Query<VersionQuery>, QueryRejection>,
) -> Result<(StatusCode, Json<RoundResponse>), AppError> {
    let expected = extract_version(version)?;
    let user = caller.require_user()?;
    let rebalancer = state.rebalancer;
    let committed = state.mutate_deal(deal_id(id), expected, |room| {
        room.generate(user, &rebalancer)
    })?;
    let room = &committed.room;
    Ok((
        StatusCode::CREATED,
        Json(RoundResponse::new(
            committed.value,
            room.deal().status.as_str(),
            room.version(),
        )),
    ))
}

/// POST /v1/deals/{id}/rounds/regenerate: New round over open clauses,
/// honouring pending counter-proposals.
#[utoipa::path(
    post,
    path = "/v1/deals/{id}/rounds/regenerate",
    params(("id" = Uuid, Path, description = "Deal ID"), VersionQuery),
    responses(
        (status = 201, description = "Round regenerated", body = RoundResponse),
        (status = 400, description = "No round yet, or every clause agreed", body = crate::error::ErrorBody),
    ),
    tag = "negotiation"
)]
pub(crate) async fn regenerate_round(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
    version: Result<Query<VersionQuery>, QueryRejection>,
) -> Result<(StatusCode, Json<RoundResponse>), AppError> {
    let expected = extract_version(version)?;
    let user = caller.require_user()?;
    let rebalancer = state.rebalancer;
    let committed = state.mutate_deal(deal_id(id), expected, |room| {
        room.regenerate(user, &rebalancer)
    })?;
    let room = &committed.room;
    Ok((
        StatusCode::CREATED,
        Json(RoundResponse::new(
            committed.value,
            room.deal().status.as_str(),
            room.version(),
        )),
    ))
}

/// POST /v1/deals/{id}/clauses/{clause_id}/respond: Accept or reject the
/// clause's current suggestion.
#[utoipa::path(
    post,
    path = "/v1/deals/{id}/clauses/{clause_id}/respond",
    params(
        ("id" = Uuid, Path, description = "Deal ID"),
        ("clause_id" = Uuid, Path, description = "Clause ID"),
        VersionQuery
    ),
    request_body = RespondRequest,
    responses(
        (status = 200, description = "Response recorded", body = SuggestionResponse),
        (status = 404, description = "No suggestion for clause", body = crate::error::ErrorBody),
        (status = 409, description = "Suggestion is no longer current", body = crate::error::ErrorBody),
    ),
    tag = "negotiation"
)]
pub(crate) async fn respond_to_suggestion(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path((id, clause_id)): Path<(Uuid, Uuid)>,
    version: Result<Query<VersionQuery>, QueryRejection>,
    body: Result<Json<RespondRequest>, JsonRejection>,
) -> Result<Json<SuggestionResponse>, AppError> {
    let expected = extract_version(version)?;
    let req = extract_json(body)?;
    let user = caller.require_user()?;
    let clause_id = ClauseId::from_uuid(clause_id);
    let committed = state.mutate_deal(deal_id(id), expected, |room| {
        room.respond(user, clause_id, req.accept, req.round_number)
    })?;
    let room = &committed.room;
    let clause_status = room.clause(clause_id)?.status.as_str().to_string();
    Ok(Json(SuggestionResponse {
        suggestion: committed.value,
        clause_status,
        deal_status: room.deal().status.as_str().to_string(),
        version: room.version(),
    }))
}

/// POST /v1/deals/{id}/clauses/{clause_id}/counter-proposals: Propose a
/// different option than the current suggestion.
#[utoipa::path(
    post,
    path = "/v1/deals/{id}/clauses/{clause_id}/counter-proposals",
    params(
        ("id" = Uuid, Path, description = "Deal ID"),
        ("clause_id" = Uuid, Path, description = "Clause ID"),
        VersionQuery
    ),
    request_body = CounterProposalRequest,
    responses(
        (status = 201, description = "Counter-proposal filed", body = CounterProposalResponse),
        (status = 400, description = "No active round, or option equals the suggestion", body = crate::error::ErrorBody),
        (status = 409, description = "Suggestion is no longer current", body = crate::error::ErrorBody),
    ),
    tag = "negotiation"
)]
pub(crate) async fn counter_propose(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path((id, clause_id)): Path<(Uuid, Uuid)>,
    version: Result<Query<VersionQuery>, QueryRejection>,
    body: Result<Json<CounterProposalRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<CounterProposalResponse>), AppError> {
    let expected = extract_version(version)?;
    let req = extract_validated_json(body)?;
    let input = CounterProposalInput {
        clause_id: ClauseId::from_uuid(clause_id),
        option_id: OptionId::new(req.option_id)?,
        rationale: req.rationale.filter(|r| !r.trim().is_empty()),
        priority: req.priority.map(Priority::new).transpose()?,
        round_number: req.round_number,
    };
    let user = caller.require_user()?;
    let committed = state.mutate_deal(deal_id(id), expected, |room| {
        room.counter_propose(user, input)
    })?;
    Ok((
        StatusCode::CREATED,
        Json(CounterProposalResponse {
            proposal: committed.value,
            version: committed.room.version(),
        }),
    ))
}

/// GET /v1/deals/{id}/counter-proposals: Every counter-proposal on the deal.
#[utoipa::path(
    get,
    path = "/v1/deals/{id}/counter-proposals",
    params(("id" = Uuid, Path, description = "Deal ID")),
    responses((status = 200, description = "Counter-proposals, oldest first", body = CounterProposalList)),
    tag = "negotiation"
)]
pub(crate) async fn list_counter_proposals(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
) -> Result<Json<CounterProposalList>, AppError> {
    let room = state.read_deal(deal_id(id), &caller)?;
    Ok(Json(CounterProposalList {
        proposals: room.counter_proposals().to_vec(),
    }))
}

/// POST /v1/deals/{id}/counter-proposals/{proposal_id}/respond: Accept or
/// reject the counterpart's proposal.
#[utoipa::path(
    post,
    path = "/v1/deals/{id}/counter-proposals/{proposal_id}/respond",
    params(
        ("id" = Uuid, Path, description = "Deal ID"),
        ("proposal_id" = Uuid, Path, description = "Counter-proposal ID"),
        VersionQuery
    ),
    request_body = CounterProposalDecision,
    responses(
        (status = 200, description = "Decision recorded", body = CounterDecisionResponse),
        (status = 400, description = "Own proposal, or already resolved", body = crate::error::ErrorBody),
    ),
    tag = "negotiation"
)]
pub(crate) async fn respond_to_counter_proposal(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path((id, proposal_id)): Path<(Uuid, Uuid)>,
    version: Result<Query<VersionQuery>, QueryRejection>,
    body: Result<Json<CounterProposalDecision>, JsonRejection>,
) -> Result<Json<CounterDecisionResponse>, AppError> {
    let expected = extract_version(version)?;
    let req = extract_json(body)?;
    let user = caller.require_user()?;
    let proposal_id = ProposalId::from_uuid(proposal_id);
    let committed = state.mutate_deal(deal_id(id), expected, |room| {
        room.respond_to_counter_proposal(user, proposal_id, req.accept)
    })?;
    Ok(Json(CounterDecisionResponse {
        accepted: committed.value.accepted,
        all_agreed: committed.value.all_agreed,
        deal_status: committed.room.deal().status.as_str().to_string(),
        version: committed.room.version(),
    }))
}
