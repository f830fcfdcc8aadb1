//! # OpenAPI Specification Assembly
//!
//! Collects every utoipa-documented route into one OpenAPI document served
//! at `/openapi.json`.

use axum::routing::get;
use axum::{Json, Router};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::state::AppState;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .description(Some(
                            "Bearer token of the form {role}:{user_id}:{secret}. \
                             The secret is set via the AUTH_TOKEN env var.",
                        ))
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Dealroom API",
        version = "0.1.0",
        description = "Two-party contract negotiation.\n\nEach party picks an option, priority and flexibility per clause. The compromise engine proposes a middle ground per clause, a fairness pass evens out satisfaction across the round, and parties accept, reject or counter-propose until every clause is agreed and the deal is signed.\n\nAll `/v1/*` endpoints require authentication. Health probes (`/health/*`) and `/metrics` do not."
    ),
    servers((url = "http://localhost:8080", description = "Local development server")),
    security(("bearer_auth" = [])),
    paths(
        // ── Catalog ─────────────────────────────────────────────────────
        crate::routes::catalog::list_templates,
        crate::routes::catalog::get_template,
        // ── Deals ───────────────────────────────────────────────────────
        crate::routes::deals::create_deal,
        crate::routes::deals::list_deals,
        crate::routes::deals::get_deal,
        crate::routes::deals::invite,
        crate::routes::deals::accept_invitation,
        crate::routes::deals::cancel_deal,
        crate::routes::deals::progress,
        crate::routes::deals::round_history,
        crate::routes::deals::audit_trail,
        crate::routes::deals::verify_audit_chain,
        // ── Selections ──────────────────────────────────────────────────
        crate::routes::selections::save_selection,
        crate::routes::selections::bulk_save,
        crate::routes::selections::submit_all,
        crate::routes::selections::my_selections,
        // ── Negotiation ─────────────────────────────────────────────────
        crate::routes::negotiation::generate_round,
        crate::routes::negotiation::regenerate_round,
        crate::routes::negotiation::respond_to_suggestion,
        crate::routes::negotiation::counter_propose,
        crate::routes::negotiation::list_counter_proposals,
        crate::routes::negotiation::respond_to_counter_proposal,
        // ── Signing ─────────────────────────────────────────────────────
        crate::routes::signing::initiate_signing,
        crate::routes::signing::sign,
    ),
    components(schemas(
        crate::error::ErrorBody,
        crate::error::ErrorDetail,
        crate::audit::AuditEntry,
        crate::audit::ChainIntegrity,
        crate::routes::catalog::TemplateListResponse,
        crate::routes::catalog::TemplateResponse,
        crate::routes::deals::CreateDealRequest,
        crate::routes::deals::InviteRequest,
        crate::routes::deals::AcceptInvitationRequest,
        crate::routes::deals::CancelRequest,
        crate::routes::deals::DealResponse,
        crate::routes::deals::DealSummary,
        crate::routes::deals::InvitationResponse,
        crate::routes::deals::PartyResponse,
        crate::routes::deals::ProgressResponse,
        crate::routes::deals::RoundHistoryResponse,
        crate::routes::selections::SelectionRequest,
        crate::routes::selections::BulkSelectionRequest,
        crate::routes::selections::SelectionResponse,
        crate::routes::selections::BulkSelectionResponse,
        crate::routes::selections::SubmitResponse,
        crate::routes::selections::MySelectionsResponse,
        crate::routes::negotiation::RespondRequest,
        crate::routes::negotiation::CounterProposalRequest,
        crate::routes::negotiation::CounterProposalDecision,
        crate::routes::negotiation::RoundResponse,
        crate::routes::negotiation::SuggestionResponse,
        crate::routes::negotiation::CounterProposalResponse,
        crate::routes::negotiation::CounterProposalList,
        crate::routes::negotiation::CounterDecisionResponse,
        crate::routes::signing::SignatureResponse,
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "catalog", description = "Contract templates"),
        (name = "deals", description = "Deal rooms, invitation and read models"),
        (name = "selections", description = "Per-clause selections and submission"),
        (name = "negotiation", description = "Compromise rounds and counter-proposals"),
        (name = "signing", description = "Signature gate and completion"),
        (name = "audit", description = "Hash-chained audit trail"),
    )
)]
pub struct ApiDoc;

pub fn router() -> Router<AppState> {
    Router::new().route("/openapi.json", get(openapi_json))
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
