//! # Catalog API
//!
//! Read-only access to the contract templates deals are created from.

use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use utoipa::ToSchema;

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Serialize, ToSchema)]
pub struct TemplateListResponse {
    #[schema(value_type = Vec<Object>)]
    pub templates: Vec<dealroom_catalog::TemplateSummary>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TemplateResponse {
    #[schema(value_type = Object)]
    pub template: dealroom_catalog::ContractTemplate,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/catalog/templates", get(list_templates))
        .route("/v1/catalog/templates/{contract_type}", get(get_template))
}

/// GET /v1/catalog/templates: Every template, sorted by contract type.
#[utoipa::path(
    get,
    path = "/v1/catalog/templates",
    responses((status = 200, description = "Template summaries", body = TemplateListResponse)),
    tag = "catalog"
)]
pub(crate) async fn list_templates(State(state): State<AppState>) -> Json<TemplateListResponse> {
    Json(TemplateListResponse {
        templates: state.catalog.list(),
    })
}

/// GET /v1/catalog/templates/{contract_type}: One template with its clauses and options.
#[utoipa::path(
    get,
    path = "/v1/catalog/templates/{contract_type}",
    params(("contract_type" = String, Path, description = "Contract type, e.g. mutual-nda")),
    responses(
        (status = 200, description = "Template found", body = TemplateResponse),
        (status = 404, description = "Unknown contract type", body = crate::error::ErrorBody),
    ),
    tag = "catalog"
)]
pub(crate) async fn get_template(
    State(state): State<AppState>,
    Path(contract_type): Path<String>,
) -> Result<Json<TemplateResponse>, AppError> {
    let template = state.catalog.get_template(&contract_type)?;
    Ok(Json(TemplateResponse { template }))
}
