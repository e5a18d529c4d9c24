//! Route definitions and handlers for the `/organizations` resource.
//!
//! The organization is the tenant root; employee, template, and
//! onboarding routes nest under `/organizations/{org_id}/...`.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use validator::Validate;

use hrx_core::error::CoreError;
use hrx_core::pagination::{clamp_limit, clamp_offset, DEFAULT_LIST_LIMIT, MAX_LIST_LIMIT};
use hrx_core::types::DbId;
use hrx_db::models::organization::CreateOrganization;
use hrx_db::repositories::organization_repo::OrganizationRepo;

use crate::error::{AppError, AppResult};
use crate::query::PaginationParams;
use crate::response::DataResponse;
use crate::state::AppState;

use super::{employee, onboarding, template};

/// Routes mounted at `/organizations`.
///
/// ```text
/// GET    /            -> list
/// POST   /            -> create
/// GET    /{id}        -> get_by_id
///
/// /{org_id}/employees   -> employee routes
/// /{org_id}/templates   -> template routes
/// /{org_id}/onboarding  -> onboarding engine routes
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/{id}", get(get_by_id))
        .nest("/{org_id}/employees", employee::router())
        .nest("/{org_id}/templates", template::router())
        .nest("/{org_id}/onboarding", onboarding::router())
}

/// POST / -- create an organization.
async fn create(
    State(state): State<AppState>,
    Json(input): Json<CreateOrganization>,
) -> AppResult<impl IntoResponse> {
    input.validate()?;
    let org = OrganizationRepo::create(&state.pool, &input).await?;

    tracing::info!(organization_id = org.id, "Organization created");

    Ok((StatusCode::CREATED, Json(DataResponse { data: org })))
}

/// GET / -- list organizations, newest first.
async fn list(
    State(state): State<AppState>,
    Query(params): Query<PaginationParams>,
) -> AppResult<impl IntoResponse> {
    let limit = clamp_limit(params.limit, DEFAULT_LIST_LIMIT, MAX_LIST_LIMIT);
    let offset = clamp_offset(params.offset);
    let orgs = OrganizationRepo::list(&state.pool, limit, offset).await?;
    Ok(Json(DataResponse { data: orgs }))
}

/// GET /{id} -- fetch one organization.
async fn get_by_id(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let org = OrganizationRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "organization",
            id,
        }))?;
    Ok(Json(DataResponse { data: org }))
}
