//! Route definitions and handlers for the onboarding engine: step
//! transitions on a progress record and the organization dashboard.
//!
//! Step routes address the step-status row id returned in the progress
//! DTO. Every transition runs as one engine transaction serialized on
//! the progress row.

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;

use hrx_core::pagination::{clamp_limit, clamp_offset, DEFAULT_LIST_LIMIT, MAX_LIST_LIMIT};
use hrx_core::rollup::OverallStatus;
use hrx_core::types::DbId;
use hrx_db::engine::OnboardingEngine;
use hrx_db::models::progress::{CompleteStep, StepReason};
use hrx_db::repositories::progress_repo::ProgressRepo;

use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

/// Routes mounted at `/organizations/{org_id}/onboarding`.
///
/// ```text
/// GET  /                                          -> list
/// GET  /dashboard                                 -> dashboard
/// POST /{progress_id}/steps/{step_id}/begin       -> begin_step
/// POST /{progress_id}/steps/{step_id}/complete    -> complete_step
/// POST /{progress_id}/steps/{step_id}/skip        -> skip_step
/// POST /{progress_id}/steps/{step_id}/block       -> block_step
/// POST /{progress_id}/steps/{step_id}/unblock     -> unblock_step
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list))
        .route("/dashboard", get(dashboard))
        .route("/{progress_id}/steps/{step_id}/begin", post(begin_step))
        .route("/{progress_id}/steps/{step_id}/complete", post(complete_step))
        .route("/{progress_id}/steps/{step_id}/skip", post(skip_step))
        .route("/{progress_id}/steps/{step_id}/block", post(block_step))
        .route("/{progress_id}/steps/{step_id}/unblock", post(unblock_step))
}

/// Query parameters for the organization onboarding listing.
#[derive(Debug, Deserialize)]
struct ListParams {
    status: Option<String>,
    limit: Option<i64>,
    offset: Option<i64>,
}

/// GET / -- list the organization's onboarding runs, newest first,
/// optionally filtered by overall status.
async fn list(
    State(state): State<AppState>,
    Path(org_id): Path<DbId>,
    Query(params): Query<ListParams>,
) -> AppResult<impl IntoResponse> {
    if let Some(status) = params.status.as_deref() {
        OverallStatus::from_str_db(status)?;
    }
    let limit = clamp_limit(params.limit, DEFAULT_LIST_LIMIT, MAX_LIST_LIMIT);
    let offset = clamp_offset(params.offset);
    let runs = ProgressRepo::list_for_organization(
        &state.pool,
        org_id,
        params.status.as_deref(),
        limit,
        offset,
    )
    .await?;
    Ok(Json(DataResponse { data: runs }))
}

/// GET /dashboard -- organization onboarding statistics.
async fn dashboard(
    State(state): State<AppState>,
    Path(org_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let dashboard = OnboardingEngine::dashboard(&state.pool, org_id).await?;
    Ok(Json(DataResponse { data: dashboard }))
}

/// POST /{progress_id}/steps/{step_id}/begin -- start a step.
///
/// When the step's prerequisite is not completed the step is forced to
/// `blocked` (that write commits) and the call reports 409.
async fn begin_step(
    State(state): State<AppState>,
    Path((org_id, progress_id, step_id)): Path<(DbId, DbId, DbId)>,
) -> AppResult<impl IntoResponse> {
    let detail = OnboardingEngine::begin_step(&state.pool, org_id, progress_id, step_id).await?;
    Ok(Json(DataResponse { data: detail }))
}

/// POST /{progress_id}/steps/{step_id}/complete -- complete a step,
/// unblocking its dependents.
async fn complete_step(
    State(state): State<AppState>,
    Path((org_id, progress_id, step_id)): Path<(DbId, DbId, DbId)>,
    Json(input): Json<CompleteStep>,
) -> AppResult<impl IntoResponse> {
    let detail =
        OnboardingEngine::complete_step(&state.pool, org_id, progress_id, step_id, &input).await?;
    Ok(Json(DataResponse { data: detail }))
}

/// POST /{progress_id}/steps/{step_id}/skip -- skip a skippable step.
async fn skip_step(
    State(state): State<AppState>,
    Path((org_id, progress_id, step_id)): Path<(DbId, DbId, DbId)>,
    Json(input): Json<StepReason>,
) -> AppResult<impl IntoResponse> {
    let detail = OnboardingEngine::skip_step(
        &state.pool,
        org_id,
        progress_id,
        step_id,
        input.reason.as_deref(),
    )
    .await?;
    Ok(Json(DataResponse { data: detail }))
}

/// POST /{progress_id}/steps/{step_id}/block -- manually block a step.
async fn block_step(
    State(state): State<AppState>,
    Path((org_id, progress_id, step_id)): Path<(DbId, DbId, DbId)>,
    Json(input): Json<StepReason>,
) -> AppResult<impl IntoResponse> {
    let detail = OnboardingEngine::block_step(
        &state.pool,
        org_id,
        progress_id,
        step_id,
        input.reason.as_deref(),
    )
    .await?;
    Ok(Json(DataResponse { data: detail }))
}

/// POST /{progress_id}/steps/{step_id}/unblock -- return a blocked step
/// to `pending`, provided its dependency gate passes.
async fn unblock_step(
    State(state): State<AppState>,
    Path((org_id, progress_id, step_id)): Path<(DbId, DbId, DbId)>,
) -> AppResult<impl IntoResponse> {
    let detail = OnboardingEngine::unblock_step(&state.pool, org_id, progress_id, step_id).await?;
    Ok(Json(DataResponse { data: detail }))
}
