//! Route definitions and handlers for organization-scoped employees,
//! including the onboarding entry points and notification reads.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use validator::Validate;

use hrx_core::error::CoreError;
use hrx_core::pagination::{clamp_limit, clamp_offset, DEFAULT_LIST_LIMIT, MAX_LIST_LIMIT};
use hrx_core::types::DbId;
use hrx_db::engine::OnboardingEngine;
use hrx_db::models::employee::CreateEmployee;
use hrx_db::models::progress::StartOnboarding;
use hrx_db::repositories::employee_repo::EmployeeRepo;
use hrx_db::repositories::notification_repo::NotificationRepo;

use crate::error::{AppError, AppResult};
use crate::query::PaginationParams;
use crate::response::DataResponse;
use crate::state::AppState;

/// Routes mounted at `/organizations/{org_id}/employees`.
///
/// ```text
/// GET    /                              -> list
/// POST   /                              -> create
/// GET    /{id}                          -> get_by_id
/// DELETE /{id}                          -> delete
///
/// POST   /{id}/onboarding               -> start_onboarding
/// GET    /{id}/onboarding               -> get_progress
///
/// GET    /{id}/notifications            -> list_notifications
/// POST   /{id}/notifications/{nid}/read -> mark_notification_read
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/{id}", get(get_by_id).delete(delete))
        .route("/{id}/onboarding", post(start_onboarding).get(get_progress))
        .route("/{id}/notifications", get(list_notifications))
        .route("/{id}/notifications/{nid}/read", post(mark_notification_read))
}

/// POST / -- create an employee.
async fn create(
    State(state): State<AppState>,
    Path(org_id): Path<DbId>,
    Json(input): Json<CreateEmployee>,
) -> AppResult<impl IntoResponse> {
    input.validate()?;
    let employee = EmployeeRepo::create(&state.pool, org_id, &input).await?;

    tracing::info!(organization_id = org_id, employee_id = employee.id, "Employee created");

    Ok((StatusCode::CREATED, Json(DataResponse { data: employee })))
}

/// GET / -- list an organization's employees.
async fn list(
    State(state): State<AppState>,
    Path(org_id): Path<DbId>,
    Query(params): Query<PaginationParams>,
) -> AppResult<impl IntoResponse> {
    let limit = clamp_limit(params.limit, DEFAULT_LIST_LIMIT, MAX_LIST_LIMIT);
    let offset = clamp_offset(params.offset);
    let employees = EmployeeRepo::list(&state.pool, org_id, limit, offset).await?;
    Ok(Json(DataResponse { data: employees }))
}

/// GET /{id} -- fetch one employee.
async fn get_by_id(
    State(state): State<AppState>,
    Path((org_id, id)): Path<(DbId, DbId)>,
) -> AppResult<impl IntoResponse> {
    let employee = EmployeeRepo::find_by_id(&state.pool, org_id, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "employee",
            id,
        }))?;
    Ok(Json(DataResponse { data: employee }))
}

/// DELETE /{id} -- soft-delete an employee.
async fn delete(
    State(state): State<AppState>,
    Path((org_id, id)): Path<(DbId, DbId)>,
) -> AppResult<StatusCode> {
    let deleted = EmployeeRepo::soft_delete(&state.pool, org_id, id).await?;
    if deleted {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::Core(CoreError::NotFound {
            entity: "employee",
            id,
        }))
    }
}

/// POST /{id}/onboarding -- start an onboarding run for the employee.
///
/// The body may carry an explicit `template_id`; otherwise the engine
/// picks the best-matching active template, falling back to the
/// organization default.
async fn start_onboarding(
    State(state): State<AppState>,
    Path((org_id, id)): Path<(DbId, DbId)>,
    Json(input): Json<StartOnboarding>,
) -> AppResult<impl IntoResponse> {
    let detail = OnboardingEngine::start_onboarding(&state.pool, org_id, id, &input).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: detail })))
}

/// GET /{id}/onboarding -- fetch the employee's progress record (active
/// run preferred, otherwise the most recent).
async fn get_progress(
    State(state): State<AppState>,
    Path((org_id, id)): Path<(DbId, DbId)>,
) -> AppResult<impl IntoResponse> {
    let detail = OnboardingEngine::get_progress_for_employee(&state.pool, org_id, id).await?;
    Ok(Json(DataResponse { data: detail }))
}

/// GET /{id}/notifications -- list the employee's notifications.
async fn list_notifications(
    State(state): State<AppState>,
    Path((org_id, id)): Path<(DbId, DbId)>,
    Query(params): Query<PaginationParams>,
) -> AppResult<impl IntoResponse> {
    let limit = clamp_limit(params.limit, DEFAULT_LIST_LIMIT, MAX_LIST_LIMIT);
    let offset = clamp_offset(params.offset);
    let notifications =
        NotificationRepo::list_for_employee(&state.pool, org_id, id, limit, offset).await?;
    Ok(Json(DataResponse { data: notifications }))
}

/// POST /{id}/notifications/{nid}/read -- mark a notification read.
async fn mark_notification_read(
    State(state): State<AppState>,
    Path((org_id, _id, nid)): Path<(DbId, DbId, DbId)>,
) -> AppResult<impl IntoResponse> {
    let notification = NotificationRepo::mark_read(&state.pool, org_id, nid)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "notification",
            id: nid,
        }))?;
    Ok(Json(DataResponse { data: notification }))
}
