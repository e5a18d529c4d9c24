//! Route definitions and handlers for organization-scoped onboarding
//! templates, their steps, and checklist items.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use validator::Validate;

use hrx_core::error::CoreError;
use hrx_core::pagination::{clamp_limit, clamp_offset, DEFAULT_LIST_LIMIT, MAX_LIST_LIMIT};
use hrx_core::templates::{
    validate_checklist_rule, validate_step_ordering, validate_target_completion_days,
    validate_vocabulary, ChecklistRule, StepOrdering, ASSIGNMENT_TARGETS, CHECKLIST_ITEM_TYPES,
    STEP_CATEGORIES, STEP_TYPES,
};
use hrx_core::types::DbId;
use hrx_db::models::template::{CreateStep, CreateTemplate, UpdateTemplate};
use hrx_db::repositories::template_repo::TemplateRepo;

use crate::error::{AppError, AppResult};
use crate::query::PaginationParams;
use crate::response::DataResponse;
use crate::state::AppState;

/// Routes mounted at `/organizations/{org_id}/templates`.
///
/// ```text
/// GET    /            -> list
/// POST   /            -> create
/// GET    /match       -> find_match (best match for attributes)
/// GET    /{id}        -> get_by_id (with steps + checklist items)
/// PUT    /{id}        -> update
/// DELETE /{id}        -> delete
/// POST   /{id}/steps  -> add_step
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/match", get(find_match))
        .route("/{id}", get(get_by_id).put(update).delete(delete))
        .route("/{id}/steps", post(add_step))
}

fn validate_step(step: &CreateStep) -> AppResult<()> {
    step.validate()?;
    if let Some(category) = step.category.as_deref() {
        validate_vocabulary("category", category, STEP_CATEGORIES)?;
    }
    if let Some(step_type) = step.step_type.as_deref() {
        validate_vocabulary("step_type", step_type, STEP_TYPES)?;
    }
    if let Some(assigned_to) = step.assigned_to.as_deref() {
        validate_vocabulary("assigned_to", assigned_to, ASSIGNMENT_TARGETS)?;
    }
    for item in &step.checklist_items {
        item.validate()?;
        if let Some(item_type) = item.item_type.as_deref() {
            validate_vocabulary("item_type", item_type, CHECKLIST_ITEM_TYPES)?;
        }
        validate_checklist_rule(
            &item.name,
            &ChecklistRule {
                min_value: item.min_value,
                max_value: item.max_value,
                regex_pattern: item.regex_pattern.as_deref(),
            },
        )?;
    }
    Ok(())
}

/// POST / -- create a template, optionally with inline steps.
///
/// Step dependencies are expressed by step number and validated to point
/// at a strictly lower number before anything is written.
async fn create(
    State(state): State<AppState>,
    Path(org_id): Path<DbId>,
    Json(input): Json<CreateTemplate>,
) -> AppResult<impl IntoResponse> {
    input.validate()?;
    if let Some(days) = input.target_completion_days {
        validate_target_completion_days(days)?;
    }
    let ordering: Vec<StepOrdering> = input
        .steps
        .iter()
        .map(|s| StepOrdering {
            step_number: s.step_number,
            depends_on_step_number: s.depends_on_step_number,
        })
        .collect();
    validate_step_ordering(&ordering)?;
    for step in &input.steps {
        validate_step(step)?;
    }

    let template = TemplateRepo::create_with_steps(&state.pool, org_id, &input).await?;

    tracing::info!(
        organization_id = org_id,
        template_id = template.template.id,
        steps = template.steps.len(),
        "Template created"
    );

    Ok((StatusCode::CREATED, Json(DataResponse { data: template })))
}

/// GET / -- list an organization's templates.
async fn list(
    State(state): State<AppState>,
    Path(org_id): Path<DbId>,
    Query(params): Query<PaginationParams>,
) -> AppResult<impl IntoResponse> {
    let limit = clamp_limit(params.limit, DEFAULT_LIST_LIMIT, MAX_LIST_LIMIT);
    let offset = clamp_offset(params.offset);
    let templates = TemplateRepo::list(&state.pool, org_id, limit, offset).await?;
    Ok(Json(DataResponse { data: templates }))
}

/// Query parameters for the template match preview.
#[derive(Debug, Deserialize)]
struct MatchParams {
    employment_type: Option<String>,
    department_id: Option<DbId>,
    country_code: Option<String>,
}

/// GET /match -- preview which template would be picked for the given
/// employee attributes: best scoped match, falling back to the default.
async fn find_match(
    State(state): State<AppState>,
    Path(org_id): Path<DbId>,
    Query(params): Query<MatchParams>,
) -> AppResult<impl IntoResponse> {
    let matched = match TemplateRepo::find_best_match(
        &state.pool,
        org_id,
        params.employment_type.as_deref(),
        params.department_id,
        params.country_code.as_deref(),
    )
    .await?
    {
        Some(t) => Some(t),
        None => TemplateRepo::find_default(&state.pool, org_id).await?,
    };
    let template = matched.ok_or(AppError::Core(CoreError::NotFound {
        entity: "onboarding_template",
        id: 0,
    }))?;
    Ok(Json(DataResponse { data: template }))
}

/// GET /{id} -- fetch a template with its steps and checklist items.
async fn get_by_id(
    State(state): State<AppState>,
    Path((org_id, id)): Path<(DbId, DbId)>,
) -> AppResult<impl IntoResponse> {
    let template = TemplateRepo::find_with_steps(&state.pool, org_id, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "onboarding_template",
            id,
        }))?;
    Ok(Json(DataResponse { data: template }))
}

/// PUT /{id} -- partially update a template header.
async fn update(
    State(state): State<AppState>,
    Path((org_id, id)): Path<(DbId, DbId)>,
    Json(input): Json<UpdateTemplate>,
) -> AppResult<impl IntoResponse> {
    if let Some(days) = input.target_completion_days {
        validate_target_completion_days(days)?;
    }
    let template = TemplateRepo::update(&state.pool, org_id, id, &input)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "onboarding_template",
            id,
        }))?;
    Ok(Json(DataResponse { data: template }))
}

/// DELETE /{id} -- soft-delete a template. In-flight runs keep their
/// frozen step snapshots.
async fn delete(
    State(state): State<AppState>,
    Path((org_id, id)): Path<(DbId, DbId)>,
) -> AppResult<StatusCode> {
    let deleted = TemplateRepo::soft_delete(&state.pool, org_id, id).await?;
    if deleted {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::Core(CoreError::NotFound {
            entity: "onboarding_template",
            id,
        }))
    }
}

/// POST /{id}/steps -- append a step to an existing template.
async fn add_step(
    State(state): State<AppState>,
    Path((org_id, id)): Path<(DbId, DbId)>,
    Json(input): Json<CreateStep>,
) -> AppResult<impl IntoResponse> {
    validate_step(&input)?;

    let existing = TemplateRepo::find_with_steps(&state.pool, org_id, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "onboarding_template",
            id,
        }))?;

    let mut ordering: Vec<StepOrdering> = existing
        .steps
        .iter()
        .map(|s| StepOrdering {
            step_number: s.step.step_number,
            // existing steps contribute their numbers only; the new
            // step's dependency is what gets checked
            depends_on_step_number: None,
        })
        .collect();
    ordering.push(StepOrdering {
        step_number: input.step_number,
        depends_on_step_number: input.depends_on_step_number,
    });
    validate_step_ordering(&ordering)?;

    let step = TemplateRepo::add_step(&state.pool, id, &input).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: step })))
}
