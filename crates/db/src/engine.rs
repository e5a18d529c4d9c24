//! Onboarding engine: transactional orchestration of onboarding runs.
//!
//! Every mutating operation runs as one transaction. Step mutations lock
//! the progress row with `SELECT ... FOR UPDATE` before touching child
//! rows, so concurrent calls on the same run serialize; starting a run
//! locks the employee row and is backstopped by the partial unique index
//! on active progress. Transition rules and aggregate math live in
//! `hrx-core`; this module loads snapshots, applies the pure functions,
//! and persists the outcome.

use chrono::{Duration, NaiveDate, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use thiserror::Error;
use tracing::info;

use hrx_core::error::CoreError;
use hrx_core::rollup::{self, OverallStatus};
use hrx_core::step_lifecycle::{self, StepStatus, StepView};
use hrx_core::summary;
use hrx_core::types::DbId;

use crate::models::employee::Employee;
use crate::models::notification::kind;
use crate::models::progress::{
    CompleteStep, OnboardingDashboard, OnboardingProgress, ProgressDetail, StartOnboarding,
    StepStatusDto, StepStatusRow,
};
use crate::models::template::OnboardingTemplate;
use crate::repositories::employee_repo::EmployeeRepo;
use crate::repositories::notification_repo::NotificationRepo;
use crate::repositories::progress_repo::ProgressRepo;
use crate::repositories::template_repo::TemplateRepo;

const DASHBOARD_OVERDUE_LIMIT: i64 = 50;
const DASHBOARD_COMPLETIONS_LIMIT: i64 = 10;

/// Failures surfaced by engine operations.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Domain(#[from] CoreError),
    #[error(transparent)]
    Db(#[from] sqlx::Error),
}

/// Transactional orchestrator for onboarding runs.
pub struct OnboardingEngine;

impl OnboardingEngine {
    /// Start an onboarding run for an employee.
    ///
    /// Resolves the template (explicit id, best attribute match, or the
    /// organization default), instantiates one step-status row per
    /// template step with the behavior fields frozen in, and marks the
    /// employee in progress. Fails `Conflict` if a non-completed run
    /// already exists.
    pub async fn start_onboarding(
        pool: &PgPool,
        organization_id: DbId,
        employee_id: DbId,
        input: &StartOnboarding,
    ) -> Result<ProgressDetail, EngineError> {
        let mut tx = pool.begin().await?;

        let employee = EmployeeRepo::find_by_id_for_update(&mut tx, organization_id, employee_id)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "employee",
                id: employee_id,
            })?;

        if ProgressRepo::find_active_by_employee(&mut *tx, employee_id)
            .await?
            .is_some()
        {
            return Err(CoreError::Conflict(format!(
                "Employee {} already has an active onboarding",
                employee_id
            ))
            .into());
        }

        let template = Self::resolve_template(pool, organization_id, &employee, input).await?;
        let steps = TemplateRepo::load_steps(pool, template.id).await?;
        if steps.is_empty() {
            return Err(CoreError::Validation(format!(
                "Template '{}' has no steps",
                template.name
            ))
            .into());
        }

        let today = Utc::now().date_naive();
        let target = today + Duration::days(template.target_completion_days as i64);

        let progress = ProgressRepo::create(
            &mut tx,
            organization_id,
            employee_id,
            template.id,
            target,
            steps.len() as i32,
        )
        .await?;

        for step in &steps {
            let due = today + Duration::days(step.step.due_by_days as i64);
            ProgressRepo::create_step_status(&mut tx, progress.id, &step.step, due).await?;
        }

        EmployeeRepo::set_onboarding_status(&mut tx, employee_id, "in_progress").await?;

        if template.send_welcome_email {
            NotificationRepo::create(
                &mut tx,
                organization_id,
                employee_id,
                kind::WELCOME,
                "Welcome aboard!",
                &format!(
                    "Hi {}, your onboarding '{}' has started. Target completion: {}.",
                    employee.full_name(),
                    template.name,
                    target
                ),
            )
            .await?;
        }

        tx.commit().await?;
        info!(
            progress_id = progress.id,
            employee_id,
            template_id = template.id,
            total_steps = steps.len(),
            "onboarding started"
        );

        Self::assemble_detail(pool, progress).await
    }

    async fn resolve_template(
        pool: &PgPool,
        organization_id: DbId,
        employee: &Employee,
        input: &StartOnboarding,
    ) -> Result<OnboardingTemplate, EngineError> {
        if let Some(template_id) = input.template_id {
            let template = TemplateRepo::find_by_id(pool, organization_id, template_id)
                .await?
                .ok_or(CoreError::NotFound {
                    entity: "onboarding_template",
                    id: template_id,
                })?;
            if !template.is_active {
                return Err(
                    CoreError::Validation(format!("Template '{}' is not active", template.name))
                        .into(),
                );
            }
            return Ok(template);
        }

        if let Some(template) = TemplateRepo::find_best_match(
            pool,
            organization_id,
            employee.employment_type.as_deref(),
            employee.department_id,
            employee.country_code.as_deref(),
        )
        .await?
        {
            return Ok(template);
        }
        if let Some(template) = TemplateRepo::find_default(pool, organization_id).await? {
            return Ok(template);
        }
        Err(CoreError::Validation(
            "No active onboarding template matches this employee and no default is configured"
                .to_string(),
        )
        .into())
    }

    /// Fetch an employee's progress record: the active run if one exists,
    /// otherwise the most recently started one.
    pub async fn get_progress_for_employee(
        pool: &PgPool,
        organization_id: DbId,
        employee_id: DbId,
    ) -> Result<ProgressDetail, EngineError> {
        let employee = EmployeeRepo::find_by_id(pool, organization_id, employee_id)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "employee",
                id: employee_id,
            })?;

        let progress = match ProgressRepo::find_active_by_employee(pool, employee.id).await? {
            Some(p) => p,
            None => ProgressRepo::find_latest_by_employee(pool, employee.id)
                .await?
                .ok_or(CoreError::NotFound {
                    entity: "onboarding_progress",
                    id: employee_id,
                })?,
        };
        Self::assemble_detail(pool, progress).await
    }

    /// Begin a step: `pending` (or dependency-blocked) to `in_progress`.
    ///
    /// When the dependency gate fails the step is instead forced to
    /// `blocked` with the blocking step recorded; that write and the
    /// rollup commit even though the call reports the error.
    pub async fn begin_step(
        pool: &PgPool,
        organization_id: DbId,
        progress_id: DbId,
        step_status_id: DbId,
    ) -> Result<ProgressDetail, EngineError> {
        let mut tx = pool.begin().await?;
        let progress = Self::lock_progress(&mut tx, organization_id, progress_id).await?;
        let (rows, views) = Self::load_views(&mut tx, progress_id).await?;
        let (row, view) = Self::find_step(&rows, &views, step_status_id)?;

        step_lifecycle::validate_begin(view)?;

        if let Some(blocker) = step_lifecycle::find_blocker(view, &views) {
            let gate_error = step_lifecycle::dependency_error(view, blocker);
            let reason = format!("Waiting on step '{}'", blocker.step_name);
            ProgressRepo::mark_step_blocked(&mut tx, row.id, Some(&reason), Some(blocker.step_id))
                .await?;
            Self::finish_rollup(&mut tx, &progress).await?;
            tx.commit().await?;
            info!(
                progress_id,
                step_status_id,
                blocked_by = blocker.step_id,
                "step begin gated, forced to blocked"
            );
            return Err(gate_error.into());
        }

        ProgressRepo::mark_step_in_progress(&mut tx, row.id, Utc::now()).await?;
        let progress = Self::finish_rollup(&mut tx, &progress).await?;
        tx.commit().await?;
        info!(progress_id, step_status_id, "step started");

        Self::assemble_detail(pool, progress).await
    }

    /// Complete a step, unblocking its dependents (step-number ascending).
    ///
    /// Allowed from `in_progress`, or from `pending` for steps flagged
    /// auto-complete-on-data; the pending path is subject to the same
    /// dependency gate as `begin`, including the forced block.
    pub async fn complete_step(
        pool: &PgPool,
        organization_id: DbId,
        progress_id: DbId,
        step_status_id: DbId,
        input: &CompleteStep,
    ) -> Result<ProgressDetail, EngineError> {
        let mut tx = pool.begin().await?;
        let progress = Self::lock_progress(&mut tx, organization_id, progress_id).await?;
        let (rows, views) = Self::load_views(&mut tx, progress_id).await?;
        let (row, view) = Self::find_step(&rows, &views, step_status_id)?;

        step_lifecycle::validate_complete(view)?;

        if view.status == StepStatus::Pending {
            if let Some(blocker) = step_lifecycle::find_blocker(view, &views) {
                let gate_error = step_lifecycle::dependency_error(view, blocker);
                let reason = format!("Waiting on step '{}'", blocker.step_name);
                ProgressRepo::mark_step_blocked(
                    &mut tx,
                    row.id,
                    Some(&reason),
                    Some(blocker.step_id),
                )
                .await?;
                Self::finish_rollup(&mut tx, &progress).await?;
                tx.commit().await?;
                return Err(gate_error.into());
            }
        }

        let now = Utc::now();
        ProgressRepo::mark_step_completed(
            &mut tx,
            row.id,
            now,
            input.completed_by.as_deref(),
            input.notes.as_deref(),
        )
        .await?;

        for dependent_step_id in step_lifecycle::unblock_candidates(view.step_id, &views) {
            let dependent = rows
                .iter()
                .find(|r| r.step_id == dependent_step_id)
                .ok_or(CoreError::NotFound {
                    entity: "step_status",
                    id: dependent_step_id,
                })?;
            ProgressRepo::mark_step_pending(&mut tx, dependent.id).await?;
            info!(
                progress_id,
                step_status_id = dependent.id,
                "dependent step unblocked"
            );
        }

        let progress = Self::finish_rollup(&mut tx, &progress).await?;
        tx.commit().await?;
        info!(progress_id, step_status_id, "step completed");

        Self::assemble_detail(pool, progress).await
    }

    /// Skip a step. Only permitted when the step's can-be-skipped flag is
    /// set; the step's percentage is left unchanged, so a skipped step
    /// contributes no completion credit and does not satisfy dependents.
    pub async fn skip_step(
        pool: &PgPool,
        organization_id: DbId,
        progress_id: DbId,
        step_status_id: DbId,
        reason: Option<&str>,
    ) -> Result<ProgressDetail, EngineError> {
        let mut tx = pool.begin().await?;
        let progress = Self::lock_progress(&mut tx, organization_id, progress_id).await?;
        let (rows, views) = Self::load_views(&mut tx, progress_id).await?;
        let (row, view) = Self::find_step(&rows, &views, step_status_id)?;

        step_lifecycle::validate_skip(view)?;

        ProgressRepo::mark_step_skipped(&mut tx, row.id, Utc::now(), reason).await?;
        let progress = Self::finish_rollup(&mut tx, &progress).await?;
        tx.commit().await?;
        info!(progress_id, step_status_id, "step skipped");

        Self::assemble_detail(pool, progress).await
    }

    /// Manually block a step with a free-text reason. Manual blocks carry
    /// no blocking-step reference and must be cleared with `unblock`.
    pub async fn block_step(
        pool: &PgPool,
        organization_id: DbId,
        progress_id: DbId,
        step_status_id: DbId,
        reason: Option<&str>,
    ) -> Result<ProgressDetail, EngineError> {
        let mut tx = pool.begin().await?;
        let progress = Self::lock_progress(&mut tx, organization_id, progress_id).await?;
        let (rows, views) = Self::load_views(&mut tx, progress_id).await?;
        let (row, view) = Self::find_step(&rows, &views, step_status_id)?;

        step_lifecycle::validate_block(view)?;

        ProgressRepo::mark_step_blocked(&mut tx, row.id, reason, None).await?;
        let progress = Self::finish_rollup(&mut tx, &progress).await?;
        tx.commit().await?;
        info!(progress_id, step_status_id, "step blocked");

        Self::assemble_detail(pool, progress).await
    }

    /// Unblock a step back to `pending`. Fails `DependencyNotSatisfied`
    /// when the dependency gate still does not pass.
    pub async fn unblock_step(
        pool: &PgPool,
        organization_id: DbId,
        progress_id: DbId,
        step_status_id: DbId,
    ) -> Result<ProgressDetail, EngineError> {
        let mut tx = pool.begin().await?;
        let progress = Self::lock_progress(&mut tx, organization_id, progress_id).await?;
        let (rows, views) = Self::load_views(&mut tx, progress_id).await?;
        let (row, view) = Self::find_step(&rows, &views, step_status_id)?;

        step_lifecycle::validate_unblock(view)?;
        if let Some(blocker) = step_lifecycle::find_blocker(view, &views) {
            return Err(step_lifecycle::dependency_error(view, blocker).into());
        }

        ProgressRepo::mark_step_pending(&mut tx, row.id).await?;
        let progress = Self::finish_rollup(&mut tx, &progress).await?;
        tx.commit().await?;
        info!(progress_id, step_status_id, "step unblocked");

        Self::assemble_detail(pool, progress).await
    }

    /// Organization-level dashboard: active run count, mean progress,
    /// currently-overdue steps, and recent completions.
    pub async fn dashboard(
        pool: &PgPool,
        organization_id: DbId,
    ) -> Result<OnboardingDashboard, EngineError> {
        let today = Utc::now().date_naive();
        let ((active_onboarding, average_progress), overdue_steps, recent_completions) =
            futures::try_join!(
                ProgressRepo::active_stats(pool, organization_id),
                ProgressRepo::list_overdue_steps(
                    pool,
                    organization_id,
                    today,
                    DASHBOARD_OVERDUE_LIMIT
                ),
                ProgressRepo::list_recent_completions(
                    pool,
                    organization_id,
                    DASHBOARD_COMPLETIONS_LIMIT
                ),
            )?;
        Ok(OnboardingDashboard {
            active_onboarding,
            average_progress,
            overdue_steps,
            recent_completions,
        })
    }

    // -- internals --

    async fn lock_progress(
        tx: &mut Transaction<'_, Postgres>,
        organization_id: DbId,
        progress_id: DbId,
    ) -> Result<OnboardingProgress, EngineError> {
        ProgressRepo::find_by_id_for_update(tx, organization_id, progress_id)
            .await?
            .ok_or_else(|| {
                CoreError::NotFound {
                    entity: "onboarding_progress",
                    id: progress_id,
                }
                .into()
            })
    }

    async fn load_views(
        tx: &mut Transaction<'_, Postgres>,
        progress_id: DbId,
    ) -> Result<(Vec<StepStatusRow>, Vec<StepView>), EngineError> {
        let rows = ProgressRepo::load_step_statuses(&mut **tx, progress_id).await?;
        let views = rows
            .iter()
            .map(StepStatusRow::to_view)
            .collect::<Result<Vec<_>, _>>()?;
        Ok((rows, views))
    }

    fn find_step<'a>(
        rows: &'a [StepStatusRow],
        views: &'a [StepView],
        step_status_id: DbId,
    ) -> Result<(&'a StepStatusRow, &'a StepView), EngineError> {
        rows.iter()
            .position(|r| r.id == step_status_id)
            .map(|i| (&rows[i], &views[i]))
            .ok_or_else(|| {
                CoreError::NotFound {
                    entity: "step_status",
                    id: step_status_id,
                }
                .into()
            })
    }

    /// Recompute the aggregate view from the post-mutation step rows and
    /// write it onto the progress row. On the transition into `completed`
    /// this also stamps `completed_at`, promotes the employee's
    /// onboarding status, and records the completion notification.
    async fn finish_rollup(
        tx: &mut Transaction<'_, Postgres>,
        progress: &OnboardingProgress,
    ) -> Result<OnboardingProgress, EngineError> {
        let now = Utc::now();
        let (_, views) = Self::load_views(tx, progress.id).await?;
        let rollup = rollup::recompute(&views, now.date_naive());

        let just_completed = rollup.overall_status == OverallStatus::Completed
            && progress.overall_status != OverallStatus::Completed.as_str();
        let completed_at = match rollup.overall_status {
            OverallStatus::Completed => progress.completed_at.or(Some(now)),
            _ => None,
        };

        let updated = ProgressRepo::apply_rollup(tx, progress.id, &rollup, completed_at).await?;

        if just_completed {
            EmployeeRepo::set_onboarding_status(tx, progress.employee_id, "completed").await?;
            NotificationRepo::create(
                tx,
                progress.organization_id,
                progress.employee_id,
                kind::ONBOARDING_COMPLETED,
                "Onboarding completed",
                "Congratulations, you have completed all onboarding steps.",
            )
            .await?;
            info!(
                progress_id = progress.id,
                employee_id = progress.employee_id,
                "onboarding completed"
            );
        }
        Ok(updated)
    }

    /// Build the presentation DTO: step statuses in step-number order
    /// with fresh overdue flags, blocking-step names, and the projected
    /// summary fields.
    async fn assemble_detail(
        pool: &PgPool,
        progress: OnboardingProgress,
    ) -> Result<ProgressDetail, EngineError> {
        let employee_name: String = sqlx::query_scalar(
            "SELECT first_name || ' ' || last_name FROM employees WHERE id = $1",
        )
        .bind(progress.employee_id)
        .fetch_one(pool)
        .await?;
        let template_name: String =
            sqlx::query_scalar("SELECT name FROM onboarding_templates WHERE id = $1")
                .bind(progress.template_id)
                .fetch_one(pool)
                .await?;

        let rows = ProgressRepo::load_step_statuses(pool, progress.id).await?;
        let views = rows
            .iter()
            .map(StepStatusRow::to_view)
            .collect::<Result<Vec<_>, CoreError>>()?;

        let today = Utc::now().date_naive();
        let step_statuses = rows
            .iter()
            .zip(&views)
            .map(|(row, view)| {
                let blocked_by_step_name = row.blocked_by_step_id.and_then(|id| {
                    rows.iter()
                        .find(|r| r.step_id == id)
                        .map(|r| r.step_name.clone())
                });
                StepStatusDto {
                    row: row.clone(),
                    is_overdue: step_lifecycle::is_overdue(view.status, view.due_date, today),
                    blocked_by_step_name,
                }
            })
            .collect();

        let summary = summary::project(
            progress.started_at.date_naive(),
            progress.target_completion_date,
            progress.overall_percentage,
            &views,
            today,
        );

        Ok(ProgressDetail {
            progress,
            employee_name,
            template_name,
            step_statuses,
            summary,
        })
    }
}
