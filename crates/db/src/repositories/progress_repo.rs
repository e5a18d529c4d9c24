//! Repository for the `onboarding_progress` and `onboarding_step_statuses`
//! tables. Mutating methods take a transaction; the engine owns the
//! transaction boundary and the FOR UPDATE lock on the progress row.

use chrono::NaiveDate;
use sqlx::{PgExecutor, PgPool, Postgres, Transaction};

use hrx_core::rollup::ProgressRollup;
use hrx_core::types::{DbId, Timestamp};

use crate::models::progress::{
    OnboardingProgress, OverdueStepEntry, ProgressListEntry, StepStatusRow,
};
use crate::models::template::OnboardingStep;

const COLUMNS: &str = "id, organization_id, employee_id, template_id, \
     overall_status, overall_percentage, started_at, target_completion_date, \
     completed_at, total_steps, completed_steps, pending_steps, overdue_steps, \
     skipped_steps, created_at, updated_at";

const STATUS_COLUMNS: &str = "id, progress_id, step_id, step_number, step_code, \
     step_name, can_be_skipped, auto_complete_on_data, depends_on_step_id, \
     status, percentage, due_date, started_at, completed_at, completed_by, \
     completion_notes, blocked_reason, blocked_by_step_id, created_at, updated_at";

/// Provides persistence for onboarding runs and their step statuses.
pub struct ProgressRepo;

impl ProgressRepo {
    /// Insert a new progress row for an employee.
    pub async fn create(
        tx: &mut Transaction<'_, Postgres>,
        organization_id: DbId,
        employee_id: DbId,
        template_id: DbId,
        target_completion_date: NaiveDate,
        total_steps: i32,
    ) -> Result<OnboardingProgress, sqlx::Error> {
        let query = format!(
            "INSERT INTO onboarding_progress \
                (organization_id, employee_id, template_id, \
                 target_completion_date, total_steps, pending_steps) \
             VALUES ($1, $2, $3, $4, $5, $5) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, OnboardingProgress>(&query)
            .bind(organization_id)
            .bind(employee_id)
            .bind(template_id)
            .bind(target_completion_date)
            .bind(total_steps)
            .fetch_one(&mut **tx)
            .await
    }

    /// Instantiate a step-status row, snapshotting the template step's
    /// behavioral fields.
    pub async fn create_step_status(
        tx: &mut Transaction<'_, Postgres>,
        progress_id: DbId,
        step: &OnboardingStep,
        due_date: NaiveDate,
    ) -> Result<StepStatusRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO onboarding_step_statuses \
                (progress_id, step_id, step_number, step_code, step_name, \
                 can_be_skipped, auto_complete_on_data, depends_on_step_id, due_date) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             RETURNING {STATUS_COLUMNS}"
        );
        sqlx::query_as::<_, StepStatusRow>(&query)
            .bind(progress_id)
            .bind(step.id)
            .bind(step.step_number)
            .bind(&step.code)
            .bind(&step.name)
            .bind(step.can_be_skipped)
            .bind(step.auto_complete_on_data)
            .bind(step.depends_on_step_id)
            .bind(due_date)
            .fetch_one(&mut **tx)
            .await
    }

    /// Find a progress row by ID within an organization.
    pub async fn find_by_id(
        pool: &PgPool,
        organization_id: DbId,
        id: DbId,
    ) -> Result<Option<OnboardingProgress>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM onboarding_progress \
             WHERE id = $1 AND organization_id = $2"
        );
        sqlx::query_as::<_, OnboardingProgress>(&query)
            .bind(id)
            .bind(organization_id)
            .fetch_optional(pool)
            .await
    }

    /// Find a progress row and take its row lock. All step mutations go
    /// through this lock, so concurrent calls on one run serialize.
    pub async fn find_by_id_for_update(
        tx: &mut Transaction<'_, Postgres>,
        organization_id: DbId,
        id: DbId,
    ) -> Result<Option<OnboardingProgress>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM onboarding_progress \
             WHERE id = $1 AND organization_id = $2 FOR UPDATE"
        );
        sqlx::query_as::<_, OnboardingProgress>(&query)
            .bind(id)
            .bind(organization_id)
            .fetch_optional(&mut **tx)
            .await
    }

    /// Find an employee's non-completed run, if any.
    pub async fn find_active_by_employee<'e, E>(
        executor: E,
        employee_id: DbId,
    ) -> Result<Option<OnboardingProgress>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!(
            "SELECT {COLUMNS} FROM onboarding_progress \
             WHERE employee_id = $1 AND overall_status <> 'completed'"
        );
        sqlx::query_as::<_, OnboardingProgress>(&query)
            .bind(employee_id)
            .fetch_optional(executor)
            .await
    }

    /// Find an employee's most recently started run.
    pub async fn find_latest_by_employee(
        pool: &PgPool,
        employee_id: DbId,
    ) -> Result<Option<OnboardingProgress>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM onboarding_progress \
             WHERE employee_id = $1 ORDER BY started_at DESC LIMIT 1"
        );
        sqlx::query_as::<_, OnboardingProgress>(&query)
            .bind(employee_id)
            .fetch_optional(pool)
            .await
    }

    /// Load a run's step statuses in step-number order.
    pub async fn load_step_statuses<'e, E>(
        executor: E,
        progress_id: DbId,
    ) -> Result<Vec<StepStatusRow>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!(
            "SELECT {STATUS_COLUMNS} FROM onboarding_step_statuses \
             WHERE progress_id = $1 ORDER BY step_number ASC"
        );
        sqlx::query_as::<_, StepStatusRow>(&query)
            .bind(progress_id)
            .fetch_all(executor)
            .await
    }

    /// Mark a step in progress.
    pub async fn mark_step_in_progress(
        tx: &mut Transaction<'_, Postgres>,
        step_status_id: DbId,
        started_at: Timestamp,
    ) -> Result<StepStatusRow, sqlx::Error> {
        let query = format!(
            "UPDATE onboarding_step_statuses \
             SET status = 'in_progress', started_at = $2, \
                 blocked_reason = NULL, blocked_by_step_id = NULL \
             WHERE id = $1 \
             RETURNING {STATUS_COLUMNS}"
        );
        sqlx::query_as::<_, StepStatusRow>(&query)
            .bind(step_status_id)
            .bind(started_at)
            .fetch_one(&mut **tx)
            .await
    }

    /// Mark a step completed with full percentage credit.
    pub async fn mark_step_completed(
        tx: &mut Transaction<'_, Postgres>,
        step_status_id: DbId,
        completed_at: Timestamp,
        completed_by: Option<&str>,
        notes: Option<&str>,
    ) -> Result<StepStatusRow, sqlx::Error> {
        let query = format!(
            "UPDATE onboarding_step_statuses \
             SET status = 'completed', percentage = 100, completed_at = $2, \
                 started_at = COALESCE(started_at, $2), \
                 completed_by = $3, completion_notes = $4 \
             WHERE id = $1 \
             RETURNING {STATUS_COLUMNS}"
        );
        sqlx::query_as::<_, StepStatusRow>(&query)
            .bind(step_status_id)
            .bind(completed_at)
            .bind(completed_by)
            .bind(notes)
            .fetch_one(&mut **tx)
            .await
    }

    /// Mark a step skipped. Percentage is left as-is, so a skipped step
    /// contributes no completion credit.
    pub async fn mark_step_skipped(
        tx: &mut Transaction<'_, Postgres>,
        step_status_id: DbId,
        completed_at: Timestamp,
        reason: Option<&str>,
    ) -> Result<StepStatusRow, sqlx::Error> {
        let query = format!(
            "UPDATE onboarding_step_statuses \
             SET status = 'skipped', completed_at = $2, completion_notes = $3, \
                 blocked_reason = NULL, blocked_by_step_id = NULL \
             WHERE id = $1 \
             RETURNING {STATUS_COLUMNS}"
        );
        sqlx::query_as::<_, StepStatusRow>(&query)
            .bind(step_status_id)
            .bind(completed_at)
            .bind(reason)
            .fetch_one(&mut **tx)
            .await
    }

    /// Mark a step blocked. `blocked_by_step_id` is set for dependency
    /// blocks and `NULL` for manual ones.
    pub async fn mark_step_blocked(
        tx: &mut Transaction<'_, Postgres>,
        step_status_id: DbId,
        reason: Option<&str>,
        blocked_by_step_id: Option<DbId>,
    ) -> Result<StepStatusRow, sqlx::Error> {
        let query = format!(
            "UPDATE onboarding_step_statuses \
             SET status = 'blocked', blocked_reason = $2, blocked_by_step_id = $3 \
             WHERE id = $1 \
             RETURNING {STATUS_COLUMNS}"
        );
        sqlx::query_as::<_, StepStatusRow>(&query)
            .bind(step_status_id)
            .bind(reason)
            .bind(blocked_by_step_id)
            .fetch_one(&mut **tx)
            .await
    }

    /// Return a blocked step to pending, clearing block bookkeeping.
    pub async fn mark_step_pending(
        tx: &mut Transaction<'_, Postgres>,
        step_status_id: DbId,
    ) -> Result<StepStatusRow, sqlx::Error> {
        let query = format!(
            "UPDATE onboarding_step_statuses \
             SET status = 'pending', blocked_reason = NULL, blocked_by_step_id = NULL \
             WHERE id = $1 \
             RETURNING {STATUS_COLUMNS}"
        );
        sqlx::query_as::<_, StepStatusRow>(&query)
            .bind(step_status_id)
            .fetch_one(&mut **tx)
            .await
    }

    /// Write a recomputed rollup onto the progress row. Sets or clears
    /// `completed_at` to track the overall status.
    pub async fn apply_rollup(
        tx: &mut Transaction<'_, Postgres>,
        progress_id: DbId,
        rollup: &ProgressRollup,
        completed_at: Option<Timestamp>,
    ) -> Result<OnboardingProgress, sqlx::Error> {
        let query = format!(
            "UPDATE onboarding_progress \
             SET overall_status = $2, overall_percentage = $3, \
                 completed_steps = $4, pending_steps = $5, overdue_steps = $6, \
                 skipped_steps = $7, completed_at = $8 \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, OnboardingProgress>(&query)
            .bind(progress_id)
            .bind(rollup.overall_status.as_str())
            .bind(rollup.overall_percentage)
            .bind(rollup.completed_steps)
            .bind(rollup.pending_steps)
            .bind(rollup.overdue_steps)
            .bind(rollup.skipped_steps)
            .bind(completed_at)
            .fetch_one(&mut **tx)
            .await
    }

    /// List an organization's runs, newest first, optionally filtered by
    /// overall status.
    pub async fn list_for_organization(
        pool: &PgPool,
        organization_id: DbId,
        status: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<ProgressListEntry>, sqlx::Error> {
        let columns = COLUMNS
            .split(", ")
            .map(|c| format!("p.{c}"))
            .collect::<Vec<_>>()
            .join(", ");
        let query = format!(
            "SELECT {columns}, \
                    e.first_name || ' ' || e.last_name AS employee_name \
             FROM onboarding_progress p \
             JOIN employees e ON e.id = p.employee_id \
             WHERE p.organization_id = $1 \
               AND ($2::text IS NULL OR p.overall_status = $2) \
             ORDER BY p.started_at DESC \
             LIMIT $3 OFFSET $4"
        );
        sqlx::query_as::<_, ProgressListEntry>(&query)
            .bind(organization_id)
            .bind(status)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    /// Count an organization's active runs and their mean percentage.
    pub async fn active_stats(
        pool: &PgPool,
        organization_id: DbId,
    ) -> Result<(i64, i32), sqlx::Error> {
        let row: (i64, Option<f64>) = sqlx::query_as(
            "SELECT COUNT(*), AVG(overall_percentage)::float8 \
             FROM onboarding_progress \
             WHERE organization_id = $1 AND overall_status <> 'completed'",
        )
        .bind(organization_id)
        .fetch_one(pool)
        .await?;
        let average = row.1.map(|v| v.round() as i32).unwrap_or(0);
        Ok((row.0, average))
    }

    /// List currently-overdue steps across an organization's active runs,
    /// most overdue first.
    pub async fn list_overdue_steps(
        pool: &PgPool,
        organization_id: DbId,
        today: NaiveDate,
        limit: i64,
    ) -> Result<Vec<OverdueStepEntry>, sqlx::Error> {
        sqlx::query_as::<_, OverdueStepEntry>(
            "SELECT s.progress_id, p.employee_id, \
                    e.first_name || ' ' || e.last_name AS employee_name, \
                    s.step_name, s.due_date, ($3 - s.due_date)::int AS days_overdue \
             FROM onboarding_step_statuses s \
             JOIN onboarding_progress p ON p.id = s.progress_id \
             JOIN employees e ON e.id = p.employee_id \
             WHERE p.organization_id = $1 AND p.overall_status <> 'completed' \
               AND s.status IN ('pending', 'in_progress', 'blocked') \
               AND s.due_date < $3 \
             ORDER BY s.due_date ASC \
             LIMIT $2",
        )
        .bind(organization_id)
        .bind(limit)
        .bind(today)
        .fetch_all(pool)
        .await
    }

    /// List recently completed runs, newest first.
    pub async fn list_recent_completions(
        pool: &PgPool,
        organization_id: DbId,
        limit: i64,
    ) -> Result<Vec<OnboardingProgress>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM onboarding_progress \
             WHERE organization_id = $1 AND overall_status = 'completed' \
             ORDER BY completed_at DESC LIMIT $2"
        );
        sqlx::query_as::<_, OnboardingProgress>(&query)
            .bind(organization_id)
            .bind(limit)
            .fetch_all(pool)
            .await
    }
}
