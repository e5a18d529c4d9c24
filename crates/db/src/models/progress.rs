//! Onboarding progress entity models and read DTOs.
//!
//! A progress row is one employee's onboarding run; its step-status rows
//! are created once at instantiation and mutate only through the engine.
//! Step-status rows carry a frozen snapshot of the behavioral template
//! step fields (number, code, name, flags, dependency), so template edits
//! never affect runs already in flight.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use hrx_core::step_lifecycle::{StepStatus, StepView};
use hrx_core::summary::OnboardingSummary;
use hrx_core::types::{DbId, Timestamp};

// ---------------------------------------------------------------------------
// Rows
// ---------------------------------------------------------------------------

/// A row from the `onboarding_progress` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct OnboardingProgress {
    pub id: DbId,
    pub organization_id: DbId,
    pub employee_id: DbId,
    pub template_id: DbId,
    pub overall_status: String,
    pub overall_percentage: i32,
    pub started_at: Timestamp,
    pub target_completion_date: NaiveDate,
    pub completed_at: Option<Timestamp>,
    pub total_steps: i32,
    pub completed_steps: i32,
    pub pending_steps: i32,
    pub overdue_steps: i32,
    pub skipped_steps: i32,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A row from the `onboarding_step_statuses` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct StepStatusRow {
    pub id: DbId,
    pub progress_id: DbId,
    /// Template step this status was instantiated from (identity only;
    /// behavior comes from the snapshot columns below).
    pub step_id: DbId,
    pub step_number: i32,
    pub step_code: String,
    pub step_name: String,
    pub can_be_skipped: bool,
    pub auto_complete_on_data: bool,
    pub depends_on_step_id: Option<DbId>,
    pub status: String,
    pub percentage: i32,
    pub due_date: Option<NaiveDate>,
    pub started_at: Option<Timestamp>,
    pub completed_at: Option<Timestamp>,
    pub completed_by: Option<String>,
    pub completion_notes: Option<String>,
    pub blocked_reason: Option<String>,
    pub blocked_by_step_id: Option<DbId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl StepStatusRow {
    /// Project this row into the pure-domain view consumed by `hrx-core`.
    pub fn to_view(&self) -> Result<StepView, hrx_core::error::CoreError> {
        Ok(StepView {
            step_id: self.step_id,
            step_number: self.step_number,
            step_name: self.step_name.clone(),
            status: StepStatus::from_str_db(&self.status)?,
            percentage: self.percentage,
            due_date: self.due_date,
            can_be_skipped: self.can_be_skipped,
            auto_complete_on_data: self.auto_complete_on_data,
            depends_on_step_id: self.depends_on_step_id,
            blocked_by_step_id: self.blocked_by_step_id,
        })
    }
}

// ---------------------------------------------------------------------------
// Read DTOs
// ---------------------------------------------------------------------------

/// One step status as presented to API consumers, with the overdue flag
/// derived fresh from the clock at read time.
#[derive(Debug, Clone, Serialize)]
pub struct StepStatusDto {
    #[serde(flatten)]
    pub row: StepStatusRow,
    pub is_overdue: bool,
    /// Snapshot name of the step currently blocking this one, if any.
    pub blocked_by_step_name: Option<String>,
}

/// A fully-populated progress record: the aggregate row, its step
/// statuses in step-number order, and the derived summary fields.
#[derive(Debug, Clone, Serialize)]
pub struct ProgressDetail {
    #[serde(flatten)]
    pub progress: OnboardingProgress,
    pub employee_name: String,
    pub template_name: String,
    pub step_statuses: Vec<StepStatusDto>,
    #[serde(flatten)]
    pub summary: OnboardingSummary,
}

/// One onboarding run in an organization listing, with the employee's
/// display name joined in.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ProgressListEntry {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub progress: OnboardingProgress,
    pub employee_name: String,
}

// ---------------------------------------------------------------------------
// Dashboard DTOs
// ---------------------------------------------------------------------------

/// One currently-overdue step across an organization's active runs.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct OverdueStepEntry {
    pub progress_id: DbId,
    pub employee_id: DbId,
    pub employee_name: String,
    pub step_name: String,
    pub due_date: NaiveDate,
    pub days_overdue: i32,
}

/// Organization-level onboarding dashboard statistics.
#[derive(Debug, Clone, Serialize)]
pub struct OnboardingDashboard {
    pub active_onboarding: i64,
    /// Mean overall percentage across active runs, rounded; 0 when none.
    pub average_progress: i32,
    pub overdue_steps: Vec<OverdueStepEntry>,
    pub recent_completions: Vec<OnboardingProgress>,
}

// ---------------------------------------------------------------------------
// Request DTOs
// ---------------------------------------------------------------------------

/// Body for starting an onboarding run. Without an explicit template the
/// engine picks the best match for the employee.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StartOnboarding {
    pub template_id: Option<DbId>,
}

/// Body for completing a step.
#[derive(Debug, Clone, Deserialize)]
pub struct CompleteStep {
    pub completed_by: Option<String>,
    pub notes: Option<String>,
}

/// Body for skipping or manually blocking a step.
#[derive(Debug, Clone, Deserialize)]
pub struct StepReason {
    pub reason: Option<String>,
}
