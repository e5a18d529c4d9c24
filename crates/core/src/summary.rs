//! Dashboard summary projection for a progress record.
//!
//! Read-only derivation over a fully-populated progress record: days
//! remaining, expected percentage for the elapsed time, on-track flag, and
//! the next actionable step. Computed at read time from stored timestamps
//! and the current clock; never persisted.

use chrono::NaiveDate;
use serde::Serialize;

use crate::step_lifecycle::{StepStatus, StepView};

/// Derived presentation fields for one onboarding run.
#[derive(Debug, Clone, Serialize)]
pub struct OnboardingSummary {
    /// `max(0, target_completion_date - today)` in days.
    pub days_remaining: i64,
    /// Linear expectation for the elapsed time, clamped to 0-100.
    pub expected_percentage: i32,
    /// Whether the actual percentage is at or ahead of the expectation.
    pub is_on_track: bool,
    /// Name of the lowest-numbered step still pending or in progress.
    pub next_action_required: Option<String>,
}

/// Project the summary fields from a progress record's stored dates, its
/// current overall percentage, and its step statuses.
pub fn project(
    start_date: NaiveDate,
    target_completion_date: NaiveDate,
    overall_percentage: i32,
    steps: &[StepView],
    today: NaiveDate,
) -> OnboardingSummary {
    let days_remaining = (target_completion_date - today).num_days().max(0);

    let total_days = (target_completion_date - start_date).num_days();
    let expected_percentage = if total_days <= 0 {
        100
    } else {
        let elapsed = (today - start_date).num_days().clamp(0, total_days);
        ((100 * elapsed) as f64 / total_days as f64).round() as i32
    };

    let next_action_required = steps
        .iter()
        .filter(|s| matches!(s.status, StepStatus::Pending | StepStatus::InProgress))
        .min_by_key(|s| s.step_number)
        .map(|s| s.step_name.clone());

    OnboardingSummary {
        days_remaining,
        expected_percentage,
        is_on_track: overall_percentage >= expected_percentage,
        next_action_required,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
