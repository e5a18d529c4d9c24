//! Aggregate rollup for an onboarding progress record.
//!
//! The denormalized counters and overall status on a progress record are a
//! materialized view over its step statuses, recomputed synchronously after
//! every step mutation inside the same transaction. Recomputation is
//! idempotent and order-independent over a consistent snapshot.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::step_lifecycle::{is_overdue, StepStatus, StepView};

// ---------------------------------------------------------------------------
// Overall status
// ---------------------------------------------------------------------------

/// Overall status of one employee's onboarding run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverallStatus {
    NotStarted,
    InProgress,
    Completed,
}

impl OverallStatus {
    /// Parse a status string from the database.
    pub fn from_str_db(s: &str) -> Result<Self, CoreError> {
        match s {
            "not_started" => Ok(Self::NotStarted),
            "in_progress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            _ => Err(CoreError::Validation(format!(
                "Invalid overall status '{s}'. Must be one of: not_started, in_progress, completed"
            ))),
        }
    }

    /// Convert to a database-compatible string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotStarted => "not_started",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
        }
    }
}

// ---------------------------------------------------------------------------
// Rollup
// ---------------------------------------------------------------------------

/// Recomputed aggregate fields for a progress record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressRollup {
    pub overall_status: OverallStatus,
    /// `round(sum(step.percentage) / total_steps)`, 0-100.
    pub overall_percentage: i32,
    pub total_steps: i32,
    pub completed_steps: i32,
    /// Steps still awaiting action (pending or in progress).
    pub pending_steps: i32,
    /// Unresolved steps past their due date, as of the rollup snapshot.
    pub overdue_steps: i32,
    pub skipped_steps: i32,
}

/// Recompute the aggregate view from the full set of step statuses.
///
/// The run is complete iff every non-skipped step is completed and nothing
/// remains pending, in progress, or blocked. A run where any step has left
/// `pending` is in progress; otherwise it has not started.
pub fn recompute(steps: &[StepView], today: NaiveDate) -> ProgressRollup {
    let total = steps.len() as i32;
    let mut completed = 0;
    let mut pending = 0;
    let mut skipped = 0;
    let mut overdue = 0;
    let mut percentage_sum: i64 = 0;

    for step in steps {
        percentage_sum += i64::from(step.percentage);
        match step.status {
            StepStatus::Completed => completed += 1,
            StepStatus::Skipped => skipped += 1,
            StepStatus::Pending | StepStatus::InProgress => pending += 1,
            StepStatus::Blocked => {}
        }
        if is_overdue(step.status, step.due_date, today) {
            overdue += 1;
        }
    }

    let overall_percentage = if total > 0 {
        (percentage_sum as f64 / f64::from(total)).round() as i32
    } else {
        0
    };

    let all_terminal = total > 0 && steps.iter().all(|s| s.status.is_terminal());
    let any_moved = steps.iter().any(|s| s.status != StepStatus::Pending);

    let overall_status = if all_terminal {
        OverallStatus::Completed
    } else if any_moved {
        OverallStatus::InProgress
    } else {
        OverallStatus::NotStarted
    };

    ProgressRollup {
        overall_status,
        overall_percentage,
        total_steps: total,
        completed_steps: completed,
        pending_steps: pending,
        overdue_steps: overdue,
        skipped_steps: skipped,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DbId;

    fn step(step_id: DbId, number: i32, status: StepStatus) -> StepView {
        StepView {
            step_id,
            step_number: number,
            step_name: format!("Step {number}"),
            status,
            percentage: if status == StepStatus::Completed { 100 } else { 0 },
            due_date: None,
            can_be_skipped: false,
            auto_complete_on_data: false,
            depends_on_step_id: None,
            blocked_by_step_id: None,
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 1).unwrap()
    }

    #[test]
    fn overall_status_round_trip() {
        for status in [
            OverallStatus::NotStarted,
            OverallStatus::InProgress,
            OverallStatus::Completed,
        ] {
            assert_eq!(OverallStatus::from_str_db(status.as_str()).unwrap(), status);
        }
        assert!(OverallStatus::from_str_db("done").is_err());
    }

    #[test]
    fn all_pending_is_not_started() {
        let steps = vec![step(1, 1, StepStatus::Pending), step(2, 2, StepStatus::Pending)];
        let rollup = recompute(&steps, today());
        assert_eq!(rollup.overall_status, OverallStatus::NotStarted);
        assert_eq!(rollup.overall_percentage, 0);
        assert_eq!(rollup.total_steps, 2);
        assert_eq!(rollup.pending_steps, 2);
    }

    #[test]
    fn any_movement_is_in_progress() {
        let steps = vec![
            step(1, 1, StepStatus::InProgress),
            step(2, 2, StepStatus::Pending),
        ];
        assert_eq!(
            recompute(&steps, today()).overall_status,
            OverallStatus::InProgress
        );
    }

    #[test]
    fn forced_block_counts_as_movement() {
        let steps = vec![
            step(1, 1, StepStatus::Pending),
            step(2, 2, StepStatus::Blocked),
        ];
        assert_eq!(
            recompute(&steps, today()).overall_status,
            OverallStatus::InProgress
        );
    }

    #[test]
    fn all_terminal_is_completed() {
        let steps = vec![
            step(1, 1, StepStatus::Completed),
            step(2, 2, StepStatus::Skipped),
        ];
        let rollup = recompute(&steps, today());
        assert_eq!(rollup.overall_status, OverallStatus::Completed);
        assert_eq!(rollup.completed_steps, 1);
        assert_eq!(rollup.skipped_steps, 1);
        assert_eq!(rollup.pending_steps, 0);
    }

    #[test]
    fn blocked_step_prevents_completion() {
        let steps = vec![
            step(1, 1, StepStatus::Completed),
            step(2, 2, StepStatus::Blocked),
        ];
        assert_eq!(
            recompute(&steps, today()).overall_status,
            OverallStatus::InProgress
        );
    }

    #[test]
    fn percentage_is_rounded_mean_of_step_percentages() {
        // 100 + 100 + 0 over 3 steps -> 66.67 -> 67.
        let steps = vec![
            step(1, 1, StepStatus::Completed),
            step(2, 2, StepStatus::Completed),
            step(3, 3, StepStatus::Pending),
        ];
        assert_eq!(recompute(&steps, today()).overall_percentage, 67);
    }

    #[test]
    fn empty_step_set_is_zeroed() {
        let rollup = recompute(&[], today());
        assert_eq!(rollup.overall_percentage, 0);
        assert_eq!(rollup.total_steps, 0);
        assert_eq!(rollup.overall_status, OverallStatus::NotStarted);
    }

    #[test]
    fn overdue_steps_counted_from_due_dates() {
        let mut a = step(1, 1, StepStatus::Pending);
        a.due_date = NaiveDate::from_ymd_opt(2026, 2, 1);
        let mut b = step(2, 2, StepStatus::Completed);
        b.due_date = NaiveDate::from_ymd_opt(2026, 2, 1);
        let rollup = recompute(&[a, b], today());
        assert_eq!(rollup.overdue_steps, 1);
    }

    #[test]
    fn recompute_is_idempotent() {
        let steps = vec![
            step(1, 1, StepStatus::Completed),
            step(2, 2, StepStatus::InProgress),
            step(3, 3, StepStatus::Pending),
        ];
        let first = recompute(&steps, today());
        let second = recompute(&steps, today());
        assert_eq!(first, second);
    }

    #[test]
    fn skipped_steps_do_not_contribute_percentage() {
        // One completed, one skipped (pct 0): 100 + 0 over 2 -> 50.
        let steps = vec![
            step(1, 1, StepStatus::Completed),
            step(2, 2, StepStatus::Skipped),
        ];
        let rollup = recompute(&steps, today());
        assert_eq!(rollup.overall_status, OverallStatus::Completed);
        assert_eq!(rollup.overall_percentage, 50);
    }
}
