//! Step lifecycle state machine for employee onboarding.
//!
//! This module lives in `core` (zero internal deps, no I/O) so the same
//! transition rules can be exercised by the repository/engine layer and by
//! unit tests without a database. All functions operate on [`StepView`]
//! snapshots pre-loaded by the caller.
//!
//! States: `pending` (initial) -> `in_progress` -> `completed` (terminal)
//! or `skipped` (terminal, gated by the can-be-skipped flag). Any
//! non-terminal state can become `blocked`, either by the dependency gate
//! or by a manual block with a free-text reason.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::DbId;

// ---------------------------------------------------------------------------
// Step status
// ---------------------------------------------------------------------------

/// Status values for a single onboarding step instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Pending,
    InProgress,
    Completed,
    Skipped,
    Blocked,
}

impl StepStatus {
    /// Parse a status string from the database.
    pub fn from_str_db(s: &str) -> Result<Self, CoreError> {
        match s {
            "pending" => Ok(Self::Pending),
            "in_progress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            "skipped" => Ok(Self::Skipped),
            "blocked" => Ok(Self::Blocked),
            _ => Err(CoreError::Validation(format!(
                "Invalid step status '{s}'. Must be one of: pending, in_progress, completed, skipped, blocked"
            ))),
        }
    }

    /// Convert to a database-compatible string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Skipped => "skipped",
            Self::Blocked => "blocked",
        }
    }

    /// Completed and skipped steps accept no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Skipped)
    }
}

// ---------------------------------------------------------------------------
// Step view
// ---------------------------------------------------------------------------

/// Snapshot of one step-status row, carrying the frozen behavior fields
/// copied from the template step at instantiation time.
#[derive(Debug, Clone)]
pub struct StepView {
    /// Template step id this status was instantiated from.
    pub step_id: DbId,
    pub step_number: i32,
    pub step_name: String,
    pub status: StepStatus,
    pub percentage: i32,
    pub due_date: Option<NaiveDate>,
    pub can_be_skipped: bool,
    pub auto_complete_on_data: bool,
    /// Prerequisite step (template step id) within the same progress record.
    pub depends_on_step_id: Option<DbId>,
    /// Set when the step was forced blocked by the dependency gate.
    /// `None` on a blocked step means a manual block.
    pub blocked_by_step_id: Option<DbId>,
}

// ---------------------------------------------------------------------------
// Dependency gate
// ---------------------------------------------------------------------------

/// Find the sibling step that currently blocks `step`, if any.
///
/// The gate is satisfied iff the step has no prerequisite or the
/// prerequisite's status is `completed`. A skipped prerequisite does NOT
/// satisfy the gate; dependents of a skipped step must themselves be
/// skipped or stay gated.
pub fn find_blocker<'a>(step: &StepView, siblings: &'a [StepView]) -> Option<&'a StepView> {
    let dep_id = step.depends_on_step_id?;
    siblings
        .iter()
        .find(|s| s.step_id == dep_id && s.status != StepStatus::Completed)
}

/// Template step ids of blocked siblings whose prerequisite is the step
/// that just completed, in step-number ascending order.
pub fn unblock_candidates(completed_step_id: DbId, siblings: &[StepView]) -> Vec<DbId> {
    let mut candidates: Vec<&StepView> = siblings
        .iter()
        .filter(|s| {
            s.status == StepStatus::Blocked && s.depends_on_step_id == Some(completed_step_id)
        })
        .collect();
    candidates.sort_by_key(|s| s.step_number);
    candidates.iter().map(|s| s.step_id).collect()
}

// ---------------------------------------------------------------------------
// Transition guards
// ---------------------------------------------------------------------------

/// Check that a step may be started (`pending` or dependency-`blocked`).
///
/// The dependency gate itself is checked separately via [`find_blocker`];
/// a gated begin is forced to `blocked` by the engine rather than rejected
/// outright.
pub fn validate_begin(step: &StepView) -> Result<(), CoreError> {
    match step.status {
        StepStatus::Pending => Ok(()),
        // A dependency block may be retried once the prerequisite completes.
        StepStatus::Blocked if step.blocked_by_step_id.is_some() => Ok(()),
        StepStatus::Blocked => Err(CoreError::InvalidState(format!(
            "Step '{}' is manually blocked and must be unblocked first",
            step.step_name
        ))),
        StepStatus::InProgress => Err(CoreError::InvalidState(format!(
            "Step '{}' is already in progress",
            step.step_name
        ))),
        StepStatus::Completed | StepStatus::Skipped => Err(CoreError::InvalidState(format!(
            "Step '{}' is already {}",
            step.step_name,
            step.status.as_str()
        ))),
    }
}

/// Check that a step may be completed.
///
/// Allowed from `in_progress`, or directly from `pending` when the step
/// allows auto-complete-on-data (still subject to the dependency gate).
pub fn validate_complete(step: &StepView) -> Result<(), CoreError> {
    match step.status {
        StepStatus::InProgress => Ok(()),
        StepStatus::Pending if step.auto_complete_on_data => Ok(()),
        StepStatus::Pending => Err(CoreError::InvalidState(format!(
            "Step '{}' must be started before it can be completed",
            step.step_name
        ))),
        _ => Err(CoreError::InvalidState(format!(
            "Step '{}' cannot be completed from status '{}'",
            step.step_name,
            step.status.as_str()
        ))),
    }
}

/// Check that a step may be skipped (any non-terminal state, flag permitting).
pub fn validate_skip(step: &StepView) -> Result<(), CoreError> {
    if step.status.is_terminal() {
        return Err(CoreError::InvalidState(format!(
            "Step '{}' is already {}",
            step.step_name,
            step.status.as_str()
        )));
    }
    if !step.can_be_skipped {
        return Err(CoreError::NotSkippable {
            step: step.step_name.clone(),
        });
    }
    Ok(())
}

/// Check that a step may be manually blocked.
pub fn validate_block(step: &StepView) -> Result<(), CoreError> {
    match step.status {
        StepStatus::Pending | StepStatus::InProgress => Ok(()),
        StepStatus::Blocked => Err(CoreError::InvalidState(format!(
            "Step '{}' is already blocked",
            step.step_name
        ))),
        _ => Err(CoreError::InvalidState(format!(
            "Step '{}' is already {}",
            step.step_name,
            step.status.as_str()
        ))),
    }
}

/// Check that a step may be unblocked back to `pending`.
///
/// The dependency gate must also pass; the engine checks it via
/// [`find_blocker`] and reports `DependencyNotSatisfied` when it does not.
pub fn validate_unblock(step: &StepView) -> Result<(), CoreError> {
    if step.status != StepStatus::Blocked {
        return Err(CoreError::InvalidState(format!(
            "Step '{}' is not blocked",
            step.step_name
        )));
    }
    Ok(())
}

/// Build the `DependencyNotSatisfied` error for a gated step.
pub fn dependency_error(step: &StepView, blocker: &StepView) -> CoreError {
    CoreError::DependencyNotSatisfied {
        step: step.step_name.clone(),
        blocked_by: blocker.step_name.clone(),
    }
}

// ---------------------------------------------------------------------------
// Overdue derivation
// ---------------------------------------------------------------------------

/// A step is overdue iff it is still unresolved (pending, in progress, or
/// blocked) and its due date has passed. Derived on every read, never
/// stored as authoritative state.
pub fn is_overdue(status: StepStatus, due_date: Option<NaiveDate>, today: NaiveDate) -> bool {
    matches!(
        status,
        StepStatus::Pending | StepStatus::InProgress | StepStatus::Blocked
    ) && due_date.is_some_and(|due| today > due)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

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

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    // -- StepStatus codec --

    #[test]
    fn status_round_trip() {
        for status in [
            StepStatus::Pending,
            StepStatus::InProgress,
            StepStatus::Completed,
            StepStatus::Skipped,
            StepStatus::Blocked,
        ] {
            assert_eq!(StepStatus::from_str_db(status.as_str()).unwrap(), status);
        }
    }

    #[test]
    fn status_from_str_invalid() {
        assert!(StepStatus::from_str_db("done").is_err());
        assert!(StepStatus::from_str_db("").is_err());
    }

    #[test]
    fn terminal_states() {
        assert!(StepStatus::Completed.is_terminal());
        assert!(StepStatus::Skipped.is_terminal());
        assert!(!StepStatus::Pending.is_terminal());
        assert!(!StepStatus::InProgress.is_terminal());
        assert!(!StepStatus::Blocked.is_terminal());
    }

    // -- Dependency gate --

    #[test]
    fn no_dependency_is_never_gated() {
        let a = step(1, 1, StepStatus::Pending);
        assert!(find_blocker(&a, &[a.clone()]).is_none());
    }

    #[test]
    fn incomplete_prerequisite_blocks() {
        let a = step(1, 1, StepStatus::Pending);
        let mut b = step(2, 2, StepStatus::Pending);
        b.depends_on_step_id = Some(1);
        let siblings = vec![a, b.clone()];
        assert_eq!(find_blocker(&b, &siblings).unwrap().step_id, 1);
    }

    #[test]
    fn completed_prerequisite_satisfies_gate() {
        let a = step(1, 1, StepStatus::Completed);
        let mut b = step(2, 2, StepStatus::Pending);
        b.depends_on_step_id = Some(1);
        let siblings = vec![a, b.clone()];
        assert!(find_blocker(&b, &siblings).is_none());
    }

    #[test]
    fn skipped_prerequisite_does_not_satisfy_gate() {
        let a = step(1, 1, StepStatus::Skipped);
        let mut b = step(2, 2, StepStatus::Pending);
        b.depends_on_step_id = Some(1);
        let siblings = vec![a, b.clone()];
        assert_eq!(find_blocker(&b, &siblings).unwrap().step_id, 1);
    }

    #[test]
    fn unblock_candidates_sorted_by_step_number() {
        let a = step(1, 1, StepStatus::Completed);
        let mut c = step(3, 3, StepStatus::Blocked);
        c.depends_on_step_id = Some(1);
        c.blocked_by_step_id = Some(1);
        let mut b = step(2, 2, StepStatus::Blocked);
        b.depends_on_step_id = Some(1);
        b.blocked_by_step_id = Some(1);
        let siblings = vec![a, c, b];
        assert_eq!(unblock_candidates(1, &siblings), vec![2, 3]);
    }

    #[test]
    fn unblock_candidates_ignores_pending_dependents() {
        let a = step(1, 1, StepStatus::Completed);
        let mut b = step(2, 2, StepStatus::Pending);
        b.depends_on_step_id = Some(1);
        let siblings = vec![a, b];
        assert!(unblock_candidates(1, &siblings).is_empty());
    }

    // -- validate_begin --

    #[test]
    fn begin_from_pending_ok() {
        assert!(validate_begin(&step(1, 1, StepStatus::Pending)).is_ok());
    }

    #[test]
    fn begin_from_dependency_block_ok() {
        let mut s = step(2, 2, StepStatus::Blocked);
        s.depends_on_step_id = Some(1);
        s.blocked_by_step_id = Some(1);
        assert!(validate_begin(&s).is_ok());
    }

    #[test]
    fn begin_from_manual_block_rejected() {
        let s = step(1, 1, StepStatus::Blocked);
        assert_matches!(validate_begin(&s), Err(CoreError::InvalidState(_)));
    }

    #[test]
    fn begin_from_terminal_rejected() {
        assert_matches!(
            validate_begin(&step(1, 1, StepStatus::Completed)),
            Err(CoreError::InvalidState(_))
        );
        assert_matches!(
            validate_begin(&step(1, 1, StepStatus::Skipped)),
            Err(CoreError::InvalidState(_))
        );
    }

    #[test]
    fn begin_from_in_progress_rejected() {
        assert_matches!(
            validate_begin(&step(1, 1, StepStatus::InProgress)),
            Err(CoreError::InvalidState(_))
        );
    }

    // -- validate_complete --

    #[test]
    fn complete_from_in_progress_ok() {
        assert!(validate_complete(&step(1, 1, StepStatus::InProgress)).is_ok());
    }

    #[test]
    fn complete_from_pending_requires_auto_complete() {
        let mut s = step(1, 1, StepStatus::Pending);
        assert_matches!(validate_complete(&s), Err(CoreError::InvalidState(_)));
        s.auto_complete_on_data = true;
        assert!(validate_complete(&s).is_ok());
    }

    #[test]
    fn complete_from_blocked_rejected() {
        assert_matches!(
            validate_complete(&step(1, 1, StepStatus::Blocked)),
            Err(CoreError::InvalidState(_))
        );
    }

    #[test]
    fn complete_twice_rejected() {
        assert_matches!(
            validate_complete(&step(1, 1, StepStatus::Completed)),
            Err(CoreError::InvalidState(_))
        );
    }

    // -- validate_skip --

    #[test]
    fn skip_requires_flag() {
        let mut s = step(1, 1, StepStatus::Pending);
        assert_matches!(validate_skip(&s), Err(CoreError::NotSkippable { .. }));
        s.can_be_skipped = true;
        assert!(validate_skip(&s).is_ok());
    }

    #[test]
    fn skip_from_blocked_ok_when_skippable() {
        let mut s = step(1, 1, StepStatus::Blocked);
        s.can_be_skipped = true;
        assert!(validate_skip(&s).is_ok());
    }

    #[test]
    fn skip_from_terminal_rejected() {
        let mut s = step(1, 1, StepStatus::Completed);
        s.can_be_skipped = true;
        assert_matches!(validate_skip(&s), Err(CoreError::InvalidState(_)));
    }

    // -- validate_block / validate_unblock --

    #[test]
    fn block_from_pending_and_in_progress_ok() {
        assert!(validate_block(&step(1, 1, StepStatus::Pending)).is_ok());
        assert!(validate_block(&step(1, 1, StepStatus::InProgress)).is_ok());
    }

    #[test]
    fn block_twice_rejected() {
        assert_matches!(
            validate_block(&step(1, 1, StepStatus::Blocked)),
            Err(CoreError::InvalidState(_))
        );
    }

    #[test]
    fn block_from_terminal_rejected() {
        assert_matches!(
            validate_block(&step(1, 1, StepStatus::Skipped)),
            Err(CoreError::InvalidState(_))
        );
    }

    #[test]
    fn unblock_requires_blocked() {
        assert!(validate_unblock(&step(1, 1, StepStatus::Blocked)).is_ok());
        assert_matches!(
            validate_unblock(&step(1, 1, StepStatus::Pending)),
            Err(CoreError::InvalidState(_))
        );
    }

    // -- is_overdue --

    #[test]
    fn overdue_when_unresolved_past_due() {
        let due = Some(date(2026, 1, 10));
        let today = date(2026, 1, 11);
        assert!(is_overdue(StepStatus::Pending, due, today));
        assert!(is_overdue(StepStatus::InProgress, due, today));
        assert!(is_overdue(StepStatus::Blocked, due, today));
    }

    #[test]
    fn not_overdue_on_due_date() {
        let due = Some(date(2026, 1, 10));
        assert!(!is_overdue(StepStatus::Pending, due, date(2026, 1, 10)));
    }

    #[test]
    fn terminal_steps_never_overdue() {
        let due = Some(date(2026, 1, 10));
        let today = date(2026, 2, 1);
        assert!(!is_overdue(StepStatus::Completed, due, today));
        assert!(!is_overdue(StepStatus::Skipped, due, today));
    }

    #[test]
    fn no_due_date_never_overdue() {
        assert!(!is_overdue(StepStatus::Pending, None, date(2026, 1, 1)));
    }
}
