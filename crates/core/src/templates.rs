//! Save-time validation for onboarding templates, steps, and checklist
//! validation rules.
//!
//! Step dependencies are id references within the same template's step
//! collection, validated here to point at a strictly lower step number.
//! That single rule makes forward references, self references, and cycles
//! impossible without any graph traversal.

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Field vocabularies
// ---------------------------------------------------------------------------

/// Allowed step categories. Mirrored by a CHECK constraint on
/// `onboarding_steps.category`.
pub const STEP_CATEGORIES: &[&str] =
    &["general", "profile", "documents", "it", "compliance", "culture"];

/// Allowed step types. Mirrored by a CHECK constraint on
/// `onboarding_steps.step_type`.
pub const STEP_TYPES: &[&str] =
    &["task", "form", "document", "acknowledgement", "training", "meeting"];

/// Allowed assignment targets. Mirrored by a CHECK constraint on
/// `onboarding_steps.assigned_to`.
pub const ASSIGNMENT_TARGETS: &[&str] = &["employee", "hr", "manager", "buddy"];

/// Allowed checklist item types. Mirrored by a CHECK constraint on
/// `onboarding_checklist_items.item_type`.
pub const CHECKLIST_ITEM_TYPES: &[&str] = &["checkbox", "text", "number", "date", "document"];

/// Validate a constrained vocabulary field against its allowed values.
pub fn validate_vocabulary(field: &str, value: &str, allowed: &[&str]) -> Result<(), CoreError> {
    if allowed.contains(&value) {
        return Ok(());
    }
    Err(CoreError::Validation(format!(
        "Invalid {field} '{value}'. Must be one of: {}",
        allowed.join(", ")
    )))
}

// ---------------------------------------------------------------------------
// Step dependency validation
// ---------------------------------------------------------------------------

/// Ordering/dependency view of one template step, as supplied at save time.
#[derive(Debug, Clone, Copy)]
pub struct StepOrdering {
    pub step_number: i32,
    pub depends_on_step_number: Option<i32>,
}

/// Validate step numbers and dependency references for a template's steps.
///
/// Rules:
/// - step numbers are positive and unique within the template
/// - a dependency must reference an existing step with a strictly smaller
///   step number (no forward or self dependency)
pub fn validate_step_ordering(steps: &[StepOrdering]) -> Result<(), CoreError> {
    let mut seen: Vec<i32> = Vec::with_capacity(steps.len());
    for step in steps {
        if step.step_number < 1 {
            return Err(CoreError::Validation(format!(
                "Step number {} is invalid. Step numbers start at 1",
                step.step_number
            )));
        }
        if seen.contains(&step.step_number) {
            return Err(CoreError::Validation(format!(
                "Duplicate step number {} in template",
                step.step_number
            )));
        }
        seen.push(step.step_number);
    }

    for step in steps {
        if let Some(dep) = step.depends_on_step_number {
            if !seen.contains(&dep) {
                return Err(CoreError::Validation(format!(
                    "Step {} depends on step {dep}, which does not exist in this template",
                    step.step_number
                )));
            }
            if dep >= step.step_number {
                return Err(CoreError::Validation(format!(
                    "Step {} may only depend on an earlier step, got step {dep}",
                    step.step_number
                )));
            }
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Checklist validation rules
// ---------------------------------------------------------------------------

/// Optional validation rule attached to a checklist item.
#[derive(Debug, Clone, Default)]
pub struct ChecklistRule<'a> {
    pub min_value: Option<f64>,
    pub max_value: Option<f64>,
    pub regex_pattern: Option<&'a str>,
}

/// Validate a checklist item's rule at save time: the regex must compile
/// and numeric bounds must be ordered.
pub fn validate_checklist_rule(item_name: &str, rule: &ChecklistRule) -> Result<(), CoreError> {
    if let (Some(min), Some(max)) = (rule.min_value, rule.max_value) {
        if min > max {
            return Err(CoreError::Validation(format!(
                "Checklist item '{item_name}': min_value {min} exceeds max_value {max}"
            )));
        }
    }

    if let Some(pattern) = rule.regex_pattern {
        regex::Regex::new(pattern).map_err(|e| {
            CoreError::Validation(format!(
                "Checklist item '{item_name}': invalid regex pattern: {e}"
            ))
        })?;
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Template header validation
// ---------------------------------------------------------------------------

/// Validate the target completion window of a template.
pub fn validate_target_completion_days(days: i32) -> Result<(), CoreError> {
    if days < 1 {
        return Err(CoreError::Validation(format!(
            "target_completion_days must be at least 1, got {days}"
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
