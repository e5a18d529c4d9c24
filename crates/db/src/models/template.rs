//! Onboarding template entity models and DTOs: the template header, its
//! ordered steps, and each step's checklist items.
//!
//! Steps and checklist items are owned compositions; they are created and
//! destroyed with their template. In create payloads a step dependency is
//! expressed by step number (the step being referenced has no id yet) and
//! resolved to a step id at insert time.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use hrx_core::types::{DbId, Timestamp};

// ---------------------------------------------------------------------------
// Template header
// ---------------------------------------------------------------------------

/// A row from the `onboarding_templates` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct OnboardingTemplate {
    pub id: DbId,
    pub organization_id: DbId,
    pub name: String,
    /// Unique within the organization.
    pub code: String,
    pub description: Option<String>,
    /// Scoping fields; `None` means wildcard (matches any employee).
    pub employment_type: Option<String>,
    pub department_id: Option<DbId>,
    pub country_code: Option<String>,
    pub target_completion_days: i32,
    pub auto_assign: bool,
    pub send_welcome_email: bool,
    pub allow_self_service: bool,
    pub is_active: bool,
    pub is_default: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A row from the `onboarding_steps` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct OnboardingStep {
    pub id: DbId,
    pub template_id: DbId,
    /// Defines ordering within the template; unique per template.
    pub step_number: i32,
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub category: String,
    pub step_type: String,
    /// Prerequisite step within the same template, always a strictly
    /// lower step number.
    pub depends_on_step_id: Option<DbId>,
    /// Days from onboarding start until this step is due.
    pub due_by_days: i32,
    pub reminder_days_before: Option<i32>,
    pub escalation_days_after: Option<i32>,
    pub assigned_to: String,
    pub can_be_skipped: bool,
    pub requires_approval: bool,
    pub auto_complete_on_data: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A row from the `onboarding_checklist_items` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ChecklistItem {
    pub id: DbId,
    pub step_id: DbId,
    pub item_order: i32,
    pub name: String,
    pub description: Option<String>,
    pub item_type: String,
    pub min_value: Option<f64>,
    pub max_value: Option<f64>,
    pub regex_pattern: Option<String>,
    pub required_document_type: Option<String>,
    pub is_required: bool,
    pub requires_signature: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

// ---------------------------------------------------------------------------
// Composed views
// ---------------------------------------------------------------------------

/// A step enriched with its checklist items, ordered by item order.
#[derive(Debug, Clone, Serialize)]
pub struct StepWithItems {
    #[serde(flatten)]
    pub step: OnboardingStep,
    pub checklist_items: Vec<ChecklistItem>,
}

/// A template enriched with its steps (step-number order) and their
/// checklist items.
#[derive(Debug, Clone, Serialize)]
pub struct TemplateWithSteps {
    #[serde(flatten)]
    pub template: OnboardingTemplate,
    pub steps: Vec<StepWithItems>,
}

// ---------------------------------------------------------------------------
// Create / update DTOs
// ---------------------------------------------------------------------------

/// DTO for creating a template, optionally with inline steps.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateTemplate {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(min = 1, max = 50))]
    pub code: String,
    pub description: Option<String>,
    pub employment_type: Option<String>,
    pub department_id: Option<DbId>,
    #[validate(length(min = 2, max = 2))]
    pub country_code: Option<String>,
    pub target_completion_days: Option<i32>,
    pub auto_assign: Option<bool>,
    pub send_welcome_email: Option<bool>,
    pub allow_self_service: Option<bool>,
    pub is_default: Option<bool>,
    #[serde(default)]
    pub steps: Vec<CreateStep>,
}

/// DTO for adding a step to a template (inline at create, or later via
/// the add-step endpoint).
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateStep {
    #[validate(range(min = 1))]
    pub step_number: i32,
    #[validate(length(min = 1, max = 50))]
    pub code: String,
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub step_type: Option<String>,
    /// Step number of the prerequisite step within the same template.
    pub depends_on_step_number: Option<i32>,
    pub due_by_days: Option<i32>,
    pub reminder_days_before: Option<i32>,
    pub escalation_days_after: Option<i32>,
    pub assigned_to: Option<String>,
    pub can_be_skipped: Option<bool>,
    pub requires_approval: Option<bool>,
    pub auto_complete_on_data: Option<bool>,
    #[serde(default)]
    pub checklist_items: Vec<CreateChecklistItem>,
}

/// DTO for a checklist item supplied inline with a step.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateChecklistItem {
    #[validate(range(min = 1))]
    pub item_order: i32,
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    pub description: Option<String>,
    pub item_type: Option<String>,
    pub min_value: Option<f64>,
    pub max_value: Option<f64>,
    pub regex_pattern: Option<String>,
    pub required_document_type: Option<String>,
    pub is_required: Option<bool>,
    pub requires_signature: Option<bool>,
}

/// DTO for partially updating a template header.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateTemplate {
    pub name: Option<String>,
    pub code: Option<String>,
    pub description: Option<String>,
    pub employment_type: Option<String>,
    pub department_id: Option<DbId>,
    pub country_code: Option<String>,
    pub target_completion_days: Option<i32>,
    pub auto_assign: Option<bool>,
    pub send_welcome_email: Option<bool>,
    pub allow_self_service: Option<bool>,
    pub is_active: Option<bool>,
    pub is_default: Option<bool>,
}
