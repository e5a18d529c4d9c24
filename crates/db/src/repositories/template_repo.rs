//! Repository for the `onboarding_templates` table and its owned
//! compositions (`onboarding_steps`, `onboarding_checklist_items`).

use std::collections::HashMap;

use sqlx::{PgPool, Postgres, Transaction};

use hrx_core::types::DbId;

use crate::models::template::{
    ChecklistItem, CreateChecklistItem, CreateStep, CreateTemplate, OnboardingStep,
    OnboardingTemplate, StepWithItems, TemplateWithSteps, UpdateTemplate,
};

const COLUMNS: &str = "id, organization_id, name, code, description, \
     employment_type, department_id, country_code, target_completion_days, \
     auto_assign, send_welcome_email, allow_self_service, is_active, is_default, \
     created_at, updated_at";

const STEP_COLUMNS: &str = "id, template_id, step_number, code, name, description, \
     category, step_type, depends_on_step_id, due_by_days, reminder_days_before, \
     escalation_days_after, assigned_to, can_be_skipped, requires_approval, \
     auto_complete_on_data, created_at, updated_at";

const ITEM_COLUMNS: &str = "id, step_id, item_order, name, description, item_type, \
     min_value, max_value, regex_pattern, required_document_type, is_required, \
     requires_signature, created_at, updated_at";

pub const DEFAULT_TARGET_COMPLETION_DAYS: i32 = 90;

/// Provides CRUD operations for onboarding templates.
pub struct TemplateRepo;

impl TemplateRepo {
    /// Insert a template header and its inline steps in one transaction.
    /// Step dependencies arrive as step numbers and are resolved to ids
    /// as the steps are inserted in step-number order.
    pub async fn create_with_steps(
        pool: &PgPool,
        organization_id: DbId,
        input: &CreateTemplate,
    ) -> Result<TemplateWithSteps, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!(
            "INSERT INTO onboarding_templates \
                (organization_id, name, code, description, employment_type, \
                 department_id, country_code, target_completion_days, auto_assign, \
                 send_welcome_email, allow_self_service, is_default) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, COALESCE($8, $9), \
                 COALESCE($10, false), COALESCE($11, true), COALESCE($12, false), \
                 COALESCE($13, false)) \
             RETURNING {COLUMNS}"
        );
        let template = sqlx::query_as::<_, OnboardingTemplate>(&query)
            .bind(organization_id)
            .bind(&input.name)
            .bind(&input.code)
            .bind(&input.description)
            .bind(&input.employment_type)
            .bind(input.department_id)
            .bind(&input.country_code)
            .bind(input.target_completion_days)
            .bind(DEFAULT_TARGET_COMPLETION_DAYS)
            .bind(input.auto_assign)
            .bind(input.send_welcome_email)
            .bind(input.allow_self_service)
            .bind(input.is_default)
            .fetch_one(&mut *tx)
            .await?;

        let mut sorted: Vec<&CreateStep> = input.steps.iter().collect();
        sorted.sort_by_key(|s| s.step_number);

        let mut ids_by_number: HashMap<i32, DbId> = HashMap::new();
        let mut steps = Vec::with_capacity(sorted.len());
        for step in sorted {
            let depends_on_step_id = step
                .depends_on_step_number
                .and_then(|n| ids_by_number.get(&n).copied());
            let inserted = Self::insert_step(&mut tx, template.id, step, depends_on_step_id).await?;
            ids_by_number.insert(inserted.step.step_number, inserted.step.id);
            steps.push(inserted);
        }

        tx.commit().await?;
        Ok(TemplateWithSteps { template, steps })
    }

    async fn insert_step(
        tx: &mut Transaction<'_, Postgres>,
        template_id: DbId,
        input: &CreateStep,
        depends_on_step_id: Option<DbId>,
    ) -> Result<StepWithItems, sqlx::Error> {
        let query = format!(
            "INSERT INTO onboarding_steps \
                (template_id, step_number, code, name, description, category, \
                 step_type, depends_on_step_id, due_by_days, reminder_days_before, \
                 escalation_days_after, assigned_to, can_be_skipped, \
                 requires_approval, auto_complete_on_data) \
             VALUES ($1, $2, $3, $4, $5, COALESCE($6, 'general'), \
                 COALESCE($7, 'task'), $8, COALESCE($9, 7), $10, $11, \
                 COALESCE($12, 'employee'), COALESCE($13, false), \
                 COALESCE($14, false), COALESCE($15, false)) \
             RETURNING {STEP_COLUMNS}"
        );
        let step = sqlx::query_as::<_, OnboardingStep>(&query)
            .bind(template_id)
            .bind(input.step_number)
            .bind(&input.code)
            .bind(&input.name)
            .bind(&input.description)
            .bind(&input.category)
            .bind(&input.step_type)
            .bind(depends_on_step_id)
            .bind(input.due_by_days)
            .bind(input.reminder_days_before)
            .bind(input.escalation_days_after)
            .bind(&input.assigned_to)
            .bind(input.can_be_skipped)
            .bind(input.requires_approval)
            .bind(input.auto_complete_on_data)
            .fetch_one(&mut **tx)
            .await?;

        let mut checklist_items = Vec::with_capacity(input.checklist_items.len());
        for item in &input.checklist_items {
            checklist_items.push(Self::insert_item(tx, step.id, item).await?);
        }
        Ok(StepWithItems {
            step,
            checklist_items,
        })
    }

    async fn insert_item(
        tx: &mut Transaction<'_, Postgres>,
        step_id: DbId,
        input: &CreateChecklistItem,
    ) -> Result<ChecklistItem, sqlx::Error> {
        let query = format!(
            "INSERT INTO onboarding_checklist_items \
                (step_id, item_order, name, description, item_type, min_value, \
                 max_value, regex_pattern, required_document_type, is_required, \
                 requires_signature) \
             VALUES ($1, $2, $3, $4, COALESCE($5, 'checkbox'), $6, $7, $8, $9, \
                 COALESCE($10, true), COALESCE($11, false)) \
             RETURNING {ITEM_COLUMNS}"
        );
        sqlx::query_as::<_, ChecklistItem>(&query)
            .bind(step_id)
            .bind(input.item_order)
            .bind(&input.name)
            .bind(&input.description)
            .bind(&input.item_type)
            .bind(input.min_value)
            .bind(input.max_value)
            .bind(&input.regex_pattern)
            .bind(&input.required_document_type)
            .bind(input.is_required)
            .bind(input.requires_signature)
            .fetch_one(&mut **tx)
            .await
    }

    /// Append a step to an existing template.
    pub async fn add_step(
        pool: &PgPool,
        template_id: DbId,
        input: &CreateStep,
    ) -> Result<StepWithItems, sqlx::Error> {
        let mut tx = pool.begin().await?;
        let depends_on_step_id = match input.depends_on_step_number {
            Some(n) => {
                sqlx::query_scalar::<_, DbId>(
                    "SELECT id FROM onboarding_steps \
                     WHERE template_id = $1 AND step_number = $2",
                )
                .bind(template_id)
                .bind(n)
                .fetch_optional(&mut *tx)
                .await?
            }
            None => None,
        };
        let step = Self::insert_step(&mut tx, template_id, input, depends_on_step_id).await?;
        tx.commit().await?;
        Ok(step)
    }

    /// Find a template header by ID within an organization.
    pub async fn find_by_id(
        pool: &PgPool,
        organization_id: DbId,
        id: DbId,
    ) -> Result<Option<OnboardingTemplate>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM onboarding_templates \
             WHERE id = $1 AND organization_id = $2 AND deleted_at IS NULL"
        );
        sqlx::query_as::<_, OnboardingTemplate>(&query)
            .bind(id)
            .bind(organization_id)
            .fetch_optional(pool)
            .await
    }

    /// Find a template with its steps and checklist items.
    pub async fn find_with_steps(
        pool: &PgPool,
        organization_id: DbId,
        id: DbId,
    ) -> Result<Option<TemplateWithSteps>, sqlx::Error> {
        let Some(template) = Self::find_by_id(pool, organization_id, id).await? else {
            return Ok(None);
        };
        let steps = Self::load_steps(pool, template.id).await?;
        Ok(Some(TemplateWithSteps { template, steps }))
    }

    /// Load a template's steps (step-number order) with their checklist
    /// items (item order).
    pub async fn load_steps(
        pool: &PgPool,
        template_id: DbId,
    ) -> Result<Vec<StepWithItems>, sqlx::Error> {
        let query = format!(
            "SELECT {STEP_COLUMNS} FROM onboarding_steps \
             WHERE template_id = $1 ORDER BY step_number ASC"
        );
        let steps = sqlx::query_as::<_, OnboardingStep>(&query)
            .bind(template_id)
            .fetch_all(pool)
            .await?;

        let item_query = format!(
            "SELECT {ITEM_COLUMNS} FROM onboarding_checklist_items \
             WHERE step_id = ANY($1) ORDER BY step_id, item_order ASC"
        );
        let step_ids: Vec<DbId> = steps.iter().map(|s| s.id).collect();
        let items = sqlx::query_as::<_, ChecklistItem>(&item_query)
            .bind(&step_ids)
            .fetch_all(pool)
            .await?;

        let mut by_step: HashMap<DbId, Vec<ChecklistItem>> = HashMap::new();
        for item in items {
            by_step.entry(item.step_id).or_default().push(item);
        }
        Ok(steps
            .into_iter()
            .map(|step| {
                let checklist_items = by_step.remove(&step.id).unwrap_or_default();
                StepWithItems {
                    step,
                    checklist_items,
                }
            })
            .collect())
    }

    /// List templates in an organization, default first then newest.
    pub async fn list(
        pool: &PgPool,
        organization_id: DbId,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<OnboardingTemplate>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM onboarding_templates \
             WHERE organization_id = $1 AND deleted_at IS NULL \
             ORDER BY is_default DESC, id DESC LIMIT $2 OFFSET $3"
        );
        sqlx::query_as::<_, OnboardingTemplate>(&query)
            .bind(organization_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    /// Find the active template that matches an employee's attributes.
    /// A scoping field either matches exactly or is a wildcard (`NULL`);
    /// among matches the default template wins, then the newest.
    pub async fn find_best_match(
        pool: &PgPool,
        organization_id: DbId,
        employment_type: Option<&str>,
        department_id: Option<DbId>,
        country_code: Option<&str>,
    ) -> Result<Option<OnboardingTemplate>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM onboarding_templates \
             WHERE organization_id = $1 AND is_active = true AND deleted_at IS NULL \
               AND (employment_type IS NULL OR employment_type = $2) \
               AND (department_id IS NULL OR department_id = $3) \
               AND (country_code IS NULL OR country_code = $4) \
             ORDER BY is_default DESC, id DESC \
             LIMIT 1"
        );
        sqlx::query_as::<_, OnboardingTemplate>(&query)
            .bind(organization_id)
            .bind(employment_type)
            .bind(department_id)
            .bind(country_code)
            .fetch_optional(pool)
            .await
    }

    /// Find the organization's default template, if one is active.
    pub async fn find_default(
        pool: &PgPool,
        organization_id: DbId,
    ) -> Result<Option<OnboardingTemplate>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM onboarding_templates \
             WHERE organization_id = $1 AND is_default = true \
               AND is_active = true AND deleted_at IS NULL"
        );
        sqlx::query_as::<_, OnboardingTemplate>(&query)
            .bind(organization_id)
            .fetch_optional(pool)
            .await
    }

    /// Update a template header. Only non-`None` fields are applied.
    pub async fn update(
        pool: &PgPool,
        organization_id: DbId,
        id: DbId,
        input: &UpdateTemplate,
    ) -> Result<Option<OnboardingTemplate>, sqlx::Error> {
        let query = format!(
            "UPDATE onboarding_templates SET \
                name = COALESCE($3, name), \
                code = COALESCE($4, code), \
                description = COALESCE($5, description), \
                employment_type = COALESCE($6, employment_type), \
                department_id = COALESCE($7, department_id), \
                country_code = COALESCE($8, country_code), \
                target_completion_days = COALESCE($9, target_completion_days), \
                auto_assign = COALESCE($10, auto_assign), \
                send_welcome_email = COALESCE($11, send_welcome_email), \
                allow_self_service = COALESCE($12, allow_self_service), \
                is_active = COALESCE($13, is_active), \
                is_default = COALESCE($14, is_default) \
             WHERE id = $1 AND organization_id = $2 AND deleted_at IS NULL \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, OnboardingTemplate>(&query)
            .bind(id)
            .bind(organization_id)
            .bind(&input.name)
            .bind(&input.code)
            .bind(&input.description)
            .bind(&input.employment_type)
            .bind(input.department_id)
            .bind(&input.country_code)
            .bind(input.target_completion_days)
            .bind(input.auto_assign)
            .bind(input.send_welcome_email)
            .bind(input.allow_self_service)
            .bind(input.is_active)
            .bind(input.is_default)
            .fetch_optional(pool)
            .await
    }

    /// Soft-delete a template. Existing runs keep their snapshots; the
    /// template stops matching new employees. Returns `true` if marked.
    pub async fn soft_delete(
        pool: &PgPool,
        organization_id: DbId,
        id: DbId,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE onboarding_templates \
             SET deleted_at = now(), is_active = false, is_default = false \
             WHERE id = $1 AND organization_id = $2 AND deleted_at IS NULL",
        )
        .bind(id)
        .bind(organization_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
