//! Repository for the `employees` table. Every query is scoped by
//! `organization_id`; employees use soft delete via `deleted_at`.

use sqlx::{PgPool, Postgres, Transaction};

use hrx_core::types::DbId;

use crate::models::employee::{CreateEmployee, Employee};

const COLUMNS: &str = "id, organization_id, first_name, last_name, email, \
     employment_type, department_id, country_code, onboarding_status, \
     created_at, updated_at";

/// Provides CRUD operations for employees.
pub struct EmployeeRepo;

impl EmployeeRepo {
    /// Insert a new employee, returning the created row. New employees
    /// start with onboarding status `not_started`.
    pub async fn create(
        pool: &PgPool,
        organization_id: DbId,
        input: &CreateEmployee,
    ) -> Result<Employee, sqlx::Error> {
        let query = format!(
            "INSERT INTO employees \
                (organization_id, first_name, last_name, email, \
                 employment_type, department_id, country_code) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Employee>(&query)
            .bind(organization_id)
            .bind(&input.first_name)
            .bind(&input.last_name)
            .bind(&input.email)
            .bind(&input.employment_type)
            .bind(input.department_id)
            .bind(&input.country_code)
            .fetch_one(pool)
            .await
    }

    /// Find an employee by ID within an organization.
    pub async fn find_by_id(
        pool: &PgPool,
        organization_id: DbId,
        id: DbId,
    ) -> Result<Option<Employee>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM employees \
             WHERE id = $1 AND organization_id = $2 AND deleted_at IS NULL"
        );
        sqlx::query_as::<_, Employee>(&query)
            .bind(id)
            .bind(organization_id)
            .fetch_optional(pool)
            .await
    }

    /// Find an employee and take a row lock for the duration of the
    /// transaction. Serializes concurrent onboarding starts per employee.
    pub async fn find_by_id_for_update(
        tx: &mut Transaction<'_, Postgres>,
        organization_id: DbId,
        id: DbId,
    ) -> Result<Option<Employee>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM employees \
             WHERE id = $1 AND organization_id = $2 AND deleted_at IS NULL \
             FOR UPDATE"
        );
        sqlx::query_as::<_, Employee>(&query)
            .bind(id)
            .bind(organization_id)
            .fetch_optional(&mut **tx)
            .await
    }

    /// List employees in an organization, newest first.
    pub async fn list(
        pool: &PgPool,
        organization_id: DbId,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Employee>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM employees \
             WHERE organization_id = $1 AND deleted_at IS NULL \
             ORDER BY created_at DESC LIMIT $2 OFFSET $3"
        );
        sqlx::query_as::<_, Employee>(&query)
            .bind(organization_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    /// Set the engine-maintained onboarding status within a transaction.
    pub async fn set_onboarding_status(
        tx: &mut Transaction<'_, Postgres>,
        id: DbId,
        status: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE employees SET onboarding_status = $2 WHERE id = $1")
            .bind(id)
            .bind(status)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }

    /// Soft-delete an employee. Returns `true` if a row was marked.
    pub async fn soft_delete(
        pool: &PgPool,
        organization_id: DbId,
        id: DbId,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE employees SET deleted_at = now() \
             WHERE id = $1 AND organization_id = $2 AND deleted_at IS NULL",
        )
        .bind(id)
        .bind(organization_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
