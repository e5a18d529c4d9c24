//! Repository for the `notifications` table.

use sqlx::{PgPool, Postgres, Transaction};

use hrx_core::types::DbId;

use crate::models::notification::Notification;

const COLUMNS: &str = "id, organization_id, employee_id, notification_type, \
     subject, body, is_read, read_at, created_at";

/// Provides persistence for engine-emitted notifications.
pub struct NotificationRepo;

impl NotificationRepo {
    /// Insert a notification within an engine transaction.
    pub async fn create(
        tx: &mut Transaction<'_, Postgres>,
        organization_id: DbId,
        employee_id: DbId,
        notification_type: &str,
        subject: &str,
        body: &str,
    ) -> Result<Notification, sqlx::Error> {
        let query = format!(
            "INSERT INTO notifications \
                (organization_id, employee_id, notification_type, subject, body) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Notification>(&query)
            .bind(organization_id)
            .bind(employee_id)
            .bind(notification_type)
            .bind(subject)
            .bind(body)
            .fetch_one(&mut **tx)
            .await
    }

    /// List an employee's notifications, newest first.
    pub async fn list_for_employee(
        pool: &PgPool,
        organization_id: DbId,
        employee_id: DbId,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Notification>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM notifications \
             WHERE organization_id = $1 AND employee_id = $2 \
             ORDER BY created_at DESC LIMIT $3 OFFSET $4"
        );
        sqlx::query_as::<_, Notification>(&query)
            .bind(organization_id)
            .bind(employee_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    /// Mark a notification read. Idempotent: re-marking an already-read
    /// notification succeeds and keeps the original `read_at`.
    pub async fn mark_read(
        pool: &PgPool,
        organization_id: DbId,
        id: DbId,
    ) -> Result<Option<Notification>, sqlx::Error> {
        let query = format!(
            "UPDATE notifications SET is_read = true, read_at = COALESCE(read_at, now()) \
             WHERE id = $1 AND organization_id = $2 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Notification>(&query)
            .bind(id)
            .bind(organization_id)
            .fetch_optional(pool)
            .await
    }
}
