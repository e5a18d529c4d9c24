//! Notification entity model. Rows are produced by the onboarding engine
//! (welcome on start, confirmation on completion); the API only reads
//! them and flips the read flag.

use serde::Serialize;
use sqlx::FromRow;

use hrx_core::types::{DbId, Timestamp};

/// A row from the `notifications` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Notification {
    pub id: DbId,
    pub organization_id: DbId,
    pub employee_id: DbId,
    pub notification_type: String,
    pub subject: String,
    pub body: String,
    pub is_read: bool,
    pub read_at: Option<Timestamp>,
    pub created_at: Timestamp,
}

/// Notification type discriminators written by the engine.
pub mod kind {
    pub const WELCOME: &str = "welcome";
    pub const ONBOARDING_COMPLETED: &str = "onboarding_completed";
}
