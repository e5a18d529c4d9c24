//! Employee entity model and DTOs.
//!
//! Only the fields the onboarding engine needs: identity, tenant scope,
//! the matching attributes used for template selection, and the
//! engine-maintained onboarding status.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use hrx_core::types::{DbId, Timestamp};

/// A row from the `employees` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Employee {
    pub id: DbId,
    pub organization_id: DbId,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub employment_type: Option<String>,
    pub department_id: Option<DbId>,
    pub country_code: Option<String>,
    /// Maintained by the onboarding engine; not writable through the API.
    pub onboarding_status: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Employee {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// DTO for creating a new employee.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateEmployee {
    #[validate(length(min = 1, max = 100))]
    pub first_name: String,
    #[validate(length(min = 1, max = 100))]
    pub last_name: String,
    #[validate(email)]
    pub email: String,
    pub employment_type: Option<String>,
    pub department_id: Option<DbId>,
    #[validate(length(min = 2, max = 2))]
    pub country_code: Option<String>,
}
