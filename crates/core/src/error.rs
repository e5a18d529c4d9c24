use crate::types::DbId;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: DbId },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Step '{step}' is gated by prerequisite '{blocked_by}' which is not completed")]
    DependencyNotSatisfied { step: String, blocked_by: String },

    #[error("Step '{step}' cannot be skipped")]
    NotSkippable { step: String },

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Internal error: {0}")]
    Internal(String),
}
