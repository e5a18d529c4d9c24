//! Pure domain logic for the HRX onboarding workflow engine.
//!
//! This crate has zero internal dependencies and performs no I/O. All
//! functions operate on pre-loaded data passed in by the caller (the
//! repository/engine layer in `hrx-db` and the API layer in `hrx-api`),
//! which keeps the step lifecycle rules, aggregate rollup, and summary
//! projection unit-testable without a database.

pub mod error;
pub mod pagination;
pub mod rollup;
pub mod step_lifecycle;
pub mod summary;
pub mod templates;
pub mod types;
