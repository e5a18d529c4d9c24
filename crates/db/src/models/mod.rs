//! Domain model structs and DTOs.
//!
//! Each submodule contains:
//! - A `FromRow` + `Serialize` entity struct matching the database row
//! - A `Deserialize` create DTO for inserts (with `validator` rules)
//! - A `Deserialize` update DTO (all `Option` fields) for patches

pub mod employee;
pub mod notification;
pub mod organization;
pub mod progress;
pub mod template;
