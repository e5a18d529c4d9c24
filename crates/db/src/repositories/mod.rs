//! Repository layer: one zero-sized struct per table with async CRUD
//! methods. Repositories take a pool or transaction executor and return
//! `Result<_, sqlx::Error>`; domain rules live in the engine, not here.

pub mod employee_repo;
pub mod notification_repo;
pub mod organization_repo;
pub mod progress_repo;
pub mod template_repo;
