//! Onboarding API server library.
//!
//! Exposes the building blocks (config, state, error handling, router,
//! routes) so integration tests and the binary entrypoint share the same
//! middleware stack.

pub mod config;
pub mod error;
pub mod query;
pub mod response;
pub mod router;
pub mod routes;
pub mod state;
