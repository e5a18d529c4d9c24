pub mod employee;
pub mod health;
pub mod onboarding;
pub mod organization;
pub mod template;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /organizations                                            list, create
/// /organizations/{id}                                       get
///
/// /organizations/{org_id}/employees                         list, create
/// /organizations/{org_id}/employees/{id}                    get, delete
/// /organizations/{org_id}/employees/{id}/onboarding         start (POST), get progress (GET)
/// /organizations/{org_id}/employees/{id}/notifications      list
/// /organizations/{org_id}/employees/{id}/notifications/{nid}/read   mark read (POST)
///
/// /organizations/{org_id}/templates                         list, create
/// /organizations/{org_id}/templates/match                   best-match preview
/// /organizations/{org_id}/templates/{id}                    get (with steps), update, delete
/// /organizations/{org_id}/templates/{id}/steps              add step (POST)
///
/// /organizations/{org_id}/onboarding                        list runs (optional status filter)
/// /organizations/{org_id}/onboarding/dashboard              dashboard
/// /organizations/{org_id}/onboarding/{progress_id}/steps/{step_id}/begin     POST
/// /organizations/{org_id}/onboarding/{progress_id}/steps/{step_id}/complete  POST
/// /organizations/{org_id}/onboarding/{progress_id}/steps/{step_id}/skip      POST
/// /organizations/{org_id}/onboarding/{progress_id}/steps/{step_id}/block     POST
/// /organizations/{org_id}/onboarding/{progress_id}/steps/{step_id}/unblock   POST
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new().nest("/organizations", organization::router())
}
