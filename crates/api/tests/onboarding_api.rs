//! HTTP-level integration tests for the onboarding engine endpoints:
//! starting a run, step transitions, and the dashboard.

mod common;

use axum::http::StatusCode;
use common::{body_json, get, post_json};
use sqlx::PgPool;

async fn seed_org(pool: &PgPool) -> i64 {
    let response = post_json(
        common::build_test_app(pool.clone()),
        "/api/v1/organizations",
        serde_json::json!({"name": "Acme", "slug": "acme"}),
    )
    .await;
    body_json(response).await["data"]["id"].as_i64().unwrap()
}

async fn seed_employee(pool: &PgPool, org: i64) -> i64 {
    let response = post_json(
        common::build_test_app(pool.clone()),
        &format!("/api/v1/organizations/{org}/employees"),
        serde_json::json!({
            "first_name": "Ada",
            "last_name": "Lovelace",
            "email": "ada@acme.example"
        }),
    )
    .await;
    body_json(response).await["data"]["id"].as_i64().unwrap()
}

/// Three-step default template: Paperwork, Equipment (depends on
/// Paperwork), and a skippable Tour.
async fn seed_template(pool: &PgPool, org: i64) {
    let response = post_json(
        common::build_test_app(pool.clone()),
        &format!("/api/v1/organizations/{org}/templates"),
        serde_json::json!({
            "name": "Standard",
            "code": "standard",
            "is_default": true,
            "target_completion_days": 30,
            "steps": [
                {"step_number": 1, "code": "paperwork", "name": "Paperwork"},
                {"step_number": 2, "code": "equipment", "name": "Equipment",
                 "depends_on_step_number": 1},
                {"step_number": 3, "code": "tour", "name": "Office tour",
                 "can_be_skipped": true}
            ]
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
}

async fn start(pool: &PgPool, org: i64, employee: i64) -> serde_json::Value {
    let response = post_json(
        common::build_test_app(pool.clone()),
        &format!("/api/v1/organizations/{org}/employees/{employee}/onboarding"),
        serde_json::json!({}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(response).await["data"].clone()
}

/// Id of the step-status row for the given step code.
fn status_id(detail: &serde_json::Value, code: &str) -> i64 {
    detail["step_statuses"]
        .as_array()
        .unwrap()
        .iter()
        .find(|s| s["step_code"] == code)
        .unwrap()["id"]
        .as_i64()
        .unwrap()
}

fn step_uri(org: i64, progress: i64, step: i64, action: &str) -> String {
    format!("/api/v1/organizations/{org}/onboarding/{progress}/steps/{step}/{action}")
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_start_returns_snapshot_and_summary(pool: PgPool) {
    let org = seed_org(&pool).await;
    let employee = seed_employee(&pool, org).await;
    seed_template(&pool, org).await;

    let detail = start(&pool, org, employee).await;
    assert_eq!(detail["overall_status"], "not_started");
    assert_eq!(detail["overall_percentage"], 0);
    assert_eq!(detail["total_steps"], 3);
    assert_eq!(detail["employee_name"], "Ada Lovelace");
    assert_eq!(detail["step_statuses"].as_array().unwrap().len(), 3);
    assert_eq!(detail["next_action_required"], "Paperwork");
    assert!(detail["days_remaining"].as_i64().unwrap() > 0);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_start_twice_returns_409(pool: PgPool) {
    let org = seed_org(&pool).await;
    let employee = seed_employee(&pool, org).await;
    seed_template(&pool, org).await;
    start(&pool, org, employee).await;

    let response = post_json(
        common::build_test_app(pool),
        &format!("/api/v1/organizations/{org}/employees/{employee}/onboarding"),
        serde_json::json!({}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_start_without_template_returns_400(pool: PgPool) {
    let org = seed_org(&pool).await;
    let employee = seed_employee(&pool, org).await;

    let response = post_json(
        common::build_test_app(pool),
        &format!("/api/v1/organizations/{org}/employees/{employee}/onboarding"),
        serde_json::json!({}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_start_sends_welcome_notification(pool: PgPool) {
    let org = seed_org(&pool).await;
    let employee = seed_employee(&pool, org).await;
    seed_template(&pool, org).await;
    start(&pool, org, employee).await;

    let response = get(
        common::build_test_app(pool),
        &format!("/api/v1/organizations/{org}/employees/{employee}/notifications"),
    )
    .await;
    let json = body_json(response).await;
    let kinds: Vec<&str> = json["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|n| n["notification_type"].as_str().unwrap())
        .collect();
    assert!(kinds.contains(&"welcome"));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_begin_gated_step_returns_409_and_blocks(pool: PgPool) {
    let org = seed_org(&pool).await;
    let employee = seed_employee(&pool, org).await;
    seed_template(&pool, org).await;
    let detail = start(&pool, org, employee).await;
    let progress = detail["id"].as_i64().unwrap();
    let equipment = status_id(&detail, "equipment");

    let response = post_json(
        common::build_test_app(pool.clone()),
        &step_uri(org, progress, equipment, "begin"),
        serde_json::json!({}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(response).await["code"], "DEPENDENCY_NOT_SATISFIED");

    // the forced block commits even though the call failed
    let response = get(
        common::build_test_app(pool),
        &format!("/api/v1/organizations/{org}/employees/{employee}/onboarding"),
    )
    .await;
    let detail = body_json(response).await["data"].clone();
    let blocked = detail["step_statuses"]
        .as_array()
        .unwrap()
        .iter()
        .find(|s| s["step_code"] == "equipment")
        .unwrap()
        .clone();
    assert_eq!(blocked["status"], "blocked");
    assert_eq!(blocked["blocked_by_step_name"], "Paperwork");
    assert_eq!(detail["overall_status"], "in_progress");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_complete_flow_finishes_the_run(pool: PgPool) {
    let org = seed_org(&pool).await;
    let employee = seed_employee(&pool, org).await;
    seed_template(&pool, org).await;
    let detail = start(&pool, org, employee).await;
    let progress = detail["id"].as_i64().unwrap();
    let paperwork = status_id(&detail, "paperwork");
    let equipment = status_id(&detail, "equipment");
    let tour = status_id(&detail, "tour");

    for id in [paperwork, equipment, tour] {
        let begun = post_json(
            common::build_test_app(pool.clone()),
            &step_uri(org, progress, id, "begin"),
            serde_json::json!({}),
        )
        .await;
        assert_eq!(begun.status(), StatusCode::OK);

        let completed = post_json(
            common::build_test_app(pool.clone()),
            &step_uri(org, progress, id, "complete"),
            serde_json::json!({"completed_by": "hr@acme.example"}),
        )
        .await;
        assert_eq!(completed.status(), StatusCode::OK);
    }

    let response = get(
        common::build_test_app(pool.clone()),
        &format!("/api/v1/organizations/{org}/employees/{employee}/onboarding"),
    )
    .await;
    let detail = body_json(response).await["data"].clone();
    assert_eq!(detail["overall_status"], "completed");
    assert_eq!(detail["overall_percentage"], 100);
    assert!(detail["completed_at"].is_string());

    let response = get(
        common::build_test_app(pool),
        &format!("/api/v1/organizations/{org}/employees/{employee}"),
    )
    .await;
    let employee_json = body_json(response).await;
    assert_eq!(employee_json["data"]["onboarding_status"], "completed");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_skip_non_skippable_returns_409(pool: PgPool) {
    let org = seed_org(&pool).await;
    let employee = seed_employee(&pool, org).await;
    seed_template(&pool, org).await;
    let detail = start(&pool, org, employee).await;
    let progress = detail["id"].as_i64().unwrap();
    let paperwork = status_id(&detail, "paperwork");

    let response = post_json(
        common::build_test_app(pool),
        &step_uri(org, progress, paperwork, "skip"),
        serde_json::json!({"reason": "not needed"}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(response).await["code"], "NOT_SKIPPABLE");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_manual_block_and_unblock(pool: PgPool) {
    let org = seed_org(&pool).await;
    let employee = seed_employee(&pool, org).await;
    seed_template(&pool, org).await;
    let detail = start(&pool, org, employee).await;
    let progress = detail["id"].as_i64().unwrap();
    let paperwork = status_id(&detail, "paperwork");

    let response = post_json(
        common::build_test_app(pool.clone()),
        &step_uri(org, progress, paperwork, "block"),
        serde_json::json!({"reason": "missing passport"}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let blocked = body_json(response).await;
    let step = blocked["data"]["step_statuses"]
        .as_array()
        .unwrap()
        .iter()
        .find(|s| s["step_code"] == "paperwork")
        .unwrap()
        .clone();
    assert_eq!(step["status"], "blocked");
    assert_eq!(step["blocked_reason"], "missing passport");
    assert!(step["blocked_by_step_id"].is_null());

    let response = post_json(
        common::build_test_app(pool),
        &step_uri(org, progress, paperwork, "unblock"),
        serde_json::json!({}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let unblocked = body_json(response).await;
    let step = unblocked["data"]["step_statuses"]
        .as_array()
        .unwrap()
        .iter()
        .find(|s| s["step_code"] == "paperwork")
        .unwrap()
        .clone();
    assert_eq!(step["status"], "pending");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_unknown_step_returns_404(pool: PgPool) {
    let org = seed_org(&pool).await;
    let employee = seed_employee(&pool, org).await;
    seed_template(&pool, org).await;
    let detail = start(&pool, org, employee).await;
    let progress = detail["id"].as_i64().unwrap();

    let response = post_json(
        common::build_test_app(pool),
        &step_uri(org, progress, 999_999, "begin"),
        serde_json::json!({}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_list_organization_onboarding(pool: PgPool) {
    let org = seed_org(&pool).await;
    let employee = seed_employee(&pool, org).await;
    seed_template(&pool, org).await;
    start(&pool, org, employee).await;
    let uri = format!("/api/v1/organizations/{org}/onboarding");

    let response = get(common::build_test_app(pool.clone()), &uri).await;
    assert_eq!(response.status(), StatusCode::OK);
    let runs = body_json(response).await["data"].as_array().unwrap().clone();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0]["employee_name"], "Ada Lovelace");
    assert_eq!(runs[0]["overall_status"], "not_started");

    // status filter narrows the listing
    let response = get(
        common::build_test_app(pool.clone()),
        &format!("{uri}?status=completed"),
    )
    .await;
    assert!(body_json(response).await["data"].as_array().unwrap().is_empty());

    let response = get(
        common::build_test_app(pool.clone()),
        &format!("{uri}?status=not_started"),
    )
    .await;
    assert_eq!(body_json(response).await["data"].as_array().unwrap().len(), 1);

    let response = get(common::build_test_app(pool), &format!("{uri}?status=done")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_mark_notification_read_is_idempotent(pool: PgPool) {
    let org = seed_org(&pool).await;
    let employee = seed_employee(&pool, org).await;
    seed_template(&pool, org).await;
    start(&pool, org, employee).await;

    let response = get(
        common::build_test_app(pool.clone()),
        &format!("/api/v1/organizations/{org}/employees/{employee}/notifications"),
    )
    .await;
    let nid = body_json(response).await["data"][0]["id"].as_i64().unwrap();
    let read_uri =
        format!("/api/v1/organizations/{org}/employees/{employee}/notifications/{nid}/read");

    let first = post_json(common::build_test_app(pool.clone()), &read_uri, serde_json::json!({}))
        .await;
    assert_eq!(first.status(), StatusCode::OK);
    let first_json = body_json(first).await;
    assert_eq!(first_json["data"]["is_read"], true);
    let first_read_at = first_json["data"]["read_at"].as_str().unwrap().to_string();

    // re-marking succeeds and keeps the original read_at
    let second = post_json(common::build_test_app(pool), &read_uri, serde_json::json!({})).await;
    assert_eq!(second.status(), StatusCode::OK);
    let second_json = body_json(second).await;
    assert_eq!(second_json["data"]["is_read"], true);
    assert_eq!(second_json["data"]["read_at"].as_str().unwrap(), first_read_at);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_dashboard_counts_active_runs(pool: PgPool) {
    let org = seed_org(&pool).await;
    let employee = seed_employee(&pool, org).await;
    seed_template(&pool, org).await;
    start(&pool, org, employee).await;

    let response = get(
        common::build_test_app(pool),
        &format!("/api/v1/organizations/{org}/onboarding/dashboard"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["active_onboarding"], 1);
    assert_eq!(json["data"]["average_progress"], 0);
    assert!(json["data"]["overdue_steps"].as_array().unwrap().is_empty());
    assert!(json["data"]["recent_completions"].as_array().unwrap().is_empty());
}
