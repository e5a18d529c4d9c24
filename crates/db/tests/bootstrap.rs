use sqlx::PgPool;

/// Full bootstrap test: connect, migrate, verify seed data.
#[sqlx::test(migrations = "../../db/migrations")]
async fn test_full_bootstrap(pool: PgPool) {
    hrx_db::health_check(&pool).await.unwrap();

    // Seed organization with its default template
    let orgs: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM organizations WHERE slug = 'default'")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(orgs.0, 1, "bootstrap organization should be seeded");

    let defaults: (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM onboarding_templates WHERE code = 'standard' AND is_default",
    )
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(defaults.0, 1, "default template should be seeded");

    let steps: (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM onboarding_steps \
         WHERE template_id = (SELECT id FROM onboarding_templates WHERE code = 'standard')",
    )
    .fetch_one(&pool)
    .await
    .unwrap();
    assert!(steps.0 >= 5, "default template should have seeded steps");
}

/// Seeded step dependencies must point at lower step numbers.
#[sqlx::test(migrations = "../../db/migrations")]
async fn test_seed_dependencies_point_backwards(pool: PgPool) {
    let violations: (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM onboarding_steps d \
         JOIN onboarding_steps p ON p.id = d.depends_on_step_id \
         WHERE p.step_number >= d.step_number",
    )
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(violations.0, 0);
}
