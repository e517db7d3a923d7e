//! Integration tests for user administration API endpoints

use axum::http::{Method, StatusCode};
use serde_json::json;
use sqlx::PgPool;
use tower::ServiceExt; // for `oneshot` and `ready`
use uuid::Uuid;

mod helpers;
use helpers::{
    assign_owner, bare_request, get, json_request, read_json, seed_admin, seed_control, seed_user,
    test_app,
};

#[sqlx::test(migrations = "../../migrations")]
async fn test_create_user_returns_envelope(pool: PgPool) {
    let app = test_app(pool);

    let body = json!({
        "name": "Ada Admin",
        "email": "ada@example.com",
        "roles": ["admin"]
    });

    let response = app
        .oneshot(json_request(Method::POST, "/api/users", None, body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);

    let json = read_json(response).await;
    assert_eq!(json["success"], true);
    assert_eq!(json["data"]["name"], "Ada Admin");
    assert_eq!(json["data"]["email"], "ada@example.com");
    assert_eq!(json["data"]["roles"], json!(["admin"]));
    assert_eq!(json["data"]["active"], true);
    assert_eq!(json["data"]["owned_controls"], json!([]));
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_create_duplicate_email_conflict(pool: PgPool) {
    seed_admin(&pool, "ada@example.com").await;
    let app = test_app(pool);

    let body = json!({
        "name": "Another Ada",
        "email": "ada@example.com",
        "roles": ["control-owner"]
    });

    let response = app
        .oneshot(json_request(Method::POST, "/api/users", None, body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CONFLICT);

    let json = read_json(response).await;
    assert_eq!(json["error"]["code"], "CONFLICT");
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_create_rejects_unknown_role(pool: PgPool) {
    let app = test_app(pool);

    let body = json!({
        "name": "Sam Super",
        "email": "sam@example.com",
        "roles": ["superuser"]
    });

    let response = app
        .oneshot(json_request(Method::POST, "/api/users", None, body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = read_json(response).await;
    assert_eq!(json["error"]["code"], "VALIDATION_ERROR");
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_update_user_merges_fields(pool: PgPool) {
    let user_id = seed_admin(&pool, "ada@example.com").await;
    let app = test_app(pool);

    let response = app
        .oneshot(json_request(
            Method::PUT,
            &format!("/api/users/{}", user_id),
            None,
            json!({ "name": "Ada Lovelace" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let json = read_json(response).await;
    assert_eq!(json["data"]["name"], "Ada Lovelace");
    assert_eq!(json["data"]["email"], "ada@example.com");
    assert_eq!(json["data"]["roles"], json!(["admin"]));
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_demote_last_admin_conflicts(pool: PgPool) {
    let user_id = seed_admin(&pool, "ada@example.com").await;
    let app = test_app(pool);

    let response = app
        .oneshot(json_request(
            Method::PUT,
            &format!("/api/users/{}", user_id),
            None,
            json!({ "roles": ["control-owner"] }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CONFLICT);

    let json = read_json(response).await;
    assert_eq!(json["error"]["code"], "CONFLICT");
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_delete_last_admin_conflicts(pool: PgPool) {
    let user_id = seed_admin(&pool, "ada@example.com").await;
    let app = test_app(pool);

    let response = app
        .clone()
        .oneshot(bare_request(
            Method::DELETE,
            &format!("/api/users/{}", user_id),
            None,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CONFLICT);

    // The account survives the rejected deletion
    let response = app
        .oneshot(get(&format!("/api/users/{}", user_id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_delete_user_releases_owned_controls(pool: PgPool) {
    let owner_id = seed_user(
        &pool,
        "Olivia Owner",
        "olivia@example.com",
        &["control-owner"],
        true,
    )
    .await;
    let control_id = seed_control(&pool, "FIN-001", "Bank reconciliation").await;
    assign_owner(&pool, control_id, owner_id).await;
    let app = test_app(pool);

    let response = app
        .clone()
        .oneshot(bare_request(
            Method::DELETE,
            &format!("/api/users/{}", owner_id),
            None,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let json = read_json(response).await;
    assert_eq!(json["data"]["email"], "olivia@example.com");
    assert_eq!(json["data"]["released_controls"], json!([control_id]));

    // The control stays behind without an owner
    let response = app
        .oneshot(get(&format!("/api/controls/{}", control_id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = read_json(response).await;
    assert!(json["data"]["owner_id"].is_null());
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_get_user_lists_owned_controls_in_code_order(pool: PgPool) {
    let owner_id = seed_user(
        &pool,
        "Olivia Owner",
        "olivia@example.com",
        &["control-owner"],
        true,
    )
    .await;
    let second = seed_control(&pool, "ITGC-001", "Access review").await;
    let first = seed_control(&pool, "FIN-001", "Bank reconciliation").await;
    assign_owner(&pool, second, owner_id).await;
    assign_owner(&pool, first, owner_id).await;
    let app = test_app(pool);

    let response = app
        .oneshot(get(&format!("/api/users/{}", owner_id)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let json = read_json(response).await;
    assert_eq!(json["data"]["owned_controls"], json!([first, second]));
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_list_users_filters_by_role(pool: PgPool) {
    seed_admin(&pool, "ada@example.com").await;
    seed_admin(&pool, "grace@example.com").await;
    seed_user(
        &pool,
        "Olivia Owner",
        "olivia@example.com",
        &["control-owner"],
        true,
    )
    .await;
    let app = test_app(pool);

    let response = app.oneshot(get("/api/users?role=admin")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let json = read_json(response).await;
    assert_eq!(json["data"].as_array().unwrap().len(), 2);
    assert_eq!(json["meta"]["pagination"]["total"], 2);
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_get_user_not_found(pool: PgPool) {
    let app = test_app(pool);

    let response = app
        .oneshot(get(&format!("/api/users/{}", Uuid::new_v4())))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let json = read_json(response).await;
    assert_eq!(json["success"], false);
    assert_eq!(json["error"]["code"], "NOT_FOUND");
}
