//! Integration tests for control registry API endpoints

use axum::http::{Method, StatusCode};
use serde_json::json;
use sqlx::PgPool;
use tower::ServiceExt; // for `oneshot` and `ready`
use uuid::Uuid;

mod helpers;
use helpers::{get, json_request, read_json, seed_admin, seed_control, test_app};

#[sqlx::test(migrations = "../../migrations")]
async fn test_create_control_returns_envelope(pool: PgPool) {
    let app = test_app(pool);

    let body = json!({
        "code": "FIN-001",
        "name": "Bank reconciliation",
        "description": "Monthly reconciliation of all bank accounts",
        "frequency": "monthly",
        "control_type": "detective"
    });

    let response = app
        .oneshot(json_request(Method::POST, "/api/controls", None, body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);

    let json = read_json(response).await;
    assert_eq!(json["success"], true);
    assert_eq!(json["data"]["code"], "FIN-001");
    assert_eq!(json["data"]["name"], "Bank reconciliation");
    assert_eq!(json["data"]["status"], "draft");
    assert!(json["data"]["id"].is_string());
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_create_control_records_history(pool: PgPool) {
    let admin_id = seed_admin(&pool, "admin@example.com").await;
    let app = test_app(pool);

    let body = json!({
        "code": "FIN-001",
        "name": "Bank reconciliation",
        "frequency": "monthly",
        "control_type": "detective",
        "status": "active"
    });

    let response = app
        .clone()
        .oneshot(json_request(
            Method::POST,
            "/api/controls",
            Some(admin_id),
            body,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let created = read_json(response).await;
    let control_id = created["data"]["id"].as_str().unwrap().to_string();

    let response = app
        .oneshot(get(&format!("/api/controls/{}/history", control_id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = read_json(response).await;
    let entries = json["data"].as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["summary"], "Created");
    assert_eq!(entries[0]["changed_by"], admin_id.to_string());
    assert_eq!(entries[0]["new_values"]["code"], "FIN-001");
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_create_duplicate_code_conflict(pool: PgPool) {
    seed_control(&pool, "FIN-001", "Bank reconciliation").await;
    let app = test_app(pool);

    let body = json!({
        "code": "FIN-001",
        "name": "Another control",
        "frequency": "monthly",
        "control_type": "preventive"
    });

    let response = app
        .oneshot(json_request(Method::POST, "/api/controls", None, body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CONFLICT);

    let json = read_json(response).await;
    assert_eq!(json["success"], false);
    assert_eq!(json["error"]["code"], "CONFLICT");
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_create_rejects_unknown_frequency(pool: PgPool) {
    let app = test_app(pool);

    let body = json!({
        "code": "FIN-001",
        "name": "Bank reconciliation",
        "frequency": "hourly",
        "control_type": "detective"
    });

    let response = app
        .oneshot(json_request(Method::POST, "/api/controls", None, body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = read_json(response).await;
    assert_eq!(json["error"]["code"], "VALIDATION_ERROR");
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_update_control_merges_fields(pool: PgPool) {
    let control_id = seed_control(&pool, "FIN-001", "Bank reconciliation").await;
    let app = test_app(pool);

    let response = app
        .clone()
        .oneshot(json_request(
            Method::PUT,
            &format!("/api/controls/{}", control_id),
            None,
            json!({ "name": "Daily bank reconciliation" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let json = read_json(response).await;
    assert_eq!(json["data"]["name"], "Daily bank reconciliation");
    assert_eq!(json["data"]["code"], "FIN-001");

    // The edit lands in the version history
    let response = app
        .oneshot(get(&format!("/api/controls/{}/history", control_id)))
        .await
        .unwrap();
    let json = read_json(response).await;
    let entries = json["data"].as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["summary"], "Updated name");
    assert_eq!(entries[0]["previous_values"]["name"], "Bank reconciliation");
    assert_eq!(entries[0]["new_values"]["name"], "Daily bank reconciliation");
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_update_rejects_status_field(pool: PgPool) {
    let control_id = seed_control(&pool, "FIN-001", "Bank reconciliation").await;
    let app = test_app(pool);

    // Status changes only travel through the dedicated endpoint
    let response = app
        .oneshot(json_request(
            Method::PUT,
            &format!("/api/controls/{}", control_id),
            None,
            json!({ "status": "inactive" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_update_unknown_control_not_found(pool: PgPool) {
    let app = test_app(pool);

    let response = app
        .oneshot(json_request(
            Method::PUT,
            &format!("/api/controls/{}", Uuid::new_v4()),
            None,
            json!({ "name": "New name" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let json = read_json(response).await;
    assert_eq!(json["success"], false);
    assert_eq!(json["error"]["code"], "NOT_FOUND");
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_set_status_changes_lifecycle(pool: PgPool) {
    let control_id = seed_control(&pool, "FIN-001", "Bank reconciliation").await;
    let app = test_app(pool);

    let response = app
        .clone()
        .oneshot(json_request(
            Method::POST,
            &format!("/api/controls/{}/status", control_id),
            None,
            json!({ "status": "inactive" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let json = read_json(response).await;
    assert_eq!(json["data"]["status"], "inactive");

    // Repeating the same status is a no-op, not an error
    let response = app
        .oneshot(json_request(
            Method::POST,
            &format!("/api/controls/{}/status", control_id),
            None,
            json!({ "status": "inactive" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_import_creates_whole_batch(pool: PgPool) {
    let app = test_app(pool);

    let body = json!({
        "controls": [
            {
                "code": "FIN-001",
                "name": "Bank reconciliation",
                "frequency": "monthly",
                "control_type": "detective"
            },
            {
                "code": "ITGC-001",
                "name": "Access review",
                "frequency": "quarterly",
                "control_type": "preventive"
            }
        ]
    });

    let response = app
        .clone()
        .oneshot(json_request(Method::POST, "/api/controls/import", None, body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);

    let json = read_json(response).await;
    assert_eq!(json["data"]["imported"], 2);

    let response = app.oneshot(get("/api/controls")).await.unwrap();
    let json = read_json(response).await;
    assert_eq!(json["meta"]["pagination"]["total"], 2);
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_import_rejects_batch_on_invalid_row(pool: PgPool) {
    let app = test_app(pool);

    let body = json!({
        "controls": [
            {
                "code": "FIN-001",
                "name": "Bank reconciliation",
                "frequency": "monthly",
                "control_type": "detective"
            },
            {
                "code": "FIN-002",
                "name": "Broken row",
                "frequency": "hourly",
                "control_type": "detective"
            }
        ]
    });

    let response = app
        .clone()
        .oneshot(json_request(Method::POST, "/api/controls/import", None, body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Nothing from the batch was imported
    let response = app.oneshot(get("/api/controls")).await.unwrap();
    let json = read_json(response).await;
    assert_eq!(json["meta"]["pagination"]["total"], 0);
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_list_controls_paginates(pool: PgPool) {
    seed_control(&pool, "FIN-001", "Bank reconciliation").await;
    seed_control(&pool, "FIN-002", "Journal entry review").await;
    seed_control(&pool, "ITGC-001", "Access review").await;
    let app = test_app(pool);

    let response = app
        .oneshot(get("/api/controls?page=2&per_page=2"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let json = read_json(response).await;
    assert_eq!(json["data"].as_array().unwrap().len(), 1);
    assert_eq!(json["meta"]["pagination"]["page"], 2);
    assert_eq!(json["meta"]["pagination"]["per_page"], 2);
    assert_eq!(json["meta"]["pagination"]["total"], 3);
    assert_eq!(json["meta"]["pagination"]["has_prev"], true);
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_list_controls_filters_by_status(pool: PgPool) {
    seed_control(&pool, "FIN-001", "Bank reconciliation").await;
    let app = test_app(pool);

    // Created without an explicit status, so it lands in draft
    let response = app
        .clone()
        .oneshot(json_request(
            Method::POST,
            "/api/controls",
            None,
            json!({
                "code": "FIN-002",
                "name": "Journal entry review",
                "frequency": "monthly",
                "control_type": "detective"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app.oneshot(get("/api/controls?status=draft")).await.unwrap();
    let json = read_json(response).await;

    let items = json["data"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["code"], "FIN-002");
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_get_control_not_found(pool: PgPool) {
    let app = test_app(pool);

    let response = app
        .oneshot(get(&format!("/api/controls/{}", Uuid::new_v4())))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let json = read_json(response).await;
    assert_eq!(json["success"], false);
    assert_eq!(json["error"]["code"], "NOT_FOUND");
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_history_for_unknown_control_not_found(pool: PgPool) {
    let app = test_app(pool);

    let response = app
        .oneshot(get(&format!("/api/controls/{}/history", Uuid::new_v4())))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
