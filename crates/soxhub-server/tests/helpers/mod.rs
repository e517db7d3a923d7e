//! Test helpers for SOX Hub server integration tests
//!
//! This module provides utilities for:
//! - Building the full application router against a test database
//! - Seeding users and controls directly in SQL
//! - Constructing JSON requests with the acting-user header
//! - Reading response bodies back as JSON

#![allow(dead_code)]

use axum::body::Body;
use axum::http::{header, Method, Request};
use axum::response::Response;
use axum::Router;
use serde_json::Value;
use soxhub_server::api::{create_router, AppState};
use soxhub_server::config::Config;
use sqlx::PgPool;
use uuid::Uuid;

/// Build the application router backed by the given pool
///
/// The directory integration is left unconfigured, so its endpoints
/// report `configured: false` rather than calling out.
pub fn test_app(pool: PgPool) -> Router {
    let state = AppState {
        db: pool,
        directory: None,
    };
    create_router(state, &Config::default())
}

/// Insert an active user holding only the admin role and return its id
pub async fn seed_admin(pool: &PgPool, email: &str) -> Uuid {
    seed_user(pool, "Seed Admin", email, &["admin"], true).await
}

/// Insert a user with the given roles and return its id
pub async fn seed_user(
    pool: &PgPool,
    name: &str,
    email: &str,
    roles: &[&str],
    active: bool,
) -> Uuid {
    let roles: Vec<String> = roles.iter().map(|r| r.to_string()).collect();

    sqlx::query_scalar::<_, Uuid>(
        "INSERT INTO users (name, email, roles, active) VALUES ($1, $2, $3, $4) RETURNING id",
    )
    .bind(name)
    .bind(email)
    .bind(&roles)
    .bind(active)
    .fetch_one(pool)
    .await
    .expect("Failed to seed user")
}

/// Insert a minimal active control and return its id
///
/// Seeding bypasses the API on purpose, so the control carries no
/// history entries until an endpoint touches it.
pub async fn seed_control(pool: &PgPool, code: &str, name: &str) -> Uuid {
    sqlx::query_scalar::<_, Uuid>(
        r#"
        INSERT INTO controls (code, name, frequency, control_type, status)
        VALUES ($1, $2, 'monthly', 'preventive', 'active')
        RETURNING id
        "#,
    )
    .bind(code)
    .bind(name)
    .fetch_one(pool)
    .await
    .expect("Failed to seed control")
}

/// Assign an owner to a seeded control
pub async fn assign_owner(pool: &PgPool, control_id: Uuid, owner_id: Uuid) {
    sqlx::query("UPDATE controls SET owner_id = $1 WHERE id = $2")
        .bind(owner_id)
        .bind(control_id)
        .execute(pool)
        .await
        .expect("Failed to assign control owner");
}

/// Build a GET request for the given URI
pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

/// Build a JSON request, optionally acting as the given user
///
/// The acting user travels in the `x-user-id` header, the same way API
/// clients send it.
pub fn json_request(method: Method, uri: &str, actor: Option<Uuid>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");

    if let Some(actor) = actor {
        builder = builder.header("x-user-id", actor.to_string());
    }

    builder.body(Body::from(body.to_string())).unwrap()
}

/// Build a bodyless request, optionally acting as the given user
pub fn bare_request(method: Method, uri: &str, actor: Option<Uuid>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);

    if let Some(actor) = actor {
        builder = builder.header("x-user-id", actor.to_string());
    }

    builder.body(Body::empty()).unwrap()
}

/// Read a response body as JSON
pub async fn read_json(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read response body");

    serde_json::from_slice(&bytes).expect("Response body was not valid JSON")
}
