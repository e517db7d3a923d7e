//! Feature modules implementing the hub API
//!
//! This module contains all feature slices following the CQRS (Command Query
//! Responsibility Segregation) pattern. Each feature is organized as a
//! vertical slice with its own commands, queries, and routes.
//!
//! # Features
//!
//! - **controls**: CRUD and bulk import for the internal control registry
//! - **change_requests**: Submit/approve/reject workflow for control edits
//! - **users**: Account and role administration with last-admin protection
//!
//! # Architecture
//!
//! Each feature module follows the structure:
//! - `commands/` - Write operations (create, update, delete)
//! - `queries/` - Read operations (get, list)
//! - `models.rs` - Row and response types
//! - `routes.rs` - HTTP route definitions
//!
//! Commands and queries implement the mediator pattern using the `mediator`
//! crate, enabling clean separation of concerns and easy testing.

pub mod change_requests;
pub mod controls;
pub mod shared;
pub mod users;

use axum::Router;

use crate::directory::DirectoryHandle;

/// Shared state for all feature routes
///
/// Contains the database connection pool and the optional directory
/// integration client.
#[derive(Clone)]
pub struct FeatureState {
    /// PostgreSQL connection pool for database operations
    pub db: sqlx::PgPool,
    /// Shared directory client, absent when the integration is not configured
    pub directory: DirectoryHandle,
}

/// Creates the main API router with all feature routes mounted
///
/// Each feature is mounted under its own path prefix:
/// - `/controls` - Control registry, including per-control history
/// - `/change-requests` - Change request workflow
/// - `/users` - User administration
/// - `/history` - Version history queries across all controls
/// - `/directory` - Directory integration status and metadata
pub fn router(state: FeatureState) -> Router<()> {
    Router::new()
        .nest("/controls", controls::controls_routes().with_state(state.db.clone()))
        .nest(
            "/change-requests",
            change_requests::change_requests_routes().with_state(state.db.clone()),
        )
        .nest("/users", users::users_routes().with_state(state.db.clone()))
        .nest(
            "/history",
            crate::history::routes::history_routes().with_state(state.db.clone()),
        )
        .nest(
            "/directory",
            crate::directory::directory_routes().with_state(state.directory.clone()),
        )
}
