//! SOX Hub Server Library
#![recursion_limit = "256"]
//!
//! HTTP server for tracking internal financial controls.
//!
//! # Overview
//!
//! The SOX Hub server provides a REST API for compliance tracking:
//!
//! - **Control Registry**: CRUD over SOX control records
//! - **Change Requests**: owner-submitted proposals routed to admin review
//! - **Version History**: append-only log of every control mutation
//! - **User Administration**: admins and control owners with role rules
//! - **Directory Integration**: optional SharePoint-style list backend
//!
//! # Architecture
//!
//! The server follows a **CQRS (Command Query Responsibility Segregation)** architecture:
//!
//! - **Commands** (Write Operations): create/update/import controls, submit
//!   and decide change requests, manage users. Every control mutation writes
//!   a `control_versions` row in the same transaction.
//! - **Queries** (Read Operations): list/get operations with filtering and
//!   pagination. Reads write nothing.
//!
//! Control mutations and their history entries commit atomically, so the
//! version log is a faithful record of how each control reached its current
//! shape. Query the log via `/api/history` or per control via
//! `/api/controls/{id}/history`.
//!
//! ## Framework Stack
//!
//! - **Axum**: web framework
//! - **SQLx**: PostgreSQL driver and migrations
//! - **Tower**: middleware and service abstractions
//!
//! # Example
//!
//! ```no_run
//! use soxhub_server::{api, config::Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load()?;
//!     api::serve(config).await?;
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod config;
pub mod cqrs;
pub mod db;
pub mod directory;
pub mod error;
pub mod features;
pub mod history;
pub mod middleware;

// Re-export commonly used types
pub use error::{AppError, AppResult};
