//! SOX Hub Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared types, utilities, and error handling for the SOX Hub workspace.
//!
//! # Overview
//!
//! This crate provides common functionality used across SOX Hub workspace members:
//!
//! - **Error Handling**: Custom error types and result types
//! - **Logging**: Tracing setup with console/file output and rotation
//! - **Types**: Shared compliance domain types (roles, control enums, change sets)
//!
//! # Example
//!
//! ```no_run
//! use soxhub_common::types::ControlStatus;
//!
//! let status: ControlStatus = "active".parse().unwrap();
//! assert_eq!(status.as_str(), "active");
//! ```

pub mod error;
pub mod logging;
pub mod types;

// Re-export commonly used types
pub use error::{HubError, Result};
