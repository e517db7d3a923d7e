//! User administration feature
//!
//! Accounts that own controls and review change requests. Roles are a flat
//! set (`admin`, `control-owner`); mutations that would strip the system of
//! its last active admin are refused, so there is always someone left who
//! can approve.

pub mod bootstrap;
pub mod commands;
pub mod models;
pub mod queries;
pub mod routes;

pub use bootstrap::ensure_bootstrap_admin;
pub use commands::{
    CreateUserCommand, CreateUserError, DeleteUserCommand, DeleteUserError, DeleteUserResponse,
    UpdateUserCommand, UpdateUserError,
};
pub use models::{UserRecord, UserResponse};
pub use queries::{GetUserError, GetUserQuery, ListUsersError, ListUsersQuery, ListUsersResponse};
pub use routes::users_routes;
