//! User queries

pub mod get;
pub mod list;

pub use get::{GetUserError, GetUserQuery};
pub use list::{ListUsersError, ListUsersQuery, ListUsersResponse};
