pub mod get;
pub mod list;

pub use get::{GetChangeRequestError, GetChangeRequestQuery};
pub use list::{ListChangeRequestsError, ListChangeRequestsQuery, ListChangeRequestsResponse};
