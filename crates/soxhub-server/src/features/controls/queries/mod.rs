pub mod get;
pub mod list;

pub use get::{GetControlError, GetControlQuery};
pub use list::{ControlListItem, ListControlsError, ListControlsQuery, ListControlsResponse};
