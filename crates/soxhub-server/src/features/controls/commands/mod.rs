pub mod create;
pub mod import;
pub mod set_status;
pub mod update;

pub use create::{CreateControlCommand, CreateControlError};
pub use import::{ImportControlsCommand, ImportControlsError, ImportControlsResponse};
pub use set_status::{SetControlStatusCommand, SetControlStatusError};
pub use update::{UpdateControlCommand, UpdateControlError};
