//! Control registry feature
//!
//! CRUD over the catalog of internal controls, plus the status-change path
//! and JSON bulk import. Every mutation appends a version history entry in
//! the same transaction, so the registry and the log move together.

pub mod changes;
pub mod commands;
pub mod models;
pub mod queries;
pub mod routes;

pub use changes::{apply_changes, snapshot, AppliedChanges};
pub use commands::{
    CreateControlCommand, CreateControlError, ImportControlsCommand, ImportControlsError,
    ImportControlsResponse, SetControlStatusCommand, SetControlStatusError, UpdateControlCommand,
    UpdateControlError,
};
pub use models::{ControlRecord, ControlResponse};
pub use queries::{
    ControlListItem, GetControlError, GetControlQuery, ListControlsError, ListControlsQuery,
    ListControlsResponse,
};
pub use routes::controls_routes;
