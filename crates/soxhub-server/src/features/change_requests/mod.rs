//! Change request feature
//!
//! The four-eyes path for control edits. Owners submit a proposed change
//! set against a control; an admin approves or rejects it. Approval applies
//! the changes, writes the control, and appends the version history entry
//! in one transaction, so a request can only ever take effect once.

pub mod commands;
pub mod models;
pub mod queries;
pub mod routes;

pub use commands::{
    DecideChangeRequestCommand, DecideChangeRequestError, Decision, SubmitChangeRequestCommand,
    SubmitChangeRequestError,
};
pub use models::{ChangeRequestRecord, ChangeRequestResponse};
pub use queries::{
    GetChangeRequestError, GetChangeRequestQuery, ListChangeRequestsError, ListChangeRequestsQuery,
    ListChangeRequestsResponse,
};
pub use routes::change_requests_routes;
