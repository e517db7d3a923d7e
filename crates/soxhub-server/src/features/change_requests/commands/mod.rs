pub mod decide;
pub mod submit;

pub use decide::{DecideChangeRequestCommand, DecideChangeRequestError, Decision};
pub use submit::{SubmitChangeRequestCommand, SubmitChangeRequestError};
