//! CQRS marker traits
//!
//! Commands mutate state and must write a version history entry when they
//! touch a control; queries read state and write nothing. The markers keep
//! the split visible at the type level when handlers are registered on the
//! mediator.

/// Marker for state-mutating operations
pub trait Command {}

/// Marker for read-only operations
pub trait Query {}
