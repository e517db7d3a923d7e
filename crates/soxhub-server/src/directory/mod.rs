//! Directory integration shim
//!
//! Optional read-side integration with a Graph-style directory service
//! that hosts the compliance list. The client resolves the site and list
//! ids once, caches them, and exposes column metadata over the API. When
//! the settings are absent the whole shim stays disabled and the rest of
//! the server is unaffected.

pub mod client;
pub mod routes;
pub mod types;

pub use client::{DirectoryClient, DirectoryError, DirectoryHandle, IdCache};
pub use routes::directory_routes;
pub use types::ColumnDefinition;
