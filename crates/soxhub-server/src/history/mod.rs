//! Version history module
//!
//! Every accepted change to a control appends an entry to the
//! `control_versions` table: who changed it, when, a human-readable summary,
//! and the previous and new values of the touched fields. Entries are written
//! in the same transaction as the control change, so the log and the registry
//! cannot drift apart. The log is insert-only; nothing updates or deletes
//! entries once written.
//!
//! # Example: Appending an Entry
//!
//! ```no_run
//! use soxhub_server::history::{append_entry, NewVersionEntry};
//! use sqlx::PgPool;
//! use uuid::Uuid;
//!
//! # async fn example(pool: &PgPool) -> Result<(), Box<dyn std::error::Error>> {
//! let entry = NewVersionEntry::builder(Uuid::new_v4())
//!     .changed_by(Some(Uuid::new_v4()))
//!     .summary("Updated description")
//!     .previous_values(serde_json::json!({ "description": "old" }))
//!     .new_values(serde_json::json!({ "description": "new" }))
//!     .build();
//!
//! let record = append_entry(pool, entry).await?;
//! println!("Appended version entry: {}", record.id);
//! # Ok(())
//! # }
//! ```

mod models;
mod queries;
pub mod routes;

pub use models::{
    HistoryQuery, NewVersionEntry, VersionEntry, VersionEntryBuilder,
    DEFAULT_HISTORY_QUERY_LIMIT, MAX_HISTORY_QUERY_LIMIT,
};
pub use queries::{append_entry, get_control_history, query_history};
