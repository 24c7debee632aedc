//! Persistence layer: where an unfinished registration waits between
//! reloads.

pub mod libsql_backend;
pub mod memory;
pub mod migrations;
pub mod traits;

pub use libsql_backend::LibSqlDraftStore;
pub use memory::MemoryDraftStore;
pub use traits::{DraftStore, draft_keys};
