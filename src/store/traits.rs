//! `DraftStore` trait: key-value persistence for an in-progress
//! registration.

use async_trait::async_trait;

use crate::error::DatabaseError;

/// Keys under which the workflow persists itself.
pub mod draft_keys {
    /// Serialized draft answers and selected roles.
    pub const DRAFT: &str = "registration_draft";
    /// Current step index, as a decimal string.
    pub const STEP: &str = "registration_step";
    /// Session scope used when none is configured.
    pub const DEFAULT_SESSION: &str = "default";
}

/// Backend-agnostic string key-value store scoped to one device/session.
#[async_trait]
pub trait DraftStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, DatabaseError>;

    async fn set(&self, key: &str, value: &str) -> Result<(), DatabaseError>;

    /// Remove a key. Returns whether anything was removed.
    async fn remove(&self, key: &str) -> Result<bool, DatabaseError>;
}
