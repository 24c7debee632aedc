//! libSQL backend: async `DraftStore` implementation.
//!
//! Supports local file and in-memory databases. Every row is scoped by a
//! session id so several devices can share one database file.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use libsql::{Connection, Database as LibSqlDatabase, params};
use tracing::info;

use crate::error::DatabaseError;
use crate::store::migrations;
use crate::store::traits::DraftStore;

/// libSQL draft store.
///
/// `libsql::Connection` is `Send + Sync` and safe for concurrent async use.
pub struct LibSqlDraftStore {
    db: Arc<LibSqlDatabase>,
    conn: Connection,
    session_id: String,
}

impl LibSqlDraftStore {
    /// Open (or create) a local database file and run migrations.
    pub async fn new_local(path: &Path, session_id: &str) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                DatabaseError::Pool(format!("Failed to create database directory: {e}"))
            })?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| DatabaseError::Pool(format!("Failed to open libSQL database: {e}")))?;

        let store = Self::from_database(db, session_id).await?;
        info!(path = %path.display(), session = session_id, "Draft store opened");
        Ok(store)
    }

    /// Create an in-memory database (for tests).
    pub async fn new_memory(session_id: &str) -> Result<Self, DatabaseError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| {
                DatabaseError::Pool(format!("Failed to create in-memory database: {e}"))
            })?;
        Self::from_database(db, session_id).await
    }

    async fn from_database(db: LibSqlDatabase, session_id: &str) -> Result<Self, DatabaseError> {
        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Pool(format!("Failed to create connection: {e}")))?;
        migrations::run_migrations(&conn).await?;
        Ok(Self {
            db: Arc::new(db),
            conn,
            session_id: session_id.to_string(),
        })
    }

    /// The same database viewed under a different session.
    pub fn for_session(&self, session_id: &str) -> Self {
        Self {
            db: Arc::clone(&self.db),
            conn: self.conn.clone(),
            session_id: session_id.to_string(),
        }
    }

    fn conn(&self) -> &Connection {
        &self.conn
    }
}

#[async_trait]
impl DraftStore for LibSqlDraftStore {
    async fn get(&self, key: &str) -> Result<Option<String>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                "SELECT value FROM draft_entries WHERE session_id = ?1 AND key = ?2",
                params![self.session_id.as_str(), key],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("get: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => row
                .get::<String>(0)
                .map(Some)
                .map_err(|e| DatabaseError::Query(format!("get: {e}"))),
            Ok(None) => Ok(None),
            Err(e) => Err(DatabaseError::Query(format!("get: {e}"))),
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), DatabaseError> {
        let now = Utc::now().to_rfc3339();
        self.conn()
            .execute(
                "INSERT INTO draft_entries (session_id, key, value, updated_at) VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT (session_id, key) DO UPDATE SET value = ?3, updated_at = ?4",
                params![self.session_id.as_str(), key, value, now],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("set: {e}")))?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<bool, DatabaseError> {
        let count = self
            .conn()
            .execute(
                "DELETE FROM draft_entries WHERE session_id = ?1 AND key = ?2",
                params![self.session_id.as_str(), key],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("remove: {e}")))?;
        Ok(count > 0)
    }
}
