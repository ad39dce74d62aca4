//! # docket-db
//!
//! libSQL store for Docket state: epics, features, tasks, task history,
//! and the persisted sync state.
//!
//! Uses the `libsql` crate (C `SQLite` fork, v0.9.29) as an embedded local
//! database. Repository methods live in `repos/` as `impl DocketService` blocks.

pub mod error;
pub mod helpers;
mod migrations;
pub mod repos;
pub mod service;
pub mod updates;

mod test_support;

use error::DatabaseError;
use libsql::Builder;

/// Central database handle for all Docket state operations.
///
/// Wraps a libSQL database and connection and generates store identifiers.
pub struct DocketDb {
    #[allow(dead_code)]
    db: libsql::Database,
    conn: libsql::Connection,
}

impl DocketDb {
    /// Open a local database at the given path (`":memory:"` for tests).
    ///
    /// Runs migrations automatically on every open.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the database cannot be opened or
    /// migrations fail.
    pub async fn open_local(path: &str) -> Result<Self, DatabaseError> {
        let db = Builder::new_local(path).build().await?;
        let conn = db.connect()?;

        // Enable foreign keys (must be per-connection in SQLite)
        conn.execute("PRAGMA foreign_keys = ON", ())
            .await
            .map_err(|e| DatabaseError::Migration(format!("PRAGMA foreign_keys: {e}")))?;

        let docket_db = Self { db, conn };
        docket_db.run_migrations().await?;
        Ok(docket_db)
    }

    /// Access the underlying libSQL connection for direct queries.
    #[must_use]
    pub const fn conn(&self) -> &libsql::Connection {
        &self.conn
    }

    /// Generate a prefixed ID via libSQL. Returns e.g., `"tsk-a3f8b2c1"`.
    ///
    /// Uses `randomblob(4)` in SQL to produce 8-char hex, then prepends the prefix.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails or returns no rows.
    pub async fn generate_id(&self, prefix: &str) -> Result<String, DatabaseError> {
        let mut rows = self
            .conn
            .query(
                &format!("SELECT '{prefix}-' || lower(hex(randomblob(4)))"),
                (),
            )
            .await?;
        let row = rows.next().await?.ok_or(DatabaseError::NoResult)?;
        Ok(row.get::<String>(0)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Helper to create an in-memory database for testing.
    async fn test_db() -> DocketDb {
        DocketDb::open_local(":memory:").await.unwrap()
    }

    #[tokio::test]
    async fn open_local_creates_schema() {
        let db = test_db().await;

        let tables = ["epics", "features", "tasks", "task_history", "sync_state"];
        for table in &tables {
            let mut rows = db
                .conn()
                .query(
                    "SELECT name FROM sqlite_master WHERE type='table' AND name=?1",
                    [*table],
                )
                .await
                .unwrap();
            let row = rows.next().await.unwrap();
            assert!(row.is_some(), "table '{table}' should exist");
        }
    }

    #[tokio::test]
    async fn migrations_are_idempotent() {
        let db = test_db().await;
        db.run_migrations().await.unwrap();
    }

    #[tokio::test]
    async fn generate_id_correct_format() {
        let db = test_db().await;
        let id = db.generate_id("tsk").await.unwrap();
        assert!(id.starts_with("tsk-"), "ID should start with 'tsk-': {id}");
        assert_eq!(
            id.len(),
            12,
            "ID should be 12 chars (3 prefix + 1 dash + 8 hex): {id}"
        );

        let hex_part = &id[4..];
        assert!(
            hex_part.chars().all(|c| c.is_ascii_hexdigit()),
            "Random part should be hex: {hex_part}"
        );
    }

    #[tokio::test]
    async fn foreign_keys_enabled() {
        let db = test_db().await;
        let result = db
            .conn()
            .execute(
                "INSERT INTO features (id, epic_id, key, title) VALUES ('fea-1', 'epc-missing', 'E01-F01', 'x')",
                (),
            )
            .await;
        assert!(result.is_err(), "dangling epic_id should be rejected");
    }

    #[tokio::test]
    async fn file_backed_database_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("docket.db");
        let path = path.to_str().unwrap();

        {
            let db = DocketDb::open_local(path).await.unwrap();
            db.conn()
                .execute(
                    "INSERT INTO epics (id, key, title) VALUES ('epc-1', 'E01', 'Auth')",
                    (),
                )
                .await
                .unwrap();
        }

        let db = DocketDb::open_local(path).await.unwrap();
        let mut rows = db
            .conn()
            .query("SELECT title FROM epics WHERE key = 'E01'", ())
            .await
            .unwrap();
        let row = rows.next().await.unwrap().unwrap();
        assert_eq!(row.get::<String>(0).unwrap(), "Auth");
    }
}
