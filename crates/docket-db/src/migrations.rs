//! Embedded schema migrations.
//!
//! Every statement is written with `IF NOT EXISTS`, so the whole list runs
//! on each open and an up-to-date store is left unchanged.

use crate::DocketDb;
use crate::error::DatabaseError;

/// Ordered `(name, sql)` pairs applied on open.
const MIGRATIONS: &[(&str, &str)] = &[(
    "001_initial",
    include_str!("../migrations/001_initial.sql"),
)];

impl DocketDb {
    pub(crate) async fn run_migrations(&self) -> Result<(), DatabaseError> {
        for (name, sql) in MIGRATIONS {
            self.conn
                .execute_batch(sql)
                .await
                .map_err(|e| DatabaseError::Migration(format!("{name}: {e}")))?;
            tracing::debug!(migration = *name, "schema migration applied");
        }
        Ok(())
    }
}
