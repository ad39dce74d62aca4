//! Service layer wrapping `DocketDb`.
//!
//! All repo methods are implemented as `impl DocketService` blocks in `repos/`.
//! A sync pass groups its mutations with [`DocketService::begin_transaction`];
//! repo calls made while the transaction is open run inside it because they
//! share the same connection.

use libsql::{Transaction, TransactionBehavior};

use crate::DocketDb;
use crate::error::DatabaseError;

pub struct DocketService {
    db: DocketDb,
}

impl DocketService {
    /// Create a new service wrapping a local database.
    ///
    /// # Arguments
    ///
    /// * `db_path` - Path to the libSQL database file, or `":memory:"` for tests.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the database cannot be opened or migrated.
    pub async fn new_local(db_path: &str) -> Result<Self, DatabaseError> {
        let db = DocketDb::open_local(db_path).await?;
        Ok(Self { db })
    }

    /// Create from an existing `DocketDb`.
    #[must_use]
    pub const fn from_db(db: DocketDb) -> Self {
        Self { db }
    }

    /// Access the underlying database.
    #[must_use]
    pub const fn db(&self) -> &DocketDb {
        &self.db
    }

    /// Begin an immediate (write-intent) transaction on the shared connection.
    ///
    /// The caller must `commit()` explicitly; dropping or `rollback()`ing the
    /// returned transaction discards every statement executed since.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the transaction cannot be started (for
    /// example, another writer holds the database lock).
    pub async fn begin_transaction(&self) -> Result<Transaction, DatabaseError> {
        self.db
            .conn()
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .await
            .map_err(|e| DatabaseError::Query(format!("begin transaction: {e}")))
    }
}
