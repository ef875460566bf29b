pub mod config;
pub mod pool;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::OwnedRwLockWriteGuard;

use crate::core::{Result, StoreError};
use crate::storage::{ContextDb, EntityRecord, InstanceKey, SharedDb};
use crate::transaction::WriteTransaction;

pub use config::{ConnectionConfig, StoreConfig};
pub use pool::{ConnectionPool, PoolGuard, PoolStats};

/// Database connection handle bound to one tenant store.
///
/// Single-statement operations run in their own implicit transaction;
/// `begin()` opens an explicit [`WriteTransaction`] for multi-statement
/// units of work.
#[derive(Debug)]
pub struct Connection {
    /// Unique connection ID
    id: u64,
    /// Shared store instance
    db: SharedDb,
    /// Database name, for diagnostics
    database_name: String,
    /// Connection state
    state: ConnectionState,
    /// Bound on waiting for the store's locks
    transaction_timeout: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConnectionState {
    Active,
    Closed,
}

impl Connection {
    /// Create a new connection (internal use)
    pub(crate) fn new(
        id: u64,
        db: SharedDb,
        database_name: String,
        transaction_timeout: Duration,
    ) -> Self {
        Self {
            id,
            db,
            database_name,
            state: ConnectionState::Active,
            transaction_timeout,
        }
    }

    /// Get connection ID
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Name of the database this connection is bound to
    pub fn database_name(&self) -> &str {
        &self.database_name
    }

    /// Check if connection is active
    pub fn is_active(&self) -> bool {
        self.state == ConnectionState::Active
    }

    /// Close the connection
    pub fn close(&mut self) {
        self.state = ConnectionState::Closed;
    }

    fn ensure_active(&self) -> Result<()> {
        if self.state == ConnectionState::Closed {
            return Err(StoreError::Execution("Connection is closed".into()));
        }
        Ok(())
    }

    async fn write_guard(&self) -> Result<OwnedRwLockWriteGuard<ContextDb>> {
        self.ensure_active()?;
        tokio::time::timeout(self.transaction_timeout, Arc::clone(&self.db).write_owned())
            .await
            .map_err(|_| StoreError::Timeout(self.transaction_timeout))
    }

    /// Begin an explicit write transaction. The transaction owns the store
    /// for its duration; commit or rollback (or drop) releases it.
    pub async fn begin(&mut self) -> Result<WriteTransaction> {
        Ok(WriteTransaction::new(self.write_guard().await?))
    }

    /// Run a read closure against the store.
    pub async fn read<T>(&self, f: impl FnOnce(&ContextDb) -> T) -> Result<T> {
        self.ensure_active()?;
        let guard = tokio::time::timeout(self.transaction_timeout, self.db.read())
            .await
            .map_err(|_| StoreError::Timeout(self.transaction_timeout))?;
        Ok(f(&guard))
    }

    // ------------------------------------------------------------------
    // single-statement operations (implicit transaction each)
    // ------------------------------------------------------------------

    pub async fn upsert_entity(&mut self, id: &str, record: EntityRecord) -> Result<usize> {
        let mut txn = self.begin().await?;
        let rows = txn.upsert_entity(id, record)?;
        txn.commit()?;
        Ok(rows)
    }

    pub async fn delete_entity(&mut self, id: &str) -> Result<usize> {
        let mut txn = self.begin().await?;
        let rows = txn.delete_entity(id)?;
        txn.commit()?;
        Ok(rows)
    }

    pub async fn delete_temporal_entity(&mut self, id: &str) -> Result<usize> {
        let mut txn = self.begin().await?;
        let rows = txn.delete_temporal_entity(id)?;
        txn.commit()?;
        Ok(rows)
    }

    pub async fn delete_attribute_instance(&mut self, key: &InstanceKey) -> Result<usize> {
        let mut txn = self.begin().await?;
        let rows = txn.delete_attribute_instance(key)?;
        txn.commit()?;
        Ok(rows)
    }

    pub async fn clear_attribute(&mut self, entity_id: &str, attribute_id: &str) -> Result<usize> {
        let mut txn = self.begin().await?;
        let rows = txn.clear_attribute(entity_id, attribute_id)?;
        txn.commit()?;
        Ok(rows)
    }

    pub async fn upsert_tenant(&mut self, tenant_id: &str, database_name: &str) -> Result<usize> {
        let mut txn = self.begin().await?;
        let rows = txn.upsert_tenant(tenant_id, database_name)?;
        txn.commit()?;
        Ok(rows)
    }

    pub async fn remove_tenant(&mut self, tenant_id: &str) -> Result<usize> {
        let mut txn = self.begin().await?;
        let rows = txn.remove_tenant(tenant_id)?;
        txn.commit()?;
        Ok(rows)
    }
}
