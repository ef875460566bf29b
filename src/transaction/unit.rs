use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::sync::OwnedRwLockWriteGuard;
use tracing::debug;

use super::{Transaction, TransactionId, TransactionState};
use crate::core::Result;
use crate::storage::{ContextDb, EntityRecord, InstanceKey};

/// One unit of work against a single tenant store.
///
/// The transaction owns the store's write guard for its whole lifetime, so
/// uncommitted changes are never observable by other connections: readers
/// and other writers of the same store wait until the guard drops. Stores of
/// other tenants are untouched.
///
/// Dropping an active transaction rolls it back: the undo log is applied
/// newest-first, restoring the exact pre-transaction table state.
#[derive(Debug)]
pub struct WriteTransaction {
    guard: OwnedRwLockWriteGuard<ContextDb>,
    txn: Transaction,
}

impl WriteTransaction {
    pub(crate) fn new(guard: OwnedRwLockWriteGuard<ContextDb>) -> Self {
        Self {
            guard,
            txn: Transaction::new(TransactionId::new()),
        }
    }

    pub fn id(&self) -> TransactionId {
        self.txn.id()
    }

    pub fn state(&self) -> TransactionState {
        self.txn.state()
    }

    pub fn change_count(&self) -> usize {
        self.txn.change_count()
    }

    /// Read access to the store, including this transaction's own
    /// uncommitted writes.
    pub fn db(&self) -> &ContextDb {
        &self.guard
    }

    // ------------------------------------------------------------------
    // delegated statements
    // ------------------------------------------------------------------

    pub fn upsert_entity(&mut self, id: &str, record: EntityRecord) -> Result<usize> {
        self.guard.upsert_entity(&mut self.txn, id, record)
    }

    pub fn delete_entity(&mut self, id: &str) -> Result<usize> {
        self.guard.delete_entity(&mut self.txn, id)
    }

    pub fn upsert_temporal_entity(
        &mut self,
        id: &str,
        entity_type: &str,
        created_at: DateTime<Utc>,
        modified_at: DateTime<Utc>,
    ) -> Result<usize> {
        self.guard
            .upsert_temporal_entity(&mut self.txn, id, entity_type, created_at, modified_at)
    }

    pub fn touch_modified_at(&mut self, id: &str, modified_at: DateTime<Utc>) -> Result<usize> {
        self.guard.touch_modified_at(&mut self.txn, id, modified_at)
    }

    pub fn delete_temporal_entity(&mut self, id: &str) -> Result<usize> {
        self.guard.delete_temporal_entity(&mut self.txn, id)
    }

    pub fn upsert_attribute_instance(&mut self, key: InstanceKey, data: Value) -> Result<usize> {
        self.guard.upsert_attribute_instance(&mut self.txn, key, data)
    }

    pub fn delete_attribute_instance(&mut self, key: &InstanceKey) -> Result<usize> {
        self.guard.delete_attribute_instance(&mut self.txn, key)
    }

    pub fn clear_attribute(&mut self, entity_id: &str, attribute_id: &str) -> Result<usize> {
        self.guard.clear_attribute(&mut self.txn, entity_id, attribute_id)
    }

    pub fn upsert_tenant(&mut self, tenant_id: &str, database_name: &str) -> Result<usize> {
        self.guard.upsert_tenant(&mut self.txn, tenant_id, database_name)
    }

    pub fn remove_tenant(&mut self, tenant_id: &str) -> Result<usize> {
        self.guard.remove_tenant(&mut self.txn, tenant_id)
    }

    // ------------------------------------------------------------------
    // lifecycle
    // ------------------------------------------------------------------

    /// Make the transaction's changes permanent and release the store.
    pub fn commit(mut self) -> Result<()> {
        self.txn.commit()
    }

    /// Undo every recorded change and release the store.
    pub fn rollback(mut self) -> Result<()> {
        self.revert();
        self.txn.rollback()
    }

    fn revert(&mut self) {
        let changes = self.txn.take_changes();
        for change in changes.into_iter().rev() {
            self.guard.undo(change);
        }
    }
}

impl Drop for WriteTransaction {
    fn drop(&mut self) {
        if self.txn.state().is_active() {
            debug!(txn = %self.txn.id(), "rolling back unfinished transaction on drop");
            self.revert();
            let _ = self.txn.rollback();
        }
    }
}
