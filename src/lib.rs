// ============================================================================
// ContextStore Library
// ============================================================================

pub mod connection;
pub mod core;
pub mod model;
pub mod storage;
pub mod tenant;
pub mod transaction;
pub mod writer;

// Re-export main types for convenience
pub use crate::core::{Result, StoreError};
pub use crate::model::{
    AttributeOp, EntityDocuments, EntityRequest, EntityWrite, TemporalWrite, TemporalWriteRequest,
    WriteSummary, tenant_from_headers,
};

// Re-export connection API
pub use crate::connection::{
    Connection,
    config::{ConnectionConfig, StoreConfig},
    pool::{ConnectionPool, PoolGuard, PoolStats},
};
pub use crate::storage::{ContextDb, DatabaseCluster};
pub use crate::tenant::{DatasourceRouter, TenantRegistry};
pub use crate::transaction::WriteTransaction;
pub use crate::writer::{EntitySnapshotWriter, TemporalWriteCoordinator};

use std::sync::Arc;

// ============================================================================
// High-level write API
// ============================================================================

/// The storage write coordinator: tenant-aware routing plus the entity
/// snapshot and temporal history writers, behind one handle.
///
/// # Examples
///
/// ```
/// use contextstore::{EntityDocuments, EntityRequest, StorageWriter, StoreConfig};
/// use serde_json::json;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> contextstore::Result<()> {
/// let writer = StorageWriter::open(StoreConfig::new())?;
///
/// let request = EntityRequest::upsert(
///     "urn:ngsi-ld:Vehicle:A102",
///     EntityDocuments {
///         with_sys_attrs: json!({"speed": 55, "createdAt": "2026-01-01T00:00:00Z"}),
///         without_sys_attrs: json!({"speed": 55}),
///         key_values: json!({"speed": 55}),
///     },
/// );
/// let summary = writer.store_entity(&request).await?;
/// assert_eq!(summary.rows_affected, 1);
/// # Ok(())
/// # }
/// ```
pub struct StorageWriter {
    router: Arc<DatasourceRouter>,
    entities: EntitySnapshotWriter,
    temporal: TemporalWriteCoordinator,
}

impl StorageWriter {
    /// Open a writer over a fresh cluster with the given configuration.
    pub fn open(config: StoreConfig) -> Result<Self> {
        let router = Arc::new(DatasourceRouter::new(config)?);
        let entities = EntitySnapshotWriter::new(Arc::clone(&router));
        let temporal = TemporalWriteCoordinator::new(Arc::clone(&router));
        Ok(Self {
            router,
            entities,
            temporal,
        })
    }

    /// Upsert or delete an entity's snapshot row.
    pub async fn store_entity(&self, request: &EntityRequest) -> Result<WriteSummary> {
        self.entities.store_entity(request).await
    }

    /// Apply a temporal write batch for one entity.
    pub async fn store_temporal_entity(
        &self,
        request: &TemporalWriteRequest,
    ) -> Result<WriteSummary> {
        self.temporal.store_temporal_entity(request).await
    }

    /// The router, for advanced usage (pool inspection, registry access).
    pub fn router(&self) -> &Arc<DatasourceRouter> {
        &self.router
    }

    /// Run a read closure against one tenant's store (the default store
    /// for `None`). Intended for collaborators and tests; the write path
    /// itself never reads through this.
    pub async fn with_store<T>(
        &self,
        tenant: Option<&str>,
        f: impl FnOnce(&ContextDb) -> T,
    ) -> Result<T> {
        let pool = self.router.pool_for(tenant).await?;
        let mut guard = pool.get_connection().await?;
        guard.connection().read(f).await
    }
}
