use std::sync::Arc;

use tracing::trace;

use crate::connection::ConnectionPool;
use crate::core::Result;
use crate::storage::DatabaseCluster;

/// Tenant-to-database mapping, persisted in the default store's `tenant`
/// table. Physical databases are provisioned lazily, on the first
/// resolution that finds a mapping without a backing database.
pub struct TenantRegistry {
    cluster: Arc<DatabaseCluster>,
    default_pool: Arc<ConnectionPool>,
    database_prefix: String,
}

impl TenantRegistry {
    pub fn new(
        cluster: Arc<DatabaseCluster>,
        default_pool: Arc<ConnectionPool>,
        database_prefix: impl Into<String>,
    ) -> Self {
        Self {
            cluster,
            default_pool,
            database_prefix: database_prefix.into(),
        }
    }

    /// The database name a tenant maps to by convention.
    pub fn database_name_for(&self, tenant_id: &str) -> String {
        format!("{}{}", self.database_prefix, tenant_id)
    }

    /// Insert or refresh the mapping row for a tenant.
    pub async fn register(&self, tenant_id: &str, database_name: &str) -> Result<usize> {
        let mut guard = self.default_pool.get_connection().await?;
        let rows = guard
            .connection()
            .upsert_tenant(tenant_id, database_name)
            .await?;
        trace!(rows, tenant = tenant_id, database = database_name, "tenant mapping stored");
        Ok(rows)
    }

    /// Remove the mapping row for a tenant. The physical database is left
    /// in place; dropping it is not this registry's call.
    pub async fn deregister(&self, tenant_id: &str) -> Result<usize> {
        let mut guard = self.default_pool.get_connection().await?;
        let rows = guard.connection().remove_tenant(tenant_id).await?;
        trace!(rows, tenant = tenant_id, "tenant mapping removed");
        Ok(rows)
    }

    /// Look up a tenant's database name. `Ok(None)` means no mapping: the
    /// valid default-tenant case, not an error. A mapping whose physical
    /// database does not exist yet gets it created here.
    pub async fn resolve_database(&self, tenant_id: &str) -> Result<Option<String>> {
        let guard_name = {
            let mut guard = self.default_pool.get_connection().await?;
            guard
                .connection()
                .read(|db| db.find_tenant(tenant_id).map(String::from))
                .await?
        };

        let Some(database_name) = guard_name else {
            return Ok(None);
        };

        if !self.cluster.database_exists(&database_name)? {
            self.cluster.ensure_database(&database_name)?;
        }
        Ok(Some(database_name))
    }
}
