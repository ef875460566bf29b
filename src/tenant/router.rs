use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tracing::warn;

use super::registry::TenantRegistry;
use crate::connection::{ConnectionConfig, ConnectionPool, StoreConfig};
use crate::core::{Result, StoreError};
use crate::storage::DatabaseCluster;

/// Routes each write to the connection pool of its tenant's database.
///
/// Pools are held in a registry keyed by database name and looked up on
/// every call; a pool is never re-bound to a different database, so there
/// is no shared handle to swap under a concurrent transaction. The registry
/// lock covers insertion only.
pub struct DatasourceRouter {
    cluster: Arc<DatabaseCluster>,
    registry: TenantRegistry,
    default_pool: Arc<ConnectionPool>,
    pools: RwLock<HashMap<String, Arc<ConnectionPool>>>,
    pool_template: ConnectionConfig,
    fallback_to_default: bool,
}

impl DatasourceRouter {
    pub fn new(config: StoreConfig) -> Result<Self> {
        config.validate().map_err(StoreError::Execution)?;

        let cluster = Arc::new(DatabaseCluster::new(&config.default_database));
        let default_pool = Arc::new(ConnectionPool::new(
            config.connection.clone().database(&config.default_database),
            cluster.default_database()?,
        )?);
        let registry = TenantRegistry::new(
            Arc::clone(&cluster),
            Arc::clone(&default_pool),
            config.tenant_database_prefix.clone(),
        );

        let mut pools = HashMap::new();
        pools.insert(config.default_database.clone(), Arc::clone(&default_pool));

        Ok(Self {
            cluster,
            registry,
            default_pool,
            pools: RwLock::new(pools),
            pool_template: config.connection,
            fallback_to_default: config.fallback_to_default,
        })
    }

    pub fn cluster(&self) -> &Arc<DatabaseCluster> {
        &self.cluster
    }

    pub fn registry(&self) -> &TenantRegistry {
        &self.registry
    }

    /// Resolve the pool for a request's tenant. `None` targets the default
    /// (shared) store. A tenant seen for the first time has its mapping
    /// row, physical database and pool provisioned as a side effect.
    pub async fn pool_for(&self, tenant: Option<&str>) -> Result<Arc<ConnectionPool>> {
        let Some(tenant) = tenant else {
            return Ok(Arc::clone(&self.default_pool));
        };

        match self.resolve_tenant_pool(tenant).await {
            Ok(pool) => Ok(pool),
            Err(err) if self.fallback_to_default => {
                warn!(
                    tenant,
                    error = %err,
                    "tenant resolution failed; falling back to default store"
                );
                Ok(Arc::clone(&self.default_pool))
            }
            Err(err) => Err(StoreError::TenantResolution {
                tenant: tenant.to_string(),
                reason: err.to_string(),
            }),
        }
    }

    async fn resolve_tenant_pool(&self, tenant: &str) -> Result<Arc<ConnectionPool>> {
        if tenant.is_empty() {
            return Err(StoreError::ConstraintViolation(
                "tenant id must not be empty".into(),
            ));
        }

        // Refresh the mapping on every tenant-bearing request; resolution
        // then provisions the physical database on first use.
        let database_name = self.registry.database_name_for(tenant);
        self.registry.register(tenant, &database_name).await?;
        let resolved = self
            .registry
            .resolve_database(tenant)
            .await?
            .ok_or_else(|| StoreError::DatabaseNotFound(database_name))?;

        {
            let pools = self.pools.read()?;
            if let Some(pool) = pools.get(&resolved) {
                return Ok(Arc::clone(pool));
            }
        }

        let mut pools = self.pools.write()?;
        // Another task may have built the pool while we waited.
        if let Some(pool) = pools.get(&resolved) {
            return Ok(Arc::clone(pool));
        }

        let db = self.cluster.database(&resolved)?;
        let pool = Arc::new(ConnectionPool::new(
            self.pool_template.clone().database(&resolved),
            db,
        )?);
        pools.insert(resolved, Arc::clone(&pool));
        Ok(pool)
    }
}
