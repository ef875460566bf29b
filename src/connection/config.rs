use std::time::Duration;

use crate::core::constants;

/// Per-database connection-pool configuration.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Name of the database this pool binds to.
    pub database: String,

    /// How long an acquire may wait for a free connection.
    pub acquire_timeout: Duration,

    /// Bound on waiting for the store's write guard; an expiry surfaces as
    /// a retryable timeout, never as a hung write.
    pub transaction_timeout: Duration,

    /// Maximum number of connections in pool
    pub max_connections: usize,

    /// Minimum number of connections in pool
    pub min_connections: usize,

    /// Connection idle timeout
    pub idle_timeout: Option<Duration>,

    /// Maximum connection lifetime
    pub max_lifetime: Option<Duration>,
}

impl ConnectionConfig {
    pub fn new() -> Self {
        Self {
            database: constants::DEFAULT_DATABASE.to_string(),
            acquire_timeout: Duration::from_secs(30),
            transaction_timeout: Duration::from_secs(10),
            max_connections: 10,
            min_connections: 1,
            idle_timeout: Some(Duration::from_secs(600)), // 10 minutes
            max_lifetime: Some(Duration::from_secs(1800)), // 30 minutes
        }
    }

    /// Set the database name
    pub fn database(mut self, database: &str) -> Self {
        self.database = database.to_string();
        self
    }

    /// Set acquire timeout
    pub fn acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout;
        self
    }

    /// Set transaction timeout
    pub fn transaction_timeout(mut self, timeout: Duration) -> Self {
        self.transaction_timeout = timeout;
        self
    }

    /// Set maximum connections
    pub fn max_connections(mut self, max: usize) -> Self {
        self.max_connections = max;
        self
    }

    /// Set minimum connections
    pub fn min_connections(mut self, min: usize) -> Self {
        self.min_connections = min;
        self
    }

    /// Set idle timeout
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = Some(timeout);
        self
    }

    /// Set maximum lifetime
    pub fn max_lifetime(mut self, lifetime: Duration) -> Self {
        self.max_lifetime = Some(lifetime);
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.database.is_empty() {
            return Err("database name cannot be empty".to_string());
        }

        if self.max_connections == 0 {
            return Err("max_connections must be > 0".to_string());
        }

        if self.min_connections > self.max_connections {
            return Err("min_connections cannot exceed max_connections".to_string());
        }

        Ok(())
    }
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Top-level configuration for the storage writer: default database,
/// tenant-database naming, resolution fallback policy, and the pool
/// template cloned for every tenant database.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Name of the default (shared) database.
    pub default_database: String,

    /// Prefix prepended to a tenant id to form its database name.
    pub tenant_database_prefix: String,

    /// Whether a failed tenant resolution may fall back to the default
    /// store. Off by default: failures surface as typed errors.
    pub fallback_to_default: bool,

    /// Pool settings applied to the default and every tenant database.
    pub connection: ConnectionConfig,
}

impl StoreConfig {
    pub fn new() -> Self {
        Self {
            default_database: constants::DEFAULT_DATABASE.to_string(),
            tenant_database_prefix: constants::TENANT_DATABASE_PREFIX.to_string(),
            fallback_to_default: false,
            connection: ConnectionConfig::new(),
        }
    }

    /// Set the default database name
    pub fn default_database(mut self, name: &str) -> Self {
        self.default_database = name.to_string();
        self
    }

    /// Set the tenant database-name prefix
    pub fn tenant_database_prefix(mut self, prefix: &str) -> Self {
        self.tenant_database_prefix = prefix.to_string();
        self
    }

    /// Permit falling back to the default store when tenant resolution
    /// fails (the legacy best-effort behavior).
    pub fn fallback_to_default(mut self, fallback: bool) -> Self {
        self.fallback_to_default = fallback;
        self
    }

    /// Set the pool configuration template
    pub fn connection(mut self, connection: ConnectionConfig) -> Self {
        self.connection = connection;
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.default_database.is_empty() {
            return Err("default database name cannot be empty".to_string());
        }

        if self.tenant_database_prefix.is_empty() {
            return Err("tenant database prefix cannot be empty".to_string());
        }

        self.connection.validate()
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::new()
    }
}
