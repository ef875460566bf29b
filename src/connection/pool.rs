use super::{Connection, config::ConnectionConfig};
use crate::core::{Result, StoreError};
use crate::storage::SharedDb;
use crate::transaction::WriteTransaction;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::warn;

/// Connection pool
///
/// Manages a pool of connections to one tenant store. Every database in the
/// cluster gets its own pool, so one tenant's long-running transaction never
/// starves another tenant's writes.
#[derive(Debug)]
pub struct ConnectionPool {
    /// Pool configuration
    config: ConnectionConfig,
    /// Available connections
    available: Arc<Mutex<VecDeque<PooledConnection>>>,
    /// Total number of connections created
    total_connections: Arc<AtomicUsize>,
    /// Shared store instance
    db: SharedDb,
    /// Next connection ID
    next_id: AtomicU64,
}

/// A connection from the pool
#[derive(Debug)]
struct PooledConnection {
    connection: Connection,
    created_at: Instant,
    last_used: Instant,
}

impl PooledConnection {
    fn new(connection: Connection) -> Self {
        let now = Instant::now();
        Self {
            connection,
            created_at: now,
            last_used: now,
        }
    }

    fn is_expired(&self, max_lifetime: Option<Duration>) -> bool {
        if let Some(lifetime) = max_lifetime {
            self.created_at.elapsed() > lifetime
        } else {
            false
        }
    }

    fn is_idle_too_long(&self, idle_timeout: Option<Duration>) -> bool {
        if let Some(timeout) = idle_timeout {
            self.last_used.elapsed() > timeout
        } else {
            false
        }
    }

    fn refresh_last_used(&mut self) {
        self.last_used = Instant::now();
    }
}

impl ConnectionPool {
    /// Create a new connection pool bound to the given store.
    pub fn new(config: ConnectionConfig, db: SharedDb) -> Result<Self> {
        config.validate().map_err(StoreError::Execution)?;

        let pool = Self {
            config,
            available: Arc::new(Mutex::new(VecDeque::new())),
            total_connections: Arc::new(AtomicUsize::new(0)),
            db,
            next_id: AtomicU64::new(1),
        };

        // Pre-create minimum connections
        pool.ensure_min_connections()?;

        Ok(pool)
    }

    /// Name of the database this pool serves.
    pub fn database_name(&self) -> &str {
        &self.config.database
    }

    /// Get a connection from the pool
    ///
    /// # Errors
    /// [`StoreError::TransientConnection`] when no connection frees up
    /// within the configured acquire timeout.
    pub async fn get_connection(&self) -> Result<PoolGuard> {
        let start = Instant::now();

        loop {
            // Try to get an available connection
            if let Some(mut pooled) = self.try_get_available()? {
                pooled.refresh_last_used();
                return Ok(PoolGuard {
                    connection: Some(pooled.connection),
                    pool: self.available.clone(),
                    total_connections: self.total_connections.clone(),
                });
            }

            // Try to create a new connection if under limit
            if let Some(conn) = self.try_create_connection() {
                return Ok(PoolGuard {
                    connection: Some(conn),
                    pool: self.available.clone(),
                    total_connections: self.total_connections.clone(),
                });
            }

            // Check timeout
            if start.elapsed() > self.config.acquire_timeout {
                return Err(StoreError::TransientConnection(format!(
                    "connection pool for '{}' exhausted after {:?}",
                    self.config.database, self.config.acquire_timeout
                )));
            }

            // Wait a bit before retrying
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    /// Try to get an available connection from the pool
    fn try_get_available(&self) -> Result<Option<PooledConnection>> {
        let mut available = self.available.lock()?;

        let mut kept = VecDeque::with_capacity(available.len());
        let mut removed = 0usize;
        while let Some(pooled) = available.pop_front() {
            if pooled.is_expired(self.config.max_lifetime)
                || pooled.is_idle_too_long(self.config.idle_timeout)
            {
                removed += 1;
            } else {
                kept.push_back(pooled);
            }
        }
        *available = kept;

        if removed > 0 {
            self.total_connections.fetch_sub(removed, Ordering::SeqCst);
        }

        Ok(available.pop_front())
    }

    /// Try to create a new connection if under limit
    fn try_create_connection(&self) -> Option<Connection> {
        let total = self.total_connections.load(Ordering::SeqCst);
        if total >= self.config.max_connections {
            return None;
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let connection = Connection::new(
            id,
            Arc::clone(&self.db),
            self.config.database.clone(),
            self.config.transaction_timeout,
        );

        self.total_connections.fetch_add(1, Ordering::SeqCst);

        Some(connection)
    }

    /// Ensure minimum number of connections
    fn ensure_min_connections(&self) -> Result<()> {
        let mut available = self.available.lock()?;

        while self.total_connections.load(Ordering::SeqCst) < self.config.min_connections {
            let id = self.next_id.fetch_add(1, Ordering::SeqCst);
            let connection = Connection::new(
                id,
                Arc::clone(&self.db),
                self.config.database.clone(),
                self.config.transaction_timeout,
            );
            available.push_back(PooledConnection::new(connection));

            self.total_connections.fetch_add(1, Ordering::SeqCst);
        }

        Ok(())
    }

    /// Get pool statistics
    pub fn stats(&self) -> PoolStats {
        let available = self
            .available
            .lock()
            .map(|queue| queue.len())
            .unwrap_or(0);
        let total = self.total_connections.load(Ordering::SeqCst);

        PoolStats {
            total_connections: total,
            available_connections: available,
            active_connections: total.saturating_sub(available),
            max_connections: self.config.max_connections,
        }
    }
}

/// Connection pool statistics
#[derive(Debug, Clone)]
pub struct PoolStats {
    pub total_connections: usize,
    pub available_connections: usize,
    pub active_connections: usize,
    pub max_connections: usize,
}

impl std::fmt::Display for PoolStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Pool Stats: {}/{} active, {} available, max {}",
            self.active_connections,
            self.total_connections,
            self.available_connections,
            self.max_connections
        )
    }
}

/// RAII guard for pooled connections
///
/// Returns the connection to the pool when dropped
#[derive(Debug)]
pub struct PoolGuard {
    connection: Option<Connection>,
    pool: Arc<Mutex<VecDeque<PooledConnection>>>,
    total_connections: Arc<AtomicUsize>,
}

impl PoolGuard {
    /// Get a reference to the connection
    pub fn connection(&mut self) -> &mut Connection {
        self.connection
            .as_mut()
            .expect("Connection already returned to pool")
    }

    /// Begin a write transaction (convenience method)
    pub async fn begin(&mut self) -> Result<WriteTransaction> {
        self.connection().begin().await
    }
}

impl Drop for PoolGuard {
    fn drop(&mut self) {
        if let Some(connection) = self.connection.take() {
            if !connection.is_active() {
                // Closed connections are not restocked.
                self.total_connections.fetch_sub(1, Ordering::SeqCst);
                return;
            }

            match self.pool.lock() {
                Ok(mut pool) => pool.push_back(PooledConnection::new(connection)),
                Err(err) => {
                    warn!(error = %err, "pool queue poisoned; dropping connection");
                    self.total_connections.fetch_sub(1, Ordering::SeqCst);
                }
            }
        }
    }
}
