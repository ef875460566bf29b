use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tracing::info;

use super::database::ContextDb;
use crate::core::{Result, StoreError};

/// Shared handle to one logical database. Write transactions hold the write
/// half for their duration; readers take the read half.
pub type SharedDb = Arc<tokio::sync::RwLock<ContextDb>>;

/// Registry of named databases, the process-local equivalent of a server's
/// database catalog. Creating a database here is the `CREATE DATABASE`
/// counterpart used by lazy tenant provisioning.
///
/// The registry lock covers map access only; it is never held across a
/// transaction.
pub struct DatabaseCluster {
    default_name: String,
    databases: RwLock<HashMap<String, SharedDb>>,
}

impl DatabaseCluster {
    /// Create a cluster with its default (shared) database.
    pub fn new(default_name: impl Into<String>) -> Self {
        let default_name = default_name.into();
        let mut databases = HashMap::new();
        databases.insert(
            default_name.clone(),
            Arc::new(tokio::sync::RwLock::new(ContextDb::new(default_name.clone()))),
        );
        Self {
            default_name,
            databases: RwLock::new(databases),
        }
    }

    pub fn default_name(&self) -> &str {
        &self.default_name
    }

    /// Handle to the default (shared) database.
    pub fn default_database(&self) -> Result<SharedDb> {
        self.database(&self.default_name)
    }

    /// Create a new named database.
    ///
    /// # Errors
    /// [`StoreError::DatabaseExists`] if the name is taken.
    pub fn create_database(&self, name: &str) -> Result<SharedDb> {
        if name.is_empty() {
            return Err(StoreError::ConstraintViolation(
                "database name must not be empty".into(),
            ));
        }

        let mut databases = self.databases.write()?;
        if databases.contains_key(name) {
            return Err(StoreError::DatabaseExists(name.to_string()));
        }

        let db: SharedDb = Arc::new(tokio::sync::RwLock::new(ContextDb::new(name)));
        databases.insert(name.to_string(), db.clone());
        info!(database = name, "created database");
        Ok(db)
    }

    /// Get an existing database, or create it on first use.
    pub fn ensure_database(&self, name: &str) -> Result<SharedDb> {
        {
            let databases = self.databases.read()?;
            if let Some(db) = databases.get(name) {
                return Ok(db.clone());
            }
        }
        match self.create_database(name) {
            Ok(db) => Ok(db),
            // Lost the race to a concurrent creator; take theirs.
            Err(StoreError::DatabaseExists(_)) => self.database(name),
            Err(err) => Err(err),
        }
    }

    /// Look up an existing database.
    ///
    /// # Errors
    /// [`StoreError::DatabaseNotFound`] if no database has this name.
    pub fn database(&self, name: &str) -> Result<SharedDb> {
        self.databases
            .read()?
            .get(name)
            .cloned()
            .ok_or_else(|| StoreError::DatabaseNotFound(name.to_string()))
    }

    pub fn database_exists(&self, name: &str) -> Result<bool> {
        Ok(self.databases.read()?.contains_key(name))
    }

    pub fn database_names(&self) -> Result<Vec<String>> {
        Ok(self.databases.read()?.keys().cloned().collect())
    }
}
