use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Transient connection error: {0}")]
    TransientConnection(String),

    #[error("Transaction timed out after {0:?}")]
    Timeout(Duration),

    #[error("Tenant resolution failed for '{tenant}': {reason}")]
    TenantResolution { tenant: String, reason: String },

    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    #[error("Database '{0}' not found")]
    DatabaseNotFound(String),

    #[error("Database '{0}' already exists")]
    DatabaseExists(String),

    #[error("Execution error: {0}")]
    Execution(String),

    #[error("Lock error: {0}")]
    LockError(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;

impl StoreError {
    /// Whether the caller may safely re-deliver the write that produced
    /// this error. Pool exhaustion and lock timeouts are transient; payload
    /// and constraint faults are not.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            StoreError::TransientConnection(_) | StoreError::Timeout(_)
        )
    }
}

impl<T> From<std::sync::PoisonError<T>> for StoreError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        Self::LockError(err.to_string())
    }
}
