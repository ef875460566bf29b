// ============================================================================
// Transaction Management Module
// ============================================================================
//
// One unit of work per tenant store, with rollback via a reversible undo
// log.
//
// Design Patterns Used:
// - State Pattern: transaction lifecycle (Active, Committed, Aborted)
// - Command Pattern: reversible operations for rollback
//
// Isolation comes from ownership: a WriteTransaction holds its store's
// write guard until commit or rollback, so partial writes are never
// observable. Per-tenant stores keep unrelated tenants unblocked.
//
// ============================================================================

pub mod change;
pub mod state;
pub mod unit;

pub use change::Change;
pub use state::{Transaction, TransactionId, TransactionState};
pub use unit::WriteTransaction;
