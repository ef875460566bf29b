// ============================================================================
// Transaction Change Tracking
// ============================================================================
//
// Implements the Command Pattern for reversible write operations. Each
// Change captures the state a mutation displaced, so a rollback can restore
// it in reverse order.
//
// ============================================================================

use crate::storage::{AttributeInstanceRecord, EntityRecord, InstanceKey, TemporalEntityRecord};

/// A single reversible change recorded inside a write transaction.
#[derive(Debug, Clone)]
pub enum Change {
    /// Entity snapshot row inserted or replaced. `previous` is `None` for a
    /// fresh insert.
    EntityWritten {
        id: String,
        previous: Option<EntityRecord>,
    },

    /// Entity snapshot row removed.
    EntityRemoved { id: String, previous: EntityRecord },

    /// Temporal header row inserted, replaced, or its modifiedAt bumped.
    TemporalWritten {
        id: String,
        previous: Option<TemporalEntityRecord>,
    },

    /// Temporal header row removed, along with the attribute instances the
    /// storage-level cascade took with it.
    TemporalRemoved {
        id: String,
        header: TemporalEntityRecord,
        instances: Vec<(InstanceKey, AttributeInstanceRecord)>,
    },

    /// Attribute instance inserted or conflict-updated.
    InstanceWritten {
        key: InstanceKey,
        previous: Option<AttributeInstanceRecord>,
    },

    /// Attribute instance removed.
    InstanceRemoved {
        key: InstanceKey,
        previous: AttributeInstanceRecord,
    },

    /// Tenant mapping row inserted or replaced.
    TenantWritten {
        tenant_id: String,
        previous: Option<String>,
    },

    /// Tenant mapping row removed.
    TenantRemoved { tenant_id: String, previous: String },
}

impl Change {
    /// Table affected by this change, for diagnostics.
    pub fn table_name(&self) -> &'static str {
        use crate::core::constants;
        match self {
            Change::EntityWritten { .. } | Change::EntityRemoved { .. } => constants::TABLE_ENTITY,
            Change::TemporalWritten { .. } | Change::TemporalRemoved { .. } => {
                constants::TABLE_TEMPORAL_ENTITY
            }
            Change::InstanceWritten { .. } | Change::InstanceRemoved { .. } => {
                constants::TABLE_ATTRIBUTE_INSTANCE
            }
            Change::TenantWritten { .. } | Change::TenantRemoved { .. } => constants::TABLE_TENANT,
        }
    }

    /// Whether this change removed a row (as opposed to writing one).
    pub fn is_removal(&self) -> bool {
        matches!(
            self,
            Change::EntityRemoved { .. }
                | Change::TemporalRemoved { .. }
                | Change::InstanceRemoved { .. }
                | Change::TenantRemoved { .. }
        )
    }
}
