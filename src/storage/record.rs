use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One row of the `entity` table: the three persisted projections of an
/// entity's current state. All three live in a single record so a write can
/// never update one projection without the others.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityRecord {
    /// Full document, system attributes included.
    pub data: Value,
    /// Document with broker-managed system attributes stripped.
    pub data_without_sysattrs: Value,
    /// Key-value projection of the document.
    pub kvdata: Value,
}

/// One row of the `temporalentity` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemporalEntityRecord {
    pub entity_type: String,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

/// Composite primary key of the `temporalentity_attributeinstance` table.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct InstanceKey {
    pub entity_id: String,
    pub attribute_id: String,
    pub instance_id: String,
}

impl InstanceKey {
    pub fn new(
        entity_id: impl Into<String>,
        attribute_id: impl Into<String>,
        instance_id: impl Into<String>,
    ) -> Self {
        Self {
            entity_id: entity_id.into(),
            attribute_id: attribute_id.into(),
            instance_id: instance_id.into(),
        }
    }

    /// Whether this key belongs to the given (entity, attribute) pair.
    pub fn is_for_attribute(&self, entity_id: &str, attribute_id: &str) -> bool {
        self.entity_id == entity_id && self.attribute_id == attribute_id
    }
}

impl std::fmt::Display for InstanceKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "({}, {}, {})",
            self.entity_id, self.attribute_id, self.instance_id
        )
    }
}

/// One row of the `temporalentity_attributeinstance` table. `seq` is the
/// store-assigned insertion sequence; a conflict update replaces `data`
/// only, keeping the original position in the attribute's history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeInstanceRecord {
    pub data: Value,
    pub seq: u64,
}
