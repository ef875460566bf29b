use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::document::{ParsedDocument, parse_document};
use crate::core::Result;
use crate::core::constants::DELETION_SENTINEL;

/// What a write does to one attribute of a temporal entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttributeOp {
    /// Instance documents in array order. The first instance of a batch
    /// always replaces the attribute's prior instance set.
    Append(Vec<Value>),
    /// Remove instances: the one named by the request's `instance_id`, or
    /// the attribute's whole instance set when no instance id is given.
    Delete,
}

/// What a temporal write does as a whole.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TemporalWrite {
    /// Per-attribute operations, in document order.
    Attributes(Vec<(String, AttributeOp)>),
    /// Remove the temporal entity itself (instances cascade in storage).
    Delete,
}

/// A request to append to (or prune) an entity's temporal history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemporalWriteRequest {
    pub id: String,
    pub entity_type: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub modified_at: Option<DateTime<Utc>>,
    /// Target of an instance-level delete.
    pub instance_id: Option<String>,
    pub write: TemporalWrite,
    /// Tenant identifier from the request metadata; `None` targets the
    /// default (shared) store.
    pub tenant: Option<String>,
}

impl TemporalWriteRequest {
    pub fn attributes(id: impl Into<String>, attributes: Vec<(String, AttributeOp)>) -> Self {
        Self {
            id: id.into(),
            entity_type: None,
            created_at: None,
            modified_at: None,
            instance_id: None,
            write: TemporalWrite::Attributes(attributes),
            tenant: None,
        }
    }

    pub fn delete(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            entity_type: None,
            created_at: None,
            modified_at: None,
            instance_id: None,
            write: TemporalWrite::Delete,
            tenant: None,
        }
    }

    pub fn with_type(mut self, entity_type: impl Into<String>) -> Self {
        self.entity_type = Some(entity_type.into());
        self
    }

    pub fn with_timestamps(
        mut self,
        created_at: DateTime<Utc>,
        modified_at: DateTime<Utc>,
    ) -> Self {
        self.created_at = Some(created_at);
        self.modified_at = Some(modified_at);
        self
    }

    pub fn with_modified_at(mut self, modified_at: DateTime<Utc>) -> Self {
        self.modified_at = Some(modified_at);
        self
    }

    pub fn with_instance_id(mut self, instance_id: impl Into<String>) -> Self {
        self.instance_id = Some(instance_id.into());
        self
    }

    pub fn with_tenant(mut self, tenant: impl Into<String>) -> Self {
        self.tenant = Some(tenant.into());
        self
    }

    /// Build a request from a raw serialized payload.
    ///
    /// The sentinel in place of the whole payload maps to an entity-level
    /// delete. Inside a document, members whose value is an array become
    /// instance batches; members whose value is JSON `null` or the sentinel
    /// text become attribute-level deletes; anything else is not an
    /// instance array and is skipped, as the broker does.
    pub fn from_raw(id: impl Into<String>, raw: &str) -> Result<Self> {
        let id = id.into();
        match parse_document(raw)? {
            ParsedDocument::Deletion => Ok(Self::delete(id)),
            ParsedDocument::Document(document) => {
                let mut attributes = Vec::new();
                if let Value::Object(members) = document {
                    for (key, value) in members {
                        match value {
                            Value::Array(instances) => {
                                attributes.push((key, AttributeOp::Append(instances)));
                            }
                            Value::Null => {
                                attributes.push((key, AttributeOp::Delete));
                            }
                            Value::String(text) if text == DELETION_SENTINEL => {
                                attributes.push((key, AttributeOp::Delete));
                            }
                            _ => {}
                        }
                    }
                }
                Ok(Self::attributes(id, attributes))
            }
        }
    }
}
