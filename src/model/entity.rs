use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::document::{ParsedDocument, parse_document};
use crate::core::Result;

/// The three projections of an entity document persisted together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityDocuments {
    /// Full document, system attributes included.
    pub with_sys_attrs: Value,
    /// Document with system attributes stripped.
    pub without_sys_attrs: Value,
    /// Key-value projection.
    pub key_values: Value,
}

/// What an entity write does. The tagged variants replace the wire-level
/// string sentinel, so "no value" and JSON `null` can no longer be
/// confused with a deletion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EntityWrite {
    Upsert(EntityDocuments),
    Delete,
}

/// A request to persist (or delete) an entity's current state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityRequest {
    pub id: String,
    pub write: EntityWrite,
    /// Tenant identifier from the request metadata; `None` targets the
    /// default (shared) store.
    pub tenant: Option<String>,
}

impl EntityRequest {
    pub fn upsert(id: impl Into<String>, documents: EntityDocuments) -> Self {
        Self {
            id: id.into(),
            write: EntityWrite::Upsert(documents),
            tenant: None,
        }
    }

    pub fn delete(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            write: EntityWrite::Delete,
            tenant: None,
        }
    }

    pub fn with_tenant(mut self, tenant: impl Into<String>) -> Self {
        self.tenant = Some(tenant.into());
        self
    }

    /// Build a request from raw serialized projections. The full document
    /// decides between upsert and delete: when it is the deletion sentinel
    /// the other projections are irrelevant and left unparsed.
    pub fn from_raw(
        id: impl Into<String>,
        with_sys_attrs: &str,
        without_sys_attrs: &str,
        key_values: &str,
    ) -> Result<Self> {
        let id = id.into();
        match parse_document(with_sys_attrs)? {
            ParsedDocument::Deletion => Ok(Self {
                id,
                write: EntityWrite::Delete,
                tenant: None,
            }),
            ParsedDocument::Document(full) => {
                let without = match parse_document(without_sys_attrs)? {
                    ParsedDocument::Document(doc) => doc,
                    ParsedDocument::Deletion => Value::Null,
                };
                let kv = match parse_document(key_values)? {
                    ParsedDocument::Document(doc) => doc,
                    ParsedDocument::Deletion => Value::Null,
                };
                Ok(Self {
                    id,
                    write: EntityWrite::Upsert(EntityDocuments {
                        with_sys_attrs: full,
                        without_sys_attrs: without,
                        key_values: kv,
                    }),
                    tenant: None,
                })
            }
        }
    }
}
