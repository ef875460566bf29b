//! Parsing at the wire boundary: raw serialized documents, the deletion
//! sentinel, tenant headers, and instance-id resolution.

use std::collections::HashMap;

use serde_json::Value;
use uuid::Uuid;

use crate::core::constants::{
    DELETION_SENTINEL, INSTANCE_ID_KEY, NGSI_LD_INSTANCE_ID, TENANT_HEADER,
};
use crate::core::{Result, StoreError};

/// A raw payload after sentinel recognition. The literal text `"null"` in
/// place of a document signals deletion; a document containing JSON `null`
/// does not.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedDocument {
    Document(Value),
    Deletion,
}

/// Parse one raw serialized payload.
///
/// # Errors
/// [`StoreError::MalformedPayload`] when the text is neither the deletion
/// sentinel nor valid JSON.
pub fn parse_document(raw: &str) -> Result<ParsedDocument> {
    if raw == DELETION_SENTINEL {
        return Ok(ParsedDocument::Deletion);
    }
    serde_json::from_str(raw)
        .map(ParsedDocument::Document)
        .map_err(|err| StoreError::MalformedPayload(format!("invalid JSON document: {err}")))
}

/// Extract the tenant identifier from request metadata. First value of the
/// well-known header key wins.
pub fn tenant_from_headers(headers: &HashMap<String, Vec<String>>) -> Option<String> {
    headers
        .get(TENANT_HEADER)
        .and_then(|values| values.first())
        .cloned()
}

/// The instance id carried by an instance document, if any. Accepts the
/// compact key, the expanded NGSI-LD URI, and their `{"@id": …}` /
/// `[{"@id": …}]` node forms.
pub fn instance_id_of(document: &Value) -> Option<String> {
    id_member(document, INSTANCE_ID_KEY).or_else(|| id_member(document, NGSI_LD_INSTANCE_ID))
}

fn id_member(document: &Value, key: &str) -> Option<String> {
    match document.get(key)? {
        Value::String(id) => Some(id.clone()),
        Value::Object(node) => node.get("@id")?.as_str().map(String::from),
        Value::Array(nodes) => nodes.first()?.get("@id")?.as_str().map(String::from),
        _ => None,
    }
}

/// The instance id for a document, generating a fresh URN when the document
/// carries none (the store fills the column, like the broker schema does).
pub fn resolve_instance_id(document: &Value) -> String {
    instance_id_of(document)
        .unwrap_or_else(|| format!("urn:ngsi-ld:attribute:instance:{}", Uuid::new_v4()))
}
