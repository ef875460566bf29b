pub mod document;
pub mod entity;
pub mod temporal;

pub use document::{
    ParsedDocument, instance_id_of, parse_document, resolve_instance_id, tenant_from_headers,
};
pub use entity::{EntityDocuments, EntityRequest, EntityWrite};
pub use temporal::{AttributeOp, TemporalWrite, TemporalWriteRequest};

/// Outcome of one successful write call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WriteSummary {
    /// Rows touched across the statements of the write.
    pub rows_affected: usize,
}

impl std::fmt::Display for WriteSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} rows affected", self.rows_affected)
    }
}
