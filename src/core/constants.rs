//! Well-known keys and names shared across the write path.

/// Request-metadata key carrying the tenant identifier.
pub const TENANT_HEADER: &str = "ngsild-tenant";

/// Prefix for tenant database names: tenant `acme` lives in `ngbacme`.
pub const TENANT_DATABASE_PREFIX: &str = "ngb";

/// Name of the default (shared) database.
pub const DEFAULT_DATABASE: &str = "ngb";

/// The literal text that signals deletion when it arrives in place of a
/// serialized JSON document. Distinct from JSON `null` inside a document.
pub const DELETION_SENTINEL: &str = "null";

/// JSON-LD / NGSI-LD system-attribute keys. These are consumed by the
/// temporal header phase and never stored as attribute instances.
pub const JSON_LD_ID: &str = "@id";
pub const JSON_LD_TYPE: &str = "@type";
pub const NGSI_LD_CREATED_AT: &str = "https://uri.etsi.org/ngsi-ld/createdAt";
pub const NGSI_LD_MODIFIED_AT: &str = "https://uri.etsi.org/ngsi-ld/modifiedAt";
pub const NGSI_LD_INSTANCE_ID: &str = "https://uri.etsi.org/ngsi-ld/instanceId";

/// Compact-form instance id key accepted on instance documents.
pub const INSTANCE_ID_KEY: &str = "instanceId";

/// Table names, kept for log/diagnostic context.
pub const TABLE_ENTITY: &str = "entity";
pub const TABLE_TEMPORAL_ENTITY: &str = "temporalentity";
pub const TABLE_ATTRIBUTE_INSTANCE: &str = "temporalentity_attributeinstance";
pub const TABLE_TENANT: &str = "tenant";

/// Whether an attribute key is one of the system-attribute keys handled by
/// the header phase. Comparison is case-insensitive, matching the broker's
/// behavior.
pub fn is_system_attribute_key(key: &str) -> bool {
    key.eq_ignore_ascii_case(JSON_LD_ID)
        || key.eq_ignore_ascii_case(JSON_LD_TYPE)
        || key.eq_ignore_ascii_case(NGSI_LD_CREATED_AT)
        || key.eq_ignore_ascii_case(NGSI_LD_MODIFIED_AT)
}
