use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde_json::Value;

use super::record::{AttributeInstanceRecord, EntityRecord, InstanceKey, TemporalEntityRecord};
use crate::core::{Result, StoreError};
use crate::transaction::{Change, Transaction};

/// One logical database: the four tables of the write path, owned by a
/// single tenant (or the default/shared store).
///
/// Every mutating operation takes the enclosing [`Transaction`] and records
/// the displaced state in its undo log *before* mutating, so a rollback can
/// restore the table byte for byte. Operations return the number of rows
/// they affected, mirroring the driver-level counts the write coordinators
/// report.
#[derive(Debug)]
pub struct ContextDb {
    name: String,
    entities: BTreeMap<String, EntityRecord>,
    temporal_entities: BTreeMap<String, TemporalEntityRecord>,
    instances: BTreeMap<InstanceKey, AttributeInstanceRecord>,
    /// tenant_id -> database_name; populated only on the default store.
    tenants: BTreeMap<String, String>,
    /// Insertion sequence for attribute instances.
    next_seq: u64,
}

impl ContextDb {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entities: BTreeMap::new(),
            temporal_entities: BTreeMap::new(),
            instances: BTreeMap::new(),
            tenants: BTreeMap::new(),
            next_seq: 1,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn require_key(value: &str, what: &str) -> Result<()> {
        if value.is_empty() {
            return Err(StoreError::ConstraintViolation(format!(
                "{what} must not be empty"
            )));
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // entity
    // ------------------------------------------------------------------

    /// Insert or replace the entity snapshot row for `id`. All three
    /// projections land in one record replace.
    pub fn upsert_entity(
        &mut self,
        txn: &mut Transaction,
        id: &str,
        record: EntityRecord,
    ) -> Result<usize> {
        Self::require_key(id, "entity id")?;

        let previous = self.entities.get(id).cloned();
        txn.record_change(Change::EntityWritten {
            id: id.to_string(),
            previous,
        })?;
        self.entities.insert(id.to_string(), record);
        Ok(1)
    }

    /// Remove the entity snapshot row for `id`. Deleting an absent row is a
    /// no-op reported as zero rows.
    pub fn delete_entity(&mut self, txn: &mut Transaction, id: &str) -> Result<usize> {
        Self::require_key(id, "entity id")?;

        match self.entities.get(id).cloned() {
            Some(previous) => {
                txn.record_change(Change::EntityRemoved {
                    id: id.to_string(),
                    previous,
                })?;
                self.entities.remove(id);
                Ok(1)
            }
            None => Ok(0),
        }
    }

    pub fn entity(&self, id: &str) -> Option<&EntityRecord> {
        self.entities.get(id)
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    // ------------------------------------------------------------------
    // temporalentity
    // ------------------------------------------------------------------

    /// Insert or replace the temporal header row. A conflicting row has its
    /// type, createdAt and modifiedAt overwritten by the supplied values.
    pub fn upsert_temporal_entity(
        &mut self,
        txn: &mut Transaction,
        id: &str,
        entity_type: &str,
        created_at: DateTime<Utc>,
        modified_at: DateTime<Utc>,
    ) -> Result<usize> {
        Self::require_key(id, "temporal entity id")?;
        Self::require_key(entity_type, "entity type")?;

        let previous = self.temporal_entities.get(id).cloned();
        txn.record_change(Change::TemporalWritten {
            id: id.to_string(),
            previous,
        })?;
        self.temporal_entities.insert(
            id.to_string(),
            TemporalEntityRecord {
                entity_type: entity_type.to_string(),
                created_at,
                modified_at,
            },
        );
        Ok(1)
    }

    /// Bump `modifiedat` on an existing header row. Zero rows when the
    /// header does not exist.
    pub fn touch_modified_at(
        &mut self,
        txn: &mut Transaction,
        id: &str,
        modified_at: DateTime<Utc>,
    ) -> Result<usize> {
        Self::require_key(id, "temporal entity id")?;

        let Some(previous) = self.temporal_entities.get(id).cloned() else {
            return Ok(0);
        };
        txn.record_change(Change::TemporalWritten {
            id: id.to_string(),
            previous: Some(previous.clone()),
        })?;
        let mut record = previous;
        record.modified_at = modified_at;
        self.temporal_entities.insert(id.to_string(), record);
        Ok(1)
    }

    /// Remove the temporal header row; the schema-level cascade removes its
    /// attribute instances in the same operation.
    pub fn delete_temporal_entity(&mut self, txn: &mut Transaction, id: &str) -> Result<usize> {
        Self::require_key(id, "temporal entity id")?;

        let Some(header) = self.temporal_entities.get(id).cloned() else {
            return Ok(0);
        };

        let cascade: Vec<(InstanceKey, AttributeInstanceRecord)> = self
            .instances
            .iter()
            .filter(|(key, _)| key.entity_id == id)
            .map(|(key, record)| (key.clone(), record.clone()))
            .collect();

        txn.record_change(Change::TemporalRemoved {
            id: id.to_string(),
            header,
            instances: cascade.clone(),
        })?;

        self.temporal_entities.remove(id);
        for (key, _) in &cascade {
            self.instances.remove(key);
        }
        Ok(1)
    }

    pub fn temporal_entity(&self, id: &str) -> Option<&TemporalEntityRecord> {
        self.temporal_entities.get(id)
    }

    // ------------------------------------------------------------------
    // temporalentity_attributeinstance
    // ------------------------------------------------------------------

    /// Insert a new attribute instance, or on a full-key conflict replace
    /// its JSON payload in place (the insertion sequence is kept).
    pub fn upsert_attribute_instance(
        &mut self,
        txn: &mut Transaction,
        key: InstanceKey,
        data: Value,
    ) -> Result<usize> {
        Self::require_key(&key.entity_id, "temporal entity id")?;
        Self::require_key(&key.attribute_id, "attribute id")?;
        Self::require_key(&key.instance_id, "instance id")?;

        let previous = self.instances.get(&key).cloned();
        txn.record_change(Change::InstanceWritten {
            key: key.clone(),
            previous: previous.clone(),
        })?;

        let seq = match previous {
            Some(existing) => existing.seq,
            None => {
                let seq = self.next_seq;
                self.next_seq += 1;
                seq
            }
        };
        self.instances.insert(key, AttributeInstanceRecord { data, seq });
        Ok(1)
    }

    /// Remove one attribute instance by its full composite key.
    pub fn delete_attribute_instance(
        &mut self,
        txn: &mut Transaction,
        key: &InstanceKey,
    ) -> Result<usize> {
        match self.instances.get(key).cloned() {
            Some(previous) => {
                txn.record_change(Change::InstanceRemoved {
                    key: key.clone(),
                    previous,
                })?;
                self.instances.remove(key);
                Ok(1)
            }
            None => Ok(0),
        }
    }

    /// Remove every instance of one attribute (the overwrite delete).
    pub fn clear_attribute(
        &mut self,
        txn: &mut Transaction,
        entity_id: &str,
        attribute_id: &str,
    ) -> Result<usize> {
        Self::require_key(entity_id, "temporal entity id")?;
        Self::require_key(attribute_id, "attribute id")?;

        let doomed: Vec<InstanceKey> = self
            .instances
            .keys()
            .filter(|key| key.is_for_attribute(entity_id, attribute_id))
            .cloned()
            .collect();

        let mut removed = 0;
        for key in &doomed {
            let Some(previous) = self.instances.get(key).cloned() else {
                continue;
            };
            txn.record_change(Change::InstanceRemoved {
                key: key.clone(),
                previous,
            })?;
            self.instances.remove(key);
            removed += 1;
        }
        Ok(removed)
    }

    pub fn instance(&self, key: &InstanceKey) -> Option<&AttributeInstanceRecord> {
        self.instances.get(key)
    }

    /// All instances of one attribute, in insertion order.
    pub fn attribute_instances(
        &self,
        entity_id: &str,
        attribute_id: &str,
    ) -> Vec<&AttributeInstanceRecord> {
        let mut records: Vec<&AttributeInstanceRecord> = self
            .instances
            .iter()
            .filter(|(key, _)| key.is_for_attribute(entity_id, attribute_id))
            .map(|(_, record)| record)
            .collect();
        records.sort_by_key(|record| record.seq);
        records
    }

    pub fn instance_count(&self) -> usize {
        self.instances.len()
    }

    // ------------------------------------------------------------------
    // tenant
    // ------------------------------------------------------------------

    /// Insert or replace the tenant-to-database mapping row.
    pub fn upsert_tenant(
        &mut self,
        txn: &mut Transaction,
        tenant_id: &str,
        database_name: &str,
    ) -> Result<usize> {
        Self::require_key(tenant_id, "tenant id")?;
        Self::require_key(database_name, "database name")?;

        let previous = self.tenants.get(tenant_id).cloned();
        txn.record_change(Change::TenantWritten {
            tenant_id: tenant_id.to_string(),
            previous,
        })?;
        self.tenants
            .insert(tenant_id.to_string(), database_name.to_string());
        Ok(1)
    }

    /// Remove the tenant mapping row.
    pub fn remove_tenant(&mut self, txn: &mut Transaction, tenant_id: &str) -> Result<usize> {
        Self::require_key(tenant_id, "tenant id")?;

        match self.tenants.get(tenant_id).cloned() {
            Some(previous) => {
                txn.record_change(Change::TenantRemoved {
                    tenant_id: tenant_id.to_string(),
                    previous,
                })?;
                self.tenants.remove(tenant_id);
                Ok(1)
            }
            None => Ok(0),
        }
    }

    pub fn find_tenant(&self, tenant_id: &str) -> Option<&str> {
        self.tenants.get(tenant_id).map(String::as_str)
    }

    // ------------------------------------------------------------------
    // rollback
    // ------------------------------------------------------------------

    /// Reverse one recorded change. Callers apply the undo log newest-first.
    pub(crate) fn undo(&mut self, change: Change) {
        match change {
            Change::EntityWritten { id, previous } => match previous {
                Some(record) => {
                    self.entities.insert(id, record);
                }
                None => {
                    self.entities.remove(&id);
                }
            },
            Change::EntityRemoved { id, previous } => {
                self.entities.insert(id, previous);
            }
            Change::TemporalWritten { id, previous } => match previous {
                Some(record) => {
                    self.temporal_entities.insert(id, record);
                }
                None => {
                    self.temporal_entities.remove(&id);
                }
            },
            Change::TemporalRemoved {
                id,
                header,
                instances,
            } => {
                self.temporal_entities.insert(id, header);
                for (key, record) in instances {
                    self.instances.insert(key, record);
                }
            }
            Change::InstanceWritten { key, previous } => match previous {
                Some(record) => {
                    self.instances.insert(key, record);
                }
                None => {
                    self.instances.remove(&key);
                }
            },
            Change::InstanceRemoved { key, previous } => {
                self.instances.insert(key, previous);
            }
            Change::TenantWritten {
                tenant_id,
                previous,
            } => match previous {
                Some(name) => {
                    self.tenants.insert(tenant_id, name);
                }
                None => {
                    self.tenants.remove(&tenant_id);
                }
            },
            Change::TenantRemoved {
                tenant_id,
                previous,
            } => {
                self.tenants.insert(tenant_id, previous);
            }
        }
    }
}
