use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, error, trace};

use crate::connection::Connection;
use crate::core::Result;
use crate::core::constants::is_system_attribute_key;
use crate::model::{
    AttributeOp, TemporalWrite, TemporalWriteRequest, WriteSummary, resolve_instance_id,
};
use crate::storage::InstanceKey;
use crate::tenant::DatasourceRouter;

/// Applies temporal write batches: the header upsert, the per-attribute
/// instance writes with the overwrite convention, and the three deletion
/// granularities.
///
/// The header upsert, overwrite delete, instance upserts and modifiedAt
/// bump for one attribute run in a single transaction, so a crash cannot
/// leave `modifiedat` stale relative to fresh instances, and never leaves
/// an attribute's history deleted without its replacement committed.
pub struct TemporalWriteCoordinator {
    router: Arc<DatasourceRouter>,
}

impl TemporalWriteCoordinator {
    pub fn new(router: Arc<DatasourceRouter>) -> Self {
        Self { router }
    }

    /// Apply one write batch for one entity.
    pub async fn store_temporal_entity(
        &self,
        request: &TemporalWriteRequest,
    ) -> Result<WriteSummary> {
        let pool = self.router.pool_for(request.tenant.as_deref()).await?;
        let mut guard = pool.get_connection().await?;
        let conn = guard.connection();

        let result = match &request.write {
            TemporalWrite::Attributes(attributes) => {
                self.apply_attributes(conn, request, attributes).await
            }
            TemporalWrite::Delete => conn.delete_temporal_entity(&request.id).await,
        };

        match result {
            Ok(rows) => {
                trace!(rows, entity = %request.id, "temporal write applied");
                Ok(WriteSummary {
                    rows_affected: rows,
                })
            }
            Err(err) => {
                error!(entity = %request.id, error = %err, "temporal write failed");
                Err(err)
            }
        }
    }

    async fn apply_attributes(
        &self,
        conn: &mut Connection,
        request: &TemporalWriteRequest,
        attributes: &[(String, AttributeOp)],
    ) -> Result<usize> {
        let mut rows = 0;

        for (attribute_id, op) in attributes {
            // id/type/createdAt/modifiedAt are header material, never
            // attribute instances.
            if is_system_attribute_key(attribute_id) {
                continue;
            }

            match op {
                AttributeOp::Append(instances) => {
                    if instances.is_empty() {
                        continue;
                    }
                    rows += self
                        .apply_instance_batch(conn, request, attribute_id, instances)
                        .await?;
                }
                AttributeOp::Delete => {
                    rows += match request.instance_id.as_deref() {
                        Some(instance_id) => {
                            let key = InstanceKey::new(
                                request.id.as_str(),
                                attribute_id.as_str(),
                                instance_id,
                            );
                            conn.delete_attribute_instance(&key).await?
                        }
                        None => conn.clear_attribute(&request.id, attribute_id).await?,
                    };
                }
            }
        }

        Ok(rows)
    }

    /// One attribute's instance batch, in one transaction.
    async fn apply_instance_batch(
        &self,
        conn: &mut Connection,
        request: &TemporalWriteRequest,
        attribute_id: &str,
        instances: &[Value],
    ) -> Result<usize> {
        let mut txn = conn.begin().await?;
        let mut rows = 0;

        // Header phase, only when the request carries the full header.
        if let (Some(entity_type), Some(created_at), Some(modified_at)) = (
            request.entity_type.as_deref(),
            request.created_at,
            request.modified_at,
        ) {
            rows += txn.upsert_temporal_entity(&request.id, entity_type, created_at, modified_at)?;
        }

        for (index, document) in instances.iter().enumerate() {
            // The first instance of a batch replaces the attribute's prior
            // instance set.
            let overwrite = index == 0;
            if overwrite {
                rows += txn.clear_attribute(&request.id, attribute_id)?;
            }

            let instance_id = resolve_instance_id(document);
            let key = InstanceKey::new(request.id.as_str(), attribute_id, instance_id);
            rows += txn.upsert_attribute_instance(key, document.clone())?;
        }

        if let Some(modified_at) = request.modified_at {
            rows += txn.touch_modified_at(&request.id, modified_at)?;
        }

        txn.commit()?;
        debug!(
            rows,
            entity = %request.id,
            attribute = attribute_id,
            instances = instances.len(),
            "attribute instance batch committed"
        );
        Ok(rows)
    }
}
