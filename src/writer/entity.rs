use std::sync::Arc;

use tracing::{error, trace};

use crate::core::Result;
use crate::core::constants::TABLE_ENTITY;
use crate::model::{EntityRequest, EntityWrite, WriteSummary};
use crate::storage::EntityRecord;
use crate::tenant::DatasourceRouter;

/// Persists the current state of entities: one row per id, three
/// projections per row, replaced in one statement so no partial-projection
/// state is ever observable.
pub struct EntitySnapshotWriter {
    router: Arc<DatasourceRouter>,
}

impl EntitySnapshotWriter {
    pub fn new(router: Arc<DatasourceRouter>) -> Self {
        Self { router }
    }

    /// Upsert or delete the snapshot row named by the request.
    pub async fn store_entity(&self, request: &EntityRequest) -> Result<WriteSummary> {
        let pool = self.router.pool_for(request.tenant.as_deref()).await?;
        let mut guard = pool.get_connection().await?;
        let conn = guard.connection();

        let result = match &request.write {
            EntityWrite::Upsert(documents) => {
                conn.upsert_entity(
                    &request.id,
                    EntityRecord {
                        data: documents.with_sys_attrs.clone(),
                        data_without_sysattrs: documents.without_sys_attrs.clone(),
                        kvdata: documents.key_values.clone(),
                    },
                )
                .await
            }
            EntityWrite::Delete => conn.delete_entity(&request.id).await,
        };

        match result {
            Ok(rows) => {
                trace!(rows, entity = %request.id, table = TABLE_ENTITY, "entity write applied");
                Ok(WriteSummary {
                    rows_affected: rows,
                })
            }
            Err(err) => {
                error!(entity = %request.id, error = %err, "entity write failed");
                Err(err)
            }
        }
    }
}
