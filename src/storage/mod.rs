pub mod cluster;
pub mod database;
pub mod record;

pub use cluster::{DatabaseCluster, SharedDb};
pub use database::ContextDb;
pub use record::{AttributeInstanceRecord, EntityRecord, InstanceKey, TemporalEntityRecord};
