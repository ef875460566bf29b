pub mod entity;
pub mod temporal;

pub use entity::EntitySnapshotWriter;
pub use temporal::TemporalWriteCoordinator;
