pub mod registry;
pub mod router;

pub use registry::TenantRegistry;
pub use router::DatasourceRouter;
