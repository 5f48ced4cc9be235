mod fixtures;
pub use fixtures::*;

// Re-export commonly used types from roadwatch for tests
pub use roadwatch::core::db::{DamageReport, NewReport, ReportDb, ReportRepository};
pub use roadwatch::{DamageClass, ProximityQuery};
