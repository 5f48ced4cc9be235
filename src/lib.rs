pub mod core;
pub mod detection;
pub mod error;
pub mod geo;
pub mod models;
pub mod server;

pub use detection::{Annotator, DamageDetector, DetectionAdapter};
pub use error::Error;
pub use geo::{ProximityBox, ProximityQuery, filter_nearby};
pub use models::{BoundBox, DamageAssessment, DamageClass, Detection, DetectionSet};
