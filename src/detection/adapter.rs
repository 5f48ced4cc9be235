use image::DynamicImage;

use crate::detection::backend::DetectionBackend;
use crate::error::Error;
use crate::models::DetectionSet;

/// Threshold applied when the caller does not configure one.
pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.25;

/// Wraps one detection capability and filters its output by confidence.
///
/// The adapter invokes the backend exactly once per call, retains only
/// detections at or above the threshold, and has no side effects. Backend
/// failures propagate as [`Error::Inference`]; nothing is retried.
pub struct DetectionAdapter {
    backend: Box<dyn DetectionBackend>,
    threshold: f32,
}

impl DetectionAdapter {
    pub fn new(backend: Box<dyn DetectionBackend>) -> Self {
        Self {
            backend,
            threshold: DEFAULT_CONFIDENCE_THRESHOLD,
        }
    }

    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    pub fn detect(&self, image: &DynamicImage) -> Result<DetectionSet, Error> {
        let raw = self.backend.detect(image)?;
        let retained = raw
            .into_iter()
            .filter(|d| d.confidence >= self.threshold)
            .collect();
        Ok(DetectionSet::new(retained))
    }
}
