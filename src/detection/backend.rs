use image::DynamicImage;

use crate::error::Error;
use crate::models::Detection;

/// One detection capability: given an image, return zero or more boxes with
/// confidences. Implementations must not retain the image or touch shared
/// state; each call is independent.
pub trait DetectionBackend: Send + Sync {
    /// Backend identifier, used in logs and error messages.
    fn name(&self) -> &str;

    /// Run inference once over the image.
    fn detect(&self, image: &DynamicImage) -> Result<Vec<Detection>, Error>;
}

/// Backend that returns a configured list of detections on every call.
///
/// Stands in for a real model in tests and wiring checks.
#[derive(Debug, Clone, Default)]
pub struct FixedBackend {
    pub detections: Vec<Detection>,
}

impl FixedBackend {
    pub fn new(detections: Vec<Detection>) -> Self {
        Self { detections }
    }

    /// Build from bare confidences, with placeholder boxes.
    pub fn with_confidences(confidences: &[f32]) -> Self {
        let detections = confidences
            .iter()
            .enumerate()
            .map(|(i, &confidence)| Detection {
                bbox: crate::models::BoundBox {
                    x1: 10.0 * i as f32,
                    y1: 10.0 * i as f32,
                    x2: 10.0 * i as f32 + 8.0,
                    y2: 10.0 * i as f32 + 8.0,
                },
                confidence,
            })
            .collect();
        Self { detections }
    }
}

impl DetectionBackend for FixedBackend {
    fn name(&self) -> &str {
        "fixed"
    }

    fn detect(&self, _image: &DynamicImage) -> Result<Vec<Detection>, Error> {
        Ok(self.detections.clone())
    }
}

/// Backend that always fails, for exercising the error path.
#[derive(Debug, Clone, Default)]
pub struct FailingBackend;

impl DetectionBackend for FailingBackend {
    fn name(&self) -> &str {
        "failing"
    }

    fn detect(&self, _image: &DynamicImage) -> Result<Vec<Detection>, Error> {
        Err(Error::inference("backend configured to fail"))
    }
}
