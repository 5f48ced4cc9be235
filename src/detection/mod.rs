pub mod adapter;
pub mod annotate;
pub mod backend;
pub mod reconcile;
pub mod tract;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use image::DynamicImage;

pub use adapter::{DEFAULT_CONFIDENCE_THRESHOLD, DetectionAdapter};
pub use annotate::{Annotator, class_color};
pub use backend::{DetectionBackend, FixedBackend};
pub use reconcile::{Verdict, reconcile};
pub use tract::TractBackend;

use crate::error::Error;
use crate::models::DamageAssessment;

/// Upper bound on one full assessment (both models) when running through the
/// async entry point.
pub const DEFAULT_INFERENCE_TIMEOUT: Duration = Duration::from_secs(30);

/// The damage detection service: one adapter per damage class plus the
/// annotator, constructed once at startup and shared immutably for the
/// process lifetime.
pub struct DamageDetector {
    pothole: DetectionAdapter,
    waste: DetectionAdapter,
    annotator: Annotator,
    timeout: Duration,
}

impl DamageDetector {
    pub fn new(pothole: DetectionAdapter, waste: DetectionAdapter) -> Self {
        Self {
            pothole,
            waste,
            annotator: Annotator::new(),
            timeout: DEFAULT_INFERENCE_TIMEOUT,
        }
    }

    /// Load both ONNX models with the given confidence threshold.
    pub fn load_models<P: AsRef<Path>, Q: AsRef<Path>>(
        pothole_model: P,
        waste_model: Q,
        threshold: f32,
    ) -> anyhow::Result<Self> {
        let pothole = DetectionAdapter::new(Box::new(TractBackend::load("pothole", pothole_model)?))
            .with_threshold(threshold);
        let waste = DetectionAdapter::new(Box::new(TractBackend::load("waste", waste_model)?))
            .with_threshold(threshold);
        Ok(Self::new(pothole, waste))
    }

    pub fn with_annotator(mut self, annotator: Annotator) -> Self {
        self.annotator = annotator;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Run both detectors over the image, reconcile, and annotate.
    ///
    /// The two adapter calls are independent of each other; they run back to
    /// back here and only join in the pure reconcile step.
    pub fn assess(&self, image: &DynamicImage) -> Result<DamageAssessment, Error> {
        let pothole = self.pothole.detect(image)?;
        let waste = self.waste.detect(image)?;

        let verdict = reconcile(&pothole, &waste);
        let annotated = self.annotator.annotate(image, verdict.class, verdict.to_draw);

        tracing::debug!(
            class = %verdict.class,
            confidence = verdict.confidence,
            pothole_count = pothole.count(),
            waste_count = waste.count(),
            "assessment complete"
        );

        Ok(DamageAssessment {
            class: verdict.class,
            confidence: verdict.confidence,
            pothole_count: pothole.count(),
            waste_count: waste.count(),
            annotated,
        })
    }

    /// Async entry point used by the HTTP layer: runs `assess` on the
    /// blocking pool under a bounded timeout. Exceeding the timeout is an
    /// inference failure; the request is not retried.
    pub async fn assess_with_timeout(
        self: &Arc<Self>,
        image: DynamicImage,
    ) -> Result<DamageAssessment, Error> {
        let timeout = self.timeout;
        let detector = Arc::clone(self);
        let task = tokio::task::spawn_blocking(move || detector.assess(&image));

        match tokio::time::timeout(timeout, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_err)) => Err(Error::inference(format!(
                "detection task failed: {join_err}"
            ))),
            Err(_) => Err(Error::inference(format!(
                "detection timed out after {timeout:?}"
            ))),
        }
    }
}
