use std::sync::Arc;

use image::{Rgb, RgbImage};
use roadwatch::core::db::{DamageReport, NewReport, ReportDb, ReportRepository};
use roadwatch::detection::{DamageDetector, DetectionAdapter, FixedBackend};
use roadwatch::models::DamageClass;

/// Creates a ReportDb in a fresh temp directory.
/// Returns both the store and the temp dir (which must be kept alive).
pub async fn create_test_store() -> (ReportDb, tempfile::TempDir) {
    let dir = tempfile::TempDir::new().expect("Failed to create temp directory");
    let db = ReportDb::open(dir.path())
        .await
        .expect("Failed to open test report store");
    (db, dir)
}

/// A small uniform test image standing in for an annotated capture.
pub fn create_test_image() -> RgbImage {
    RgbImage::from_pixel(64, 64, Rgb([90u8, 90u8, 90u8]))
}

/// The same test image encoded as PNG bytes, for upload tests.
pub fn create_test_image_png() -> Vec<u8> {
    let mut bytes = Vec::new();
    let mut cursor = std::io::Cursor::new(&mut bytes);
    image::DynamicImage::ImageRgb8(create_test_image())
        .write_to(&mut cursor, image::ImageFormat::Png)
        .expect("Failed to encode test image");
    bytes
}

/// Detector whose two backends return the given confidences on every call.
pub fn make_detector(pothole_confs: &[f32], waste_confs: &[f32]) -> Arc<DamageDetector> {
    Arc::new(DamageDetector::new(
        DetectionAdapter::new(Box::new(FixedBackend::with_confidences(pothole_confs))),
        DetectionAdapter::new(Box::new(FixedBackend::with_confidences(waste_confs))),
    ))
}

/// Inserts a report with the given class and coordinates.
pub async fn insert_report_at(
    db: &ReportDb,
    class: DamageClass,
    latitude: Option<f64>,
    longitude: Option<f64>,
) -> DamageReport {
    db.add_report(
        NewReport {
            detected_type: class,
            latitude,
            longitude,
        },
        &create_test_image(),
    )
    .await
    .expect("Failed to insert test report")
}
