use std::fmt;

use image::RgbImage;

/// Axis-aligned bounding box in pixel coordinates of the source image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl BoundBox {
    pub fn width(&self) -> f32 {
        (self.x2 - self.x1).max(0.0)
    }

    pub fn height(&self) -> f32 {
        (self.y2 - self.y1).max(0.0)
    }

    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }

    /// Clamp the box to an image of the given dimensions.
    pub fn clamped(&self, img_width: u32, img_height: u32) -> Self {
        let w = img_width as f32;
        let h = img_height as f32;
        Self {
            x1: self.x1.clamp(0.0, w),
            y1: self.y1.clamp(0.0, h),
            x2: self.x2.clamp(0.0, w),
            y2: self.y2.clamp(0.0, h),
        }
    }

    /// Intersection-over-union with another box.
    pub fn iou(&self, other: &BoundBox) -> f32 {
        let x1 = self.x1.max(other.x1);
        let y1 = self.y1.max(other.y1);
        let x2 = self.x2.min(other.x2);
        let y2 = self.y2.min(other.y2);

        let inter = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
        let union = self.area() + other.area() - inter;
        if union <= 0.0 { 0.0 } else { inter / union }
    }
}

/// One bounding-box + confidence result from a model for a single object
/// instance. Implicitly typed by which adapter produced it.
#[derive(Debug, Clone)]
pub struct Detection {
    pub bbox: BoundBox,
    pub confidence: f32,
}

/// The retained detections from one adapter run.
#[derive(Debug, Clone, Default)]
pub struct DetectionSet {
    pub detections: Vec<Detection>,
}

impl DetectionSet {
    pub fn new(detections: Vec<Detection>) -> Self {
        Self { detections }
    }

    pub fn count(&self) -> usize {
        self.detections.len()
    }

    /// Maximum confidence among retained detections, 0 if there are none.
    pub fn max_confidence(&self) -> f32 {
        self.detections
            .iter()
            .map(|d| d.confidence)
            .fold(0.0, f32::max)
    }
}

/// Reconciled damage classification for an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DamageClass {
    Pothole,
    Waste,
    None,
}

impl DamageClass {
    /// Wire/storage form, matching the strings already persisted by earlier
    /// deployments.
    pub fn as_str(&self) -> &'static str {
        match self {
            DamageClass::Pothole => "PotHole",
            DamageClass::Waste => "Waste",
            DamageClass::None => "None",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PotHole" => Some(DamageClass::Pothole),
            "Waste" => Some(DamageClass::Waste),
            "None" => Some(DamageClass::None),
            _ => None,
        }
    }
}

impl fmt::Display for DamageClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of running both detectors over one image: the winning class, its
/// confidence, the per-class counts and the annotated copy of the image.
pub struct DamageAssessment {
    pub class: DamageClass,
    pub confidence: f32,
    pub pothole_count: usize,
    pub waste_count: usize,
    pub annotated: RgbImage,
}

impl fmt::Debug for DamageAssessment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DamageAssessment")
            .field("class", &self.class)
            .field("confidence", &self.confidence)
            .field("pothole_count", &self.pothole_count)
            .field("waste_count", &self.waste_count)
            .finish()
    }
}
