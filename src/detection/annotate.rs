use std::path::Path;

use ab_glyph::{FontVec, PxScale};
use anyhow::Context;
use image::{DynamicImage, Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_rect_mut, draw_text_mut};
use imageproc::rect::Rect;

use crate::models::{DamageClass, Detection};

const BORDER_THICKNESS: i32 = 2;
const LABEL_SCALE: f32 = 24.0;
const LABEL_OFFSET_Y: i32 = 10;

/// Overlay color for a damage class.
pub fn class_color(class: DamageClass) -> Rgb<u8> {
    match class {
        DamageClass::Pothole => Rgb([0, 255, 0]),
        DamageClass::Waste => Rgb([255, 0, 0]),
        DamageClass::None => Rgb([255, 255, 255]),
    }
}

/// Draws detection overlays onto a copy of the source image.
///
/// The label font is optional; without one the boxes are still drawn and the
/// text is skipped. The returned copy is the image that gets persisted, so
/// the original capture survives only through this overlayed version.
pub struct Annotator {
    font: Option<FontVec>,
}

impl Annotator {
    pub fn new() -> Self {
        Self { font: None }
    }

    /// Load a TTF/OTF font for the confidence labels.
    pub fn with_font_file<P: AsRef<Path>>(mut self, path: P) -> anyhow::Result<Self> {
        let bytes = std::fs::read(path.as_ref())
            .with_context(|| format!("failed to read font file {:?}", path.as_ref()))?;
        let font = FontVec::try_from_vec(bytes)
            .with_context(|| format!("invalid font file {:?}", path.as_ref()))?;
        self.font = Some(font);
        Ok(self)
    }

    pub fn has_font(&self) -> bool {
        self.font.is_some()
    }

    /// Paint a rectangle and `"{label} {confidence:.2}"` text for each
    /// detection. Pixels outside the drawn regions are untouched.
    pub fn annotate(
        &self,
        image: &DynamicImage,
        class: DamageClass,
        detections: &[Detection],
    ) -> RgbImage {
        let mut canvas = image.to_rgb8();
        let color = class_color(class);
        let (width, height) = canvas.dimensions();

        for detection in detections {
            let bbox = detection.bbox.clamped(width, height);
            let x = bbox.x1 as i32;
            let y = bbox.y1 as i32;
            let w = bbox.width().round().max(1.0) as u32;
            let h = bbox.height().round().max(1.0) as u32;

            for inset in 0..BORDER_THICKNESS {
                let iw = w.saturating_sub(2 * inset as u32);
                let ih = h.saturating_sub(2 * inset as u32);
                if iw == 0 || ih == 0 {
                    break;
                }
                draw_hollow_rect_mut(
                    &mut canvas,
                    Rect::at(x + inset, y + inset).of_size(iw, ih),
                    color,
                );
            }

            if let Some(font) = &self.font {
                let label = format!("{} {:.2}", class, detection.confidence);
                let text_y = (y - LABEL_OFFSET_Y).max(0);
                draw_text_mut(
                    &mut canvas,
                    color,
                    x,
                    text_y,
                    PxScale::from(LABEL_SCALE),
                    font,
                    &label,
                );
            }
        }

        canvas
    }
}

impl Default for Annotator {
    fn default() -> Self {
        Self::new()
    }
}
