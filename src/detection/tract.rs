use std::cmp::Ordering;
use std::path::Path;

use anyhow::Context;
use image::imageops::FilterType;
use image::{DynamicImage, Rgb, RgbImage};
use tract_onnx::prelude::*;

use crate::detection::backend::DetectionBackend;
use crate::error::Error;
use crate::models::{BoundBox, Detection};

type OnnxPlan = SimplePlan<TypedFact, Box<dyn TypedOp>, TypedModel>;

/// Square model input edge used when none is configured.
pub const DEFAULT_INPUT_SIZE: usize = 640;

/// Letterbox fill value, the YOLO convention.
const PAD_VALUE: u8 = 114;

/// Raw anchors below this score are discarded before NMS. Final filtering by
/// the caller's confidence threshold happens in the adapter.
const RAW_SCORE_FLOOR: f32 = 0.05;

const NMS_IOU_THRESHOLD: f32 = 0.45;

/// ONNX object-detection backend.
///
/// Loads a YOLO-style model once and runs it on letterboxed RGB frames. The
/// output is expected in the `[1, 4 + classes, anchors]` layout with cx/cy/w/h
/// rows followed by per-class scores; boxes are mapped back to source-image
/// pixels and reduced with greedy IoU suppression, which matches what the
/// upstream inference library did internally.
pub struct TractBackend {
    name: String,
    model: OnnxPlan,
    input_size: usize,
}

impl TractBackend {
    pub fn load<P: AsRef<Path>>(name: &str, model_path: P) -> anyhow::Result<Self> {
        Self::load_with_input_size(name, model_path, DEFAULT_INPUT_SIZE)
    }

    pub fn load_with_input_size<P: AsRef<Path>>(
        name: &str,
        model_path: P,
        input_size: usize,
    ) -> anyhow::Result<Self> {
        let model_path = model_path.as_ref();
        let model = tract_onnx::onnx()
            .model_for_path(model_path)
            .with_context(|| format!("failed to load ONNX model from {}", model_path.display()))?
            .with_input_fact(
                0,
                InferenceFact::dt_shape(f32::datum_type(), tvec!(1, 3, input_size, input_size)),
            )
            .context("failed to set input fact")?
            .into_optimized()
            .context("failed to optimize ONNX model")?
            .into_runnable()
            .context("failed to build runnable ONNX model")?;

        tracing::info!(model = name, path = %model_path.display(), "loaded detection model");

        Ok(Self {
            name: name.to_string(),
            model,
            input_size,
        })
    }

    /// Letterbox the image into the square model input. Returns the tensor
    /// plus the scale and padding needed to map boxes back.
    fn preprocess(&self, image: &DynamicImage) -> (Tensor, f32, f32, f32) {
        let rgb = image.to_rgb8();
        let (src_w, src_h) = rgb.dimensions();
        let target = self.input_size as u32;

        let scale = (target as f32 / src_w as f32).min(target as f32 / src_h as f32);
        let scaled_w = ((src_w as f32 * scale) as u32).max(1);
        let scaled_h = ((src_h as f32 * scale) as u32).max(1);
        let pad_x = (target - scaled_w) / 2;
        let pad_y = (target - scaled_h) / 2;

        let resized = image::imageops::resize(&rgb, scaled_w, scaled_h, FilterType::Triangle);
        let mut canvas = RgbImage::from_pixel(target, target, Rgb([PAD_VALUE; 3]));
        image::imageops::overlay(&mut canvas, &resized, pad_x as i64, pad_y as i64);

        let size = self.input_size;
        let input = tract_ndarray::Array4::from_shape_fn((1, 3, size, size), |(_, c, y, x)| {
            canvas.get_pixel(x as u32, y as u32)[c] as f32 / 255.0
        });

        (input.into_tensor(), scale, pad_x as f32, pad_y as f32)
    }

    fn decode(
        &self,
        output: &Tensor,
        scale: f32,
        pad_x: f32,
        pad_y: f32,
        src_w: u32,
        src_h: u32,
    ) -> Result<Vec<Detection>, Error> {
        let view = output
            .to_array_view::<f32>()
            .map_err(|e| Error::inference(format!("{}: output was not f32: {e}", self.name)))?;

        let shape = view.shape();
        if shape.len() != 3 || shape[0] != 1 || shape[1] < 5 {
            return Err(Error::inference(format!(
                "{}: unexpected output shape {shape:?}, expected [1, 4 + classes, anchors]",
                self.name
            )));
        }
        let num_classes = shape[1] - 4;
        let num_anchors = shape[2];

        let mut detections = Vec::new();
        for i in 0..num_anchors {
            let mut score = 0.0f32;
            for c in 0..num_classes {
                score = score.max(view[[0, 4 + c, i]]);
            }
            if score < RAW_SCORE_FLOOR {
                continue;
            }

            let cx = view[[0, 0, i]];
            let cy = view[[0, 1, i]];
            let w = view[[0, 2, i]];
            let h = view[[0, 3, i]];

            let bbox = BoundBox {
                x1: ((cx - w / 2.0) - pad_x) / scale,
                y1: ((cy - h / 2.0) - pad_y) / scale,
                x2: ((cx + w / 2.0) - pad_x) / scale,
                y2: ((cy + h / 2.0) - pad_y) / scale,
            }
            .clamped(src_w, src_h);

            detections.push(Detection {
                bbox,
                confidence: score,
            });
        }

        Ok(non_max_suppression(detections, NMS_IOU_THRESHOLD))
    }
}

impl DetectionBackend for TractBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn detect(&self, image: &DynamicImage) -> Result<Vec<Detection>, Error> {
        let (src_w, src_h) = (image.width(), image.height());
        let (input, scale, pad_x, pad_y) = self.preprocess(image);

        let outputs = self
            .model
            .run(tvec!(input.into()))
            .map_err(|e| Error::inference(format!("{}: {e}", self.name)))?;
        let output = outputs
            .first()
            .ok_or_else(|| Error::inference(format!("{}: model produced no outputs", self.name)))?;

        let detections = self.decode(output, scale, pad_x, pad_y, src_w, src_h)?;
        tracing::debug!(model = %self.name, count = detections.len(), "inference complete");
        Ok(detections)
    }
}

/// Greedy IoU suppression, highest confidence first.
fn non_max_suppression(mut detections: Vec<Detection>, iou_threshold: f32) -> Vec<Detection> {
    detections.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(Ordering::Equal)
    });

    let mut keep: Vec<Detection> = Vec::new();
    'candidates: for candidate in detections {
        for kept in &keep {
            if kept.bbox.iou(&candidate.bbox) >= iou_threshold {
                continue 'candidates;
            }
        }
        keep.push(candidate);
    }
    keep
}
