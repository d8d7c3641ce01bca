use std::path::Path;

use anyhow::{anyhow, Context, Result};
use tract_ndarray::Axis;
use tract_onnx::prelude::*;

use crate::config::default_labels;
use crate::detect::backend::{DetectionError, DetectorBackend};
use crate::detect::result::{BoundingBox, Detection};
use crate::frame::RasterFrame;

const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.15;
const DEFAULT_IOU_THRESHOLD: f32 = 0.05;

/// Tract-based backend for ONNX letter/gesture detection.
///
/// Loads a local model file and performs inference on RGB frames. Frames
/// are resampled to the model input size before inference and the decoded
/// boxes are scaled back to source-frame pixel coordinates. No network
/// I/O; the model file is the only disk access.
pub struct TractBackend {
    model: TypedSimplePlan<TypedModel>,
    width: u32,
    height: u32,
    confidence_threshold: f32,
    iou_threshold: f32,
    labels: Vec<String>,
}

impl TractBackend {
    /// Load an ONNX model from disk and prepare it for inference.
    pub fn new<P: AsRef<Path>>(model_path: P, width: u32, height: u32) -> Result<Self> {
        let model_path = model_path.as_ref();
        let model = tract_onnx::onnx()
            .model_for_path(model_path)
            .with_context(|| format!("failed to load ONNX model from {}", model_path.display()))?
            .with_input_fact(
                0,
                InferenceFact::dt_shape(
                    f32::datum_type(),
                    tvec!(1, 3, height as usize, width as usize),
                ),
            )
            .context("failed to set input fact")?
            .into_optimized()
            .context("failed to optimize ONNX model")?
            .into_runnable()
            .context("failed to build runnable ONNX model")?;

        Ok(Self {
            model,
            width,
            height,
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            iou_threshold: DEFAULT_IOU_THRESHOLD,
            labels: default_labels(),
        })
    }

    /// Override the default confidence threshold.
    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.confidence_threshold = threshold;
        self
    }

    /// Override the default IoU suppression threshold.
    pub fn with_iou_threshold(mut self, threshold: f32) -> Self {
        self.iou_threshold = threshold;
        self
    }

    /// Replace the class label table (defaults to the letters A-Z).
    pub fn with_labels(mut self, labels: Vec<String>) -> Self {
        self.labels = labels;
        self
    }

    fn build_input(&self, frame: &RasterFrame) -> Result<Tensor> {
        let frame_width = frame.width() as usize;
        let frame_height = frame.height() as usize;
        let pixels = frame.pixels();

        let model_width = self.width as usize;
        let model_height = self.height as usize;

        // Nearest-neighbor resample into the model's NCHW input.
        let input = tract_ndarray::Array4::from_shape_fn(
            (1, 3, model_height, model_width),
            |(_, channel, y, x)| {
                let src_x = (x * frame_width) / model_width;
                let src_y = (y * frame_height) / model_height;
                let idx = (src_y * frame_width + src_x) * 3 + channel;
                pixels[idx] as f32 / 255.0
            },
        );

        Ok(input.into_tensor())
    }

    /// Decode YOLO-style output rows `[cx, cy, w, h, obj, class scores...]`
    /// into labeled boxes in source-frame pixel coordinates.
    fn decode_outputs(
        &self,
        outputs: TVec<TValue>,
        frame_width: u32,
        frame_height: u32,
    ) -> Result<Vec<Detection>> {
        let output = outputs
            .first()
            .ok_or_else(|| anyhow!("model produced no outputs"))?;
        let view = output
            .to_array_view::<f32>()
            .context("model output tensor was not f32")?;
        if view.ndim() != 3 || view.shape()[0] != 1 {
            return Err(anyhow!(
                "unexpected model output shape {:?}, expected [1, rows, 5 + classes]",
                view.shape()
            ));
        }
        let rows = view.index_axis(Axis(0), 0);
        let columns = rows.shape()[1];
        if columns != 5 + self.labels.len() {
            return Err(anyhow!(
                "model output row width {} does not match 5 + {} labels",
                columns,
                self.labels.len()
            ));
        }

        let scale_x = frame_width as f32 / self.width as f32;
        let scale_y = frame_height as f32 / self.height as f32;

        let mut candidates: Vec<(f32, Detection)> = Vec::new();
        for row in 0..rows.shape()[0] {
            let objectness = rows[[row, 4]];
            let mut best_class = 0usize;
            let mut best_score = f32::NEG_INFINITY;
            for class in 0..self.labels.len() {
                let score = rows[[row, 5 + class]];
                if score > best_score {
                    best_score = score;
                    best_class = class;
                }
            }
            let confidence = objectness * best_score;
            if !confidence.is_finite() || confidence < self.confidence_threshold {
                continue;
            }

            let cx = rows[[row, 0]] * scale_x;
            let cy = rows[[row, 1]] * scale_y;
            let w = rows[[row, 2]] * scale_x;
            let h = rows[[row, 3]] * scale_y;
            let bounding_box = BoundingBox::from_corners(
                cx - w / 2.0,
                cy - h / 2.0,
                cx + w / 2.0,
                cy + h / 2.0,
                frame_width,
                frame_height,
            );
            let label = self
                .labels
                .get(best_class)
                .ok_or_else(|| anyhow!("class index {} outside label table", best_class))?;
            candidates.push((confidence, Detection::new(label.clone(), bounding_box)));
        }

        Ok(suppress_overlaps(candidates, self.iou_threshold))
    }
}

impl DetectorBackend for TractBackend {
    fn name(&self) -> &'static str {
        "tract"
    }

    fn detect(&mut self, frame: &RasterFrame) -> Result<Vec<Detection>, DetectionError> {
        if frame.width() == 0 || frame.height() == 0 {
            return Err(DetectionError::Decode(format!(
                "cannot run inference on an empty {}x{} frame",
                frame.width(),
                frame.height()
            )));
        }
        let input = self.build_input(frame).map_err(DetectionError::Backend)?;
        let outputs = self
            .model
            .run(tvec!(input.into()))
            .context("ONNX inference failed")
            .map_err(DetectionError::Backend)?;
        self.decode_outputs(outputs, frame.width(), frame.height())
            .map_err(DetectionError::Backend)
    }

    fn warm_up(&mut self) -> Result<(), DetectionError> {
        let pixels = vec![0u8; (self.width * self.height * 3) as usize];
        let frame = RasterFrame::new(self.width, self.height, pixels)
            .map_err(|e| DetectionError::Decode(e.to_string()))?;
        self.detect(&frame).map(|_| ())
    }
}

/// Greedy non-maximum suppression, highest confidence first.
fn suppress_overlaps(mut candidates: Vec<(f32, Detection)>, iou_threshold: f32) -> Vec<Detection> {
    candidates.sort_by(|a, b| b.0.total_cmp(&a.0));
    let mut kept: Vec<Detection> = Vec::new();
    for (_, candidate) in candidates {
        let overlaps = kept
            .iter()
            .any(|existing| iou(&existing.bounding_box, &candidate.bounding_box) > iou_threshold);
        if !overlaps {
            kept.push(candidate);
        }
    }
    kept
}

fn iou(a: &BoundingBox, b: &BoundingBox) -> f32 {
    let ix_min = a.xmin.max(b.xmin) as f32;
    let iy_min = a.ymin.max(b.ymin) as f32;
    let ix_max = a.xmax.min(b.xmax) as f32;
    let iy_max = a.ymax.min(b.ymax) as f32;
    let intersection = (ix_max - ix_min + 1.0).max(0.0) * (iy_max - iy_min + 1.0).max(0.0);
    let area_a = (a.xmax - a.xmin + 1) as f32 * (a.ymax - a.ymin + 1) as f32;
    let area_b = (b.xmax - b.xmin + 1) as f32 * (b.ymax - b.ymin + 1) as f32;
    let union = area_a + area_b - intersection;
    if union <= 0.0 {
        0.0
    } else {
        intersection / union
    }
}
