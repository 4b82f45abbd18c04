#![cfg(feature = "backend-tract")]

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use image::imageops::{self, FilterType};
use tract_onnx::prelude::*;

use crate::dedup::deduplicate;
use crate::detect::backend::DetectorBackend;
use crate::detect::config::{resolve_model_path, DetectorConfig};
use crate::detect::result::{Detection, PERSON_CLASS_ID};
use crate::frame::Frame;
use crate::geometry::BoundingBox;

/// Box regression rows preceding the class scores in YOLO heads.
const BOX_ROWS: usize = 4;
/// Overlap used to collapse the raw anchor grid, matching YOLO's own default.
const ANCHOR_IOU_THRESHOLD: f64 = 0.7;

/// Tract-based backend for YOLOv8/YOLO11 ONNX exports.
///
/// Expects a single `[1, 4 + classes, anchors]` output. Only the person
/// column is decoded.
pub struct TractBackend {
    model: SimplePlan<TypedFact, Box<dyn TypedOp>>,
    imgsz: u32,
    confidence_threshold: f32,
}

impl TractBackend {
    /// Resolve, load and optimise the configured model.
    pub fn new(config: &DetectorConfig) -> Result<Self> {
        if !config.device.eq_ignore_ascii_case("cpu") {
            return Err(anyhow!(
                "tract backend runs on cpu only (requested device '{}')",
                config.device
            ));
        }
        let model_path = resolve_model_path(&config.model, &config.models_dir)?;
        Self::from_path(&model_path, config.imgsz, config.confidence_threshold)
    }

    pub fn from_path(model_path: &Path, imgsz: u32, confidence_threshold: f32) -> Result<Self> {
        let size = imgsz as usize;
        let model = tract_onnx::onnx()
            .model_for_path(model_path)
            .with_context(|| format!("failed to load ONNX model from {}", model_path.display()))?
            .with_input_fact(
                0,
                InferenceFact::dt_shape(f32::datum_type(), tvec!(1, 3, size, size)),
            )
            .context("failed to set input fact")?
            .into_optimized()
            .context("failed to optimize ONNX model")?
            .into_runnable()
            .context("failed to build runnable ONNX model")?;

        log::info!(
            "tract backend loaded {} ({}x{}, conf>={:.2})",
            model_path.display(),
            imgsz,
            imgsz,
            confidence_threshold
        );

        Ok(Self {
            model,
            imgsz,
            confidence_threshold,
        })
    }

    fn build_input(&self, frame: &Frame) -> Tensor {
        let resized = imageops::resize(frame.image(), self.imgsz, self.imgsz, FilterType::Triangle);
        let size = self.imgsz as usize;
        let input = tract_ndarray::Array4::from_shape_fn((1, 3, size, size), |(_, c, y, x)| {
            resized.get_pixel(x as u32, y as u32)[c] as f32 / 255.0
        });
        input.into_tensor()
    }

    fn decode(&self, outputs: TVec<TValue>, frame: &Frame) -> Result<Vec<Detection>> {
        let output = outputs
            .first()
            .ok_or_else(|| anyhow!("model produced no outputs"))?;
        let preds = output
            .to_array_view::<f32>()
            .context("model output tensor was not f32")?
            .into_dimensionality::<tract_ndarray::Ix3>()
            .context("expected a [1, 4 + classes, anchors] output")?;

        let rows = preds.shape()[1];
        if rows <= BOX_ROWS + PERSON_CLASS_ID {
            return Err(anyhow!("model output has {} rows, no class scores", rows));
        }

        let sx = frame.width() as f32 / self.imgsz as f32;
        let sy = frame.height() as f32 / self.imgsz as f32;
        let max_x = frame.width() as f32;
        let max_y = frame.height() as f32;

        let mut detections = Vec::new();
        for anchor in 0..preds.shape()[2] {
            let score = preds[[0, BOX_ROWS + PERSON_CLASS_ID, anchor]];
            if score < self.confidence_threshold {
                continue;
            }
            let cx = preds[[0, 0, anchor]];
            let cy = preds[[0, 1, anchor]];
            let w = preds[[0, 2, anchor]];
            let h = preds[[0, 3, anchor]];

            let x1 = ((cx - w / 2.0) * sx).clamp(0.0, max_x);
            let y1 = ((cy - h / 2.0) * sy).clamp(0.0, max_y);
            let x2 = ((cx + w / 2.0) * sx).clamp(0.0, max_x);
            let y2 = ((cy + h / 2.0) * sy).clamp(0.0, max_y);

            detections.push(Detection::person(
                BoundingBox::new(x1 as i32, y1 as i32, x2 as i32, y2 as i32),
                score,
            ));
        }

        Ok(deduplicate(&detections, ANCHOR_IOU_THRESHOLD))
    }
}

impl DetectorBackend for TractBackend {
    fn name(&self) -> &'static str {
        "tract"
    }

    fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>> {
        let input = self.build_input(frame);
        let outputs = self
            .model
            .run(tvec!(input.into()))
            .context("ONNX inference failed")?;
        self.decode(outputs, frame)
    }

    fn warm_up(&mut self) -> Result<()> {
        let size = self.imgsz as usize;
        let input = tract_ndarray::Array4::<f32>::zeros((1, 3, size, size)).into_tensor();
        self.model
            .run(tvec!(input.into()))
            .context("ONNX warm-up inference failed")?;
        Ok(())
    }
}
