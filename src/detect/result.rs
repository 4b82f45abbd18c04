use serde::Serialize;

use crate::geometry::BoundingBox;

/// COCO class id for `person`.
pub const PERSON_CLASS_ID: usize = 0;
/// Label attached to person detections.
pub const PERSON_CLASS_NAME: &str = "person";

/// One detector output for a single frame.
///
/// Detections are plain values: they are produced per frame and never linked
/// across frames.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Detection {
    pub bbox: BoundingBox,
    /// Score in `[0, 1]`.
    pub confidence: f32,
    pub class_name: String,
}

impl Detection {
    pub fn new(bbox: BoundingBox, confidence: f32, class_name: impl Into<String>) -> Self {
        Self {
            bbox,
            confidence,
            class_name: class_name.into(),
        }
    }

    pub fn person(bbox: BoundingBox, confidence: f32) -> Self {
        Self::new(bbox, confidence, PERSON_CLASS_NAME)
    }

    /// Overlay text, e.g. `person: 0.87`.
    pub fn label(&self) -> String {
        format!("{}: {:.2}", self.class_name, self.confidence)
    }
}
