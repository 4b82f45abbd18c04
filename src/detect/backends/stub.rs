use anyhow::Result;

use crate::detect::backend::DetectorBackend;
use crate::detect::result::{Detection, PERSON_CLASS_NAME};
use crate::frame::Frame;

/// Stub backend for tests and synthetic runs.
///
/// Returns the same scripted detections for every frame, after applying the
/// confidence threshold and person-only filter every backend must honour.
pub struct StubBackend {
    detections: Vec<Detection>,
    confidence_threshold: f32,
    calls: u64,
}

impl StubBackend {
    pub fn new() -> Self {
        Self {
            detections: Vec::new(),
            confidence_threshold: 0.0,
            calls: 0,
        }
    }

    /// Emit `detections` on every frame.
    pub fn with_detections(mut self, detections: Vec<Detection>) -> Self {
        self.detections = detections;
        self
    }

    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.confidence_threshold = threshold;
        self
    }

    /// Number of frames seen so far.
    pub fn calls(&self) -> u64 {
        self.calls
    }
}

impl Default for StubBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl DetectorBackend for StubBackend {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn detect(&mut self, _frame: &Frame) -> Result<Vec<Detection>> {
        self.calls += 1;
        Ok(self
            .detections
            .iter()
            .filter(|det| det.class_name == PERSON_CLASS_NAME)
            .filter(|det| det.confidence >= self.confidence_threshold)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::BoundingBox;
    use image::RgbImage;

    #[test]
    fn stub_backend_applies_contract_filters() {
        let mut backend = StubBackend::new()
            .with_threshold(0.5)
            .with_detections(vec![
                Detection::person(BoundingBox::new(0, 0, 10, 10), 0.9),
                Detection::person(BoundingBox::new(20, 0, 30, 10), 0.3),
                Detection::new(BoundingBox::new(40, 0, 50, 10), 0.95, "car"),
            ]);
        let frame = Frame::new(0, RgbImage::new(64, 48));

        let out = backend.detect(&frame).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].confidence, 0.9);

        backend.detect(&frame).unwrap();
        assert_eq!(backend.calls(), 2);
    }
}
