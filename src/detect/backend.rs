use anyhow::Result;

use crate::detect::result::Detection;
use crate::frame::Frame;

/// Detector backend trait.
///
/// A backend is constructed once from a [`DetectorConfig`](super::DetectorConfig)
/// and then called for every frame of a run. Construction must fail when the
/// model cannot be loaded, before any frame is read.
///
/// Output contract:
/// - detections are already filtered to the configured confidence threshold
/// - detections are restricted to the configured class (person)
/// - boxes are in pixel coordinates of the input frame
/// - ordering is unspecified
pub trait DetectorBackend {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    /// Run detection on one frame. The frame is borrowed for the call only.
    fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>>;

    /// Optional warm-up hook.
    fn warm_up(&mut self) -> Result<()> {
        Ok(())
    }
}
