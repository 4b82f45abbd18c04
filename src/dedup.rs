//! Greedy suppression of overlapping detections within one frame.

use crate::detect::Detection;
use crate::geometry::iou;

/// Default overlap above which the weaker of two detections is dropped.
pub const DEFAULT_IOU_THRESHOLD: f64 = 0.5;

/// Single-class greedy non-maximum suppression.
///
/// Candidates are visited in descending confidence order; equal confidences
/// keep their input order. A candidate survives when its IoU against every
/// already accepted box is `<= iou_threshold`. Survivors are returned in the
/// order they were accepted, with their fields untouched.
///
/// Quadratic in the number of detections, which stays in the tens per frame.
pub fn deduplicate(detections: &[Detection], iou_threshold: f64) -> Vec<Detection> {
    if detections.is_empty() {
        return Vec::new();
    }

    let mut order: Vec<&Detection> = detections.iter().collect();
    // `sort_by` is stable, so ties stay in input order.
    order.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    let mut kept: Vec<Detection> = Vec::with_capacity(order.len());
    for candidate in order {
        let overlaps = kept
            .iter()
            .any(|accepted| iou(&candidate.bbox, &accepted.bbox) > iou_threshold);
        if !overlaps {
            kept.push(candidate.clone());
        }
    }
    kept
}
