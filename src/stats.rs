//! Running detection statistics for one pipeline run.

use std::time::Duration;

use serde::Serialize;

use crate::detect::Detection;

/// Counters accumulated frame by frame.
///
/// Only [`RunningStatistics::record`] and [`RunningStatistics::record_elapsed`]
/// mutate it; every derived value comes from [`RunningStatistics::snapshot`].
#[derive(Clone, Debug, Default)]
pub struct RunningStatistics {
    frames_processed: u64,
    detections_total: u64,
    confidence_sum: f64,
    elapsed: Duration,
}

/// Derived, read-only view of [`RunningStatistics`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct StatisticsSnapshot {
    pub total_frames: u64,
    pub avg_detections: f64,
    pub avg_confidence: f64,
    /// Processing throughput. `0.0` until a non-zero elapsed time is recorded.
    pub fps: f64,
}

impl RunningStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Account for one processed frame and its surviving detections.
    pub fn record(&mut self, detections: &[Detection]) {
        self.frames_processed += 1;
        self.detections_total += detections.len() as u64;
        self.confidence_sum += detections
            .iter()
            .map(|det| f64::from(det.confidence))
            .sum::<f64>();
    }

    /// Set the wall-clock duration of the run.
    pub fn record_elapsed(&mut self, elapsed: Duration) {
        self.elapsed = elapsed;
    }

    pub fn frames_processed(&self) -> u64 {
        self.frames_processed
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn snapshot(&self) -> StatisticsSnapshot {
        let avg_detections = if self.frames_processed == 0 {
            0.0
        } else {
            self.detections_total as f64 / self.frames_processed as f64
        };
        let avg_confidence = if self.detections_total == 0 {
            0.0
        } else {
            self.confidence_sum / self.detections_total as f64
        };
        let secs = self.elapsed.as_secs_f64();
        let fps = if secs > 0.0 {
            self.frames_processed as f64 / secs
        } else {
            0.0
        };

        StatisticsSnapshot {
            total_frames: self.frames_processed,
            avg_detections,
            avg_confidence,
            fps,
        }
    }
}

/// Confidence summary of a single frame's detections.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct DetectionSummary {
    pub count: usize,
    pub avg_confidence: f32,
    pub min_confidence: f32,
    pub max_confidence: f32,
}

impl DetectionSummary {
    pub fn from_detections(detections: &[Detection]) -> Self {
        if detections.is_empty() {
            return Self::default();
        }
        let mut min = f32::INFINITY;
        let mut max = f32::NEG_INFINITY;
        let mut sum = 0.0f32;
        for det in detections {
            min = min.min(det.confidence);
            max = max.max(det.confidence);
            sum += det.confidence;
        }
        Self {
            count: detections.len(),
            avg_confidence: sum / detections.len() as f32,
            min_confidence: min,
            max_confidence: max,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::BoundingBox;

    fn dets(confidences: &[f32]) -> Vec<Detection> {
        confidences
            .iter()
            .enumerate()
            .map(|(i, &c)| {
                let x = i as i32 * 20;
                Detection::person(BoundingBox::new(x, 0, x + 10, 10), c)
            })
            .collect()
    }

    #[test]
    fn empty_statistics_snapshot_is_all_zero() {
        let stats = RunningStatistics::new();
        let snap = stats.snapshot();
        assert_eq!(snap.total_frames, 0);
        assert_eq!(snap.avg_detections, 0.0);
        assert_eq!(snap.avg_confidence, 0.0);
        assert_eq!(snap.fps, 0.0);
    }

    #[test]
    fn averages_over_frames_and_detections() {
        let mut stats = RunningStatistics::new();
        stats.record(&dets(&[0.5, 1.0]));
        stats.record(&[]);
        stats.record(&dets(&[0.75, 0.75, 1.0]));

        let snap = stats.snapshot();
        assert_eq!(snap.total_frames, 3);
        assert!((snap.avg_detections - 5.0 / 3.0).abs() < 1e-9);
        assert!((snap.avg_confidence - 4.0 / 5.0).abs() < 1e-9);
    }

    #[test]
    fn frames_without_detections_keep_confidence_at_zero() {
        let mut stats = RunningStatistics::new();
        stats.record(&[]);
        stats.record(&[]);
        let snap = stats.snapshot();
        assert_eq!(snap.total_frames, 2);
        assert_eq!(snap.avg_detections, 0.0);
        assert_eq!(snap.avg_confidence, 0.0);
    }

    #[test]
    fn fps_uses_recorded_elapsed_time() {
        let mut stats = RunningStatistics::new();
        for _ in 0..10 {
            stats.record(&[]);
        }
        assert_eq!(stats.snapshot().fps, 0.0);

        stats.record_elapsed(Duration::from_secs(2));
        assert!((stats.snapshot().fps - 5.0).abs() < 1e-9);
    }

    #[test]
    fn snapshot_is_idempotent() {
        let mut stats = RunningStatistics::new();
        stats.record(&dets(&[0.9]));
        stats.record_elapsed(Duration::from_millis(250));
        assert_eq!(stats.snapshot(), stats.snapshot());
    }

    #[test]
    fn per_frame_summary() {
        assert_eq!(DetectionSummary::from_detections(&[]), DetectionSummary::default());

        let summary = DetectionSummary::from_detections(&dets(&[0.5, 0.25, 0.75]));
        assert_eq!(summary.count, 3);
        assert_eq!(summary.min_confidence, 0.25);
        assert_eq!(summary.max_confidence, 0.75);
        assert!((summary.avg_confidence - 0.5).abs() < 1e-6);
    }
}
