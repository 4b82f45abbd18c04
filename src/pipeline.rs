//! Frame pipeline controller.
//!
//! One run reads a video frame by frame and, for each frame: detect,
//! drop malformed boxes, deduplicate, render, write, record. The loop is
//! driven purely by read success; the container's claimed frame count only
//! feeds progress reports.
//!
//! States: `Idle -> Opened -> Running -> Closed`, with `Failed` reachable
//! from any non-terminal state. Source and sink are owned by the run and
//! dropped on every exit path.

use std::time::Instant;

use serde::Serialize;

use crate::dedup::{deduplicate, DEFAULT_IOU_THRESHOLD};
use crate::detect::{Detection, DetectorBackend};
use crate::error::{PipelineError, Result};
use crate::frame::{FrameResult, VideoMetadata};
use crate::ingest::VideoSource;
use crate::preview::{AbortHandle, Preview, PreviewControl};
use crate::render::AnnotationRenderer;
use crate::sink::VideoSink;
use crate::stats::{DetectionSummary, RunningStatistics, StatisticsSnapshot};

pub const DEFAULT_PROGRESS_INTERVAL: u64 = 30;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    Idle,
    Opened,
    Running,
    Closed,
    Failed,
}

impl PipelineState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Closed | Self::Failed)
    }
}

/// Per-run knobs of the controller.
#[derive(Clone, Debug, PartialEq)]
pub struct PipelineConfig {
    /// Overlap above which the weaker of two detections is suppressed.
    pub iou_threshold: f64,
    /// Emit a progress observation every this many processed frames.
    pub progress_interval: u64,
    /// Feed annotated frames to the attached [`Preview`].
    pub display: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            iou_threshold: DEFAULT_IOU_THRESHOLD,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
            display: false,
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.iou_threshold) {
            return Err(PipelineError::InvalidConfig(format!(
                "iou_threshold must be within [0, 1] (got {})",
                self.iou_threshold
            )));
        }
        if self.progress_interval == 0 {
            return Err(PipelineError::InvalidConfig(
                "progress_interval must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Why the frame loop stopped.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    EndOfStream,
    /// The source failed mid-stream; treated as the end of the video.
    ReadError,
    Aborted,
}

/// Outcome of a completed run.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RunSummary {
    pub statistics: StatisticsSnapshot,
    pub frames_written: u64,
    /// Detections with inverted boxes discarded before deduplication.
    pub malformed_dropped: u64,
    pub termination: Termination,
}

/// Progress observation emitted every `progress_interval` frames.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Progress {
    pub frames_processed: u64,
    /// Frame count the container claims; may be zero or wrong.
    pub claimed_total: u64,
}

impl Progress {
    /// Share of the claimed total, `None` when the container claims nothing.
    pub fn percent(&self) -> Option<f64> {
        if self.claimed_total == 0 {
            return None;
        }
        Some(self.frames_processed as f64 / self.claimed_total as f64 * 100.0)
    }
}

/// Receives run progress. Has no bearing on what gets written.
pub trait ProgressObserver {
    fn on_start(&mut self, _metadata: &VideoMetadata) {}

    fn on_progress(&mut self, progress: &Progress);

    /// Called once the frame loop is over, whatever the outcome.
    fn on_finish(&mut self, _statistics: &StatisticsSnapshot) {}
}

/// Observer that reports progress through the `log` facade.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogProgress;

impl ProgressObserver for LogProgress {
    fn on_start(&mut self, metadata: &VideoMetadata) {
        log::info!(
            "video: {}x{} @ {:.2}fps, {} frames claimed",
            metadata.width,
            metadata.height,
            metadata.fps,
            metadata.claimed_frames
        );
    }

    fn on_progress(&mut self, progress: &Progress) {
        match progress.percent() {
            Some(pct) => log::info!(
                "processed {}/{} frames ({:.1}%)",
                progress.frames_processed,
                progress.claimed_total,
                pct
            ),
            None => log::info!("processed {} frames", progress.frames_processed),
        }
    }

    fn on_finish(&mut self, statistics: &StatisticsSnapshot) {
        log::info!(
            "done: {} frames, {:.2} detections/frame, {:.2} fps",
            statistics.total_frames,
            statistics.avg_detections,
            statistics.fps
        );
    }
}

/// Drives one detection run from an input video to an annotated output.
pub struct FramePipeline {
    detector: Box<dyn DetectorBackend>,
    config: PipelineConfig,
    renderer: AnnotationRenderer,
    preview: Option<Box<dyn Preview>>,
    abort: AbortHandle,
    state: PipelineState,
    stats: RunningStatistics,
    malformed_dropped: u64,
}

impl FramePipeline {
    pub fn new(detector: Box<dyn DetectorBackend>, config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            detector,
            config,
            renderer: AnnotationRenderer::default(),
            preview: None,
            abort: AbortHandle::new(),
            state: PipelineState::Idle,
            stats: RunningStatistics::new(),
            malformed_dropped: 0,
        })
    }

    pub fn with_renderer(mut self, renderer: AnnotationRenderer) -> Self {
        self.renderer = renderer;
        self
    }

    /// Attach a preview. It only receives frames when `display` is set.
    pub fn with_preview(mut self, preview: Box<dyn Preview>) -> Self {
        self.preview = Some(preview);
        self
    }

    /// Handle that stops the run at the next frame boundary.
    pub fn abort_handle(&self) -> AbortHandle {
        self.abort.clone()
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Statistics so far. Partial until the run is closed.
    pub fn statistics(&self) -> StatisticsSnapshot {
        self.stats.snapshot()
    }

    /// Annotate `input` into `output`.
    ///
    /// A pipeline runs once; a second call returns
    /// [`PipelineError::InvalidState`].
    pub fn process_video(
        &mut self,
        input: &str,
        output: &str,
        observer: &mut dyn ProgressObserver,
    ) -> Result<RunSummary> {
        if self.state != PipelineState::Idle {
            return Err(PipelineError::InvalidState(self.state));
        }

        let mut source = match VideoSource::open(input) {
            Ok(source) => source,
            Err(e) => return Err(self.fail(PipelineError::source_unavailable(input, e))),
        };
        let metadata = source.metadata();
        let mut sink = match VideoSink::create(output, &metadata) {
            Ok(sink) => sink,
            Err(e) => return Err(self.fail(PipelineError::sink_unavailable(output, e))),
        };
        self.state = PipelineState::Opened;
        log::info!(
            "pipeline: {} -> {} using {} detector",
            input,
            output,
            self.detector.name()
        );
        if self.config.display && self.preview.is_none() {
            log::warn!("pipeline: display requested but no preview attached");
        }
        observer.on_start(&metadata);

        self.state = PipelineState::Running;
        let started = Instant::now();
        let outcome = self.run_frames(&mut source, &mut sink, &metadata, observer);
        self.stats.record_elapsed(started.elapsed());
        if let Some(preview) = self.preview.as_mut() {
            preview.close();
        }
        observer.on_finish(&self.stats.snapshot());

        let source_stats = source.stats();
        drop(source);
        let termination = match outcome {
            Ok(termination) => termination,
            // The sink is dropped here; file backends close the container.
            Err(e) => return Err(self.fail(e)),
        };
        let sink_stats = match sink.finish() {
            Ok(stats) => stats,
            Err(e) => {
                let index = self.stats.frames_processed();
                return Err(self.fail(PipelineError::sink_write(index, e)));
            }
        };

        self.state = PipelineState::Closed;
        let summary = RunSummary {
            statistics: self.stats.snapshot(),
            frames_written: sink_stats.frames_written,
            malformed_dropped: self.malformed_dropped,
            termination,
        };
        log::info!(
            "pipeline: closed after {} frames read, {} written ({:?})",
            source_stats.frames_read,
            summary.frames_written,
            summary.termination
        );
        Ok(summary)
    }

    fn run_frames(
        &mut self,
        source: &mut VideoSource,
        sink: &mut VideoSink,
        metadata: &VideoMetadata,
        observer: &mut dyn ProgressObserver,
    ) -> Result<Termination> {
        loop {
            if self.abort.is_aborted() {
                log::info!(
                    "pipeline: abort requested after {} frames",
                    self.stats.frames_processed()
                );
                return Ok(Termination::Aborted);
            }

            let frame = match source.read_frame() {
                Ok(Some(frame)) => frame,
                Ok(None) => return Ok(Termination::EndOfStream),
                Err(e) => {
                    log::warn!("pipeline: read failed, ending stream: {:#}", e);
                    return Ok(Termination::ReadError);
                }
            };
            let index = frame.index();

            let raw = self
                .detector
                .detect(&frame)
                .map_err(|e| PipelineError::detector(index, e))?;
            let well_formed = self.drop_malformed(index, raw);
            let detections = deduplicate(&well_formed, self.config.iou_threshold);

            let annotated = self.renderer.render(&frame, &detections);
            sink.write_frame(&annotated)
                .map_err(|e| PipelineError::sink_write(index, e))?;
            self.stats.record(&detections);

            if log::log_enabled!(log::Level::Debug) {
                let summary = DetectionSummary::from_detections(&detections);
                log::debug!(
                    "frame {}: {} detections (avg {:.2}, min {:.2}, max {:.2})",
                    index,
                    summary.count,
                    summary.avg_confidence,
                    summary.min_confidence,
                    summary.max_confidence
                );
            }

            let processed = self.stats.frames_processed();
            if processed % self.config.progress_interval == 0 {
                observer.on_progress(&Progress {
                    frames_processed: processed,
                    claimed_total: metadata.claimed_frames,
                });
            }

            if self.config.display {
                if let Some(preview) = self.preview.as_mut() {
                    let result = FrameResult {
                        frame: annotated,
                        detections,
                    };
                    let control = preview
                        .show(&result)
                        .map_err(|e| PipelineError::preview(index, e))?;
                    if control == PreviewControl::Abort {
                        self.abort.abort();
                    }
                }
            }
        }
    }

    fn drop_malformed(&mut self, index: u64, raw: Vec<Detection>) -> Vec<Detection> {
        let (well_formed, malformed): (Vec<_>, Vec<_>) =
            raw.into_iter().partition(|det| det.bbox.is_well_formed());
        for det in &malformed {
            log::warn!(
                "frame {}: dropping malformed box {:?} ({:.2})",
                index,
                det.bbox,
                det.confidence
            );
        }
        self.malformed_dropped += malformed.len() as u64;
        well_formed
    }

    fn fail(&mut self, err: PipelineError) -> PipelineError {
        log::error!("pipeline: {}", err);
        self.state = PipelineState::Failed;
        err
    }
}
