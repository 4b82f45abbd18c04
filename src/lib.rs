//! Pedestrian Annotator
//!
//! Batch pedestrian detection for video files: every frame is run through a
//! person detector, overlapping boxes are suppressed, the survivors are drawn
//! onto the frame and the result is re-encoded at the source's native size
//! and frame rate.
//!
//! # Pipeline
//!
//! ```text
//! VideoSource -> DetectorBackend -> deduplicate -> AnnotationRenderer -> VideoSink
//!                                                     |
//!                                              RunningStatistics
//! ```
//!
//! The loop is single-threaded and strictly sequential: frame N+1 is not
//! read until frame N has been written.
//!
//! # Module Structure
//!
//! - `geometry`: `BoundingBox` and intersection-over-union
//! - `dedup`: greedy non-maximum suppression
//! - `stats`: run-level statistics and per-frame summaries
//! - `detect`: detector capability trait, configuration, backends
//! - `ingest` / `sink`: video input and output
//! - `render`: box and label overlays
//! - `pipeline`: the frame loop and its state machine
//! - `config`: TOML file plus environment settings

pub mod config;
pub mod dedup;
pub mod detect;
pub mod error;
pub mod frame;
pub mod geometry;
pub mod ingest;
pub mod logging;
pub mod pipeline;
pub mod preview;
pub mod render;
pub mod sink;
pub mod stats;

pub use config::AppConfig;
pub use dedup::{deduplicate, DEFAULT_IOU_THRESHOLD};
pub use detect::{
    build_detector, Detection, DetectorBackend, DetectorConfig, ModelInfo, StubBackend,
};
pub use error::{PipelineError, Result};
pub use frame::{Frame, FrameResult, VideoMetadata};
pub use geometry::{iou, BoundingBox};
pub use ingest::{validate_video_path, VideoSource};
pub use pipeline::{
    FramePipeline, LogProgress, PipelineConfig, PipelineState, Progress, ProgressObserver,
    RunSummary, Termination,
};
pub use preview::{AbortHandle, Preview, PreviewControl, SnapshotPreview};
pub use render::{AnnotationRenderer, RenderStyle};
pub use sink::VideoSink;
pub use stats::{DetectionSummary, RunningStatistics, StatisticsSnapshot};
