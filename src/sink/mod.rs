//! Annotated video outputs.
//!
//! - Local video files encoded with FFmpeg (feature: video-ffmpeg)
//! - In-memory `stub://` sinks (testing)

pub mod file;
#[cfg(feature = "video-ffmpeg")]
pub(crate) mod file_ffmpeg;

pub use file::{SinkStats, VideoSink};
