//! Frame ingestion sources.
//!
//! - Local video files decoded with FFmpeg (feature: video-ffmpeg)
//! - Synthetic `stub://` clips (testing)
//!
//! Sources own their decoder state exclusively and hand out one `Frame` at a
//! time. Input paths are validated against the container allow-list before
//! any decoding is attempted.

pub mod file;
#[cfg(feature = "video-ffmpeg")]
pub(crate) mod file_ffmpeg;
mod validate;

pub use file::{SourceStats, VideoSource};
pub use validate::{validate_video_path, SUPPORTED_VIDEO_FORMATS};
