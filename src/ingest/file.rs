//! Video file frame source.
//!
//! `VideoSource` reads a local video file one frame at a time. Two backends:
//! - `stub://name?frames=N&...` synthetic clips for tests and demos
//! - container files decoded with FFmpeg (feature: video-ffmpeg)
//!
//! `read_frame` returns `Ok(None)` once the stream is exhausted. The claimed
//! frame count in [`VideoMetadata`] is advisory only.

use anyhow::{anyhow, Context, Result};
use image::{Rgb, RgbImage};
use std::path::Path;
use url::Url;

#[cfg(feature = "video-ffmpeg")]
use super::file_ffmpeg::FfmpegFileSource;
use super::validate::validate_video_path;
use crate::frame::{Frame, VideoMetadata};

pub(crate) const STUB_SCHEME: &str = "stub";

const DEFAULT_SYNTHETIC_FRAMES: u64 = 100;
const DEFAULT_SYNTHETIC_WIDTH: u32 = 640;
const DEFAULT_SYNTHETIC_HEIGHT: u32 = 480;
const DEFAULT_SYNTHETIC_FPS: f64 = 30.0;

/// Local video source.
pub struct VideoSource {
    backend: SourceBackend,
}

enum SourceBackend {
    Synthetic(SyntheticSource),
    #[cfg(feature = "video-ffmpeg")]
    Ffmpeg(FfmpegFileSource),
}

impl VideoSource {
    /// Open `path` for reading and read its metadata.
    pub fn open(path: &str) -> Result<Self> {
        if path.trim().is_empty() {
            return Err(anyhow!("input path is empty"));
        }
        if is_stub_uri(path) {
            return Ok(Self {
                backend: SourceBackend::Synthetic(SyntheticSource::parse(path)?),
            });
        }
        if path.contains("://") {
            return Err(anyhow!(
                "only local files are supported as input (got '{}')",
                path
            ));
        }
        validate_video_path(Path::new(path))?;

        #[cfg(feature = "video-ffmpeg")]
        {
            Ok(Self {
                backend: SourceBackend::Ffmpeg(FfmpegFileSource::open(path)?),
            })
        }
        #[cfg(not(feature = "video-ffmpeg"))]
        {
            Err(anyhow!(
                "decoding video files requires the video-ffmpeg feature"
            ))
        }
    }

    pub fn metadata(&self) -> VideoMetadata {
        match &self.backend {
            SourceBackend::Synthetic(source) => source.metadata(),
            #[cfg(feature = "video-ffmpeg")]
            SourceBackend::Ffmpeg(source) => source.metadata(),
        }
    }

    /// Decode the next frame. `Ok(None)` signals end of stream.
    pub fn read_frame(&mut self) -> Result<Option<Frame>> {
        match &mut self.backend {
            SourceBackend::Synthetic(source) => source.read_frame(),
            #[cfg(feature = "video-ffmpeg")]
            SourceBackend::Ffmpeg(source) => source.read_frame(),
        }
    }

    pub fn stats(&self) -> SourceStats {
        match &self.backend {
            SourceBackend::Synthetic(source) => source.stats(),
            #[cfg(feature = "video-ffmpeg")]
            SourceBackend::Ffmpeg(source) => source.stats(),
        }
    }
}

/// Statistics for a video source.
#[derive(Clone, Debug)]
pub struct SourceStats {
    pub frames_read: u64,
    pub path: String,
}

pub(crate) fn is_stub_uri(path: &str) -> bool {
    path.starts_with("stub://")
}

/// Query parameters of a `stub://` URI as key/value pairs.
pub(crate) fn stub_params(path: &str) -> Result<Vec<(String, String)>> {
    let url = Url::parse(path).with_context(|| format!("invalid stub uri '{}'", path))?;
    if url.scheme() != STUB_SCHEME {
        return Err(anyhow!("expected a stub:// uri, got '{}'", path));
    }
    Ok(url
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect())
}

pub(crate) fn parse_param<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| anyhow!("invalid value '{}' for stub parameter '{}'", value, key))
}

// ----------------------------------------------------------------------------
// Synthetic source (stub://) for tests
// ----------------------------------------------------------------------------

/// Synthetic clip described by URI parameters:
/// `frames`, `width`, `height`, `fps`, `claimed` (reported frame count,
/// defaults to `frames`), `fail_at` (frame index whose read errors).
struct SyntheticSource {
    path: String,
    frames: u64,
    width: u32,
    height: u32,
    fps: f64,
    claimed: u64,
    fail_at: Option<u64>,
    frame_count: u64,
}

impl SyntheticSource {
    fn parse(path: &str) -> Result<Self> {
        let mut source = Self {
            path: path.to_string(),
            frames: DEFAULT_SYNTHETIC_FRAMES,
            width: DEFAULT_SYNTHETIC_WIDTH,
            height: DEFAULT_SYNTHETIC_HEIGHT,
            fps: DEFAULT_SYNTHETIC_FPS,
            claimed: DEFAULT_SYNTHETIC_FRAMES,
            fail_at: None,
            frame_count: 0,
        };
        let mut claimed = None;
        for (key, value) in stub_params(path)? {
            match key.as_str() {
                "frames" => source.frames = parse_param(&key, &value)?,
                "width" => source.width = parse_param(&key, &value)?,
                "height" => source.height = parse_param(&key, &value)?,
                "fps" => source.fps = parse_param(&key, &value)?,
                "claimed" => claimed = Some(parse_param(&key, &value)?),
                "fail_at" => source.fail_at = Some(parse_param(&key, &value)?),
                other => return Err(anyhow!("unknown stub source parameter '{}'", other)),
            }
        }
        if source.width == 0 || source.height == 0 {
            return Err(anyhow!("synthetic frame dimensions must be non-zero"));
        }
        source.claimed = claimed.unwrap_or(source.frames);
        log::info!(
            "VideoSource: opened {} (synthetic, {} frames)",
            source.path,
            source.frames
        );
        Ok(source)
    }

    fn metadata(&self) -> VideoMetadata {
        VideoMetadata {
            width: self.width,
            height: self.height,
            fps: self.fps,
            frame_rate: None,
            claimed_frames: self.claimed,
        }
    }

    fn read_frame(&mut self) -> Result<Option<Frame>> {
        if self.fail_at == Some(self.frame_count) {
            anyhow::bail!("synthetic read failure at frame {}", self.frame_count);
        }
        if self.frame_count >= self.frames {
            return Ok(None);
        }
        let index = self.frame_count;
        self.frame_count += 1;
        Ok(Some(Frame::new(index, self.generate_image(index))))
    }

    fn generate_image(&self, index: u64) -> RgbImage {
        RgbImage::from_fn(self.width, self.height, |x, y| {
            let v = (u64::from(x) + u64::from(y) + index) % 256;
            Rgb([v as u8, (v / 2) as u8, 255 - v as u8])
        })
    }

    fn stats(&self) -> SourceStats {
        SourceStats {
            frames_read: self.frame_count,
            path: self.path.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synthetic_source_yields_requested_frames_then_ends() {
        let mut source = VideoSource::open("stub://clip?frames=3&width=32&height=16&fps=12.5")
            .unwrap();
        let meta = source.metadata();
        assert_eq!((meta.width, meta.height), (32, 16));
        assert_eq!(meta.fps, 12.5);
        assert_eq!(meta.claimed_frames, 3);

        for expected in 0..3 {
            let frame = source.read_frame().unwrap().expect("frame");
            assert_eq!(frame.index(), expected);
            assert_eq!(frame.pixels().len(), 32 * 16 * 3);
        }
        assert!(source.read_frame().unwrap().is_none());
        assert_eq!(source.stats().frames_read, 3);
    }

    #[test]
    fn claimed_count_may_disagree_with_content() {
        let source = VideoSource::open("stub://clip?frames=5&claimed=0").unwrap();
        assert_eq!(source.metadata().claimed_frames, 0);
    }

    #[test]
    fn fail_at_produces_a_read_error() {
        let mut source = VideoSource::open("stub://clip?frames=5&fail_at=1&width=4&height=4")
            .unwrap();
        assert!(source.read_frame().unwrap().is_some());
        assert!(source.read_frame().is_err());
    }

    #[test]
    fn rejects_bad_inputs() {
        assert!(VideoSource::open("").is_err());
        assert!(VideoSource::open("rtsp://camera/stream").is_err());
        assert!(VideoSource::open("stub://clip?frames=abc").is_err());
        assert!(VideoSource::open("stub://clip?colour=red").is_err());
        assert!(VideoSource::open("stub://clip?width=0").is_err());
        assert!(VideoSource::open("/definitely/not/here.mp4").is_err());
    }
}
