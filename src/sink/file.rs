//! Annotated video output.
//!
//! `VideoSink` writes frames at the source's native size and rate:
//! - `stub://name` keeps frames in memory (tests, demos); `fail_at=N` makes
//!   the write of frame N fail
//! - any other path is encoded with FFmpeg (feature: video-ffmpeg)
//!
//! The parent directory of a file sink is created if absent.

use anyhow::{anyhow, Context, Result};
use std::path::Path;

#[cfg(feature = "video-ffmpeg")]
use super::file_ffmpeg::FfmpegFileSink;
use crate::frame::{Frame, VideoMetadata};
use crate::ingest::file::{is_stub_uri, parse_param, stub_params};

/// Video output handle.
pub struct VideoSink {
    backend: SinkBackend,
}

enum SinkBackend {
    Memory(MemorySink),
    #[cfg(feature = "video-ffmpeg")]
    Ffmpeg(FfmpegFileSink),
}

impl VideoSink {
    /// Create the output for a stream described by `metadata`.
    pub fn create(path: &str, metadata: &VideoMetadata) -> Result<Self> {
        if path.trim().is_empty() {
            return Err(anyhow!("output path is empty"));
        }
        if is_stub_uri(path) {
            return Ok(Self {
                backend: SinkBackend::Memory(MemorySink::parse(path, metadata)?),
            });
        }
        if path.contains("://") {
            return Err(anyhow!(
                "only local files are supported as output (got '{}')",
                path
            ));
        }

        if let Some(parent) = Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("failed to create output directory {}", parent.display())
                })?;
            }
        }

        #[cfg(feature = "video-ffmpeg")]
        {
            Ok(Self {
                backend: SinkBackend::Ffmpeg(FfmpegFileSink::create(path, metadata)?),
            })
        }
        #[cfg(not(feature = "video-ffmpeg"))]
        {
            Err(anyhow!(
                "encoding video files requires the video-ffmpeg feature"
            ))
        }
    }

    pub fn write_frame(&mut self, frame: &Frame) -> Result<()> {
        match &mut self.backend {
            SinkBackend::Memory(sink) => sink.write_frame(frame),
            #[cfg(feature = "video-ffmpeg")]
            SinkBackend::Ffmpeg(sink) => sink.write_frame(frame),
        }
    }

    /// Flush buffered output and close the file.
    pub fn finish(self) -> Result<SinkStats> {
        match self.backend {
            SinkBackend::Memory(sink) => Ok(sink.stats()),
            #[cfg(feature = "video-ffmpeg")]
            SinkBackend::Ffmpeg(sink) => sink.finish(),
        }
    }

    pub fn stats(&self) -> SinkStats {
        match &self.backend {
            SinkBackend::Memory(sink) => sink.stats(),
            #[cfg(feature = "video-ffmpeg")]
            SinkBackend::Ffmpeg(sink) => sink.stats(),
        }
    }
}

/// Statistics for a video sink.
#[derive(Clone, Debug, PartialEq)]
pub struct SinkStats {
    pub frames_written: u64,
    pub path: String,
}

/// Used when the source reports no usable frame rate.
#[cfg_attr(not(feature = "video-ffmpeg"), allow(dead_code))]
pub(crate) const FALLBACK_FPS: i32 = 30;
/// MPEG-4 Part 2 caps the time base denominator at 16 bits.
#[cfg_attr(not(feature = "video-ffmpeg"), allow(dead_code))]
pub(crate) const MAX_RATE_NUMERATOR: i64 = 65_535;

/// Frame rate `(numerator, denominator)` the MPEG-4 encoder accepts.
///
/// Prefers the container's exact rational, reduced; falls back to the
/// float rate in millihertz, then to whole frames per second.
#[cfg_attr(not(feature = "video-ffmpeg"), allow(dead_code))]
pub(crate) fn encoder_frame_rate(metadata: &VideoMetadata) -> (i32, i32) {
    let exact = metadata
        .frame_rate
        .filter(|&(num, den)| num > 0 && den > 0)
        .map(|(num, den)| (i64::from(num), i64::from(den)));
    let approx = (metadata.fps.is_finite() && metadata.fps > 0.0)
        .then(|| ((metadata.fps * 1000.0).round() as i64, 1000));

    let Some((num, den)) = exact.or(approx).filter(|&(num, _)| num > 0) else {
        return (FALLBACK_FPS, 1);
    };
    let (num, den) = reduce(num, den);
    if num <= MAX_RATE_NUMERATOR {
        return (num as i32, den as i32);
    }
    let whole = (num as f64 / den as f64).round() as i64;
    (whole.clamp(1, MAX_RATE_NUMERATOR) as i32, 1)
}

/// Largest even size not above the source; YUV 4:2:0 needs even dimensions.
#[cfg_attr(not(feature = "video-ffmpeg"), allow(dead_code))]
pub(crate) fn encoder_dimensions(width: u32, height: u32) -> Result<(u32, u32)> {
    let (even_w, even_h) = (width & !1, height & !1);
    if even_w == 0 || even_h == 0 {
        return Err(anyhow!(
            "frame size {}x{} is too small to encode as YUV 4:2:0",
            width,
            height
        ));
    }
    Ok((even_w, even_h))
}

#[cfg_attr(not(feature = "video-ffmpeg"), allow(dead_code))]
fn reduce(num: i64, den: i64) -> (i64, i64) {
    let (mut a, mut b) = (num, den);
    while b != 0 {
        (a, b) = (b, a % b);
    }
    (num / a, den / a)
}

// ----------------------------------------------------------------------------
// In-memory sink (stub://) for tests
// ----------------------------------------------------------------------------

struct MemorySink {
    path: String,
    width: u32,
    height: u32,
    fail_at: Option<u64>,
    frames_written: u64,
}

impl MemorySink {
    fn parse(path: &str, metadata: &VideoMetadata) -> Result<Self> {
        let mut fail_at = None;
        for (key, value) in stub_params(path)? {
            match key.as_str() {
                "fail_at" => fail_at = Some(parse_param(&key, &value)?),
                other => return Err(anyhow!("unknown stub sink parameter '{}'", other)),
            }
        }
        log::info!(
            "VideoSink: writing {} (memory, {}x{} @ {:.2}fps)",
            path,
            metadata.width,
            metadata.height,
            metadata.fps
        );
        Ok(Self {
            path: path.to_string(),
            width: metadata.width,
            height: metadata.height,
            fail_at,
            frames_written: 0,
        })
    }

    fn write_frame(&mut self, frame: &Frame) -> Result<()> {
        if self.fail_at == Some(self.frames_written) {
            anyhow::bail!("synthetic write failure at frame {}", self.frames_written);
        }
        if frame.width() != self.width || frame.height() != self.height {
            return Err(anyhow!(
                "frame size {}x{} does not match sink {}x{}",
                frame.width(),
                frame.height(),
                self.width,
                self.height
            ));
        }
        self.frames_written += 1;
        Ok(())
    }

    fn stats(&self) -> SinkStats {
        SinkStats {
            frames_written: self.frames_written,
            path: self.path.clone(),
        }
    }
}
