//! Decoded frames and stream metadata.
//!
//! - `Frame`: one decoded RGB image plus its position in the stream.
//! - `VideoMetadata`: native geometry and rate reported by a source.
//! - `FrameResult`: an annotated frame paired with the detections drawn on it.

use image::RgbImage;

use crate::detect::Detection;

/// Native properties of a video stream.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VideoMetadata {
    pub width: u32,
    pub height: u32,
    /// Frames per second as reported by the container.
    pub fps: f64,
    /// Exact rate as `(numerator, denominator)` when the container has one.
    pub frame_rate: Option<(i32, i32)>,
    /// Frame count claimed by the container. Zero or wrong for many files;
    /// only used for progress display.
    pub claimed_frames: u64,
}

/// One decoded frame, RGB8, row-major.
#[derive(Clone, Debug)]
pub struct Frame {
    index: u64,
    image: RgbImage,
}

impl Frame {
    pub fn new(index: u64, image: RgbImage) -> Self {
        Self { index, image }
    }

    /// Zero-based position in the source stream.
    pub fn index(&self) -> u64 {
        self.index
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    /// Packed RGB bytes, `width * height * 3` long.
    pub fn pixels(&self) -> &[u8] {
        self.image.as_raw()
    }

    pub fn into_image(self) -> RgbImage {
        self.image
    }
}

/// Output of one pipeline iteration.
#[derive(Clone, Debug)]
pub struct FrameResult {
    pub frame: Frame,
    pub detections: Vec<Detection>,
}
