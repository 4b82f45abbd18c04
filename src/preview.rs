//! Live preview and cooperative cancellation.
//!
//! The pipeline polls its [`AbortHandle`] once per iteration; a `Preview`
//! can also ask to stop after seeing a frame. Either way the loop ends at
//! the next iteration boundary and both video handles are released.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::frame::FrameResult;

/// Shared flag requesting early termination of a run.
#[derive(Clone, Debug, Default)]
pub struct AbortHandle {
    flag: Arc<AtomicBool>,
}

impl AbortHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn abort(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_aborted(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// What the loop should do after a preview update.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PreviewControl {
    Continue,
    Abort,
}

/// Receives every annotated frame when display is enabled.
pub trait Preview {
    fn show(&mut self, result: &FrameResult) -> Result<PreviewControl>;

    /// Called once when the run ends, on every exit path.
    fn close(&mut self) {}
}

/// Preview that keeps a JPEG of the latest annotated frame on disk.
///
/// The file is refreshed every `every` frames so an image viewer with
/// auto-reload works as a monitor.
pub struct SnapshotPreview {
    path: PathBuf,
    every: u64,
    written: u64,
}

impl SnapshotPreview {
    pub fn new(path: impl Into<PathBuf>, every: u64) -> Self {
        Self {
            path: path.into(),
            every: every.max(1),
            written: 0,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of snapshots written so far.
    pub fn snapshots(&self) -> u64 {
        self.written
    }
}

impl Preview for SnapshotPreview {
    fn show(&mut self, result: &FrameResult) -> Result<PreviewControl> {
        if result.frame.index() % self.every != 0 {
            return Ok(PreviewControl::Continue);
        }
        let tmp = self.path.with_extension("tmp.jpg");
        result
            .frame
            .image()
            .save_with_format(&tmp, image::ImageFormat::Jpeg)
            .with_context(|| format!("write preview snapshot {}", tmp.display()))?;
        std::fs::rename(&tmp, &self.path)
            .with_context(|| format!("replace preview snapshot {}", self.path.display()))?;
        self.written += 1;
        Ok(PreviewControl::Continue)
    }

    fn close(&mut self) {
        log::info!(
            "preview: {} snapshot(s) written to {}",
            self.written,
            self.path.display()
        );
    }
}
