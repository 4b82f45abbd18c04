//! Error taxonomy of a pipeline run.

use thiserror::Error;

use crate::pipeline::PipelineState;

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Failures surfaced by [`FramePipeline`](crate::pipeline::FramePipeline).
///
/// Every variant is fatal to the run; nothing is retried.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Input missing, unreadable or in an unsupported container.
    #[error("video source '{path}' unavailable: {reason}")]
    SourceUnavailable { path: String, reason: String },

    /// Output directory or file could not be created.
    #[error("video sink '{path}' unavailable: {reason}")]
    SinkUnavailable { path: String, reason: String },

    #[error("detector failed on frame {frame_index}: {reason}")]
    Detector { frame_index: u64, reason: String },

    #[error("failed to write frame {frame_index}: {reason}")]
    SinkWrite { frame_index: u64, reason: String },

    #[error("preview failed on frame {frame_index}: {reason}")]
    Preview { frame_index: u64, reason: String },

    #[error("pipeline cannot start from state {0:?}")]
    InvalidState(PipelineState),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl PipelineError {
    pub(crate) fn source_unavailable(path: &str, err: anyhow::Error) -> Self {
        Self::SourceUnavailable {
            path: path.to_string(),
            reason: format!("{err:#}"),
        }
    }

    pub(crate) fn sink_unavailable(path: &str, err: anyhow::Error) -> Self {
        Self::SinkUnavailable {
            path: path.to_string(),
            reason: format!("{err:#}"),
        }
    }

    pub(crate) fn detector(frame_index: u64, err: anyhow::Error) -> Self {
        Self::Detector {
            frame_index,
            reason: format!("{err:#}"),
        }
    }

    pub(crate) fn sink_write(frame_index: u64, err: anyhow::Error) -> Self {
        Self::SinkWrite {
            frame_index,
            reason: format!("{err:#}"),
        }
    }

    pub(crate) fn preview(frame_index: u64, err: anyhow::Error) -> Self {
        Self::Preview {
            frame_index,
            reason: format!("{err:#}"),
        }
    }
}
