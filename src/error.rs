//! Error types for the frame pipeline.
//!
//! Only conditions a caller has to decide about are errors here. Out-of-frame
//! detector boxes and empty color regions are ordinary input and never show
//! up as a `PipelineError`.

use thiserror::Error;

/// Result type alias for the pipeline core.
pub type Result<T> = std::result::Result<T, PipelineError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PipelineError {
    /// Malformed or empty capture frame. Skip it and keep the stream going.
    #[error("invalid frame: {0}")]
    InvalidFrame(String),

    /// A scoring model returned output of an unexpected shape or value.
    #[error("model output shape error ({output}): {detail}")]
    ModelOutputShape {
        output: &'static str,
        detail: String,
    },

    /// A scoring backend failed to run.
    #[error("{stage} backend failed: {message}")]
    Backend {
        stage: &'static str,
        message: String,
    },
}

impl PipelineError {
    pub fn invalid_frame<S: Into<String>>(msg: S) -> Self {
        Self::InvalidFrame(msg.into())
    }

    pub fn model_output<S: Into<String>>(output: &'static str, detail: S) -> Self {
        Self::ModelOutputShape {
            output,
            detail: detail.into(),
        }
    }

    pub(crate) fn backend(stage: &'static str, err: anyhow::Error) -> Self {
        Self::Backend {
            stage,
            message: format!("{:#}", err),
        }
    }

    /// Frame-level problems that should be skipped without further thought.
    pub fn is_invalid_frame(&self) -> bool {
        matches!(self, Self::InvalidFrame(_))
    }
}
