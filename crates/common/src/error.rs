//! Error types shared across Autoframe crates.

use std::path::PathBuf;

/// Top-level error type for Autoframe operations.
///
/// Per-frame anomalies (degenerate boxes, missing detections) are never
/// reported through this type; they degrade to a full-frame or held crop.
#[derive(Debug, thiserror::Error)]
pub enum AutoframeError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Frame unavailable: {message}")]
    FrameUnavailable { message: String },

    #[error("Detection error: {message}")]
    Detection { message: String },

    #[error("Render error: {message}")]
    Render { message: String },

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using AutoframeError.
pub type AutoframeResult<T> = Result<T, AutoframeError>;

impl AutoframeError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    pub fn frame_unavailable(msg: impl Into<String>) -> Self {
        Self::FrameUnavailable {
            message: msg.into(),
        }
    }

    pub fn detection(msg: impl Into<String>) -> Self {
        Self::Detection {
            message: msg.into(),
        }
    }

    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render {
            message: msg.into(),
        }
    }

    /// Whether this error was raised by configuration validation.
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config { .. })
    }
}
