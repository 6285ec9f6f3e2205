//! Error types for the avatar renderer.
//!
//! Only buffer allocation stops the render path. Every other anomaly (bad emotion
//! ids, degenerate geometry, a failed flush) is absorbed where it happens so a
//! single bad frame never interrupts the animation.

use thiserror::Error;

/// Main error type for the avatar renderer.
#[derive(Error, Debug)]
pub enum AvatarError {
    #[error("failed to allocate a {width}x{height} frame buffer")]
    BufferAllocation { width: u32, height: u32 },

    #[error("invalid configuration value for {field}: {message}")]
    InvalidConfig { field: String, message: String },

    #[error("failed to read configuration: {0}")]
    ConfigRead(String),

    #[error("failed to parse configuration: {0}")]
    ConfigParse(String),

    #[error("display flush failed: {0}")]
    Flush(String),

    #[error("render task ended abnormally: {0}")]
    RenderTask(String),

    #[error("image export failed: {0}")]
    Export(#[from] image::ImageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AvatarError {
    pub(crate) fn invalid(field: &str, message: impl Into<String>) -> Self {
        AvatarError::InvalidConfig {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, AvatarError>;
