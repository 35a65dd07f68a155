//! Error types for Lustre

use thiserror::Error;

/// Result type alias using Lustre's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while building or running a scene
#[derive(Error, Debug)]
pub enum Error {
    /// No usable rendering backend, or the backend failed during init
    #[error("Rendering backend unavailable: {0}")]
    Backend(String),

    /// Card texture or land mask is unusable
    #[error("Invalid texture: {0}")]
    Texture(String),

    /// The scene was disposed while `init` was still pending
    #[error("Scene disposed during initialisation")]
    Cancelled,

    /// Tuning values out of range
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Image encoding/decoding error
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// Tuning file could not be parsed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
