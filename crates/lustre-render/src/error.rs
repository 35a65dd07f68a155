//! Backend errors

use thiserror::Error;

pub type RenderResult<T> = std::result::Result<T, RenderError>;

#[derive(Error, Debug)]
pub enum RenderError {
    /// No adapter, or none compatible with the surface
    #[error("No suitable GPU adapter: {0}")]
    NoAdapter(String),

    #[error("Failed to create device: {0}")]
    RequestDevice(#[from] wgpu::RequestDeviceError),

    #[error("Failed to create surface: {0}")]
    CreateSurface(#[from] wgpu::CreateSurfaceError),

    /// Surface lost for good, or out of memory
    #[error("Surface error: {0}")]
    Surface(#[from] wgpu::SurfaceError),

    #[error("Invalid texture: {0}")]
    InvalidTexture(String),

    /// Mapping a readback buffer failed
    #[error("Readback failed: {0}")]
    Readback(String),
}

impl From<RenderError> for lustre_core::Error {
    fn from(err: RenderError) -> Self {
        match err {
            RenderError::InvalidTexture(msg) => Self::Texture(msg),
            other => Self::Backend(other.to_string()),
        }
    }
}
