//! Lustre Render - WGPU backends for the globe and card scenes
//!
//! This crate turns the platform-agnostic pieces in `lustre-core` into
//! GPU stages that plug into a [`SceneHandle`](lustre_core::lifecycle::SceneHandle):
//!
//! - [`GlobeStage`] - SDF raymarch into a ping-pong accumulation pair,
//!   then a display pass
//! - [`CardStage`] - a textured quad shaded by one of three edition passes
//! - [`window`] - a winit host mapping pointer, touch and keys to scene input
//! - [`render_offscreen`] - headless rendering to an image
//!
//! ## Example
//!
//! ```rust,ignore
//! use lustre_render::{SceneSource, WindowConfig, run_preview};
//!
//! run_preview(WindowConfig::default(), source, Tuning::default())?;
//! ```

pub mod camera;
pub mod card;
mod error;
pub mod globe;
pub mod gpu;
pub mod stage;
pub mod uniforms;
pub mod window;

// Re-export wgpu for users who need texture formats, etc.
pub use wgpu;
pub use winit;

pub use camera::{Camera, card_model};
pub use card::CardStage;
pub use error::{RenderError, RenderResult};
pub use globe::{GlobeStage, globe_shader};
pub use gpu::{Gpu, Output, adapter_available, init_headless, init_with_surface, upload_rgba};
pub use stage::{GpuStage, SceneSource, render_offscreen};
pub use uniforms::{CardPassUniforms, GlobeUniforms};
pub use window::{WindowConfig, controls_help, run_preview};
