//! # Lustre Core
//!
//! Everything between a scene description and pixels that does not need a
//! GPU: the sphere tracer and metal shading, temporal accumulation, the
//! card edition passes, the orientation controller and the scene
//! lifecycle. GPU stages live in `lustre-render` and mirror the functions
//! here one to one.
//!
//! ## Quick Start
//!
//! ```rust
//! use lustre_core::prelude::*;
//!
//! let tuning = Tuning::default();
//! let controller = OrientationController::new(
//!     tuning.interaction,
//!     GyroSupport::Unavailable,
//!     ContainerRect::new(0.0, 0.0, 400.0, 560.0),
//!     0.0,
//! );
//! let mut scene: SceneHandle<CpuCardStage> =
//!     SceneHandle::new(controller, SurfaceSize::new(40, 56));
//! // init(...).await, then tick(now) once per frame
//! scene.dispose();
//! ```
//!
//! ## Conventions
//!
//! - **World**: right-handed, z is the polar axis, the camera looks down +y
//! - **Angles**: radians, except device orientation input (degrees)
//! - **Time**: seconds as `f64`, supplied by the host
//! - **Colors**: linear, straight alpha

pub mod camera;
pub mod card;
pub mod cpu_render;
pub mod interact;
pub mod lifecycle;
pub mod mask;
pub mod math;
pub mod shade;
pub mod taa;
pub mod trace;
pub mod tuning;

mod error;

pub use error::{Error, Result};

/// Prelude module for convenient imports
pub mod prelude {
    // Scene description
    pub use lustre_sdf::{DistanceField, GlobeGeometry, GlobeScene, LandMask, Material, Sdf};

    // Tracing and shading
    pub use crate::camera::ViewConfig;
    pub use crate::shade::ShadingConfig;
    pub use crate::taa::{Jitter, RenderTargetPair, TaaConfig};
    pub use crate::trace::{TraceConfig, TraceResult, trace};

    // Cards
    pub use crate::card::{CardUniforms, Edition, sample_card};

    // Interaction
    pub use crate::interact::{
        ContainerRect, GyroSupport, HostRequest, InputEvent, InputMode, InteractionConfig,
        Orientation, OrientationController,
    };

    // Lifecycle
    pub use crate::cpu_render::{CpuCardStage, CpuGlobeStage};
    pub use crate::lifecycle::{
        CancelToken, Disposer, Frame, Phase, SceneHandle, Stage, SurfaceSize, TickOutcome,
    };
    pub use crate::tuning::Tuning;

    // Math (re-export glam)
    pub use glam::{Mat3, Vec2, Vec3, Vec4};

    // Error handling
    pub use crate::{Error, Result};
}
