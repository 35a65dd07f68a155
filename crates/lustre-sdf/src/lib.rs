//! Lustre SDF - Platform-agnostic scene description
//!
//! This crate holds everything about the globe that does not need a GPU:
//!
//! - [`LandMask`] and [`DistanceField`] - land/sea grid and its signed
//!   coastline distance
//! - [`SceneNode`] - the scene tree, evaluated on the CPU through [`Sdf`]
//! - [`GlobeScene`] - the grid and land shell assembled from [`GlobeGeometry`]
//! - [`WgslGenerator`] - compiles scene trees into WGSL
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use lustre_sdf::{DistanceField, GlobeGeometry, GlobeScene, LandMask, Sdf};
//!
//! let mask = LandMask::procedural(1, 64, 32).unwrap();
//! let field = Arc::new(DistanceField::generate(&mask));
//! let globe = GlobeScene::build(GlobeGeometry::default(), field);
//!
//! let d = globe.distance(glam::Vec3::new(0.0, -130.0, 0.0));
//! assert!(d > 70.0);
//! ```

pub mod eval;
pub mod field;
pub mod globe;
pub mod node;
mod wgsl_gen;

pub use eval::Sdf;
pub use field::{DistanceField, LandMask, direction_to_uv, uv_to_direction};
pub use globe::{GlobeGeometry, GlobeScene};
pub use node::{Axis, Material, Sample, SceneNode, Swizzle};
pub use wgsl_gen::{SCENE_MARKER, WgslGenerator, build_globe_module, inject_scene, sdf_prelude};
