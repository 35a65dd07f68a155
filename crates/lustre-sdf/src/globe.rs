//! The metal globe: a silver latitude/longitude grid floating inside a gold
//! land shell cut from a distance field

use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::f32::consts::{PI, TAU};
use std::sync::Arc;

use crate::eval::Sdf;
use crate::field::DistanceField;
use crate::node::{Material, Sample, SceneNode, Swizzle};

/// Globe dimensions in world units
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GlobeGeometry {
    /// Outer radius of the land shell
    pub radius: f32,
    /// Number of latitude and longitude rings
    pub grid_lines: u32,
    /// Tube radius of each grid ring
    pub grid_thickness: f32,
    /// Radial thickness of the land shell
    pub land_thickness: f32,
    /// Chamfer width along the coastline
    pub border_chamfer: f32,
}

impl Default for GlobeGeometry {
    fn default() -> Self {
        Self {
            radius: 50.0,
            grid_lines: 26,
            grid_thickness: 0.8,
            land_thickness: 2.0,
            border_chamfer: 0.15,
        }
    }
}

impl GlobeGeometry {
    /// Radius the grid rings are centred on, just inside the land shell
    pub fn grid_radius(&self) -> f32 {
        self.radius - self.land_thickness - self.grid_thickness
    }

    /// Angle between neighbouring rings
    pub fn grid_period(&self) -> f32 {
        TAU / self.grid_lines as f32
    }

    /// Radius of the polar cylinder that trims converging meridians
    pub fn polar_cap_radius(&self) -> f32 {
        (PI / self.grid_lines as f32).sin() * self.grid_radius()
    }
}

/// The assembled globe scene
#[derive(Debug, Clone)]
pub struct GlobeScene {
    geometry: GlobeGeometry,
    grid: Arc<SceneNode>,
    shell: Arc<SceneNode>,
    scene: SceneNode,
}

impl GlobeScene {
    pub fn build(geometry: GlobeGeometry, field: Arc<DistanceField>) -> Self {
        let grid = Arc::new(grid(&geometry));
        let shell = Arc::new(land_shell(&geometry, field));
        let scene = SceneNode::union(Arc::clone(&grid), Arc::clone(&shell));
        Self {
            geometry,
            grid,
            shell,
            scene,
        }
    }

    pub fn geometry(&self) -> &GlobeGeometry {
        &self.geometry
    }

    /// Silver grid only
    pub fn grid(&self) -> &SceneNode {
        &self.grid
    }

    /// Gold land shell only
    pub fn shell(&self) -> &SceneNode {
        &self.shell
    }

    /// Grid and land combined
    pub fn scene(&self) -> &SceneNode {
        &self.scene
    }
}

impl Sdf for GlobeScene {
    fn evaluate(&self, p: Vec3) -> Sample {
        self.scene.evaluate(p)
    }
}

/// Latitude rings plus longitude rings with the poles trimmed out
pub fn grid(geometry: &GlobeGeometry) -> SceneNode {
    let ring_offset = [geometry.grid_radius(), 0.0, 0.0];
    let period = geometry.grid_period();
    let tube = || SceneNode::sphere(geometry.grid_thickness, Material::Silver);

    let longitude = tube()
        .translate(ring_offset)
        .revolve()
        .swizzle(Swizzle::ZXY)
        .angular_repeat(period);

    let latitude = tube()
        .translate(ring_offset)
        .angular_repeat(period)
        .swizzle(Swizzle::XZY)
        .revolve();

    let polar_cap = SceneNode::cylinder(geometry.polar_cap_radius(), Material::Silver);

    SceneNode::union(latitude, SceneNode::subtract(polar_cap, longitude))
}

/// Land masses between the outer sphere and an inner sphere, with a
/// chamfered coastline
pub fn land_shell(geometry: &GlobeGeometry, field: Arc<DistanceField>) -> SceneNode {
    let outer = SceneNode::sphere(geometry.radius, Material::Gold);
    let inner = SceneNode::sphere(geometry.radius - geometry.land_thickness, Material::Gold);
    let land = SceneNode::field_shell(field, Material::Gold);

    let capped = SceneNode::chamfer_subtract(geometry.border_chamfer, SceneNode::negate(outer), land);
    SceneNode::subtract(inner, capped)
}
