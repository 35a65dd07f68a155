//! Metal shading for globe hits
//!
//! Mirrors `globe.wgsl`; the GPU path and the CPU fallback produce the same
//! colors for the same hit.

use glam::{Vec3, Vec4};
use lustre_sdf::{GlobeScene, Material, Sdf};
use serde::{Deserialize, Serialize};

use crate::math::{mix, mix3, reflect, smoothstep};
use crate::trace::{TraceConfig, TraceResult};

/// Material and lighting constants
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShadingConfig {
    /// Finite difference step for grid normals (wider, the rings are thin)
    pub grid_normal_epsilon: f32,
    /// Finite difference step for land normals
    pub land_normal_epsilon: f32,
    /// Power applied to the environment sample
    pub contrast: f32,
    pub silver_tint: f32,
    pub gold_tint: [f32; 3],
    pub gold_gain: f32,
    /// Spatial frequency of the land bump pattern
    pub bump_frequency: f32,
    pub bump_strength: f32,
    /// Distance over which the other surface stops shadowing
    pub shadow_range: f32,
}

impl Default for ShadingConfig {
    fn default() -> Self {
        Self {
            grid_normal_epsilon: 0.15,
            land_normal_epsilon: 0.12,
            contrast: 1.35,
            silver_tint: 0.95,
            gold_tint: [0.32, 0.10, 0.04],
            gold_gain: 9.0,
            bump_frequency: 0.02,
            bump_strength: 0.05,
            shadow_range: 3.0,
        }
    }
}

/// Surface normal by central differences
pub fn normal(sdf: &impl Sdf, p: Vec3, eps: f32) -> Vec3 {
    let dx = Vec3::new(eps, 0.0, 0.0);
    let dy = Vec3::new(0.0, eps, 0.0);
    let dz = Vec3::new(0.0, 0.0, eps);
    Vec3::new(
        sdf.distance(p + dx) - sdf.distance(p - dx),
        sdf.distance(p + dy) - sdf.distance(p - dy),
        sdf.distance(p + dz) - sdf.distance(p - dz),
    )
    .normalize_or_zero()
}

struct Lobe {
    direction: Vec3,
    exponent: f32,
    intensity: f32,
    color: Vec3,
}

impl Lobe {
    fn eval(&self, d: Vec3) -> Vec3 {
        let facing = d.dot(self.direction.normalize()).max(0.0);
        self.color * (facing.powf(self.exponent) * self.intensity)
    }
}

const LOBES: [Lobe; 4] = [
    // key
    Lobe {
        direction: Vec3::new(0.5, 0.7, -0.5),
        exponent: 48.0,
        intensity: 5.0,
        color: Vec3::new(1.0, 0.95, 0.85),
    },
    // secondary key
    Lobe {
        direction: Vec3::new(0.3, 0.5, -0.8),
        exponent: 16.0,
        intensity: 1.5,
        color: Vec3::new(1.0, 0.9, 0.7),
    },
    // fill
    Lobe {
        direction: Vec3::new(-0.6, 0.3, 0.5),
        exponent: 8.0,
        intensity: 0.4,
        color: Vec3::new(0.6, 0.7, 1.0),
    },
    // rim
    Lobe {
        direction: Vec3::new(0.0, 0.4, 0.9),
        exponent: 32.0,
        intensity: 3.0,
        color: Vec3::new(0.9, 0.92, 1.0),
    },
];

/// Analytic studio environment, y up
pub fn environment(dir: Vec3) -> Vec3 {
    let d = dir.normalize_or_zero();

    let sky = mix3(
        Vec3::new(0.04, 0.03, 0.02),
        Vec3::new(0.08, 0.09, 0.12),
        smoothstep(0.0, 1.0, d.y * 0.5 + 0.5),
    );
    let horizon = Vec3::new(0.9, 0.85, 0.75) * ((1.0 - d.y.abs()).max(0.0).powf(8.0) * 0.25);
    let ground = Vec3::new(0.35, 0.22, 0.12) * ((-d.y).max(0.0).powf(3.0) * 0.12);

    LOBES
        .iter()
        .fold(sky + horizon + ground, |acc, lobe| acc + lobe.eval(d))
}

/// Three axis-projected sine fields blended by how much the normal faces
/// each axis
pub fn triplanar_bump(p: Vec3, n: Vec3) -> Vec3 {
    let a = n.normalize_or_zero().abs();
    let w = a / (a.x + a.y + a.z).max(f32::EPSILON);

    let tx = Vec3::new(
        (p.y * 17.3 + p.z * 31.7).sin(),
        (p.y * 43.1 + p.z * 11.3).sin(),
        (p.z * 23.9 + p.y * 37.1).sin(),
    );
    let ty = Vec3::new(
        (p.z * 19.7 + p.x * 29.3).sin(),
        (p.z * 41.3 + p.x * 13.7).sin(),
        (p.x * 27.1 + p.z * 33.9).sin(),
    );
    let tz = Vec3::new(
        (p.x * 21.1 + p.y * 37.3).sin(),
        (p.x * 39.7 + p.y * 17.1).sin(),
        (p.y * 31.3 + p.x * 23.7).sin(),
    );
    tx * w.x + ty * w.y + tz * w.z
}

/// Soft occlusion from the other surface, in `[0.5, 1]`. `alignment` is
/// how much the normal faces the direction the occluder lies in.
pub fn self_shadow(other_distance: f32, alignment: f32, range: f32) -> f32 {
    let occlusion = smoothstep(0.0, range, other_distance);
    mix(1.0, occlusion, alignment.max(0.0)) * 0.5 + 0.5
}

/// Environment reflection with the metallic contrast curve applied
fn reflected(direction: Vec3, n: Vec3, contrast: f32) -> Vec3 {
    let r = reflect(direction, n);
    // The environment is authored y-up; the globe is z-up
    let env = environment(Vec3::new(r.x, r.z, r.y));
    env.powf(contrast)
}

/// Straight (non-premultiplied) color and alpha for a traced ray
pub fn shade_hit(
    globe: &GlobeScene,
    hit: &TraceResult,
    direction: Vec3,
    shading: &ShadingConfig,
    trace: &TraceConfig,
) -> Vec4 {
    let p = hit.position;
    let radial = p.normalize_or_zero();

    match hit.material {
        Some(Material::Silver) => {
            let n = normal(globe, p, shading.grid_normal_epsilon);
            let color = reflected(direction, n, shading.contrast) * shading.silver_tint;
            let shadow = self_shadow(globe.shell().distance(p), radial.dot(n), shading.shadow_range);
            (color * shadow).extend(hit.coverage(trace.footprint_scale))
        }
        Some(Material::Gold) => {
            let base = normal(globe, p, shading.land_normal_epsilon);
            let bump = triplanar_bump(p * shading.bump_frequency, base);
            let n = (base + bump * shading.bump_strength).normalize_or_zero();

            let tint = Vec3::from_array(shading.gold_tint) * shading.gold_gain;
            let color = reflected(direction, n, shading.contrast) * tint;
            let shadow = self_shadow(globe.grid().distance(p), -radial.dot(n), shading.shadow_range);
            (color * shadow).extend(1.0)
        }
        Some(Material::Background) | None => Vec4::ZERO,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use lustre_sdf::SceneNode;

    #[test]
    fn sphere_normal_is_radial() {
        let s = SceneNode::sphere(10.0, Material::Gold);
        let p = Vec3::new(3.0, -4.0, 8.0).normalize() * 10.0;
        let n = normal(&s, p, 0.12);
        let expected = p.normalize();
        assert_relative_eq!(n.dot(expected), 1.0, epsilon = 1e-4);
    }

    #[test]
    fn environment_is_brightest_towards_key() {
        let key = environment(Vec3::new(0.5, 0.7, -0.5));
        let away = environment(Vec3::new(-0.5, -0.7, 0.5));
        assert!(key.x > 4.0);
        assert!(away.x < 0.2);
        assert!(key.min_element() > 0.0 && away.min_element() > 0.0);
    }

    #[test]
    fn triplanar_weights_follow_normal() {
        // A normal along x only uses the x projection
        let p = Vec3::new(0.2, 0.3, 0.4);
        let b = triplanar_bump(p, Vec3::X);
        assert_relative_eq!(b.x, (0.3f32 * 17.3 + 0.4 * 31.7).sin(), epsilon = 1e-6);
    }

    #[test]
    fn self_shadow_range() {
        // Occluder touching, normal facing it: darkest
        assert_relative_eq!(self_shadow(0.0, 1.0, 3.0), 0.5);
        // Occluder far away: unshadowed
        assert_relative_eq!(self_shadow(10.0, 1.0, 3.0), 1.0);
        // Normal facing away from the occluder: unshadowed
        assert_relative_eq!(self_shadow(0.0, -1.0, 3.0), 1.0);
    }
}
