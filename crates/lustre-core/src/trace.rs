//! Sphere tracing against a scene SDF

use glam::Vec3;
use lustre_sdf::{Material, Sdf};
use serde::{Deserialize, Serialize};

use crate::math::smoothstep;

/// Ray-march limits
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TraceConfig {
    pub max_steps: u32,
    /// A step closer than this counts as a hit
    pub hit_epsilon: f32,
    /// Give up once the ray has travelled this far
    pub max_distance: f32,
    /// Fraction of the SDF value advanced per step, below 1 so thin grid
    /// rings are not stepped over
    pub damping: f32,
    /// Pixel footprint per unit of travelled distance, for edge coverage
    pub footprint_scale: f32,
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self {
            max_steps: 96,
            hit_epsilon: 0.03,
            max_distance: 300.0,
            damping: 0.75,
            footprint_scale: 0.003,
        }
    }
}

/// Outcome of one traced ray
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TraceResult {
    /// Material of the surface hit, `None` for a miss
    pub material: Option<Material>,
    /// SDF value at the final sample
    pub last_distance: f32,
    /// Distance marched along the ray
    pub traveled: f32,
    /// Number of SDF evaluations
    pub steps: u32,
    /// Final sample position
    pub position: Vec3,
}

impl TraceResult {
    pub fn is_hit(&self) -> bool {
        self.material.is_some()
    }

    /// Antialiasing coverage: 1 on the surface, fading to 0 one pixel
    /// footprint away from it
    pub fn coverage(&self, footprint_scale: f32) -> f32 {
        let footprint = self.traveled * footprint_scale;
        smoothstep(footprint, 0.0, self.last_distance)
    }
}

/// March from `origin` along unit `direction` until a hit, a miss past
/// `max_distance`, or the step budget runs out (also a miss)
pub fn trace(scene: &impl Sdf, origin: Vec3, direction: Vec3, config: &TraceConfig) -> TraceResult {
    let mut position = origin;
    let mut traveled = 0.0;
    let mut last_distance = f32::MAX;
    let mut material = None;
    let mut steps = 0;

    while steps < config.max_steps {
        let sample = scene.evaluate(position);
        steps += 1;
        last_distance = sample.distance;

        if sample.distance < config.hit_epsilon {
            material = Some(sample.material);
            break;
        }
        if traveled > config.max_distance {
            break;
        }

        let step = sample.distance * config.damping;
        position += direction * step;
        traveled += step;
    }

    TraceResult {
        material,
        last_distance,
        traveled,
        steps,
        position,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use lustre_sdf::SceneNode;

    #[test]
    fn hits_sphere_in_front() {
        let sphere = SceneNode::sphere(50.0, Material::Gold);
        let r = trace(
            &sphere,
            Vec3::new(0.0, -130.0, 0.0),
            Vec3::Y,
            &TraceConfig::default(),
        );
        assert_eq!(r.material, Some(Material::Gold));
        assert!(r.last_distance < 0.03);
        assert_relative_eq!(r.position.y, -50.0, epsilon = 0.05);
        assert!(r.steps < 96);
    }

    #[test]
    fn misses_sphere_off_axis() {
        let sphere = SceneNode::sphere(50.0, Material::Gold);
        let r = trace(
            &sphere,
            Vec3::new(0.0, -130.0, 0.0),
            Vec3::new(1.0, 1.0, 0.0).normalize(),
            &TraceConfig::default(),
        );
        assert!(!r.is_hit());
        assert!(r.traveled > 300.0 || r.steps == 96);
    }

    #[test]
    fn hit_is_checked_before_distance_limit() {
        // Surface sits exactly at the distance limit
        let sphere = SceneNode::sphere(1.0, Material::Silver);
        let config = TraceConfig {
            max_distance: 0.0,
            damping: 1.0,
            ..TraceConfig::default()
        };
        let r = trace(&sphere, Vec3::new(0.0, 0.0, 1.01), -Vec3::Z, &config);
        assert_eq!(r.material, Some(Material::Silver));
        assert_eq!(r.steps, 1);
    }

    #[test]
    fn step_budget_exhaustion_is_a_miss() {
        let sphere = SceneNode::sphere(1.0, Material::Silver);
        let config = TraceConfig {
            max_steps: 2,
            damping: 0.1,
            ..TraceConfig::default()
        };
        let r = trace(&sphere, Vec3::new(0.0, 0.0, 10.0), -Vec3::Z, &config);
        assert!(!r.is_hit());
        assert_eq!(r.steps, 2);
    }

    #[test]
    fn coverage_fades_with_distance() {
        let mut r = TraceResult {
            material: None,
            last_distance: 0.0,
            traveled: 100.0,
            steps: 10,
            position: Vec3::ZERO,
        };
        assert_relative_eq!(r.coverage(0.003), 1.0);
        r.last_distance = 0.3;
        assert_relative_eq!(r.coverage(0.003), 0.0);
        r.last_distance = 0.15;
        assert_relative_eq!(r.coverage(0.003), 0.5, epsilon = 1e-5);
    }
}
