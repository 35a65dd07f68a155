//! Uniform buffer layouts shared with the WGSL sources
//!
//! Field order and padding follow WGSL uniform layout rules: every
//! `vec3` starts on a 16 byte boundary and struct sizes are multiples of 16.

use bytemuck::{Pod, Zeroable};
use glam::{Mat3, Mat4, Vec2};
use lustre_core::card::CardUniforms;
use lustre_core::tuning::Tuning;

/// Globe scene pass inputs
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct GlobeUniforms {
    /// World rotation, `mat3x3<f32>` columns padded to `vec4`
    pub rotation: [[f32; 4]; 3],
    pub resolution: [f32; 2],
    /// Sub-pixel offset in uv units
    pub jitter: [f32; 2],
    pub eye_distance: f32,
    pub focal_length: f32,
    /// Weight of the new frame; 1 right after a reallocation
    pub blend: f32,
    pub max_steps: u32,
    pub hit_epsilon: f32,
    pub max_distance: f32,
    pub damping: f32,
    pub footprint_scale: f32,
    pub grid_normal_epsilon: f32,
    pub land_normal_epsilon: f32,
    pub contrast: f32,
    pub silver_tint: f32,
    pub gold_tint: [f32; 3],
    pub gold_gain: f32,
    pub bump_frequency: f32,
    pub bump_strength: f32,
    pub shadow_range: f32,
    pub _pad: f32,
}

impl GlobeUniforms {
    pub fn new(tuning: &Tuning, rotation: Mat3, resolution: Vec2, jitter: Vec2, blend: f32) -> Self {
        let pad = |v: glam::Vec3| [v.x, v.y, v.z, 0.0];
        let t = &tuning.trace;
        let s = &tuning.shading;
        Self {
            rotation: [pad(rotation.x_axis), pad(rotation.y_axis), pad(rotation.z_axis)],
            resolution: resolution.to_array(),
            jitter: jitter.to_array(),
            eye_distance: tuning.view.distance,
            focal_length: tuning.view.focal_length,
            blend,
            max_steps: t.max_steps,
            hit_epsilon: t.hit_epsilon,
            max_distance: t.max_distance,
            damping: t.damping,
            footprint_scale: t.footprint_scale,
            grid_normal_epsilon: s.grid_normal_epsilon,
            land_normal_epsilon: s.land_normal_epsilon,
            contrast: s.contrast,
            silver_tint: s.silver_tint,
            gold_tint: s.gold_tint,
            gold_gain: s.gold_gain,
            bump_frequency: s.bump_frequency,
            bump_strength: s.bump_strength,
            shadow_range: s.shadow_range,
            _pad: 0.0,
        }
    }
}

/// Card pass inputs
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct CardPassUniforms {
    pub view_proj: [[f32; 4]; 4],
    pub model: [[f32; 4]; 4],
    pub half_size: [f32; 2],
    pub tilt: f32,
    pub roll: f32,
}

impl CardPassUniforms {
    pub fn new(view_proj: Mat4, model: Mat4, card: [f32; 2], pass: CardUniforms) -> Self {
        Self {
            view_proj: view_proj.to_cols_array_2d(),
            model: model.to_cols_array_2d(),
            half_size: [card[0] * 0.5, card[1] * 0.5],
            tilt: pass.tilt,
            roll: pass.roll,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sizes_match_wgsl_layout() {
        assert_eq!(std::mem::size_of::<GlobeUniforms>(), 144);
        assert_eq!(std::mem::offset_of!(GlobeUniforms, gold_tint), 112);
        assert_eq!(std::mem::size_of::<CardPassUniforms>(), 144);
    }

    #[test]
    fn rotation_columns_are_padded() {
        let u = GlobeUniforms::new(
            &Tuning::default(),
            Mat3::IDENTITY,
            Vec2::new(400.0, 560.0),
            Vec2::ZERO,
            1.0,
        );
        assert_eq!(u.rotation[1], [0.0, 1.0, 0.0, 0.0]);
        assert_eq!(u.max_steps, 96);
    }
}
