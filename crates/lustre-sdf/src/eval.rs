//! CPU evaluation of scene trees
//!
//! Mirrors the WGSL emitted by [`crate::WgslGenerator`] operation for
//! operation, so the CPU tracer and tests see the same field as the GPU.

#![allow(clippy::match_same_arms)]

use glam::{Vec2, Vec3};
use std::f32::consts::{SQRT_2, TAU};

use crate::field::direction_to_uv;
use crate::node::{Axis, Material, Sample, SceneNode, Swizzle};

/// Anything that can be evaluated as a signed distance with a material
pub trait Sdf: Send + Sync {
    fn evaluate(&self, p: Vec3) -> Sample;

    /// Distance only
    fn distance(&self, p: Vec3) -> f32 {
        self.evaluate(p).distance
    }
}

impl Sdf for SceneNode {
    fn evaluate(&self, p: Vec3) -> Sample {
        eval(self, p)
    }
}

fn eval(node: &SceneNode, p: Vec3) -> Sample {
    match node {
        SceneNode::Sphere { radius, material } => Sample::new(p.length() - radius, *material),
        SceneNode::Cylinder { radius, material } => {
            Sample::new(p.truncate().length() - radius, *material)
        }
        SceneNode::FieldShell { field, material } => {
            let (u, v) = direction_to_uv(p);
            Sample::new(field.sample(u, v) * TAU * p.length(), *material)
        }

        SceneNode::Union { a, b } => union(eval(a, p), eval(b, p)),
        SceneNode::Subtract { a, b } => subtract(eval(a, p), eval(b, p)),
        SceneNode::ChamferSubtract { chamfer, a, b } => {
            chamfer_subtract(*chamfer, eval(a, p), eval(b, p))
        }
        SceneNode::Negate { inner } => {
            let s = eval(inner, p);
            Sample::new(-s.distance, s.material)
        }

        SceneNode::Revolve { inner } => eval(inner, revolve(p)),
        SceneNode::AngularRepeat { inner, period } => eval(inner, angular_repeat(p, *period)),
        SceneNode::Translate { inner, offset } => eval(inner, p - Vec3::from_array(*offset)),
        SceneNode::Swizzle { inner, axes } => eval(inner, swizzle(p, *axes)),
    }
}

/// Nearer sample wins, ties go to `b`
pub fn union(a: Sample, b: Sample) -> Sample {
    if a.distance < b.distance { a } else { b }
}

/// `max(-a, b)` carrying `a`'s material
pub fn subtract(a: Sample, b: Sample) -> Sample {
    Sample::new((-a.distance).max(b.distance), a.material)
}

/// Chamfered [`subtract`]: the crease is cut by a plane at 45 degrees
/// offset by `s`
pub fn chamfer_subtract(s: f32, a: Sample, b: Sample) -> Sample {
    let sharp = (-a.distance).max(b.distance);
    let bevel = (b.distance - a.distance + s) / SQRT_2;
    Sample::new(sharp.max(bevel), a.material)
}

pub fn revolve(p: Vec3) -> Vec3 {
    Vec3::new(p.truncate().length(), 0.0, p.z)
}

/// Fold the azimuth of `p` around z into `[-period/2, period/2)`
pub fn angular_repeat(p: Vec3, period: f32) -> Vec3 {
    let half = period * 0.5;
    let angle = p.y.atan2(p.x);
    let folded = (angle + half).rem_euclid(period) - half;
    let r = p.truncate().length();
    let xy = Vec2::from_angle(folded) * r;
    Vec3::new(xy.x, xy.y, p.z)
}

pub fn swizzle(p: Vec3, axes: Swizzle) -> Vec3 {
    let pick = |a: Axis| match a {
        Axis::X => p.x,
        Axis::Y => p.y,
        Axis::Z => p.z,
    };
    Vec3::new(pick(axes.0[0]), pick(axes.0[1]), pick(axes.0[2]))
}

/// Material at `p`, or `Background` when nothing is within `epsilon`
pub fn material_at(sdf: &impl Sdf, p: Vec3, epsilon: f32) -> Material {
    let s = sdf.evaluate(p);
    if s.distance < epsilon {
        s.material
    } else {
        Material::Background
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f32::consts::PI;

    fn sample_points() -> Vec<Vec3> {
        let mut points = Vec::new();
        for i in -4..=4 {
            for j in -4..=4 {
                points.push(Vec3::new(i as f32 * 0.7, j as f32 * 0.45, (i * j) as f32 * 0.1));
            }
        }
        points
    }

    #[test]
    fn sphere_distance() {
        let s = SceneNode::sphere(2.0, Material::Silver);
        assert_relative_eq!(s.distance(Vec3::new(5.0, 0.0, 0.0)), 3.0);
        assert_relative_eq!(s.distance(Vec3::ZERO), -2.0);
        assert_eq!(s.evaluate(Vec3::X).material, Material::Silver);
    }

    #[test]
    fn cylinder_ignores_z() {
        let c = SceneNode::cylinder(1.0, Material::Gold);
        assert_relative_eq!(c.distance(Vec3::new(3.0, 0.0, 100.0)), 2.0);
    }

    #[test]
    fn union_is_min_with_winner_material() {
        let a = SceneNode::sphere(1.0, Material::Silver);
        let b = SceneNode::sphere(0.5, Material::Gold).translate([2.0, 0.0, 0.0]);
        let u = SceneNode::union(a.clone(), b.clone());

        for p in sample_points() {
            let (sa, sb, su) = (a.evaluate(p), b.evaluate(p), u.evaluate(p));
            assert_relative_eq!(su.distance, sa.distance.min(sb.distance));
            let expected = if sa.distance < sb.distance {
                sa.material
            } else {
                sb.material
            };
            assert_eq!(su.material, expected);
        }
    }

    #[test]
    fn subtract_is_max_of_complement() {
        let a = SceneNode::sphere(1.0, Material::Gold);
        let b = SceneNode::cylinder(0.6, Material::Silver);
        let s = SceneNode::subtract(a.clone(), b.clone());

        for p in sample_points() {
            let expected = (-a.distance(p)).max(b.distance(p));
            let got = s.evaluate(p);
            assert_relative_eq!(got.distance, expected);
            assert_eq!(got.material, Material::Gold);
        }
    }

    #[test]
    fn chamfer_never_below_sharp_subtract() {
        let a = SceneNode::negate(SceneNode::sphere(1.0, Material::Gold));
        let b = SceneNode::sphere(1.2, Material::Gold).translate([0.5, 0.0, 0.0]);
        let sharp = SceneNode::subtract(a.clone(), b.clone());
        let chamfered = SceneNode::chamfer_subtract(0.15, a, b);

        for p in sample_points() {
            assert!(chamfered.distance(p) >= sharp.distance(p) - 1e-6);
        }
    }

    #[test]
    fn revolve_keeps_radius_and_height() {
        let p = revolve(Vec3::new(3.0, 4.0, -2.0));
        assert_relative_eq!(p.x, 5.0);
        assert_relative_eq!(p.y, 0.0);
        assert_relative_eq!(p.z, -2.0);
    }

    #[test]
    fn angular_repeat_folds_into_sector() {
        let period = TAU / 6.0;
        let theta = PI * 0.5 + 0.1;
        let p = Vec3::new(theta.cos(), theta.sin(), 1.0) * 2.0;
        let folded = angular_repeat(p, period);
        let angle = folded.y.atan2(folded.x);
        assert!(angle >= -period * 0.5 - 1e-5 && angle < period * 0.5 + 1e-5);
        assert_relative_eq!(folded.truncate().length(), p.truncate().length(), epsilon = 1e-5);
        assert_relative_eq!(folded.z, p.z);
        // Two whole sectors above the start of the first one
        assert_relative_eq!(angle, 0.1 - period * 0.5, epsilon = 1e-5);
    }

    #[test]
    fn swizzle_reorders() {
        let p = swizzle(Vec3::new(1.0, 2.0, 3.0), Swizzle::ZXY);
        assert_eq!(p, Vec3::new(3.0, 1.0, 2.0));
    }

    #[test]
    fn material_at_reports_background_off_surface() {
        let s = SceneNode::sphere(1.0, Material::Gold);
        assert_eq!(material_at(&s, Vec3::new(1.01, 0.0, 0.0), 0.03), Material::Gold);
        assert_eq!(material_at(&s, Vec3::new(3.0, 0.0, 0.0), 0.03), Material::Background);
    }
}
