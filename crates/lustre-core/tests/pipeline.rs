//! Integration tests for field generation, tracing, shading and accumulation

// Tests are allowed to use expect/unwrap for cleaner error messages
#![allow(clippy::expect_used)]
#![allow(clippy::unwrap_used)]

use approx::assert_relative_eq;
use lustre_core::camera::{rotation_matrix, screen_coord};
use lustre_core::prelude::*;
use lustre_core::shade::shade_hit;
use lustre_sdf::SceneNode;
use lustre_sdf::eval::{subtract, union};
use std::sync::Arc;

fn continent_globe() -> Arc<GlobeScene> {
    // One continent on the hemisphere facing the camera at t = 0, sea elsewhere
    let mask = LandMask::from_fn(128, 64, |x, y| (16..48).contains(&x) && (16..48).contains(&y))
        .unwrap();
    let field = Arc::new(DistanceField::generate(&mask));
    Arc::new(GlobeScene::build(GlobeGeometry::default(), field))
}

#[test]
fn union_and_subtract_identities() {
    let a = SceneNode::sphere(2.0, Material::Gold);
    let b = SceneNode::sphere(1.0, Material::Silver).translate([4.0, 0.0, 0.0]);
    for p in [Vec3::ZERO, Vec3::new(4.0, 0.0, 0.0), Vec3::new(1.5, 2.0, -0.5)] {
        let (sa, sb) = (a.evaluate(p), b.evaluate(p));
        assert_relative_eq!(union(sa, sb).distance, sa.distance.min(sb.distance));
        assert_relative_eq!(subtract(sa, sb).distance, (-sa.distance).max(sb.distance));
        assert_eq!(subtract(sa, sb).material, Material::Gold);
    }
}

#[test]
fn field_is_negative_on_land_and_positive_at_sea() {
    let mask = LandMask::from_fn(64, 32, |x, _| x < 32).unwrap();
    let field = DistanceField::generate(&mask);
    for y in 0..32 {
        assert!(field.get(8, y) < 0.0);
        assert!(field.get(48, y) > 0.0);
    }
    // Deep inside is further from the coast than next to it
    assert!(field.get(16, 16) < field.get(30, 16));
}

fn land_globe() -> Arc<GlobeScene> {
    let mask = LandMask::from_fn(64, 32, |_, _| true).unwrap();
    let field = Arc::new(DistanceField::generate(&mask));
    Arc::new(GlobeScene::build(GlobeGeometry::default(), field))
}

#[test]
fn central_ray_converges_on_the_globe() {
    let globe = land_globe();
    let tuning = Tuning::default();
    let rotation = rotation_matrix(tuning.view.angles(0.0, Vec2::ZERO));
    let ray = tuning.view.ray(Vec2::ZERO, rotation);

    let hit = trace(globe.as_ref(), ray.origin, ray.direction, &tuning.trace);
    assert!(hit.is_hit(), "{hit:?}");
    assert_eq!(hit.material, Some(Material::Gold));
    assert!(hit.last_distance < tuning.trace.hit_epsilon);
    assert_relative_eq!(hit.position.length(), tuning.globe.radius, epsilon = 0.05);

    let color = shade_hit(&globe, &hit, ray.direction, &tuning.shading, &tuning.trace);
    assert!(color.w > 0.0);
    assert!(color.truncate().is_finite());
}

#[test]
fn damped_march_reaches_the_shell_in_few_steps() {
    let tuning = Tuning::default();
    let (eye, radius) = (tuning.view.distance, tuning.globe.radius);

    // Each step covers 3/4 of the remaining gap, so 80 units shrink below
    // the hit epsilon after a handful of evaluations
    let globe = land_globe();
    let hit = trace(globe.as_ref(), Vec3::new(eye, 0.0, 0.0), Vec3::NEG_X, &tuning.trace);
    assert_eq!(hit.material, Some(Material::Gold));
    assert!(hit.steps <= 8, "took {} steps", hit.steps);
    assert_relative_eq!(hit.traveled, eye - radius, epsilon = 0.05);
}

#[test]
fn rays_outside_the_globe_miss() {
    let globe = continent_globe();
    let tuning = Tuning::default();
    let rotation = rotation_matrix(tuning.view.angles(0.0, Vec2::ZERO));

    let corner = screen_coord(Vec2::ZERO, 400, 560, Vec2::ZERO);
    let ray = tuning.view.ray(corner, rotation);
    let hit = trace(globe.as_ref(), ray.origin, ray.direction, &tuning.trace);
    assert!(!hit.is_hit());
    assert!(hit.traveled > tuning.trace.max_distance || hit.steps == tuning.trace.max_steps);
}

#[test]
fn render_target_roles_follow_frame_parity() {
    let mut pair = RenderTargetPair::new(0u32, 0u32);
    for frame in 0..16u32 {
        assert_eq!(pair.write_index(), (frame % 2) as usize);
        *pair.write_mut() = frame;
        pair.flip();
        // What was just written is now the history
        assert_eq!(*pair.history(), frame);
    }
}

#[test]
fn cpu_globe_accumulates_and_stays_finite() {
    let mut stage = CpuGlobeStage::new(continent_globe(), Tuning::default());
    let size = SurfaceSize::new(20, 28);
    stage.resize(size);
    for i in 0..4 {
        let frame = Frame {
            time: f64::from(i) / 60.0,
            size,
            orientation: Orientation::default(),
        };
        stage.render(&frame).unwrap();
    }
    assert_eq!(stage.accumulated(), 4);

    let image = stage.snapshot();
    assert_eq!(image.dimensions(), (20, 28));
    // Corners are background
    assert_eq!(image.get_pixel(0, 0)[3], 0);
    assert_eq!(image.get_pixel(19, 27)[3], 0);
}
