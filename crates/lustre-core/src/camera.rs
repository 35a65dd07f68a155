//! Globe camera: a fixed pinhole orbiting the globe by rotating the world

use glam::{Mat3, Vec2, Vec3};
use serde::{Deserialize, Serialize};
use std::f64::consts::{PI, TAU};

/// Placement and auto-spin of the globe camera
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewConfig {
    /// Distance from the globe centre to the eye
    pub distance: f32,
    /// Image plane distance; smaller is wider
    pub focal_length: f32,
    /// Auto-rotation speed around the polar axis (rad/s)
    pub spin_rate: f32,
    /// Spin at `t = 0`
    pub initial_spin: f32,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            distance: 130.0,
            focal_length: 0.9,
            spin_rate: 0.15,
            initial_spin: PI as f32,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl ViewConfig {
    /// Euler angles for a frame: tilt about x from the controller, spin
    /// about z from the clock plus the controller's yaw
    pub fn angles(&self, time: f64, tilt: Vec2) -> Vec3 {
        let spin = (f64::from(self.initial_spin) + time * f64::from(self.spin_rate)).rem_euclid(TAU);
        Vec3::new(tilt.x, 0.0, spin as f32 + tilt.y)
    }

    /// Primary ray through a centred screen coordinate
    /// (`x` in `[-aspect/2, aspect/2]`, `y` in `[-1/2, 1/2]`, y up)
    pub fn ray(&self, screen: Vec2, rotation: Mat3) -> Ray {
        let origin = rotation * Vec3::new(0.0, -self.distance, 0.0);
        let direction = rotation * Vec3::new(screen.x, self.focal_length, screen.y).normalize();
        Ray { origin, direction }
    }
}

/// Centred screen coordinate of a pixel plus sub-pixel jitter (in uv units).
/// Pixel rows run top to bottom; the returned `y` points up.
pub fn screen_coord(pixel: Vec2, width: u32, height: u32, jitter: Vec2) -> Vec2 {
    let (w, h) = (width as f32, height as f32);
    let uv = Vec2::new((pixel.x + 0.5) / w, 1.0 - (pixel.y + 0.5) / h) + jitter;
    Vec2::new((uv.x - 0.5) * (w / h), uv.y - 0.5)
}

/// Rotate `v` about x, then y, then z (row-vector convention, so each
/// step is the transpose of the usual right-handed rotation)
pub fn apply_rotation(v: Vec3, angles: Vec3) -> Vec3 {
    let (sx, cx) = angles.x.sin_cos();
    let (sy, cy) = angles.y.sin_cos();
    let (sz, cz) = angles.z.sin_cos();

    let y1 = v.y * cx + v.z * sx;
    let z1 = -v.y * sx + v.z * cx;

    let x2 = v.x * cy - z1 * sy;
    let z2 = v.x * sy + z1 * cy;

    let x3 = x2 * cz + y1 * sz;
    let y3 = -x2 * sz + y1 * cz;

    Vec3::new(x3, y3, z2)
}

/// [`apply_rotation`] as a matrix, for upload as a uniform
pub fn rotation_matrix(angles: Vec3) -> Mat3 {
    Mat3::from_cols(
        apply_rotation(Vec3::X, angles),
        apply_rotation(Vec3::Y, angles),
        apply_rotation(Vec3::Z, angles),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn matrix_matches_direct_rotation() {
        let angles = Vec3::new(0.3, -0.2, 2.5);
        let m = rotation_matrix(angles);
        let v = Vec3::new(1.0, -2.0, 0.5);
        let a = m * v;
        let b = apply_rotation(v, angles);
        assert_relative_eq!(a.x, b.x, epsilon = 1e-5);
        assert_relative_eq!(a.y, b.y, epsilon = 1e-5);
        assert_relative_eq!(a.z, b.z, epsilon = 1e-5);
    }

    #[test]
    fn rotation_preserves_length() {
        let v = Vec3::new(0.0, -130.0, 0.0);
        let r = apply_rotation(v, Vec3::new(0.1, 0.0, 1.3));
        assert_relative_eq!(r.length(), 130.0, epsilon = 1e-3);
    }

    #[test]
    fn centre_ray_points_at_origin() {
        let view = ViewConfig::default();
        let rot = rotation_matrix(view.angles(12.0, Vec2::new(0.1, -0.05)));
        let ray = view.ray(Vec2::ZERO, rot);
        let to_centre = (-ray.origin).normalize();
        assert_relative_eq!(ray.direction.dot(to_centre), 1.0, epsilon = 1e-5);
    }

    #[test]
    fn screen_coord_is_centred_and_flipped() {
        let c = screen_coord(Vec2::new(0.0, 0.0), 100, 50, Vec2::ZERO);
        assert!(c.x < 0.0 && c.y > 0.0);
        assert_relative_eq!(c.y, 0.5 - 0.5 / 50.0, epsilon = 1e-6);

        let mid = screen_coord(Vec2::new(49.5, 24.5), 100, 50, Vec2::ZERO);
        assert_relative_eq!(mid.x, 0.0, epsilon = 1e-6);
        assert_relative_eq!(mid.y, 0.0, epsilon = 1e-6);
    }
}
