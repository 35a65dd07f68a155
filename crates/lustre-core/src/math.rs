//! Shader-style scalar helpers shared by the CPU paths

use glam::{Vec3, Vec4};

/// Hermite smoothstep. Works with `edge0 > edge1` (falling edge), and
/// degrades to a hard step when the edges coincide.
pub fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    let span = edge1 - edge0;
    if span == 0.0 {
        return if x < edge0 { 0.0 } else { 1.0 };
    }
    let t = ((x - edge0) / span).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

pub fn mix(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

pub fn mix3(a: Vec3, b: Vec3, t: f32) -> Vec3 {
    a + (b - a) * t
}

pub fn mix4(a: Vec4, b: Vec4, t: f32) -> Vec4 {
    a + (b - a) * t
}

/// GLSL `mod`: result takes the sign of `y`
pub fn fmod(x: f32, y: f32) -> f32 {
    x - y * (x / y).floor()
}

/// GLSL `reflect`
pub fn reflect(i: Vec3, n: Vec3) -> Vec3 {
    i - 2.0 * n.dot(i) * n
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn smoothstep_rising_and_falling() {
        assert_relative_eq!(smoothstep(0.0, 1.0, 0.5), 0.5);
        assert_relative_eq!(smoothstep(0.0, 1.0, -1.0), 0.0);
        assert_relative_eq!(smoothstep(0.0, 1.0, 2.0), 1.0);
        // Falling edge used for coverage
        assert_relative_eq!(smoothstep(1.0, 0.0, 0.0), 1.0);
        assert_relative_eq!(smoothstep(1.0, 0.0, 1.0), 0.0);
    }

    #[test]
    fn smoothstep_degenerate_edges() {
        assert_relative_eq!(smoothstep(0.0, 0.0, 0.5), 1.0);
        assert_relative_eq!(smoothstep(0.0, 0.0, -0.5), 0.0);
    }

    #[test]
    fn fmod_follows_divisor_sign() {
        assert_relative_eq!(fmod(-0.5, 2.0), 1.5);
        assert_relative_eq!(fmod(5.0, 2.0), 1.0);
    }
}
