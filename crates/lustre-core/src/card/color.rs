//! HSL conversion and the animated interference field

use glam::{Vec2, Vec4};

use crate::math::fmod;

/// One channel of HSL to RGB
fn hue(s: f32, t: f32, h: f32) -> f32 {
    let hs = fmod(h, 1.0) * 6.0;
    if hs < 1.0 {
        (t - s) * hs + s
    } else if hs < 3.0 {
        t
    } else if hs < 4.0 {
        (t - s) * (4.0 - hs) + s
    } else {
        s
    }
}

/// `(h, s, l, a)` to `(r, g, b, a)`; hue wraps
pub fn hsl_to_rgb(c: Vec4) -> Vec4 {
    let (h, s, l) = (c.x, c.y, c.z);
    if s <= 0.0001 {
        return Vec4::new(l, l, l, c.w);
    }
    let t = if l < 0.5 { s * l + l } else { -s * l + (s + l) };
    let lo = 2.0 * l - t;
    Vec4::new(
        hue(lo, t, h + 1.0 / 3.0),
        hue(lo, t, h),
        hue(lo, t, h - 1.0 / 3.0),
        c.w,
    )
}

/// `(r, g, b, a)` to `(h, s, l, a)` with hue in `[0, 1)`
#[allow(clippy::float_cmp)]
pub fn rgb_to_hsl(c: Vec4) -> Vec4 {
    let low = c.x.min(c.y).min(c.z);
    let high = c.x.max(c.y).max(c.z);
    let delta = high - low;
    let sum = high + low;

    let l = sum * 0.5;
    if delta <= 0.0 {
        return Vec4::new(0.0, 0.0, l, c.w);
    }

    let s = if l < 0.5 {
        delta / sum
    } else {
        delta / (2.0 - sum)
    };
    let h = if high == c.x {
        (c.y - c.z) / delta
    } else if high == c.y {
        (c.z - c.x) / delta + 2.0
    } else {
        (c.x - c.y) / delta + 4.0
    };
    Vec4::new(fmod(h / 6.0, 1.0), s, l, c.w)
}

/// Three drifting radial wave sources summed and averaged; roughly in
/// `[-0.5, 2]`, periodic in neither space nor time
pub fn animated_field(uv: Vec2, t: f32, scale: f32) -> f32 {
    let p = (uv - 0.5) * scale;

    let p1 = p + Vec2::new((-t / 143.634).sin(), (-t / 99.4324).cos()) * 50.0;
    let p2 = p + Vec2::new((t / 53.1532).cos(), (t / 61.4532).cos()) * 50.0;
    let p3 = p + Vec2::new((-t / 87.53218).sin(), (-t / 49.0).sin()) * 50.0;

    (1.0 + (p1.length() / 19.483).cos()
        + (p2.length() / 33.155).sin() * (p2.y / 15.73).cos()
        + (p3.length() / 27.193).cos() * (p3.x / 21.92).sin())
        / 2.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn primaries_to_hsl() {
        let red = rgb_to_hsl(Vec4::new(1.0, 0.0, 0.0, 1.0));
        assert_relative_eq!(red.x, 0.0);
        assert_relative_eq!(red.y, 1.0);
        assert_relative_eq!(red.z, 0.5);

        let green = rgb_to_hsl(Vec4::new(0.0, 1.0, 0.0, 1.0));
        assert_relative_eq!(green.x, 1.0 / 3.0, epsilon = 1e-6);

        let blue = rgb_to_hsl(Vec4::new(0.0, 0.0, 1.0, 0.5));
        assert_relative_eq!(blue.x, 2.0 / 3.0, epsilon = 1e-6);
        assert_relative_eq!(blue.w, 0.5);
    }

    #[test]
    fn grey_has_no_saturation() {
        let g = rgb_to_hsl(Vec4::new(0.3, 0.3, 0.3, 1.0));
        assert_relative_eq!(g.y, 0.0);
        let back = hsl_to_rgb(g);
        assert_relative_eq!(back.x, 0.3);
    }

    #[test]
    fn hsl_round_trip_on_a_palette() {
        for c in [
            Vec4::new(0.8, 0.6, 0.2, 1.0),
            Vec4::new(0.1, 0.4, 0.7, 1.0),
            Vec4::new(0.9, 0.1, 0.5, 0.7),
        ] {
            let back = hsl_to_rgb(rgb_to_hsl(c));
            assert_relative_eq!(back.x, c.x, epsilon = 1e-5);
            assert_relative_eq!(back.y, c.y, epsilon = 1e-5);
            assert_relative_eq!(back.z, c.z, epsilon = 1e-5);
            assert_relative_eq!(back.w, c.w);
        }
    }

    #[test]
    fn hue_wraps() {
        let a = hsl_to_rgb(Vec4::new(0.25, 0.8, 0.5, 1.0));
        let b = hsl_to_rgb(Vec4::new(1.25, 0.8, 0.5, 1.0));
        assert_relative_eq!(a.x, b.x, epsilon = 1e-5);
        assert_relative_eq!(a.y, b.y, epsilon = 1e-5);
    }

    #[test]
    fn field_is_bounded() {
        for i in 0..20 {
            let uv = Vec2::new(i as f32 / 19.0, 1.0 - i as f32 / 19.0);
            let f = animated_field(uv, i as f32 * 3.7, 250.0);
            assert!((-1.0..=2.0).contains(&f), "field {f}");
        }
    }
}
