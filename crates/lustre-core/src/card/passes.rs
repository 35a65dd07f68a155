//! CPU reference for the three card editions
//!
//! Each function matches its WGSL counterpart in `lustre-render` line for
//! line, so the shaders can be checked without a GPU.

// The phase scale is 3.14 in the shaders too, not PI
#![allow(clippy::approx_constant)]

use glam::{Vec2, Vec4};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::color::{animated_field, hsl_to_rgb, rgb_to_hsl};
use super::CARD_ASPECT;
use crate::Error;

/// Shading pass applied to the card texture
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Edition {
    Foil,
    #[default]
    Holographic,
    Polychrome,
}

impl Edition {
    pub const ALL: [Self; 3] = [Self::Foil, Self::Holographic, Self::Polychrome];

    /// Stable index, used to pick a pipeline
    pub fn index(self) -> usize {
        match self {
            Self::Foil => 0,
            Self::Holographic => 1,
            Self::Polychrome => 2,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Foil => "foil",
            Self::Holographic => "holographic",
            Self::Polychrome => "polychrome",
        }
    }
}

impl fmt::Display for Edition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Edition {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "foil" => Ok(Self::Foil),
            "holographic" | "holo" => Ok(Self::Holographic),
            "polychrome" | "poly" => Ok(Self::Polychrome),
            other => Err(Error::Config(format!("unknown edition '{other}'"))),
        }
    }
}

/// Per-frame pass inputs derived from the card rotation
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CardUniforms {
    pub tilt: f32,
    pub roll: f32,
}

impl CardUniforms {
    /// Scale the card rotation up so small tilts still move the effect
    pub fn from_rotation(rotation: Vec2) -> Self {
        Self {
            tilt: rotation.y * 4.0,
            roll: rotation.x * 60.0,
        }
    }
}

/// Run the pass for `edition` on one texel
pub fn shade_card(edition: Edition, tex: Vec4, uv: Vec2, u: CardUniforms) -> Vec4 {
    match edition {
        Edition::Foil => foil(tex, uv, u),
        Edition::Holographic => holographic(tex, uv, u),
        Edition::Polychrome => polychrome(tex, uv, u),
    }
}

/// Soften translucent regions so they do not read as a second layer
pub fn compress_alpha(mut c: Vec4) -> Vec4 {
    if c.w < 0.7 {
        c.w /= 3.0;
    }
    c
}

/// Interference rings, an angular shimmer and two scan bands, pushed into
/// the blue channel
pub fn foil(tex: Vec4, uv: Vec2, u: CardUniforms) -> Vec4 {
    let t = u.tilt;
    let mouse = u.roll;
    let adjusted = Vec2::new((uv.x - 0.5) * CARD_ASPECT, uv.y - 0.5);

    let len90 = (adjusted * 90.0).length();
    let len113 = (adjusted * 113.1121).length();
    let fac = (2.0 * (len90 + t * 2.0 + 3.0 * (1.0 + 0.8 * (len113 - t * 3.121).cos())).sin()
        - 1.0
        - (5.0 - len90).max(0.0))
    .clamp(0.0, 1.0);

    let rotater = Vec2::new((t * 0.1221).cos(), (t * 0.3512).sin());
    let denom = rotater.length() * adjusted.length();
    let angle = if denom > 0.0 { rotater.dot(adjusted) / denom } else { 0.0 };
    let fac2 = (5.0
        * (mouse * 0.3 + angle * 3.14 * (2.2 + 0.9 * (t * 1.65 + mouse * 0.2).sin())).cos()
        - 4.0
        - (2.0 - (adjusted * 20.0).length()).max(0.0))
    .clamp(0.0, 1.0);

    let fac3 = 0.3
        * (2.0 * (t * 5.0 + uv.x * 3.0 + 3.0 * (1.0 + 0.5 * (t * 7.0).cos())).sin() - 1.0)
            .clamp(-1.0, 1.0);
    let fac4 = 0.3
        * (2.0 * (t * 6.66 + uv.y * 3.8 + 3.0 * (1.0 + 0.5 * (t * 3.414).cos())).sin() - 1.0)
            .clamp(-1.0, 1.0);

    let peak = fac.max(fac2).max(fac3).max(fac4).max(0.0);
    let maxfac = (peak + 2.2 * (fac + fac2 + fac3 + fac4)).max(0.0);

    let d = 0.5 * 0.4;
    compress_alpha(Vec4::new(
        tex.x - d + d * maxfac * 0.3,
        tex.y - d + d * maxfac * 0.3,
        tex.z + d * maxfac * 1.5,
        tex.w,
    ))
}

/// Hue rotation by a large-scale field plus a cross-hatch, blended lightly
/// over the original
pub fn holographic(tex: Vec4, uv: Vec2, u: CardUniforms) -> Vec4 {
    let t = u.tilt;
    let mut hsl = rgb_to_hsl(tex);

    let field = animated_field(uv, u.roll * 7.221 + t, 250.0);
    let res = 0.5 + 0.5 * (t * 2.612 + (field - 0.5) * 3.14).cos();

    let grid = 0.79;
    let gx = uv.x * grid * 20.0;
    let gy = uv.y * grid * 45.0;
    let line1 = (7.0 * gx.cos().abs() - 6.0).max(0.0);
    let line2 = (7.0 * (gy + gx).cos() - 6.0).max(0.0);
    let line3 = (7.0 * (gy - gx).cos() - 6.0).max(0.0);
    let hatch = 0.5 * line1.max(line2).max(line3);

    hsl.x += res + hatch;
    hsl.y = hsl.y.max(0.35) * 1.3;
    hsl.z = hsl.z * 0.6 + 0.4;

    let delta = 0.22;
    let holo = hsl_to_rgb(hsl) * Vec4::new(0.9, 0.8, 1.2, tex.w);
    compress_alpha(tex * (1.0 - delta) + holo * delta)
}

/// Full hue rotation at a finer field scale, after desaturating flat areas
pub fn polychrome(tex: Vec4, uv: Vec2, u: CardUniforms) -> Vec4 {
    let (t, r) = (u.tilt, u.roll);

    let low = tex.x.min(tex.y).min(tex.z);
    let high = tex.x.max(tex.y).max(tex.z);
    let desat = 1.0 - (0.05 * (1.1 - (high - low))).max(0.0);

    let mut hsl = rgb_to_hsl(Vec4::new(tex.x * desat, tex.y * desat, tex.z, tex.w));

    let field = animated_field(uv, r * 2.221 + t, 50.0);
    let wave = 0.5 + 0.5 * (t * 2.612 + (field - 0.5) * 3.14).cos();

    hsl.x += wave + r * 0.04;
    hsl.y = (hsl.y + 0.5).min(0.6);

    let rgb = hsl_to_rgb(hsl);
    compress_alpha(Vec4::new(rgb.x, rgb.y, rgb.z, tex.w))
}
