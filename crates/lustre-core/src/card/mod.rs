//! Card editions: HSL helpers, the animated field and the three passes

pub mod color;
pub mod passes;

use image::{Rgba, RgbaImage};

pub use passes::{CardUniforms, Edition, shade_card};

/// Card width over height (poker card proportions)
pub const CARD_ASPECT: f32 = 2.5 / 3.5;

/// Card quad size in world units
pub const CARD_SIZE: [f32; 2] = [2.5, 3.5];

/// Built-in card art for hosts without an asset: an opaque gradient face
/// inside a translucent frame, transparent outside the rounded corners
pub fn sample_card(width: u32, height: u32) -> RgbaImage {
    let (w, h) = (width.max(1) as f32, height.max(1) as f32);
    let radius = w.min(h) * 0.08;
    let border = w.min(h) * 0.05;

    RgbaImage::from_fn(width, height, |x, y| {
        let (px, py) = (x as f32 + 0.5, y as f32 + 0.5);
        // Distance outside the rounded rect, negative inside
        let qx = (px - w * 0.5).abs() - (w * 0.5 - radius);
        let qy = (py - h * 0.5).abs() - (h * 0.5 - radius);
        let outside = qx.max(0.0).hypot(qy.max(0.0)) + qx.max(qy).min(0.0) - radius;

        if outside > 0.0 {
            return Rgba([0, 0, 0, 0]);
        }
        if outside > -border {
            return Rgba([235, 225, 200, 140]);
        }
        let t = py / h;
        let r = (40.0 + 60.0 * t) as u8;
        let g = (60.0 + 40.0 * (px / w)) as u8;
        let b = (120.0 + 90.0 * (1.0 - t)) as u8;
        Rgba([r, g, b, 255])
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_card_has_every_alpha_band() {
        let card = sample_card(100, 140);
        assert_eq!(card.get_pixel(0, 0)[3], 0);
        assert_eq!(card.get_pixel(50, 2)[3], 140);
        assert_eq!(card.get_pixel(50, 70)[3], 255);
    }
}
