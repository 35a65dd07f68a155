//! Land mask import and distance-field export

use image::{DynamicImage, GrayImage, Luma};
use lustre_sdf::{DistanceField, LandMask};
use std::path::Path;
use tracing::info;

use crate::{Error, Result};

/// Build a mask from an equirectangular image: luminance at or above half
/// is land
pub fn mask_from_image(image: &DynamicImage) -> Result<LandMask> {
    let gray = image.to_luma8();
    let (w, h) = gray.dimensions();
    let cells = gray.pixels().map(|Luma([v])| *v >= 128).collect();
    LandMask::from_cells(w as usize, h as usize, cells)
        .ok_or_else(|| Error::Texture(format!("land mask image is {w}x{h}")))
}

pub fn load_mask(path: impl AsRef<Path>) -> Result<LandMask> {
    let path = path.as_ref();
    let image = image::open(path)?;
    let mask = mask_from_image(&image)?;
    info!(
        path = %path.display(),
        width = mask.width(),
        height = mask.height(),
        land = mask.land_fraction(),
        "loaded land mask"
    );
    Ok(mask)
}

/// Visualise a field: mid grey on the coastline, brighter over sea, darker
/// over land. `range` is the texture-space distance mapped to full white.
pub fn field_to_image(field: &DistanceField, range: f32) -> GrayImage {
    let range = if range > 0.0 { range } else { 1.0 };
    GrayImage::from_fn(field.width() as u32, field.height() as u32, |x, y| {
        let v = field.get(x as usize, y as usize) / range;
        let level = (0.5 + 0.5 * v.clamp(-1.0, 1.0)) * 255.0;
        Luma([level.round() as u8])
    })
}

pub fn save_field_png(field: &DistanceField, range: f32, path: impl AsRef<Path>) -> Result<()> {
    field_to_image(field, range).save(path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_threshold_builds_mask() {
        let img = GrayImage::from_fn(8, 4, |x, _| Luma([if x < 4 { 255 } else { 0 }]));
        let mask = mask_from_image(&DynamicImage::ImageLuma8(img)).unwrap();
        assert_eq!((mask.width(), mask.height()), (8, 4));
        assert!(mask.is_land(0, 0));
        assert!(!mask.is_land(7, 3));
    }

    #[test]
    fn empty_image_is_rejected() {
        let img = DynamicImage::new_luma8(0, 0);
        assert!(matches!(mask_from_image(&img), Err(Error::Texture(_))));
    }

    #[test]
    fn field_image_brightens_over_sea() {
        let mask = LandMask::from_fn(32, 16, |x, _| x < 16).unwrap();
        let field = DistanceField::generate(&mask);
        let img = field_to_image(&field, 0.1);
        let land = img.get_pixel(8, 8).0[0];
        let sea = img.get_pixel(24, 8).0[0];
        assert!(land < 128 && sea > 128);
    }
}
