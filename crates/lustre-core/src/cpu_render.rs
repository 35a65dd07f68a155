//! CPU fallback stages
//!
//! Same tracer, shading and card passes as the GPU path, evaluated per
//! pixel with rayon. Slow, but needs no adapter; used when no adapter is
//! available and for offline renders.

use glam::{Vec2, Vec4};
use image::{Rgba, RgbaImage};
use lustre_sdf::GlobeScene;
use rayon::prelude::*;
use std::sync::Arc;
use tracing::debug;

use crate::camera::{rotation_matrix, screen_coord};
use crate::card::{CardUniforms, Edition, shade_card};
use crate::lifecycle::{Frame, Stage, SurfaceSize};
use crate::shade::shade_hit;
use crate::taa::{Jitter, RenderTargetPair, blend};
use crate::trace::trace;
use crate::tuning::Tuning;
use crate::{Error, Result};

/// Globe renderer with temporal accumulation
pub struct CpuGlobeStage {
    globe: Arc<GlobeScene>,
    tuning: Tuning,
    size: SurfaceSize,
    targets: RenderTargetPair<Vec<Vec4>>,
    jitter: Jitter,
}

impl CpuGlobeStage {
    pub fn new(globe: Arc<GlobeScene>, tuning: Tuning) -> Self {
        Self {
            globe,
            jitter: Jitter::new(tuning.taa.seed),
            tuning,
            size: SurfaceSize::default(),
            targets: RenderTargetPair::with(Vec::new),
        }
    }

    pub fn size(&self) -> SurfaceSize {
        self.size
    }

    /// Frames accumulated since the last resize
    pub fn accumulated(&self) -> u64 {
        self.targets.flips()
    }

    /// Most recently completed frame, straight alpha, clamped to 8 bits
    pub fn snapshot(&self) -> RgbaImage {
        // After a flip the finished frame sits in the history slot
        to_image(self.targets.history(), self.size)
    }

    /// Trace and shade one pixel
    fn shade_pixel(&self, pixel: Vec2, jitter: Vec2, rotation: glam::Mat3) -> Vec4 {
        let t = &self.tuning;
        let screen = screen_coord(pixel, self.size.width, self.size.height, jitter);
        let ray = t.view.ray(screen, rotation);
        let hit = trace(self.globe.as_ref(), ray.origin, ray.direction, &t.trace);
        if hit.is_hit() {
            shade_hit(&self.globe, &hit, ray.direction, &t.shading, &t.trace)
        } else {
            Vec4::ZERO
        }
    }
}

impl Stage for CpuGlobeStage {
    fn resize(&mut self, size: SurfaceSize) {
        let len = size.width as usize * size.height as usize;
        self.size = size;
        self.targets.reallocate(|_| vec![Vec4::ZERO; len]);
        debug!(width = size.width, height = size.height, "cpu targets reallocated");
    }

    fn render(&mut self, frame: &Frame) -> Result<()> {
        if frame.size != self.size {
            self.resize(frame.size);
        }
        if self.size.is_empty() {
            return Ok(());
        }
        let width = self.size.width as usize;
        let angles = self.tuning.view.angles(frame.time, frame.orientation.tilt);
        let rotation = rotation_matrix(angles);
        let jitter = self.jitter.next(self.size.width, self.size.height);
        // The first frame after a resize has no history to blend with
        let weight = if self.targets.flips() == 0 {
            1.0
        } else {
            self.tuning.taa.blend
        };

        let mut targets = std::mem::replace(&mut self.targets, RenderTargetPair::with(Vec::new));
        {
            let (write, history) = targets.split_mut();
            let this = &*self;
            write
                .par_chunks_mut(width)
                .zip(history.par_chunks(width))
                .enumerate()
                .for_each(|(y, (row, prev))| {
                    for (x, (out, old)) in row.iter_mut().zip(prev).enumerate() {
                        let pixel = Vec2::new(x as f32, y as f32);
                        let current = this.shade_pixel(pixel, jitter, rotation);
                        *out = blend(*old, current, weight);
                    }
                });
        }
        targets.flip();
        self.targets = targets;
        Ok(())
    }

    fn release(self) {
        debug!(frames = self.targets.flips(), "cpu globe stage released");
    }
}

/// Flat card preview: each texel run through the active edition pass
pub struct CpuCardStage {
    texture: RgbaImage,
    edition: Edition,
    size: SurfaceSize,
    output: RgbaImage,
}

impl CpuCardStage {
    pub fn new(texture: RgbaImage) -> Result<Self> {
        let (w, h) = texture.dimensions();
        if w == 0 || h == 0 {
            return Err(Error::Texture(format!("card texture is {w}x{h}")));
        }
        Ok(Self {
            texture,
            edition: Edition::default(),
            size: SurfaceSize::default(),
            output: RgbaImage::new(0, 0),
        })
    }

    pub fn edition(&self) -> Edition {
        self.edition
    }

    pub fn snapshot(&self) -> &RgbaImage {
        &self.output
    }

    fn texel(&self, uv: Vec2) -> Vec4 {
        let (w, h) = self.texture.dimensions();
        let x = ((uv.x * w as f32) as u32).min(w - 1);
        let y = ((uv.y * h as f32) as u32).min(h - 1);
        let Rgba([r, g, b, a]) = *self.texture.get_pixel(x, y);
        Vec4::new(r.into(), g.into(), b.into(), a.into()) / 255.0
    }
}

impl Stage for CpuCardStage {
    fn resize(&mut self, size: SurfaceSize) {
        self.size = size;
        self.output = RgbaImage::new(size.width, size.height);
    }

    fn render(&mut self, frame: &Frame) -> Result<()> {
        if frame.size != self.size {
            self.resize(frame.size);
        }
        let uniforms = CardUniforms::from_rotation(frame.orientation.rotation());
        let (w, h) = (self.size.width as f32, self.size.height as f32);
        let edition = self.edition;

        let mut output = std::mem::take(&mut self.output);
        let this = &*self;
        output
            .par_enumerate_pixels_mut()
            .for_each(|(x, y, px)| {
                let uv = Vec2::new((x as f32 + 0.5) / w, (y as f32 + 0.5) / h);
                let color = shade_card(edition, this.texel(uv), uv, uniforms);
                *px = to_rgba8(color);
            });
        self.output = output;
        Ok(())
    }

    fn set_edition(&mut self, edition: Edition) {
        self.edition = edition;
    }

    fn release(self) {
        debug!(edition = %self.edition, "cpu card stage released");
    }
}

fn to_rgba8(c: Vec4) -> Rgba<u8> {
    let q = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
    Rgba([q(c.x), q(c.y), q(c.z), q(c.w)])
}

fn to_image(pixels: &[Vec4], size: SurfaceSize) -> RgbaImage {
    let mut image = RgbaImage::new(size.width, size.height);
    for (px, c) in image.pixels_mut().zip(pixels) {
        *px = to_rgba8(*c);
    }
    image
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interact::Orientation;
    use lustre_sdf::{DistanceField, GlobeGeometry, LandMask};

    fn globe() -> Arc<GlobeScene> {
        // All land, so every ray towards the globe hits the shell
        let mask = LandMask::from_fn(32, 16, |_, _| true).unwrap();
        let field = Arc::new(DistanceField::generate(&mask));
        Arc::new(GlobeScene::build(GlobeGeometry::default(), field))
    }

    fn frame(time: f64, w: u32, h: u32) -> Frame {
        Frame {
            time,
            size: SurfaceSize::new(w, h),
            orientation: Orientation::default(),
        }
    }

    #[test]
    fn globe_covers_centre_not_corner() {
        let mut stage = CpuGlobeStage::new(globe(), Tuning::default());
        stage.render(&frame(0.0, 24, 24)).unwrap();
        let img = stage.snapshot();
        assert_eq!(img.dimensions(), (24, 24));
        assert!(img.get_pixel(12, 12)[3] > 200);
        assert_eq!(img.get_pixel(0, 0)[3], 0);
    }

    #[test]
    fn resize_restarts_accumulation() {
        let mut stage = CpuGlobeStage::new(globe(), Tuning::default());
        stage.render(&frame(0.0, 8, 8)).unwrap();
        stage.render(&frame(0.016, 8, 8)).unwrap();
        assert_eq!(stage.accumulated(), 2);

        stage.resize(SurfaceSize::new(6, 4));
        assert_eq!(stage.accumulated(), 0);
        stage.render(&frame(0.032, 6, 4)).unwrap();
        assert_eq!(stage.snapshot().dimensions(), (6, 4));
    }

    #[test]
    fn empty_card_texture_is_rejected() {
        assert!(matches!(
            CpuCardStage::new(RgbaImage::new(0, 3)),
            Err(Error::Texture(_))
        ));
    }

    #[test]
    fn card_passes_keep_opaque_texels_opaque() {
        let tex = RgbaImage::from_pixel(4, 4, Rgba([200, 120, 40, 255]));
        for edition in Edition::ALL {
            let mut stage = CpuCardStage::new(tex.clone()).unwrap();
            stage.set_edition(edition);
            stage.render(&frame(0.0, 5, 7)).unwrap();
            assert_eq!(stage.snapshot().dimensions(), (5, 7));
            assert!(stage.snapshot().pixels().all(|p| p[3] == 255), "{edition}");
        }
    }
}
