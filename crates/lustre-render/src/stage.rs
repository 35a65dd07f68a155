//! Scene selection and headless rendering
//!
//! [`GpuStage`] lets one [`SceneHandle`] type drive either scene, so the
//! window host and the offscreen renderer share a single code path.

use std::sync::Arc;

use image::RgbaImage;
use lustre_core::card::Edition;
use lustre_core::interact::{ContainerRect, GyroSupport, OrientationController};
use lustre_core::lifecycle::{Frame, SceneHandle, Stage, SurfaceSize};
use lustre_core::tuning::Tuning;
use lustre_core::{Error, Result};
use lustre_sdf::{DistanceField, GlobeScene};
use tracing::info;

use crate::card::CardStage;
use crate::globe::GlobeStage;
use crate::gpu::{Gpu, Output, init_headless};

/// What to mount
#[derive(Debug, Clone)]
pub enum SceneSource {
    Globe {
        globe: Arc<GlobeScene>,
        field: Arc<DistanceField>,
    },
    Card {
        texture: RgbaImage,
        edition: Edition,
    },
}

impl SceneSource {
    pub fn title(&self) -> String {
        match self {
            Self::Globe { .. } => "Lustre Globe".to_string(),
            Self::Card { edition, .. } => format!("Lustre Card ({edition})"),
        }
    }

    /// Build the matching stage on an acquired device
    pub fn build(&self, gpu: Gpu, output: Output, tuning: Tuning) -> Result<GpuStage> {
        Ok(match self {
            Self::Globe { globe, field } => {
                GpuStage::Globe(GlobeStage::new(gpu, output, globe, field, tuning))
            }
            Self::Card { texture, edition } => {
                GpuStage::Card(CardStage::new(gpu, output, texture, *edition)?)
            }
        })
    }
}

/// Either GPU stage
pub enum GpuStage {
    Globe(GlobeStage),
    Card(CardStage),
}

impl GpuStage {
    pub fn read_back(&self) -> Result<Option<RgbaImage>> {
        let image = match self {
            Self::Globe(stage) => stage.read_back()?,
            Self::Card(stage) => stage.read_back()?,
        };
        Ok(image)
    }
}

impl Stage for GpuStage {
    fn resize(&mut self, size: SurfaceSize) {
        match self {
            Self::Globe(stage) => stage.resize(size),
            Self::Card(stage) => stage.resize(size),
        }
    }

    fn render(&mut self, frame: &Frame) -> Result<()> {
        match self {
            Self::Globe(stage) => stage.render(frame),
            Self::Card(stage) => stage.render(frame),
        }
    }

    fn set_edition(&mut self, edition: Edition) {
        if let Self::Card(stage) = self {
            stage.set_edition(edition);
        }
    }

    fn release(self) {
        match self {
            Self::Globe(stage) => stage.release(),
            Self::Card(stage) => stage.release(),
        }
    }
}

/// Render `frames` ticks at 60 fps offscreen and read back the last one
pub async fn render_offscreen(
    source: &SceneSource,
    tuning: Tuning,
    size: SurfaceSize,
    frames: u32,
) -> Result<RgbaImage> {
    if size.is_empty() {
        return Err(Error::Config("output size must be non-zero".into()));
    }

    let rect = ContainerRect::new(0.0, 0.0, size.width as f32, size.height as f32);
    let controller = OrientationController::new(tuning.interaction, GyroSupport::Unavailable, rect, 0.0);
    let mut handle = SceneHandle::new(controller, size);
    if let SceneSource::Card { edition, .. } = source {
        handle.set_edition(*edition);
    }

    handle
        .init(move |_| async move {
            let gpu = init_headless().await?;
            let output = Output::offscreen(&gpu.device, size.width, size.height);
            source.build(gpu, output, tuning)
        })
        .await?;

    for i in 0..frames.max(1) {
        handle.tick(f64::from(i) / 60.0);
    }
    let image = handle
        .stage()
        .ok_or_else(|| Error::Backend("scene stopped before read back".into()))?
        .read_back()?
        .ok_or_else(|| Error::Backend("offscreen output expected".into()))?;

    info!(frames = handle.frames(), "offscreen render complete");
    handle.dispose();
    Ok(image)
}
