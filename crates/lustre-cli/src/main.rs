//! Lustre CLI - Open the globe and card scenes, or render them to images

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use image::RgbaImage;
use lustre_core::card::{Edition, sample_card};
use lustre_core::cpu_render::{CpuCardStage, CpuGlobeStage};
use lustre_core::interact::{ContainerRect, GyroSupport, OrientationController};
use lustre_core::lifecycle::{SceneHandle, Stage, SurfaceSize};
use lustre_core::mask::{load_mask, save_field_png};
use lustre_core::tuning::Tuning;
use lustre_render::{SceneSource, WindowConfig};
use lustre_sdf::{DistanceField, GlobeScene, LandMask};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Default land mask resolution (equirectangular, 2:1)
const MASK_SIZE: (usize, usize) = (512, 256);

#[derive(Parser)]
#[command(name = "lustre")]
#[command(about = "Sphere-traced metal globe and interactive foil cards", long_about = None)]
#[command(version)]
struct Cli {
    /// Tuning file (JSON); missing fields keep their defaults
    #[arg(long, global = true)]
    tuning: Option<PathBuf>,

    /// Land mask image (equirectangular, bright = land)
    #[arg(long, global = true)]
    mask: Option<PathBuf>,

    /// Seed for the procedural land mask when no image is given
    #[arg(long, global = true, default_value = "1")]
    seed: u32,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Scene {
    Globe,
    Card,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Backend {
    /// GPU when an adapter is available, CPU otherwise
    Auto,
    Gpu,
    Cpu,
}

#[derive(Subcommand)]
enum Commands {
    /// Open the globe in a window
    Globe {
        /// Window width
        #[arg(long, default_value = "700")]
        width: u32,

        /// Window height
        #[arg(long, default_value = "700")]
        height: u32,
    },

    /// Open a card in a window
    Card {
        /// Card art (PNG); a built-in card is used when omitted
        #[arg(short, long)]
        texture: Option<PathBuf>,

        /// foil, holographic or polychrome
        #[arg(short, long, default_value = "holographic")]
        edition: Edition,

        /// Window width
        #[arg(long, default_value = "500")]
        width: u32,

        /// Window height
        #[arg(long, default_value = "700")]
        height: u32,
    },

    /// Render a scene to an image file (headless)
    Render {
        #[arg(value_enum)]
        scene: Scene,

        #[arg(short, long, value_enum, default_value = "auto")]
        backend: Backend,

        /// Card art (PNG), card scene only
        #[arg(short, long)]
        texture: Option<PathBuf>,

        /// Card edition, card scene only
        #[arg(short, long, default_value = "holographic")]
        edition: Edition,

        /// Frames to accumulate before saving
        #[arg(short, long, default_value = "16")]
        frames: u32,

        /// Output image file (.png)
        #[arg(short, long, default_value = "render.png")]
        output: PathBuf,

        /// Image width
        #[arg(long, default_value = "512")]
        width: u32,

        /// Image height
        #[arg(long, default_value = "512")]
        height: u32,
    },

    /// Write the coastline distance field as a grayscale image
    Field {
        #[arg(short, long, default_value = "field.png")]
        output: PathBuf,

        /// Distance (texture units) mapped to full white
        #[arg(long, default_value = "0.05")]
        range: f32,
    },

    /// Print the effective tuning as JSON
    Tuning,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let tuning = match &cli.tuning {
        Some(path) => Tuning::from_json_file(path)
            .with_context(|| format!("loading tuning from {}", path.display()))?,
        None => Tuning::default(),
    };

    match cli.command {
        Commands::Globe { width, height } => {
            let source = globe_source(cli.mask.as_deref(), cli.seed, &tuning)?;
            run_window(source, tuning, width, height)?;
        }
        Commands::Card {
            texture,
            edition,
            width,
            height,
        } => {
            let source = SceneSource::Card {
                texture: card_texture(texture.as_deref())?,
                edition,
            };
            run_window(source, tuning, width, height)?;
        }
        Commands::Render {
            scene,
            backend,
            texture,
            edition,
            frames,
            output,
            width,
            height,
        } => {
            let source = match scene {
                Scene::Globe => globe_source(cli.mask.as_deref(), cli.seed, &tuning)?,
                Scene::Card => SceneSource::Card {
                    texture: card_texture(texture.as_deref())?,
                    edition,
                },
            };
            let size = SurfaceSize::new(width, height);
            let img = render(&source, backend, tuning, size, frames)?;
            img.save(&output)?;
            println!("Saved to: {}", output.display());
        }
        Commands::Field { output, range } => {
            let mask = land_mask(cli.mask.as_deref(), cli.seed)?;
            let field = DistanceField::generate(&mask);
            save_field_png(&field, range, &output)?;
            println!("Saved to: {}", output.display());
        }
        Commands::Tuning => {
            println!("{}", tuning.to_json()?);
        }
    }

    Ok(())
}

fn land_mask(path: Option<&Path>, seed: u32) -> Result<LandMask> {
    match path {
        Some(path) => Ok(load_mask(path)?),
        None => {
            let (w, h) = MASK_SIZE;
            LandMask::procedural(seed, w, h).context("procedural mask")
        }
    }
}

fn globe_source(mask: Option<&Path>, seed: u32, tuning: &Tuning) -> Result<SceneSource> {
    let mask = land_mask(mask, seed)?;
    info!(land = mask.land_fraction(), "generating distance field");
    let field = Arc::new(DistanceField::generate(&mask));
    let globe = Arc::new(GlobeScene::build(tuning.globe, Arc::clone(&field)));
    Ok(SceneSource::Globe { globe, field })
}

fn card_texture(path: Option<&Path>) -> Result<RgbaImage> {
    match path {
        Some(path) => Ok(image::open(path)
            .with_context(|| format!("loading card art from {}", path.display()))?
            .to_rgba8()),
        None => Ok(sample_card(500, 700)),
    }
}

fn run_window(source: SceneSource, tuning: Tuning, width: u32, height: u32) -> Result<()> {
    println!("{}", lustre_render::controls_help());
    lustre_render::run_preview(WindowConfig { width, height }, source, tuning)
}

fn render(
    source: &SceneSource,
    backend: Backend,
    tuning: Tuning,
    size: SurfaceSize,
    frames: u32,
) -> Result<RgbaImage> {
    let use_gpu = match backend {
        Backend::Gpu => true,
        Backend::Cpu => false,
        Backend::Auto => {
            let found = lustre_render::adapter_available();
            if !found {
                info!("no GPU adapter, using the CPU renderer");
            }
            found
        }
    };

    println!(
        "Rendering {} frames at {}x{} on the {}...",
        frames,
        size.width,
        size.height,
        if use_gpu { "GPU" } else { "CPU" }
    );

    if use_gpu {
        return Ok(pollster::block_on(lustre_render::render_offscreen(
            source, tuning, size, frames,
        ))?);
    }

    match source {
        SceneSource::Globe { globe, .. } => {
            let stage = CpuGlobeStage::new(Arc::clone(globe), tuning);
            drive_cpu(stage, None, tuning, size, frames, |s| s.snapshot())
        }
        SceneSource::Card { texture, edition } => {
            let stage = CpuCardStage::new(texture.clone())?;
            drive_cpu(stage, Some(*edition), tuning, size, frames, |s| {
                s.snapshot().clone()
            })
        }
    }
}

/// Tick a CPU stage through a scene handle and grab the final image
fn drive_cpu<S: Stage>(
    stage: S,
    edition: Option<Edition>,
    tuning: Tuning,
    size: SurfaceSize,
    frames: u32,
    snapshot: impl Fn(&S) -> RgbaImage,
) -> Result<RgbaImage> {
    let rect = ContainerRect::new(0.0, 0.0, size.width as f32, size.height as f32);
    let controller = OrientationController::new(tuning.interaction, GyroSupport::Unavailable, rect, 0.0);
    let mut scene = SceneHandle::new(controller, size);
    if let Some(edition) = edition {
        scene.set_edition(edition);
    }
    pollster::block_on(scene.init(move |_| async move { Ok(stage) }))?;

    for i in 0..frames.max(1) {
        scene.tick(f64::from(i) / 60.0);
    }
    let img = scene
        .stage()
        .map(snapshot)
        .context("scene stopped before the last frame")?;
    scene.dispose();
    Ok(img)
}
