//! Device acquisition, adapter check and output targets

use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::{RenderError, RenderResult};

/// Shared device and queue
#[derive(Debug, Clone)]
pub struct Gpu {
    pub device: Arc<wgpu::Device>,
    pub queue: Arc<wgpu::Queue>,
}

fn instance() -> wgpu::Instance {
    wgpu::Instance::new(&wgpu::InstanceDescriptor {
        backends: wgpu::Backends::all(),
        ..Default::default()
    })
}

async fn request_device(adapter: &wgpu::Adapter) -> RenderResult<Gpu> {
    let info = adapter.get_info();
    info!(name = %info.name, backend = ?info.backend, "using adapter");

    let (device, queue) = adapter
        .request_device(&wgpu::DeviceDescriptor {
            label: Some("Lustre Device"),
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            memory_hints: wgpu::MemoryHints::default(),
            trace: wgpu::Trace::Off,
        })
        .await?;

    Ok(Gpu {
        device: Arc::new(device),
        queue: Arc::new(queue),
    })
}

/// Whether any adapter is available. Hosts call this before mounting a
/// scene; without one they fall back or skip the scene.
pub fn adapter_available() -> bool {
    let found = pollster::block_on(instance().request_adapter(&wgpu::RequestAdapterOptions {
        power_preference: wgpu::PowerPreference::HighPerformance,
        compatible_surface: None,
        force_fallback_adapter: false,
    }))
    .is_ok();
    debug!(found, "adapter check");
    found
}

/// Logs a failed final wait before a stage drops its resources; true when
/// the queue drained
pub(crate) fn finish_release(result: Result<wgpu::PollStatus, wgpu::PollError>, stage: &str) -> bool {
    match result {
        Ok(_) => true,
        Err(e) => {
            warn!(error = %e, stage, "device poll failed during release");
            false
        }
    }
}

/// Initialize WGPU for headless rendering (no window)
pub async fn init_headless() -> RenderResult<Gpu> {
    let adapter = instance()
        .request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: None,
            force_fallback_adapter: false,
        })
        .await
        .map_err(|e| RenderError::NoAdapter(e.to_string()))?;

    request_device(&adapter).await
}

/// Initialize WGPU for a window surface; returns the preferred sRGB format
pub async fn init_with_surface(
    instance: &wgpu::Instance,
    surface: &wgpu::Surface<'_>,
) -> RenderResult<(Gpu, wgpu::TextureFormat)> {
    let adapter = instance
        .request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: Some(surface),
            force_fallback_adapter: false,
        })
        .await
        .map_err(|e| RenderError::NoAdapter(e.to_string()))?;

    let gpu = request_device(&adapter).await?;

    let caps = surface.get_capabilities(&adapter);
    let format = caps
        .formats
        .iter()
        .copied()
        .find(|f| f.is_srgb())
        .or_else(|| caps.formats.first().copied())
        .ok_or_else(|| RenderError::NoAdapter("surface reports no formats".into()))?;

    Ok((gpu, format))
}

/// Where a stage's final pass lands
pub enum Output {
    /// A window surface, presented every frame
    Surface {
        surface: wgpu::Surface<'static>,
        config: wgpu::SurfaceConfiguration,
    },
    /// An RGBA8 texture that can be read back
    Offscreen {
        texture: wgpu::Texture,
        format: wgpu::TextureFormat,
    },
}

/// One acquired output texture
pub struct OutputFrame {
    pub view: wgpu::TextureView,
    surface_texture: Option<wgpu::SurfaceTexture>,
}

impl OutputFrame {
    pub fn present(self) {
        if let Some(texture) = self.surface_texture {
            texture.present();
        }
    }
}

impl Output {
    pub fn surface(
        device: &wgpu::Device,
        surface: wgpu::Surface<'static>,
        format: wgpu::TextureFormat,
        width: u32,
        height: u32,
    ) -> Self {
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: width.max(1),
            height: height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode: wgpu::CompositeAlphaMode::Auto,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(device, &config);
        Self::Surface { surface, config }
    }

    pub fn offscreen(device: &wgpu::Device, width: u32, height: u32) -> Self {
        let format = wgpu::TextureFormat::Rgba8UnormSrgb;
        Self::Offscreen {
            texture: offscreen_texture(device, format, width, height),
            format,
        }
    }

    pub fn format(&self) -> wgpu::TextureFormat {
        match self {
            Self::Surface { config, .. } => config.format,
            Self::Offscreen { format, .. } => *format,
        }
    }

    /// Match a new drawable size. Callers never pass an empty size.
    pub fn resize(&mut self, device: &wgpu::Device, width: u32, height: u32) {
        match self {
            Self::Surface { surface, config } => {
                config.width = width;
                config.height = height;
                surface.configure(device, config);
            }
            Self::Offscreen { texture, format } => {
                *texture = offscreen_texture(device, *format, width, height);
            }
        }
    }

    /// Next texture to draw into. `Ok(None)` means the surface was stale
    /// and has been reconfigured; skip this frame.
    pub fn acquire(&self, device: &wgpu::Device) -> RenderResult<Option<OutputFrame>> {
        match self {
            Self::Surface { surface, config } => match surface.get_current_texture() {
                Ok(texture) => Ok(Some(OutputFrame {
                    view: texture
                        .texture
                        .create_view(&wgpu::TextureViewDescriptor::default()),
                    surface_texture: Some(texture),
                })),
                Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                    debug!("surface stale, reconfiguring");
                    surface.configure(device, config);
                    Ok(None)
                }
                Err(wgpu::SurfaceError::Timeout) => {
                    warn!("surface timed out, dropping frame");
                    Ok(None)
                }
                Err(e) => Err(e.into()),
            },
            Self::Offscreen { texture, .. } => Ok(Some(OutputFrame {
                view: texture.create_view(&wgpu::TextureViewDescriptor::default()),
                surface_texture: None,
            })),
        }
    }

    /// Copy the offscreen texture back to the CPU. `None` for surfaces.
    pub fn read_back(&self, gpu: &Gpu) -> RenderResult<Option<image::RgbaImage>> {
        match self {
            Self::Surface { .. } => Ok(None),
            Self::Offscreen { texture, .. } => read_texture(gpu, texture).map(Some),
        }
    }
}

fn offscreen_texture(
    device: &wgpu::Device,
    format: wgpu::TextureFormat,
    width: u32,
    height: u32,
) -> wgpu::Texture {
    device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Output Texture"),
        size: wgpu::Extent3d {
            width: width.max(1),
            height: height.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
        view_formats: &[],
    })
}

/// Read an RGBA8 texture into an image, dropping row padding
fn read_texture(gpu: &Gpu, texture: &wgpu::Texture) -> RenderResult<image::RgbaImage> {
    let (width, height) = (texture.width(), texture.height());
    let bytes_per_pixel = 4u32;
    let unpadded_bytes_per_row = width * bytes_per_pixel;
    let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
    let padded_bytes_per_row = unpadded_bytes_per_row.div_ceil(align) * align;

    let output_buffer = gpu.device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Readback Buffer"),
        size: u64::from(padded_bytes_per_row) * u64::from(height),
        usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
        mapped_at_creation: false,
    });

    let mut encoder = gpu
        .device
        .create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Readback Encoder"),
        });
    encoder.copy_texture_to_buffer(
        wgpu::TexelCopyTextureInfo {
            texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        wgpu::TexelCopyBufferInfo {
            buffer: &output_buffer,
            layout: wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(padded_bytes_per_row),
                rows_per_image: Some(height),
            },
        },
        texture.size(),
    );
    gpu.queue.submit(std::iter::once(encoder.finish()));

    let buffer_slice = output_buffer.slice(..);
    let (tx, rx) = std::sync::mpsc::channel();
    buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
        let _ = tx.send(result);
    });
    gpu.device
        .poll(wgpu::PollType::Wait)
        .map_err(|e| RenderError::Readback(e.to_string()))?;
    rx.recv()
        .map_err(|e| RenderError::Readback(e.to_string()))?
        .map_err(|e| RenderError::Readback(e.to_string()))?;

    let data = buffer_slice.get_mapped_range();
    let mut img = image::RgbaImage::new(width, height);
    for (y, row) in data
        .chunks_exact(padded_bytes_per_row as usize)
        .take(height as usize)
        .enumerate()
    {
        for (x, px) in row[..unpadded_bytes_per_row as usize]
            .chunks_exact(4)
            .enumerate()
        {
            img.put_pixel(x as u32, y as u32, image::Rgba([px[0], px[1], px[2], px[3]]));
        }
    }
    drop(data);
    output_buffer.unmap();

    Ok(img)
}

/// Upload an RGBA8 image as a sampled sRGB texture
pub fn upload_rgba(gpu: &Gpu, image: &image::RgbaImage, label: &str) -> RenderResult<wgpu::Texture> {
    let (width, height) = image.dimensions();
    let max = gpu.device.limits().max_texture_dimension_2d;
    if width == 0 || height == 0 || width > max || height > max {
        return Err(RenderError::InvalidTexture(format!(
            "{label} is {width}x{height}, limit is {max}"
        )));
    }

    let size = wgpu::Extent3d {
        width,
        height,
        depth_or_array_layers: 1,
    };
    let texture = gpu.device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8UnormSrgb,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });
    gpu.queue.write_texture(
        wgpu::TexelCopyTextureInfo {
            texture: &texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        image.as_raw(),
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(4 * width),
            rows_per_image: Some(height),
        },
        size,
    );
    Ok(texture)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn release_reports_a_failed_wait() {
        assert!(!finish_release(Err(wgpu::PollError::Timeout), "globe"));
        assert!(finish_release(Ok(wgpu::PollStatus::QueueEmpty), "card"));
    }
}
