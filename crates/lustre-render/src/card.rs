//! GPU card stage: one textured quad, one pipeline per edition

use lustre_core::card::{CARD_SIZE, CardUniforms, Edition};
use lustre_core::lifecycle::{Frame, Stage, SurfaceSize};
use tracing::{debug, info};

use crate::camera::{Camera, card_model};
use crate::error::RenderResult;
use crate::gpu::{Gpu, Output, finish_release, upload_rgba};
use crate::uniforms::CardPassUniforms;

/// Fragment entry point for each edition, in [`Edition::index`] order
const ENTRY_POINTS: [&str; 3] = ["fs_foil", "fs_holographic", "fs_polychrome"];

pub struct CardStage {
    gpu: Gpu,
    output: Output,
    camera: Camera,
    pipelines: Vec<wgpu::RenderPipeline>,
    uniform_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    edition: Edition,
    size: SurfaceSize,
}

impl CardStage {
    /// Uploads `texture`; fails when it is empty or larger than the device allows
    pub fn new(gpu: Gpu, output: Output, texture: &image::RgbaImage, edition: Edition) -> RenderResult<Self> {
        let device = &gpu.device;
        let texture = upload_rgba(&gpu, texture, "Card Texture")?;
        let texture_view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Card Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Card Uniform Buffer"),
            size: std::mem::size_of::<CardPassUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Card Bind Group Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Card Bind Group"),
            layout: &layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: uniform_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&texture_view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&sampler),
                },
            ],
        });

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Card Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/card.wgsl").into()),
        });
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Card Pipeline Layout"),
            bind_group_layouts: &[&layout],
            push_constant_ranges: &[],
        });

        let pipelines = ENTRY_POINTS
            .iter()
            .map(|entry| {
                device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                    label: Some(entry),
                    layout: Some(&pipeline_layout),
                    vertex: wgpu::VertexState {
                        module: &shader,
                        entry_point: Some("vs_main"),
                        buffers: &[],
                        compilation_options: Default::default(),
                    },
                    fragment: Some(wgpu::FragmentState {
                        module: &shader,
                        entry_point: Some(entry),
                        targets: &[Some(wgpu::ColorTargetState {
                            format: output.format(),
                            blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                            write_mask: wgpu::ColorWrites::ALL,
                        })],
                        compilation_options: Default::default(),
                    }),
                    // The back of the card shows when it swings past edge-on
                    primitive: wgpu::PrimitiveState::default(),
                    depth_stencil: None,
                    multisample: wgpu::MultisampleState::default(),
                    multiview: None,
                    cache: None,
                })
            })
            .collect();

        info!(edition = edition.name(), "card stage ready");
        Ok(Self {
            gpu,
            output,
            camera: Camera::default(),
            pipelines,
            uniform_buffer,
            bind_group,
            edition,
            size: SurfaceSize::default(),
        })
    }

    pub fn edition(&self) -> Edition {
        self.edition
    }

    pub fn read_back(&self) -> RenderResult<Option<image::RgbaImage>> {
        self.output.read_back(&self.gpu)
    }

    fn draw(&mut self, frame: &Frame) -> RenderResult<()> {
        let Some(out) = self.output.acquire(&self.gpu.device)? else {
            return Ok(());
        };

        let rotation = frame.orientation.rotation();
        let uniforms = CardPassUniforms::new(
            self.camera.view_projection_matrix(),
            card_model(rotation, frame.orientation.bob),
            CARD_SIZE,
            CardUniforms::from_rotation(rotation),
        );
        self.gpu
            .queue
            .write_buffer(&self.uniform_buffer, 0, bytemuck::cast_slice(&[uniforms]));

        let mut encoder = self
            .gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Card Encoder"),
            });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Card Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &out.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            pass.set_pipeline(&self.pipelines[self.edition.index()]);
            pass.set_bind_group(0, &self.bind_group, &[]);
            pass.draw(0..6, 0..1);
        }
        self.gpu.queue.submit(std::iter::once(encoder.finish()));
        out.present();
        Ok(())
    }
}

impl Stage for CardStage {
    fn resize(&mut self, size: SurfaceSize) {
        if size.is_empty() || size == self.size {
            return;
        }
        self.size = size;
        self.camera.set_viewport(size.width, size.height);
        self.output.resize(&self.gpu.device, size.width, size.height);
        debug!(width = size.width, height = size.height, "card viewport");
    }

    fn render(&mut self, frame: &Frame) -> lustre_core::Result<()> {
        if frame.size != self.size {
            self.resize(frame.size);
        }
        self.draw(frame).map_err(Into::into)
    }

    fn set_edition(&mut self, edition: Edition) {
        if edition != self.edition {
            debug!(from = self.edition.name(), to = edition.name(), "edition switch");
            self.edition = edition;
        }
    }

    fn release(self) {
        info!("card stage released");
        finish_release(self.gpu.device.poll(wgpu::PollType::Wait), "card");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_points_follow_edition_order() {
        let src = include_str!("shaders/card.wgsl");
        for edition in Edition::ALL {
            let entry = ENTRY_POINTS[edition.index()];
            assert!(src.contains(&format!("fn {entry}(")), "{entry} missing");
            assert!(entry.contains(&edition.name()[..4]));
        }
    }
}
