//! GPU globe stage: scene pass into a ping-pong pair, then a display pass
//!
//! Both accumulation targets and their bind groups are created together
//! and replaced together on resize. The frame parity picks which history
//! bind group and which display bind group to use; nothing is rebound.

use glam::Vec2;
use lustre_core::camera::rotation_matrix;
use lustre_core::lifecycle::{Frame, Stage, SurfaceSize};
use lustre_core::taa::{Jitter, RenderTargetPair};
use lustre_core::tuning::Tuning;
use lustre_sdf::{DistanceField, GlobeScene, build_globe_module, inject_scene};
use tracing::{debug, info};
use wgpu::util::DeviceExt;

use crate::error::RenderResult;
use crate::gpu::{Gpu, Output, finish_release};
use crate::uniforms::GlobeUniforms;

const ACCUMULATION_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;

/// Globe scene shader with the generated SDF spliced in
pub fn globe_shader(globe: &GlobeScene) -> String {
    inject_scene(include_str!("shaders/globe.wgsl"), &build_globe_module(globe))
}

struct Target {
    view: wgpu::TextureView,
    /// Reads this target as history
    history_group: wgpu::BindGroup,
    /// Reads this target for display
    display_group: wgpu::BindGroup,
}

pub struct GlobeStage {
    gpu: Gpu,
    output: Output,
    tuning: Tuning,
    scene_pipeline: wgpu::RenderPipeline,
    display_pipeline: wgpu::RenderPipeline,
    uniform_buffer: wgpu::Buffer,
    scene_group: wgpu::BindGroup,
    texture_layout: wgpu::BindGroupLayout,
    targets: RenderTargetPair<Target>,
    jitter: Jitter,
    size: SurfaceSize,
}

impl GlobeStage {
    pub fn new(gpu: Gpu, output: Output, globe: &GlobeScene, field: &DistanceField, tuning: Tuning) -> Self {
        let device = &gpu.device;

        let scene_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Globe Shader"),
            source: wgpu::ShaderSource::Wgsl(globe_shader(globe).into()),
        });
        let display_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Display Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/display.wgsl").into()),
        });

        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Globe Uniform Buffer"),
            size: std::mem::size_of::<GlobeUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let field_view = upload_field(&gpu, field).create_view(&wgpu::TextureViewDescriptor::default());

        let scene_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Globe Scene Bind Group Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                texture_entry(1),
            ],
        });
        let texture_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Accumulation Bind Group Layout"),
            entries: &[texture_entry(0)],
        });

        let scene_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Globe Scene Bind Group"),
            layout: &scene_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: uniform_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&field_view),
                },
            ],
        });

        let scene_pipeline = fullscreen_pipeline(
            device,
            "Globe Scene Pipeline",
            &scene_module,
            &[&scene_layout, &texture_layout],
            ACCUMULATION_FORMAT,
        );
        let display_pipeline = fullscreen_pipeline(
            device,
            "Globe Display Pipeline",
            &display_module,
            &[&texture_layout],
            output.format(),
        );

        let size = SurfaceSize::new(1, 1);
        let targets = make_targets(device, &texture_layout, size);

        info!("globe stage ready");
        Self {
            jitter: Jitter::new(tuning.taa.seed),
            gpu,
            output,
            tuning,
            scene_pipeline,
            display_pipeline,
            uniform_buffer,
            scene_group,
            texture_layout,
            targets,
            size,
        }
    }

    /// Frames accumulated since the last resize
    pub fn accumulated(&self) -> u64 {
        self.targets.flips()
    }

    /// Offscreen output only
    pub fn read_back(&self) -> RenderResult<Option<image::RgbaImage>> {
        self.output.read_back(&self.gpu)
    }

    fn draw(&mut self, frame: &Frame) -> RenderResult<()> {
        let Some(out) = self.output.acquire(&self.gpu.device)? else {
            return Ok(());
        };

        let angles = self.tuning.view.angles(frame.time, frame.orientation.tilt);
        let jitter = self.jitter.next(self.size.width, self.size.height);
        let blend = if self.targets.flips() == 0 {
            1.0
        } else {
            self.tuning.taa.blend
        };
        let uniforms = GlobeUniforms::new(
            &self.tuning,
            rotation_matrix(angles),
            Vec2::new(self.size.width as f32, self.size.height as f32),
            jitter,
            blend,
        );
        self.gpu
            .queue
            .write_buffer(&self.uniform_buffer, 0, bytemuck::cast_slice(&[uniforms]));

        let write = self.targets.write();
        let history = self.targets.history();

        let mut encoder = self
            .gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Globe Encoder"),
            });
        {
            let mut pass = begin_pass(&mut encoder, "Globe Scene Pass", &write.view);
            pass.set_pipeline(&self.scene_pipeline);
            pass.set_bind_group(0, &self.scene_group, &[]);
            pass.set_bind_group(1, &history.history_group, &[]);
            pass.draw(0..3, 0..1);
        }
        {
            let mut pass = begin_pass(&mut encoder, "Globe Display Pass", &out.view);
            pass.set_pipeline(&self.display_pipeline);
            pass.set_bind_group(0, &write.display_group, &[]);
            pass.draw(0..3, 0..1);
        }
        self.gpu.queue.submit(std::iter::once(encoder.finish()));
        out.present();

        self.targets.flip();
        Ok(())
    }
}

impl Stage for GlobeStage {
    fn resize(&mut self, size: SurfaceSize) {
        if size.is_empty() || size == self.size {
            return;
        }
        self.size = size;
        self.output.resize(&self.gpu.device, size.width, size.height);
        let fresh = make_targets(&self.gpu.device, &self.texture_layout, size);
        // Both targets, views and bind groups swap in one step
        self.targets = fresh;
        debug!(width = size.width, height = size.height, "globe targets reallocated");
    }

    fn render(&mut self, frame: &Frame) -> lustre_core::Result<()> {
        if frame.size != self.size {
            self.resize(frame.size);
        }
        self.draw(frame).map_err(Into::into)
    }

    fn release(self) {
        info!(frames = self.targets.flips(), "globe stage released");
        // wgpu frees on drop; make sure queued work is done first
        finish_release(self.gpu.device.poll(wgpu::PollType::Wait), "globe");
    }
}

fn texture_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Texture {
            sample_type: wgpu::TextureSampleType::Float { filterable: false },
            view_dimension: wgpu::TextureViewDimension::D2,
            multisampled: false,
        },
        count: None,
    }
}

fn make_targets(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    size: SurfaceSize,
) -> RenderTargetPair<Target> {
    let make = |index: usize| {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(if index == 0 { "Accumulation A" } else { "Accumulation B" }),
            size: wgpu::Extent3d {
                width: size.width,
                height: size.height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: ACCUMULATION_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let group = |label| {
            device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(label),
                layout,
                entries: &[wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&view),
                }],
            })
        };
        let history_group = group("History Bind Group");
        let display_group = group("Display Bind Group");
        Target {
            view,
            history_group,
            display_group,
        }
    };
    RenderTargetPair::new(make(0), make(1))
}

fn fullscreen_pipeline(
    device: &wgpu::Device,
    label: &str,
    module: &wgpu::ShaderModule,
    layouts: &[&wgpu::BindGroupLayout],
    format: wgpu::TextureFormat,
) -> wgpu::RenderPipeline {
    let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some(label),
        bind_group_layouts: layouts,
        push_constant_ranges: &[],
    });
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(&layout),
        vertex: wgpu::VertexState {
            module,
            entry_point: Some("vs_main"),
            buffers: &[],
            compilation_options: Default::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module,
            entry_point: Some("fs_main"),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: Some(wgpu::BlendState::REPLACE),
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: Default::default(),
        }),
        primitive: wgpu::PrimitiveState::default(),
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
        cache: None,
    })
}

fn begin_pass<'e>(
    encoder: &'e mut wgpu::CommandEncoder,
    label: &str,
    view: &wgpu::TextureView,
) -> wgpu::RenderPass<'e> {
    encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some(label),
        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
            view,
            resolve_target: None,
            ops: wgpu::Operations {
                load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                store: wgpu::StoreOp::Store,
            },
        })],
        depth_stencil_attachment: None,
        timestamp_writes: None,
        occlusion_query_set: None,
    })
}

/// Upload the coastline field as an R32Float texture
fn upload_field(gpu: &Gpu, field: &DistanceField) -> wgpu::Texture {
    gpu.device.create_texture_with_data(
        &gpu.queue,
        &wgpu::TextureDescriptor {
            label: Some("Land Field"),
            size: wgpu::Extent3d {
                width: field.width() as u32,
                height: field.height() as u32,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::R32Float,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        },
        wgpu::util::TextureDataOrder::LayerMajor,
        bytemuck::cast_slice(field.values()),
    )
}
