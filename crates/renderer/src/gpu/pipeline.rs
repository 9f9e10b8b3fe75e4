use anyhow::{Context, Result};

use crate::compile::{
    compile_dither_fragment, compile_dither_vertex, compile_wave_fragment, compile_wave_vertex,
};

use super::target::TARGET_FORMAT;
use super::uniforms::{DitherUniforms, WaveUniforms};

fn uniform_layout(device: &wgpu::Device, label: &'static str) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some(label),
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        }],
    })
}

fn uniform_buffer<T>(device: &wgpu::Device, label: &'static str) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some(label),
        size: std::mem::size_of::<T>() as u64,
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

struct PassDescriptor<'a> {
    label: &'static str,
    layouts: &'a [&'a wgpu::BindGroupLayout],
    vertex: &'a wgpu::ShaderModule,
    fragment: &'a wgpu::ShaderModule,
    format: wgpu::TextureFormat,
}

fn build_pipeline(
    device: &wgpu::Device,
    desc: PassDescriptor<'_>,
) -> Result<wgpu::RenderPipeline> {
    let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some(desc.label),
        bind_group_layouts: desc.layouts,
        push_constant_ranges: &[],
    });

    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(desc.label),
        layout: Some(&pipeline_layout),
        vertex: wgpu::VertexState {
            module: desc.vertex,
            entry_point: Some("main"),
            buffers: &[],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        },
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: None,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        fragment: Some(wgpu::FragmentState {
            module: desc.fragment,
            entry_point: Some("main"),
            targets: &[Some(wgpu::ColorTargetState {
                format: desc.format,
                blend: None,
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        }),
        multiview: None,
        cache: None,
    });
    if let Some(err) = pollster::block_on(device.pop_error_scope()) {
        anyhow::bail!("failed to build {} pipeline: {err}", desc.label);
    }
    Ok(pipeline)
}

/// Field pass: draws the transformed plane into the offscreen target.
pub(crate) struct WavePass {
    pub pipeline: wgpu::RenderPipeline,
    pub uniform_buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
}

impl WavePass {
    pub fn new(device: &wgpu::Device) -> Result<Self> {
        let vertex = compile_wave_vertex(device)?;
        let fragment = compile_wave_fragment(device)?;
        let layout = uniform_layout(device, "wave uniform layout");
        let uniform_buffer = uniform_buffer::<WaveUniforms>(device, "wave uniforms");
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("wave bind group"),
            layout: &layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });
        let pipeline = build_pipeline(
            device,
            PassDescriptor {
                label: "wave",
                layouts: &[&layout],
                vertex: &vertex,
                fragment: &fragment,
                format: TARGET_FORMAT,
            },
        )
        .context("failed to create wave pass")?;
        Ok(Self {
            pipeline,
            uniform_buffer,
            bind_group,
        })
    }

    pub fn write(&self, queue: &wgpu::Queue, uniforms: &WaveUniforms) {
        queue.write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(uniforms));
    }

    pub fn encode(&self, encoder: &mut wgpu::CommandEncoder, target: &wgpu::TextureView) {
        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("wave pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target,
                depth_slice: None,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            occlusion_query_set: None,
            timestamp_writes: None,
        });
        render_pass.set_pipeline(&self.pipeline);
        render_pass.set_bind_group(0, &self.bind_group, &[]);
        render_pass.draw(0..6, 0..1);
    }
}

/// Dither pass: reads the offscreen target and writes the surface.
pub(crate) struct DitherStage {
    pub pipeline: wgpu::RenderPipeline,
    pub uniform_buffer: wgpu::Buffer,
    pub uniform_bind_group: wgpu::BindGroup,
    source_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    pub source_bind_group: wgpu::BindGroup,
}

impl DitherStage {
    pub fn new(
        device: &wgpu::Device,
        surface_format: wgpu::TextureFormat,
        source: &wgpu::TextureView,
    ) -> Result<Self> {
        let vertex = compile_dither_vertex(device)?;
        let fragment = compile_dither_fragment(device)?;
        let layout = uniform_layout(device, "dither uniform layout");
        let uniform_buffer = uniform_buffer::<DitherUniforms>(device, "dither uniforms");
        let uniform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("dither uniform bind group"),
            layout: &layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        let source_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("dither source layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });
        // Nearest filtering at texel centres reads exactly one source pixel.
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("dither source sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });
        let source_bind_group = source_bind_group(device, &source_layout, source, &sampler);

        let pipeline = build_pipeline(
            device,
            PassDescriptor {
                label: "dither",
                layouts: &[&layout, &source_layout],
                vertex: &vertex,
                fragment: &fragment,
                format: surface_format,
            },
        )
        .context("failed to create dither pass")?;

        Ok(Self {
            pipeline,
            uniform_buffer,
            uniform_bind_group,
            source_layout,
            sampler,
            source_bind_group,
        })
    }

    /// Points the pass at a reallocated offscreen target.
    pub fn rebind(&mut self, device: &wgpu::Device, source: &wgpu::TextureView) {
        self.source_bind_group =
            source_bind_group(device, &self.source_layout, source, &self.sampler);
    }

    pub fn write(&self, queue: &wgpu::Queue, uniforms: &DitherUniforms) {
        queue.write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(uniforms));
    }

    pub fn encode(&self, encoder: &mut wgpu::CommandEncoder, surface: &wgpu::TextureView) {
        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("dither pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: surface,
                depth_slice: None,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            occlusion_query_set: None,
            timestamp_writes: None,
        });
        render_pass.set_pipeline(&self.pipeline);
        render_pass.set_bind_group(0, &self.uniform_bind_group, &[]);
        render_pass.set_bind_group(1, &self.source_bind_group, &[]);
        render_pass.draw(0..3, 0..1);
    }
}

fn source_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    view: &wgpu::TextureView,
    sampler: &wgpu::Sampler,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("dither source bind group"),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(view),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(sampler),
            },
        ],
    })
}
