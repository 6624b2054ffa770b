//! wgpu implementation of [`FrameBackend`]

use super::pipeline::{PipelineCache, PipelineKey};
use super::pool::{TextureKey, TexturePool};
use super::shader::ShaderLibrary;
use crate::backend::{BlitOp, FrameBackend};
use crate::graph::ResourceHandle;
use crate::resources::TextureDesc;
use crate::{Error, Result};
use std::collections::HashMap;
use std::sync::Arc;
use wgpu::util::DeviceExt;

/// Uniform blocks are padded up to this many bytes
const UNIFORM_ALIGN: usize = 16;

struct Allocated {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    key: TextureKey,
}

/// Long-lived GPU state shared by every frame
pub struct WgpuBackend {
    device: Arc<wgpu::Device>,
    bind_group_layout: wgpu::BindGroupLayout,
    pipeline_layout: wgpu::PipelineLayout,
    sampler: wgpu::Sampler,
    empty_uniforms: wgpu::Buffer,
    pipelines: PipelineCache<wgpu::RenderPipeline>,
    textures: HashMap<ResourceHandle, Allocated>,
    pool: TexturePool,
    frame: u64,
}

impl WgpuBackend {
    pub fn new(device: Arc<wgpu::Device>) -> Self {
        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Veil Blit Layout"),
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
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Veil Blit Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        // Point sampling with clamped edges, one texel in, one texel out
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Veil Point Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let empty_uniforms = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Veil Empty Uniforms"),
            contents: &[0u8; UNIFORM_ALIGN],
            usage: wgpu::BufferUsages::UNIFORM,
        });

        Self {
            pool: TexturePool::new(device.clone()),
            device,
            bind_group_layout,
            pipeline_layout,
            sampler,
            empty_uniforms,
            pipelines: PipelineCache::new(),
            textures: HashMap::new(),
            frame: 0,
        }
    }

    /// Start recording a frame into `encoder`
    ///
    /// `camera_color` is what `ResourceHandle::CAMERA_COLOR` resolves to. It
    /// must have been created with `RENDER_ATTACHMENT | TEXTURE_BINDING`.
    pub fn begin_frame<'a>(
        &'a mut self,
        shaders: &'a ShaderLibrary,
        encoder: &'a mut wgpu::CommandEncoder,
        camera_color: &'a wgpu::TextureView,
        camera_format: wgpu::TextureFormat,
    ) -> WgpuFrame<'a> {
        WgpuFrame {
            backend: self,
            shaders,
            encoder,
            camera_color,
            camera_format,
        }
    }

    /// Drop every cached pipeline
    ///
    /// Re-registered programs do not need this, their pipelines are rebuilt
    /// on next use.
    pub fn clear_pipelines(&mut self) {
        log::info!("Clearing blit pipeline cache ({} pipelines)", self.pipelines.len());
        self.pipelines.clear();
    }

    /// Number of textures currently allocated through this backend
    pub fn live_textures(&self) -> usize {
        self.textures.len()
    }

    fn ensure_pipeline(&mut self, shaders: &ShaderLibrary, key: PipelineKey) -> Result<()> {
        let generation = shaders
            .generation(key.pass.program)
            .ok_or_else(|| Error::Shader(format!("Unknown program {:?}", key.pass.program)))?;
        let device = &self.device;
        let layout = &self.pipeline_layout;
        self.pipelines
            .get_or_build(key, generation, || create_pipeline(device, layout, shaders, key))?;
        Ok(())
    }
}

fn create_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    shaders: &ShaderLibrary,
    key: PipelineKey,
) -> Result<wgpu::RenderPipeline> {
    let (module, entry) = shaders.fragment(key.pass)?;
    let format = key.format;
    log::debug!("Creating blit pipeline '{}' for {:?}", entry, format);

    #[cfg(not(target_arch = "wasm32"))]
    device.push_error_scope(wgpu::ErrorFilter::Validation);

    let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(entry),
        layout: Some(layout),
        cache: None,
        vertex: wgpu::VertexState {
            module,
            entry_point: Some("vs_fullscreen"),
            buffers: &[],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module,
            entry_point: Some(entry),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: None,
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            cull_mode: None,
            ..Default::default()
        },
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
    });

    // A pass whose entry point does not match the shared layout fails here
    #[cfg(not(target_arch = "wasm32"))]
    if let Some(err) = pollster::block_on(device.pop_error_scope()) {
        log::warn!("Blit pipeline '{}' is invalid: {}", entry, err);
        return Err(err.into());
    }

    Ok(pipeline)
}

fn resolve<'t>(
    textures: &'t HashMap<ResourceHandle, Allocated>,
    camera_color: &'t wgpu::TextureView,
    camera_format: wgpu::TextureFormat,
    handle: ResourceHandle,
) -> Result<(&'t wgpu::TextureView, wgpu::TextureFormat)> {
    if handle == ResourceHandle::CAMERA_COLOR {
        return Ok((camera_color, camera_format));
    }
    textures
        .get(&handle)
        .map(|t| (&t.view, t.key.format))
        .ok_or_else(|| Error::Resource(format!("{:?} is not allocated", handle)))
}

/// One frame's view of the backend, recording into a command encoder
pub struct WgpuFrame<'a> {
    backend: &'a mut WgpuBackend,
    shaders: &'a ShaderLibrary,
    encoder: &'a mut wgpu::CommandEncoder,
    camera_color: &'a wgpu::TextureView,
    camera_format: wgpu::TextureFormat,
}

impl WgpuFrame<'_> {
    /// Draw `source` into a view the backend does not own, e.g. the swapchain
    pub fn present(&mut self, source: ResourceHandle, target: &wgpu::TextureView, format: wgpu::TextureFormat) -> Result<()> {
        let key = PipelineKey { pass: self.shaders.blit_program(), format };
        self.backend.ensure_pipeline(self.shaders, key)?;
        let (source_view, _) = resolve(&self.backend.textures, self.camera_color, self.camera_format, source)?;
        record_draw(&*self.backend, self.encoder, "Veil Present", key, &[], source_view, target)
    }

    /// Finish the frame and age out unused pooled textures
    pub fn finish(self) {
        self.backend.frame += 1;
        let frame = self.backend.frame;
        self.backend.pool.cleanup_old(frame);
        log::trace!("{} pooled texture(s) kept for reuse", self.backend.pool.available());
    }
}

fn record_draw(
    backend: &WgpuBackend,
    encoder: &mut wgpu::CommandEncoder,
    label: &str,
    pipeline_key: PipelineKey,
    uniforms: &[u8],
    source: &wgpu::TextureView,
    target: &wgpu::TextureView,
) -> Result<()> {
    let pipeline = backend
        .pipelines
        .get(&pipeline_key)
        .ok_or_else(|| Error::Shader(format!("No pipeline for '{}'", label)))?;

    let uniform_buffer = (!uniforms.is_empty()).then(|| {
        let mut contents = uniforms.to_vec();
        contents.resize(contents.len().div_ceil(UNIFORM_ALIGN) * UNIFORM_ALIGN, 0);
        backend.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: &contents,
            usage: wgpu::BufferUsages::UNIFORM,
        })
    });

    let bind_group = backend.device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some(label),
        layout: &backend.bind_group_layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(source),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(&backend.sampler),
            },
            wgpu::BindGroupEntry {
                binding: 2,
                resource: uniform_buffer
                    .as_ref()
                    .unwrap_or(&backend.empty_uniforms)
                    .as_entire_binding(),
            },
        ],
    });

    let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some(label),
        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
            view: target,
            resolve_target: None,
            ops: wgpu::Operations {
                load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                store: wgpu::StoreOp::Store,
            },
        })],
        depth_stencil_attachment: None,
        timestamp_writes: None,
        occlusion_query_set: None,
    });
    pass.set_pipeline(pipeline);
    pass.set_bind_group(0, &bind_group, &[]);
    pass.draw(0..3, 0..1);
    Ok(())
}

impl FrameBackend for WgpuFrame<'_> {
    fn create_texture(&mut self, handle: ResourceHandle, label: &str, desc: &TextureDesc) -> Result<()> {
        if handle == ResourceHandle::CAMERA_COLOR || self.backend.textures.contains_key(&handle) {
            return Err(Error::Resource(format!("{:?} is already allocated", handle)));
        }

        let key = TextureKey::color_target(desc);
        let texture = self.backend.pool.acquire(key, label);
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        self.backend.textures.insert(handle, Allocated { texture, view, key });
        Ok(())
    }

    fn release_texture(&mut self, handle: ResourceHandle) {
        if let Some(allocated) = self.backend.textures.remove(&handle) {
            let frame = self.backend.frame;
            self.backend.pool.release(allocated.texture, allocated.key, frame);
        }
    }

    fn blit(&mut self, op: &BlitOp) -> Result<()> {
        if op.source == op.target {
            return Err(Error::Resource(format!("'{}' reads and writes {:?}", op.label, op.source)));
        }

        let pass = op.program.unwrap_or_else(|| self.shaders.blit_program());
        let (_, format) = resolve(&self.backend.textures, self.camera_color, self.camera_format, op.target)?;
        let key = PipelineKey { pass, format };
        self.backend.ensure_pipeline(self.shaders, key)?;

        let (source, _) = resolve(&self.backend.textures, self.camera_color, self.camera_format, op.source)?;
        let (target, _) = resolve(&self.backend.textures, self.camera_color, self.camera_format, op.target)?;
        record_draw(&*self.backend, self.encoder, op.label, key, &op.uniforms, source, target)
    }
}
