//! [`GpuBackend`] implemented on wgpu.
//!
//! Commands are recorded into one encoder per frame, opened with
//! [`WgpuBackend::begin_frame`] on the swapchain view and closed with
//! [`WgpuBackend::finish_frame`]. Every clear and draw opens its own render
//! pass on the currently bound target, so target switches need no extra
//! bookkeeping.

mod common;
mod quad_pipeline;
mod surface_program;
mod textures;

use wgpu::util::DeviceExt;

use crate::assets::{ShaderProgramHandle, TextureHandle};
use crate::coords::{ColorRgba, Vec2I};
use crate::render::{
    BackendError, BatchDraw, GpuBackend, UniformKind, UniformValue, MAX_TEX_UNITS,
};

use common::{
    alpha_blend, begin_pass, primitive_state, CameraUniform, ScreenVertex, SCREEN_INDICES,
    SCREEN_VERTICES,
};
use quad_pipeline::QuadPipeline;
use surface_program::{SurfaceProgram, UniformLayout};
use textures::{validate_size, TextureRegistry};

/// GPU resources of one quad batch.
pub struct WgpuBatch {
    vbo: wgpu::Buffer,
    ibo: wgpu::Buffer,
    camera_ubo: wgpu::Buffer,
    camera_bind_group: wgpu::BindGroup,
}

/// Off-screen color target, sampled when the surface is drawn.
pub struct WgpuSurface {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    size: Vec2I,
}

impl WgpuSurface {
    #[inline]
    pub fn size(&self) -> Vec2I {
        self.size
    }

    #[inline]
    pub fn view(&self) -> &wgpu::TextureView {
        &self.view
    }
}

struct Frame {
    encoder: wgpu::CommandEncoder,
    default_view: wgpu::TextureView,
    target: Option<wgpu::TextureView>,
}

pub struct WgpuBackend {
    device: wgpu::Device,
    queue: wgpu::Queue,
    format: wgpu::TextureFormat,

    quad: QuadPipeline,

    surface_bgl: wgpu::BindGroupLayout,
    surface_pipeline_layout: wgpu::PipelineLayout,
    surface_sampler: wgpu::Sampler,
    screen_vbo: wgpu::Buffer,
    screen_ibo: wgpu::Buffer,

    textures: TextureRegistry,
    programs: Vec<SurfaceProgram>,

    frame: Option<Frame>,
}

impl WgpuBackend {
    /// Builds the quad pipeline and surface program layout for targets of
    /// `format` (normally the swapchain format).
    pub fn new(device: &wgpu::Device, queue: &wgpu::Queue, format: wgpu::TextureFormat) -> Self {
        let quad = QuadPipeline::new(device, format);

        let surface_bgl = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("tessera surface bgl"),
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

        let surface_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("tessera surface pipeline layout"),
            bind_group_layouts: &[&surface_bgl],
            immediate_size: 0,
        });

        let surface_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("tessera surface sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::MipmapFilterMode::Nearest,
            ..Default::default()
        });

        let screen_vbo = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("tessera screen quad vbo"),
            contents: bytemuck::cast_slice(&SCREEN_VERTICES),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let screen_ibo = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("tessera screen quad ibo"),
            contents: bytemuck::cast_slice(&SCREEN_INDICES),
            usage: wgpu::BufferUsages::INDEX,
        });

        Self {
            textures: TextureRegistry::new(device, queue),
            device: device.clone(),
            queue: queue.clone(),
            format,
            quad,
            surface_bgl,
            surface_pipeline_layout,
            surface_sampler,
            screen_vbo,
            screen_ibo,
            programs: Vec::new(),
            frame: None,
        }
    }

    #[inline]
    pub fn format(&self) -> wgpu::TextureFormat {
        self.format
    }

    /// Uploads an sRGB RGBA8 texture (`size.x * size.y * 4` bytes).
    pub fn register_texture(&mut self, size: Vec2I, rgba: &[u8]) -> Result<TextureHandle, BackendError> {
        let handle = self.textures.insert(&self.device, &self.queue, size, rgba)?;
        log::debug!("texture {handle:?} registered ({}x{})", size.x, size.y);
        Ok(handle)
    }

    /// Frees a texture. Later draws referencing it sample white.
    pub fn unregister_texture(&mut self, handle: TextureHandle) -> bool {
        self.textures.remove(handle)
    }

    /// Compiles a surface program from a WGSL fragment stage.
    ///
    /// `fragment_wgsl` is appended to the shared prelude (see
    /// `shaders/surface_prelude.wgsl`) and must define `fs_main`. `uniforms`
    /// lists the members of its group 0 binding 2 uniform block in
    /// declaration order.
    pub fn register_surface_program(
        &mut self,
        label: &str,
        fragment_wgsl: &str,
        uniforms: &[(&str, UniformKind)],
    ) -> Result<ShaderProgramHandle, BackendError> {
        let layout = UniformLayout::new(uniforms)?;
        let max = self.device.limits().max_uniform_buffer_binding_size as usize;
        if layout.size() > max {
            return Err(BackendError(format!(
                "surface program `{label}`: uniform block of {} bytes exceeds {max}",
                layout.size()
            )));
        }

        let source = format!("{}\n{}", include_str!("shaders/surface_prelude.wgsl"), fragment_wgsl);
        let shader = self.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(label),
            source: wgpu::ShaderSource::Wgsl(source.into()),
        });

        let pipeline = self.device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(label),
            layout: Some(&self.surface_pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[ScreenVertex::layout()],
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: self.format,
                    blend: Some(alpha_blend()),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: primitive_state(),
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        });

        let handle = ShaderProgramHandle(self.programs.len() as u32);
        self.programs.push(SurfaceProgram {
            pipeline,
            staging: vec![0; layout.size()],
            layout,
        });
        log::debug!("surface program `{label}` registered as {handle:?}");
        Ok(handle)
    }

    /// Starts recording a frame whose default target is `view`.
    pub fn begin_frame(&mut self, view: &wgpu::TextureView) {
        if self.frame.is_some() {
            log::warn!("begin_frame: previous frame was never finished; discarding it");
        }
        let encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("tessera frame encoder"),
        });
        self.frame = Some(Frame { encoder, default_view: view.clone(), target: None });
    }

    /// Ends the frame and returns its commands for submission.
    pub fn finish_frame(&mut self) -> Option<wgpu::CommandBuffer> {
        self.frame.take().map(|frame| frame.encoder.finish())
    }

    fn create_surface_texture(&self, size: Vec2I) -> Result<(wgpu::Texture, wgpu::TextureView), BackendError> {
        validate_size(&self.device, size, "surface")?;

        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("tessera surface"),
            size: wgpu::Extent3d {
                width: size.x as u32,
                height: size.y as u32,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: self.format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Ok((texture, view))
    }
}

impl GpuBackend for WgpuBackend {
    type Batch = WgpuBatch;
    type Surface = WgpuSurface;

    fn create_batch(&mut self, vertex_bytes: &[u8], indices: &[u16]) -> Result<WgpuBatch, BackendError> {
        let max = self.device.limits().max_buffer_size;
        if vertex_bytes.is_empty() || indices.is_empty() {
            return Err(BackendError("batch buffers must not be empty".into()));
        }
        if vertex_bytes.len() as u64 > max {
            return Err(BackendError(format!(
                "batch vertex buffer of {} bytes exceeds {max}",
                vertex_bytes.len()
            )));
        }

        let vbo = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("tessera batch vbo"),
            contents: vertex_bytes,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        });
        let ibo = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("tessera batch ibo"),
            contents: bytemuck::cast_slice(indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        let camera_ubo = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("tessera batch camera ubo"),
            size: std::mem::size_of::<CameraUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let camera_bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("tessera batch camera bind group"),
            layout: &self.quad.camera_bgl,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: camera_ubo.as_entire_binding(),
            }],
        });

        Ok(WgpuBatch { vbo, ibo, camera_ubo, camera_bind_group })
    }

    fn upload_vertices(&mut self, batch: &WgpuBatch, vertex_bytes: &[u8]) {
        self.queue.write_buffer(&batch.vbo, 0, vertex_bytes);
    }

    fn destroy_batch(&mut self, batch: WgpuBatch) {
        batch.vbo.destroy();
        batch.ibo.destroy();
        batch.camera_ubo.destroy();
    }

    fn create_surface(&mut self, size: Vec2I) -> Result<WgpuSurface, BackendError> {
        let (texture, view) = self.create_surface_texture(size)?;
        Ok(WgpuSurface { texture, view, size })
    }

    fn resize_surface(&mut self, surface: &mut WgpuSurface, size: Vec2I) -> Result<(), BackendError> {
        let (texture, view) = self.create_surface_texture(size)?;
        surface.texture.destroy();
        surface.texture = texture;
        surface.view = view;
        surface.size = size;
        Ok(())
    }

    fn destroy_surface(&mut self, surface: WgpuSurface) {
        surface.texture.destroy();
    }

    fn bind_target(&mut self, target: Option<&WgpuSurface>) {
        let Some(frame) = self.frame.as_mut() else {
            log::warn!("bind_target outside a frame; ignored");
            return;
        };
        frame.target = target.map(|s| s.view.clone());
    }

    fn clear(&mut self, color: ColorRgba) {
        let Some(Frame { encoder, default_view, target }) = self.frame.as_mut() else {
            log::warn!("clear outside a frame; ignored");
            return;
        };
        let view = target.as_ref().unwrap_or(&*default_view);
        let _pass = begin_pass(encoder, view, wgpu::LoadOp::Clear(color.to_wgpu()), "tessera clear pass");
    }

    fn draw_batch(&mut self, draw: BatchDraw<'_, WgpuBatch>) {
        let Some(Frame { encoder, default_view, target }) = self.frame.as_mut() else {
            log::warn!("draw_batch outside a frame; ignored");
            return;
        };
        if draw.quad_count == 0 {
            return;
        }

        let camera = CameraUniform { proj: draw.projection, view: draw.view };
        self.queue.write_buffer(&draw.batch.camera_ubo, 0, bytemuck::bytes_of(&camera));

        let mut entries: Vec<wgpu::BindGroupEntry<'_>> = (0..MAX_TEX_UNITS)
            .map(|unit| wgpu::BindGroupEntry {
                binding: unit as u32,
                resource: wgpu::BindingResource::TextureView(match draw.textures.get(unit) {
                    Some(&handle) => self.textures.view(handle),
                    None => self.textures.fallback(),
                }),
            })
            .collect();
        entries.push(wgpu::BindGroupEntry {
            binding: MAX_TEX_UNITS as u32,
            resource: wgpu::BindingResource::Sampler(&self.quad.sampler),
        });

        let textures_bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("tessera batch textures bind group"),
            layout: &self.quad.textures_bgl,
            entries: &entries,
        });

        let view = target.as_ref().unwrap_or(&*default_view);
        let mut rpass = begin_pass(encoder, view, wgpu::LoadOp::Load, "tessera batch pass");

        rpass.set_pipeline(&self.quad.pipeline);
        rpass.set_bind_group(0, &draw.batch.camera_bind_group, &[]);
        rpass.set_bind_group(1, &textures_bind_group, &[]);
        rpass.set_vertex_buffer(0, draw.batch.vbo.slice(..));
        rpass.set_index_buffer(draw.batch.ibo.slice(..), wgpu::IndexFormat::Uint16);
        rpass.draw_indexed(0..(draw.quad_count * 6) as u32, 0, 0..1);
    }

    fn set_surface_uniform(&mut self, program: ShaderProgramHandle, name: &str, value: &UniformValue) {
        let Some(p) = self.programs.get_mut(program.0 as usize) else {
            log::warn!("set_surface_uniform: unknown program {program:?}");
            return;
        };
        if let Err(err) = p.layout.write(&mut p.staging, name, value) {
            log::warn!("set_surface_uniform: {err}");
        }
    }

    fn draw_surface(&mut self, surface: &WgpuSurface, program: ShaderProgramHandle) {
        let Some(Frame { encoder, default_view, target }) = self.frame.as_mut() else {
            log::warn!("draw_surface outside a frame; ignored");
            return;
        };
        let Some(p) = self.programs.get(program.0 as usize) else {
            log::warn!("draw_surface: unknown program {program:?}");
            return;
        };

        // One buffer per draw: a program may be drawn several times per
        // frame with different uniform values.
        let ubo = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("tessera surface ubo"),
            contents: &p.staging,
            usage: wgpu::BufferUsages::UNIFORM,
        });
        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("tessera surface bind group"),
            layout: &self.surface_bgl,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&surface.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&self.surface_sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: ubo.as_entire_binding(),
                },
            ],
        });

        let view = target.as_ref().unwrap_or(&*default_view);
        let mut rpass = begin_pass(encoder, view, wgpu::LoadOp::Load, "tessera surface pass");

        rpass.set_pipeline(&p.pipeline);
        rpass.set_bind_group(0, &bind_group, &[]);
        rpass.set_vertex_buffer(0, self.screen_vbo.slice(..));
        rpass.set_index_buffer(self.screen_ibo.slice(..), wgpu::IndexFormat::Uint16);
        rpass.draw_indexed(0..SCREEN_INDICES.len() as u32, 0, 0..1);
    }
}
