use std::sync::Arc;

use anyhow::{anyhow, Result};
use generational_arena::Arena;
use wgpu::{
    Adapter, BindGroup, BindGroupDescriptor, BindGroupEntry, BindGroupLayout,
    BindGroupLayoutDescriptor, BindGroupLayoutEntry, BindingResource, BindingType, Buffer,
    BufferBindingType, BufferDescriptor, BufferUsages, Color, CommandEncoderDescriptor, Device,
    DeviceDescriptor, Extent3d, ImageCopyTexture, ImageDataLayout, Instance, LoadOp, Operations,
    Origin3d, Queue, RenderPassColorAttachment, RenderPassDescriptor, RequestAdapterOptions,
    SamplerBindingType, SamplerDescriptor, ShaderStages, StoreOp, Surface, SurfaceConfiguration,
    SurfaceTexture, TextureAspect, TextureDescriptor, TextureDimension, TextureFormat,
    TextureSampleType, TextureUsages, TextureView, TextureViewDescriptor, TextureViewDimension,
};
use winit::window::Window;

pub use winit::dpi::PhysicalSize;

use crate::{
    context::{BufferHandle, DrawCall, GraphicsContext, ProgramHandle, TextureHandle, Uniform},
    pipeline::ShaderProgram,
    plain::Plain,
    texture::Texture,
};

struct GlyphTexture {
    // kept alive for the bind group
    _texture: wgpu::Texture,
    bind_group: BindGroup,
}

struct Frame {
    surface_texture: SurfaceTexture,
    view: TextureView,
}

/// A [GraphicsContext] backed by wgpu, drawing to a window surface.
///
/// Each [DrawCall] is recorded into its own render pass and submitted straight
/// away, so a vertex buffer rewritten between two draws is seen by each draw
/// with the contents it had when that draw was issued.
pub struct Render {
    adapter: Adapter,
    device: Device,
    queue: Queue,
    surface: Surface<'static>,
    config: SurfaceConfiguration,
    uniform_layout: BindGroupLayout,
    glyph_layout: BindGroupLayout,
    programs: Arena<ShaderProgram>,
    textures: Arena<GlyphTexture>,
    buffers: Arena<Buffer>,
    current_program: Option<ProgramHandle>,
    frame: Option<Frame>,
}

impl Render {
    pub fn new(window: Arc<Window>) -> Result<Self> {
        let size = window.inner_size();
        let instance = Instance::default();

        let surface = instance.create_surface(window)?;

        let (adapter, device, queue) = pollster::block_on(async {
            let adapter = instance
                .request_adapter(&RequestAdapterOptions {
                    compatible_surface: Some(&surface),
                    ..Default::default()
                })
                .await
                .ok_or(anyhow!("No suitable adapter found."))?;

            let (device, queue) = adapter
                .request_device(&DeviceDescriptor::default(), None)
                .await?;

            Ok::<(wgpu::Adapter, wgpu::Device, wgpu::Queue), anyhow::Error>((
                adapter, device, queue,
            ))
        })?;

        let config = SurfaceConfiguration {
            usage: TextureUsages::RENDER_ATTACHMENT,
            format: *surface
                .get_capabilities(&adapter)
                .formats
                .first()
                .ok_or(anyhow!("No formats found."))?,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: wgpu::CompositeAlphaMode::Auto,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let uniform_layout = device.create_bind_group_layout(&BindGroupLayoutDescriptor {
            label: Some("text uniform layout"),
            entries: &[BindGroupLayoutEntry {
                binding: 0,
                visibility: ShaderStages::VERTEX | ShaderStages::FRAGMENT,
                ty: BindingType::Buffer {
                    ty: BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let glyph_layout = device.create_bind_group_layout(&BindGroupLayoutDescriptor {
            label: Some("glyph texture layout"),
            entries: &[
                BindGroupLayoutEntry {
                    binding: 0,
                    visibility: ShaderStages::FRAGMENT,
                    ty: BindingType::Texture {
                        sample_type: TextureSampleType::Float { filterable: true },
                        view_dimension: TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                BindGroupLayoutEntry {
                    binding: 1,
                    visibility: ShaderStages::FRAGMENT,
                    ty: BindingType::Sampler(SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        log::info!(
            "Render ready on {:?}, surface {}x{} {:?}",
            adapter.get_info().backend,
            config.width,
            config.height,
            config.format
        );

        Ok(Self {
            adapter,
            device,
            queue,
            surface,
            config,
            uniform_layout,
            glyph_layout,
            programs: Arena::new(),
            textures: Arena::new(),
            buffers: Arena::new(),
            current_program: None,
            frame: None,
        })
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    pub fn queue(&self) -> &Queue {
        &self.queue
    }

    pub fn surface_format(&self) -> TextureFormat {
        self.config.format
    }

    pub fn size(&self) -> PhysicalSize<u32> {
        PhysicalSize::new(self.config.width, self.config.height)
    }

    pub(crate) fn uniform_layout(&self) -> &BindGroupLayout {
        &self.uniform_layout
    }

    pub(crate) fn glyph_layout(&self) -> &BindGroupLayout {
        &self.glyph_layout
    }

    pub fn add_program(&mut self, program: ShaderProgram) -> ProgramHandle {
        ProgramHandle(self.programs.insert(program))
    }

    pub fn get_program(&self, handle: ProgramHandle) -> Result<&ShaderProgram> {
        self.programs
            .get(handle.0)
            .ok_or(anyhow!("No program found at index {:?}.", handle))
    }

    pub fn release_program(&mut self, handle: ProgramHandle) {
        if self.current_program == Some(handle) {
            self.current_program = None;
        }
        self.programs.remove(handle.0);
    }

    pub fn resize(&mut self, size: PhysicalSize<u32>) {
        if size.width == 0 || size.height == 0 {
            return;
        }
        self.config.width = size.width;
        self.config.height = size.height;
        self.surface.configure(&self.device, &self.config);
        log::debug!("Surface resized to {}x{}", size.width, size.height);
    }

    /// Acquires the next surface texture and clears it. Draws land on this frame
    /// until [Render::end_frame].
    pub fn begin_frame(&mut self, clear: Color) -> Result<()> {
        if self.frame.is_some() {
            return Err(anyhow!("A frame is already in flight."));
        }
        let surface_texture = self.surface.get_current_texture()?;
        let view = surface_texture
            .texture
            .create_view(&TextureViewDescriptor::default());

        let mut encoder = self
            .device
            .create_command_encoder(&CommandEncoderDescriptor::default());
        drop(encoder.begin_render_pass(&RenderPassDescriptor {
            label: Some("clear"),
            color_attachments: &[Some(RenderPassColorAttachment {
                view: &view,
                resolve_target: None,
                ops: Operations {
                    load: LoadOp::Clear(clear),
                    store: StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        }));
        self.queue.submit([encoder.finish()]);

        self.frame = Some(Frame {
            surface_texture,
            view,
        });
        Ok(())
    }

    pub fn end_frame(&mut self) {
        if let Some(frame) = self.frame.take() {
            frame.surface_texture.present();
        }
    }

    fn upload_glyph(&self, texture: &Texture) -> GlyphTexture {
        // wgpu has no zero-sized textures; empty glyphs get one transparent texel
        let (width, height, data) = if texture.is_empty() {
            (1, 1, &[0u8][..])
        } else {
            (texture.width(), texture.height(), texture.data.as_slice())
        };
        let size = Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        };

        let gpu_texture = self.device.create_texture(&TextureDescriptor {
            label: Some("glyph texture"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: TextureDimension::D2,
            format: TextureFormat::R8Unorm,
            usage: TextureUsages::TEXTURE_BINDING | TextureUsages::COPY_DST,
            view_formats: &[],
        });
        self.queue.write_texture(
            ImageCopyTexture {
                texture: &gpu_texture,
                mip_level: 0,
                origin: Origin3d::ZERO,
                aspect: TextureAspect::All,
            },
            data,
            // one byte per texel, rows tightly packed
            ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(width),
                rows_per_image: Some(height),
            },
            size,
        );

        let view = gpu_texture.create_view(&TextureViewDescriptor::default());
        let sampler = self.device.create_sampler(&SamplerDescriptor {
            label: Some("glyph sampler"),
            address_mode_u: texture.wrap,
            address_mode_v: texture.wrap,
            mag_filter: texture.filter,
            min_filter: texture.filter,
            ..Default::default()
        });
        let bind_group = self.device.create_bind_group(&BindGroupDescriptor {
            label: Some("glyph texture"),
            layout: &self.glyph_layout,
            entries: &[
                BindGroupEntry {
                    binding: 0,
                    resource: BindingResource::TextureView(&view),
                },
                BindGroupEntry {
                    binding: 1,
                    resource: BindingResource::Sampler(&sampler),
                },
            ],
        });

        GlyphTexture {
            _texture: gpu_texture,
            bind_group,
        }
    }
}

impl GraphicsContext for Render {
    fn create_texture(&mut self, texture: &Texture) -> Result<TextureHandle> {
        if !texture.is_consistent() {
            return Err(anyhow!(
                "Texture data is {} bytes, expected {}x{}.",
                texture.data.len(),
                texture.width(),
                texture.height()
            ));
        }
        let glyph = self.upload_glyph(texture);
        Ok(TextureHandle(self.textures.insert(glyph)))
    }

    fn release_texture(&mut self, handle: TextureHandle) {
        self.textures.remove(handle.0);
    }

    fn create_vertex_buffer(&mut self, size: u64) -> Result<BufferHandle> {
        let buffer = self.device.create_buffer(&BufferDescriptor {
            label: Some("text vertex buffer"),
            size,
            usage: BufferUsages::VERTEX | BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        Ok(BufferHandle(self.buffers.insert(buffer)))
    }

    fn write_vertex_buffer(&mut self, handle: BufferHandle, offset: u64, data: &[u8]) -> Result<()> {
        let buffer = self
            .buffers
            .get(handle.0)
            .ok_or(anyhow!("No buffer found at index {:?}.", handle))?;
        if offset + data.len() as u64 > buffer.size() {
            return Err(anyhow!(
                "Write of {} bytes at {} overflows a {} byte buffer.",
                data.len(),
                offset,
                buffer.size()
            ));
        }
        self.queue.write_buffer(buffer, offset, data);
        Ok(())
    }

    fn release_vertex_buffer(&mut self, handle: BufferHandle) {
        self.buffers.remove(handle.0);
    }

    fn use_program(&mut self, program: ProgramHandle) -> Result<()> {
        self.get_program(program)?;
        self.current_program = Some(program);
        Ok(())
    }

    fn set_uniform(&mut self, program: ProgramHandle, name: &str, value: Uniform) -> Result<()> {
        let shader = self
            .programs
            .get_mut(program.0)
            .ok_or(anyhow!("No program found at index {:?}.", program))?;
        shader.uniforms.set(name, value)?;
        self.queue
            .write_buffer(&shader.uniform_buffer, 0, shader.uniforms.as_bytes());
        Ok(())
    }

    fn draw(&mut self, call: DrawCall) -> Result<()> {
        if self.current_program != Some(call.program) {
            return Err(anyhow!("Program {:?} is not in use.", call.program));
        }
        let frame = self
            .frame
            .as_ref()
            .ok_or(anyhow!("No frame in flight; call begin_frame first."))?;
        let program = self.get_program(call.program)?;
        let buffer = self
            .buffers
            .get(call.vertex_buffer.0)
            .ok_or(anyhow!("No buffer found at index {:?}.", call.vertex_buffer))?;
        let texture = self
            .textures
            .get(call.texture.0)
            .ok_or(anyhow!("No texture found at index {:?}.", call.texture))?;

        let mut encoder = self
            .device
            .create_command_encoder(&CommandEncoderDescriptor::default());
        {
            let mut rpass = encoder.begin_render_pass(&RenderPassDescriptor {
                label: Some("text"),
                color_attachments: &[Some(RenderPassColorAttachment {
                    view: &frame.view,
                    resolve_target: None,
                    ops: Operations {
                        load: LoadOp::Load,
                        store: StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            rpass.set_pipeline(&program.pipeline);
            rpass.set_bind_group(0, &program.bind_group, &[]);
            rpass.set_bind_group(1, &texture.bind_group, &[]);
            rpass.set_vertex_buffer(0, buffer.slice(..));
            rpass.draw(0..call.vertex_count, 0..1);
        }
        self.queue.submit([encoder.finish()]);
        Ok(())
    }
}

impl Drop for Render {
    fn drop(&mut self) {
        log::debug!(
            "Dropping render ({:?}) with {} programs, {} textures, {} buffers",
            self.adapter.get_info().name,
            self.programs.len(),
            self.textures.len(),
            self.buffers.len()
        );
    }
}
