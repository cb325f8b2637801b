use anyhow::{anyhow, Result};
use wgpu::{
    util::{BufferInitDescriptor, DeviceExt},
    vertex_attr_array, BindGroup, BindGroupDescriptor, BindGroupEntry, BlendState, Buffer,
    BufferUsages, ColorTargetState, ColorWrites, Face, FragmentState, MultisampleState,
    PipelineCompilationOptions, PipelineLayoutDescriptor, PrimitiveState, RenderPipeline,
    RenderPipelineDescriptor, ShaderModule, ShaderModuleDescriptor, TextureFormat,
    VertexBufferLayout, VertexState, VertexStepMode,
};

use crate::{
    context::{ProgramHandle, Uniform},
    plain::Plain,
    render::Render,
    text::{
        quad::TextVertex,
        renderer::{PROJECTION_UNIFORM, TEXT_COLOR_UNIFORM},
    },
};

/// Glyph shader: draws one R8 coverage texture tinted with `textColor`.
pub const TEXT_SHADER: &str = include_str!("shaders/text.wgsl");

/// CPU copy of the shader's uniform block.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TextUniforms {
    pub projection: [[f32; 4]; 4],
    pub text_color: [f32; 4],
}

unsafe impl Plain for TextUniforms {}

impl Default for TextUniforms {
    fn default() -> Self {
        Self {
            projection: nalgebra::Matrix4::<f32>::identity().into(),
            text_color: [1.0, 1.0, 1.0, 1.0],
        }
    }
}

impl TextUniforms {
    /// Assigns a uniform by its shader-facing name.
    pub fn set(&mut self, name: &str, value: Uniform) -> Result<()> {
        match (name, value) {
            (PROJECTION_UNIFORM, Uniform::Mat4(projection)) => self.projection = projection.into(),
            (TEXT_COLOR_UNIFORM, Uniform::Vec3([r, g, b])) => self.text_color = [r, g, b, 1.0],
            _ => return Err(anyhow!("Program has no uniform {:?} of type {:?}.", name, value)),
        }
        Ok(())
    }
}

/// A compiled text pipeline and its uniform block.
pub struct ShaderProgram {
    pub pipeline: RenderPipeline,
    pub uniforms: TextUniforms,
    pub uniform_buffer: Buffer,
    pub bind_group: BindGroup,
}

/// Builds a [ShaderProgram] from WGSL source with `vertex`/`fragment` entry points.
///
/// ```ignore
/// let program = ProgramBuilder::new().with_shader(TEXT_SHADER).build(&mut render)?;
/// ```
pub struct ProgramBuilder {
    shader_src: Option<String>,
    primitive_state: PrimitiveState,
    format: Option<TextureFormat>,
}

impl ProgramBuilder {
    pub fn new() -> Self {
        Self {
            shader_src: None,
            primitive_state: PrimitiveState::default(),
            format: None,
        }
    }

    pub fn with_cull_mode(mut self, cull_mode: Option<Face>) -> Self {
        self.primitive_state.cull_mode = cull_mode;
        self
    }

    pub fn with_shader(mut self, shader_src: &str) -> Self {
        self.shader_src = Some(shader_src.into());
        self
    }

    /// Defaults to the surface format.
    pub fn with_format(mut self, format: TextureFormat) -> Self {
        self.format = Some(format);
        self
    }

    fn create_module(&self, render: &Render) -> Result<ShaderModule> {
        let src = self
            .shader_src
            .as_ref()
            .ok_or(anyhow!("Shader source should be set."))?;
        Ok(render.device().create_shader_module(ShaderModuleDescriptor {
            label: Some("text shader"),
            source: wgpu::ShaderSource::Wgsl(src.as_str().into()),
        }))
    }

    pub fn build(&self, render: &mut Render) -> Result<ProgramHandle> {
        let module = self.create_module(render)?;
        let device = render.device();

        let layout = device.create_pipeline_layout(&PipelineLayoutDescriptor {
            label: Some("text pipeline layout"),
            bind_group_layouts: &[render.uniform_layout(), render.glyph_layout()],
            push_constant_ranges: &[],
        });

        let attributes = vertex_attr_array![0 => Float32x4];
        let pipeline = device.create_render_pipeline(&RenderPipelineDescriptor {
            label: Some("text pipeline"),
            layout: Some(&layout),
            vertex: VertexState {
                module: &module,
                entry_point: "vertex",
                buffers: &[VertexBufferLayout {
                    array_stride: std::mem::size_of::<TextVertex>() as u64,
                    step_mode: VertexStepMode::Vertex,
                    attributes: &attributes,
                }],
                compilation_options: PipelineCompilationOptions::default(),
            },
            primitive: self.primitive_state,
            depth_stencil: None,
            multisample: MultisampleState::default(),
            fragment: Some(FragmentState {
                module: &module,
                entry_point: "fragment",
                targets: &[Some(ColorTargetState {
                    format: self.format.unwrap_or(render.surface_format()),
                    blend: Some(BlendState::ALPHA_BLENDING),
                    write_mask: ColorWrites::all(),
                })],
                compilation_options: PipelineCompilationOptions::default(),
            }),
            multiview: None,
        });

        let uniforms = TextUniforms::default();
        let uniform_buffer = device.create_buffer_init(&BufferInitDescriptor {
            label: Some("text uniforms"),
            contents: uniforms.as_bytes(),
            usage: BufferUsages::UNIFORM | BufferUsages::COPY_DST,
        });
        let bind_group = device.create_bind_group(&BindGroupDescriptor {
            label: Some("text uniforms"),
            layout: render.uniform_layout(),
            entries: &[BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        Ok(render.add_program(ShaderProgram {
            pipeline,
            uniforms,
            uniform_buffer,
            bind_group,
        }))
    }
}

impl Default for ProgramBuilder {
    fn default() -> Self {
        Self::new()
    }
}
