//! In-memory stand-ins for the graphics device and the font face.

use std::collections::HashMap;

use anyhow::{anyhow, Result};
use generational_arena::Arena;
use nalgebra::Vector2;

use crate::{
    context::{BufferHandle, DrawCall, GraphicsContext, ProgramHandle, TextureHandle, Uniform},
    error::{TextError, TextResult},
    text::rasterizer::{GlyphRasterizer, RasterizedGlyph},
    texture::Texture,
};

#[derive(Clone, Debug, PartialEq)]
pub enum Call {
    CreateTexture(TextureHandle),
    ReleaseTexture(TextureHandle),
    CreateBuffer { handle: BufferHandle, size: u64 },
    WriteBuffer {
        handle: BufferHandle,
        offset: u64,
        data: Vec<u8>,
    },
    ReleaseBuffer(BufferHandle),
    UseProgram(ProgramHandle),
    SetUniform {
        program: ProgramHandle,
        name: String,
        value: Uniform,
    },
    Draw(DrawCall),
}

/// Keeps every resource in arenas and logs each call in order.
pub struct RecordingContext {
    textures: Arena<Texture>,
    buffers: Arena<Vec<u8>>,
    programs: Arena<HashMap<String, Uniform>>,
    texture_budget: Option<usize>,
    pub calls: Vec<Call>,
}

impl RecordingContext {
    pub fn new() -> Self {
        Self {
            textures: Arena::new(),
            buffers: Arena::new(),
            programs: Arena::new(),
            texture_budget: None,
            calls: Vec::new(),
        }
    }

    /// Texture creation starts failing once `count` textures have been made.
    pub fn fail_textures_after(mut self, count: usize) -> Self {
        self.texture_budget = Some(count);
        self
    }

    pub fn add_program(&mut self) -> ProgramHandle {
        ProgramHandle(self.programs.insert(HashMap::new()))
    }

    pub fn remove_program(&mut self, program: ProgramHandle) {
        self.programs.remove(program.0);
    }

    pub fn has_program(&self, program: ProgramHandle) -> bool {
        self.programs.contains(program.0)
    }

    pub fn uniform(&self, program: ProgramHandle, name: &str) -> Option<Uniform> {
        self.programs.get(program.0)?.get(name).copied()
    }

    pub fn texture(&self, handle: TextureHandle) -> Option<&Texture> {
        self.textures.get(handle.0)
    }

    pub fn live_textures(&self) -> usize {
        self.textures.len()
    }

    pub fn live_buffers(&self) -> usize {
        self.buffers.len()
    }

    pub fn buffer_size(&self, handle: BufferHandle) -> Option<u64> {
        self.buffers.get(handle.0).map(|data| data.len() as u64)
    }

    pub fn draws(&self) -> Vec<DrawCall> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                Call::Draw(draw) => Some(*draw),
                _ => None,
            })
            .collect()
    }

    /// Every vertex buffer write, decoded back into floats.
    pub fn vertex_writes(&self) -> Vec<Vec<f32>> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                Call::WriteBuffer { data, .. } => Some(
                    data.chunks_exact(4)
                        .map(|b| f32::from_ne_bytes([b[0], b[1], b[2], b[3]]))
                        .collect(),
                ),
                _ => None,
            })
            .collect()
    }

    /// Drains the call log, returning the raw bytes of every vertex write.
    pub fn take_vertex_bytes(&mut self) -> Vec<Vec<u8>> {
        self.calls
            .drain(..)
            .filter_map(|call| match call {
                Call::WriteBuffer { data, .. } => Some(data),
                _ => None,
            })
            .collect()
    }
}

impl GraphicsContext for RecordingContext {
    fn create_texture(&mut self, texture: &Texture) -> Result<TextureHandle> {
        if let Some(budget) = self.texture_budget {
            if self.textures.len() >= budget {
                return Err(anyhow!("Out of texture memory."));
            }
        }
        let handle = TextureHandle(self.textures.insert(texture.clone()));
        self.calls.push(Call::CreateTexture(handle));
        Ok(handle)
    }

    fn release_texture(&mut self, handle: TextureHandle) {
        self.textures.remove(handle.0);
        self.calls.push(Call::ReleaseTexture(handle));
    }

    fn create_vertex_buffer(&mut self, size: u64) -> Result<BufferHandle> {
        let handle = BufferHandle(self.buffers.insert(vec![0; size as usize]));
        self.calls.push(Call::CreateBuffer { handle, size });
        Ok(handle)
    }

    fn write_vertex_buffer(&mut self, handle: BufferHandle, offset: u64, data: &[u8]) -> Result<()> {
        let buffer = self
            .buffers
            .get_mut(handle.0)
            .ok_or(anyhow!("No buffer for handle {:?}", handle))?;
        let start = offset as usize;
        let end = start + data.len();
        if end > buffer.len() {
            return Err(anyhow!("Write of {} bytes at {} overflows buffer", data.len(), offset));
        }
        buffer[start..end].copy_from_slice(data);
        self.calls.push(Call::WriteBuffer {
            handle,
            offset,
            data: data.to_vec(),
        });
        Ok(())
    }

    fn release_vertex_buffer(&mut self, handle: BufferHandle) {
        self.buffers.remove(handle.0);
        self.calls.push(Call::ReleaseBuffer(handle));
    }

    fn use_program(&mut self, program: ProgramHandle) -> Result<()> {
        if !self.programs.contains(program.0) {
            return Err(anyhow!("No program for handle {:?}", program));
        }
        self.calls.push(Call::UseProgram(program));
        Ok(())
    }

    fn set_uniform(&mut self, program: ProgramHandle, name: &str, value: Uniform) -> Result<()> {
        let uniforms = self
            .programs
            .get_mut(program.0)
            .ok_or(anyhow!("No program for handle {:?}", program))?;
        uniforms.insert(name.to_string(), value);
        self.calls.push(Call::SetUniform {
            program,
            name: name.to_string(),
            value,
        });
        Ok(())
    }

    fn draw(&mut self, call: DrawCall) -> Result<()> {
        if !self.textures.contains(call.texture.0) || !self.buffers.contains(call.vertex_buffer.0) {
            return Err(anyhow!("Draw references a released resource"));
        }
        self.calls.push(Call::Draw(call));
        Ok(())
    }
}

/// Deterministic glyphs: 'A' is 30x40 with bearing (2, 38) and a 32px advance,
/// ' ' is empty, everything else is a small box advancing 10px.
pub struct FakeRasterizer {
    px: f32,
    failing_at: Option<u32>,
}

impl FakeRasterizer {
    pub fn new() -> Self {
        Self {
            px: 48.0,
            failing_at: None,
        }
    }

    pub fn with_pixel_size(mut self, px: f32) -> Self {
        self.px = px;
        self
    }

    pub fn failing_at(mut self, code: u32) -> Self {
        self.failing_at = Some(code);
        self
    }
}

impl GlyphRasterizer for FakeRasterizer {
    fn pixel_size(&self) -> f32 {
        self.px
    }

    fn rasterize(&self, code: u32) -> TextResult<RasterizedGlyph> {
        if self.failing_at == Some(code) {
            return Err(TextError::GlyphRaster {
                code,
                reason: "missing outline".into(),
            });
        }

        let (width, height, bearing, advance) = match char::from_u32(code) {
            Some('A') => (30, 40, Vector2::new(2, 38), 2048),
            Some(' ') => (0, 0, Vector2::new(0, 0), 640),
            _ => (6 + code % 4, 12, Vector2::new(1, 10), 640),
        };

        Ok(RasterizedGlyph {
            bitmap: Texture::glyph(width, height, vec![code as u8; (width * height) as usize]),
            bearing,
            advance,
        })
    }
}
