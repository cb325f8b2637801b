use anyhow::Result;
use generational_arena::Index;
use nalgebra::Matrix4;

use crate::texture::Texture;

#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub struct TextureHandle(pub Index);

#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub struct BufferHandle(pub Index);

#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub struct ProgramHandle(pub Index);

/// Values that can be bound to a named uniform on a program.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Uniform {
    Mat4(Matrix4<f32>),
    Vec3([f32; 3]),
}

/// One triangle-list draw from the start of `vertex_buffer`, sampling `texture`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DrawCall {
    pub program: ProgramHandle,
    pub vertex_buffer: BufferHandle,
    pub texture: TextureHandle,
    pub vertex_count: u32,
}

/// The slice of a graphics device the text core issues calls against.
///
/// Creation and teardown of the device itself stay with the caller.
/// Implementations are not expected to be shared between threads: bound state
/// (current program, buffer contents) is mutated by every call.
pub trait GraphicsContext {
    /// Uploads a single-channel texture. Rows in `texture.data` are unpadded.
    fn create_texture(&mut self, texture: &Texture) -> Result<TextureHandle>;

    fn release_texture(&mut self, handle: TextureHandle);

    /// Allocates a vertex buffer of `size` bytes that is expected to be rewritten often.
    fn create_vertex_buffer(&mut self, size: u64) -> Result<BufferHandle>;

    /// Overwrites part of an existing buffer. Never reallocates.
    fn write_vertex_buffer(&mut self, handle: BufferHandle, offset: u64, data: &[u8]) -> Result<()>;

    fn release_vertex_buffer(&mut self, handle: BufferHandle);

    fn use_program(&mut self, program: ProgramHandle) -> Result<()>;

    fn set_uniform(&mut self, program: ProgramHandle, name: &str, value: Uniform) -> Result<()>;

    fn draw(&mut self, call: DrawCall) -> Result<()>;
}
