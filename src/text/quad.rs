use std::mem::size_of;

use crate::plain::Plain;

use super::atlas::GlyphRecord;

/// Position and texture coordinate, read by the shader as one `vec4` at location 0.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TextVertex {
    pub pos: [f32; 2],
    pub uv: [f32; 2],
}

unsafe impl Plain for TextVertex {}

pub const QUAD_VERTEX_COUNT: u32 = 6;

pub type QuadVertices = [TextVertex; QUAD_VERTEX_COUNT as usize];

/// Bytes needed to hold one quad: 6 vertices x 4 floats.
pub const QUAD_BUFFER_SIZE: u64 = size_of::<QuadVertices>() as u64;

/// A glyph's screen-space rectangle. `(x, y)` is the bottom-left corner.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GlyphQuad {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl GlyphQuad {
    /// Places `record` with its pen at `(x, y)` on the baseline.
    pub fn place(record: &GlyphRecord, x: f32, y: f32, scale: f32) -> Self {
        let size_x = record.size.x as f32;
        let size_y = record.size.y as f32;
        Self {
            x: x + record.bearing.x as f32 * scale,
            y: y - (size_y - record.bearing.y as f32) * scale,
            w: size_x * scale,
            h: size_y * scale,
        }
    }

    /// Two triangles; the bitmap's first row lands at the top of the quad.
    pub fn vertices(&self) -> QuadVertices {
        let (x0, y0) = (self.x, self.y);
        let (x1, y1) = (self.x + self.w, self.y + self.h);
        [
            vertex(x0, y1, 0.0, 0.0),
            vertex(x0, y0, 0.0, 1.0),
            vertex(x1, y0, 1.0, 1.0),
            vertex(x0, y1, 0.0, 0.0),
            vertex(x1, y0, 1.0, 1.0),
            vertex(x1, y1, 1.0, 0.0),
        ]
    }
}

const fn vertex(x: f32, y: f32, u: f32, v: f32) -> TextVertex {
    TextVertex {
        pos: [x, y],
        uv: [u, v],
    }
}
