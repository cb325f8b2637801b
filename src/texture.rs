use wgpu::{AddressMode, FilterMode};

/// A single-channel (one byte per pixel) bitmap, stored row-major top-down with no row padding.
#[derive(Clone, Debug, PartialEq)]
pub struct Texture {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub wrap: AddressMode,
    pub filter: FilterMode,
}

impl Texture {
    /// A glyph bitmap: clamped on both axes, linearly filtered for minify and magnify.
    pub fn glyph(width: u32, height: u32, data: Vec<u8>) -> Self {
        Self {
            data,
            width,
            height,
            wrap: AddressMode::ClampToEdge,
            filter: FilterMode::Linear,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Rows are tightly packed, so the stride is the width in bytes.
    pub fn bytes_per_row(&self) -> u32 {
        self.width
    }

    /// Glyphs such as ' ' rasterize to nothing.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn is_consistent(&self) -> bool {
        self.data.len() == (self.width as usize) * (self.height as usize)
    }
}
