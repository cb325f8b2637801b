//! Renders ASCII text with a per-glyph texture atlas.
//!
//! The text core ([text::atlas], [text::renderer]) talks to the GPU through
//! [context::GraphicsContext]; [render::Render] is the wgpu implementation.

pub mod config;
pub mod context;
pub mod error;
pub mod pipeline;
pub mod plain;
pub mod projection;
pub mod render;
pub mod text;
pub mod texture;
pub mod window;

#[cfg(test)]
pub(crate) mod testing;

pub use config::{TextConfig, UnmappedGlyphPolicy};
pub use error::{TextError, TextResult};
pub use text::{
    atlas::{build_atlas, GlyphAtlas, GlyphRecord},
    rasterizer::{FontdueRasterizer, GlyphRasterizer},
    renderer::{init_renderer, TextRenderer},
};
