// each ascii glyph gets its own texture; a string is drawn as one textured
// quad per character, moving the pen by the glyph's advance

pub mod atlas;
pub mod quad;
pub mod rasterizer;
pub mod renderer;
