use std::path::PathBuf;

pub type TextResult<T> = Result<T, TextError>;

/// Errors raised while building an atlas or drawing text.
#[derive(Debug, thiserror::Error)]
pub enum TextError {
    /// The font file could not be opened or parsed.
    #[error("Failed to load font {path:?}: {reason}")]
    FontLoad { path: PathBuf, reason: String },

    /// A character in the atlas range could not be rasterized.
    #[error("Failed to rasterize glyph {code:#04x}: {reason}")]
    GlyphRaster { code: u32, reason: String },

    /// A character passed to `render` has no glyph in the atlas.
    #[error("Character {0:?} not found in atlas")]
    UnmappedGlyph(char),

    /// Scales must be finite and non-negative.
    #[error("Invalid text scale {0}")]
    InvalidScale(f32),

    /// Viewport sizes must be finite and positive.
    #[error("Invalid viewport {0}x{1}")]
    InvalidViewport(f32, f32),

    #[error("Invalid text configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Graphics(#[from] anyhow::Error),
}
