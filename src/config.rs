use std::{
    fs,
    ops::Range,
    path::{Path, PathBuf},
};

use serde::Deserialize;

use crate::error::{TextError, TextResult};

pub const DEFAULT_FONT_PATH: &str = "fonts/arial.ttf";
pub const DEFAULT_PIXEL_SIZE: f32 = 48.0;
/// Codes in `[0, 128)` are built by default.
pub const DEFAULT_CHAR_RANGE: Range<u32> = 0..128;
/// Atlases only cover the 8-bit character space.
pub const MAX_CHAR_CODE: u32 = 256;

/// What `TextRenderer::render` does with a character the atlas has no glyph for.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum UnmappedGlyphPolicy {
    /// Reject the whole string before anything is drawn.
    #[default]
    Fail,
    /// Draw nothing for the character and move the cursor by `advance` (1/64 px).
    Skip { advance: u32 },
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct TextConfig {
    pub font_path: PathBuf,
    pub pixel_size: f32,
    pub first_char: u32,
    pub end_char: u32,
    pub unmapped: UnmappedGlyphPolicy,
}

impl Default for TextConfig {
    fn default() -> Self {
        Self {
            font_path: DEFAULT_FONT_PATH.into(),
            pixel_size: DEFAULT_PIXEL_SIZE,
            first_char: DEFAULT_CHAR_RANGE.start,
            end_char: DEFAULT_CHAR_RANGE.end,
            unmapped: UnmappedGlyphPolicy::default(),
        }
    }
}

impl TextConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_font_path<P: AsRef<Path>>(mut self, font_path: P) -> Self {
        self.font_path = font_path.as_ref().to_path_buf();
        self
    }

    pub fn with_pixel_size(mut self, pixel_size: f32) -> Self {
        self.pixel_size = pixel_size;
        self
    }

    pub fn with_char_range(mut self, range: Range<u32>) -> Self {
        self.first_char = range.start;
        self.end_char = range.end;
        self
    }

    pub fn with_unmapped_policy(mut self, policy: UnmappedGlyphPolicy) -> Self {
        self.unmapped = policy;
        self
    }

    pub fn char_range(&self) -> Range<u32> {
        self.first_char..self.end_char
    }

    /// Parses a config from TOML. Missing keys fall back to the defaults.
    pub fn from_toml_str(src: &str) -> TextResult<Self> {
        let config: Self = toml::from_str(src).map_err(|err| TextError::Config(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> TextResult<Self> {
        let src = fs::read_to_string(path.as_ref()).map_err(|err| {
            TextError::Config(format!("couldn't read {:?}: {}", path.as_ref(), err))
        })?;
        Self::from_toml_str(&src)
    }

    pub fn validate(&self) -> TextResult<()> {
        if !self.pixel_size.is_finite() || self.pixel_size <= 0.0 {
            return Err(TextError::Config(format!(
                "pixel_size must be positive, got {}",
                self.pixel_size
            )));
        }
        validate_char_range(&self.char_range())
    }
}

pub(crate) fn validate_char_range(range: &Range<u32>) -> TextResult<()> {
    if range.is_empty() || range.end > MAX_CHAR_CODE {
        return Err(TextError::Config(format!(
            "character range {:?} must be non-empty and within [0, {})",
            range, MAX_CHAR_CODE
        )));
    }
    Ok(())
}
