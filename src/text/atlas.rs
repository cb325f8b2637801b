use std::{collections::HashMap, ops::Range};

use nalgebra::Vector2;

use crate::{
    config::{validate_char_range, TextConfig},
    context::{GraphicsContext, TextureHandle},
    error::{TextError, TextResult},
};

use super::rasterizer::{FontdueRasterizer, GlyphRasterizer};

/// Everything needed to place and draw one character.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GlyphRecord {
    /// Owned by the atlas; released with it.
    pub texture: TextureHandle,
    /// Bitmap (width, height) in pixels.
    pub size: Vector2<u32>,
    /// (left, top) offset from the pen on the baseline to the bitmap's top-left.
    pub bearing: Vector2<i32>,
    /// In 1/64 pixel units.
    pub advance: u32,
}

impl GlyphRecord {
    /// Whole-pixel advance, `advance >> 6`.
    pub fn advance_px(&self) -> u32 {
        self.advance >> 6
    }
}

/// Glyph textures and metrics for one font at one pixel size.
///
/// Immutable once built. The textures live on the graphics context that built
/// the atlas, so the atlas has to be handed back to that context with
/// [`GlyphAtlas::destroy`] to release them.
#[derive(Debug)]
pub struct GlyphAtlas {
    glyphs: HashMap<char, GlyphRecord>,
    pixel_size: f32,
}

impl GlyphAtlas {
    /// Opens the configured font and builds its character range.
    pub fn from_config<G: GraphicsContext>(gfx: &mut G, config: &TextConfig) -> TextResult<Self> {
        config.validate()?;
        // the face is dropped on every path out of this function
        let rasterizer = FontdueRasterizer::open(&config.font_path, config.pixel_size)?;
        build_atlas(gfx, &rasterizer, config.char_range())
    }

    pub fn get(&self, character: char) -> Option<&GlyphRecord> {
        self.glyphs.get(&character)
    }

    pub fn glyph(&self, character: char) -> TextResult<&GlyphRecord> {
        self.get(character)
            .ok_or(TextError::UnmappedGlyph(character))
    }

    pub fn contains(&self, character: char) -> bool {
        self.glyphs.contains_key(&character)
    }

    pub fn len(&self) -> usize {
        self.glyphs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.glyphs.is_empty()
    }

    pub fn pixel_size(&self) -> f32 {
        self.pixel_size
    }

    pub fn iter(&self) -> impl Iterator<Item = (char, &GlyphRecord)> {
        self.glyphs.iter().map(|(c, record)| (*c, record))
    }

    /// Releases every glyph texture.
    pub fn destroy<G: GraphicsContext>(self, gfx: &mut G) {
        log::debug!("Releasing {} glyph textures", self.glyphs.len());
        for record in self.glyphs.into_values() {
            gfx.release_texture(record.texture);
        }
    }

    fn insert_glyph<G: GraphicsContext, R: GlyphRasterizer>(
        &mut self,
        gfx: &mut G,
        rasterizer: &R,
        code: u32,
    ) -> TextResult<()> {
        let character = char::from_u32(code).ok_or(TextError::GlyphRaster {
            code,
            reason: "not a valid character".into(),
        })?;
        let glyph = rasterizer.rasterize(code)?;
        let texture = gfx.create_texture(&glyph.bitmap)?;

        self.glyphs.insert(
            character,
            GlyphRecord {
                texture,
                size: Vector2::new(glyph.bitmap.width, glyph.bitmap.height),
                bearing: glyph.bearing,
                advance: glyph.advance,
            },
        );
        Ok(())
    }
}

/// Rasterizes and uploads every code in `range`.
///
/// Either every glyph makes it into the atlas or none do: on the first failure
/// all textures uploaded so far are released and the error is returned.
pub fn build_atlas<G: GraphicsContext, R: GlyphRasterizer>(
    gfx: &mut G,
    rasterizer: &R,
    range: Range<u32>,
) -> TextResult<GlyphAtlas> {
    validate_char_range(&range)?;
    log::info!(
        "Rasterizing {} glyphs at {}px",
        range.len(),
        rasterizer.pixel_size()
    );

    let mut atlas = GlyphAtlas {
        glyphs: HashMap::with_capacity(range.len()),
        pixel_size: rasterizer.pixel_size(),
    };

    for code in range {
        if let Err(err) = atlas.insert_glyph(gfx, rasterizer, code) {
            log::warn!("Glyph atlas build failed at {:#04x}: {}", code, err);
            atlas.destroy(gfx);
            return Err(err);
        }
    }

    log::info!("Glyph atlas built: {} glyphs", atlas.len());
    Ok(atlas)
}
