use std::{
    fs::File,
    io::{BufReader, Read},
    path::{Path, PathBuf},
};

use fontdue::{Font, FontSettings, Metrics};
use nalgebra::Vector2;

use crate::{
    error::{TextError, TextResult},
    texture::Texture,
};

/// A bitmap plus the metrics needed to place it on a baseline.
#[derive(Clone, Debug, PartialEq)]
pub struct RasterizedGlyph {
    pub bitmap: Texture,
    /// (left, top) offset from the pen position on the baseline to the bitmap's top-left.
    pub bearing: Vector2<i32>,
    /// Horizontal advance in 1/64 pixel units.
    pub advance: u32,
}

/// Turns character codes into bitmaps at a fixed pixel size.
pub trait GlyphRasterizer {
    fn pixel_size(&self) -> f32;

    fn rasterize(&self, code: u32) -> TextResult<RasterizedGlyph>;
}

/// Rasterizes glyphs from a TrueType/OpenType face with `fontdue`.
///
/// Characters the face has no outline for resolve to its `.notdef` glyph.
pub struct FontdueRasterizer {
    font: Font,
    px: f32,
}

impl FontdueRasterizer {
    pub fn open<P: AsRef<Path>>(font_path: P, px: f32) -> TextResult<Self> {
        let path = font_path.as_ref();
        let load_err = |reason: String| TextError::FontLoad {
            path: path.to_path_buf(),
            reason,
        };

        let file = File::open(path).map_err(|err| load_err(err.to_string()))?;
        let mut reader = BufReader::new(file);
        let mut buf = Vec::new();
        reader
            .read_to_end(&mut buf)
            .map_err(|err| load_err(err.to_string()))?;

        Self::from_bytes(buf, px, path)
    }

    /// `origin` is only used to label errors.
    pub fn from_bytes<P: AsRef<Path>>(bytes: Vec<u8>, px: f32, origin: P) -> TextResult<Self> {
        let font = Font::from_bytes(bytes, FontSettings::default()).map_err(|err| {
            TextError::FontLoad {
                path: PathBuf::from(origin.as_ref()),
                reason: err.to_string(),
            }
        })?;
        log::debug!("Loaded font {:?} with {} glyphs", origin.as_ref(), font.glyph_count());
        Ok(Self { font, px })
    }
}

impl GlyphRasterizer for FontdueRasterizer {
    fn pixel_size(&self) -> f32 {
        self.px
    }

    fn rasterize(&self, code: u32) -> TextResult<RasterizedGlyph> {
        let c = char::from_u32(code).ok_or(TextError::GlyphRaster {
            code,
            reason: "not a valid character".into(),
        })?;
        let (metrics, bitmap) = self.font.rasterize(c, self.px);
        glyph_from_metrics(code, metrics, bitmap)
    }
}

fn glyph_from_metrics(code: u32, metrics: Metrics, bitmap: Vec<u8>) -> TextResult<RasterizedGlyph> {
    let raster_err = |reason: String| TextError::GlyphRaster { code, reason };

    let width = u32::try_from(metrics.width).map_err(|err| raster_err(err.to_string()))?;
    let height = u32::try_from(metrics.height).map_err(|err| raster_err(err.to_string()))?;
    let bitmap = Texture::glyph(width, height, bitmap);
    if !bitmap.is_consistent() {
        return Err(raster_err(format!(
            "bitmap holds {} bytes, expected {}x{}",
            bitmap.data.len(),
            width,
            height
        )));
    }

    if !metrics.advance_width.is_finite() || metrics.advance_width < 0.0 {
        return Err(raster_err(format!(
            "unusable advance width {}",
            metrics.advance_width
        )));
    }
    let advance = (metrics.advance_width * 64.0).round() as u32;

    // fontdue measures ymin from the baseline to the bitmap's bottom edge
    let bearing = Vector2::new(metrics.xmin, metrics.ymin + height as i32);

    Ok(RasterizedGlyph {
        bitmap,
        bearing,
        advance,
    })
}
