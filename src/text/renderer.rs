use nalgebra::Matrix4;

use crate::{
    config::{TextConfig, UnmappedGlyphPolicy},
    context::{BufferHandle, DrawCall, GraphicsContext, ProgramHandle, Uniform},
    error::{TextError, TextResult},
    plain::Plain,
    projection::screen_projection,
};

use super::{
    atlas::GlyphAtlas,
    quad::{GlyphQuad, QUAD_BUFFER_SIZE, QUAD_VERTEX_COUNT},
};

pub const PROJECTION_UNIFORM: &str = "projection";
pub const TEXT_COLOR_UNIFORM: &str = "textColor";

/// Draws strings one textured quad per character.
///
/// The renderer owns its atlas and a single quad-sized vertex buffer that is
/// rewritten for every glyph. It borrows `program`: whoever created the
/// program has to keep it alive until after [`TextRenderer::destroy`].
///
/// Every method takes `&mut self`, and the buffer contents are only valid for
/// the glyph currently being drawn, so a renderer must not be shared between
/// threads without a lock held across each whole `render` call.
#[derive(Debug)]
pub struct TextRenderer {
    atlas: GlyphAtlas,
    program: ProgramHandle,
    vertex_buffer: BufferHandle,
    projection: Matrix4<f32>,
    unmapped: UnmappedGlyphPolicy,
}

impl TextRenderer {
    pub fn new<G: GraphicsContext>(
        gfx: &mut G,
        program: ProgramHandle,
        atlas: GlyphAtlas,
        width: f32,
        height: f32,
    ) -> TextResult<Self> {
        let projection = match viewport_projection(width, height) {
            Ok(projection) => projection,
            Err(err) => {
                atlas.destroy(gfx);
                return Err(err);
            }
        };
        let vertex_buffer = match Self::init_device_state(gfx, program, projection) {
            Ok(buffer) => buffer,
            Err(err) => {
                atlas.destroy(gfx);
                return Err(err);
            }
        };

        log::info!(
            "Text renderer ready: {} glyphs, {}x{} viewport",
            atlas.len(),
            width,
            height
        );

        Ok(Self {
            atlas,
            program,
            vertex_buffer,
            projection,
            unmapped: UnmappedGlyphPolicy::default(),
        })
    }

    fn init_device_state<G: GraphicsContext>(
        gfx: &mut G,
        program: ProgramHandle,
        projection: Matrix4<f32>,
    ) -> TextResult<BufferHandle> {
        gfx.use_program(program)?;
        gfx.set_uniform(program, PROJECTION_UNIFORM, Uniform::Mat4(projection))?;
        // contents are written per glyph at draw time
        Ok(gfx.create_vertex_buffer(QUAD_BUFFER_SIZE)?)
    }

    pub fn with_unmapped_policy(mut self, policy: UnmappedGlyphPolicy) -> Self {
        self.unmapped = policy;
        self
    }

    pub fn atlas(&self) -> &GlyphAtlas {
        &self.atlas
    }

    pub fn projection(&self) -> &Matrix4<f32> {
        &self.projection
    }

    pub fn unmapped_policy(&self) -> UnmappedGlyphPolicy {
        self.unmapped
    }

    /// Draws `text` left to right with its first pen position at `(x, y)` on the
    /// baseline and returns the pen x after the last character.
    ///
    /// Geometry is recomputed on every call.
    pub fn render<G: GraphicsContext>(
        &mut self,
        gfx: &mut G,
        text: &str,
        x: f32,
        y: f32,
        scale: f32,
        color: [f32; 3],
    ) -> TextResult<f32> {
        if !scale.is_finite() || scale < 0.0 {
            return Err(TextError::InvalidScale(scale));
        }
        if self.unmapped == UnmappedGlyphPolicy::Fail {
            if let Some(c) = text.chars().find(|c| !self.atlas.contains(*c)) {
                return Err(TextError::UnmappedGlyph(c));
            }
        }

        gfx.use_program(self.program)?;
        gfx.set_uniform(self.program, TEXT_COLOR_UNIFORM, Uniform::Vec3(color))?;

        let mut x = x;
        for c in text.chars() {
            let Some(record) = self.atlas.get(c) else {
                // only reachable with the skip policy
                if let UnmappedGlyphPolicy::Skip { advance } = self.unmapped {
                    log::debug!("Skipping unmapped character {:?}", c);
                    x += (advance >> 6) as f32 * scale;
                }
                continue;
            };

            let vertices = GlyphQuad::place(record, x, y, scale).vertices();
            gfx.write_vertex_buffer(self.vertex_buffer, 0, vertices.as_bytes())?;
            gfx.draw(DrawCall {
                program: self.program,
                vertex_buffer: self.vertex_buffer,
                texture: record.texture,
                vertex_count: QUAD_VERTEX_COUNT,
            })?;

            x += record.advance_px() as f32 * scale;
        }

        Ok(x)
    }

    /// Recomputes the projection for a new surface size. Call on every resize.
    ///
    /// A zero or non-finite size is rejected and the previous projection kept.
    pub fn update_size<G: GraphicsContext>(
        &mut self,
        gfx: &mut G,
        width: f32,
        height: f32,
    ) -> TextResult<()> {
        let projection = viewport_projection(width, height)?;
        log::debug!("Text projection resized to {}x{}", width, height);
        self.projection = projection;
        gfx.use_program(self.program)?;
        gfx.set_uniform(
            self.program,
            PROJECTION_UNIFORM,
            Uniform::Mat4(self.projection),
        )?;
        Ok(())
    }

    /// Releases the vertex buffer and the atlas textures. The program is left alone.
    pub fn destroy<G: GraphicsContext>(self, gfx: &mut G) {
        gfx.release_vertex_buffer(self.vertex_buffer);
        self.atlas.destroy(gfx);
    }
}

fn viewport_projection(width: f32, height: f32) -> TextResult<Matrix4<f32>> {
    let valid = |side: f32| side.is_finite() && side > 0.0;
    if !valid(width) || !valid(height) {
        return Err(TextError::InvalidViewport(width, height));
    }
    Ok(screen_projection(width, height))
}

/// Builds the configured font's atlas and a renderer around it.
pub fn init_renderer<G: GraphicsContext>(
    gfx: &mut G,
    program: ProgramHandle,
    config: &TextConfig,
    width: f32,
    height: f32,
) -> TextResult<TextRenderer> {
    let atlas = GlyphAtlas::from_config(gfx, config)?;
    Ok(TextRenderer::new(gfx, program, atlas, width, height)?.with_unmapped_policy(config.unmapped))
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use crate::{
        testing::{Call, FakeRasterizer, RecordingContext},
        text::atlas::build_atlas,
    };

    use super::*;

    const WHITE: [f32; 3] = [1.0, 1.0, 1.0];

    fn renderer(gfx: &mut RecordingContext, width: f32, height: f32) -> TextRenderer {
        let program = gfx.add_program();
        let atlas = build_atlas(gfx, &FakeRasterizer::new(), 0..128).unwrap();
        TextRenderer::new(gfx, program, atlas, width, height).unwrap()
    }

    #[test]
    fn construction_uploads_projection_and_allocates_one_quad() {
        let mut gfx = RecordingContext::new();
        let text = renderer(&mut gfx, 800.0, 600.0);

        assert_eq!(gfx.live_buffers(), 1);
        assert_eq!(gfx.buffer_size(text.vertex_buffer), Some(96));
        assert_eq!(
            gfx.uniform(text.program, PROJECTION_UNIFORM),
            Some(Uniform::Mat4(screen_projection(800.0, 600.0)))
        );
        assert!(gfx.vertex_writes().is_empty());
    }

    #[test]
    fn empty_string_draws_nothing() {
        let mut gfx = RecordingContext::new();
        let mut text = renderer(&mut gfx, 800.0, 600.0);

        let end = text.render(&mut gfx, "", 12.0, 30.0, 1.0, WHITE).unwrap();

        assert_eq!(end, 12.0);
        assert!(gfx.draws().is_empty());
        assert!(gfx.vertex_writes().is_empty());
    }

    #[test]
    fn single_glyph_matches_reference_layout() {
        let mut gfx = RecordingContext::new();
        let mut text = renderer(&mut gfx, 800.0, 600.0);

        let end = text.render(&mut gfx, "A", 100.0, 200.0, 1.0, WHITE).unwrap();
        assert_eq!(end, 132.0);

        let writes = gfx.vertex_writes();
        assert_eq!(writes.len(), 1);
        assert_eq!(
            writes[0],
            vec![
                102.0, 238.0, 0.0, 0.0, //
                102.0, 198.0, 0.0, 1.0, //
                132.0, 198.0, 1.0, 1.0, //
                102.0, 238.0, 0.0, 0.0, //
                132.0, 198.0, 1.0, 1.0, //
                132.0, 238.0, 1.0, 0.0,
            ]
        );

        let draws = gfx.draws();
        assert_eq!(draws.len(), 1);
        assert_eq!(draws[0].texture, text.atlas().glyph('A').unwrap().texture);
        assert_eq!(draws[0].vertex_count, 6);
        assert_eq!(draws[0].vertex_buffer, text.vertex_buffer);
    }

    #[test]
    fn cursor_advances_by_whole_pixels() {
        let mut gfx = RecordingContext::new();
        let mut text = renderer(&mut gfx, 800.0, 600.0);
        let advance = text.atlas().glyph('A').unwrap().advance;

        for (n, scale, y) in [(1, 1.0, 0.0), (5, 0.5, 17.0), (9, 2.25, -40.0)] {
            let s = "A".repeat(n);
            let end = text.render(&mut gfx, &s, 10.0, y, scale, [0.2, 0.4, 0.6]).unwrap();
            assert_relative_eq!(end, 10.0 + n as f32 * (advance >> 6) as f32 * scale);
        }
    }

    #[test]
    fn draws_in_order_with_one_buffer() {
        let mut gfx = RecordingContext::new();
        let mut text = renderer(&mut gfx, 800.0, 600.0);

        text.render(&mut gfx, "Hey!", 0.0, 0.0, 1.0, WHITE).unwrap();

        let expected = "Hey!"
            .chars()
            .map(|c| text.atlas().glyph(c).unwrap().texture)
            .collect::<Vec<_>>();
        let drawn = gfx.draws().iter().map(|d| d.texture).collect::<Vec<_>>();
        assert_eq!(drawn, expected);

        // every write targets the same buffer at offset 0, immediately before its draw
        let mut last_was_write = false;
        for call in &gfx.calls {
            match call {
                Call::WriteBuffer { handle, offset, .. } => {
                    assert_eq!(*handle, text.vertex_buffer);
                    assert_eq!(*offset, 0);
                    last_was_write = true;
                }
                Call::Draw(_) => {
                    assert!(last_was_write);
                    last_was_write = false;
                }
                _ => {}
            }
        }
        assert_eq!(gfx.live_buffers(), 1);
    }

    #[test]
    fn text_color_is_bound_per_call() {
        let mut gfx = RecordingContext::new();
        let mut text = renderer(&mut gfx, 800.0, 600.0);

        text.render(&mut gfx, "a", 0.0, 0.0, 1.0, [0.5, 0.8, 0.2]).unwrap();
        assert_eq!(
            gfx.uniform(text.program, TEXT_COLOR_UNIFORM),
            Some(Uniform::Vec3([0.5, 0.8, 0.2]))
        );
    }

    #[test]
    fn identical_calls_are_bit_identical() {
        let mut gfx = RecordingContext::new();
        let mut text = renderer(&mut gfx, 800.0, 600.0);

        text.render(&mut gfx, "Quartz glyph", 13.5, 77.25, 0.75, WHITE).unwrap();
        let first = gfx.take_vertex_bytes();
        text.render(&mut gfx, "Quartz glyph", 13.5, 77.25, 0.75, WHITE).unwrap();
        let second = gfx.take_vertex_bytes();

        assert!(!first.is_empty());
        assert_eq!(first, second);
    }

    #[test]
    fn resize_matches_fresh_renderer() {
        let mut resized_gfx = RecordingContext::new();
        let mut resized = renderer(&mut resized_gfx, 800.0, 600.0);
        resized.update_size(&mut resized_gfx, 1920.0, 1080.0).unwrap();
        resized.render(&mut resized_gfx, "resize", 40.0, 500.0, 1.5, WHITE).unwrap();

        let mut fresh_gfx = RecordingContext::new();
        let mut fresh = renderer(&mut fresh_gfx, 1920.0, 1080.0);
        fresh.render(&mut fresh_gfx, "resize", 40.0, 500.0, 1.5, WHITE).unwrap();

        assert_eq!(resized_gfx.take_vertex_bytes(), fresh_gfx.take_vertex_bytes());
        assert_eq!(resized.projection(), fresh.projection());
        assert_eq!(
            resized_gfx.uniform(resized.program, PROJECTION_UNIFORM),
            Some(Uniform::Mat4(screen_projection(1920.0, 1080.0)))
        );
    }

    #[test]
    fn quads_scale_linearly() {
        let mut gfx = RecordingContext::new();
        let mut text = renderer(&mut gfx, 800.0, 600.0);

        text.render(&mut gfx, "A", 0.0, 0.0, 0.5, WHITE).unwrap();
        text.render(&mut gfx, "A", 0.0, 0.0, 1.5, WHITE).unwrap();
        let writes = gfx.vertex_writes();

        let extent = |v: &[f32]| (v[8] - v[0], v[1] - v[5]);
        let (w1, h1) = extent(&writes[0]);
        let (w2, h2) = extent(&writes[1]);
        assert_relative_eq!(w2, w1 * 3.0);
        assert_relative_eq!(h2, h1 * 3.0);
    }

    #[test]
    fn zero_scale_is_not_an_error() {
        let mut gfx = RecordingContext::new();
        let mut text = renderer(&mut gfx, 800.0, 600.0);

        let end = text.render(&mut gfx, "AA", 5.0, 5.0, 0.0, WHITE).unwrap();
        assert_eq!(end, 5.0);
        assert_eq!(gfx.draws().len(), 2);
    }

    #[test]
    fn negative_scale_is_rejected() {
        let mut gfx = RecordingContext::new();
        let mut text = renderer(&mut gfx, 800.0, 600.0);

        let err = text.render(&mut gfx, "A", 0.0, 0.0, -1.0, WHITE).unwrap_err();
        assert!(matches!(err, TextError::InvalidScale(_)));
        assert!(gfx.draws().is_empty());
    }

    #[test]
    fn unmapped_character_fails_before_drawing() {
        let mut gfx = RecordingContext::new();
        let mut text = renderer(&mut gfx, 800.0, 600.0);

        let err = text.render(&mut gfx, "ok é", 0.0, 0.0, 1.0, WHITE).unwrap_err();
        assert!(matches!(err, TextError::UnmappedGlyph('é')));
        assert!(gfx.draws().is_empty());
        assert!(gfx.vertex_writes().is_empty());
    }

    #[test]
    fn skip_policy_advances_past_unmapped_characters() {
        let mut gfx = RecordingContext::new();
        let mut text = renderer(&mut gfx, 800.0, 600.0)
            .with_unmapped_policy(UnmappedGlyphPolicy::Skip { advance: 10 * 64 });

        let end = text.render(&mut gfx, "AéA", 0.0, 0.0, 2.0, WHITE).unwrap();

        assert_eq!(gfx.draws().len(), 2);
        assert_eq!(end, 32.0 * 2.0 + 10.0 * 2.0 + 32.0 * 2.0);
        // the second 'A' starts after the skipped gap
        let writes = gfx.vertex_writes();
        assert_eq!(writes[1][0], (32.0 + 10.0) * 2.0 + 2.0 * 2.0);
    }

    #[test]
    fn destroy_releases_buffer_and_atlas() {
        let mut gfx = RecordingContext::new();
        let text = renderer(&mut gfx, 800.0, 600.0);
        let program = text.program;

        text.destroy(&mut gfx);

        assert_eq!(gfx.live_buffers(), 0);
        assert_eq!(gfx.live_textures(), 0);
        assert!(gfx.has_program(program));
    }

    #[test]
    fn failed_construction_releases_atlas() {
        let mut gfx = RecordingContext::new();
        let atlas = build_atlas(&mut gfx, &FakeRasterizer::new(), 0..128).unwrap();
        let missing = gfx.add_program();
        gfx.remove_program(missing);

        let err = TextRenderer::new(&mut gfx, missing, atlas, 800.0, 600.0).unwrap_err();
        assert!(matches!(err, TextError::Graphics(_)));
        assert_eq!(gfx.live_textures(), 0);
    }

    #[test]
    fn init_renderer_reports_missing_font() {
        let mut gfx = RecordingContext::new();
        let program = gfx.add_program();
        let config = TextConfig::new().with_font_path("fonts/missing.ttf");

        let err = init_renderer(&mut gfx, program, &config, 800.0, 600.0).unwrap_err();
        assert!(matches!(err, TextError::FontLoad { .. }));
    }

    #[test]
    fn zero_sized_viewport_keeps_previous_projection() {
        let mut gfx = RecordingContext::new();
        let mut text = renderer(&mut gfx, 800.0, 600.0);
        let before = Some(Uniform::Mat4(screen_projection(800.0, 600.0)));

        for (width, height) in [(0.0, 600.0), (800.0, 0.0), (f32::NAN, 600.0), (-1.0, 600.0)] {
            let err = text.update_size(&mut gfx, width, height).unwrap_err();
            assert!(matches!(err, TextError::InvalidViewport(..)));
        }

        assert_eq!(*text.projection(), screen_projection(800.0, 600.0));
        assert_eq!(gfx.uniform(text.program, PROJECTION_UNIFORM), before);
    }

    #[test]
    fn zero_sized_construction_fails_and_releases_atlas() {
        let mut gfx = RecordingContext::new();
        let program = gfx.add_program();
        let atlas = build_atlas(&mut gfx, &FakeRasterizer::new(), 0..128).unwrap();

        let err = TextRenderer::new(&mut gfx, program, atlas, 800.0, 0.0).unwrap_err();

        assert!(matches!(err, TextError::InvalidViewport(w, h) if w == 800.0 && h == 0.0));
        assert_eq!(gfx.live_textures(), 0);
        assert_eq!(gfx.live_buffers(), 0);
        assert_eq!(gfx.uniform(program, PROJECTION_UNIFORM), None);
    }
}
