use crate::assets::background::Backdrop;
use crate::assets::font::LoadedFont;
use crate::foundation::core::Canvas;
use crate::foundation::error::{LyricframeError, LyricframeResult};
use crate::foundation::math::premul_over_in_place;
use crate::layout::engine::ShapedGlyph;
use crate::layout::segment::SegmentLayout;
use crate::render::frame::FrameRGBA;
use crate::style::color::Color;
use crate::style::config::Palette;
use crate::transcript::timing::{Classification, WordState};

/// Draws karaoke frames on the CPU.
///
/// Owns a `vello_cpu` context and a scratch text layer sized to the canvas, so each worker thread
/// needs its own instance.
pub struct FrameSynthesizer {
    canvas: Canvas,
    font: vello_cpu::peniko::FontData,
    size_px: f32,
    ctx: vello_cpu::RenderContext,
    layer: vello_cpu::Pixmap,
}

impl FrameSynthesizer {
    /// Create a synthesizer drawing `font` onto `canvas`-sized frames.
    pub fn new(canvas: Canvas, font: &LoadedFont) -> LyricframeResult<Self> {
        canvas.validate()?;
        let w: u16 = canvas
            .width
            .try_into()
            .map_err(|_| LyricframeError::validation("canvas width exceeds u16"))?;
        let h: u16 = canvas
            .height
            .try_into()
            .map_err(|_| LyricframeError::validation("canvas height exceeds u16"))?;
        Ok(Self {
            canvas,
            font: font.raster().clone(),
            size_px: font.size_px(),
            ctx: vello_cpu::RenderContext::new(w, h),
            layer: vello_cpu::Pixmap::new(w, h),
        })
    }

    /// Compose one frame: the backdrop, plus the active segment's tokens colored by word state.
    pub fn draw(
        &mut self,
        backdrop: &Backdrop,
        segment: Option<&SegmentLayout>,
        states: &Classification,
        palette: &Palette,
        shadow_offset_px: f32,
    ) -> LyricframeResult<FrameRGBA> {
        if backdrop.canvas() != self.canvas {
            return Err(LyricframeError::validation(
                "backdrop canvas does not match synthesizer canvas",
            ));
        }
        let mut data = backdrop.data().to_vec();
        let Some(segment) = segment.filter(|s| !s.lines().is_empty()) else {
            return Ok(FrameRGBA::premultiplied(self.canvas, data));
        };

        self.ctx.reset();
        self.ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
        for token in segment.tokens() {
            if token.glyphs.is_empty() {
                continue;
            }
            match states.state_for_slot(token.slot) {
                WordState::Active => {
                    self.fill(&token.glyphs, palette.shadow, shadow_offset_px);
                    self.fill(&token.glyphs, palette.active, 0.0);
                }
                WordState::Sung => self.fill(&token.glyphs, palette.sung, 0.0),
                WordState::Pending => self.fill(&token.glyphs, palette.inactive, 0.0),
            }
        }
        self.ctx.flush();
        self.layer.data_as_u8_slice_mut().fill(0);
        self.ctx.render_to_pixmap(&mut self.layer);

        premul_over_in_place(&mut data, self.layer.data_as_u8_slice())?;
        Ok(FrameRGBA::premultiplied(self.canvas, data))
    }

    fn fill(&mut self, glyphs: &[ShapedGlyph], color: Color, offset: f32) {
        let [r, g, b, a] = color.to_rgba8();
        if a == 0 {
            return;
        }
        self.ctx
            .set_paint(vello_cpu::peniko::Color::from_rgba8(r, g, b, a));
        let glyphs = glyphs.iter().map(|g| vello_cpu::Glyph {
            id: g.id,
            x: g.x + offset,
            y: g.y + offset,
        });
        self.ctx
            .glyph_run(&self.font)
            .font_size(self.size_px)
            .fill_glyphs(glyphs);
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/cpu.rs"]
mod tests;
