use std::borrow::Cow;

use crate::assets::font::LoadedFont;
use crate::foundation::error::{LyricframeError, LyricframeResult};
use crate::layout::wrap::wrap_with;

/// Reference pair whose extent defines the line pitch.
const LINE_REFERENCE: &str = "Tg";

/// Line pitch as a multiple of the reference pair's ascent-to-descent extent.
pub const LINE_SPACING: f32 = 1.5;

/// One shaped glyph, positioned relative to the top-left of its shaped line.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ShapedGlyph {
    /// Glyph id in the font.
    pub id: u32,
    /// Pen x position.
    pub x: f32,
    /// Baseline y position.
    pub y: f32,
}

/// Single-line shaping result.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ShapedText {
    /// Positioned glyphs in visual order.
    pub glyphs: Vec<ShapedGlyph>,
    /// Sum of glyph advances.
    pub width: f32,
}

/// Stateful helper that shapes text with one loaded font through Parley.
pub struct TextLayoutEngine {
    font_ctx: parley::FontContext,
    layout_ctx: parley::LayoutContext<()>,
    family: String,
    size_px: f32,
}

impl TextLayoutEngine {
    /// Register `font` with fresh Parley contexts.
    pub fn new(font: &LoadedFont) -> LyricframeResult<Self> {
        let mut font_ctx = parley::FontContext::default();
        let families = font_ctx
            .collection
            .register_fonts(parley::fontique::Blob::from(font.bytes().to_vec()), None);
        let family_id = families.first().map(|(id, _)| *id).ok_or_else(|| {
            LyricframeError::font_unavailable("no font families registered from font bytes")
        })?;
        let family = font_ctx
            .collection
            .family_name(family_id)
            .ok_or_else(|| LyricframeError::font_unavailable("registered font family has no name"))?
            .to_string();

        Ok(Self {
            font_ctx,
            layout_ctx: parley::LayoutContext::new(),
            family,
            size_px: font.size_px(),
        })
    }

    /// Font size the engine shapes at.
    pub fn size_px(&self) -> f32 {
        self.size_px
    }

    fn layout_line(&mut self, text: &str) -> parley::Layout<()> {
        let mut builder = self
            .layout_ctx
            .ranged_builder(&mut self.font_ctx, text, 1.0, true);
        builder.push_default(parley::style::StyleProperty::FontStack(
            parley::style::FontStack::Source(Cow::Owned(self.family.clone())),
        ));
        builder.push_default(parley::style::StyleProperty::FontSize(self.size_px));

        let mut layout: parley::Layout<()> = builder.build(text);
        layout.break_all_lines(None);
        layout
    }

    /// Shape `text` on a single line.
    pub fn shape(&mut self, text: &str) -> ShapedText {
        let layout = self.layout_line(text);
        let mut out = ShapedText::default();
        for line in layout.lines() {
            for item in line.items() {
                let parley::layout::PositionedLayoutItem::GlyphRun(run) = item else {
                    continue;
                };
                // Pen position accumulates across the run; y is the line baseline.
                for g in run.positioned_glyphs() {
                    out.glyphs.push(ShapedGlyph {
                        id: g.id,
                        x: g.x,
                        y: g.y,
                    });
                    out.width += g.advance;
                }
            }
        }
        out
    }

    /// Rendered pixel width of `text` on a single line.
    pub fn measure(&mut self, text: &str) -> f32 {
        self.shape(text).width
    }

    /// Greedy wrap of `text` at `max_width` pixels using this font's metrics.
    pub fn wrap(&mut self, text: &str, max_width: f32) -> Vec<String> {
        wrap_with(text, max_width, |candidate| self.measure(candidate))
    }

    /// Vertical distance between consecutive line tops.
    pub fn line_height(&mut self) -> f32 {
        let layout = self.layout_line(LINE_REFERENCE);
        let extent = layout
            .lines()
            .next()
            .map(|line| {
                let m = line.metrics();
                m.ascent + m.descent
            })
            .unwrap_or(self.size_px);
        extent * LINE_SPACING
    }
}

#[cfg(test)]
#[path = "../../tests/unit/layout/engine.rs"]
mod tests;
