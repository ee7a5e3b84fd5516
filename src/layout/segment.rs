use crate::foundation::core::Canvas;
use crate::layout::engine::{ShapedGlyph, TextLayoutEngine};
use crate::transcript::model::Transcript;

/// Fraction of the canvas width available to a wrapped line.
pub const WRAP_WIDTH_FRACTION: f32 = 0.8;

/// A token placed on the canvas, bound to its word slot.
#[derive(Clone, Debug, PartialEq)]
pub struct TokenLayout {
    /// Index into the segment's word list.
    pub slot: usize,
    /// Left edge in canvas pixels.
    pub x: f32,
    /// Glyphs in canvas coordinates.
    pub glyphs: Vec<ShapedGlyph>,
}

/// One wrapped line of a segment.
#[derive(Clone, Debug, PartialEq)]
pub struct LineLayout {
    /// Display text of the line.
    pub text: String,
    /// Left edge of the centered line.
    pub x: f32,
    /// Top edge of the line box.
    pub top: f32,
    /// Measured pixel width.
    pub width: f32,
    /// Tokens left to right.
    pub tokens: Vec<TokenLayout>,
}

/// Wrapped, centered and shaped layout of one segment's display text.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SegmentLayout {
    lines: Vec<LineLayout>,
    line_height: f32,
}

impl SegmentLayout {
    /// Wrap `text` at 80% of the canvas width and place the block in the canvas center.
    pub fn prepare(text: &str, engine: &mut TextLayoutEngine, canvas: Canvas) -> Self {
        let max_width = canvas.width as f32 * WRAP_WIDTH_FRACTION;
        let wrapped = engine.wrap(text, max_width);
        let line_height = engine.line_height();
        let block_height = wrapped.len() as f32 * line_height;
        let block_top = (canvas.height as f32 - block_height) / 2.0;

        let mut slot = 0usize;
        let mut lines = Vec::with_capacity(wrapped.len());
        for (i, line_text) in wrapped.into_iter().enumerate() {
            let top = block_top + i as f32 * line_height;
            let width = engine.measure(&line_text);
            let x = (canvas.width as f32 - width) / 2.0;

            let mut cursor = x;
            let mut tokens = Vec::new();
            for token in line_text.split(' ') {
                if token.is_empty() {
                    continue;
                }
                let shaped = engine.shape(token);
                if shaped.glyphs.is_empty() {
                    tracing::warn!(token, "token produced no glyphs; it will not be drawn");
                }
                let glyphs = shaped
                    .glyphs
                    .iter()
                    .map(|g| ShapedGlyph {
                        id: g.id,
                        x: cursor + g.x,
                        y: top + g.y,
                    })
                    .collect();
                tokens.push(TokenLayout {
                    slot,
                    x: cursor,
                    glyphs,
                });
                slot += 1;
                cursor += engine.measure(&format!("{token} "));
            }

            lines.push(LineLayout {
                text: line_text,
                x,
                top,
                width,
                tokens,
            });
        }

        Self { lines, line_height }
    }

    /// Wrapped lines, top to bottom.
    pub fn lines(&self) -> &[LineLayout] {
        &self.lines
    }

    /// Line pitch used for this layout.
    pub fn line_height(&self) -> f32 {
        self.line_height
    }

    /// All tokens in slot order.
    pub fn tokens(&self) -> impl Iterator<Item = &TokenLayout> {
        self.lines.iter().flat_map(|l| l.tokens.iter())
    }
}

/// Per-segment layouts for a whole transcript, computed once before synthesis.
#[derive(Clone, Debug, Default)]
pub struct PreparedTranscript {
    layouts: Vec<SegmentLayout>,
}

impl PreparedTranscript {
    /// Lay out every segment of `transcript`.
    pub fn prepare(
        transcript: &Transcript,
        engine: &mut TextLayoutEngine,
        canvas: Canvas,
    ) -> Self {
        let layouts = transcript
            .segments
            .iter()
            .map(|s| SegmentLayout::prepare(&s.text, engine, canvas))
            .collect();
        Self { layouts }
    }

    /// Layout of segment `index`.
    pub fn segment(&self, index: usize) -> Option<&SegmentLayout> {
        self.layouts.get(index)
    }

    /// Number of prepared segments.
    pub fn len(&self) -> usize {
        self.layouts.len()
    }

    /// Return `true` when no segment was prepared.
    pub fn is_empty(&self) -> bool {
        self.layouts.is_empty()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/layout/segment.rs"]
mod tests;
