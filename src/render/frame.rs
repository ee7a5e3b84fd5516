use crate::foundation::core::Canvas;
use crate::foundation::error::{LyricframeError, LyricframeResult};
use crate::foundation::math::mul_div255_u16;

/// A rendered frame as RGBA8 pixels.
///
/// Frames produced by the synthesizer are premultiplied; the flag makes this explicit at the
/// sink boundary.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameRGBA {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// RGBA8 bytes, tightly packed, row-major.
    pub data: Vec<u8>,
    /// Whether the `data` is premultiplied alpha.
    pub premultiplied: bool,
}

impl FrameRGBA {
    /// Wrap premultiplied bytes covering `canvas`.
    pub fn premultiplied(canvas: Canvas, data: Vec<u8>) -> Self {
        Self {
            width: canvas.width,
            height: canvas.height,
            data,
            premultiplied: true,
        }
    }

    /// Pixel at `(x, y)` as `[r, g, b, a]`.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = ((y as usize) * (self.width as usize) + (x as usize)) * 4;
        let px = self.data.get(i..i + 4)?;
        Some([px[0], px[1], px[2], px[3]])
    }

    /// Composite the frame over an opaque `bg` color into straight, fully opaque RGBA8.
    ///
    /// Encoders and image writers take straight alpha, so premultiplied frames must pass through
    /// here before leaving the crate.
    pub fn flatten_into(&self, dst: &mut [u8], bg: [u8; 3]) -> LyricframeResult<()> {
        if dst.len() != self.data.len() || !dst.len().is_multiple_of(4) {
            return Err(LyricframeError::validation(
                "flatten target must match the frame's rgba8 length",
            ));
        }
        let bg = bg.map(u16::from);
        for (d, s) in dst.chunks_exact_mut(4).zip(self.data.chunks_exact(4)) {
            let a = u16::from(s[3]);
            let inv = 255 - a;
            for c in 0..3 {
                let src = if self.premultiplied {
                    u16::from(s[c])
                } else {
                    mul_div255_u16(u16::from(s[c]), a)
                };
                d[c] = (src + mul_div255_u16(bg[c], inv)).min(255) as u8;
            }
            d[3] = 255;
        }
        Ok(())
    }

    /// Allocating form of [`FrameRGBA::flatten_into`].
    pub fn to_opaque_rgba8(&self, bg: [u8; 3]) -> Vec<u8> {
        let mut out = vec![0u8; self.data.len()];
        // Lengths match by construction.
        let _ = self.flatten_into(&mut out, bg);
        out
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/frame.rs"]
mod tests;
