use std::path::Path;
use std::sync::Arc;

use anyhow::Context as _;

use crate::foundation::core::{Canvas, Rgba8Premul};
use crate::foundation::error::{LyricframeError, LyricframeResult};
use crate::foundation::math::{mul_div255_u8, premultiply_rgba8_in_place};

/// Solid canvas used when no background image is available.
pub const DEFAULT_BACKGROUND_RGBA: [u8; 4] = [20, 20, 30, 255];

/// Alpha of the black overlay darkening image backgrounds for text legibility.
pub const IMAGE_OVERLAY_ALPHA: u8 = 100;

/// Canvas-sized premultiplied RGBA8 base layer shared by every frame.
#[derive(Clone, Debug)]
pub struct Backdrop {
    canvas: Canvas,
    rgba8_premul: Arc<Vec<u8>>,
}

impl Backdrop {
    /// Fill the whole canvas with one straight-alpha color.
    pub fn solid(canvas: Canvas, rgba: [u8; 4]) -> Self {
        let px = Rgba8Premul::from_straight_rgba(rgba[0], rgba[1], rgba[2], rgba[3]).to_array();
        let mut bytes = vec![0u8; canvas.rgba8_len()];
        for chunk in bytes.chunks_exact_mut(4) {
            chunk.copy_from_slice(&px);
        }
        Self {
            canvas,
            rgba8_premul: Arc::new(bytes),
        }
    }

    /// Decode an image, scale it to the canvas with Lanczos3 and darken it.
    pub fn from_image_bytes(bytes: &[u8], canvas: Canvas) -> LyricframeResult<Self> {
        let decoded = image::load_from_memory(bytes)
            .context("decode background image")
            .map_err(|e| LyricframeError::asset_unavailable(format!("{e:#}")))?;
        let scaled = image::imageops::resize(
            &decoded.to_rgba8(),
            canvas.width,
            canvas.height,
            image::imageops::FilterType::Lanczos3,
        );

        let mut rgba8_premul = scaled.into_raw();
        premultiply_rgba8_in_place(&mut rgba8_premul);
        darken_in_place(&mut rgba8_premul, IMAGE_OVERLAY_ALPHA);

        Ok(Self {
            canvas,
            rgba8_premul: Arc::new(rgba8_premul),
        })
    }

    /// Load an image file as the backdrop.
    pub fn from_image_file(path: &Path, canvas: Canvas) -> LyricframeResult<Self> {
        let bytes = std::fs::read(path).map_err(|e| {
            LyricframeError::asset_unavailable(format!(
                "failed to read background '{}': {e}",
                path.display()
            ))
        })?;
        Self::from_image_bytes(&bytes, canvas)
    }

    /// Load `path` when given, falling back to the default solid canvas on absence or failure.
    pub fn resolve(path: Option<&Path>, canvas: Canvas) -> Self {
        let Some(path) = path else {
            return Self::solid(canvas, DEFAULT_BACKGROUND_RGBA);
        };
        match Self::from_image_file(path, canvas) {
            Ok(b) => b,
            Err(e) => {
                tracing::warn!(error = %e, "falling back to solid background");
                Self::solid(canvas, DEFAULT_BACKGROUND_RGBA)
            }
        }
    }

    /// Canvas dimensions.
    pub fn canvas(&self) -> Canvas {
        self.canvas
    }

    /// Premultiplied RGBA8 pixels, row-major.
    pub fn data(&self) -> &[u8] {
        &self.rgba8_premul
    }
}

/// Composite a black layer of `alpha` over premultiplied pixels.
fn darken_in_place(rgba8_premul: &mut [u8], alpha: u8) {
    let inv = 255u16 - u16::from(alpha);
    for px in rgba8_premul.chunks_exact_mut(4) {
        px[0] = mul_div255_u8(u16::from(px[0]), inv);
        px[1] = mul_div255_u8(u16::from(px[1]), inv);
        px[2] = mul_div255_u8(u16::from(px[2]), inv);
        px[3] = alpha.saturating_add(mul_div255_u8(u16::from(px[3]), inv));
    }
}

#[cfg(test)]
#[path = "../../tests/unit/assets/background.rs"]
mod tests;
