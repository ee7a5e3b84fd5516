use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::foundation::core::{Canvas, Fps};
use crate::foundation::error::{LyricframeError, LyricframeResult};
use crate::style::color::Color;

/// Where the lyric font comes from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FontSpec {
    /// The bundled fallback font.
    #[default]
    Builtin,
    /// A font file on disk.
    Path(PathBuf),
    /// A catalog entry resolved through a [`crate::FontResolver`].
    Catalog {
        /// Catalog category, e.g. `"Sans-Serif"`.
        category: String,
        /// Family name, e.g. `"Roboto"`.
        name: String,
    },
}

/// Display colors for the three word states plus the active-word shadow.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Palette {
    /// Word currently being sung.
    pub active: Color,
    /// Word already sung.
    pub sung: Color,
    /// Word not yet reached.
    pub inactive: Color,
    /// Shadow drawn behind the active word.
    pub shadow: Color,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            active: Color::from_rgba8(255, 230, 0, 255),
            sung: Color::from_rgba8(255, 255, 255, 255),
            inactive: Color::from_rgba8(200, 200, 200, 180),
            shadow: Color::from_rgba8(0, 0, 0, 128),
        }
    }
}

/// Immutable per-render style configuration.
///
/// Every field is optional in JSON; missing fields take the defaults below.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StyleConfig {
    /// Output canvas size.
    pub canvas: Canvas,
    /// Output frame rate.
    pub fps: Fps,
    /// Lyric font.
    pub font: FontSpec,
    /// Font size in pixels.
    pub font_size_px: f32,
    /// Word state colors.
    pub colors: Palette,
    /// Offset of the active-word shadow, in pixels along both axes.
    pub shadow_offset_px: f32,
    /// Optional background raster image.
    pub background: Option<PathBuf>,
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self {
            canvas: Canvas::default(),
            fps: Fps::default(),
            font: FontSpec::Builtin,
            font_size_px: 60.0,
            colors: Palette::default(),
            shadow_offset_px: 2.0,
            background: None,
        }
    }
}

impl StyleConfig {
    /// Parse a style document from a JSON reader.
    pub fn from_reader<R: std::io::Read>(r: R) -> LyricframeResult<Self> {
        let cfg: Self = serde_json::from_reader(r)
            .map_err(|e| LyricframeError::serde(format!("parse style JSON: {e}")))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Parse a style document from a JSON file on disk.
    ///
    /// A relative `font.path` or `background` is resolved against the document's directory.
    pub fn from_path(path: impl AsRef<Path>) -> LyricframeResult<Self> {
        let path = path.as_ref();
        let f = File::open(path).map_err(|e| {
            LyricframeError::validation(format!("open style JSON '{}': {e}", path.display()))
        })?;
        let mut cfg = Self::from_reader(BufReader::new(f))?;
        if let Some(dir) = path.parent() {
            cfg.rebase_paths(dir);
        }
        Ok(cfg)
    }

    /// Validate canvas, frame rate and numeric style fields.
    pub fn validate(&self) -> LyricframeResult<()> {
        self.canvas.validate()?;
        self.fps.validate()?;
        if !self.font_size_px.is_finite() || self.font_size_px <= 0.0 {
            return Err(LyricframeError::validation(
                "font_size_px must be finite and > 0",
            ));
        }
        if !self.shadow_offset_px.is_finite() {
            return Err(LyricframeError::validation(
                "shadow_offset_px must be finite",
            ));
        }
        Ok(())
    }

    fn rebase_paths(&mut self, dir: &Path) {
        if let FontSpec::Path(p) = &mut self.font
            && p.is_relative()
        {
            *p = dir.join(&*p);
        }
        if let Some(bg) = self.background.as_mut()
            && bg.is_relative()
        {
            *bg = dir.join(&*bg);
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/style/config.rs"]
mod tests;
