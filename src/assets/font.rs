use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::foundation::error::{LyricframeError, LyricframeResult};
use crate::style::config::FontSpec;

/// DejaVu Sans, bundled so a render never depends on installed fonts.
pub(crate) const BUILTIN_FONT_BYTES: &[u8] = include_bytes!("../../assets/fonts/DejaVuSans.ttf");

/// Resolve a catalog `(category, name)` pair into a font file.
///
/// Catalog formats and downloads live outside the renderer; implementations only answer the
/// lookup.
pub trait FontResolver: Send + Sync {
    /// Return a font file for `name` in `category`, or `None` when unknown.
    fn resolve(&self, category: &str, name: &str) -> Option<PathBuf>;
}

/// Looks fonts up in a local cache directory by file name.
///
/// A file matches when its lowercase name contains the lowercase family name with spaces
/// removed and ends in `.ttf` or `.otf`. Matches are tried in lexical order.
#[derive(Clone, Debug)]
pub struct DirFontResolver {
    root: PathBuf,
}

impl DirFontResolver {
    /// Create a resolver over `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl FontResolver for DirFontResolver {
    fn resolve(&self, _category: &str, name: &str) -> Option<PathBuf> {
        let needle = name.replace(' ', "").to_lowercase();
        if needle.is_empty() {
            return None;
        }
        let mut candidates: Vec<PathBuf> = std::fs::read_dir(&self.root)
            .ok()?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| {
                let Some(file) = p.file_name().and_then(|f| f.to_str()) else {
                    return false;
                };
                let file = file.to_lowercase();
                file.contains(&needle) && (file.ends_with(".ttf") || file.ends_with(".otf"))
            })
            .collect();
        candidates.sort();
        candidates.into_iter().next()
    }
}

/// Looks family names up among installed system fonts.
pub struct SystemFontResolver {
    db: usvg::fontdb::Database,
}

impl Default for SystemFontResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemFontResolver {
    /// Scan system font directories once.
    pub fn new() -> Self {
        let mut db = usvg::fontdb::Database::new();
        db.load_system_fonts();
        tracing::debug!(faces = db.len(), "loaded system font database");
        Self { db }
    }
}

impl FontResolver for SystemFontResolver {
    fn resolve(&self, _category: &str, name: &str) -> Option<PathBuf> {
        use usvg::fontdb::{Family, Query, Source};

        let families = [Family::Name(name)];
        let id = self.db.query(&Query {
            families: &families,
            ..Query::default()
        })?;
        match self.db.face_source(id)?.0 {
            Source::File(path) => Some(path),
            Source::SharedFile(path, _) => Some(path),
            _ => None,
        }
    }
}

/// Where a [`LoadedFont`] came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FontOrigin {
    /// The requested font loaded successfully.
    Requested,
    /// The bundled fallback font.
    Builtin,
}

/// Validated font bytes plus the size they are rendered at.
///
/// Cheap to clone; the bytes are shared.
#[derive(Clone)]
pub struct LoadedFont {
    bytes: Arc<Vec<u8>>,
    family: String,
    size_px: f32,
    origin: FontOrigin,
    raster: vello_cpu::peniko::FontData,
}

impl std::fmt::Debug for LoadedFont {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedFont")
            .field("family", &self.family)
            .field("size_px", &self.size_px)
            .field("origin", &self.origin)
            .field("bytes", &self.bytes.len())
            .finish()
    }
}

impl LoadedFont {
    /// Load the bundled fallback font.
    pub fn builtin(size_px: f32) -> LyricframeResult<Self> {
        validate_size(size_px)?;
        Self::from_bytes(BUILTIN_FONT_BYTES.to_vec(), size_px, FontOrigin::Builtin).map_err(|e| {
            LyricframeError::font_unavailable(format!("built-in font failed to load: {e}"))
        })
    }

    /// Load a font file from disk.
    pub fn from_file(path: &Path, size_px: f32) -> LyricframeResult<Self> {
        validate_size(size_px)?;
        let bytes = std::fs::read(path).map_err(|e| {
            LyricframeError::asset_unavailable(format!(
                "failed to read font '{}': {e}",
                path.display()
            ))
        })?;
        Self::from_bytes(bytes, size_px, FontOrigin::Requested)
    }

    /// Validate raw font bytes by registering them with a throwaway font collection.
    pub fn from_bytes(bytes: Vec<u8>, size_px: f32, origin: FontOrigin) -> LyricframeResult<Self> {
        validate_size(size_px)?;
        let mut font_ctx = parley::FontContext::default();
        let families = font_ctx
            .collection
            .register_fonts(parley::fontique::Blob::from(bytes.clone()), None);
        let family_id = families.first().map(|(id, _)| *id).ok_or_else(|| {
            LyricframeError::asset_unavailable("no font families registered from font bytes")
        })?;
        let family = font_ctx
            .collection
            .family_name(family_id)
            .ok_or_else(|| LyricframeError::asset_unavailable("registered font family has no name"))?
            .to_string();

        let raster =
            vello_cpu::peniko::FontData::new(vello_cpu::peniko::Blob::from(bytes.clone()), 0);
        Ok(Self {
            bytes: Arc::new(bytes),
            family,
            size_px,
            origin,
            raster,
        })
    }

    /// Load the font named by `spec`, falling back to the built-in font on any failure.
    ///
    /// Only a failure of the built-in font itself is returned as an error.
    pub fn resolve(
        spec: &FontSpec,
        resolver: Option<&dyn FontResolver>,
        size_px: f32,
    ) -> LyricframeResult<Self> {
        validate_size(size_px)?;
        let attempt = match spec {
            FontSpec::Builtin => return Self::builtin(size_px),
            FontSpec::Path(path) => Self::from_file(path, size_px),
            FontSpec::Catalog { category, name } => match resolver
                .and_then(|r| r.resolve(category, name))
            {
                Some(path) => Self::from_file(&path, size_px),
                None => Err(LyricframeError::asset_unavailable(format!(
                    "font '{name}' ({category}) not found in catalog"
                ))),
            },
        };

        match attempt {
            Ok(font) => {
                tracing::debug!(family = %font.family, "loaded requested font");
                Ok(font)
            }
            Err(LyricframeError::Validation(msg)) => Err(LyricframeError::Validation(msg)),
            Err(e) => {
                tracing::warn!(error = %e, "falling back to built-in font");
                Self::builtin(size_px)
            }
        }
    }

    /// Raw font file bytes.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Family name reported by the font.
    pub fn family(&self) -> &str {
        &self.family
    }

    /// Render size in pixels.
    pub fn size_px(&self) -> f32 {
        self.size_px
    }

    /// Whether the requested font or the fallback was loaded.
    pub fn origin(&self) -> FontOrigin {
        self.origin
    }

    pub(crate) fn raster(&self) -> &vello_cpu::peniko::FontData {
        &self.raster
    }
}

fn validate_size(size_px: f32) -> LyricframeResult<()> {
    if !size_px.is_finite() || size_px <= 0.0 {
        return Err(LyricframeError::validation(
            "font size_px must be finite and > 0",
        ));
    }
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/assets/font.rs"]
mod tests;
