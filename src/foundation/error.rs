use std::path::PathBuf;

/// Convenience result type used across lyricframe.
pub type LyricframeResult<T> = Result<T, LyricframeError>;

/// Top-level error taxonomy used by engine APIs.
///
/// `AssetUnavailable` is produced by asset loaders and normally recovered by the session with a
/// documented fallback; the remaining variants are fatal to a render request.
#[derive(thiserror::Error, Debug)]
pub enum LyricframeError {
    /// Invalid user-provided configuration or transcript data.
    #[error("validation error: {0}")]
    Validation(String),

    /// A font or background asset is missing or cannot be decoded.
    #[error("asset unavailable: {0}")]
    AssetUnavailable(String),

    /// No usable font, even after falling back to the built-in font.
    #[error("font unavailable: {0}")]
    FontUnavailable(String),

    /// The intermediate silent video stream could not be written or finalized.
    #[error("stream write error: {0}")]
    StreamWrite(String),

    /// The audio/video muxer failed or produced no output.
    #[error("encoding error: {message} (intermediate kept at '{}')", .intermediate.display())]
    Encoding {
        /// Human readable failure description (includes ffmpeg stderr when available).
        message: String,
        /// Silent intermediate video left in place for diagnosis.
        intermediate: PathBuf,
    },

    /// The render was cancelled through its cancel flag.
    #[error("render cancelled")]
    Cancelled,

    /// Errors when serializing or deserializing data structures.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl LyricframeError {
    /// Build a [`LyricframeError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`LyricframeError::AssetUnavailable`] value.
    pub fn asset_unavailable(msg: impl Into<String>) -> Self {
        Self::AssetUnavailable(msg.into())
    }

    /// Build a [`LyricframeError::FontUnavailable`] value.
    pub fn font_unavailable(msg: impl Into<String>) -> Self {
        Self::FontUnavailable(msg.into())
    }

    /// Build a [`LyricframeError::StreamWrite`] value.
    pub fn stream_write(msg: impl Into<String>) -> Self {
        Self::StreamWrite(msg.into())
    }

    /// Build a [`LyricframeError::Encoding`] value.
    pub fn encoding(msg: impl Into<String>, intermediate: impl Into<PathBuf>) -> Self {
        Self::Encoding {
            message: msg.into(),
            intermediate: intermediate.into(),
        }
    }

    /// Build a [`LyricframeError::Serde`] value.
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
