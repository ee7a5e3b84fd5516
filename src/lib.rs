//! lyricframe renders karaoke-style lyric videos.
//!
//! Given a word-timed transcript, a style and an audio track, it lays out each lyric segment,
//! colors every word by whether it is pending, being sung or already sung, rasterizes frames on
//! the CPU and muxes them with the audio through the system `ffmpeg`.
//!
//! - Load a [`Transcript`] and a [`StyleConfig`]
//! - Call [`render`] for the whole pipeline, or
//! - Create a [`RenderSession`] to render single frames or stream a range into a [`FrameSink`]
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod assets;
mod encode;
mod foundation;
mod layout;
mod render;
mod session;
mod style;
mod transcript;

pub use crate::foundation::core::{
    CancelFlag, Canvas, Fps, FrameIndex, FrameRange, Rgba8Premul,
};
pub use crate::foundation::error::{LyricframeError, LyricframeResult};

pub use crate::assets::background::{Backdrop, DEFAULT_BACKGROUND_RGBA, IMAGE_OVERLAY_ALPHA};
pub use crate::assets::font::{
    DirFontResolver, FontOrigin, FontResolver, LoadedFont, SystemFontResolver,
};
pub use crate::encode::ffmpeg::{
    FfmpegSink, FfmpegSinkOpts, is_ffmpeg_on_path, is_ffprobe_on_path,
};
pub use crate::encode::mux::{MuxOpts, intermediate_path_for, mux_audio, probe_duration_secs};
pub use crate::encode::sink::{FrameSink, InMemorySink, SinkConfig};
pub use crate::layout::engine::{LINE_SPACING, ShapedGlyph, ShapedText, TextLayoutEngine};
pub use crate::layout::segment::{
    LineLayout, PreparedTranscript, SegmentLayout, TokenLayout, WRAP_WIDTH_FRACTION,
};
pub use crate::layout::wrap::wrap_with;
pub use crate::render::cpu::FrameSynthesizer;
pub use crate::render::frame::FrameRGBA;
pub use crate::session::render_session::{
    RenderOpts, RenderReport, RenderRequest, RenderSession, RenderStats, render,
};
pub use crate::style::color::{Color, parse_hex};
pub use crate::style::config::{FontSpec, Palette, StyleConfig};
pub use crate::transcript::model::{
    EMPTY_TRANSCRIPT_SECS, Segment, TAIL_PADDING_SECS, Transcript, TranscriptIssue, Word,
};
pub use crate::transcript::timing::{Classification, FrameKey, WordState, classify};
