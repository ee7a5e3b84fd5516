use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, mpsc};

use rayon::prelude::*;

use crate::assets::background::Backdrop;
use crate::assets::font::{FontResolver, LoadedFont};
use crate::encode::ffmpeg::{FfmpegSink, FfmpegSinkOpts};
use crate::encode::mux::{MuxOpts, intermediate_path_for, mux_audio};
use crate::encode::sink::{FrameSink, SinkConfig};
use crate::foundation::core::{CancelFlag, FrameIndex, FrameRange};
use crate::foundation::error::{LyricframeError, LyricframeResult};
use crate::layout::engine::TextLayoutEngine;
use crate::layout::segment::PreparedTranscript;
use crate::render::cpu::FrameSynthesizer;
use crate::render::frame::FrameRGBA;
use crate::style::config::StyleConfig;
use crate::transcript::model::Transcript;
use crate::transcript::timing::{Classification, FrameKey, classify};

const MAX_REORDER_BUFFER_BYTES: u64 = 128 * 1024 * 1024;

/// Options controlling how a render is scheduled and encoded.
#[derive(Clone)]
pub struct RenderOpts {
    /// Enable frame-level parallelism (rayon), using a dedicated thread pool.
    pub parallel: bool,
    /// Chunk size used by the render->encode streaming pipeline.
    pub chunk_size: usize,
    /// Override the number of rayon worker threads. `None` uses rayon defaults.
    pub threads: Option<usize>,
    /// Reuse the pixels of an earlier frame in the same chunk when both show the same word states.
    pub static_frame_elision: bool,
    /// Bounded channel capacity between render workers and the encoder thread.
    pub channel_capacity: usize,
    /// Resolver for catalog font references.
    pub font_resolver: Option<Arc<dyn FontResolver>>,
    /// Cooperative cancellation, checked between chunks and while muxing.
    pub cancel: Option<CancelFlag>,
    /// Overwrite the output file if it already exists.
    pub overwrite: bool,
}

impl Default for RenderOpts {
    fn default() -> Self {
        Self {
            parallel: true,
            chunk_size: 64,
            threads: None,
            static_frame_elision: true,
            channel_capacity: 4,
            font_resolver: None,
            cancel: None,
            overwrite: true,
        }
    }
}

impl std::fmt::Debug for RenderOpts {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderOpts")
            .field("parallel", &self.parallel)
            .field("chunk_size", &self.chunk_size)
            .field("threads", &self.threads)
            .field("static_frame_elision", &self.static_frame_elision)
            .field("channel_capacity", &self.channel_capacity)
            .field("font_resolver", &self.font_resolver.is_some())
            .field("cancel", &self.cancel)
            .field("overwrite", &self.overwrite)
            .finish()
    }
}

/// Range render statistics.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RenderStats {
    /// Total frames in the requested range.
    pub frames_total: u64,
    /// Frames actually rendered (may be < total when static-frame elision is enabled).
    pub frames_rendered: u64,
    /// Frames elided due to static-frame elision.
    pub frames_elided: u64,
}

/// Everything needed for one video: lyrics, look, audio and destination.
#[derive(Clone, Debug)]
pub struct RenderRequest {
    /// Word-timed lyrics.
    pub transcript: Transcript,
    /// Visual style.
    pub style: StyleConfig,
    /// Audio track muxed into the output.
    pub audio: PathBuf,
    /// Final MP4 path.
    pub out_path: PathBuf,
}

/// Outcome of a successful [`render`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderReport {
    /// Path of the muxed video.
    pub path: PathBuf,
    /// Frame counters.
    pub stats: RenderStats,
}

/// Session-oriented lyric renderer.
///
/// A session front-loads background decoding, font loading and text layout, then renders single
/// frames or whole ranges from that immutable state.
pub struct RenderSession {
    transcript: Transcript,
    style: StyleConfig,
    backdrop: Backdrop,
    font: LoadedFont,
    prepared: PreparedTranscript,
    total_frames: u64,
    opts: RenderOpts,
}

impl RenderSession {
    /// Prepare a session for `transcript` drawn with `style`.
    ///
    /// Transcript inconsistencies are logged, not rejected. A missing background or font falls
    /// back to the defaults.
    #[tracing::instrument(level = "debug", skip_all)]
    pub fn new(
        transcript: &Transcript,
        style: &StyleConfig,
        opts: RenderOpts,
    ) -> LyricframeResult<Self> {
        style.validate()?;
        for issue in transcript.diagnose() {
            tracing::warn!(%issue, "transcript inconsistency");
        }

        let backdrop = Backdrop::resolve(style.background.as_deref(), style.canvas);
        let font = LoadedFont::resolve(
            &style.font,
            opts.font_resolver.as_deref(),
            style.font_size_px,
        )?;
        let mut engine = TextLayoutEngine::new(&font)?;
        let prepared = PreparedTranscript::prepare(transcript, &mut engine, style.canvas);
        // Never an empty timeline: a sub-frame duration still renders one frame.
        let total_frames = style
            .fps
            .secs_to_frames_floor(transcript.output_duration_secs())
            .max(1);

        tracing::info!(
            segments = transcript.segments.len(),
            frames = total_frames,
            font = font.family(),
            "render session ready"
        );

        Ok(Self {
            transcript: transcript.clone(),
            style: style.clone(),
            backdrop,
            font,
            prepared,
            total_frames,
            opts,
        })
    }

    /// Number of frames in the output video.
    pub fn total_frames(&self) -> u64 {
        self.total_frames
    }

    /// Range covering the whole output video.
    pub fn frame_range(&self) -> FrameRange {
        FrameRange::first(self.total_frames)
    }

    /// Style the session renders with.
    pub fn style(&self) -> &StyleConfig {
        &self.style
    }

    /// Font in use, possibly the built-in fallback.
    pub fn font(&self) -> &LoadedFont {
        &self.font
    }

    /// Base canvas every frame starts from.
    pub fn backdrop(&self) -> &Backdrop {
        &self.backdrop
    }

    /// Precomputed segment layouts.
    pub fn prepared(&self) -> &PreparedTranscript {
        &self.prepared
    }

    /// Word states at frame `frame`.
    pub fn classify_frame(&self, frame: FrameIndex) -> Classification {
        classify(&self.transcript, self.style.fps.frame_time_secs(frame))
    }

    /// Render the frame shown at playback time `t` seconds.
    pub fn render_at(&self, t: f64) -> LyricframeResult<FrameRGBA> {
        let mut synth = FrameSynthesizer::new(self.style.canvas, &self.font)?;
        self.draw(&mut synth, &classify(&self.transcript, t))
    }

    /// Render a single frame of the output timeline.
    pub fn render_frame(&self, frame: FrameIndex) -> LyricframeResult<FrameRGBA> {
        if frame.0 >= self.total_frames {
            return Err(LyricframeError::validation(
                "render_frame frame must be within the video duration",
            ));
        }
        self.render_at(self.style.fps.frame_time_secs(frame))
    }

    fn draw(
        &self,
        synth: &mut FrameSynthesizer,
        states: &Classification,
    ) -> LyricframeResult<FrameRGBA> {
        let layout = states.segment().and_then(|i| self.prepared.segment(i));
        synth.draw(
            &self.backdrop,
            layout,
            states,
            &self.style.colors,
            self.style.shadow_offset_px,
        )
    }

    fn check_cancel(&self) -> LyricframeResult<()> {
        if self.opts.cancel.as_ref().is_some_and(CancelFlag::is_cancelled) {
            return Err(LyricframeError::Cancelled);
        }
        Ok(())
    }

    /// Render a frame range and stream frames into a sink.
    ///
    /// The sink receives frames in strictly increasing frame index order. When `parallel` is
    /// enabled, out-of-order worker completion is reordered at the sink boundary behind a bounded
    /// channel.
    #[tracing::instrument(level = "debug", skip_all, fields(start = range.start.0, end = range.end.0))]
    pub fn render_range(
        &self,
        range: FrameRange,
        sink: &mut dyn FrameSink,
    ) -> LyricframeResult<RenderStats> {
        if range.is_empty() {
            return Err(LyricframeError::validation(
                "render_range range must be non-empty",
            ));
        }
        if range.end.0 > self.total_frames {
            return Err(LyricframeError::validation(
                "render_range range must be within the video duration",
            ));
        }

        let cfg = SinkConfig {
            width: self.style.canvas.width,
            height: self.style.canvas.height,
            fps: self.style.fps,
        };

        let cap = self.opts.channel_capacity.max(1);
        let bytes_per_frame = (self.style.canvas.rgba8_len() as u64).max(1);
        let max_chunk_by_mem = (MAX_REORDER_BUFFER_BYTES / bytes_per_frame).max(1);
        let chunk_size = normalized_chunk_size(self.opts.chunk_size)
            .min(max_chunk_by_mem)
            .min(range.len_frames());

        let pool = if self.opts.parallel {
            Some(build_thread_pool(self.opts.threads)?)
        } else {
            None
        };

        std::thread::scope(|scope| -> LyricframeResult<RenderStats> {
            let (tx, rx) = mpsc::sync_channel::<FrameMsg>(cap);
            let range_start = range.start.0;
            let range_end = range.end.0;
            let sink_ref: &mut dyn FrameSink = sink;

            // Encoder thread: in-order delivery regardless of render completion order.
            let enc = scope.spawn(move || -> LyricframeResult<()> {
                sink_ref.begin(cfg)?;

                let mut next = range_start;
                let mut pending = HashMap::<u64, Arc<FrameRGBA>>::new();
                while next < range_end {
                    if let Some(frame) = pending.remove(&next) {
                        sink_ref.push_frame(FrameIndex(next), &frame)?;
                        next += 1;
                        continue;
                    }
                    let msg = rx.recv().map_err(|_| {
                        LyricframeError::stream_write("frame producer stopped before the range end")
                    })?;
                    pending.insert(msg.idx.0, msg.frame);
                }

                sink_ref.end()
            });

            let produced = self.produce(range_start, range_end, chunk_size, pool.as_ref(), &tx);
            drop(tx);
            let enc_res = enc.join().map_err(|_| {
                LyricframeError::stream_write("encoder thread panicked")
            })?;

            match (produced, enc_res) {
                (Ok(stats), Ok(())) => Ok(stats),
                // A failing sink makes every later send fail; report the sink's own error.
                (Err(LyricframeError::StreamWrite(_)), Err(e)) => Err(e),
                (Err(e), _) => Err(e),
                (Ok(_), Err(e)) => Err(e),
            }
        })
    }

    fn produce(
        &self,
        start: u64,
        end: u64,
        chunk_size: u64,
        pool: Option<&rayon::ThreadPool>,
        tx: &mpsc::SyncSender<FrameMsg>,
    ) -> LyricframeResult<RenderStats> {
        let mut stats = RenderStats::default();
        let mut seq_synth = match pool {
            Some(_) => None,
            None => Some(FrameSynthesizer::new(self.style.canvas, &self.font)?),
        };

        let mut chunk_start = start;
        while chunk_start < end {
            self.check_cancel()?;
            let chunk_end = (chunk_start + chunk_size).min(end);

            let chunk_stats = match pool {
                Some(pool) if !self.opts.static_frame_elision => {
                    self.send_chunk_parallel(pool, chunk_start, chunk_end, tx)?
                }
                _ => self.send_chunk_unique(
                    pool,
                    seq_synth.as_mut(),
                    chunk_start,
                    chunk_end,
                    tx,
                )?,
            };

            stats.frames_total += chunk_stats.frames_total;
            stats.frames_rendered += chunk_stats.frames_rendered;
            stats.frames_elided += chunk_stats.frames_elided;
            chunk_start = chunk_end;
        }

        tracing::debug!(
            rendered = stats.frames_rendered,
            elided = stats.frames_elided,
            "range rendered"
        );
        Ok(stats)
    }

    /// Render every frame of the chunk on the pool and send straight from the workers.
    fn send_chunk_parallel(
        &self,
        pool: &rayon::ThreadPool,
        start: u64,
        end: u64,
        tx: &mpsc::SyncSender<FrameMsg>,
    ) -> LyricframeResult<RenderStats> {
        pool.install(|| {
            (start..end).into_par_iter().try_for_each_init(
                || FrameSynthesizer::new(self.style.canvas, &self.font),
                |synth, f| -> LyricframeResult<()> {
                    let synth = synth.as_mut().map_err(|e| {
                        LyricframeError::validation(format!("frame synthesizer unavailable: {e}"))
                    })?;
                    let frame = self.draw(synth, &self.classify_frame(FrameIndex(f)))?;
                    send(
                        tx,
                        FrameMsg {
                            idx: FrameIndex(f),
                            frame: Arc::new(frame),
                        },
                    )
                },
            )
        })?;
        let total = end - start;
        Ok(RenderStats {
            frames_total: total,
            frames_rendered: total,
            frames_elided: 0,
        })
    }

    /// Render each distinct frame of the chunk once and send the chunk in order.
    fn send_chunk_unique(
        &self,
        pool: Option<&rayon::ThreadPool>,
        seq_synth: Option<&mut FrameSynthesizer>,
        start: u64,
        end: u64,
        tx: &mpsc::SyncSender<FrameMsg>,
    ) -> LyricframeResult<RenderStats> {
        let mut uniq = Vec::<Classification>::new();
        let mut map = Vec::<usize>::with_capacity((end - start) as usize);
        let mut seen = HashMap::<FrameKey, usize>::new();
        for f in start..end {
            let states = self.classify_frame(FrameIndex(f));
            if !self.opts.static_frame_elision {
                map.push(uniq.len());
                uniq.push(states);
                continue;
            }
            let u = *seen.entry(states.frame_key()).or_insert_with(|| {
                uniq.push(states);
                uniq.len() - 1
            });
            map.push(u);
        }

        let frames: Vec<Arc<FrameRGBA>> = match (pool, seq_synth) {
            (_, Some(synth)) => uniq
                .iter()
                .map(|states| self.draw(synth, states).map(Arc::new))
                .collect::<LyricframeResult<_>>()?,
            (Some(pool), None) => pool.install(|| {
                uniq.par_iter()
                    .map_init(
                        || FrameSynthesizer::new(self.style.canvas, &self.font),
                        |synth, states| -> LyricframeResult<Arc<FrameRGBA>> {
                            let synth = synth.as_mut().map_err(|e| {
                                LyricframeError::validation(format!(
                                    "frame synthesizer unavailable: {e}"
                                ))
                            })?;
                            self.draw(synth, states).map(Arc::new)
                        },
                    )
                    .collect::<LyricframeResult<Vec<_>>>()
            })?,
            (None, None) => {
                return Err(LyricframeError::validation(
                    "render_range needs a thread pool or a frame synthesizer",
                ));
            }
        };

        for (i, f) in (start..end).enumerate() {
            send(
                tx,
                FrameMsg {
                    idx: FrameIndex(f),
                    frame: Arc::clone(&frames[map[i]]),
                },
            )?;
        }

        let total = end - start;
        let rendered = frames.len() as u64;
        Ok(RenderStats {
            frames_total: total,
            frames_rendered: rendered,
            frames_elided: total.saturating_sub(rendered),
        })
    }
}

/// Render `request` to an MP4 with its audio track.
///
/// Frames are streamed into a silent intermediate next to the output (`<stem>.silent.mp4`), which
/// is then muxed with the audio and removed. When muxing fails the intermediate is kept and its
/// path is reported in [`LyricframeError::Encoding`].
#[tracing::instrument(skip_all, fields(out = %request.out_path.display()))]
pub fn render(request: RenderRequest, opts: RenderOpts) -> LyricframeResult<RenderReport> {
    if !request.audio.is_file() {
        return Err(LyricframeError::validation(format!(
            "audio source '{}' does not exist",
            request.audio.display()
        )));
    }
    if !opts.overwrite && request.out_path.exists() {
        return Err(LyricframeError::validation(format!(
            "output file '{}' already exists",
            request.out_path.display()
        )));
    }

    let session = RenderSession::new(&request.transcript, &request.style, opts.clone())?;

    let intermediate = intermediate_path_for(&request.out_path);
    let mut guard = TempFileGuard(Some(intermediate.clone()));
    let mut sink = FfmpegSink::new(FfmpegSinkOpts::new(intermediate.clone()));
    let stats = session.render_range(session.frame_range(), &mut sink)?;
    drop(sink);
    tracing::info!(
        frames = stats.frames_total,
        rendered = stats.frames_rendered,
        elided = stats.frames_elided,
        "silent video written"
    );

    let mux_opts = MuxOpts {
        overwrite: opts.overwrite,
        ..MuxOpts::default()
    };
    if let Err(e) = mux_audio(
        &intermediate,
        &request.audio,
        &request.out_path,
        &mux_opts,
        opts.cancel.as_ref(),
    ) {
        if matches!(e, LyricframeError::Encoding { .. }) {
            guard.keep();
        }
        return Err(e);
    }

    tracing::info!(path = %request.out_path.display(), "render complete");
    Ok(RenderReport {
        path: request.out_path,
        stats,
    })
}

#[derive(Debug)]
struct FrameMsg {
    idx: FrameIndex,
    frame: Arc<FrameRGBA>,
}

fn send(tx: &mpsc::SyncSender<FrameMsg>, msg: FrameMsg) -> LyricframeResult<()> {
    tx.send(msg)
        .map_err(|_| LyricframeError::stream_write("encoder thread is not accepting frames"))
}

fn normalized_chunk_size(chunk_size: usize) -> u64 {
    if chunk_size == 0 {
        1
    } else {
        chunk_size as u64
    }
}

fn build_thread_pool(threads: Option<usize>) -> LyricframeResult<rayon::ThreadPool> {
    if let Some(n) = threads
        && n == 0
    {
        return Err(LyricframeError::validation(
            "render 'threads' must be >= 1 when set",
        ));
    }
    let mut builder = rayon::ThreadPoolBuilder::new();
    if let Some(n) = threads {
        builder = builder.num_threads(n);
    }
    builder.build().map_err(|e| {
        LyricframeError::validation(format!("failed to build rayon thread pool: {e}"))
    })
}

struct TempFileGuard(Option<PathBuf>);

impl TempFileGuard {
    fn keep(&mut self) {
        self.0 = None;
    }
}

impl Drop for TempFileGuard {
    fn drop(&mut self) {
        if let Some(path) = self.0.take() {
            let _ = std::fs::remove_file(path);
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/session/render_session.rs"]
mod tests;
