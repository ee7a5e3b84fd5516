use super::*;
use crate::assets::background::DEFAULT_BACKGROUND_RGBA;
use crate::assets::font::FontOrigin;
use crate::encode::sink::InMemorySink;
use crate::foundation::core::{Canvas, Fps};
use crate::style::config::FontSpec;
use crate::transcript::model::{Segment, Word};
use crate::transcript::timing::WordState;

fn style() -> StyleConfig {
    StyleConfig {
        canvas: Canvas {
            width: 320,
            height: 180,
        },
        fps: Fps { num: 10, den: 1 },
        font_size_px: 32.0,
        ..StyleConfig::default()
    }
}

fn transcript() -> Transcript {
    Transcript::new(vec![Segment::new(
        2.0,
        4.0,
        "hello world",
        vec![Word::new("hello", 2.0, 2.8), Word::new("world", 3.0, 4.0)],
    )])
}

fn opts(parallel: bool, elision: bool) -> RenderOpts {
    RenderOpts {
        parallel,
        threads: parallel.then_some(2),
        chunk_size: 16,
        static_frame_elision: elision,
        ..RenderOpts::default()
    }
}

struct FailingSink {
    fail_at: u64,
}

impl FrameSink for FailingSink {
    fn begin(&mut self, _cfg: SinkConfig) -> LyricframeResult<()> {
        Ok(())
    }

    fn push_frame(&mut self, idx: FrameIndex, _frame: &FrameRGBA) -> LyricframeResult<()> {
        if idx.0 == self.fail_at {
            return Err(LyricframeError::validation("sink refused frame"));
        }
        Ok(())
    }

    fn end(&mut self) -> LyricframeResult<()> {
        Ok(())
    }
}

#[test]
fn frame_count_covers_tail_padding() {
    let sess = RenderSession::new(&transcript(), &style(), opts(false, false)).unwrap();
    assert_eq!(sess.total_frames(), 70);
    assert_eq!(sess.frame_range(), FrameRange::first(70));

    let empty = RenderSession::new(&Transcript::default(), &style(), opts(false, false)).unwrap();
    assert_eq!(empty.total_frames(), 100);
}

#[test]
fn malformed_last_segment_still_renders_a_timeline() {
    for end in [f64::NAN, -5.0, f64::INFINITY] {
        let t = Transcript::new(vec![Segment::new(-8.0, end, "broken", vec![])]);
        let sess = RenderSession::new(&t, &style(), opts(false, false)).unwrap();
        assert_eq!(sess.total_frames(), 100, "end {end}");

        let mut sink = InMemorySink::new();
        sess.render_range(FrameRange::first(3), &mut sink).unwrap();
        assert_eq!(sink.frames().len(), 3);
    }

    // Padded end just above zero: shorter than one frame, still one frame.
    let t = Transcript::new(vec![Segment::new(-3.5, -2.99, "x", vec![])]);
    let sess = RenderSession::new(&t, &style(), opts(false, false)).unwrap();
    assert_eq!(sess.total_frames(), 1);
}

#[test]
fn classify_frame_uses_frame_time() {
    let sess = RenderSession::new(&transcript(), &style(), opts(false, false)).unwrap();
    let c = sess.classify_frame(FrameIndex(25));
    assert_eq!(c.segment(), Some(0));
    assert_eq!(c.states(), &[WordState::Active, WordState::Pending]);
    let c = sess.classify_frame(FrameIndex(35));
    assert_eq!(c.states(), &[WordState::Sung, WordState::Active]);
    assert_eq!(sess.classify_frame(FrameIndex(50)).segment(), None);
}

#[test]
fn frames_outside_segments_are_plain_background() {
    let sess = RenderSession::new(&transcript(), &style(), opts(false, false)).unwrap();
    let before = sess.render_frame(FrameIndex(0)).unwrap();
    let after = sess.render_frame(FrameIndex(69)).unwrap();
    assert_eq!(before.data, sess.backdrop().data());
    assert_eq!(after.data, sess.backdrop().data());
    assert!(
        before
            .data
            .chunks_exact(4)
            .all(|px| px == DEFAULT_BACKGROUND_RGBA)
    );

    let during = sess.render_at(3.5).unwrap();
    assert_ne!(during.data, before.data);
}

#[test]
fn render_frame_rejects_out_of_range() {
    let sess = RenderSession::new(&transcript(), &style(), opts(false, false)).unwrap();
    let err = sess.render_frame(FrameIndex(70)).unwrap_err();
    assert!(matches!(err, LyricframeError::Validation(_)));
}

#[test]
fn missing_assets_fall_back() {
    let style = StyleConfig {
        font: FontSpec::Path(PathBuf::from("/no/such/font.ttf")),
        background: Some(PathBuf::from("/no/such/background.jpg")),
        ..style()
    };
    let sess = RenderSession::new(&transcript(), &style, opts(false, false)).unwrap();
    assert_eq!(sess.font().origin(), FontOrigin::Builtin);
    assert!(
        sess.backdrop()
            .data()
            .chunks_exact(4)
            .all(|px| px == DEFAULT_BACKGROUND_RGBA)
    );
}

#[test]
fn render_range_parallel_matches_sequential_output() {
    let range = FrameRange::new(FrameIndex(15), FrameIndex(45)).unwrap();

    let seq = RenderSession::new(&transcript(), &style(), opts(false, false)).unwrap();
    let mut sink_seq = InMemorySink::new();
    let stats = seq.render_range(range, &mut sink_seq).unwrap();
    assert_eq!(
        stats,
        RenderStats {
            frames_total: 30,
            frames_rendered: 30,
            frames_elided: 0,
        }
    );

    let par = RenderSession::new(&transcript(), &style(), opts(true, false)).unwrap();
    let mut sink_par = InMemorySink::new();
    par.render_range(range, &mut sink_par).unwrap();

    assert_eq!(
        sink_par.config(),
        Some(&SinkConfig {
            width: 320,
            height: 180,
            fps: Fps { num: 10, den: 1 },
        })
    );
    assert!(sink_par.is_ended());
    assert_eq!(sink_seq.frames().len(), 30);
    assert_eq!(sink_par.frames().len(), 30);
    for (i, ((idx_a, a), (idx_b, b))) in sink_seq
        .frames()
        .iter()
        .zip(sink_par.frames().iter())
        .enumerate()
    {
        assert_eq!(idx_a.0, 15 + i as u64);
        assert_eq!(idx_a, idx_b);
        assert_eq!(a.data, b.data);
    }
}

#[test]
fn static_frame_elision_reuses_identical_frames() {
    for parallel in [false, true] {
        let plain = RenderSession::new(&transcript(), &style(), opts(parallel, false)).unwrap();
        let mut sink_plain = InMemorySink::new();
        plain
            .render_range(plain.frame_range(), &mut sink_plain)
            .unwrap();

        let elided = RenderSession::new(&transcript(), &style(), opts(parallel, true)).unwrap();
        let mut sink_elided = InMemorySink::new();
        let stats = elided
            .render_range(elided.frame_range(), &mut sink_elided)
            .unwrap();

        assert_eq!(stats.frames_total, 70);
        assert!(stats.frames_rendered < 20, "{stats:?}");
        assert_eq!(stats.frames_rendered + stats.frames_elided, 70);
        for ((_, a), (_, b)) in sink_plain.frames().iter().zip(sink_elided.frames()) {
            assert_eq!(a.data, b.data);
        }
    }
}

#[test]
fn cancelled_render_stops() {
    let flag = CancelFlag::new();
    flag.cancel();
    let sess = RenderSession::new(
        &transcript(),
        &style(),
        RenderOpts {
            cancel: Some(flag),
            ..opts(true, true)
        },
    )
    .unwrap();
    let mut sink = InMemorySink::new();
    let err = sess.render_range(sess.frame_range(), &mut sink).unwrap_err();
    assert!(matches!(err, LyricframeError::Cancelled));
}

#[test]
fn sink_errors_are_reported() {
    for parallel in [false, true] {
        let sess = RenderSession::new(&transcript(), &style(), opts(parallel, false)).unwrap();
        let mut sink = FailingSink { fail_at: 3 };
        let err = sess
            .render_range(sess.frame_range(), &mut sink)
            .unwrap_err();
        assert!(matches!(err, LyricframeError::Validation(_)), "{err}");
    }
}

#[test]
fn invalid_ranges_and_threads_are_rejected() {
    let sess = RenderSession::new(&transcript(), &style(), opts(false, false)).unwrap();
    let mut sink = InMemorySink::new();
    assert!(
        sess.render_range(FrameRange::first(0), &mut sink)
            .is_err()
    );
    assert!(
        sess.render_range(FrameRange::first(71), &mut sink)
            .is_err()
    );

    let bad = RenderSession::new(
        &transcript(),
        &style(),
        RenderOpts {
            threads: Some(0),
            ..opts(true, false)
        },
    )
    .unwrap();
    let err = bad
        .render_range(bad.frame_range(), &mut sink)
        .unwrap_err();
    assert!(matches!(err, LyricframeError::Validation(_)));
}

#[test]
fn render_requires_existing_audio() {
    let request = RenderRequest {
        transcript: transcript(),
        style: style(),
        audio: PathBuf::from("/no/such/song.mp3"),
        out_path: std::env::temp_dir().join("lyricframe_no_audio.mp4"),
    };
    let err = render(request, RenderOpts::default()).unwrap_err();
    assert!(matches!(err, LyricframeError::Validation(_)));
}
