use super::*;
use crate::assets::font::LoadedFont;
use crate::transcript::model::Segment;

fn engine() -> TextLayoutEngine {
    TextLayoutEngine::new(&LoadedFont::builtin(60.0).unwrap()).unwrap()
}

fn canvas() -> Canvas {
    Canvas {
        width: 1920,
        height: 1080,
    }
}

#[test]
fn single_line_is_centered() {
    let mut e = engine();
    let layout = SegmentLayout::prepare("hello world", &mut e, canvas());
    assert_eq!(layout.lines().len(), 1);

    let line = &layout.lines()[0];
    assert!((line.x + line.width / 2.0 - 960.0).abs() < 0.5);
    assert!((line.top + layout.line_height() / 2.0 - 540.0).abs() < 0.5);
    assert_eq!(line.tokens.len(), 2);
    assert_eq!(line.tokens[0].x, line.x);
    assert!(line.tokens[1].x > line.tokens[0].x);
}

#[test]
fn slots_run_across_lines() {
    let mut e = engine();
    let text = "one two three four five six seven eight nine ten eleven twelve thirteen \
                fourteen fifteen sixteen seventeen eighteen nineteen twenty";
    let layout = SegmentLayout::prepare(text, &mut e, canvas());
    assert!(layout.lines().len() >= 2);

    let slots: Vec<usize> = layout.tokens().map(|t| t.slot).collect();
    assert_eq!(slots, (0..20).collect::<Vec<_>>());

    let tops: Vec<f32> = layout.lines().iter().map(|l| l.top).collect();
    for pair in tops.windows(2) {
        assert!((pair[1] - pair[0] - layout.line_height()).abs() < 1e-3);
    }
    for line in layout.lines() {
        assert!(line.width <= 1920.0 * WRAP_WIDTH_FRACTION);
    }
}

#[test]
fn glyphs_are_placed_in_canvas_space() {
    let mut e = engine();
    let layout = SegmentLayout::prepare("Tg", &mut e, canvas());
    let line = &layout.lines()[0];
    let token = &line.tokens[0];
    assert!(!token.glyphs.is_empty());
    assert!(token.glyphs[0].x >= token.x - 0.5);
    assert!(token.glyphs[0].y > line.top);
    assert!(token.glyphs[0].y < line.top + layout.line_height());
}

#[test]
fn empty_text_has_no_lines() {
    let mut e = engine();
    let layout = SegmentLayout::prepare("   ", &mut e, canvas());
    assert!(layout.lines().is_empty());
    assert_eq!(layout.tokens().count(), 0);
}

#[test]
fn prepared_transcript_indexes_by_segment() {
    let mut e = engine();
    let t = Transcript::new(vec![
        Segment::new(0.0, 1.0, "first", vec![]),
        Segment::new(1.0, 2.0, "second line", vec![]),
    ]);
    let prepared = PreparedTranscript::prepare(&t, &mut e, canvas());
    assert_eq!(prepared.len(), 2);
    assert_eq!(prepared.segment(1).unwrap().tokens().count(), 2);
    assert!(prepared.segment(2).is_none());
}
