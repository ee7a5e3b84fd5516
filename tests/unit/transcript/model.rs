use super::*;

#[test]
fn parses_transcriber_envelope_and_ignores_extra_fields() {
    let json = r#"{
      "text": " hello world",
      "segments": [
        {
          "id": 0, "seek": 0, "start": 2.0, "end": 4.0,
          "text": " hello world ",
          "tokens": [1, 2],
          "words": [
            {"word": " hello", "start": 2.0, "end": 2.8, "probability": 0.9},
            {"word": " world", "start": 3.0, "end": 4.0, "probability": 0.8}
          ]
        }
      ],
      "language": "en"
    }"#;
    let t = Transcript::from_reader(json.as_bytes()).unwrap();
    assert_eq!(t.segments.len(), 1);
    let seg = &t.segments[0];
    assert_eq!(seg.text, "hello world");
    assert_eq!(seg.words[0], Word::new("hello", 2.0, 2.8));
    assert_eq!(seg.words[1], Word::new("world", 3.0, 4.0));
}

#[test]
fn parses_bare_array_with_missing_words() {
    let json = r#"[{"start": 0.5, "end": 1.5, "text": "la la"}]"#;
    let t = Transcript::from_reader(json.as_bytes()).unwrap();
    assert_eq!(t.segments[0].words, Vec::<Word>::new());
}

#[test]
fn accepts_text_alias_for_words() {
    let json = r#"[{"start": 0.0, "end": 1.0, "text": "hey",
                   "words": [{"text": "hey", "start": 0.0, "end": 1.0}]}]"#;
    let t = Transcript::from_reader(json.as_bytes()).unwrap();
    assert_eq!(t.segments[0].words[0].text, "hey");
}

#[test]
fn malformed_json_is_a_serde_error() {
    let err = Transcript::from_reader("{\"segments\": 3}".as_bytes()).unwrap_err();
    assert!(err.to_string().contains("serialization error:"));
}

#[test]
fn output_duration_pads_last_segment_or_uses_minimum() {
    assert_eq!(Transcript::default().output_duration_secs(), 10.0);

    let t = Transcript::new(vec![
        Segment::new(0.0, 9.0, "a", vec![]),
        Segment::new(10.0, 12.0, "b", vec![]),
    ]);
    assert_eq!(t.output_duration_secs(), 15.0);
}

#[test]
fn output_duration_uses_declared_last_segment() {
    // Out-of-order data is not repaired: the last listed segment decides.
    let t = Transcript::new(vec![
        Segment::new(10.0, 20.0, "a", vec![]),
        Segment::new(1.0, 2.0, "b", vec![]),
    ]);
    assert_eq!(t.output_duration_secs(), 5.0);
}

#[test]
fn non_finite_or_negative_end_uses_minimum_duration() {
    for end in [f64::NAN, f64::INFINITY, -3.0, -40.0] {
        let t = Transcript::new(vec![Segment::new(-50.0, end, "a", vec![])]);
        assert_eq!(t.output_duration_secs(), EMPTY_TRANSCRIPT_SECS, "end {end}");
    }
}

#[test]
fn diagnose_clean_transcript_is_empty() {
    let t = Transcript::new(vec![Segment::new(
        2.0,
        4.0,
        "hello world",
        vec![Word::new("hello", 2.0, 2.8), Word::new("world", 3.0, 4.0)],
    )]);
    assert!(t.diagnose().is_empty());
}

#[test]
fn diagnose_reports_each_violation() {
    let t = Transcript::new(vec![
        Segment::new(
            2.0,
            4.0,
            "hello big world",
            vec![Word::new("hello", 2.5, 2.0), Word::new("world", 3.0, 4.5)],
        ),
        Segment::new(3.0, 3.0, "x", vec![Word::new("", 3.0, 3.0)]),
    ]);
    let issues = t.diagnose();
    assert!(issues.contains(&TranscriptIssue::InvertedWord {
        segment: 0,
        word: 0
    }));
    assert!(issues.contains(&TranscriptIssue::WordOutsideSegment {
        segment: 0,
        word: 1
    }));
    assert!(issues.contains(&TranscriptIssue::TokenCountMismatch {
        segment: 0,
        tokens: 3,
        words: 2
    }));
    assert!(issues.contains(&TranscriptIssue::EmptySegmentSpan { segment: 1 }));
    assert!(issues.contains(&TranscriptIssue::OverlapsPrevious { segment: 1 }));
    assert!(issues.contains(&TranscriptIssue::EmptyWord {
        segment: 1,
        word: 0
    }));
    assert!(
        issues
            .iter()
            .any(|i| i.to_string() == "segment 1: overlaps previous segment")
    );
}
