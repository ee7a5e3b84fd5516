use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize};

use crate::foundation::error::{LyricframeError, LyricframeResult};

/// Seconds of background-only video appended after the last segment.
pub const TAIL_PADDING_SECS: f64 = 3.0;

/// Output duration used when the transcript has no segments.
pub const EMPTY_TRANSCRIPT_SECS: f64 = 10.0;

/// One timed word inside a [`Segment`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Word {
    /// Word text as sung.
    #[serde(rename = "word", alias = "text", deserialize_with = "de_trimmed")]
    pub text: String,
    /// Start time in seconds.
    pub start: f64,
    /// End time in seconds.
    pub end: f64,
}

impl Word {
    /// Build a word timing span.
    pub fn new(text: impl Into<String>, start: f64, end: f64) -> Self {
        Self {
            text: text.into(),
            start,
            end,
        }
    }
}

/// A time-bounded chunk of lyrics with its word timings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    /// Start time in seconds.
    pub start: f64,
    /// End time in seconds.
    pub end: f64,
    /// Display text.
    #[serde(deserialize_with = "de_trimmed")]
    pub text: String,
    /// Word timings in display order. May be empty.
    #[serde(default)]
    pub words: Vec<Word>,
}

impl Segment {
    /// Build a segment.
    pub fn new(start: f64, end: f64, text: impl Into<String>, words: Vec<Word>) -> Self {
        Self {
            start,
            end,
            text: text.into().trim().to_string(),
            words,
        }
    }

    /// Return `true` when `t` lies inside the closed interval `[start, end]`.
    pub fn contains(&self, t: f64) -> bool {
        self.start <= t && t <= self.end
    }
}

/// A declared-invariant violation found in a transcript.
///
/// Issues never abort a render; they are surfaced for diagnosis.
#[derive(Debug, Clone, PartialEq)]
pub enum TranscriptIssue {
    /// `segment.start >= segment.end`, or a non-finite bound.
    EmptySegmentSpan {
        /// Segment index.
        segment: usize,
    },
    /// Segment starts before the previous one ends.
    OverlapsPrevious {
        /// Segment index.
        segment: usize,
    },
    /// `word.start > word.end`, or a non-finite bound.
    InvertedWord {
        /// Segment index.
        segment: usize,
        /// Word index within the segment.
        word: usize,
    },
    /// Word extends outside its segment's span.
    WordOutsideSegment {
        /// Segment index.
        segment: usize,
        /// Word index within the segment.
        word: usize,
    },
    /// Word text is empty.
    EmptyWord {
        /// Segment index.
        segment: usize,
        /// Word index within the segment.
        word: usize,
    },
    /// Display text has a different token count than the word list.
    TokenCountMismatch {
        /// Segment index.
        segment: usize,
        /// Whitespace-delimited tokens in the display text.
        tokens: usize,
        /// Word timing entries.
        words: usize,
    },
}

impl std::fmt::Display for TranscriptIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptySegmentSpan { segment } => {
                write!(f, "segment {segment}: start must be < end")
            }
            Self::OverlapsPrevious { segment } => {
                write!(f, "segment {segment}: overlaps previous segment")
            }
            Self::InvertedWord { segment, word } => {
                write!(f, "segment {segment} word {word}: start must be <= end")
            }
            Self::WordOutsideSegment { segment, word } => {
                write!(f, "segment {segment} word {word}: outside segment span")
            }
            Self::EmptyWord { segment, word } => {
                write!(f, "segment {segment} word {word}: empty text")
            }
            Self::TokenCountMismatch {
                segment,
                tokens,
                words,
            } => write!(
                f,
                "segment {segment}: {tokens} display tokens but {words} word timings"
            ),
        }
    }
}

/// Ordered list of lyric segments.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Transcript {
    /// Segments in declared order.
    pub segments: Vec<Segment>,
}

impl<'de> Deserialize<'de> for Transcript {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        // Accept both a bare segment array and the `{ "segments": [...] }` envelope emitted by
        // word-timestamp transcribers.
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Bare(Vec<Segment>),
            Envelope { segments: Vec<Segment> },
        }

        Ok(match Repr::deserialize(deserializer)? {
            Repr::Bare(segments) | Repr::Envelope { segments } => Self { segments },
        })
    }
}

impl Transcript {
    /// Build a transcript from segments.
    pub fn new(segments: Vec<Segment>) -> Self {
        Self { segments }
    }

    /// Parse a transcript from a JSON reader.
    pub fn from_reader<R: std::io::Read>(r: R) -> LyricframeResult<Self> {
        serde_json::from_reader(r)
            .map_err(|e| LyricframeError::serde(format!("parse transcript JSON: {e}")))
    }

    /// Parse a transcript from a JSON file on disk.
    pub fn from_path(path: impl AsRef<Path>) -> LyricframeResult<Self> {
        let path = path.as_ref();
        let f = File::open(path).map_err(|e| {
            LyricframeError::validation(format!(
                "open transcript JSON '{}': {e}",
                path.display()
            ))
        })?;
        Self::from_reader(BufReader::new(f))
    }

    /// Return `true` when there are no segments.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Output duration in seconds: last segment end plus tail padding, or the empty minimum.
    ///
    /// A last end that is not finite, or so negative that nothing would be rendered, also yields
    /// the empty minimum; `diagnose` reports it.
    pub fn output_duration_secs(&self) -> f64 {
        match self.segments.last() {
            Some(last) => {
                let secs = last.end + TAIL_PADDING_SECS;
                if secs.is_finite() && secs > 0.0 {
                    secs
                } else {
                    EMPTY_TRANSCRIPT_SECS
                }
            }
            None => EMPTY_TRANSCRIPT_SECS,
        }
    }

    /// Report every declared-invariant violation, in segment order.
    pub fn diagnose(&self) -> Vec<TranscriptIssue> {
        let mut issues = Vec::new();
        let mut prev_end: Option<f64> = None;
        for (si, seg) in self.segments.iter().enumerate() {
            if !(seg.start.is_finite() && seg.end.is_finite() && seg.start < seg.end) {
                issues.push(TranscriptIssue::EmptySegmentSpan { segment: si });
            }
            if let Some(prev) = prev_end
                && seg.start < prev
            {
                issues.push(TranscriptIssue::OverlapsPrevious { segment: si });
            }
            prev_end = Some(seg.end);

            for (wi, w) in seg.words.iter().enumerate() {
                if w.text.is_empty() {
                    issues.push(TranscriptIssue::EmptyWord {
                        segment: si,
                        word: wi,
                    });
                }
                if !(w.start.is_finite() && w.end.is_finite() && w.start <= w.end) {
                    issues.push(TranscriptIssue::InvertedWord {
                        segment: si,
                        word: wi,
                    });
                } else if w.start < seg.start || w.end > seg.end {
                    issues.push(TranscriptIssue::WordOutsideSegment {
                        segment: si,
                        word: wi,
                    });
                }
            }

            let tokens = seg.text.split_whitespace().count();
            if tokens != seg.words.len() {
                issues.push(TranscriptIssue::TokenCountMismatch {
                    segment: si,
                    tokens,
                    words: seg.words.len(),
                });
            }
        }
        issues
    }
}

fn de_trimmed<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    Ok(s.trim().to_string())
}

#[cfg(test)]
#[path = "../../tests/unit/transcript/model.rs"]
mod tests;
