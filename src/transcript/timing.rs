use smallvec::SmallVec;

use crate::transcript::model::{Transcript, Word};

/// Temporal display state of one word relative to the playback time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WordState {
    /// Not yet reached (`t < start`).
    Pending,
    /// Being sung (`start <= t <= end`).
    Active,
    /// Already sung (`t > end`).
    Sung,
}

impl WordState {
    /// State of `word` at playback time `t`.
    pub fn at(word: &Word, t: f64) -> Self {
        if word.start <= t && t <= word.end {
            Self::Active
        } else if t > word.end {
            Self::Sung
        } else {
            Self::Pending
        }
    }
}

/// Inline capacity covering typical lyric lines without heap allocation.
pub(crate) type WordStates = SmallVec<[WordState; 16]>;

/// Result of resolving one playback instant against a transcript.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Classification {
    segment: Option<usize>,
    states: WordStates,
}

impl Classification {
    /// Index of the active segment, if any.
    pub fn segment(&self) -> Option<usize> {
        self.segment
    }

    /// Per-word states of the active segment, in word order. Empty when no segment is active.
    pub fn states(&self) -> &[WordState] {
        &self.states
    }

    /// State for the word slot `slot`; slots past the word list are [`WordState::Pending`].
    pub fn state_for_slot(&self, slot: usize) -> WordState {
        self.states.get(slot).copied().unwrap_or(WordState::Pending)
    }

    /// Identity of the rendered frame: equal keys draw identical pixels.
    pub fn frame_key(&self) -> FrameKey {
        FrameKey(self.clone())
    }
}

/// Hashable identity of a frame's visual state (active segment + word states).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FrameKey(Classification);

/// Select the first segment containing `t` and classify each of its words.
///
/// Overlapping segments resolve to the earliest-listed one.
pub fn classify(transcript: &Transcript, t: f64) -> Classification {
    let Some((idx, seg)) = transcript
        .segments
        .iter()
        .enumerate()
        .find(|(_, s)| s.contains(t))
    else {
        return Classification::default();
    };

    Classification {
        segment: Some(idx),
        states: seg.words.iter().map(|w| WordState::at(w, t)).collect(),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/transcript/timing.rs"]
mod tests;
