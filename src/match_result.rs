//! The result of a successful match.

use std::fmt;
use std::ops::Range;
use std::sync::Arc;

use crate::capture::{Capture, capture_at};
use crate::matchable::Source;

/// A successful match of a pattern against an input.
///
/// `start` and `end` are character offsets. Two results are equal when
/// they matched the same text.
#[derive(Clone)]
pub struct MatchResult {
    source: Arc<Source>,
    pub start: usize,
    pub end: usize,
    pub captures: Vec<Capture>,
}

impl MatchResult {
    pub(crate) fn new(source: &Arc<Source>, start: usize, end: usize) -> Self {
        Self::with_captures(source, start, end, Vec::new())
    }

    pub(crate) fn with_captures(
        source: &Arc<Source>,
        start: usize,
        end: usize,
        captures: Vec<Capture>,
    ) -> Self {
        Self {
            source: Arc::clone(source),
            start,
            end,
            captures,
        }
    }

    /// The matched text.
    pub fn value(&self) -> &str {
        self.source.slice(self.start, self.end)
    }

    /// The whole input the match was made against.
    pub fn input(&self) -> &str {
        self.source.text()
    }

    pub(crate) fn input_len(&self) -> usize {
        self.source.len()
    }

    pub fn span(&self) -> Range<usize> {
        self.start..self.end
    }

    pub fn is_zero_width(&self) -> bool {
        self.start == self.end
    }

    /// Capture at `index`, counting from the end when negative.
    pub fn capture(&self, index: isize) -> Option<&Capture> {
        capture_at(&self.captures, index)
    }

    pub fn has_captures(&self) -> bool {
        !self.captures.is_empty()
    }

    /// Append a capture, returning the match.
    pub fn with_capture(mut self, capture: impl Into<Capture>) -> Self {
        self.captures.push(capture.into());
        self
    }

    /// Append the captures of a sub-match.
    pub fn extend(&mut self, submatch: MatchResult) {
        self.captures.extend(submatch.captures);
    }
}

impl PartialEq for MatchResult {
    fn eq(&self, other: &Self) -> bool {
        self.value() == other.value()
    }
}

impl PartialEq<str> for MatchResult {
    fn eq(&self, other: &str) -> bool {
        self.value() == other
    }
}

impl PartialEq<&str> for MatchResult {
    fn eq(&self, other: &&str) -> bool {
        self.value() == *other
    }
}

impl fmt::Display for MatchResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.value())
    }
}

impl fmt::Debug for MatchResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MatchResult")
            .field("value", &self.value())
            .field("start", &self.start)
            .field("end", &self.end)
            .field("captures", &self.captures)
            .finish()
    }
}
