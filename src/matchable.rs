//! The input side of a match: text, back-captures and the line index.
//!
//! All positions are **character** (not byte) indices into the text.

use std::cell::OnceCell;
use std::sync::Arc;

use ropey::Rope;

use crate::capture::Capture;
use crate::error::MatchError;
use crate::match_result::MatchResult;

/// Immutable input text with a character-to-byte offset table.
///
/// Shared between a [`MatchableString`] and every
/// [`MatchResult`](crate::MatchResult) produced from it.
#[derive(Debug)]
pub(crate) struct Source {
    text: String,
    /// Byte offset of each character, followed by `text.len()`.
    offsets: Vec<usize>,
}

impl Source {
    fn new(text: &str) -> Self {
        let mut offsets: Vec<usize> = text.char_indices().map(|(i, _)| i).collect();
        offsets.push(text.len());
        Self {
            text: text.to_string(),
            offsets,
        }
    }

    pub(crate) fn text(&self) -> &str {
        &self.text
    }

    pub(crate) fn len(&self) -> usize {
        self.offsets.len() - 1
    }

    /// The text between two character positions, clamped to the input.
    pub(crate) fn slice(&self, start: usize, end: usize) -> &str {
        let end = end.min(self.len());
        let start = start.min(end);
        &self.text[self.offsets[start]..self.offsets[end]]
    }

    pub(crate) fn char_at(&self, index: usize) -> Option<char> {
        if index >= self.len() {
            return None;
        }
        self.text[self.offsets[index]..].chars().next()
    }
}

/// Input text wrapped for one top-level match.
///
/// Besides the text itself this owns the back-capture list: an ordered list
/// of `(name, value)` bindings, appended to as back-capture patterns succeed
/// and truncated back to a saved length whenever a pattern fails.
#[derive(Debug)]
pub struct MatchableString {
    source: Arc<Source>,
    back_captures: Vec<(String, Capture)>,
    lines: OnceCell<Rope>,
}

impl MatchableString {
    pub fn new(text: &str) -> Self {
        Self {
            source: Arc::new(Source::new(text)),
            back_captures: Vec::new(),
            lines: OnceCell::new(),
        }
    }

    pub(crate) fn source(&self) -> &Arc<Source> {
        &self.source
    }

    pub fn as_str(&self) -> &str {
        self.source.text()
    }

    /// Length in characters.
    pub fn len(&self) -> usize {
        self.source.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn char_at(&self, index: usize) -> Option<char> {
        self.source.char_at(index)
    }

    /// The text between two character positions, clamped to the input.
    pub fn slice(&self, start: usize, end: usize) -> &str {
        self.source.slice(start, end)
    }

    /// A match over `start..end` of this input, with no captures.
    pub fn match_span(&self, start: usize, end: usize) -> MatchResult {
        MatchResult::new(&self.source, start, end)
    }

    /// Test whether `literal`, `char_len` characters long, occurs at `index`.
    pub(crate) fn has_at(&self, index: usize, literal: &str, char_len: usize) -> bool {
        index + char_len <= self.len() && self.slice(index, index + char_len) == literal
    }

    /// Resolve a caller-supplied offset: negative values count from the end.
    pub fn normalize_index(&self, index: isize) -> Result<usize, MatchError> {
        let len = self.len();
        let resolved = if index < 0 {
            len.checked_sub(index.unsigned_abs())
        } else {
            Some(index as usize).filter(|&i| i <= len)
        };
        resolved.ok_or(MatchError::IndexOutOfRange { index, len })
    }

    /// Bind `value` to `name`. Later bindings shadow earlier ones.
    pub fn add_back_capture(&mut self, name: impl Into<String>, value: Capture) {
        self.back_captures.push((name.into(), value));
    }

    /// The most recent value bound to `name`.
    pub fn back_capture(&self, name: &str) -> Option<&Capture> {
        self.back_captures
            .iter()
            .rev()
            .find(|(bound, _)| bound == name)
            .map(|(_, value)| value)
    }

    /// Number of bindings in the back-capture list.
    pub fn back_capture_len(&self) -> usize {
        self.back_captures.len()
    }

    /// Truncate the back-capture list to a previously saved length.
    pub fn restore_back_captures(&mut self, len: usize) -> Result<(), MatchError> {
        let actual = self.back_captures.len();
        if actual < len {
            return Err(MatchError::BackCaptureUnderflow {
                expected: len,
                actual,
            });
        }
        self.back_captures.truncate(len);
        Ok(())
    }

    fn rope(&self) -> &Rope {
        self.lines.get_or_init(|| Rope::from_str(self.source.text()))
    }

    /// 1-based line number of `index`. `\r`, `\n` and `\r\n` each end a line.
    pub fn line_number(&self, index: usize) -> usize {
        let index = index.min(self.len());
        self.rope().char_to_line(index) + 1
    }

    /// 1-based column of `index` within its line.
    pub fn column_number(&self, index: usize) -> usize {
        let index = index.min(self.len());
        let rope = self.rope();
        let line_start = rope.line_to_char(rope.char_to_line(index));
        index - line_start + 1
    }
}
