//! Character class membership tests.

use std::fmt;

use crate::error::PatternError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CharClass {
    Single(char),
    /// Inclusive range.
    Range(char, char),
}

impl CharClass {
    pub fn contains(&self, ch: char) -> bool {
        match *self {
            Self::Single(c) => c == ch,
            Self::Range(lo, hi) => lo <= ch && ch <= hi,
        }
    }
}

/// A set of characters built from single characters and ranges.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharSet {
    classes: Vec<CharClass>,
}

impl CharSet {
    /// Every character of `chars` is a member.
    pub fn from_chars(chars: &str) -> Self {
        Self {
            classes: chars.chars().map(CharClass::Single).collect(),
        }
    }

    /// Members fall within at least one inclusive `(lo, hi)` range.
    pub fn from_ranges(ranges: &[(char, char)]) -> Result<Self, PatternError> {
        let classes = ranges
            .iter()
            .map(|&(lo, hi)| {
                if lo > hi {
                    Err(PatternError::InvertedRange { lo, hi })
                } else {
                    Ok(CharClass::Range(lo, hi))
                }
            })
            .collect::<Result<_, _>>()?;
        Ok(Self { classes })
    }

    pub(crate) fn from_classes(classes: Vec<CharClass>) -> Self {
        Self { classes }
    }

    pub fn contains(&self, ch: char) -> bool {
        self.classes.iter().any(|c| c.contains(ch))
    }
}

/// Renders as a PEG bracket expression, e.g. `[a-z_]`.
impl fmt::Display for CharSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for class in &self.classes {
            match *class {
                CharClass::Single(c) => write_class_char(f, c)?,
                CharClass::Range(lo, hi) => {
                    write_class_char(f, lo)?;
                    f.write_str("-")?;
                    write_class_char(f, hi)?;
                }
            }
        }
        f.write_str("]")
    }
}

fn write_class_char(f: &mut fmt::Formatter<'_>, c: char) -> fmt::Result {
    match c {
        '\n' => f.write_str("\\n"),
        '\r' => f.write_str("\\r"),
        '\t' => f.write_str("\\t"),
        ']' | '\\' | '-' | '^' => write!(f, "\\{c}"),
        _ => write!(f, "{c}"),
    }
}
