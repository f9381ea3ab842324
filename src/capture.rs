//! Captured values.

use std::fmt;

use itertools::Itertools;

/// One captured value.
///
/// Captures form a tree: [`Capture::List`] holds the captures grouped by a
/// capture-group pattern, each of which may itself be a list.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Capture {
    /// A matched substring, or a text constant.
    Text(String),
    /// An integer constant or a stack size.
    Int(i64),
    Bool(bool),
    /// A character offset into the input.
    Position(usize),
    /// A 1-based line number.
    Line(usize),
    /// A 1-based column number.
    Column(usize),
    List(Vec<Capture>),
}

impl Capture {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Capture]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }
}

impl fmt::Display for Capture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => f.write_str(s),
            Self::Int(n) => write!(f, "{n}"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Position(n) | Self::Line(n) | Self::Column(n) => write!(f, "{n}"),
            Self::List(items) => write!(f, "[{}]", items.iter().join(", ")),
        }
    }
}

impl From<&str> for Capture {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for Capture {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<i64> for Capture {
    fn from(n: i64) -> Self {
        Self::Int(n)
    }
}

impl From<bool> for Capture {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<Vec<Capture>> for Capture {
    fn from(items: Vec<Capture>) -> Self {
        Self::List(items)
    }
}

/// Look up `index` in `captures`, counting from the end when negative.
pub(crate) fn capture_at(captures: &[Capture], index: isize) -> Option<&Capture> {
    let i = if index < 0 {
        captures.len().checked_sub(index.unsigned_abs())?
    } else {
        index as usize
    };
    captures.get(i)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_nested_list() {
        let c = Capture::List(vec![
            "a".into(),
            Capture::Position(3),
            Capture::List(vec![]),
        ]);
        assert_eq!(c.to_string(), "[a, 3, []]");
    }

    #[test]
    fn capture_at_negative_index() {
        let caps: Vec<Capture> = vec!["0".into(), "1".into(), "2".into()];
        assert_eq!(capture_at(&caps, -1), Some(&Capture::from("2")));
        assert_eq!(capture_at(&caps, 1), Some(&Capture::from("1")));
        assert_eq!(capture_at(&caps, 3), None);
        assert_eq!(capture_at(&caps, -4), None);
    }
}
