//! Error types for pattern construction and matching.
//!
//! A pattern that does not match is not an error: matching returns
//! `Ok(None)`. The errors here describe grammar mistakes caught while
//! building patterns and API misuse caught while matching.

use std::fmt;

/// Errors raised while constructing patterns, grammars or debug options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatternError {
    /// A character range whose lower bound is above its upper bound.
    InvertedRange { lo: char, hi: char },
    /// A grammar token rule whose pattern has no name.
    UnnamedToken { grammar: String },
    /// A grammar switch whose end pattern has no name.
    UnnamedEndPattern { grammar: String },
    /// Two grammars registered under the same name.
    DuplicateGrammar(String),
    /// A grammar name that no registered grammar carries.
    UnknownGrammar(String),
    /// A reference that is already bound to a different pattern.
    ReferenceRebound(String),
    /// A pattern without a name offered as a reference binding.
    UnnamedRule,
    /// A debug filter specification that could not be parsed.
    InvalidDebugFilter { spec: String, position: usize },
    /// A debug filter name that is not registered.
    UnknownDebugFilter(String),
}

impl fmt::Display for PatternError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvertedRange { lo, hi } => {
                write!(f, "Lower range value must not exceed upper value: {lo:?}..{hi:?}")
            }
            Self::UnnamedToken { grammar } => {
                write!(f, "Token patterns in grammar '{grammar}' must have a name")
            }
            Self::UnnamedEndPattern { grammar } => {
                write!(f, "End pattern for grammar '{grammar}' must have a name")
            }
            Self::DuplicateGrammar(name) => write!(f, "Grammar '{name}' is defined twice"),
            Self::UnknownGrammar(name) => {
                write!(f, "No grammar named '{name}' has been registered")
            }
            Self::ReferenceRebound(name) => {
                write!(f, "Reference '{name}' is already bound to a different pattern")
            }
            Self::UnnamedRule => write!(f, "Reference bindings must be named patterns"),
            Self::InvalidDebugFilter { spec, position } => {
                write!(f, "Invalid debug filter {spec:?} at offset {position}")
            }
            Self::UnknownDebugFilter(name) => write!(f, "Unknown debug filter '{name}'"),
        }
    }
}

impl std::error::Error for PatternError {}

/// Consistency errors raised while matching.
///
/// These indicate a grammar that misuses back-captures or stacks, never
/// an input that merely fails to match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchError {
    /// The start offset of a top-level match lies outside the input.
    IndexOutOfRange { index: isize, len: usize },
    /// A back-capture reference to a name that was never bound.
    UnboundBackCapture {
        name: String,
        position: usize,
        pattern: Option<String>,
    },
    /// A stack pop asked for more entries than the stack holds.
    StackUnderflow {
        stack: String,
        requested: usize,
        available: usize,
        position: usize,
        pattern: Option<String>,
    },
    /// A capture index beyond the captures of a match.
    CaptureIndexOutOfRange {
        index: isize,
        available: usize,
        position: usize,
        pattern: Option<String>,
    },
    /// A callback produced a span outside `index..=len`.
    InvalidSpan {
        start: usize,
        end: usize,
        position: usize,
    },
    /// Pattern nesting went deeper than the configured limit.
    RecursionLimit { limit: usize, position: usize },
    /// The back-capture list was restored to a length it never had.
    BackCaptureUnderflow { expected: usize, actual: usize },
}

impl fmt::Display for MatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IndexOutOfRange { index, len } => {
                write!(f, "Invalid index {index} for input of length {len}")
            }
            Self::UnboundBackCapture {
                name,
                position,
                pattern,
            } => {
                write!(f, "No back-capture was found for '{name}'")?;
                write_location(f, *position, pattern.as_deref())
            }
            Self::StackUnderflow {
                stack,
                requested,
                available,
                position,
                pattern,
            } => {
                write!(f, "Cannot pop {requested} from stack '{stack}' holding {available}")?;
                write_location(f, *position, pattern.as_deref())
            }
            Self::CaptureIndexOutOfRange {
                index,
                available,
                position,
                pattern,
            } => {
                write!(f, "Capture index {index} is invalid for {available} captures")?;
                write_location(f, *position, pattern.as_deref())
            }
            Self::InvalidSpan {
                start,
                end,
                position,
            } => write!(f, "Callback returned invalid span {start}..{end} (at {position})"),
            Self::RecursionLimit { limit, position } => {
                write!(f, "Pattern nesting exceeded {limit} levels (at {position})")
            }
            Self::BackCaptureUnderflow { expected, actual } => write!(
                f,
                "The back-capture list is shorter than expected ({actual} < {expected})"
            ),
        }
    }
}

fn write_location(f: &mut fmt::Formatter<'_>, position: usize, pattern: Option<&str>) -> fmt::Result {
    match pattern {
        Some(name) => write!(f, " (in <{name}> at {position})"),
        None => write!(f, " (at {position})"),
    }
}

impl MatchError {
    /// Attribute the error to the pattern `name` unless an inner named
    /// pattern already claimed it.
    pub(crate) fn in_pattern(mut self, name: Option<&str>) -> Self {
        if let (
            Self::UnboundBackCapture { pattern, .. }
            | Self::StackUnderflow { pattern, .. }
            | Self::CaptureIndexOutOfRange { pattern, .. },
            Some(name),
        ) = (&mut self, name)
            && pattern.is_none()
        {
            *pattern = Some(name.to_string());
        }
        self
    }

    /// Name of the innermost named pattern the error was raised in.
    pub fn pattern(&self) -> Option<&str> {
        match self {
            Self::UnboundBackCapture { pattern, .. }
            | Self::StackUnderflow { pattern, .. }
            | Self::CaptureIndexOutOfRange { pattern, .. } => pattern.as_deref(),
            _ => None,
        }
    }
}

impl std::error::Error for MatchError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_pattern() {
        let err = MatchError::UnboundBackCapture {
            name: "q".to_string(),
            position: 3,
            pattern: None,
        };
        assert_eq!(err.to_string(), "No back-capture was found for 'q' (at 3)");
        let err = err.in_pattern(Some("string")).in_pattern(Some("outer"));
        assert_eq!(err.pattern(), Some("string"));
        assert_eq!(
            err.to_string(),
            "No back-capture was found for 'q' (in <string> at 3)"
        );
    }

    #[test]
    fn other_errors_are_not_attributed() {
        let err = MatchError::RecursionLimit {
            limit: 4,
            position: 0,
        }
        .in_pattern(Some("rule"));
        assert_eq!(err.pattern(), None);
    }
}
