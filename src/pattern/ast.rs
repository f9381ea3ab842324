//! Pattern node types.

use std::sync::{Arc, OnceLock, Weak};

use super::Pattern;
use super::char_class::CharSet;
use crate::capture::Capture;
use crate::context::Context;
use crate::debug::DebugOptions;
use crate::error::MatchError;
use crate::match_result::MatchResult;
use crate::matchable::MatchableString;

/// Callback behind a function pattern. Receives the input, the match
/// position and the context.
pub type MatchFn = Arc<
    dyn Fn(&mut MatchableString, usize, &mut Context) -> Result<FnOutcome, MatchError>
        + Send
        + Sync,
>;

/// Callback that post-processes a successful match. Returning `None`
/// rejects the match.
pub type WrapFn = Arc<dyn Fn(MatchResult) -> Option<MatchResult> + Send + Sync>;

/// What a function pattern reports back.
#[derive(Debug, Clone)]
pub enum FnOutcome {
    /// A complete match, used as is.
    Match(MatchResult),
    /// A zero-width match at the current position.
    Accept,
    /// A match ending at the given position.
    End(usize),
    Reject,
}

impl From<bool> for FnOutcome {
    fn from(accept: bool) -> Self {
        if accept { Self::Accept } else { Self::Reject }
    }
}

impl From<Option<MatchResult>> for FnOutcome {
    fn from(result: Option<MatchResult>) -> Self {
        result.map_or(Self::Reject, Self::Match)
    }
}

/// How many times a repeat pattern runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepeatCount {
    /// As many times as possible, failing below the minimum.
    AtLeast(usize),
    /// Up to the limit, always succeeding.
    AtMost(usize),
    /// Exactly this many times.
    Exactly(usize),
}

/// `n ≥ 0` is "at least n", `n < 0` is "at most |n|".
impl From<i32> for RepeatCount {
    fn from(n: i32) -> Self {
        if n >= 0 {
            Self::AtLeast(n.unsigned_abs() as usize)
        } else {
            Self::AtMost(n.unsigned_abs() as usize)
        }
    }
}

/// `[n]` is "exactly n". The count is unsigned, so a negative exact count
/// does not type-check:
///
/// ```compile_fail
/// use pegmatch::{lit, repeat};
/// repeat(lit("a"), [-2]);
/// ```
impl From<[usize; 1]> for RepeatCount {
    fn from([n]: [usize; 1]) -> Self {
        Self::Exactly(n)
    }
}

/// A named placeholder bound to its target after construction.
#[derive(Clone)]
pub(crate) struct Reference {
    pub name: String,
    pub target: Arc<OnceLock<Target>>,
}

/// How a bound reference holds its rule. A reference back into a rule that
/// encloses it is weak, so recursive grammars form no ownership cycle.
pub(crate) enum Target {
    Strong(Pattern),
    Weak(Weak<Node>),
}

impl Reference {
    pub fn new(name: String) -> Self {
        Self {
            name,
            target: Arc::new(OnceLock::new()),
        }
    }

    /// The bound rule, or `None` when unbound or when a weakly held rule
    /// has been dropped.
    pub fn target(&self) -> Option<Pattern> {
        match self.target.get()? {
            Target::Strong(pattern) => Some(pattern.clone()),
            Target::Weak(node) => node.upgrade().map(Pattern),
        }
    }
}

#[derive(Clone)]
pub(crate) enum Kind {
    Literal {
        text: String,
        /// Length in characters.
        len: usize,
    },
    Class(CharSet),
    ExactCount(usize),
    /// Consumes the rest of the input when fewer than `n` characters remain.
    AtMostEndCount(usize),
    Boolean(bool),
    Function(MatchFn),
    StartOfLine,
    EndOfLine,

    Capture(Pattern),
    Constant(Capture),
    Group {
        pattern: Pattern,
        drop_empty: bool,
    },
    Position,
    Line,
    Column,
    BackCapture {
        name: String,
        pattern: Option<Pattern>,
        capture_index: Option<isize>,
    },

    StackCapture {
        stack: String,
        pattern: Pattern,
    },
    StackPop {
        stack: String,
        count: usize,
    },
    StackMatch {
        stack: String,
        index: isize,
        expected: Option<Capture>,
    },
    StackSize {
        stack: String,
        expected: Option<usize>,
    },

    Sequence(Vec<Pattern>),
    Choice(Vec<Pattern>),
    Not(Pattern),
    LookAhead(Pattern),
    Repeat {
        pattern: Pattern,
        count: RepeatCount,
    },
    Reference(Reference),
    Select {
        pattern: Pattern,
        index: isize,
        default: Option<Capture>,
    },
    Wrap {
        pattern: Pattern,
        f: WrapFn,
    },
}

impl Kind {
    /// Direct sub-patterns. A reference's target is not included.
    pub fn children(&self) -> &[Pattern] {
        match self {
            Self::Sequence(items) | Self::Choice(items) => items,
            Self::Capture(p)
            | Self::Group { pattern: p, .. }
            | Self::BackCapture {
                pattern: Some(p), ..
            }
            | Self::StackCapture { pattern: p, .. }
            | Self::Not(p)
            | Self::LookAhead(p)
            | Self::Repeat { pattern: p, .. }
            | Self::Select { pattern: p, .. }
            | Self::Wrap { pattern: p, .. } => std::slice::from_ref(p),
            _ => &[],
        }
    }

    /// Binding strength used when rendering: lower binds tighter.
    pub fn precedence(&self) -> u8 {
        match self {
            Self::Repeat { .. } => 4,
            Self::Not(_) | Self::LookAhead(_) => 5,
            Self::Sequence(_) | Self::Select { .. } | Self::Wrap { .. } => 6,
            Self::Choice(_) => 7,
            _ => 1,
        }
    }
}

/// One node of a pattern tree.
#[derive(Clone)]
pub(crate) struct Node {
    pub kind: Kind,
    pub name: Option<String>,
    pub debug: Option<DebugOptions>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeat_count_from_integers() {
        assert_eq!(RepeatCount::from(0), RepeatCount::AtLeast(0));
        assert_eq!(RepeatCount::from(3), RepeatCount::AtLeast(3));
        assert_eq!(RepeatCount::from(-2), RepeatCount::AtMost(2));
        assert_eq!(RepeatCount::from([4]), RepeatCount::Exactly(4));
    }

    #[test]
    fn exact_count_takes_a_length() {
        let n = "abc".chars().count();
        assert_eq!(RepeatCount::from([n]), RepeatCount::Exactly(3));
    }
}
