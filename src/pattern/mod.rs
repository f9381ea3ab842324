//! Pattern construction and matching.
//!
//! Patterns are immutable trees built from the functions in this module and
//! combined with the methods on [`Pattern`]. Cloning a pattern is cheap and
//! shares the tree; one tree can be matched from many threads at once.
//!
//! | Builder                        | PEG          | Matches                                  |
//! |--------------------------------|--------------|------------------------------------------|
//! | `lit("ab")`                    | `"ab"`       | The literal text                         |
//! | `set("abc")`                   | `[abc]`      | One character from the set               |
//! | `range(&[('a','z')])`          | `[a-z]`      | One character within a range             |
//! | `any(n)`                       | `.{n}`       | Exactly `n` characters                   |
//! | `fewer_than(n)`                | `P(-n)`      | The rest, when fewer than `n` remain     |
//! | `always()` / `never()`         |              | Zero width / nothing                     |
//! | `sol()` / `eol()`              |              | Start / end of a line                    |
//! | `seq([a, b])` / `a.then(b)`    | `a b`        | `a` followed by `b`                      |
//! | `choice([a, b])` / `a.or(b)`   | `a / b`      | `a`, or else `b`                         |
//! | `not(a)` / `lookahead(a)`      | `!a` / `&a`  | Zero-width assertions                    |
//! | `a.except(b)`                  | `!b a`       | `a` where `b` does not match             |
//! | `repeat(a, n)`                 | `a{n,}`      | At least `n` (`n ≥ 0`), at most `-n`     |
//! | `repeat(a, [n])`               | `a{n}`       | Exactly `n`                              |
//! | `reference("rule")`            | `<rule>`     | The rule bound by [`Pattern::bind`]      |
//! | `capture(a)`                   | `C(a)`       | `a`, capturing its text                  |
//! | `back_capture("q", a)`         | `Cb(q, a)`   | `a`, binding its text to `q`             |
//! | `back_ref("q")`                | `Cb(q)`      | The text last bound to `q`               |
//! | `stack_capture("s", a)`        | `Sc(s, a)`   | `a`, moving its captures onto stack `s`  |

mod ast;
mod bind;
pub mod char_class;
pub mod common;
mod display;
mod matcher;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

pub use ast::{FnOutcome, MatchFn, RepeatCount, WrapFn};
pub use bind::{bind_references, rule_map};
pub use char_class::CharSet;

use ast::{Kind, Node, Reference};

use crate::capture::Capture;
use crate::context::{Context, MatchConfig};
use crate::debug::DebugOptions;
use crate::error::{MatchError, PatternError};
use crate::match_result::MatchResult;
use crate::matchable::MatchableString;

/// A node in a pattern tree.
#[derive(Clone)]
pub struct Pattern(Arc<Node>);

impl Pattern {
    fn from_kind(kind: Kind) -> Self {
        Self(Arc::new(Node {
            kind,
            name: None,
            debug: None,
        }))
    }

    pub(crate) fn node(&self) -> &Node {
        &self.0
    }

    pub(crate) fn ptr_eq(&self, other: &Pattern) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Give the pattern a name, used by the tokenizer, by references and in
    /// debug output.
    pub fn named(self, name: impl Into<String>) -> Self {
        let mut node = Arc::unwrap_or_clone(self.0);
        node.name = Some(name.into());
        Self(Arc::new(node))
    }

    /// Trace matches of this pattern and its sub-patterns.
    pub fn debug(self, options: impl Into<DebugOptions>) -> Self {
        let mut node = Arc::unwrap_or_clone(self.0);
        node.debug = Some(options.into());
        Self(Arc::new(node))
    }

    pub fn name(&self) -> Option<&str> {
        self.0.name.as_deref()
    }

    pub fn debug_options(&self) -> Option<&DebugOptions> {
        self.0.debug.as_ref()
    }

    /// True for the patterns that produce captures of their own.
    pub fn is_capture(&self) -> bool {
        matches!(
            self.0.kind,
            Kind::Capture(_)
                | Kind::Constant(_)
                | Kind::Group { .. }
                | Kind::Position
                | Kind::Line
                | Kind::Column
        )
    }

    /// The stack a stack pattern works on.
    pub fn stack_name(&self) -> Option<&str> {
        match &self.0.kind {
            Kind::StackCapture { stack, .. }
            | Kind::StackPop { stack, .. }
            | Kind::StackMatch { stack, .. }
            | Kind::StackSize { stack, .. } => Some(stack),
            _ => None,
        }
    }

    // ─── Combinator methods ─────────────────────────────────────────────────

    pub fn then(self, next: impl Into<Pattern>) -> Self {
        seq([self, next.into()])
    }

    pub fn or(self, alternative: impl Into<Pattern>) -> Self {
        choice([self, alternative.into()])
    }

    /// Match `self` only where `excluded` does not match.
    pub fn except(self, excluded: impl Into<Pattern>) -> Self {
        seq([not(excluded.into()), self])
    }

    pub fn repeat(self, count: impl Into<RepeatCount>) -> Self {
        repeat(self, count)
    }

    /// Keep only the capture at `index`.
    pub fn select(self, index: isize) -> Self {
        select(self, index)
    }

    pub fn wrap(
        self,
        f: impl Fn(MatchResult) -> Option<MatchResult> + Send + Sync + 'static,
    ) -> Self {
        wrap(self, f)
    }

    /// Bind every reference reachable from this pattern to the rule of the
    /// same name. Returns the number of references bound.
    pub fn bind(&self, rules: impl IntoIterator<Item = Pattern>) -> Result<usize, PatternError> {
        bind_references(self, &rule_map(rules)?)
    }

    pub fn bind_map(&self, rules: &HashMap<String, Pattern>) -> Result<usize, PatternError> {
        bind_references(self, rules)
    }

    // ─── Matching ───────────────────────────────────────────────────────────

    /// Match at the start of `text`.
    pub fn matches(&self, text: &str) -> Result<Option<MatchResult>, MatchError> {
        self.match_at(text, 0)
    }

    /// Match at `index`; negative values count back from the end of `text`.
    pub fn match_at(&self, text: &str, index: isize) -> Result<Option<MatchResult>, MatchError> {
        self.match_with(text, index, &MatchConfig::default())
    }

    pub fn match_with(
        &self,
        text: &str,
        index: isize,
        config: &MatchConfig,
    ) -> Result<Option<MatchResult>, MatchError> {
        let mut input = MatchableString::new(text);
        let index = input.normalize_index(index)?;
        let mut ctx = Context::new(config);
        self.match_in(&mut input, index, &mut ctx)
    }

    /// Match against an existing input and context, as sub-patterns and
    /// function patterns do.
    pub fn match_in(
        &self,
        input: &mut MatchableString,
        index: usize,
        ctx: &mut Context,
    ) -> Result<Option<MatchResult>, MatchError> {
        matcher::run(self, input, index, ctx)
    }
}

impl From<&str> for Pattern {
    fn from(text: &str) -> Self {
        lit(text)
    }
}

impl From<bool> for Pattern {
    fn from(accept: bool) -> Self {
        boolean(accept)
    }
}

impl fmt::Debug for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "Pattern(<{name}> = {self})"),
            None => write!(f, "Pattern({self})"),
        }
    }
}

// ─── Primitives ─────────────────────────────────────────────────────────────

pub fn lit(text: &str) -> Pattern {
    Pattern::from_kind(Kind::Literal {
        text: text.to_string(),
        len: text.chars().count(),
    })
}

/// Any one character of `chars`.
pub fn set(chars: &str) -> Pattern {
    class(CharSet::from_chars(chars))
}

/// Any one character within one of the inclusive `(lo, hi)` ranges.
pub fn range(ranges: &[(char, char)]) -> Result<Pattern, PatternError> {
    CharSet::from_ranges(ranges).map(class)
}

pub fn class(set: CharSet) -> Pattern {
    Pattern::from_kind(Kind::Class(set))
}

/// Exactly `n` characters.
pub fn any(n: usize) -> Pattern {
    Pattern::from_kind(Kind::ExactCount(n))
}

/// The rest of the input, provided fewer than `n` characters remain.
pub fn fewer_than(n: usize) -> Pattern {
    Pattern::from_kind(Kind::AtMostEndCount(n))
}

/// [`any`] for `n ≥ 0`, [`fewer_than`] `|n|` otherwise.
pub fn count(n: i64) -> Pattern {
    if n >= 0 {
        any(n.unsigned_abs() as usize)
    } else {
        fewer_than(n.unsigned_abs() as usize)
    }
}

pub fn boolean(accept: bool) -> Pattern {
    Pattern::from_kind(Kind::Boolean(accept))
}

pub fn always() -> Pattern {
    boolean(true)
}

pub fn never() -> Pattern {
    boolean(false)
}

/// A pattern decided by a callback.
pub fn func(
    f: impl Fn(&mut MatchableString, usize, &mut Context) -> Result<FnOutcome, MatchError>
    + Send
    + Sync
    + 'static,
) -> Pattern {
    Pattern::from_kind(Kind::Function(Arc::new(f)))
}

pub fn sol() -> Pattern {
    Pattern::from_kind(Kind::StartOfLine)
}

pub fn eol() -> Pattern {
    Pattern::from_kind(Kind::EndOfLine)
}

// ─── Combinators ────────────────────────────────────────────────────────────

/// Unnamed, untraced nodes of the same kind are spliced into their parent.
fn flatten(
    items: impl IntoIterator<Item = Pattern>,
    unwrap: fn(&Kind) -> Option<&[Pattern]>,
) -> Vec<Pattern> {
    let mut flat = Vec::new();
    for item in items {
        if item.0.name.is_none()
            && item.0.debug.is_none()
            && let Some(inner) = unwrap(&item.0.kind)
        {
            flat.extend(inner.iter().cloned());
            continue;
        }
        flat.push(item);
    }
    flat
}

pub fn seq(items: impl IntoIterator<Item = Pattern>) -> Pattern {
    Pattern::from_kind(Kind::Sequence(flatten(items, |kind| match kind {
        Kind::Sequence(inner) => Some(inner.as_slice()),
        _ => None,
    })))
}

pub fn choice(items: impl IntoIterator<Item = Pattern>) -> Pattern {
    Pattern::from_kind(Kind::Choice(flatten(items, |kind| match kind {
        Kind::Choice(inner) => Some(inner.as_slice()),
        _ => None,
    })))
}

pub fn not(pattern: Pattern) -> Pattern {
    Pattern::from_kind(Kind::Not(pattern))
}

pub fn lookahead(pattern: Pattern) -> Pattern {
    Pattern::from_kind(Kind::LookAhead(pattern))
}

pub fn repeat(pattern: Pattern, count: impl Into<RepeatCount>) -> Pattern {
    Pattern::from_kind(Kind::Repeat {
        pattern,
        count: count.into(),
    })
}

/// A placeholder for the rule called `name`, bound later by
/// [`Pattern::bind`].
pub fn reference(name: impl Into<String>) -> Pattern {
    Pattern::from_kind(Kind::Reference(Reference::new(name.into())))
}

pub fn select(pattern: Pattern, index: isize) -> Pattern {
    Pattern::from_kind(Kind::Select {
        pattern,
        index,
        default: None,
    })
}

/// Like [`select`], substituting `default` when there is no such capture.
pub fn select_or(pattern: Pattern, index: isize, default: impl Into<Capture>) -> Pattern {
    Pattern::from_kind(Kind::Select {
        pattern,
        index,
        default: Some(default.into()),
    })
}

pub fn wrap(
    pattern: Pattern,
    f: impl Fn(MatchResult) -> Option<MatchResult> + Send + Sync + 'static,
) -> Pattern {
    Pattern::from_kind(Kind::Wrap {
        pattern,
        f: Arc::new(f),
    })
}

// ─── Captures ───────────────────────────────────────────────────────────────

/// Capture the text matched by `pattern`, ahead of its own captures.
pub fn capture(pattern: Pattern) -> Pattern {
    Pattern::from_kind(Kind::Capture(pattern))
}

pub fn constant(value: impl Into<Capture>) -> Pattern {
    Pattern::from_kind(Kind::Constant(value.into()))
}

/// Collect the captures of `pattern` into one list capture.
pub fn group(pattern: Pattern) -> Pattern {
    Pattern::from_kind(Kind::Group {
        pattern,
        drop_empty: false,
    })
}

/// Like [`group`], but adds nothing when `pattern` captured nothing.
pub fn group_non_empty(pattern: Pattern) -> Pattern {
    Pattern::from_kind(Kind::Group {
        pattern,
        drop_empty: true,
    })
}

pub fn position() -> Pattern {
    Pattern::from_kind(Kind::Position)
}

pub fn line() -> Pattern {
    Pattern::from_kind(Kind::Line)
}

pub fn column() -> Pattern {
    Pattern::from_kind(Kind::Column)
}

/// Match `pattern` and bind its text to `name` for later [`back_ref`]s.
pub fn back_capture(name: impl Into<String>, pattern: Pattern) -> Pattern {
    Pattern::from_kind(Kind::BackCapture {
        name: name.into(),
        pattern: Some(pattern),
        capture_index: None,
    })
}

/// Like [`back_capture`], binding the capture at `index` instead.
pub fn back_capture_at(name: impl Into<String>, pattern: Pattern, index: isize) -> Pattern {
    Pattern::from_kind(Kind::BackCapture {
        name: name.into(),
        pattern: Some(pattern),
        capture_index: Some(index),
    })
}

/// Match the text most recently bound to `name`.
pub fn back_ref(name: impl Into<String>) -> Pattern {
    Pattern::from_kind(Kind::BackCapture {
        name: name.into(),
        pattern: None,
        capture_index: None,
    })
}

// ─── Stacks ─────────────────────────────────────────────────────────────────

/// Match `pattern` and push its captures onto `stack`.
pub fn stack_capture(stack: impl Into<String>, pattern: Pattern) -> Pattern {
    Pattern::from_kind(Kind::StackCapture {
        stack: stack.into(),
        pattern,
    })
}

pub fn stack_pop(stack: impl Into<String>, count: usize) -> Pattern {
    Pattern::from_kind(Kind::StackPop {
        stack: stack.into(),
        count,
    })
}

/// Match the text on top of `stack`.
pub fn stack_match(stack: impl Into<String>) -> Pattern {
    stack_match_at(stack, -1)
}

/// Match the text of entry `index`; negative values count down from the top.
pub fn stack_match_at(stack: impl Into<String>, index: isize) -> Pattern {
    Pattern::from_kind(Kind::StackMatch {
        stack: stack.into(),
        index,
        expected: None,
    })
}

/// Succeed when entry `index` equals `expected`.
pub fn stack_expect(stack: impl Into<String>, index: isize, expected: impl Into<Capture>) -> Pattern {
    Pattern::from_kind(Kind::StackMatch {
        stack: stack.into(),
        index,
        expected: Some(expected.into()),
    })
}

/// Capture the size of `stack`.
pub fn stack_size(stack: impl Into<String>) -> Pattern {
    Pattern::from_kind(Kind::StackSize {
        stack: stack.into(),
        expected: None,
    })
}

pub fn stack_size_is(stack: impl Into<String>, size: usize) -> Pattern {
    Pattern::from_kind(Kind::StackSize {
        stack: stack.into(),
        expected: Some(size),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequences_flatten() {
        let p = lit("a").then(lit("b")).then(lit("c"));
        assert!(matches!(&p.node().kind, Kind::Sequence(items) if items.len() == 3));
        let named = lit("a").then(lit("b")).named("ab");
        let p = named.then(lit("c"));
        assert!(matches!(&p.node().kind, Kind::Sequence(items) if items.len() == 2));
    }

    #[test]
    fn choices_flatten() {
        let p = lit("a").or(lit("b")).or("c");
        assert!(matches!(&p.node().kind, Kind::Choice(items) if items.len() == 3));
        let traced = lit("a").or(lit("b")).debug(false);
        let p = traced.or("c");
        assert!(matches!(&p.node().kind, Kind::Choice(items) if items.len() == 2));
    }

    #[test]
    fn named_keeps_original_unnamed() {
        let base = lit("x");
        let named = base.clone().named("X");
        assert_eq!(base.name(), None);
        assert_eq!(named.name(), Some("X"));
    }

    #[test]
    fn match_at_negative_index() {
        let m = lit("d").match_at("abcd", -1).unwrap().unwrap();
        assert_eq!((m.start, m.end), (3, 4));
        assert_eq!(
            lit("d").match_at("abcd", 5).err(),
            Some(MatchError::IndexOutOfRange { index: 5, len: 4 })
        );
    }

    #[test]
    fn stack_and_capture_classification() {
        assert!(capture(lit("a")).is_capture());
        assert!(!lit("a").is_capture());
        assert_eq!(stack_pop("s", 1).stack_name(), Some("s"));
        assert_eq!(lit("a").stack_name(), None);
    }

    #[test]
    fn patterns_are_shareable_across_threads() {
        let p = seq([capture(repeat(set("ab"), 1)), eol()]);
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let p = p.clone();
                std::thread::spawn(move || p.matches("abba").unwrap().map(|m| m.captures))
            })
            .collect();
        for handle in handles {
            assert_eq!(
                handle.join().unwrap(),
                Some(vec![Capture::from("abba")])
            );
        }
    }
}
