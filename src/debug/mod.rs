//! Match tracing.
//!
//! A pattern carrying [`DebugOptions`] reports every match attempt made by
//! itself and by its sub-patterns, until a sub-pattern installs options of
//! its own. Each attempt produces two events, one before and one after the
//! match, which pass through a [`DebugFilter`] before reaching a
//! [`DebugSink`].

pub mod filter;

use std::fmt;
use std::sync::Arc;

use itertools::Itertools;
use log::debug;

pub use filter::DebugFilter;

use crate::MatchResult;
use crate::error::PatternError;
use crate::matchable::MatchableString;
use crate::pattern::Pattern;
use crate::stack::StackTable;

/// Log target used by [`LogSink`].
pub const TRACE_TARGET: &str = "pegmatch::trace";

#[derive(Debug, Clone, Copy)]
pub enum Phase<'a> {
    Before,
    /// `None` when the pattern failed.
    After(Option<&'a MatchResult>),
}

/// One match attempt as seen by a filter or sink.
pub struct MatchEvent<'a> {
    pub pattern: &'a Pattern,
    pub input: &'a MatchableString,
    pub index: usize,
    pub stacks: &'a StackTable,
    pub phase: Phase<'a>,
}

pub trait DebugSink: Send + Sync {
    fn before_match(&self, event: &MatchEvent<'_>);
    fn after_match(&self, event: &MatchEvent<'_>);
}

/// Writes trace lines through the `log` facade at `debug` level.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl DebugSink for LogSink {
    fn before_match(&self, event: &MatchEvent<'_>) {
        let Some(name) = event.pattern.name() else {
            return;
        };
        let (line, col) = line_col(event);
        debug!(target: TRACE_TARGET, "Enter: <{name}> => ({line}.{col}) {}", event.pattern);
    }

    fn after_match(&self, event: &MatchEvent<'_>) {
        let (line, col) = line_col(event);
        let pattern = event.pattern;
        match pattern.name() {
            Some(name) => debug!(target: TRACE_TARGET, "Pattern: ({line}.{col}) <{name}>"),
            None => debug!(target: TRACE_TARGET, "Pattern: ({line}.{col}) {pattern}"),
        }
        let Phase::After(Some(result)) = event.phase else {
            debug!(target: TRACE_TARGET, "  Failed");
            return;
        };
        debug!(target: TRACE_TARGET, "  Result: '{}'", escape(result.value()));
        if pattern.is_capture() {
            debug!(
                target: TRACE_TARGET,
                "  Captures: [{}]",
                result.captures.iter().join(", ")
            );
        }
        if let Some(stack) = pattern.stack_name() {
            debug!(
                target: TRACE_TARGET,
                "  Stack: {stack} => [{}]",
                event.stacks.entries(stack).iter().join(", ")
            );
        }
    }
}

fn line_col(event: &MatchEvent<'_>) -> (usize, usize) {
    (
        event.input.line_number(event.index),
        event.input.column_number(event.index),
    )
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\r' => out.push_str("\\r"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\'' | '"' => {
                out.push('\\');
                out.push(c);
            }
            _ => out.push(c),
        }
    }
    out
}

/// Debug settings attached to a pattern.
#[derive(Clone)]
pub struct DebugOptions {
    before: DebugFilter,
    after: DebugFilter,
    sink: Arc<dyn DebugSink>,
}

impl DebugOptions {
    /// Use `filter` both before and after each match, writing to [`LogSink`].
    pub fn new(filter: DebugFilter) -> Self {
        Self::split(filter.clone(), filter)
    }

    pub fn split(before: DebugFilter, after: DebugFilter) -> Self {
        Self {
            before,
            after,
            sink: Arc::new(LogSink),
        }
    }

    /// Options from a filter specification such as `"named"`.
    pub fn parse(spec: &str) -> Result<Self, PatternError> {
        DebugFilter::parse(spec).map(Self::new)
    }

    pub fn show() -> Self {
        Self::new(DebugFilter::Show)
    }

    pub fn hide() -> Self {
        Self::new(DebugFilter::Hide)
    }

    pub fn with_sink(mut self, sink: impl DebugSink + 'static) -> Self {
        self.sink = Arc::new(sink);
        self
    }

    pub(crate) fn before_match(&self, event: &MatchEvent<'_>) {
        if self.before.allows(event) {
            self.sink.before_match(event);
        }
    }

    pub(crate) fn after_match(&self, event: &MatchEvent<'_>) {
        if self.after.allows(event) {
            self.sink.after_match(event);
        }
    }
}

impl From<bool> for DebugOptions {
    fn from(show: bool) -> Self {
        Self::new(show.into())
    }
}

impl From<DebugFilter> for DebugOptions {
    fn from(filter: DebugFilter) -> Self {
        Self::new(filter)
    }
}

impl fmt::Debug for DebugOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DebugOptions")
            .field("before", &self.before)
            .field("after", &self.after)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::pattern::{lit, seq};

    #[derive(Default)]
    struct Recorder(Mutex<Vec<String>>);

    impl DebugSink for Arc<Recorder> {
        fn before_match(&self, event: &MatchEvent<'_>) {
            self.0.lock().unwrap().push(format!("enter {}", event.pattern));
        }
        fn after_match(&self, event: &MatchEvent<'_>) {
            let outcome = match event.phase {
                Phase::After(Some(m)) => format!("'{}'", m.value()),
                _ => "failed".to_string(),
            };
            self.0
                .lock()
                .unwrap()
                .push(format!("leave {} {outcome}", event.pattern));
        }
    }

    fn recorded(filter: &str, text: &str) -> Vec<String> {
        let recorder = Arc::new(Recorder::default());
        let opts = DebugOptions::parse(filter)
            .unwrap()
            .with_sink(Arc::clone(&recorder));
        let p = seq([lit("a").named("A"), lit("b")]).debug(opts);
        let _ = p.matches(text).unwrap();
        let events = recorder.0.lock().unwrap().clone();
        events
    }

    #[test]
    fn show_reports_every_attempt() {
        assert_eq!(
            recorded("show", "ab"),
            [
                "enter <A> \"b\"",
                "enter \"a\"",
                "leave \"a\" 'a'",
                "enter \"b\"",
                "leave \"b\" 'b'",
                "leave <A> \"b\" 'ab'",
            ]
        );
    }

    #[test]
    fn named_filter_skips_anonymous_patterns() {
        assert_eq!(
            recorded("named", "ax"),
            ["enter \"a\"", "leave \"a\" 'a'"]
        );
    }

    #[test]
    fn only_success_after_filter() {
        assert_eq!(
            recorded("named & show_only_success", "xb"),
            ["enter \"a\""]
        );
    }

    #[test]
    fn hide_reports_nothing() {
        assert!(recorded("hide", "ab").is_empty());
    }

    #[test]
    fn escape_quotes_and_controls() {
        assert_eq!(escape("a'b\"\n\t\r"), "a\\'b\\\"\\n\\t\\r");
    }
}
