//! The match algorithm.
//!
//! Every pattern call goes through [`run`], which owns the backtracking
//! protocol: it snapshots the back-capture list and the stack journal, runs
//! the node, and restores both when the node does not match. A node's own
//! match function therefore never cleans up after a failed child.
//!
//! `run` and `match_kind` sit on the native stack once per nesting level,
//! so both stay small: every node kind is matched in a helper of its own,
//! and the helpers that recurse are kept out of line.
//!
//! All positions are **character** (not byte) indices into the input.

use log::debug;

use super::Pattern;
use super::CharSet;
use super::ast::{FnOutcome, Kind, MatchFn, Reference, RepeatCount, WrapFn};
use crate::capture::{Capture, capture_at};
use crate::context::Context;
use crate::debug::{MatchEvent, Phase};
use crate::error::MatchError;
use crate::match_result::MatchResult;
use crate::matchable::MatchableString;
use crate::stack::Checkpoint;

type Outcome = Result<Option<MatchResult>, MatchError>;

// ─── Protocol ───────────────────────────────────────────────────────────────

pub(crate) fn run(
    pattern: &Pattern,
    input: &mut MatchableString,
    index: usize,
    ctx: &mut Context,
) -> Outcome {
    let index = index.min(input.len());
    let saved_len = input.back_capture_len();
    let checkpoint = ctx.stacks().checkpoint();
    let frame = ctx.enter(pattern.node().debug.as_ref(), index)?;

    if ctx.debug().is_some() {
        trace(pattern, input, index, ctx, Phase::Before);
    }
    let mut result = match_kind(pattern, input, index, ctx);
    if ctx.debug().is_some()
        && let Ok(outcome) = &result
    {
        trace(pattern, input, index, ctx, Phase::After(outcome.as_ref()));
    }
    ctx.leave(frame);

    if !matches!(result, Ok(Some(_))) {
        result = backtrack(pattern, input, saved_len, ctx, checkpoint, result);
    }
    if ctx.depth() == 0 {
        ctx.stacks_mut().commit();
    }
    result
}

#[inline(never)]
fn trace(
    pattern: &Pattern,
    input: &MatchableString,
    index: usize,
    ctx: &Context,
    phase: Phase<'_>,
) {
    let Some(debug) = ctx.debug() else {
        return;
    };
    let event = MatchEvent {
        pattern,
        input,
        index,
        stacks: ctx.stacks(),
        phase,
    };
    match phase {
        Phase::Before => debug.before_match(&event),
        Phase::After(_) => debug.after_match(&event),
    }
}

/// Undo the side effects of a pattern that did not match.
#[inline(never)]
fn backtrack(
    pattern: &Pattern,
    input: &mut MatchableString,
    saved_len: usize,
    ctx: &mut Context,
    checkpoint: Checkpoint,
    result: Outcome,
) -> Outcome {
    ctx.stacks_mut().rollback(checkpoint);
    let restored = input.restore_back_captures(saved_len);
    result
        .and_then(|outcome| restored.map(|()| outcome))
        .map_err(|err| err.in_pattern(pattern.name()))
}

// ─── Node matching ──────────────────────────────────────────────────────────

fn match_kind(
    pattern: &Pattern,
    input: &mut MatchableString,
    index: usize,
    ctx: &mut Context,
) -> Outcome {
    match &pattern.node().kind {
        Kind::Literal { text, len } => Ok(match_literal(input, index, text, *len)),
        Kind::Class(set) => Ok(match_class(input, index, set)),
        Kind::ExactCount(n) => Ok(match_count(input, index, *n)),
        Kind::AtMostEndCount(n) => Ok(match_tail(input, index, *n)),
        Kind::Boolean(accept) => Ok(zero_width_if(input, index, *accept)),
        Kind::Function(f) => call_function(f, input, index, ctx),
        Kind::StartOfLine => Ok(zero_width_if(input, index, at_line_start(input, index))),
        Kind::EndOfLine => Ok(zero_width_if(input, index, at_line_end(input, index))),

        Kind::Capture(inner) => match_capture(inner, input, index, ctx),
        Kind::Constant(value) => Ok(Some(zero_width_capture(input, index, value.clone()))),
        Kind::Group {
            pattern: inner,
            drop_empty,
        } => match_group(inner, *drop_empty, input, index, ctx),
        Kind::Position => Ok(Some(zero_width_capture(input, index, Capture::Position(index)))),
        Kind::Line => {
            let line = Capture::Line(input.line_number(index));
            Ok(Some(zero_width_capture(input, index, line)))
        }
        Kind::Column => {
            let column = Capture::Column(input.column_number(index));
            Ok(Some(zero_width_capture(input, index, column)))
        }
        Kind::BackCapture {
            name,
            pattern: None,
            ..
        } => match_back_ref(name, input, index),
        Kind::BackCapture {
            name,
            pattern: Some(inner),
            capture_index,
        } => match_back_capture(name, inner, *capture_index, input, index, ctx),

        Kind::StackCapture {
            stack,
            pattern: inner,
        } => match_stack_capture(stack, inner, input, index, ctx),
        Kind::StackPop { stack, count } => match_stack_pop(stack, *count, input, index, ctx),
        Kind::StackMatch {
            stack,
            index: entry,
            expected,
        } => Ok(match_stack_entry(stack, *entry, expected.as_ref(), input, index, ctx)),
        Kind::StackSize { stack, expected } => {
            Ok(match_stack_size(stack, *expected, input, index, ctx))
        }

        Kind::Sequence(items) => match_sequence(items, input, index, ctx),
        Kind::Choice(items) => match_choice(items, input, index, ctx),
        Kind::Not(inner) => match_not(inner, input, index, ctx),
        Kind::LookAhead(inner) => match_lookahead(inner, input, index, ctx),
        Kind::Repeat {
            pattern: inner,
            count,
        } => match_repeat(inner, *count, input, index, ctx),
        Kind::Reference(reference) => match_reference(reference, input, index, ctx),
        Kind::Select {
            pattern: inner,
            index: selected,
            default,
        } => match_select(inner, *selected, default.as_ref(), input, index, ctx),
        Kind::Wrap { pattern: inner, f } => match_wrap(inner, f, input, index, ctx),
    }
}

// ─── Primitives ─────────────────────────────────────────────────────────────

fn match_literal(
    input: &MatchableString,
    index: usize,
    text: &str,
    len: usize,
) -> Option<MatchResult> {
    input
        .has_at(index, text, len)
        .then(|| input.match_span(index, index + len))
}

fn match_class(input: &MatchableString, index: usize, set: &CharSet) -> Option<MatchResult> {
    input
        .char_at(index)
        .filter(|&c| set.contains(c))
        .map(|_| input.match_span(index, index + 1))
}

fn match_count(input: &MatchableString, index: usize, n: usize) -> Option<MatchResult> {
    (input.len() - index >= n).then(|| input.match_span(index, index + n))
}

/// The rest of the input, when fewer than `n` characters remain.
fn match_tail(input: &MatchableString, index: usize, n: usize) -> Option<MatchResult> {
    let len = input.len();
    (len - index < n).then(|| input.match_span(index, len))
}

fn zero_width_if(input: &MatchableString, index: usize, accept: bool) -> Option<MatchResult> {
    accept.then(|| input.match_span(index, index))
}

fn zero_width_capture(input: &MatchableString, index: usize, value: Capture) -> MatchResult {
    input.match_span(index, index).with_capture(value)
}

fn call_function(
    f: &MatchFn,
    input: &mut MatchableString,
    index: usize,
    ctx: &mut Context,
) -> Outcome {
    let len = input.len();
    match f(input, index, ctx)? {
        FnOutcome::Match(m) => {
            check_span(&m, index, len)?;
            Ok(Some(m))
        }
        FnOutcome::Accept => Ok(Some(input.match_span(index, index))),
        FnOutcome::End(end) if (index..=len).contains(&end) => {
            Ok(Some(input.match_span(index, end)))
        }
        FnOutcome::End(_) | FnOutcome::Reject => Ok(None),
    }
}

// ─── Captures ───────────────────────────────────────────────────────────────

#[inline(never)]
fn match_capture(
    inner: &Pattern,
    input: &mut MatchableString,
    index: usize,
    ctx: &mut Context,
) -> Outcome {
    Ok(inner.match_in(input, index, ctx)?.map(|mut m| {
        let value = Capture::Text(m.value().to_string());
        m.captures.insert(0, value);
        m
    }))
}

#[inline(never)]
fn match_group(
    inner: &Pattern,
    drop_empty: bool,
    input: &mut MatchableString,
    index: usize,
    ctx: &mut Context,
) -> Outcome {
    Ok(inner.match_in(input, index, ctx)?.map(|mut m| {
        let items = std::mem::take(&mut m.captures);
        if !(drop_empty && items.is_empty()) {
            m.captures.push(Capture::List(items));
        }
        m
    }))
}

fn match_back_ref(name: &str, input: &MatchableString, index: usize) -> Outcome {
    let value = input
        .back_capture(name)
        .ok_or_else(|| MatchError::UnboundBackCapture {
            name: name.to_string(),
            position: index,
            pattern: None,
        })?
        .to_string();
    Ok(match_text(input, index, &value))
}

#[inline(never)]
fn match_back_capture(
    name: &str,
    inner: &Pattern,
    capture_index: Option<isize>,
    input: &mut MatchableString,
    index: usize,
    ctx: &mut Context,
) -> Outcome {
    let Some(m) = inner.match_in(input, index, ctx)? else {
        return Ok(None);
    };
    let value = match capture_index {
        None => Capture::Text(m.value().to_string()),
        Some(i) => m
            .capture(i)
            .cloned()
            .ok_or(MatchError::CaptureIndexOutOfRange {
                index: i,
                available: m.captures.len(),
                position: index,
                pattern: None,
            })?,
    };
    input.add_back_capture(name, value);
    Ok(Some(m))
}

// ─── Stacks ─────────────────────────────────────────────────────────────────

#[inline(never)]
fn match_stack_capture(
    stack: &str,
    inner: &Pattern,
    input: &mut MatchableString,
    index: usize,
    ctx: &mut Context,
) -> Outcome {
    let Some(mut m) = inner.match_in(input, index, ctx)? else {
        return Ok(None);
    };
    let captures = std::mem::take(&mut m.captures);
    ctx.stacks_mut().extend(stack, captures);
    Ok(Some(m))
}

fn match_stack_pop(
    stack: &str,
    count: usize,
    input: &MatchableString,
    index: usize,
    ctx: &mut Context,
) -> Outcome {
    ctx.stacks_mut().pop_n(stack, count, index)?;
    Ok(Some(input.match_span(index, index)))
}

fn match_stack_entry(
    stack: &str,
    entry: isize,
    expected: Option<&Capture>,
    input: &MatchableString,
    index: usize,
    ctx: &Context,
) -> Option<MatchResult> {
    let value = ctx.stacks().get(stack, entry)?;
    match (expected, value) {
        (Some(expected), value) => (expected == value).then(|| input.match_span(index, index)),
        (None, Capture::Text(text)) => match_text(input, index, text),
        (None, _) => Some(input.match_span(index, index)),
    }
}

fn match_stack_size(
    stack: &str,
    expected: Option<usize>,
    input: &MatchableString,
    index: usize,
    ctx: &Context,
) -> Option<MatchResult> {
    let size = ctx.stacks().len(stack);
    match expected {
        None => Some(zero_width_capture(input, index, Capture::Int(size as i64))),
        Some(n) => zero_width_if(input, index, n == size),
    }
}

// ─── Combinators ────────────────────────────────────────────────────────────

#[inline(never)]
fn match_sequence(
    items: &[Pattern],
    input: &mut MatchableString,
    index: usize,
    ctx: &mut Context,
) -> Outcome {
    let mut result = input.match_span(index, index);
    for item in items {
        let Some(m) = item.match_in(input, result.end, ctx)? else {
            return Ok(None);
        };
        result.end = m.end;
        result.extend(m);
    }
    Ok(Some(result))
}

#[inline(never)]
fn match_choice(
    items: &[Pattern],
    input: &mut MatchableString,
    index: usize,
    ctx: &mut Context,
) -> Outcome {
    for item in items {
        if let Some(m) = item.match_in(input, index, ctx)? {
            return Ok(Some(m));
        }
    }
    Ok(None)
}

#[inline(never)]
fn match_not(
    inner: &Pattern,
    input: &mut MatchableString,
    index: usize,
    ctx: &mut Context,
) -> Outcome {
    let matched = inner.match_in(input, index, ctx)?.is_some();
    Ok(zero_width_if(input, index, !matched))
}

#[inline(never)]
fn match_lookahead(
    inner: &Pattern,
    input: &mut MatchableString,
    index: usize,
    ctx: &mut Context,
) -> Outcome {
    Ok(inner.match_in(input, index, ctx)?.map(|mut m| {
        m.start = index;
        m.end = index;
        m
    }))
}

/// Match the body of a repeat as often as `count` allows.
#[inline(never)]
fn match_repeat(
    pattern: &Pattern,
    count: RepeatCount,
    input: &mut MatchableString,
    index: usize,
    ctx: &mut Context,
) -> Outcome {
    let limit = match count {
        RepeatCount::AtLeast(_) => None,
        RepeatCount::AtMost(n) | RepeatCount::Exactly(n) => Some(n),
    };
    let mut result = input.match_span(index, index);
    let mut iterations = 0usize;
    while limit.is_none_or(|n| iterations < n) {
        let Some(m) = pattern.match_in(input, result.end, ctx)? else {
            break;
        };
        let zero_width = m.end == result.end;
        result.end = m.end;
        result.extend(m);
        iterations += 1;
        if zero_width && limit.is_none() {
            // would repeat forever: counts as enough iterations
            return Ok(Some(result));
        }
    }
    Ok(match count {
        RepeatCount::AtLeast(n) => (iterations >= n).then_some(result),
        RepeatCount::AtMost(_) => Some(result),
        RepeatCount::Exactly(n) => (iterations == n).then_some(result),
    })
}

#[inline(never)]
fn match_reference(
    reference: &Reference,
    input: &mut MatchableString,
    index: usize,
    ctx: &mut Context,
) -> Outcome {
    match reference.target() {
        Some(target) => target.match_in(input, index, ctx),
        None => {
            debug!("Reference <{}> matched before it was bound", reference.name);
            Ok(None)
        }
    }
}

#[inline(never)]
fn match_select(
    inner: &Pattern,
    selected: isize,
    default: Option<&Capture>,
    input: &mut MatchableString,
    index: usize,
    ctx: &mut Context,
) -> Outcome {
    let Some(m) = inner.match_in(input, index, ctx)? else {
        return Ok(None);
    };
    let capture = capture_at(&m.captures, selected).or(default).cloned();
    Ok(Some(MatchResult::with_captures(
        input.source(),
        index,
        m.end,
        capture.into_iter().collect(),
    )))
}

#[inline(never)]
fn match_wrap(
    inner: &Pattern,
    f: &WrapFn,
    input: &mut MatchableString,
    index: usize,
    ctx: &mut Context,
) -> Outcome {
    let Some(m) = inner.match_in(input, index, ctx)? else {
        return Ok(None);
    };
    let len = input.len();
    match f(m) {
        Some(wrapped) => {
            check_span(&wrapped, index, len)?;
            Ok(Some(wrapped))
        }
        None => Ok(None),
    }
}

// ─── Helpers ────────────────────────────────────────────────────────────────

fn check_span(m: &MatchResult, index: usize, len: usize) -> Result<(), MatchError> {
    if index <= m.start && m.start <= m.end && m.end <= len && m.input_len() == len {
        Ok(())
    } else {
        Err(MatchError::InvalidSpan {
            start: m.start,
            end: m.end,
            position: index,
        })
    }
}

fn match_text(input: &MatchableString, index: usize, text: &str) -> Option<MatchResult> {
    let n = text.chars().count();
    input
        .has_at(index, text, n)
        .then(|| input.match_span(index, index + n))
}

fn at_line_start(input: &MatchableString, index: usize) -> bool {
    match index.checked_sub(1).and_then(|i| input.char_at(i)) {
        None => true,
        Some('\n') => true,
        Some('\r') => input.char_at(index) != Some('\n'),
        Some(_) => false,
    }
}

fn at_line_end(input: &MatchableString, index: usize) -> bool {
    match input.char_at(index) {
        None | Some('\r') => true,
        Some('\n') => index == 0 || input.char_at(index - 1) != Some('\r'),
        Some(_) => false,
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
